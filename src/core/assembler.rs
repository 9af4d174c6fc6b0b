/// The report state machine: `Idle → Started → Assembling → Stopped`.
///
/// `start` gathers the match facts and sets the transient team flags,
/// `assemble` renders the sections in their fixed order, and `stop` persists
/// what was used and clears the flags again. A report either renders every
/// section it needs or fails without persisting anything.

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::core::context::{NarrativeContext, SectionKind};
use crate::core::facts::{FactContext, ReportFacts};
use crate::core::grammar::{Bindings, GrammarError, TeamForm};
use crate::core::phrase_bank::PhraseBank;
use crate::core::pipeline::{PipelineError, Report, ReportOptions, ReportSection};
use crate::core::sampler::{choose, Sampler};
use crate::core::standings::StandingsEngine;
use crate::core::store::LeagueStore;
use crate::core::timeline::{list_scorers, GoalTimeline, GroupPlan};
use crate::core::trend::TrendAnalyzer;
use crate::core::variant::{Lexicon, VariantResolver};
use crate::core::variety::SynonymRegistry;
use crate::schema::league::{Competition, Match, MatchId, Team, TeamFlags, TeamId};
use crate::schema::phrase::PhraseCategory;
use crate::schema::record::AntiRepeatState;

const MATCH_ROLES: &[&str] = &["home", "away", "winner", "loser"];
const PRIOR_ROLES: &[&str] = &["prior_home", "prior_away", "prior_loser"];
const GOAL_ROLES: &[&str] = &["team", "recipient"];
const MOVEMENT_ROLES: &[&str] = &["promoted", "displaced", "relegated", "overtaker"];

const MATCH_FIELDS: &[&str] = &[
    "score",
    "competition",
    "date",
    "total_goals",
    "score_diff",
    "wins",
    "losses",
    "scorers",
    "hero",
    "doubles",
    "triples",
    "home_rank",
    "away_rank",
    "home_points",
    "away_points",
    "class_difference",
];
const PRIOR_FIELDS: &[&str] = &["prior_score", "prior_date", "months"];
const GOAL_FIELDS: &[&str] = &[
    "goal.minute",
    "goal.score",
    "goal.scorer",
    "goal.assist",
    "goal.what",
    "goal.how",
    "goal.when",
];
const GROUP_FIELDS: &[&str] = &["authors", "group.score", "group.size"];
const MOVEMENT_FIELDS: &[&str] = &[
    "promoted_rank",
    "promoted_points",
    "displaced_rank",
    "displaced_points",
    "relegated_rank",
    "relegated_points",
    "overtaker_rank",
    "overtaker_points",
];

/// Team roles a template of `category` may be bound to.
pub fn section_roles(category: PhraseCategory) -> Vec<&'static str> {
    let extra: &[&str] = match category {
        PhraseCategory::Title => &[],
        PhraseCategory::PriorMeeting => PRIOR_ROLES,
        PhraseCategory::FirstGoal
        | PhraseCategory::RegularGoal
        | PhraseCategory::GoalGroup
        | PhraseCategory::LastGoal => GOAL_ROLES,
        PhraseCategory::Conclusion => MOVEMENT_ROLES,
    };
    MATCH_ROLES.iter().chain(extra).copied().collect()
}

/// Fields a template of `category` may use.
pub fn section_fields(category: PhraseCategory) -> Vec<&'static str> {
    let extra: &[&str] = match category {
        PhraseCategory::Title => &[],
        PhraseCategory::PriorMeeting => PRIOR_FIELDS,
        PhraseCategory::FirstGoal | PhraseCategory::RegularGoal | PhraseCategory::LastGoal => {
            GOAL_FIELDS
        }
        PhraseCategory::GoalGroup => GROUP_FIELDS,
        PhraseCategory::Conclusion => MOVEMENT_FIELDS,
    };
    MATCH_FIELDS.iter().chain(extra).copied().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Idle,
    Started,
    /// Rendering (or last rendered) the given section.
    Assembling(SectionKind),
    Stopped,
}

/// Everything loaded for the match being reported.
struct Session {
    game: Match,
    competition: Competition,
    teams: FxHashMap<TeamId, Team>,
    timeline: GoalTimeline,
    facts: ReportFacts,
}

/// Role and field values one section renders against.
#[derive(Debug, Clone, Default)]
struct SectionScope {
    roles: FxHashMap<&'static str, TeamId>,
    fields: FxHashMap<&'static str, String>,
}

impl SectionScope {
    fn role(&mut self, role: &'static str, team: TeamId) {
        self.roles.insert(role, team);
    }

    fn field(&mut self, name: &'static str, value: impl ToString) {
        self.fields.insert(name, value.to_string());
    }
}

/// Builds one report. The assembler is used once per generation and owns
/// the flags and anti-repeat bookkeeping of that generation.
pub struct NarrativeAssembler<'a> {
    phrases: &'a PhraseBank,
    lexicon: &'a Lexicon,
    config: &'a EngineConfig,
    options: ReportOptions,
    state: AssemblerState,
    standings: StandingsEngine,
    trend: TrendAnalyzer,
    context: NarrativeContext,
    session: Option<Session>,
}

impl<'a> NarrativeAssembler<'a> {
    pub fn new(phrases: &'a PhraseBank, lexicon: &'a Lexicon, config: &'a EngineConfig) -> Self {
        Self {
            phrases,
            lexicon,
            config,
            options: ReportOptions::default(),
            state: AssemblerState::Idle,
            standings: StandingsEngine::new(),
            trend: TrendAnalyzer::new(config.match_count_threshold),
            context: NarrativeContext::default(),
            session: None,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn context(&self) -> &NarrativeContext {
        &self.context
    }

    pub fn standings(&self) -> &StandingsEngine {
        &self.standings
    }

    /// Flags of `team` for the current report.
    pub fn flags(&self, team: TeamId) -> TeamFlags {
        self.context.flags(team)
    }

    /// Load the match, gather its facts and set the team flags.
    pub fn start(
        &mut self,
        store: &dyn LeagueStore,
        id: MatchId,
        options: ReportOptions,
        sampler: &mut dyn Sampler,
    ) -> Result<(), PipelineError> {
        if !matches!(self.state, AssemblerState::Idle | AssemblerState::Stopped) {
            return Err(PipelineError::InvalidState {
                state: self.state,
                action: "start",
            });
        }
        self.options = options;
        if options.regenerate {
            self.standings.regenerate(id);
        }

        let game = store.load_match(id)?;
        self.context = NarrativeContext::new(self.initial_usage(&game));

        let timeline = GoalTimeline::new(&game, store.load_goals_for_match(id)?);
        let facts = ReportFacts::gather(
            store,
            &mut self.standings,
            &self.trend,
            self.config,
            &game,
            &timeline,
        )?;
        let competition = store.load_competition(game.competition)?;

        let mut teams: FxHashMap<TeamId, Team> = FxHashMap::default();
        let movers = facts
            .promotions
            .iter()
            .chain(&facts.relegations)
            .flat_map(|m| [m.team, m.other]);
        for team in [game.home, game.away].into_iter().chain(movers) {
            if !teams.contains_key(&team) {
                teams.insert(team, store.load_team(team)?);
            }
        }

        let table_len = self.standings.compute_standings(store, id)?.len();
        let config = self.config;
        let resolver = VariantResolver::new(self.lexicon, &config.team_link);
        for side in [&facts.home, &facts.away] {
            let flags = self.context.flags_mut(side.team);
            flags.host = side.team == game.home;
            flags.guest = side.team == game.away;
            if side.season_matches > config.match_count_threshold {
                flags.leader = side.rank_before == Some(1);
                flags.bottom = !flags.leader && side.rank_before == Some(table_len);
            }
            flags.result = game
                .outcome_for(side.team)
                .map(|outcome| resolver.result_phrase(outcome, &mut *sampler));
        }

        info!(
            match_id = id.0,
            goals = timeline.len(),
            debug = options.debug,
            regenerate = options.regenerate,
            "report started"
        );
        self.session = Some(Session {
            game,
            competition,
            teams,
            timeline,
            facts,
        });
        self.state = AssemblerState::Started;
        Ok(())
    }

    fn initial_usage(&self, game: &Match) -> AntiRepeatState {
        if self.options.regenerate {
            return AntiRepeatState::default();
        }
        match &game.anti_repeat {
            Some(state) if state.is_current() => state.clone(),
            Some(state) => {
                warn!(
                    match_id = game.id.0,
                    version = state.version,
                    "discarding anti-repeat state with outdated version"
                );
                AntiRepeatState::default()
            }
            None => AntiRepeatState::default(),
        }
    }

    /// Render every section the match calls for.
    pub fn assemble(
        &mut self,
        synonyms: &mut SynonymRegistry,
        sampler: &mut dyn Sampler,
    ) -> Result<Report, PipelineError> {
        if self.state != AssemblerState::Started {
            return Err(PipelineError::InvalidState {
                state: self.state,
                action: "assemble",
            });
        }
        let session = self.session.take().ok_or(PipelineError::InvalidState {
            state: self.state,
            action: "assemble",
        })?;
        let report = self.assemble_sections(&session, synonyms, sampler);
        self.session = Some(session);
        report
    }

    fn assemble_sections(
        &mut self,
        session: &Session,
        synonyms: &mut SynonymRegistry,
        sampler: &mut dyn Sampler,
    ) -> Result<Report, PipelineError> {
        let game = &session.game;
        let facts = &session.facts;
        let timeline = &session.timeline;
        let base = base_scope(session);
        let mut sections = Vec::new();

        let title_facts = FactContext::title(facts);
        let title = self.render(
            SectionKind::Title,
            title_facts.clone(),
            base.clone(),
            session,
            synonyms,
            sampler,
        )?;
        sections.push(self.render(SectionKind::Lead, title_facts, base.clone(), session, synonyms, sampler)?);

        if let Some(meeting) = &facts.prior_meeting {
            let mut scope = base.clone();
            scope.role("prior_home", meeting.home);
            scope.role("prior_away", meeting.away);
            if let Some(loser) = meeting.loser {
                scope.role("prior_loser", loser);
            }
            scope.field("prior_score", &meeting.score);
            scope.field("prior_date", meeting.date.format("%d.%m.%Y"));
            scope.field("months", meeting.months);
            let context = FactContext::prior_meeting(meeting);
            sections.push(self.render(SectionKind::PriorMeeting, context, scope, session, synonyms, sampler)?);
        }

        if let Some(first) = timeline.first() {
            let scope = self.goal_scope(&base, session, 0, sampler);
            let context = FactContext::first_goal(game.total_goals() == 1, first.minute);
            sections.push(self.render(SectionKind::FirstGoal, context, scope, session, synonyms, sampler)?);
        }

        if timeline.len() > 2 {
            for plan in timeline.group_plan() {
                let section = match plan {
                    GroupPlan::Group { goals, opening } => {
                        let scope = group_scope(&base, session, &goals);
                        let last = goals.last().copied().unwrap_or_default();
                        let context = FactContext::goal_group(opening, &timeline.facts(last));
                        self.render(SectionKind::GoalGroup, context, scope, session, synonyms, sampler)?
                    }
                    GroupPlan::Single(index) => {
                        let scope = self.goal_scope(&base, session, index, sampler);
                        let (penalty, own_goal) = timeline
                            .goal(index)
                            .map_or((false, false), |g| (g.penalty, g.own_goal));
                        let context =
                            FactContext::regular_goal(&timeline.facts(index), penalty, own_goal);
                        self.render(SectionKind::RegularGoal, context, scope, session, synonyms, sampler)?
                    }
                };
                sections.push(section);
            }
        }

        if let Some(index) = timeline.last_index().filter(|_| timeline.len() >= 2) {
            if let Some(goal) = timeline.goal(index) {
                let scope = self.goal_scope(&base, session, index, sampler);
                let context =
                    FactContext::last_goal(&timeline.facts(index), goal.minute, goal.penalty, goal.own_goal);
                sections.push(self.render(SectionKind::LastGoal, context, scope, session, synonyms, sampler)?);
            }
        }

        if facts.rank_enabled {
            let scope = conclusion_scope(&base, facts);
            let context = FactContext::conclusion(facts);
            sections.push(self.render(SectionKind::Conclusion, context, scope, session, synonyms, sampler)?);
        }

        debug!(match_id = game.id.0, sections = sections.len(), "report assembled");
        Ok(Report {
            match_id: game.id,
            title: title.text,
            title_template: title.template,
            sections,
            facts_used: facts.clone(),
        })
    }

    /// Draw a template for `kind`, render it and record its id.
    fn render(
        &mut self,
        kind: SectionKind,
        facts: FactContext,
        scope: SectionScope,
        session: &Session,
        synonyms: &mut SynonymRegistry,
        sampler: &mut dyn Sampler,
    ) -> Result<ReportSection, PipelineError> {
        self.state = AssemblerState::Assembling(kind);
        let phrases = self.phrases;
        let category = kind.category();
        let eligible = phrases.select_eligible(category, &facts, &self.context.excluded(kind));
        let Some(template) = phrases.choose(&eligible, &mut *sampler) else {
            warn!(section = ?kind, category = category.name(), "no eligible template");
            return Err(PipelineError::NoEligibleTemplate {
                category,
                facts: Box::new(facts),
            });
        };

        let mut bindings = RenderScope {
            scope,
            teams: &session.teams,
            competition_slug: &session.competition.slug,
            context: &self.context,
            resolver: VariantResolver::new(self.lexicon, &self.config.team_link),
            synonyms,
            sampler,
        };
        let mut text = template.template.render(&mut bindings)?;
        self.context.record(kind, template.id);
        if self.options.debug {
            text = format!("({}) {}", template.id, text);
        }
        debug!(section = ?kind, template = %template.id, "section rendered");
        Ok(ReportSection {
            kind,
            template: template.id,
            text,
        })
    }

    /// Roles and fields of the goal at `index`.
    fn goal_scope(
        &self,
        base: &SectionScope,
        session: &Session,
        index: usize,
        sampler: &mut dyn Sampler,
    ) -> SectionScope {
        let timeline = &session.timeline;
        let mut scope = base.clone();
        let Some(goal) = timeline.goal(index) else {
            return scope;
        };
        let facts = timeline.facts(index);
        let resolver = VariantResolver::new(self.lexicon, &self.config.team_link);
        let previous = index
            .checked_sub(1)
            .and_then(|i| timeline.goal(i))
            .map(|g| g.minute);

        scope.role("team", goal.team);
        scope.role(
            "recipient",
            goal.recipient.unwrap_or_else(|| session.game.opponent_of(goal.team)),
        );
        scope.field("goal.minute", goal.minute);
        scope.field("goal.score", format!("{}:{}", facts.score.0, facts.score.1));
        scope.field("goal.scorer", goal.scorer.as_deref().unwrap_or("unknown"));
        scope.field("goal.assist", goal.assist.as_deref().unwrap_or_default());
        scope.field("goal.what", resolver.goal_what(&facts, goal, &mut *sampler));
        scope.field("goal.how", resolver.goal_how(goal, &mut *sampler));
        scope.field("goal.when", resolver.goal_when(goal.minute, previous, &mut *sampler));
        scope
    }

    /// Persist what the report used, unless in debug mode, then clear the
    /// flags and the global synonym usage.
    pub fn stop(
        &mut self,
        store: &mut dyn LeagueStore,
        synonyms: &mut SynonymRegistry,
    ) -> Result<(), PipelineError> {
        if !matches!(self.state, AssemblerState::Started | AssemblerState::Assembling(_)) {
            return Err(PipelineError::InvalidState {
                state: self.state,
                action: "stop",
            });
        }
        let game = self
            .session
            .take()
            .map(|session| session.game)
            .ok_or(PipelineError::InvalidState {
                state: self.state,
                action: "stop",
            })?;

        let persisted = if self.options.debug {
            self.standings.discard_pending();
            debug!(match_id = game.id.0, "debug report, nothing persisted");
            Ok(())
        } else {
            self.persist(store, game.id, game.anti_repeat)
        };

        self.context.clear_flags();
        synonyms.reset_usage();
        self.state = AssemblerState::Stopped;
        persisted
    }

    /// Anti-repeat state goes first; if the standings flush then fails, the
    /// previous state is written back so the match reads as before.
    fn persist(
        &mut self,
        store: &mut dyn LeagueStore,
        id: MatchId,
        previous: Option<AntiRepeatState>,
    ) -> Result<(), PipelineError> {
        if let Err(e) = store.persist_anti_repeat_state(id, self.context.used()) {
            self.standings.discard_pending();
            return Err(e.into());
        }
        if let Err(e) = self.standings.flush(store) {
            self.standings.discard_pending();
            if let Err(restore) = store.persist_anti_repeat_state(id, &previous.unwrap_or_default()) {
                warn!(match_id = id.0, error = %restore, "could not restore anti-repeat state");
            }
            return Err(e.into());
        }
        info!(match_id = id.0, templates = self.context.used().all_ids().len(), "report state persisted");
        Ok(())
    }

    /// Abandon a failed generation: nothing is persisted, flags and synonym
    /// usage are cleared as in `stop`.
    pub fn abort(&mut self, synonyms: &mut SynonymRegistry) {
        self.standings.discard_pending();
        self.session = None;
        self.context.clear_flags();
        synonyms.reset_usage();
        self.state = AssemblerState::Stopped;
    }
}

fn base_scope(session: &Session) -> SectionScope {
    let game = &session.game;
    let facts = &session.facts;
    let timeline = &session.timeline;
    let mut scope = SectionScope::default();

    scope.role("home", game.home);
    scope.role("away", game.away);
    if let Some(winner) = facts.winner {
        scope.role("winner", winner);
    }
    if let Some(loser) = facts.loser {
        scope.role("loser", loser);
    }

    let all: Vec<usize> = (0..timeline.len()).collect();
    let rank = |rank: Option<usize>| rank.map_or_else(|| "-".to_string(), |r| r.to_string());
    scope.field("score", &facts.score);
    scope.field("competition", &session.competition.title);
    scope.field("date", game.date.format("%d.%m.%Y"));
    scope.field("total_goals", facts.total_goals);
    scope.field("score_diff", facts.score_diff);
    scope.field("wins", facts.winner_side().map_or(0, |s| s.win_streak));
    scope.field("losses", facts.loser_side().map_or(0, |s| s.lose_streak));
    scope.field("scorers", list_scorers(&timeline.scorers(&all)));
    scope.field(
        "hero",
        facts.man_of_the_match.as_ref().map_or("", |r| r.player.as_str()),
    );
    scope.field("doubles", facts.doubles.join(", "));
    scope.field("triples", facts.triples.join(", "));
    scope.field("home_rank", rank(facts.home.rank));
    scope.field("away_rank", rank(facts.away.rank));
    scope.field("home_points", facts.home.points);
    scope.field("away_points", facts.away.points);
    scope.field("class_difference", facts.class_difference);
    scope
}

/// Roles and fields of a run of goals by one team.
fn group_scope(base: &SectionScope, session: &Session, goals: &[usize]) -> SectionScope {
    let timeline = &session.timeline;
    let mut scope = base.clone();
    if let Some(first) = goals.first().and_then(|i| timeline.goal(*i)) {
        scope.role("team", first.team);
        scope.role(
            "recipient",
            first.recipient.unwrap_or_else(|| session.game.opponent_of(first.team)),
        );
    }
    if let Some((home, away)) = goals.last().and_then(|i| timeline.score_after(*i)) {
        scope.field("group.score", format!("{}:{}", home, away));
    }
    scope.field("authors", list_scorers(&timeline.scorers(goals)));
    scope.field("group.size", goals.len());
    scope
}

fn conclusion_scope(base: &SectionScope, facts: &ReportFacts) -> SectionScope {
    let mut scope = base.clone();
    let rank = |rank: Option<usize>| rank.map_or_else(|| "-".to_string(), |r| r.to_string());
    if let Some(up) = facts.promotions.first() {
        scope.role("promoted", up.team);
        scope.role("displaced", up.other);
        scope.field("promoted_rank", up.rank);
        scope.field("promoted_points", up.points);
        scope.field("displaced_rank", rank(up.other_rank));
        scope.field("displaced_points", up.other_points);
    }
    if let Some(down) = facts.relegations.first() {
        scope.role("relegated", down.team);
        scope.role("overtaker", down.other);
        scope.field("relegated_rank", down.rank);
        scope.field("relegated_points", down.points);
        scope.field("overtaker_rank", rank(down.other_rank));
        scope.field("overtaker_points", down.other_points);
    }
    scope
}

/// Template bindings for one section.
struct RenderScope<'s> {
    scope: SectionScope,
    teams: &'s FxHashMap<TeamId, Team>,
    competition_slug: &'s str,
    context: &'s NarrativeContext,
    resolver: VariantResolver<'s>,
    synonyms: &'s mut SynonymRegistry,
    sampler: &'s mut dyn Sampler,
}

impl Bindings for RenderScope<'_> {
    fn team(&mut self, role: &str, form: TeamForm) -> Result<String, GrammarError> {
        let teams = self.teams;
        let team = self
            .scope
            .roles
            .get(role)
            .and_then(|id| teams.get(id))
            .ok_or_else(|| GrammarError::UnboundRole(role.to_string()))?;
        let flags = self.context.flags(team.id);
        Ok(match form {
            TeamForm::Refer { case, number } => self.resolver.refer(
                team,
                self.competition_slug,
                &flags,
                case,
                number,
                &mut *self.sampler,
            ),
            TeamForm::Name => team.name.clone(),
            TeamForm::Result => flags.result.unwrap_or_default(),
        })
    }

    fn field(&self, name: &str) -> Option<String> {
        self.scope.fields.get(name).cloned()
    }

    fn synonym(&mut self, word: &str) -> String {
        self.synonyms.pick(word, &mut *self.sampler)
    }

    fn choice(&mut self, options: &[String]) -> String {
        choose(&mut *self.sampler, options).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sampler::ScriptedSampler;
    use crate::core::store::MemoryStore;

    const LEAGUE: &str = r#"(
        seasons: [(id: 1, title: "2015/16")],
        competitions: [(id: 1, title: "Divizia Nationala", slug: "divizia-nationala")],
        teams: [
            (id: 1, name: "Zimbru", slug: "zimbru", competition: 1, seasons: [1]),
            (id: 2, name: "Dacia", slug: "dacia", competition: 1, seasons: [1]),
        ],
        matches: [
            (id: 1, season: 1, competition: 1, home: 1, away: 2, home_goals: 1, away_goals: 0, date: "2015-07-25"),
        ],
        goals: [
            (match_id: 1, minute: 30, team: 1, scorer: Some("Ivanov")),
        ],
    )"#;

    const PHRASES: &str = r#"(
        title: [
            (id: 1, text: "{winner.name} {winner.result} {score}", when: (score_diff: (min: Some(1), max: None))),
            (id: 2, text: "{winner.ns} beat {loser.as}", when: (score_diff: (min: Some(1), max: None))),
        ],
        first_goal: [
            (id: 20, text: "{goal.scorer} scored the only goal for {team.name} against {recipient.name}.", when: (only: Some(true))),
        ],
    )"#;

    fn parts() -> (PhraseBank, Lexicon, EngineConfig) {
        (
            PhraseBank::parse_ron(PHRASES).unwrap(),
            Lexicon::default(),
            EngineConfig::default(),
        )
    }

    #[test]
    fn assemble_before_start_rejected() {
        let (phrases, lexicon, config) = parts();
        let mut assembler = NarrativeAssembler::new(&phrases, &lexicon, &config);
        let mut synonyms = SynonymRegistry::new();
        let mut sampler = ScriptedSampler::first();
        let err = assembler.assemble(&mut synonyms, &mut sampler).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidState {
                state: AssemblerState::Idle,
                action: "assemble"
            }
        ));
    }

    #[test]
    fn stop_before_start_rejected() {
        let (phrases, lexicon, config) = parts();
        let mut assembler = NarrativeAssembler::new(&phrases, &lexicon, &config);
        let mut store = MemoryStore::parse_ron(LEAGUE).unwrap();
        let mut synonyms = SynonymRegistry::new();
        assert!(assembler.stop(&mut store, &mut synonyms).is_err());
    }

    #[test]
    fn flags_set_at_start_and_cleared_at_stop() {
        let (phrases, lexicon, config) = parts();
        let mut assembler = NarrativeAssembler::new(&phrases, &lexicon, &config);
        let mut store = MemoryStore::parse_ron(LEAGUE).unwrap();
        let mut synonyms = SynonymRegistry::new();
        let mut sampler = ScriptedSampler::first();

        assembler
            .start(&store, MatchId(1), ReportOptions::default(), &mut sampler)
            .unwrap();
        assert_eq!(assembler.state(), AssemblerState::Started);
        let home = assembler.flags(TeamId(1));
        assert!(home.host && !home.guest);
        assert_eq!(home.result.as_deref(), Some("won"));
        let away = assembler.flags(TeamId(2));
        assert!(away.guest && !away.host);
        // Too few matches played for table descriptors.
        assert!(!home.leader && !away.bottom);

        let report = assembler.assemble(&mut synonyms, &mut sampler).unwrap();
        assert_eq!(assembler.state(), AssemblerState::Assembling(SectionKind::FirstGoal));
        assert_eq!(report.title, "Zimbru won 1:0");
        assert_eq!(
            report.sections[1].text,
            "Ivanov scored the only goal for Zimbru against Dacia."
        );

        assembler.stop(&mut store, &mut synonyms).unwrap();
        assert_eq!(assembler.state(), AssemblerState::Stopped);
        assert!(!assembler.context().has_flags());
    }

    #[test]
    fn referring_expressions_are_linked() {
        let (phrases, lexicon, config) = parts();
        let mut assembler = NarrativeAssembler::new(&phrases, &lexicon, &config);
        let store = MemoryStore::parse_ron(LEAGUE).unwrap();
        let mut synonyms = SynonymRegistry::new();
        let mut sampler = ScriptedSampler::first();
        assembler
            .start(&store, MatchId(1), ReportOptions::default(), &mut sampler)
            .unwrap();
        let report = assembler.assemble(&mut synonyms, &mut sampler).unwrap();
        assert_eq!(
            report.sections[0].text,
            "<a href=\"/divizia-nationala/zimbru/\" title=\"Zimbru\">Zimbru</a> beat \
             <a href=\"/divizia-nationala/dacia/\" title=\"Dacia\">Dacia</a>"
        );
    }

    #[test]
    fn vocabulary_per_category() {
        assert!(section_roles(PhraseCategory::GoalGroup).contains(&"recipient"));
        assert!(!section_roles(PhraseCategory::Title).contains(&"team"));
        assert!(section_fields(PhraseCategory::GoalGroup).contains(&"authors"));
        assert!(!section_fields(PhraseCategory::GoalGroup).contains(&"goal.what"));
        assert!(section_fields(PhraseCategory::Conclusion).contains(&"displaced_points"));
    }
}
