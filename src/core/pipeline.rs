/// The report pipeline: match id in, report out.
///
/// Wires the phrase bank, lexicon, synonym registry and sampler into a
/// [`NarrativeAssembler`] per generation.

use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::config::{ConfigError, EngineConfig};
use crate::core::assembler::{AssemblerState, NarrativeAssembler};
use crate::core::context::SectionKind;
use crate::core::facts::{FactContext, ReportFacts};
use crate::core::grammar::{typeset, GrammarError};
use crate::core::phrase_bank::{PhraseBank, PhraseBankError};
use crate::core::sampler::{Sampler, SeededSampler};
use crate::core::store::{LeagueStore, StoreError};
use crate::core::variant::{Lexicon, LexiconError};
use crate::core::variety::{SynonymError, SynonymHandle, SynonymRegistry};
use crate::schema::league::MatchId;
use crate::schema::phrase::{PhraseCategory, TemplateId};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),
    #[error("phrase bank error: {0}")]
    PhraseBank(#[from] PhraseBankError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("lexicon error: {0}")]
    Lexicon(#[from] LexiconError),
    #[error("synonym error: {0}")]
    Synonym(#[from] SynonymError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no eligible {category} template for facts {facts:?}")]
    NoEligibleTemplate {
        category: PhraseCategory,
        facts: Box<FactContext>,
    },
    #[error("cannot {action} while the assembler is {state:?}")]
    InvalidState {
        state: AssemblerState,
        action: &'static str,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Prefix every section with its template id and persist nothing.
    pub debug: bool,
    /// Start from fresh anti-repeat state and recompute the match's table.
    pub regenerate: bool,
}

/// One rendered section of a report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSection {
    pub kind: SectionKind,
    pub template: TemplateId,
    pub text: String,
}

/// A generated match report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub match_id: MatchId,
    pub title: String,
    pub title_template: TemplateId,
    /// Body sections in writing order, the lead-in first.
    pub sections: Vec<ReportSection>,
    pub facts_used: ReportFacts,
}

impl Report {
    pub fn section_texts(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn templates(&self) -> Vec<TemplateId> {
        std::iter::once(self.title_template)
            .chain(self.sections.iter().map(|s| s.template))
            .collect()
    }

    pub fn count(&self, kind: SectionKind) -> usize {
        self.sections.iter().filter(|s| s.kind == kind).count()
    }

    /// Body paragraphs. Consecutive goal narratives share a paragraph.
    pub fn paragraphs(&self) -> Vec<String> {
        let mut paragraphs: Vec<String> = Vec::new();
        let mut in_goals = false;
        for section in &self.sections {
            let goal = section.kind.is_goal_narrative();
            match paragraphs.last_mut() {
                Some(last) if goal && in_goals => {
                    last.push(' ');
                    last.push_str(&section.text);
                }
                _ => paragraphs.push(section.text.clone()),
            }
            in_goals = goal;
        }
        paragraphs
            .iter()
            .map(|p| typeset(p))
            .filter(|p| !p.is_empty())
            .collect()
    }

    pub fn body(&self) -> String {
        self.paragraphs().join("\n\n")
    }
}

/// The report generator. Built via `ReportEngine::builder()`.
pub struct ReportEngine {
    phrases: PhraseBank,
    lexicon: Lexicon,
    synonyms: SynonymHandle,
    config: EngineConfig,
    sampler: Box<dyn Sampler>,
}

/// Builder for constructing a `ReportEngine`.
pub struct ReportEngineBuilder {
    phrase_bank_paths: Vec<String>,
    lexicon_path: Option<String>,
    synonyms_path: Option<String>,
    config_path: Option<String>,
    seed: Option<u64>,
    /// Directly provided phrase bank (for testing without files).
    phrases: Option<PhraseBank>,
    /// Directly provided lexicon (for testing without files).
    lexicon: Option<Lexicon>,
    /// Directly provided synonym registry, possibly shared with other engines.
    synonyms: Option<SynonymHandle>,
    sampler: Option<Box<dyn Sampler>>,
    config: Option<EngineConfig>,
}

impl ReportEngine {
    pub fn builder() -> ReportEngineBuilder {
        ReportEngineBuilder {
            phrase_bank_paths: Vec::new(),
            lexicon_path: None,
            synonyms_path: None,
            config_path: None,
            seed: None,
            phrases: None,
            lexicon: None,
            synonyms: None,
            sampler: None,
            config: None,
        }
    }

    /// Generate the report of match `match_id`.
    ///
    /// The synonym registry stays locked for the whole generation, so
    /// engines sharing one registry produce reports one at a time.
    pub fn generate_report(
        &mut self,
        store: &mut dyn LeagueStore,
        match_id: MatchId,
        options: ReportOptions,
    ) -> Result<Report, PipelineError> {
        let synonyms = self.synonyms.clone();
        let mut registry = synonyms.lock();
        let sampler = self.sampler.as_mut();
        let mut assembler = NarrativeAssembler::new(&self.phrases, &self.lexicon, &self.config);

        let result = run(&mut assembler, store, match_id, options, &mut registry, sampler);
        if result.is_err() && assembler.state() != AssemblerState::Stopped {
            assembler.abort(&mut registry);
        }
        result
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phrase_bank(&self) -> &PhraseBank {
        &self.phrases
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn synonyms(&self) -> &SynonymHandle {
        &self.synonyms
    }
}

fn run(
    assembler: &mut NarrativeAssembler<'_>,
    store: &mut dyn LeagueStore,
    match_id: MatchId,
    options: ReportOptions,
    synonyms: &mut SynonymRegistry,
    sampler: &mut dyn Sampler,
) -> Result<Report, PipelineError> {
    assembler.start(&*store, match_id, options, &mut *sampler)?;
    let report = assembler.assemble(synonyms, sampler)?;
    assembler.stop(store, synonyms)?;
    Ok(report)
}

impl ReportEngineBuilder {
    /// A phrase bank file, or a directory of them. May be given repeatedly.
    pub fn phrase_bank_path(mut self, path: &str) -> Self {
        self.phrase_bank_paths.push(path.to_string());
        self
    }

    pub fn lexicon_path(mut self, path: &str) -> Self {
        self.lexicon_path = Some(path.to_string());
        self
    }

    pub fn synonyms_path(mut self, path: &str) -> Self {
        self.synonyms_path = Some(path.to_string());
        self
    }

    pub fn config_path(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    /// Overrides the configured seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Provide a phrase bank directly (for testing without files).
    pub fn with_phrase_bank(mut self, phrases: PhraseBank) -> Self {
        self.phrases = Some(phrases);
        self
    }

    /// Provide a lexicon directly (for testing without files).
    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = Some(lexicon);
        self
    }

    pub fn with_synonyms(mut self, synonyms: SynonymHandle) -> Self {
        self.synonyms = Some(synonyms);
        self
    }

    /// Replace the seeded sampler, e.g. with a scripted one in tests.
    pub fn with_sampler(mut self, sampler: Box<dyn Sampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn build(self) -> Result<ReportEngine, PipelineError> {
        let mut config = match &self.config_path {
            Some(path) => EngineConfig::load_from_ron(Path::new(path))?,
            None => self.config.unwrap_or_default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.validate()?;

        let mut phrases = self.phrases.unwrap_or_default();
        for path in &self.phrase_bank_paths {
            let path = Path::new(path);
            if path.is_dir() {
                load_ron_files_from_dir(path, |file| {
                    phrases.merge(PhraseBank::load_from_ron(file)?)?;
                    Ok(())
                })?;
            } else if path.exists() {
                phrases.merge(PhraseBank::load_from_ron(path)?)?;
            } else {
                warn!(path = %path.display(), "phrase bank path does not exist");
            }
        }

        let lexicon = match &self.lexicon_path {
            Some(path) => Lexicon::load_from_ron(Path::new(path))?,
            None => self.lexicon.unwrap_or_default(),
        };

        let synonyms = match (self.synonyms, &self.synonyms_path) {
            (Some(handle), Some(path)) => {
                handle.lock().merge(SynonymRegistry::load_from_ron(Path::new(path))?);
                handle
            }
            (Some(handle), None) => handle,
            (None, Some(path)) => SynonymHandle::new(SynonymRegistry::load_from_ron(Path::new(path))?),
            (None, None) => SynonymHandle::default(),
        };

        let sampler = self
            .sampler
            .unwrap_or_else(|| Box::new(SeededSampler::new(config.seed)));

        Ok(ReportEngine {
            phrases,
            lexicon,
            synonyms,
            config,
            sampler,
        })
    }
}

/// Load all .ron files from a directory in name order, calling `loader`
/// for each.
fn load_ron_files_from_dir<F>(dir: &Path, mut loader: F) -> Result<(), PipelineError>
where
    F: FnMut(&Path) -> Result<(), PipelineError>,
{
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            paths.push(path);
        }
    }
    paths.sort();
    for path in paths {
        loader(&path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sampler::ScriptedSampler;
    use crate::core::store::MemoryStore;
    use crate::schema::record::ANTI_REPEAT_VERSION;

    const LEAGUE: &str = r#"(
        seasons: [(id: 1, title: "2015/16")],
        competitions: [(id: 1, title: "Divizia Nationala", slug: "divizia-nationala")],
        teams: [
            (id: 1, name: "Zimbru", slug: "zimbru", city: Some("Chisinau"), competition: 1, seasons: [1]),
            (id: 2, name: "Dacia", slug: "dacia", competition: 1, seasons: [1]),
        ],
        matches: [
            (id: 1, season: 1, competition: 1, home: 1, away: 2, home_goals: 2, away_goals: 1, date: "2015-07-25"),
            (id: 2, season: 1, competition: 1, home: 2, away: 1, home_goals: 0, away_goals: 0, date: "2015-10-03"),
        ],
        goals: [
            (match_id: 1, minute: 12, team: 1, scorer: Some("Ivanov")),
            (match_id: 1, minute: 50, team: 2, scorer: Some("Popa")),
            (match_id: 1, minute: 88, team: 1, scorer: Some("Ivanov")),
        ],
    )"#;

    const PHRASES: &str = r#"(
        title: [
            (id: 1, text: "{winner.name} edge {loser.name}", when: (score_diff: (min: Some(1), max: Some(1)))),
            (id: 2, text: "{winner.name} beat {loser.name} {score}", when: (score_diff: (min: Some(1), max: Some(1)))),
            (id: 3, text: "Stalemate in {competition}", when: (score_diff: (min: Some(0), max: Some(0)))),
            (id: 4, text: "Nothing between {home.name} and {away.name}", when: (score_diff: (min: Some(0), max: Some(0)))),
        ],
        prior_meeting: [
            (id: 10, text: "Last time it ended {prior_score}."),
        ],
        first_goal: [
            (id: 20, text: "{goal.scorer} opened the scoring in minute {goal.minute}."),
        ],
        regular_goal: [
            (id: 30, text: "{goal.scorer} made it {goal.score}."),
        ],
        goal_group: [
            (id: 40, text: "{authors} scored for {team.name}."),
        ],
        last_goal: [
            (id: 50, text: "{goal.scorer} settled it at {goal.score}."),
        ],
        conclusion: [
            (id: 60, text: "{home.name} have {home_points} points."),
        ],
    )"#;

    fn engine() -> ReportEngine {
        ReportEngine::builder()
            .with_phrase_bank(PhraseBank::parse_ron(PHRASES).unwrap())
            .with_sampler(Box::new(ScriptedSampler::first()))
            .build()
            .unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::parse_ron(LEAGUE).unwrap()
    }

    #[test]
    fn report_sections_in_order() {
        let mut store = store();
        let report = engine()
            .generate_report(&mut store, MatchId(1), ReportOptions::default())
            .unwrap();
        assert_eq!(report.title, "Zimbru edge Dacia");
        assert_eq!(report.title_template, TemplateId(1));
        let kinds: Vec<SectionKind> = report.sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Lead,
                SectionKind::FirstGoal,
                SectionKind::RegularGoal,
                SectionKind::LastGoal,
            ]
        );
        assert_eq!(report.sections[0].text, "Zimbru beat Dacia 2:1");
        assert_eq!(report.sections[1].text, "Ivanov opened the scoring in minute 12.");
        assert_eq!(report.sections[3].text, "Ivanov settled it at 2:1.");
    }

    #[test]
    fn lead_never_repeats_title() {
        let mut store = store();
        let report = engine()
            .generate_report(&mut store, MatchId(1), ReportOptions::default())
            .unwrap();
        assert_ne!(report.title_template, report.sections[0].template);
    }

    #[test]
    fn prior_meeting_and_goalless_match() {
        let mut store = store();
        let report = engine()
            .generate_report(&mut store, MatchId(2), ReportOptions::default())
            .unwrap();
        assert_eq!(report.title, "Stalemate in Divizia Nationala");
        assert_eq!(report.section_texts(), vec!["Nothing between Dacia and Zimbru", "Last time it ended 2:1."]);
    }

    #[test]
    fn state_persisted_on_match() {
        let mut store = store();
        engine()
            .generate_report(&mut store, MatchId(1), ReportOptions::default())
            .unwrap();
        let game = store.match_ref(MatchId(1)).unwrap();
        let used = game.anti_repeat.as_ref().unwrap();
        assert_eq!(used.version, ANTI_REPEAT_VERSION);
        assert_eq!(used.title, Some(TemplateId(1)));
        assert_eq!(used.lead, Some(TemplateId(2)));
        assert_eq!(used.regular, vec![TemplateId(30)]);
        assert!(game.standings.is_some());
    }

    #[test]
    fn debug_annotates_and_persists_nothing() {
        let mut store = store();
        let options = ReportOptions {
            debug: true,
            regenerate: false,
        };
        let report = engine().generate_report(&mut store, MatchId(1), options).unwrap();
        assert_eq!(report.title, "(1) Zimbru edge Dacia");
        assert!(report.sections[1].text.starts_with("(20) "));
        let game = store.match_ref(MatchId(1)).unwrap();
        assert!(game.anti_repeat.is_none());
        assert!(game.standings.is_none());
    }

    #[test]
    fn missing_template_is_an_error() {
        let mut store = store();
        let phrases = PHRASES.replace(r#"(id: 50, text: "{goal.scorer} settled it at {goal.score}."),"#, "");
        let mut engine = ReportEngine::builder()
            .with_phrase_bank(PhraseBank::parse_ron(&phrases).unwrap())
            .with_sampler(Box::new(ScriptedSampler::first()))
            .build()
            .unwrap();
        let err = engine
            .generate_report(&mut store, MatchId(1), ReportOptions::default())
            .unwrap_err();
        match err {
            PipelineError::NoEligibleTemplate { category, .. } => {
                assert_eq!(category, PhraseCategory::LastGoal)
            }
            other => panic!("unexpected error: {other}"),
        }
        let game = store.match_ref(MatchId(1)).unwrap();
        assert!(game.anti_repeat.is_none());
        assert!(game.standings.is_none());
    }

    #[test]
    fn paragraphs_merge_goal_narratives() {
        let section = |kind, text: &str| ReportSection {
            kind,
            template: TemplateId(0),
            text: text.to_string(),
        };
        let mut store = store();
        let mut report = engine()
            .generate_report(&mut store, MatchId(1), ReportOptions::default())
            .unwrap();
        report.sections = vec![
            section(SectionKind::Lead, "Lead ."),
            section(SectionKind::GoalGroup, "One."),
            section(SectionKind::RegularGoal, "Two."),
            section(SectionKind::LastGoal, "Three."),
        ];
        assert_eq!(report.paragraphs(), vec!["Lead.", "One. Two.", "Three."]);
        assert_eq!(report.body(), "Lead.\n\nOne. Two.\n\nThree.");
        assert_eq!(report.count(SectionKind::RegularGoal), 1);
    }
}
