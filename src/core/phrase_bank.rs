/// Categorized phrase templates and eligibility matching.
///
/// Each category has a table of [`MatchRule`]s. For a fact context the
/// matcher activates at most one streak-override rule (which replaces the
/// base tier), otherwise every base rule, and then every additive rule that
/// applies. A template is eligible when any active rule accepts it and its
/// id is not excluded.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::core::facts::FactContext;
use crate::core::grammar::{GrammarError, Template};
use crate::core::sampler::{choose, Sampler};
use crate::schema::phrase::{accepts, Bounds, PhraseCategory, Predicates, TemplateId};

#[derive(Debug, Error)]
pub enum PhraseBankError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("duplicate template id {0}")]
    DuplicateId(TemplateId),
    #[error("template {id}: {source}")]
    Template {
        id: TemplateId,
        #[source]
        source: GrammarError,
    },
}

/// A phrase template with its eligibility predicates.
#[derive(Debug, Clone)]
pub struct PhraseTemplate {
    pub id: TemplateId,
    pub category: PhraseCategory,
    pub text: String,
    pub template: Template,
    pub predicates: Predicates,
}

/// Precedence tier of a matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTier {
    /// Replaces the base tier when it applies. The first applying rule wins.
    StreakOverride,
    Base,
    /// Added to whichever tier is active.
    Additive,
}

/// One eligibility rule of a category.
#[derive(Clone, Copy)]
pub struct MatchRule {
    pub name: &'static str,
    pub tier: RuleTier,
    /// Whether the rule takes part for these facts.
    pub applies: fn(&FactContext) -> bool,
    /// Whether a template's predicates satisfy the rule.
    pub accepts: fn(&Predicates, &FactContext) -> bool,
}

impl std::fmt::Debug for MatchRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchRule")
            .field("name", &self.name)
            .field("tier", &self.tier)
            .finish()
    }
}

fn always(_: &FactContext) -> bool {
    true
}

fn common(p: &Predicates, f: &FactContext) -> bool {
    accepts(p.surprise, f.surprise) && accepts(p.top_clash, f.top_clash)
}

/// A title template not reserved for streaks or the league leader.
fn plain_title(p: &Predicates) -> bool {
    p.with_champion.is_none() && p.win_streak != Some(true) && p.lose_streak != Some(true)
}

/// A template tied to the league leader only fits when the leader facts hold.
fn leader_fits(p: &Predicates, f: &FactContext) -> bool {
    match p.with_champion {
        Some(true) => f.winner_leads,
        Some(false) => f.loser_was_leader,
        None => true,
    }
}

fn is_streak(p: &Predicates) -> bool {
    p.win_streak == Some(true) || p.lose_streak == Some(true)
}

fn within(bounds: &Bounds, value: i64) -> bool {
    !bounds.is_unbounded() && bounds.contains(value)
}

const TITLE_RULES: &[MatchRule] = &[
    MatchRule {
        name: "lose_streak",
        tier: RuleTier::StreakOverride,
        applies: |f| f.lose_series,
        accepts: |p, f| p.lose_streak == Some(true) && leader_fits(p, f) && common(p, f),
    },
    MatchRule {
        name: "win_streak",
        tier: RuleTier::StreakOverride,
        applies: |f| f.win_series,
        accepts: |p, f| p.win_streak == Some(true) && leader_fits(p, f) && common(p, f),
    },
    MatchRule {
        name: "score_diff",
        tier: RuleTier::Base,
        applies: always,
        accepts: |p, f| {
            plain_title(p)
                && within(&p.score_diff, f.score_diff)
                && p.total_goals.is_unbounded()
                && accepts(p.last_goal_final, f.last_goal_final)
                && common(p, f)
        },
    },
    MatchRule {
        name: "total_goals",
        tier: RuleTier::Base,
        applies: always,
        accepts: |p, f| {
            plain_title(p)
                && within(&p.total_goals, f.total_goals)
                && p.score_diff.is_unbounded()
                && common(p, f)
        },
    },
    MatchRule {
        name: "score_and_total",
        tier: RuleTier::Base,
        applies: always,
        accepts: |p, f| {
            plain_title(p)
                && within(&p.score_diff, f.score_diff)
                && within(&p.total_goals, f.total_goals)
                && common(p, f)
        },
    },
    MatchRule {
        name: "leader_won",
        tier: RuleTier::Additive,
        applies: |f| f.winner_leads && !f.lose_series,
        accepts: |p, f| p.with_champion == Some(true) && !is_streak(p) && common(p, f),
    },
    MatchRule {
        name: "leader_lost",
        tier: RuleTier::Additive,
        applies: |f| f.loser_was_leader,
        accepts: |p, f| p.with_champion == Some(false) && !is_streak(p) && common(p, f),
    },
];

const PRIOR_MEETING_RULES: &[MatchRule] = &[MatchRule {
    name: "prior_meeting",
    tier: RuleTier::Base,
    applies: always,
    accepts: |p, f| {
        accepts(p.prior_loser, f.prior_loser)
            && accepts(p.revenge, f.revenge)
            && accepts(p.draw, f.draw)
    },
}];

const FIRST_GOAL_RULES: &[MatchRule] = &[MatchRule {
    name: "first_goal",
    tier: RuleTier::Base,
    applies: always,
    accepts: |p, f| accepts(p.only, f.only) && p.minute.contains(f.minute),
}];

const REGULAR_GOAL_RULES: &[MatchRule] = &[MatchRule {
    name: "regular_goal",
    tier: RuleTier::Base,
    applies: always,
    accepts: |p, f| {
        // A lone equaliser may use any equaliser wording.
        let equalizer_ok = (f.only && f.equalizer) || accepts(p.equalizer, f.equalizer);
        accepts(p.only, f.only)
            && equalizer_ok
            && accepts(p.reversal, f.reversal)
            && accepts(p.penalty, f.penalty)
            && accepts(p.own_goal, f.own_goal)
            && p.double != Some(true)
            && p.triple != Some(true)
    },
}];

const GOAL_GROUP_RULES: &[MatchRule] = &[MatchRule {
    name: "goal_group",
    tier: RuleTier::Base,
    applies: always,
    accepts: |p, f| {
        let outcome_ok = if f.equalizer {
            p.equalizer == Some(true)
        } else if f.reversal {
            p.reversal == Some(true)
        } else {
            true
        };
        accepts(p.first_group, f.first_group) && outcome_ok
    },
}];

const LAST_GOAL_RULES: &[MatchRule] = &[MatchRule {
    name: "last_goal",
    tier: RuleTier::Base,
    applies: always,
    accepts: |p, f| {
        accepts(p.only, f.only)
            && accepts(p.equalizer, f.equalizer)
            && accepts(p.reversal, f.reversal)
            && accepts(p.winning, f.winning)
            && accepts(p.penalty, f.penalty)
            && accepts(p.own_goal, f.own_goal)
            && p.minute.contains(f.minute)
    },
}];

const CONCLUSION_RULES: &[MatchRule] = &[MatchRule {
    name: "conclusion",
    tier: RuleTier::Base,
    applies: always,
    accepts: |p, f| accepts(p.promotion, f.promotion) && accepts(p.relegation, f.relegation),
}];

/// The rule table of a category.
pub fn rules_for(category: PhraseCategory) -> &'static [MatchRule] {
    match category {
        PhraseCategory::Title => TITLE_RULES,
        PhraseCategory::PriorMeeting => PRIOR_MEETING_RULES,
        PhraseCategory::FirstGoal => FIRST_GOAL_RULES,
        PhraseCategory::RegularGoal => REGULAR_GOAL_RULES,
        PhraseCategory::GoalGroup => GOAL_GROUP_RULES,
        PhraseCategory::LastGoal => LAST_GOAL_RULES,
        PhraseCategory::Conclusion => CONCLUSION_RULES,
    }
}

/// The rules active for `facts`, in precedence order.
pub fn active_rules(category: PhraseCategory, facts: &FactContext) -> Vec<&'static MatchRule> {
    let rules = rules_for(category);
    let mut active: Vec<&'static MatchRule> = match rules
        .iter()
        .find(|r| r.tier == RuleTier::StreakOverride && (r.applies)(facts))
    {
        Some(rule) => vec![rule],
        None => rules
            .iter()
            .filter(|r| r.tier == RuleTier::Base && (r.applies)(facts))
            .collect(),
    };
    active.extend(
        rules
            .iter()
            .filter(|r| r.tier == RuleTier::Additive && (r.applies)(facts)),
    );
    active
}

// RON file layout: one list of entries per category.

#[derive(Debug, Deserialize)]
struct RonEntry {
    id: TemplateId,
    text: String,
    #[serde(default)]
    when: Predicates,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RonPhraseBank {
    title: Vec<RonEntry>,
    prior_meeting: Vec<RonEntry>,
    first_goal: Vec<RonEntry>,
    regular_goal: Vec<RonEntry>,
    goal_group: Vec<RonEntry>,
    last_goal: Vec<RonEntry>,
    conclusion: Vec<RonEntry>,
}

/// All phrase templates, indexed by id. Ids are unique across categories.
#[derive(Debug, Clone, Default)]
pub struct PhraseBank {
    templates: Vec<PhraseTemplate>,
    index: FxHashMap<TemplateId, usize>,
}

impl PhraseBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a phrase bank from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<PhraseBank, PhraseBankError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a phrase bank from a RON string.
    pub fn parse_ron(input: &str) -> Result<PhraseBank, PhraseBankError> {
        let raw: RonPhraseBank = ron::from_str(input)?;
        let mut bank = PhraseBank::new();
        let sections = [
            (PhraseCategory::Title, raw.title),
            (PhraseCategory::PriorMeeting, raw.prior_meeting),
            (PhraseCategory::FirstGoal, raw.first_goal),
            (PhraseCategory::RegularGoal, raw.regular_goal),
            (PhraseCategory::GoalGroup, raw.goal_group),
            (PhraseCategory::LastGoal, raw.last_goal),
            (PhraseCategory::Conclusion, raw.conclusion),
        ];
        for (category, entries) in sections {
            for entry in entries {
                bank.add(category, entry.id, &entry.text, entry.when)?;
            }
        }
        Ok(bank)
    }

    /// Parse and add one template.
    pub fn add(
        &mut self,
        category: PhraseCategory,
        id: TemplateId,
        text: &str,
        predicates: Predicates,
    ) -> Result<(), PhraseBankError> {
        let template =
            Template::parse(text).map_err(|source| PhraseBankError::Template { id, source })?;
        self.insert(PhraseTemplate {
            id,
            category,
            text: text.to_string(),
            template,
            predicates,
        })
    }

    pub fn insert(&mut self, template: PhraseTemplate) -> Result<(), PhraseBankError> {
        if self.index.contains_key(&template.id) {
            return Err(PhraseBankError::DuplicateId(template.id));
        }
        self.index.insert(template.id, self.templates.len());
        self.templates.push(template);
        Ok(())
    }

    /// Add every template of `other`. Fails on the first id already present.
    pub fn merge(&mut self, other: PhraseBank) -> Result<(), PhraseBankError> {
        for template in other.templates {
            self.insert(template)?;
        }
        Ok(())
    }

    pub fn get(&self, id: TemplateId) -> Option<&PhraseTemplate> {
        self.index.get(&id).and_then(|i| self.templates.get(*i))
    }

    pub fn templates(&self, category: PhraseCategory) -> impl Iterator<Item = &PhraseTemplate> {
        self.templates.iter().filter(move |t| t.category == category)
    }

    pub fn all(&self) -> &[PhraseTemplate] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Ids of templates of `category` eligible for `facts`, ascending,
    /// excluding `exclude`.
    pub fn select_eligible(
        &self,
        category: PhraseCategory,
        facts: &FactContext,
        exclude: &[TemplateId],
    ) -> Vec<TemplateId> {
        let active = active_rules(category, facts);
        let mut eligible: Vec<TemplateId> = self
            .templates(category)
            .filter(|t| !exclude.contains(&t.id))
            .filter(|t| active.iter().any(|rule| (rule.accepts)(&t.predicates, facts)))
            .map(|t| t.id)
            .collect();
        eligible.sort();
        debug!(
            category = category.name(),
            rules = ?active.iter().map(|r| r.name).collect::<Vec<_>>(),
            eligible = eligible.len(),
            "templates matched"
        );
        eligible
    }

    /// A uniform draw from `eligible`. `None` when it is empty.
    pub fn choose(&self, eligible: &[TemplateId], sampler: &mut dyn Sampler) -> Option<&PhraseTemplate> {
        choose(sampler, eligible).and_then(|id| self.get(*id))
    }
}
