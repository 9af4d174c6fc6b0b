use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a phrase template. Unique across a whole phrase bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub u32);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The template pools of a report. The title and the lead-in paragraph
/// share the `Title` pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhraseCategory {
    Title,
    PriorMeeting,
    FirstGoal,
    RegularGoal,
    GoalGroup,
    LastGoal,
    Conclusion,
}

impl PhraseCategory {
    pub const ALL: [PhraseCategory; 7] = [
        Self::Title,
        Self::PriorMeeting,
        Self::FirstGoal,
        Self::RegularGoal,
        Self::GoalGroup,
        Self::LastGoal,
        Self::Conclusion,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::PriorMeeting => "prior_meeting",
            Self::FirstGoal => "first_goal",
            Self::RegularGoal => "regular_goal",
            Self::GoalGroup => "goal_group",
            Self::LastGoal => "last_goal",
            Self::Conclusion => "conclusion",
        }
    }
}

impl fmt::Display for PhraseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An inclusive numeric range predicate. A missing bound leaves that side
/// open; with both bounds missing the predicate always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

impl Bounds {
    pub fn new(min: i64, max: i64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: i64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Eligibility predicates attached to a template.
///
/// Every `Option<bool>` is a tri-state: `None` matches any fact value,
/// `Some(b)` requires the fact to equal `b`. Which fields are consulted
/// depends on the template's category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Predicates {
    // Title
    pub score_diff: Bounds,
    pub total_goals: Bounds,
    pub last_goal_final: Option<bool>,
    pub win_streak: Option<bool>,
    pub lose_streak: Option<bool>,
    pub with_champion: Option<bool>,
    pub surprise: Option<bool>,
    pub top_clash: Option<bool>,

    // Goals
    pub minute: Bounds,
    pub only: Option<bool>,
    pub equalizer: Option<bool>,
    pub reversal: Option<bool>,
    pub winning: Option<bool>,
    pub first_group: Option<bool>,
    pub double: Option<bool>,
    pub triple: Option<bool>,
    pub penalty: Option<bool>,
    pub own_goal: Option<bool>,

    // Prior meeting
    pub prior_loser: Option<bool>,
    pub revenge: Option<bool>,
    pub draw: Option<bool>,

    // Conclusion
    pub promotion: Option<bool>,
    pub relegation: Option<bool>,
}

/// Tri-state match: a wildcard accepts anything.
pub fn accepts(predicate: Option<bool>, fact: bool) -> bool {
    predicate.map_or(true, |expected| expected == fact)
}
