use serde::{Deserialize, Serialize};

use super::league::{MatchId, TeamId};

/// A goal scored in a match.
///
/// `team` is the side credited with the goal, so an own goal is credited to
/// the opponents of the player who scored it. `sequence` is the position of
/// the goal in its match, assigned once at ingestion and used to keep
/// same-minute goals in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalEvent {
    pub match_id: MatchId,
    #[serde(default)]
    pub sequence: u32,
    pub minute: u32,
    pub team: TeamId,
    #[serde(default)]
    pub scorer: Option<String>,
    #[serde(default)]
    pub assist: Option<String>,
    #[serde(default)]
    pub penalty: bool,
    #[serde(default)]
    pub own_goal: bool,
    /// The conceding side, when recorded.
    #[serde(default)]
    pub recipient: Option<TeamId>,
}

impl GoalEvent {
    /// Chronological sort key inside a match.
    pub fn order_key(&self) -> (u32, u32) {
        (self.minute, self.sequence)
    }
}
