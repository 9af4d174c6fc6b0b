//! Records persisted on a match by report generation.

use serde::{Deserialize, Serialize};

use super::league::{MatchId, TeamId};
use super::phrase::TemplateId;

/// Current layout of [`StandingsSnapshot`].
pub const STANDINGS_VERSION: u32 = 1;
/// Current layout of [`AntiRepeatState`].
pub const ANTI_REPEAT_VERSION: u32 = 1;

/// One line of the league table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub team: TeamId,
    pub points: i32,
    pub goal_diff: i32,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

/// The league table as of a match, best team first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsSnapshot {
    pub version: u32,
    pub match_id: MatchId,
    pub rows: Vec<StandingsRow>,
}

impl StandingsSnapshot {
    pub fn new(match_id: MatchId, rows: Vec<StandingsRow>) -> Self {
        Self {
            version: STANDINGS_VERSION,
            match_id,
            rows,
        }
    }

    pub fn is_current(&self) -> bool {
        self.version == STANDINGS_VERSION
    }

    /// 1-based position of `team`, if it is in the table.
    pub fn rank(&self, team: TeamId) -> Option<usize> {
        self.rows.iter().position(|row| row.team == team).map(|i| i + 1)
    }

    pub fn row(&self, team: TeamId) -> Option<&StandingsRow> {
        self.rows.iter().find(|row| row.team == team)
    }

    /// The team at 1-based position `rank`.
    pub fn team_at(&self, rank: usize) -> Option<TeamId> {
        rank.checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .map(|row| row.team)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Template ids already used in the report of one match.
///
/// Single-slot sections keep the last id drawn; goal narratives accumulate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiRepeatState {
    pub version: u32,
    #[serde(default)]
    pub title: Option<TemplateId>,
    #[serde(default)]
    pub lead: Option<TemplateId>,
    #[serde(default)]
    pub prior_meeting: Option<TemplateId>,
    #[serde(default)]
    pub first: Option<TemplateId>,
    #[serde(default)]
    pub group: Vec<TemplateId>,
    #[serde(default)]
    pub regular: Vec<TemplateId>,
    #[serde(default)]
    pub last: Option<TemplateId>,
    #[serde(default)]
    pub conclusion: Option<TemplateId>,
}

impl Default for AntiRepeatState {
    fn default() -> Self {
        Self {
            version: ANTI_REPEAT_VERSION,
            title: None,
            lead: None,
            prior_meeting: None,
            first: None,
            group: Vec::new(),
            regular: Vec::new(),
            last: None,
            conclusion: None,
        }
    }
}

impl AntiRepeatState {
    pub fn is_current(&self) -> bool {
        self.version == ANTI_REPEAT_VERSION
    }

    /// Every id recorded in any slot.
    pub fn all_ids(&self) -> Vec<TemplateId> {
        let singles = [
            self.title,
            self.lead,
            self.prior_meeting,
            self.first,
            self.last,
            self.conclusion,
        ];
        singles
            .into_iter()
            .flatten()
            .chain(self.group.iter().copied())
            .chain(self.regular.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(team: u32, points: i32) -> StandingsRow {
        StandingsRow {
            team: TeamId(team),
            points,
            goal_diff: 0,
            played: 1,
            wins: 0,
            draws: 0,
            losses: 0,
            goals_for: 0,
            goals_against: 0,
        }
    }

    #[test]
    fn rank_is_one_based() {
        let table = StandingsSnapshot::new(MatchId(1), vec![row(7, 3), row(4, 0)]);
        assert_eq!(table.rank(TeamId(7)), Some(1));
        assert_eq!(table.rank(TeamId(4)), Some(2));
        assert_eq!(table.rank(TeamId(9)), None);
        assert_eq!(table.team_at(2), Some(TeamId(4)));
        assert_eq!(table.team_at(0), None);
        assert_eq!(table.team_at(3), None);
    }

    #[test]
    fn fresh_anti_repeat_state_is_empty() {
        let state = AntiRepeatState::default();
        assert!(state.is_current());
        assert!(state.all_ids().is_empty());
    }

    #[test]
    fn anti_repeat_state_ron_round_trip() {
        let state = AntiRepeatState {
            title: Some(TemplateId(3)),
            regular: vec![TemplateId(40), TemplateId(41)],
            ..AntiRepeatState::default()
        };
        let text = ron::to_string(&state).unwrap();
        let back: AntiRepeatState = ron::from_str(&text).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.all_ids().len(), 3);
    }

    #[test]
    fn outdated_version_detected() {
        let state = AntiRepeatState {
            version: 0,
            ..AntiRepeatState::default()
        };
        assert!(!state.is_current());
    }
}
