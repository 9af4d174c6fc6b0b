use chrono::NaiveDate;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::record::{AntiRepeatState, StandingsSnapshot};

/// Newtype wrapper for season IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonId(pub u32);

/// Newtype wrapper for competition IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompetitionId(pub u32);

/// Newtype wrapper for team IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub u32);

/// Newtype wrapper for match IDs. Match IDs increase monotonically and
/// double as the chronological order of the match log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub u64);

impl MatchId {
    /// The ID immediately before this one, or `None` for the first match.
    pub fn previous(self) -> Option<MatchId> {
        self.0.checked_sub(1).map(MatchId)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competition {
    pub id: CompetitionId,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub country: Option<String>,
}

/// A club registered in one competition for one or more seasons.
///
/// Teams are immutable reference data. Per-report state such as "hosting
/// this match" or "top of the table" lives in [`TeamFlags`], owned by the
/// report being assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub coach: Option<String>,
    pub competition: CompetitionId,
    #[serde(default)]
    pub seasons: FxHashSet<SeasonId>,
    /// Points deducted by the league.
    #[serde(default)]
    pub penalties: i32,
}

impl Team {
    pub fn plays_in(&self, season: SeasonId, competition: CompetitionId) -> bool {
        self.competition == competition && self.seasons.contains(&season)
    }
}

/// Transient per-report state of a team. Set when a report starts and
/// dropped when it stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamFlags {
    pub host: bool,
    pub guest: bool,
    pub leader: bool,
    pub bottom: bool,
    /// Short description of this team's result ("won", "drew", ...).
    pub result: Option<String>,
}

/// The outcome of a match from one team's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub season: SeasonId,
    pub competition: CompetitionId,
    pub home: TeamId,
    pub away: TeamId,
    #[serde(default)]
    pub home_goals: u32,
    #[serde(default)]
    pub away_goals: u32,
    pub date: NaiveDate,
    #[serde(default = "default_finished")]
    pub finished: bool,
    /// Cached standings as of this match.
    #[serde(default)]
    pub standings: Option<StandingsSnapshot>,
    /// Template ids used by the last report written for this match.
    #[serde(default)]
    pub anti_repeat: Option<AntiRepeatState>,
}

fn default_finished() -> bool {
    true
}

impl Match {
    pub fn involves(&self, team: TeamId) -> bool {
        self.home == team || self.away == team
    }

    pub fn winner(&self) -> Option<TeamId> {
        match self.home_goals.cmp(&self.away_goals) {
            std::cmp::Ordering::Greater => Some(self.home),
            std::cmp::Ordering::Less => Some(self.away),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn loser(&self) -> Option<TeamId> {
        match self.home_goals.cmp(&self.away_goals) {
            std::cmp::Ordering::Greater => Some(self.away),
            std::cmp::Ordering::Less => Some(self.home),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// The outcome for `team`, or `None` if it did not play.
    pub fn outcome_for(&self, team: TeamId) -> Option<Outcome> {
        if !self.involves(team) {
            return None;
        }
        Some(match self.winner() {
            Some(winner) if winner == team => Outcome::Win,
            Some(_) => Outcome::Loss,
            None => Outcome::Draw,
        })
    }

    /// Goals (scored, conceded) by `team` in this match.
    pub fn goals_for(&self, team: TeamId) -> (u32, u32) {
        if team == self.home {
            (self.home_goals, self.away_goals)
        } else {
            (self.away_goals, self.home_goals)
        }
    }

    pub fn opponent_of(&self, team: TeamId) -> TeamId {
        if team == self.home {
            self.away
        } else {
            self.home
        }
    }

    pub fn score_difference(&self) -> u32 {
        self.home_goals.abs_diff(self.away_goals)
    }

    pub fn total_goals(&self) -> u32 {
        self.home_goals + self.away_goals
    }

    /// Score as "home:away".
    pub fn score(&self) -> String {
        format!("{}:{}", self.home_goals, self.away_goals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_match(home_goals: u32, away_goals: u32) -> Match {
        Match {
            id: MatchId(10),
            season: SeasonId(1),
            competition: CompetitionId(1),
            home: TeamId(1),
            away: TeamId(2),
            home_goals,
            away_goals,
            date: NaiveDate::from_ymd_opt(2015, 8, 23).unwrap(),
            finished: true,
            standings: None,
            anti_repeat: None,
        }
    }

    #[test]
    fn winner_and_loser() {
        let m = make_match(2, 1);
        assert_eq!(m.winner(), Some(TeamId(1)));
        assert_eq!(m.loser(), Some(TeamId(2)));
        assert_eq!(m.outcome_for(TeamId(2)), Some(Outcome::Loss));
        assert_eq!(m.outcome_for(TeamId(3)), None);
    }

    #[test]
    fn draw_has_no_winner() {
        let m = make_match(1, 1);
        assert_eq!(m.winner(), None);
        assert_eq!(m.loser(), None);
        assert_eq!(m.outcome_for(TeamId(1)), Some(Outcome::Draw));
    }

    #[test]
    fn goals_from_each_side() {
        let m = make_match(3, 0);
        assert_eq!(m.goals_for(TeamId(1)), (3, 0));
        assert_eq!(m.goals_for(TeamId(2)), (0, 3));
        assert_eq!(m.score_difference(), 3);
        assert_eq!(m.total_goals(), 3);
        assert_eq!(m.score(), "3:0");
    }

    #[test]
    fn previous_match_id() {
        assert_eq!(MatchId(5).previous(), Some(MatchId(4)));
        assert_eq!(MatchId(0).previous(), None);
    }

    #[test]
    fn team_registration() {
        let team = Team {
            id: TeamId(1),
            name: "Zimbru".to_string(),
            slug: "zimbru".to_string(),
            city: Some("Chisinau".to_string()),
            coach: None,
            competition: CompetitionId(1),
            seasons: [SeasonId(1)].into_iter().collect(),
            penalties: 0,
        };
        assert!(team.plays_in(SeasonId(1), CompetitionId(1)));
        assert!(!team.plays_in(SeasonId(2), CompetitionId(1)));
        assert!(!team.plays_in(SeasonId(1), CompetitionId(2)));
    }
}
