/// Result streaks and table movement.

use serde::Serialize;
use tracing::debug;

use crate::core::standings::StandingsEngine;
use crate::core::store::{LeagueStore, StoreError};
use crate::schema::league::{MatchId, Outcome, TeamId};

/// A team that changed position in the table with the match, together
/// with the team that held that position before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movement {
    pub team: TeamId,
    pub rank: usize,
    pub points: i32,
    /// The team that held `rank` as of the previous match.
    pub other: TeamId,
    pub other_points: i32,
    pub other_rank: Option<usize>,
}

/// Streaks and promotion/relegation detection.
#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    match_count_threshold: u32,
}

impl TrendAnalyzer {
    pub fn new(match_count_threshold: u32) -> Self {
        Self {
            match_count_threshold,
        }
    }

    /// Consecutive wins scanning back from match `id`. Matches of every
    /// season and competition count.
    pub fn win_streak(&self, store: &dyn LeagueStore, team: TeamId, id: MatchId) -> Result<u32, StoreError> {
        streak(store, team, id, |outcome| outcome == Outcome::Win)
    }

    pub fn lose_streak(&self, store: &dyn LeagueStore, team: TeamId, id: MatchId) -> Result<u32, StoreError> {
        streak(store, team, id, |outcome| outcome == Outcome::Loss)
    }

    pub fn non_lose_streak(
        &self,
        store: &dyn LeagueStore,
        team: TeamId,
        id: MatchId,
    ) -> Result<u32, StoreError> {
        streak(store, team, id, |outcome| outcome != Outcome::Loss)
    }

    /// Whether rank-sensitive facts are evaluated for `team` at match `id`.
    pub fn rank_enabled(
        &self,
        store: &dyn LeagueStore,
        standings: &StandingsEngine,
        team: TeamId,
        id: MatchId,
    ) -> Result<bool, StoreError> {
        Ok(standings.season_match_count(store, team, id)? > self.match_count_threshold)
    }

    /// The team climbed the table with match `id`.
    pub fn promotion_movement(
        &self,
        store: &dyn LeagueStore,
        standings: &mut StandingsEngine,
        team: TeamId,
        id: MatchId,
    ) -> Result<Option<Movement>, StoreError> {
        self.movement(store, standings, team, id, |now, before| now < before)
    }

    /// The team dropped down the table with match `id`.
    pub fn relegation_movement(
        &self,
        store: &dyn LeagueStore,
        standings: &mut StandingsEngine,
        team: TeamId,
        id: MatchId,
    ) -> Result<Option<Movement>, StoreError> {
        self.movement(store, standings, team, id, |now, before| now > before)
    }

    fn movement(
        &self,
        store: &dyn LeagueStore,
        standings: &mut StandingsEngine,
        team: TeamId,
        id: MatchId,
        moved: fn(usize, usize) -> bool,
    ) -> Result<Option<Movement>, StoreError> {
        if !self.rank_enabled(store, standings, team, id)? {
            return Ok(None);
        }
        let (Some(rank), Some(before)) = (
            standings.rank(store, team, id)?,
            standings.rank_before(store, team, id)?,
        ) else {
            return Ok(None);
        };
        if !moved(rank, before) {
            return Ok(None);
        }

        let Some(previous) = id.previous() else {
            return Ok(None);
        };
        let competition = store.load_match(id)?.competition;
        let Some(reference) = store.latest_competition_match_up_to(competition, previous)? else {
            return Ok(None);
        };
        let Some(other) = standings.compute_standings(store, reference.id)?.team_at(rank) else {
            return Ok(None);
        };

        let movement = Movement {
            team,
            rank,
            points: standings.points(store, team, id)?,
            other,
            other_points: standings.points(store, other, id)?,
            other_rank: standings.rank(store, other, id)?,
        };
        debug!(team = team.0, from = before, to = rank, other = other.0, "table movement");
        Ok(Some(movement))
    }
}

fn streak(
    store: &dyn LeagueStore,
    team: TeamId,
    id: MatchId,
    counts: impl Fn(Outcome) -> bool,
) -> Result<u32, StoreError> {
    let mut n = 0;
    for game in store.load_team_matches_up_to(team, id)? {
        match game.outcome_for(team) {
            Some(outcome) if counts(outcome) => n += 1,
            _ => break,
        }
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::schema::league::{CompetitionId, Match, SeasonId, Team};
    use chrono::NaiveDate;

    fn team(id: u32) -> Team {
        Team {
            id: TeamId(id),
            name: format!("Team {}", id),
            slug: format!("team-{}", id),
            city: None,
            coach: None,
            competition: CompetitionId(1),
            seasons: [SeasonId(1), SeasonId(2)].into_iter().collect(),
            penalties: 0,
        }
    }

    fn game(id: u64, season: u32, home: u32, away: u32, score: (u32, u32)) -> Match {
        Match {
            id: MatchId(id),
            season: SeasonId(season),
            competition: CompetitionId(1),
            home: TeamId(home),
            away: TeamId(away),
            home_goals: score.0,
            away_goals: score.1,
            date: NaiveDate::from_ymd_opt(2015, 8, 1).unwrap() + chrono::Days::new(id * 7),
            finished: true,
            standings: None,
            anti_repeat: None,
        }
    }

    fn store(teams: &[u32], matches: Vec<Match>) -> MemoryStore {
        let mut store = MemoryStore::new();
        for id in teams {
            store.insert_team(team(*id));
        }
        for m in matches {
            store.insert_match(m);
        }
        store
    }

    #[test]
    fn win_streak_stops_at_first_non_win() {
        let s = store(
            &[1, 2],
            vec![
                game(1, 1, 1, 2, (0, 1)),
                game(2, 1, 1, 2, (2, 0)),
                game(3, 1, 2, 1, (0, 1)),
                game(4, 1, 1, 2, (3, 1)),
            ],
        );
        let trend = TrendAnalyzer::new(7);
        assert_eq!(trend.win_streak(&s, TeamId(1), MatchId(4)).unwrap(), 3);
        assert_eq!(trend.win_streak(&s, TeamId(1), MatchId(1)).unwrap(), 0);
        assert_eq!(trend.lose_streak(&s, TeamId(2), MatchId(4)).unwrap(), 3);
        assert_eq!(trend.non_lose_streak(&s, TeamId(2), MatchId(1)).unwrap(), 1);
    }

    #[test]
    fn streak_crosses_season_boundary() {
        let one_season = store(&[1, 2], vec![game(3, 2, 1, 2, (1, 0))]);
        let two_seasons = store(
            &[1, 2],
            vec![game(1, 1, 1, 2, (1, 0)), game(2, 1, 2, 1, (0, 2)), game(3, 2, 1, 2, (1, 0))],
        );
        let trend = TrendAnalyzer::new(7);
        assert_eq!(trend.win_streak(&one_season, TeamId(1), MatchId(3)).unwrap(), 1);
        assert_eq!(trend.win_streak(&two_seasons, TeamId(1), MatchId(3)).unwrap(), 3);
    }

    #[test]
    fn no_history_is_zero_streak() {
        let s = store(&[1, 2], Vec::new());
        let trend = TrendAnalyzer::new(7);
        assert_eq!(trend.win_streak(&s, TeamId(1), MatchId(10)).unwrap(), 0);
        assert_eq!(trend.lose_streak(&s, TeamId(1), MatchId(10)).unwrap(), 0);
    }

    /// Team 3 climbs from third to second with the third match.
    fn climbing_league() -> MemoryStore {
        store(
            &[1, 2, 3],
            vec![
                game(1, 1, 1, 2, (1, 0)),
                game(2, 1, 2, 3, (1, 0)),
                game(3, 1, 3, 2, (2, 0)),
            ],
        )
    }

    #[test]
    fn promotion_reports_displaced_team() {
        let s = climbing_league();
        let trend = TrendAnalyzer::new(1);
        let mut standings = StandingsEngine::new();
        let up = trend
            .promotion_movement(&s, &mut standings, TeamId(3), MatchId(3))
            .unwrap()
            .unwrap();
        assert_eq!(up.rank, 2);
        assert_eq!(up.points, 3);
        assert_eq!(up.other, TeamId(2));
        assert_eq!(up.other_points, 3);
        assert_eq!(up.other_rank, Some(3));

        assert!(trend
            .relegation_movement(&s, &mut standings, TeamId(3), MatchId(3))
            .unwrap()
            .is_none());
        assert!(trend
            .promotion_movement(&s, &mut standings, TeamId(1), MatchId(3))
            .unwrap()
            .is_none());

        let down = trend
            .relegation_movement(&s, &mut standings, TeamId(2), MatchId(3))
            .unwrap()
            .unwrap();
        assert_eq!(down.rank, 3);
        assert_eq!(down.other, TeamId(3));
    }

    #[test]
    fn movement_gated_by_match_count() {
        let s = climbing_league();
        let trend = TrendAnalyzer::new(2);
        let mut standings = StandingsEngine::new();
        // Team 3 has played two matches.
        assert!(trend
            .promotion_movement(&s, &mut standings, TeamId(3), MatchId(3))
            .unwrap()
            .is_none());
    }
}
