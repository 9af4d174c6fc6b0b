/// League tables as of any historical match, cached on the match record.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::core::store::{LeagueStore, StoreError};
use crate::schema::league::{Match, MatchId, Outcome, TeamId};
use crate::schema::record::{StandingsRow, StandingsSnapshot};

/// Computes and memoizes standings snapshots.
///
/// A snapshot already persisted on a match is reused unless that match was
/// marked with [`StandingsEngine::regenerate`]. Freshly computed snapshots are
/// held as pending writes until the caller flushes them to the store.
#[derive(Debug, Default)]
pub struct StandingsEngine {
    memo: FxHashMap<MatchId, StandingsSnapshot>,
    pending: Vec<MatchId>,
    forced: FxHashSet<MatchId>,
}

impl StandingsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore the cached snapshot of `id` and compute it again on next use.
    pub fn regenerate(&mut self, id: MatchId) {
        self.memo.remove(&id);
        self.forced.insert(id);
    }

    /// The table of the match's competition and season, counting finished
    /// matches with id ≤ `id`, best team first.
    pub fn compute_standings(
        &mut self,
        store: &dyn LeagueStore,
        id: MatchId,
    ) -> Result<StandingsSnapshot, StoreError> {
        if let Some(snapshot) = self.memo.get(&id) {
            return Ok(snapshot.clone());
        }

        let game = store.load_match(id)?;
        if !self.forced.contains(&id) {
            match &game.standings {
                Some(cached) if cached.is_current() => {
                    debug!(match_id = id.0, "standings cache hit");
                    self.memo.insert(id, cached.clone());
                    return Ok(cached.clone());
                }
                Some(cached) => {
                    warn!(
                        match_id = id.0,
                        version = cached.version,
                        "discarding standings snapshot with outdated version"
                    );
                }
                None => {}
            }
        }

        let snapshot = Self::tabulate(store, &game)?;
        debug!(match_id = id.0, teams = snapshot.len(), "standings computed");
        self.forced.remove(&id);
        self.memo.insert(id, snapshot.clone());
        self.pending.push(id);
        Ok(snapshot)
    }

    fn tabulate(store: &dyn LeagueStore, game: &Match) -> Result<StandingsSnapshot, StoreError> {
        let teams = store.load_teams_for(game.season, game.competition)?;
        let matches =
            store.load_matches_for_season_competition_up_to(game.season, game.competition, game.id)?;

        let mut rows: Vec<StandingsRow> = teams
            .iter()
            .map(|team| StandingsRow {
                team: team.id,
                points: -team.penalties,
                goal_diff: 0,
                played: 0,
                wins: 0,
                draws: 0,
                losses: 0,
                goals_for: 0,
                goals_against: 0,
            })
            .collect();
        let index: FxHashMap<TeamId, usize> =
            rows.iter().enumerate().map(|(i, row)| (row.team, i)).collect();

        for played in matches.iter().filter(|m| m.finished) {
            for team in [played.home, played.away] {
                let Some(row) = index.get(&team).and_then(|i| rows.get_mut(*i)) else {
                    continue;
                };
                let (scored, conceded) = played.goals_for(team);
                row.played += 1;
                row.goals_for += scored;
                row.goals_against += conceded;
                row.goal_diff += scored as i32 - conceded as i32;
                match played.outcome_for(team) {
                    Some(Outcome::Win) => {
                        row.wins += 1;
                        row.points += 3;
                    }
                    Some(Outcome::Draw) => {
                        row.draws += 1;
                        row.points += 1;
                    }
                    Some(Outcome::Loss) => row.losses += 1,
                    None => {}
                }
            }
        }

        // Stable: teams level on points and goal difference keep store order.
        rows.sort_by(|a, b| (b.points, b.goal_diff).cmp(&(a.points, a.goal_diff)));
        Ok(StandingsSnapshot::new(game.id, rows))
    }

    /// Position of `team` in the table of the most recent match of its
    /// competition with id ≤ `id`. `None` when there is no such match or
    /// the team is not registered.
    pub fn rank(
        &mut self,
        store: &dyn LeagueStore,
        team: TeamId,
        id: MatchId,
    ) -> Result<Option<usize>, StoreError> {
        let competition = store.load_team(team)?.competition;
        let Some(reference) = store.latest_competition_match_up_to(competition, id)? else {
            return Ok(None);
        };
        Ok(self.compute_standings(store, reference.id)?.rank(team))
    }

    /// Position of `team` as of the match before `id`.
    pub fn rank_before(
        &mut self,
        store: &dyn LeagueStore,
        team: TeamId,
        id: MatchId,
    ) -> Result<Option<usize>, StoreError> {
        match id.previous() {
            Some(previous) => self.rank(store, team, previous),
            None => Ok(None),
        }
    }

    /// Points of `team` in the table of match `id`, 0 if absent.
    pub fn points(
        &mut self,
        store: &dyn LeagueStore,
        team: TeamId,
        id: MatchId,
    ) -> Result<i32, StoreError> {
        Ok(self
            .compute_standings(store, id)?
            .row(team)
            .map_or(0, |row| row.points))
    }

    pub fn goal_diff(
        &mut self,
        store: &dyn LeagueStore,
        team: TeamId,
        id: MatchId,
    ) -> Result<i32, StoreError> {
        Ok(self
            .compute_standings(store, id)?
            .row(team)
            .map_or(0, |row| row.goal_diff))
    }

    /// The teams directly above and below `team` in the table of match `id`.
    pub fn neighbours(
        &mut self,
        store: &dyn LeagueStore,
        team: TeamId,
        id: MatchId,
    ) -> Result<(Option<TeamId>, Option<TeamId>), StoreError> {
        let table = self.compute_standings(store, id)?;
        let Some(rank) = table.rank(team) else {
            return Ok((None, None));
        };
        Ok((table.team_at(rank - 1), table.team_at(rank + 1)))
    }

    /// Matches `team` played in the season of match `id` up to and
    /// including it, in any competition.
    pub fn season_match_count(
        &self,
        store: &dyn LeagueStore,
        team: TeamId,
        id: MatchId,
    ) -> Result<u32, StoreError> {
        let season = store.load_match(id)?.season;
        Ok(store
            .load_team_matches_up_to(team, id)?
            .iter()
            .filter(|m| m.season == season)
            .count() as u32)
    }

    /// Snapshots computed since the last flush, ready to persist.
    pub fn pending_writes(&self) -> Vec<(MatchId, &StandingsSnapshot)> {
        self.pending
            .iter()
            .filter_map(|id| self.memo.get(id).map(|snapshot| (*id, snapshot)))
            .collect()
    }

    /// Write pending snapshots to the store. A snapshot stays pending until
    /// its write succeeds.
    pub fn flush(&mut self, store: &mut dyn LeagueStore) -> Result<(), StoreError> {
        while let Some(&id) = self.pending.first() {
            if let Some(snapshot) = self.memo.get(&id) {
                store.persist_standings_snapshot(id, snapshot)?;
            }
            self.pending.remove(0);
        }
        Ok(())
    }

    /// Forget pending writes without persisting them.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::schema::league::{Competition, CompetitionId, SeasonId, Team};
    use chrono::NaiveDate;

    fn team(id: u32, penalties: i32) -> Team {
        Team {
            id: TeamId(id),
            name: format!("Team {}", id),
            slug: format!("team-{}", id),
            city: None,
            coach: None,
            competition: CompetitionId(1),
            seasons: [SeasonId(1)].into_iter().collect(),
            penalties,
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

    fn league(teams: &[Team], matches: &[Match]) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_competition(Competition {
            id: CompetitionId(1),
            title: "Divizia Nationala".to_string(),
            slug: "divizia-nationala".to_string(),
            country: None,
        });
        for t in teams {
            store.insert_team(t.clone());
        }
        for m in matches {
            store.insert_match(m.clone());
        }
        store
    }

    #[test]
    fn single_match_table() {
        let store = league(&[team(1, 0), team(2, 0)], &[game(1, 1, 1, 2, (2, 1))]);
        let mut engine = StandingsEngine::new();
        let table = engine.compute_standings(&store, MatchId(1)).unwrap();
        assert_eq!(table.team_at(1), Some(TeamId(1)));
        assert_eq!(table.team_at(2), Some(TeamId(2)));
        assert_eq!(engine.points(&store, TeamId(1), MatchId(1)).unwrap(), 3);
        assert_eq!(engine.points(&store, TeamId(2), MatchId(1)).unwrap(), 0);
        assert_eq!(engine.goal_diff(&store, TeamId(1), MatchId(1)).unwrap(), 1);
        assert_eq!(engine.goal_diff(&store, TeamId(2), MatchId(1)).unwrap(), -1);
    }

    #[test]
    fn every_registered_team_listed_once() {
        let teams = [team(1, 0), team(2, 0), team(3, 0), team(4, 0)];
        let store = league(&teams, &[game(1, 1, 1, 2, (0, 3)), game(2, 1, 3, 4, (1, 1))]);
        let mut engine = StandingsEngine::new();
        let table = engine.compute_standings(&store, MatchId(2)).unwrap();
        assert_eq!(table.len(), 4);
        let mut ids: Vec<TeamId> = table.rows.iter().map(|r| r.team).collect();
        ids.sort();
        assert_eq!(ids, vec![TeamId(1), TeamId(2), TeamId(3), TeamId(4)]);
        assert!(table
            .rows
            .windows(2)
            .all(|w| (w[0].points, w[0].goal_diff) >= (w[1].points, w[1].goal_diff)));
    }

    #[test]
    fn later_and_other_season_matches_ignored() {
        let mut second_season = game(3, 2, 2, 1, (5, 0));
        second_season.season = SeasonId(2);
        let store = league(
            &[team(1, 0), team(2, 0)],
            &[game(1, 1, 1, 2, (1, 0)), second_season, game(4, 1, 2, 1, (2, 0))],
        );
        let mut engine = StandingsEngine::new();
        let table = engine.compute_standings(&store, MatchId(3)).unwrap();
        // Match 3 belongs to season 2, where neither team is registered.
        assert!(table.is_empty());

        let table = engine.compute_standings(&store, MatchId(1)).unwrap();
        assert_eq!(table.row(TeamId(1)).unwrap().points, 3);
        assert_eq!(table.row(TeamId(1)).unwrap().played, 1);
    }

    #[test]
    fn penalties_deducted() {
        let store = league(&[team(1, 4), team(2, 0)], &[game(1, 1, 1, 2, (1, 0))]);
        let mut engine = StandingsEngine::new();
        let table = engine.compute_standings(&store, MatchId(1)).unwrap();
        assert_eq!(table.row(TeamId(1)).unwrap().points, -1);
        assert_eq!(table.team_at(1), Some(TeamId(2)));
    }

    #[test]
    fn unfinished_matches_not_counted() {
        let mut pending = game(2, 1, 2, 1, (3, 0));
        pending.finished = false;
        let store = league(&[team(1, 0), team(2, 0)], &[game(1, 1, 1, 2, (1, 0)), pending]);
        let mut engine = StandingsEngine::new();
        let table = engine.compute_standings(&store, MatchId(2)).unwrap();
        assert_eq!(table.row(TeamId(2)).unwrap().played, 0);
    }

    #[test]
    fn ties_keep_store_order() {
        let store = league(
            &[team(1, 0), team(2, 0), team(3, 0)],
            &[game(1, 1, 3, 2, (1, 1))],
        );
        let mut engine = StandingsEngine::new();
        let table = engine.compute_standings(&store, MatchId(1)).unwrap();
        let order: Vec<TeamId> = table.rows.iter().map(|r| r.team).collect();
        assert_eq!(order, vec![TeamId(2), TeamId(3), TeamId(1)]);
    }

    #[test]
    fn cached_snapshot_reused_until_regenerated() {
        let mut store = league(&[team(1, 0), team(2, 0)], &[game(1, 1, 1, 2, (2, 1))]);
        let mut engine = StandingsEngine::new();
        let first = engine.compute_standings(&store, MatchId(1)).unwrap();
        engine.flush(&mut store).unwrap();
        assert_eq!(store.match_ref(MatchId(1)).unwrap().standings, Some(first.clone()));

        // A historical edit does not invalidate the cached table.
        store.set_score(MatchId(1), 0, 4).unwrap();
        let mut fresh = StandingsEngine::new();
        let again = fresh.compute_standings(&store, MatchId(1)).unwrap();
        assert_eq!(again, first);
        assert!(fresh.pending_writes().is_empty());

        fresh.regenerate(MatchId(1));
        let rebuilt = fresh.compute_standings(&store, MatchId(1)).unwrap();
        assert_eq!(rebuilt.team_at(1), Some(TeamId(2)));
        assert_eq!(fresh.pending_writes().len(), 1);
    }

    #[test]
    fn outdated_snapshot_recomputed() {
        let mut stale = game(1, 1, 1, 2, (2, 1));
        stale.standings = Some(StandingsSnapshot {
            version: 0,
            match_id: MatchId(1),
            rows: Vec::new(),
        });
        let store = league(&[team(1, 0), team(2, 0)], &[stale]);
        let mut engine = StandingsEngine::new();
        let table = engine.compute_standings(&store, MatchId(1)).unwrap();
        assert!(table.is_current());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn rank_before_uses_previous_competition_match() {
        let store = league(
            &[team(1, 0), team(2, 0), team(3, 0)],
            &[game(1, 1, 1, 2, (2, 0)), game(2, 1, 3, 1, (3, 0))],
        );
        let mut engine = StandingsEngine::new();
        assert_eq!(engine.rank(&store, TeamId(1), MatchId(1)).unwrap(), Some(1));
        assert_eq!(engine.rank(&store, TeamId(3), MatchId(2)).unwrap(), Some(1));
        assert_eq!(engine.rank_before(&store, TeamId(3), MatchId(2)).unwrap(), Some(2));
        assert_eq!(engine.rank_before(&store, TeamId(1), MatchId(1)).unwrap(), None);
    }

    #[test]
    fn neighbours_in_table() {
        let store = league(
            &[team(1, 0), team(2, 0), team(3, 0)],
            &[game(1, 1, 1, 2, (2, 0)), game(2, 1, 2, 3, (1, 0))],
        );
        let mut engine = StandingsEngine::new();
        // Table: 1 (3 pts, +2), 2 (3 pts, -1), 3 (0 pts)
        assert_eq!(
            engine.neighbours(&store, TeamId(2), MatchId(2)).unwrap(),
            (Some(TeamId(1)), Some(TeamId(3)))
        );
        assert_eq!(
            engine.neighbours(&store, TeamId(1), MatchId(2)).unwrap(),
            (None, Some(TeamId(2)))
        );
    }

    #[test]
    fn season_match_count_by_season() {
        let mut other = game(2, 2, 1, 2, (0, 0));
        other.season = SeasonId(2);
        let store = league(
            &[team(1, 0), team(2, 0)],
            &[game(1, 1, 1, 2, (0, 0)), other, game(3, 1, 2, 1, (0, 0))],
        );
        let engine = StandingsEngine::new();
        assert_eq!(engine.season_match_count(&store, TeamId(1), MatchId(3)).unwrap(), 2);
        assert_eq!(engine.season_match_count(&store, TeamId(1), MatchId(2)).unwrap(), 1);
    }

    #[test]
    fn empty_competition_gives_empty_table() {
        let store = league(&[], &[game(1, 1, 1, 2, (1, 0))]);
        let mut engine = StandingsEngine::new();
        assert!(engine.compute_standings(&store, MatchId(1)).unwrap().is_empty());
    }
}
