/// League data access: the collaborator interface report generation reads
/// from and writes its cached records to, plus an in-memory implementation.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::schema::goal::GoalEvent;
use crate::schema::league::{
    Competition, CompetitionId, Match, MatchId, Season, SeasonId, Team, TeamId,
};
use crate::schema::record::{AntiRepeatState, StandingsSnapshot};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("match not found: {0:?}")]
    MatchNotFound(MatchId),
    #[error("team not found: {0:?}")]
    TeamNotFound(TeamId),
    #[error("competition not found: {0:?}")]
    CompetitionNotFound(CompetitionId),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Read and write access to the match log.
///
/// Lists of matches are ordered by match id. Implementations own the
/// storage technology; the engine only relies on these operations.
pub trait LeagueStore {
    fn load_match(&self, id: MatchId) -> Result<Match, StoreError>;

    fn load_team(&self, id: TeamId) -> Result<Team, StoreError>;

    fn load_competition(&self, id: CompetitionId) -> Result<Competition, StoreError>;

    /// Teams registered in `competition` for `season`.
    fn load_teams_for(
        &self,
        season: SeasonId,
        competition: CompetitionId,
    ) -> Result<Vec<Team>, StoreError>;

    /// Matches of `season` in `competition` with id ≤ `up_to`, ascending.
    fn load_matches_for_season_competition_up_to(
        &self,
        season: SeasonId,
        competition: CompetitionId,
        up_to: MatchId,
    ) -> Result<Vec<Match>, StoreError>;

    /// Every match of `team` with id ≤ `up_to`, any season or competition,
    /// most recent first.
    fn load_team_matches_up_to(&self, team: TeamId, up_to: MatchId) -> Result<Vec<Match>, StoreError>;

    /// The most recent match of `competition` with id ≤ `up_to`.
    fn latest_competition_match_up_to(
        &self,
        competition: CompetitionId,
        up_to: MatchId,
    ) -> Result<Option<Match>, StoreError>;

    /// Goals of a match ordered by minute, ties in ingestion order.
    fn load_goals_for_match(&self, id: MatchId) -> Result<Vec<GoalEvent>, StoreError>;

    /// The most recent meeting of the two teams, either venue, played
    /// before `before`.
    fn load_prior_meeting(
        &self,
        team1: TeamId,
        team2: TeamId,
        before: NaiveDate,
    ) -> Result<Option<Match>, StoreError>;

    fn persist_standings_snapshot(
        &mut self,
        id: MatchId,
        snapshot: &StandingsSnapshot,
    ) -> Result<(), StoreError>;

    fn persist_anti_repeat_state(
        &mut self,
        id: MatchId,
        state: &AntiRepeatState,
    ) -> Result<(), StoreError>;
}

/// Serialized form of a whole league, as loaded from RON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeagueData {
    #[serde(default)]
    pub seasons: Vec<Season>,
    #[serde(default)]
    pub competitions: Vec<Competition>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub matches: Vec<Match>,
    #[serde(default)]
    pub goals: Vec<GoalEvent>,
}

/// An in-memory league.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    seasons: FxHashMap<SeasonId, Season>,
    competitions: FxHashMap<CompetitionId, Competition>,
    teams: BTreeMap<TeamId, Team>,
    matches: BTreeMap<MatchId, Match>,
    goals: FxHashMap<MatchId, Vec<GoalEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a league from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<MemoryStore, StoreError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a league from a RON string.
    pub fn parse_ron(input: &str) -> Result<MemoryStore, StoreError> {
        let data: LeagueData = ron::from_str(input)?;
        Ok(Self::from_data(data))
    }

    pub fn from_data(data: LeagueData) -> Self {
        let mut store = Self::new();
        for season in data.seasons {
            store.insert_season(season);
        }
        for competition in data.competitions {
            store.insert_competition(competition);
        }
        for team in data.teams {
            store.insert_team(team);
        }
        for game in data.matches {
            store.insert_match(game);
        }
        for goal in data.goals {
            store.insert_goal(goal);
        }
        store
    }

    pub fn insert_season(&mut self, season: Season) {
        self.seasons.insert(season.id, season);
    }

    pub fn insert_competition(&mut self, competition: Competition) {
        self.competitions.insert(competition.id, competition);
    }

    pub fn insert_team(&mut self, team: Team) {
        self.teams.insert(team.id, team);
    }

    pub fn insert_match(&mut self, game: Match) {
        self.matches.insert(game.id, game);
    }

    /// Add a goal, assigning its sequence index within the match.
    pub fn insert_goal(&mut self, mut goal: GoalEvent) {
        let goals = self.goals.entry(goal.match_id).or_default();
        goal.sequence = goals.len() as u32;
        goals.push(goal);
    }

    /// Replace the score of a stored match.
    pub fn set_score(&mut self, id: MatchId, home_goals: u32, away_goals: u32) -> Result<(), StoreError> {
        let game = self.matches.get_mut(&id).ok_or(StoreError::MatchNotFound(id))?;
        game.home_goals = home_goals;
        game.away_goals = away_goals;
        Ok(())
    }

    pub fn season(&self, id: SeasonId) -> Option<&Season> {
        self.seasons.get(&id)
    }

    pub fn match_ref(&self, id: MatchId) -> Option<&Match> {
        self.matches.get(&id)
    }

    pub fn match_ids(&self) -> impl Iterator<Item = MatchId> + '_ {
        self.matches.keys().copied()
    }
}

impl LeagueStore for MemoryStore {
    fn load_match(&self, id: MatchId) -> Result<Match, StoreError> {
        self.matches.get(&id).cloned().ok_or(StoreError::MatchNotFound(id))
    }

    fn load_team(&self, id: TeamId) -> Result<Team, StoreError> {
        self.teams.get(&id).cloned().ok_or(StoreError::TeamNotFound(id))
    }

    fn load_competition(&self, id: CompetitionId) -> Result<Competition, StoreError> {
        self.competitions
            .get(&id)
            .cloned()
            .ok_or(StoreError::CompetitionNotFound(id))
    }

    fn load_teams_for(
        &self,
        season: SeasonId,
        competition: CompetitionId,
    ) -> Result<Vec<Team>, StoreError> {
        Ok(self
            .teams
            .values()
            .filter(|team| team.plays_in(season, competition))
            .cloned()
            .collect())
    }

    fn load_matches_for_season_competition_up_to(
        &self,
        season: SeasonId,
        competition: CompetitionId,
        up_to: MatchId,
    ) -> Result<Vec<Match>, StoreError> {
        Ok(self
            .matches
            .range(..=up_to)
            .map(|(_, game)| game)
            .filter(|game| game.season == season && game.competition == competition)
            .cloned()
            .collect())
    }

    fn load_team_matches_up_to(&self, team: TeamId, up_to: MatchId) -> Result<Vec<Match>, StoreError> {
        Ok(self
            .matches
            .range(..=up_to)
            .rev()
            .map(|(_, game)| game)
            .filter(|game| game.involves(team))
            .cloned()
            .collect())
    }

    fn latest_competition_match_up_to(
        &self,
        competition: CompetitionId,
        up_to: MatchId,
    ) -> Result<Option<Match>, StoreError> {
        Ok(self
            .matches
            .range(..=up_to)
            .rev()
            .map(|(_, game)| game)
            .find(|game| game.competition == competition)
            .cloned())
    }

    fn load_goals_for_match(&self, id: MatchId) -> Result<Vec<GoalEvent>, StoreError> {
        let mut goals = self.goals.get(&id).cloned().unwrap_or_default();
        goals.sort_by_key(GoalEvent::order_key);
        Ok(goals)
    }

    fn load_prior_meeting(
        &self,
        team1: TeamId,
        team2: TeamId,
        before: NaiveDate,
    ) -> Result<Option<Match>, StoreError> {
        Ok(self
            .matches
            .values()
            .filter(|game| game.date < before && game.involves(team1) && game.involves(team2))
            .max_by_key(|game| (game.date, game.id))
            .cloned())
    }

    fn persist_standings_snapshot(
        &mut self,
        id: MatchId,
        snapshot: &StandingsSnapshot,
    ) -> Result<(), StoreError> {
        let game = self.matches.get_mut(&id).ok_or(StoreError::MatchNotFound(id))?;
        debug!(match_id = id.0, rows = snapshot.rows.len(), "standings snapshot stored");
        game.standings = Some(snapshot.clone());
        Ok(())
    }

    fn persist_anti_repeat_state(
        &mut self,
        id: MatchId,
        state: &AntiRepeatState,
    ) -> Result<(), StoreError> {
        let game = self.matches.get_mut(&id).ok_or(StoreError::MatchNotFound(id))?;
        debug!(match_id = id.0, "anti-repeat state stored");
        game.anti_repeat = Some(state.clone());
        Ok(())
    }
}
