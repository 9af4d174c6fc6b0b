/// Facts computed about a match, and the flat fact context phrase
/// templates are matched against.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::core::standings::StandingsEngine;
use crate::core::store::{LeagueStore, StoreError};
use crate::core::timeline::{GoalFacts, GoalTimeline, PlayerRating};
use crate::core::trend::{Movement, TrendAnalyzer};
use crate::schema::league::{Match, MatchId, TeamId};

/// The values template predicates are checked against. Each section fills
/// the fields its category consults and leaves the rest at their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FactContext {
    pub score_diff: i64,
    pub total_goals: i64,
    pub minute: i64,
    pub last_goal_final: bool,
    pub win_series: bool,
    pub lose_series: bool,
    pub wins: u32,
    pub losses: u32,
    pub winner_leads: bool,
    pub loser_was_leader: bool,
    pub surprise: bool,
    pub top_clash: bool,

    pub only: bool,
    pub equalizer: bool,
    pub reversal: bool,
    pub winning: bool,
    pub first_group: bool,
    pub double: bool,
    pub triple: bool,
    pub penalty: bool,
    pub own_goal: bool,

    pub prior_loser: bool,
    pub revenge: bool,
    pub draw: bool,

    pub promotion: bool,
    pub relegation: bool,
}

impl FactContext {
    /// Facts for the title and the lead-in paragraph.
    pub fn title(report: &ReportFacts) -> Self {
        Self {
            score_diff: report.score_diff as i64,
            total_goals: report.total_goals as i64,
            last_goal_final: report.last_goal_final,
            win_series: report.win_series,
            lose_series: report.lose_series,
            wins: report.winner_side().map_or(0, |side| side.win_streak),
            losses: report.loser_side().map_or(0, |side| side.lose_streak),
            winner_leads: report.winner_leads,
            loser_was_leader: report.loser_was_leader,
            surprise: report.surprise,
            top_clash: report.top_clash,
            ..Self::default()
        }
    }

    pub fn prior_meeting(meeting: &PriorMeeting) -> Self {
        Self {
            prior_loser: meeting.prior_loser,
            revenge: meeting.revenge,
            draw: meeting.draw,
            ..Self::default()
        }
    }

    /// `lone_goal` is set when the match had exactly one goal.
    pub fn first_goal(lone_goal: bool, minute: u32) -> Self {
        Self {
            only: lone_goal,
            minute: minute as i64,
            ..Self::default()
        }
    }

    /// A goal narrated on its own inside the goal sequence.
    pub fn regular_goal(goal: &GoalFacts, penalty: bool, own_goal: bool) -> Self {
        Self {
            only: goal.only,
            equalizer: goal.equalizer,
            reversal: goal.reversal,
            winning: goal.winning,
            double: goal.scorer_goals == 2,
            triple: goal.scorer_goals == 3,
            penalty,
            own_goal,
            ..Self::default()
        }
    }

    /// A run of goals, classified by its last goal.
    pub fn goal_group(first_group: bool, last: &GoalFacts) -> Self {
        Self {
            first_group,
            equalizer: last.equalizer,
            reversal: last.reversal,
            ..Self::default()
        }
    }

    pub fn last_goal(goal: &GoalFacts, minute: u32, penalty: bool, own_goal: bool) -> Self {
        Self {
            only: goal.only,
            equalizer: goal.equalizer,
            reversal: goal.reversal,
            winning: goal.winning,
            minute: minute as i64,
            penalty,
            own_goal,
            ..Self::default()
        }
    }

    pub fn conclusion(report: &ReportFacts) -> Self {
        Self {
            promotion: !report.promotions.is_empty(),
            relegation: !report.relegations.is_empty(),
            ..Self::default()
        }
    }
}

/// Table and form of one side of the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideFacts {
    pub team: TeamId,
    pub season_matches: u32,
    pub rank: Option<usize>,
    pub rank_before: Option<usize>,
    pub points: i32,
    pub goal_diff: i32,
    pub win_streak: u32,
    pub lose_streak: u32,
    pub non_lose_streak: u32,
}

impl SideFacts {
    fn gather(
        store: &dyn LeagueStore,
        standings: &mut StandingsEngine,
        trend: &TrendAnalyzer,
        team: TeamId,
        id: MatchId,
    ) -> Result<SideFacts, StoreError> {
        Ok(SideFacts {
            team,
            season_matches: standings.season_match_count(store, team, id)?,
            rank: standings.rank(store, team, id)?,
            rank_before: standings.rank_before(store, team, id)?,
            points: standings.points(store, team, id)?,
            goal_diff: standings.goal_diff(store, team, id)?,
            win_streak: trend.win_streak(store, team, id)?,
            lose_streak: trend.lose_streak(store, team, id)?,
            non_lose_streak: trend.non_lose_streak(store, team, id)?,
        })
    }
}

/// The most recent earlier meeting of the two teams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorMeeting {
    pub match_id: MatchId,
    pub date: NaiveDate,
    pub home: TeamId,
    pub away: TeamId,
    pub score: String,
    pub loser: Option<TeamId>,
    /// Whole months (30-day periods) since that meeting.
    pub months: i64,
    /// Someone lost the earlier meeting.
    pub prior_loser: bool,
    /// The earlier loser won this time.
    pub revenge: bool,
    /// This match was drawn.
    pub draw: bool,
}

impl PriorMeeting {
    pub fn new(prior: &Match, current: &Match) -> Self {
        let loser = prior.loser();
        let draw = current.winner().is_none();
        let revenge = !draw && loser.is_some() && current.winner() == loser;
        Self {
            match_id: prior.id,
            date: prior.date,
            home: prior.home,
            away: prior.away,
            score: prior.score(),
            loser,
            months: (current.date - prior.date).num_days() / 30,
            prior_loser: loser.is_some(),
            revenge,
            draw,
        }
    }
}

/// Everything known about a match before its report is written. Returned
/// with the report as the record of facts used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportFacts {
    pub match_id: MatchId,
    pub score: String,
    pub score_diff: u32,
    pub total_goals: u32,
    pub winner: Option<TeamId>,
    pub loser: Option<TeamId>,
    pub last_goal_final: bool,
    /// The lead changed hands at some point in the match.
    pub comeback: bool,
    /// The home team is past the match-count threshold.
    pub rank_enabled: bool,
    pub home: SideFacts,
    pub away: SideFacts,
    pub win_series: bool,
    pub lose_series: bool,
    pub winner_leads: bool,
    pub loser_was_leader: bool,
    pub class_difference: i32,
    pub surprise: bool,
    pub top_clash: bool,
    pub doubles: Vec<String>,
    pub triples: Vec<String>,
    pub man_of_the_match: Option<PlayerRating>,
    pub promotions: Vec<Movement>,
    pub relegations: Vec<Movement>,
    pub prior_meeting: Option<PriorMeeting>,
}

impl ReportFacts {
    pub fn gather(
        store: &dyn LeagueStore,
        standings: &mut StandingsEngine,
        trend: &TrendAnalyzer,
        config: &EngineConfig,
        game: &Match,
        timeline: &GoalTimeline,
    ) -> Result<ReportFacts, StoreError> {
        let home = SideFacts::gather(store, standings, trend, game.home, game.id)?;
        let away = SideFacts::gather(store, standings, trend, game.away, game.id)?;
        let rank_enabled = home.season_matches > config.match_count_threshold;

        let winner_side = side_of(&home, &away, game.winner());
        let loser_side = side_of(&home, &away, game.loser());

        let win_series =
            winner_side.is_some_and(|s| s.win_streak >= config.win_streak_threshold);
        let lose_series =
            loser_side.is_some_and(|s| s.lose_streak >= config.lose_streak_threshold);
        let winner_leads = rank_enabled && winner_side.is_some_and(|s| s.rank == Some(1));
        let loser_was_leader =
            rank_enabled && loser_side.is_some_and(|s| s.rank_before == Some(1));

        let class_difference = (home.points - away.points).abs();
        let underdog_won = match (winner_side, loser_side) {
            (Some(w), Some(l)) => w.points < l.points,
            _ => false,
        };
        let draw = game.winner().is_none();
        let surprise = class_difference > config.surprise_points_gap && (draw || underdog_won);
        let in_top_three = |s: &SideFacts| s.rank.is_some_and(|r| r <= 3);
        let top_clash = in_top_three(&home) && in_top_three(&away);

        let mut promotions = Vec::new();
        let mut relegations = Vec::new();
        for team in [game.home, game.away] {
            if let Some(up) = trend.promotion_movement(store, standings, team, game.id)? {
                promotions.push(up);
            }
            if let Some(down) = trend.relegation_movement(store, standings, team, game.id)? {
                relegations.push(down);
            }
        }

        let prior_meeting = store
            .load_prior_meeting(game.home, game.away, game.date)?
            .map(|prior| PriorMeeting::new(&prior, game));

        let comeback = (2..timeline.len()).any(|i| timeline.is_lead_reversal(i));

        let facts = ReportFacts {
            match_id: game.id,
            score: game.score(),
            score_diff: game.score_difference(),
            total_goals: game.total_goals(),
            winner: game.winner(),
            loser: game.loser(),
            last_goal_final: timeline.last_goal_final(config.late_goal_minute),
            comeback,
            rank_enabled,
            win_series,
            lose_series,
            winner_leads,
            loser_was_leader,
            class_difference,
            surprise,
            top_clash,
            doubles: timeline.scorers_with(2),
            triples: timeline.scorers_with(3),
            man_of_the_match: timeline.man_of_the_match(),
            promotions,
            relegations,
            prior_meeting,
            home,
            away,
        };
        debug!(
            match_id = game.id.0,
            rank_enabled,
            win_series,
            lose_series,
            surprise,
            "match facts gathered"
        );
        Ok(facts)
    }

    pub fn side(&self, team: TeamId) -> Option<&SideFacts> {
        side_of(&self.home, &self.away, Some(team))
    }

    pub fn winner_side(&self) -> Option<&SideFacts> {
        side_of(&self.home, &self.away, self.winner)
    }

    pub fn loser_side(&self) -> Option<&SideFacts> {
        side_of(&self.home, &self.away, self.loser)
    }
}

fn side_of<'a>(home: &'a SideFacts, away: &'a SideFacts, team: Option<TeamId>) -> Option<&'a SideFacts> {
    let team = team?;
    [home, away].into_iter().find(|s| s.team == team)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::schema::goal::GoalEvent;
    use crate::schema::league::{CompetitionId, SeasonId, Team};

    fn team(id: u32) -> Team {
        Team {
            id: TeamId(id),
            name: format!("Team {}", id),
            slug: format!("team-{}", id),
            city: None,
            coach: None,
            competition: CompetitionId(1),
            seasons: [SeasonId(1)].into_iter().collect(),
            penalties: 0,
        }
    }

    fn game(id: u64, home: u32, away: u32, score: (u32, u32), date: (i32, u32, u32)) -> Match {
        Match {
            id: MatchId(id),
            season: SeasonId(1),
            competition: CompetitionId(1),
            home: TeamId(home),
            away: TeamId(away),
            home_goals: score.0,
            away_goals: score.1,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            finished: true,
            standings: None,
            anti_repeat: None,
        }
    }

    #[test]
    fn prior_meeting_revenge() {
        let earlier = game(1, 1, 2, (2, 0), (2015, 3, 1));
        let now = game(9, 2, 1, (1, 0), (2015, 9, 1));
        let meeting = PriorMeeting::new(&earlier, &now);
        assert!(meeting.prior_loser);
        assert!(meeting.revenge);
        assert!(!meeting.draw);
        assert_eq!(meeting.months, 6);
        assert_eq!(meeting.score, "2:0");
    }

    #[test]
    fn prior_meeting_draw_is_never_revenge() {
        let earlier = game(1, 1, 2, (2, 0), (2015, 3, 1));
        let now = game(9, 2, 1, (1, 1), (2015, 4, 1));
        let meeting = PriorMeeting::new(&earlier, &now);
        assert!(meeting.prior_loser);
        assert!(!meeting.revenge);
        assert!(meeting.draw);
        assert_eq!(meeting.months, 1);
    }

    #[test]
    fn title_context_from_report() {
        let mut store = MemoryStore::new();
        store.insert_team(team(1));
        store.insert_team(team(2));
        store.insert_match(game(1, 1, 2, (1, 0), (2015, 8, 1)));
        store.insert_match(game(2, 2, 1, (0, 3), (2015, 8, 8)));
        for minute in [10, 20, 85] {
            store.insert_goal(GoalEvent {
                match_id: MatchId(2),
                sequence: 0,
                minute,
                team: TeamId(1),
                scorer: Some("Ion".to_string()),
                assist: None,
                penalty: false,
                own_goal: false,
                recipient: Some(TeamId(2)),
            });
        }
        let current = store.load_match(MatchId(2)).unwrap();
        let timeline = GoalTimeline::new(&current, store.load_goals_for_match(MatchId(2)).unwrap());

        let config = EngineConfig {
            win_streak_threshold: 2,
            ..EngineConfig::default()
        };
        let mut standings = StandingsEngine::new();
        let trend = TrendAnalyzer::new(config.match_count_threshold);
        let facts =
            ReportFacts::gather(&store, &mut standings, &trend, &config, &current, &timeline).unwrap();

        assert_eq!(facts.winner, Some(TeamId(1)));
        assert_eq!(facts.home.team, TeamId(2));
        assert_eq!(facts.away.points, 6);
        assert!(facts.win_series);
        assert!(!facts.rank_enabled);
        assert!(!facts.winner_leads);
        assert_eq!(facts.triples, vec!["Ion".to_string()]);
        assert_eq!(facts.prior_meeting.as_ref().map(|p| p.match_id), Some(MatchId(1)));
        assert!(facts.promotions.is_empty());

        let ctx = FactContext::title(&facts);
        assert_eq!(ctx.score_diff, 3);
        assert_eq!(ctx.total_goals, 3);
        assert_eq!(ctx.wins, 2);
        assert!(ctx.win_series);
        assert!(!ctx.lose_series);
    }

    #[test]
    fn section_contexts() {
        let goal = GoalFacts {
            index: 2,
            score: (2, 1),
            equalizer: false,
            reversal: true,
            winning: true,
            only: false,
            scorer_goals: 2,
        };
        let regular = FactContext::regular_goal(&goal, true, false);
        assert!(regular.reversal && regular.double && regular.penalty);
        assert!(!regular.triple);

        let group = FactContext::goal_group(true, &goal);
        assert!(group.first_group && group.reversal);
        assert!(!group.winning);

        let first = FactContext::first_goal(true, 17);
        assert!(first.only);
        assert_eq!(first.minute, 17);
    }
}
