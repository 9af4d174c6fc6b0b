//! In-match goal sequence: running score, goal classification and
//! grouping of consecutive goals by the same side.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::schema::goal::GoalEvent;
use crate::schema::league::{Match, TeamId};

/// Classification of one goal inside its match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GoalFacts {
    /// Position in the ordered goal list.
    pub index: usize,
    /// Running score (home, away) after this goal.
    pub score: (u32, u32),
    pub equalizer: bool,
    pub reversal: bool,
    pub winning: bool,
    /// The scoring side has no other goal in the match.
    pub only: bool,
    /// Goals scored by this goal's scorer in the whole match.
    pub scorer_goals: u32,
}

/// A plan for rendering one goal group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupPlan {
    /// Two or more goals narrated together. `opening` marks the first
    /// group of the match.
    Group { goals: Vec<usize>, opening: bool },
    /// A single goal narrated on its own.
    Single(usize),
}

/// The ordered goals of one match with their running score.
#[derive(Debug, Clone)]
pub struct GoalTimeline {
    home: TeamId,
    goals: Vec<GoalEvent>,
    scores: Vec<(u32, u32)>,
}

impl GoalTimeline {
    /// Build the timeline of `game` from its goals, ordering by minute and
    /// keeping ingestion order for goals in the same minute.
    pub fn new(game: &Match, mut goals: Vec<GoalEvent>) -> Self {
        goals.sort_by_key(GoalEvent::order_key);
        let mut scores = Vec::with_capacity(goals.len());
        let (mut home, mut away) = (0, 0);
        for goal in &goals {
            if goal.team == game.home {
                home += 1;
            } else {
                away += 1;
            }
            scores.push((home, away));
        }
        Self {
            home: game.home,
            goals,
            scores,
        }
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn goals(&self) -> &[GoalEvent] {
        &self.goals
    }

    pub fn goal(&self, index: usize) -> Option<&GoalEvent> {
        self.goals.get(index)
    }

    pub fn first(&self) -> Option<&GoalEvent> {
        self.goals.first()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.goals.len().checked_sub(1)
    }

    /// Running score after goal `index`.
    pub fn score_after(&self, index: usize) -> Option<(u32, u32)> {
        self.scores.get(index).copied()
    }

    /// Score before goal `index` (0:0 before the first goal).
    pub fn score_before(&self, index: usize) -> (u32, u32) {
        index
            .checked_sub(1)
            .and_then(|i| self.scores.get(i).copied())
            .unwrap_or((0, 0))
    }

    pub fn home(&self) -> TeamId {
        self.home
    }

    pub fn is_equalizer(&self, index: usize) -> bool {
        self.score_after(index).is_some_and(|(h, a)| h == a)
    }

    /// The lead changed hands: the sign of the goal difference after this
    /// goal is the opposite of the one two goals earlier.
    pub fn is_lead_reversal(&self, index: usize) -> bool {
        if index < 2 {
            return false;
        }
        match (self.score_after(index), self.score_after(index - 2)) {
            (Some(now), Some(before)) => lead(now) * lead(before) < 0,
            _ => false,
        }
    }

    /// The last goal of the match, scored when the score was level.
    pub fn is_winning_goal(&self, index: usize) -> bool {
        if Some(index) != self.last_index() {
            return false;
        }
        let (h, a) = self.score_before(index);
        h == a
    }

    /// The last goal of the match levelled the score.
    pub fn is_late_equalizer(&self, index: usize) -> bool {
        Some(index) == self.last_index() && self.is_equalizer(index)
    }

    /// The scoring side of goal `index` scored no other goal.
    pub fn only(&self, index: usize) -> bool {
        let Some(goal) = self.goals.get(index) else {
            return false;
        };
        self.goals
            .iter()
            .enumerate()
            .all(|(i, other)| i == index || other.team != goal.team)
    }

    pub fn facts(&self, index: usize) -> GoalFacts {
        let scorer_goals = self
            .goals
            .get(index)
            .and_then(|goal| goal.scorer.as_deref())
            .map_or(0, |scorer| self.goals_by(scorer));
        GoalFacts {
            index,
            score: self.score_after(index).unwrap_or((0, 0)),
            equalizer: self.is_equalizer(index),
            reversal: self.is_lead_reversal(index),
            winning: self.is_winning_goal(index),
            only: self.only(index),
            scorer_goals,
        }
    }

    /// Goals by `scorer`, own goals excluded.
    pub fn goals_by(&self, scorer: &str) -> u32 {
        self.goals
            .iter()
            .filter(|goal| !goal.own_goal && goal.scorer.as_deref() == Some(scorer))
            .count() as u32
    }

    /// Maximal runs of consecutive goals by the same side, as goal indices.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (i, goal) in self.goals.iter().enumerate() {
            match groups.last_mut() {
                Some(group) if self.goals[group[0]].team == goal.team => group.push(i),
                _ => groups.push(vec![i]),
            }
        }
        groups
    }

    /// How each group is narrated between the first-goal and last-goal
    /// sections. The first goal of the first group and the last goal of the
    /// last group are left to those sections; a group reduced to one goal is
    /// narrated as a single goal, an emptied group not at all.
    pub fn group_plan(&self) -> Vec<GroupPlan> {
        let groups = self.groups();
        let count = groups.len();
        groups
            .into_iter()
            .enumerate()
            .filter_map(|(i, mut group)| {
                if i == 0 && !group.is_empty() {
                    group.remove(0);
                }
                if i + 1 == count {
                    group.pop();
                }
                match group.len() {
                    0 => None,
                    1 => Some(GroupPlan::Single(group[0])),
                    _ => Some(GroupPlan::Group {
                        goals: group,
                        opening: i == 0,
                    }),
                }
            })
            .collect()
    }

    /// Scorers in order of first goal, with the minutes they scored in.
    pub fn scorers(&self, indices: &[usize]) -> Vec<(String, Vec<u32>)> {
        let mut out: Vec<(String, Vec<u32>)> = Vec::new();
        for goal in indices.iter().filter_map(|i| self.goals.get(*i)) {
            let name = goal.scorer.clone().unwrap_or_else(|| "unknown".to_string());
            match out.iter_mut().find(|(n, _)| *n == name) {
                Some((_, minutes)) => minutes.push(goal.minute),
                None => out.push((name, vec![goal.minute])),
            }
        }
        out
    }

    /// Scorers with exactly `count` goals in the match.
    pub fn scorers_with(&self, count: u32) -> Vec<String> {
        let mut tally: Vec<(String, u32)> = Vec::new();
        for goal in self.goals.iter().filter(|g| !g.own_goal) {
            let Some(name) = goal.scorer.as_deref() else {
                continue;
            };
            match tally.iter_mut().find(|(n, _)| n == name) {
                Some((_, n)) => *n += 1,
                None => tally.push((name.to_string(), 1)),
            }
        }
        tally
            .into_iter()
            .filter(|(_, n)| *n == count)
            .map(|(name, _)| name)
            .collect()
    }

    /// The decisive last goal came late: after `late_minute` and either
    /// won or levelled the match.
    pub fn last_goal_final(&self, late_minute: u32) -> bool {
        let Some(last) = self.last_index() else {
            return false;
        };
        self.goals[last].minute > late_minute
            && (self.is_winning_goal(last) || self.is_equalizer(last))
    }

    /// The standout player of the match, weighting goals, assists and
    /// decisive contributions. Own goals count against their scorer.
    pub fn man_of_the_match(&self) -> Option<PlayerRating> {
        let mut ratings: FxHashMap<String, PlayerRating> = FxHashMap::default();
        let mut order: Vec<String> = Vec::new();
        let mut entry = |name: &str, ratings: &mut FxHashMap<String, PlayerRating>| {
            if !ratings.contains_key(name) {
                order.push(name.to_string());
                ratings.insert(
                    name.to_string(),
                    PlayerRating {
                        player: name.to_string(),
                        ..PlayerRating::default()
                    },
                );
            }
        };

        for (i, goal) in self.goals.iter().enumerate() {
            let Some(scorer) = goal.scorer.as_deref() else {
                continue;
            };
            entry(scorer, &mut ratings);
            if let Some(assist) = goal.assist.as_deref() {
                entry(assist, &mut ratings);
            }
            let decisive = self.is_winning_goal(i) || self.is_late_equalizer(i);
            if goal.own_goal {
                if let Some(r) = ratings.get_mut(scorer) {
                    r.own_goals += 1;
                }
                continue;
            }
            if let Some(r) = ratings.get_mut(scorer) {
                r.goals += 1;
                if self.is_winning_goal(i) {
                    r.winners += 1;
                }
                if self.is_late_equalizer(i) {
                    r.equalizers += 1;
                }
            }
            if let Some(r) = goal.assist.as_deref().and_then(|a| ratings.get_mut(a)) {
                r.assists += 1;
                if decisive {
                    r.decisive_assists += 1;
                }
            }
        }

        let mut best: Option<PlayerRating> = None;
        for name in order {
            let Some(rating) = ratings.remove(&name) else {
                continue;
            };
            if best.as_ref().map_or(true, |b| rating.points() > b.points()) {
                best = Some(rating);
            }
        }
        best
    }
}

/// Contribution tally used to pick the man of the match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerRating {
    pub player: String,
    pub goals: u32,
    pub assists: u32,
    pub winners: u32,
    pub equalizers: u32,
    pub decisive_assists: u32,
    pub own_goals: u32,
}

impl PlayerRating {
    pub fn points(&self) -> i32 {
        (self.goals * 2 + self.assists + self.winners * 4 + self.decisive_assists * 2 + self.equalizers * 3)
            as i32
            - (self.own_goals * 3) as i32
    }
}

fn lead((home, away): (u32, u32)) -> i64 {
    home as i64 - away as i64
}

/// "A (min. 12, 40) and B (min. 77)".
pub fn list_scorers(scorers: &[(String, Vec<u32>)]) -> String {
    let parts: Vec<String> = scorers
        .iter()
        .map(|(name, minutes)| {
            let minutes: Vec<String> = minutes.iter().map(|m| m.to_string()).collect();
            format!("{} (min. {})", name, minutes.join(", "))
        })
        .collect();
    match parts.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
    }
}
