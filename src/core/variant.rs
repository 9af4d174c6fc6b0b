/// Referring expressions for teams and wording for goals.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::grammar::{Case, Number};
use crate::core::sampler::{choose, Sampler};
use crate::core::timeline::GoalFacts;
use crate::schema::goal::GoalEvent;
use crate::schema::league::{Outcome, Team, TeamFlags};

/// Singular and plural patterns for one grammatical case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseForms {
    #[serde(default)]
    pub singular: Vec<String>,
    #[serde(default)]
    pub plural: Vec<String>,
}

impl CaseForms {
    fn new(singular: &[&str], plural: &[&str]) -> Self {
        Self {
            singular: singular.iter().map(|s| s.to_string()).collect(),
            plural: plural.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn for_number(&self, number: Number) -> Vec<&String> {
        match number {
            Number::Singular => self.singular.iter().collect(),
            Number::Plural => self.plural.iter().collect(),
            Number::Any => self.singular.iter().chain(self.plural.iter()).collect(),
        }
    }
}

/// Patterns of one descriptor in each case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Declension {
    #[serde(default)]
    pub nominative: CaseForms,
    #[serde(default)]
    pub genitive: CaseForms,
    #[serde(default)]
    pub accusative: CaseForms,
}

impl Declension {
    fn get(&self, case: Case) -> &CaseForms {
        match case {
            Case::Nominative => &self.nominative,
            Case::Genitive => &self.genitive,
            Case::Accusative => &self.accusative,
        }
    }

    /// Same patterns for nominative and accusative, as English needs.
    fn english(nominative: CaseForms, genitive: CaseForms) -> Self {
        Self {
            accusative: nominative.clone(),
            nominative,
            genitive,
        }
    }
}

/// Result descriptors, one pool per outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultWords {
    pub win: Vec<String>,
    pub draw: Vec<String>,
    pub loss: Vec<String>,
}

/// Wording pools for describing a goal.
///
/// Patterns may use `{assist}`, `{minute}`, `{span}` and `{gap}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalWords {
    pub equalizer: Vec<String>,
    pub reversal: Vec<String>,
    pub winner: Vec<String>,
    pub own_goal: Vec<String>,
    pub penalty: Vec<String>,
    pub plain: Vec<String>,
    pub from_penalty: Vec<String>,
    pub assisted: Vec<String>,
    pub before_half_time: Vec<String>,
    pub before_full_time: Vec<String>,
    pub minutes_later: Vec<String>,
    pub moments_later: Vec<String>,
    pub in_minute: Vec<String>,
}

/// All wording the resolver draws from. Fields missing from a RON file
/// fall back to the built-in English lexicon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    pub name: Declension,
    pub city: Declension,
    pub coach: Declension,
    pub host: Declension,
    pub guest: Declension,
    pub leader: Declension,
    pub bottom: Declension,
    pub results: ResultWords,
    pub goals: GoalWords,
}

#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::english()
    }
}

impl Lexicon {
    pub fn english() -> Self {
        Self {
            name: Declension::english(
                CaseForms::new(&["{name}"], &["the {name} players"]),
                CaseForms::new(&["{name}'s"], &["the {name} players'"]),
            ),
            city: Declension::english(
                CaseForms::new(&["the {city} side", "the club from {city}"], &[]),
                CaseForms::new(&["the {city} side's"], &[]),
            ),
            coach: Declension::english(
                CaseForms::new(
                    &["{coach}'s side", "{coach}'s team"],
                    &["{coach}'s men", "{coach}'s charges", "{coach}'s players"],
                ),
                CaseForms::new(&["{coach}'s side's"], &["{coach}'s players'"]),
            ),
            host: Declension::english(
                CaseForms::new(&["the home side"], &["the hosts"]),
                CaseForms::new(&["the home side's"], &["the hosts'"]),
            ),
            guest: Declension::english(
                CaseForms::new(&["the away side"], &["the visitors"]),
                CaseForms::new(&["the away side's"], &["the visitors'"]),
            ),
            leader: Declension::english(
                CaseForms::new(&["the league leader", "the team at the top of the table"], &[]),
                CaseForms::new(&["the league leader's"], &[]),
            ),
            bottom: Declension::english(
                CaseForms::new(&["the bottom club", "the side propping up the table"], &[]),
                CaseForms::new(&["the bottom club's"], &[]),
            ),
            results: ResultWords {
                win: words(&["won", "claimed the win", "came out on top"]),
                draw: words(&["drew", "shared the points"]),
                loss: words(&["lost", "were beaten", "went down"]),
            },
            goals: GoalWords {
                equalizer: words(&["the equaliser", "the goal that levelled the score"]),
                reversal: words(&["the goal that turned the game around", "the comeback goal"]),
                winner: words(&["the winner", "the decisive goal", "the goal that settled it"]),
                own_goal: words(&["the own goal"]),
                penalty: words(&["the penalty", "the spot kick"]),
                plain: words(&["the goal"]),
                from_penalty: words(&["from the penalty spot", "from twelve yards"]),
                assisted: words(&["assisted by {assist}", "from a pass by {assist}", "set up by {assist}"]),
                before_half_time: words(&["{span} before half-time", "{span} before the break"]),
                before_full_time: words(&["{span} before the final whistle", "{span} from time"]),
                minutes_later: words(&["{gap} minutes later", "another {gap} minutes on"]),
                moments_later: words(&["moments later", "seconds later"]),
                in_minute: words(&["in minute {minute}"]),
            },
        }
    }

    /// Load a lexicon from a RON file.
    pub fn load_from_ron(path: &std::path::Path) -> Result<Lexicon, LexiconError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&contents)?)
    }
}

/// Produces varied references to teams, grounded in the flags set for the
/// current report.
pub struct VariantResolver<'a> {
    lexicon: &'a Lexicon,
    link_pattern: &'a str,
}

impl<'a> VariantResolver<'a> {
    pub fn new(lexicon: &'a Lexicon, link_pattern: &'a str) -> Self {
        Self {
            lexicon,
            link_pattern,
        }
    }

    /// Every expression that may refer to `team` in the requested case and
    /// number. Descriptors whose flag is unset are never offered, so a team
    /// not playing the match gets no host or guest descriptor.
    pub fn candidates(&self, team: &Team, flags: &TeamFlags, case: Case, number: Number) -> Vec<String> {
        let mut vars: FxHashMap<&str, &str> = FxHashMap::default();
        vars.insert("name", team.name.as_str());

        let mut sources = vec![&self.lexicon.name];
        if let Some(city) = team.city.as_deref() {
            vars.insert("city", city);
            sources.push(&self.lexicon.city);
        }
        if let Some(coach) = team.coach.as_deref() {
            vars.insert("coach", coach);
            sources.push(&self.lexicon.coach);
        }
        if flags.host {
            sources.push(&self.lexicon.host);
        } else if flags.guest {
            sources.push(&self.lexicon.guest);
        }
        if flags.leader {
            sources.push(&self.lexicon.leader);
        } else if flags.bottom {
            sources.push(&self.lexicon.bottom);
        }

        let mut out: Vec<String> = sources
            .into_iter()
            .flat_map(|declension| declension.get(case).for_number(number))
            .map(|pattern| fill(pattern, &vars))
            .collect();
        if out.is_empty() {
            out.push(team.name.clone());
        }
        out
    }

    /// A random referring expression for `team`, linked to its page.
    pub fn refer(
        &self,
        team: &Team,
        competition_slug: &str,
        flags: &TeamFlags,
        case: Case,
        number: Number,
        sampler: &mut dyn Sampler,
    ) -> String {
        let candidates = self.candidates(team, flags, case, number);
        let text = choose(sampler, &candidates).cloned().unwrap_or_else(|| team.name.clone());
        self.link(team, competition_slug, &text)
    }

    pub fn link(&self, team: &Team, competition_slug: &str, text: &str) -> String {
        let href = self
            .link_pattern
            .replace("{competition}", competition_slug)
            .replace("{team}", &team.slug);
        format!(
            "<a href=\"{}\" title=\"{}\">{}</a>",
            escape_html(&href),
            escape_html(&team.name),
            escape_html(text)
        )
    }

    /// A result descriptor ("won", "drew", ...) for `outcome`.
    pub fn result_phrase(&self, outcome: Outcome, sampler: &mut dyn Sampler) -> String {
        let pool = match outcome {
            Outcome::Win => &self.lexicon.results.win,
            Outcome::Draw => &self.lexicon.results.draw,
            Outcome::Loss => &self.lexicon.results.loss,
        };
        choose(sampler, pool).cloned().unwrap_or_default()
    }

    /// What the goal meant for the match: equaliser, winner, and so on.
    pub fn goal_what(&self, facts: &GoalFacts, goal: &GoalEvent, sampler: &mut dyn Sampler) -> String {
        let words = &self.lexicon.goals;
        let pool = if facts.equalizer {
            &words.equalizer
        } else if facts.reversal {
            &words.reversal
        } else if facts.winning {
            &words.winner
        } else if goal.own_goal {
            &words.own_goal
        } else if goal.penalty {
            &words.penalty
        } else {
            &words.plain
        };
        choose(sampler, pool).cloned().unwrap_or_default()
    }

    /// How the goal was scored. Empty when there is nothing to add.
    pub fn goal_how(&self, goal: &GoalEvent, sampler: &mut dyn Sampler) -> String {
        let words = &self.lexicon.goals;
        if goal.penalty {
            return choose(sampler, &words.from_penalty).cloned().unwrap_or_default();
        }
        match goal.assist.as_deref() {
            Some(assist) => {
                let pattern = choose(sampler, &words.assisted).cloned().unwrap_or_default();
                pattern.replace("{assist}", assist)
            }
            None => String::new(),
        }
    }

    /// When the goal came, relative to the break, the final whistle, or the
    /// previous goal.
    pub fn goal_when(&self, minute: u32, previous_minute: Option<u32>, sampler: &mut dyn Sampler) -> String {
        let words = &self.lexicon.goals;
        let mut options: Vec<String> = Vec::new();

        if (31..=43).contains(&minute) {
            let span = span_words(45 - minute);
            options.extend(words.before_half_time.iter().map(|p| p.replace("{span}", &span)));
        } else if (76..=87).contains(&minute) {
            let span = span_words(90 - minute);
            options.extend(words.before_full_time.iter().map(|p| p.replace("{span}", &span)));
        }

        if let Some(previous) = previous_minute {
            let gap = minute.saturating_sub(previous);
            if (2..15).contains(&gap) {
                options.extend(
                    words
                        .minutes_later
                        .iter()
                        .map(|p| p.replace("{gap}", &gap.to_string())),
                );
            } else if gap < 2 {
                options.extend(words.moments_later.iter().cloned());
            }
        }

        options.extend(
            words
                .in_minute
                .iter()
                .map(|p| p.replace("{minute}", &minute.to_string())),
        );
        choose(sampler, &options)
            .cloned()
            .unwrap_or_else(|| format!("in minute {}", minute))
    }
}

fn span_words(minutes: u32) -> String {
    match minutes {
        15 => "a quarter of an hour".to_string(),
        30 => "half an hour".to_string(),
        1 => "a minute".to_string(),
        n => format!("{} minutes", n),
    }
}

fn fill(pattern: &str, vars: &FxHashMap<&str, &str>) -> String {
    let mut out = pattern.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}

/// Attribute values are double-quoted, so apostrophes pass through.
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
