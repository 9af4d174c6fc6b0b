/// Phrase template language: parsing and rendering.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("template parse error: {0}")]
    TemplateParse(String),
    #[error("unknown placeholder field '{0}'")]
    UnknownField(String),
    #[error("team role '{0}' is not bound in this section")]
    UnboundRole(String),
}

/// Team roles a template may refer to.
pub const TEAM_ROLES: &[&str] = &[
    "home",
    "away",
    "winner",
    "loser",
    "team",
    "recipient",
    "prior_home",
    "prior_away",
    "prior_loser",
    "promoted",
    "displaced",
    "relegated",
    "overtaker",
];

/// Grammatical case of a referring expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Case {
    Nominative,
    Genitive,
    Accusative,
}

/// Grammatical number of a referring expression. `Any` draws from both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Number {
    Singular,
    Plural,
    Any,
}

/// How a team placeholder is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamForm {
    /// A varied referring expression, linked to the team page.
    Refer { case: Case, number: Number },
    /// The plain team name.
    Name,
    /// The team's result descriptor for this match.
    Result,
}

impl TeamForm {
    fn parse(form: &str) -> Option<TeamForm> {
        match form {
            "name" => return Some(TeamForm::Name),
            "result" => return Some(TeamForm::Result),
            _ => {}
        }
        let mut chars = form.chars();
        let case = match chars.next()? {
            'n' => Case::Nominative,
            'g' => Case::Genitive,
            'a' => Case::Accusative,
            _ => return None,
        };
        let number = match chars.next() {
            None => Number::Any,
            Some('s') => Number::Singular,
            Some('p') => Number::Plural,
            Some(_) => return None,
        };
        if chars.next().is_some() {
            return None;
        }
        Some(TeamForm::Refer { case, number })
    }
}

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateSegment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// Team reference: `{winner.n}`, `{home.gp}`, `{team.name}`.
    Team { role: String, form: TeamForm },
    /// Fact value: `{score}`, `{goal.when}`.
    Field(String),
    /// Rotating synonym of a word: `{syn:victory}`.
    Synonym(String),
    /// Inline random choice: `{ch:won|beat}`.
    Choice(Vec<String>),
}

/// A parsed template, as a sequence of segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub segments: Vec<TemplateSegment>,
}

/// Values a template is rendered against.
pub trait Bindings {
    fn team(&mut self, role: &str, form: TeamForm) -> Result<String, GrammarError>;
    fn field(&self, name: &str) -> Option<String>;
    fn synonym(&mut self, word: &str) -> String;
    fn choice(&mut self, options: &[String]) -> String;
}

impl Template {
    /// Parse a template string into a sequence of segments.
    ///
    /// Syntax:
    /// - `{role.form}` with a known team role → `Team`
    /// - `{syn:word}` → `Synonym`
    /// - `{ch:a|b|c}` → `Choice`
    /// - `{name}` → `Field`
    /// - `{{` / `}}` → literal braces
    pub fn parse(input: &str) -> Result<Template, GrammarError> {
        let mut segments = Vec::new();
        let mut literal_buf = String::new();
        let chars: Vec<char> = input.chars().collect();
        let len = chars.len();
        let mut i = 0;

        while i < len {
            if chars[i] == '{' {
                if i + 1 < len && chars[i + 1] == '{' {
                    literal_buf.push('{');
                    i += 2;
                    continue;
                }

                if !literal_buf.is_empty() {
                    segments.push(TemplateSegment::Literal(std::mem::take(&mut literal_buf)));
                }

                let start = i + 1;
                let mut end = start;
                while end < len && chars[end] != '}' {
                    if chars[end] == '{' {
                        return Err(GrammarError::TemplateParse(
                            "nested braces are not allowed".to_string(),
                        ));
                    }
                    end += 1;
                }
                if end == len {
                    return Err(GrammarError::TemplateParse("unclosed brace".to_string()));
                }

                let content: String = chars[start..end].iter().collect();
                if content.trim().is_empty() {
                    return Err(GrammarError::TemplateParse("empty braces".to_string()));
                }

                segments.push(Self::parse_segment(content.trim())?);
                i = end + 1;
            } else if chars[i] == '}' {
                if i + 1 < len && chars[i + 1] == '}' {
                    literal_buf.push('}');
                    i += 2;
                    continue;
                }
                return Err(GrammarError::TemplateParse(
                    "unmatched closing brace".to_string(),
                ));
            } else {
                literal_buf.push(chars[i]);
                i += 1;
            }
        }

        if !literal_buf.is_empty() {
            segments.push(TemplateSegment::Literal(literal_buf));
        }

        Ok(Template { segments })
    }

    fn parse_segment(content: &str) -> Result<TemplateSegment, GrammarError> {
        if let Some(word) = content.strip_prefix("syn:") {
            if word.is_empty() {
                return Err(GrammarError::TemplateParse("empty synonym word".to_string()));
            }
            return Ok(TemplateSegment::Synonym(word.to_string()));
        }

        if let Some(rest) = content.strip_prefix("ch:") {
            let options: Vec<String> = rest.split('|').map(|s| s.to_string()).collect();
            return Ok(TemplateSegment::Choice(options));
        }

        if let Some((role, form)) = content.split_once('.') {
            if TEAM_ROLES.contains(&role) {
                let form = TeamForm::parse(form).ok_or_else(|| {
                    GrammarError::TemplateParse(format!(
                        "invalid team form '{}' for role '{}'",
                        form, role
                    ))
                })?;
                return Ok(TemplateSegment::Team {
                    role: role.to_string(),
                    form,
                });
            }
        }

        Ok(TemplateSegment::Field(content.to_string()))
    }

    /// Team roles referenced by this template.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            TemplateSegment::Team { role, .. } => Some(role.as_str()),
            _ => None,
        })
    }

    /// Fact fields referenced by this template.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            TemplateSegment::Field(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn render(&self, bindings: &mut dyn Bindings) -> Result<String, GrammarError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::Team { role, form } => {
                    out.push_str(&bindings.team(role, *form)?);
                }
                TemplateSegment::Field(name) => {
                    let value = bindings
                        .field(name)
                        .ok_or_else(|| GrammarError::UnknownField(name.clone()))?;
                    out.push_str(&value);
                }
                TemplateSegment::Synonym(word) => out.push_str(&bindings.synonym(word)),
                TemplateSegment::Choice(options) => out.push_str(&bindings.choice(options)),
            }
        }
        Ok(out)
    }
}

/// Collapse whitespace and tidy spacing around punctuation.
pub fn typeset(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        let attaches = word
            .chars()
            .next()
            .is_some_and(|c| matches!(c, ',' | '.' | '!' | '?' | ';' | ':'));
        if !out.is_empty() && !attaches {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
