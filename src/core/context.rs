/// Per-report narrative context: anti-repeat bookkeeping and the
/// transient flags of the two teams.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::schema::league::{TeamFlags, TeamId};
use crate::schema::phrase::{PhraseCategory, TemplateId};
use crate::schema::record::AntiRepeatState;

/// The sections of a report, in the order they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SectionKind {
    Title,
    Lead,
    PriorMeeting,
    FirstGoal,
    GoalGroup,
    RegularGoal,
    LastGoal,
    Conclusion,
}

impl SectionKind {
    /// The template pool the section draws from.
    pub fn category(&self) -> PhraseCategory {
        match self {
            Self::Title | Self::Lead => PhraseCategory::Title,
            Self::PriorMeeting => PhraseCategory::PriorMeeting,
            Self::FirstGoal => PhraseCategory::FirstGoal,
            Self::GoalGroup => PhraseCategory::GoalGroup,
            Self::RegularGoal => PhraseCategory::RegularGoal,
            Self::LastGoal => PhraseCategory::LastGoal,
            Self::Conclusion => PhraseCategory::Conclusion,
        }
    }

    /// Goal narratives run together in one paragraph.
    pub fn is_goal_narrative(&self) -> bool {
        matches!(self, Self::GoalGroup | Self::RegularGoal)
    }
}

/// State owned by one report generation.
#[derive(Debug, Clone, Default)]
pub struct NarrativeContext {
    used: AntiRepeatState,
    flags: FxHashMap<TeamId, TeamFlags>,
}

impl NarrativeContext {
    pub fn new(used: AntiRepeatState) -> Self {
        Self {
            used,
            flags: FxHashMap::default(),
        }
    }

    pub fn used(&self) -> &AntiRepeatState {
        &self.used
    }

    /// Template ids a section must not draw.
    pub fn excluded(&self, section: SectionKind) -> Vec<TemplateId> {
        match section {
            SectionKind::Lead => self.used.title.into_iter().collect(),
            SectionKind::GoalGroup => self.used.group.clone(),
            SectionKind::RegularGoal => self.used.regular.clone(),
            _ => Vec::new(),
        }
    }

    /// Record the template a section rendered.
    pub fn record(&mut self, section: SectionKind, id: TemplateId) {
        let used = &mut self.used;
        match section {
            SectionKind::Title => used.title = Some(id),
            SectionKind::Lead => used.lead = Some(id),
            SectionKind::PriorMeeting => used.prior_meeting = Some(id),
            SectionKind::FirstGoal => used.first = Some(id),
            SectionKind::GoalGroup => used.group.push(id),
            SectionKind::RegularGoal => used.regular.push(id),
            SectionKind::LastGoal => used.last = Some(id),
            SectionKind::Conclusion => used.conclusion = Some(id),
        }
    }

    /// Flags of `team`; unset for a team without flags.
    pub fn flags(&self, team: TeamId) -> TeamFlags {
        self.flags.get(&team).cloned().unwrap_or_default()
    }

    pub fn flags_mut(&mut self, team: TeamId) -> &mut TeamFlags {
        self.flags.entry(team).or_default()
    }

    pub fn has_flags(&self) -> bool {
        !self.flags.is_empty()
    }

    pub fn clear_flags(&mut self) {
        self.flags.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_excludes_title() {
        let mut ctx = NarrativeContext::default();
        assert!(ctx.excluded(SectionKind::Lead).is_empty());
        ctx.record(SectionKind::Title, TemplateId(4));
        assert_eq!(ctx.excluded(SectionKind::Lead), vec![TemplateId(4)]);
        assert!(ctx.excluded(SectionKind::Title).is_empty());
    }

    #[test]
    fn goal_narratives_accumulate() {
        let mut ctx = NarrativeContext::default();
        ctx.record(SectionKind::RegularGoal, TemplateId(20));
        ctx.record(SectionKind::RegularGoal, TemplateId(21));
        ctx.record(SectionKind::GoalGroup, TemplateId(30));
        assert_eq!(ctx.excluded(SectionKind::RegularGoal), vec![TemplateId(20), TemplateId(21)]);
        assert_eq!(ctx.excluded(SectionKind::GoalGroup), vec![TemplateId(30)]);
        assert_eq!(ctx.used().all_ids().len(), 3);
    }

    #[test]
    fn single_slots_overwrite() {
        let mut ctx = NarrativeContext::default();
        ctx.record(SectionKind::Conclusion, TemplateId(60));
        ctx.record(SectionKind::Conclusion, TemplateId(61));
        assert_eq!(ctx.used().conclusion, Some(TemplateId(61)));
    }

    #[test]
    fn flags_cleared() {
        let mut ctx = NarrativeContext::default();
        ctx.flags_mut(TeamId(1)).host = true;
        assert!(ctx.flags(TeamId(1)).host);
        assert!(!ctx.flags(TeamId(2)).host);
        ctx.clear_flags();
        assert!(!ctx.has_flags());
        assert_eq!(ctx.flags(TeamId(1)), TeamFlags::default());
    }

    #[test]
    fn section_pools() {
        assert_eq!(SectionKind::Lead.category(), PhraseCategory::Title);
        assert!(SectionKind::GoalGroup.is_goal_narrative());
        assert!(!SectionKind::LastGoal.is_goal_narrative());
    }
}
