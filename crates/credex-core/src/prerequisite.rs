//! Prerequisite groups and the eligibility evaluator.
//!
//! A prerequisite group attaches boolean/threshold logic to a subject.
//! Evaluation is a pure function over the group and a student's
//! completed-subject set; no storage is involved.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::CoreError;
use crate::record::{dim, IndexEntry, Record};

/// How a group's subject list is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupType {
    /// Every listed subject must be completed.
    All,
    /// At least one listed subject must be completed.
    Any,
    /// The completed subset must satisfy the group's thresholds; see
    /// [`CreditsPolicy`] for how the two thresholds combine.
    Credits,
}

impl GroupType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Any => "ANY",
            Self::Credits => "CREDITS",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "ALL" => Ok(Self::All),
            "ANY" => Ok(Self::Any),
            "CREDITS" => Ok(Self::Credits),
            other => Err(CoreError::UnknownGroupType(other.to_string())),
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prerequisite group owned by a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrerequisiteGroup {
    /// Primary index, assigned by the store's monotonic counter.
    pub id: String,

    /// The subject this group gates.
    pub subject_id: String,

    pub group_type: GroupType,

    /// Minimum credit sum over the completed subset (Credits groups).
    pub minimum_credits: u64,

    /// Minimum number of completed subjects from the list (Credits groups).
    pub minimum_completed_subjects: u64,

    /// The subjects this group ranges over. Every id must reference an
    /// existing subject at group-creation time.
    pub subject_ids: Vec<String>,
}

impl Record for PrerequisiteGroup {
    const KIND: &'static str = "prerequisite-group";

    fn index(&self) -> &str {
        &self.id
    }

    fn set_index(&mut self, index: String) {
        self.id = index;
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![IndexEntry::new(dim::SUBJECT, &self.subject_id)]
    }
}

/// How the two `Credits` thresholds combine.
///
/// The source never pins this down; both interpretations are supported
/// and the caller chooses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditsPolicy {
    /// Both the credit sum and the completed count must be met.
    RequireBoth,
    /// Meeting either threshold is enough.
    RequireEither,
}

/// A student's completed subjects, with the credits earned per subject.
#[derive(Debug, Clone, Default)]
pub struct CompletedSubjects {
    credits: HashMap<String, u64>,
}

impl CompletedSubjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subject_id: impl Into<String>, credits: u64) {
        self.credits.insert(subject_id.into(), credits);
    }

    pub fn contains(&self, subject_id: &str) -> bool {
        self.credits.contains_key(subject_id)
    }

    pub fn credits_of(&self, subject_id: &str) -> u64 {
        self.credits.get(subject_id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.credits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credits.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for CompletedSubjects {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            credits: iter.into_iter().map(|(s, c)| (s.into(), c)).collect(),
        }
    }
}

/// Evaluate a group against a completed-subject set.
///
/// `All` over an empty subject list is vacuously satisfied; `Any` is not.
pub fn evaluate_group(
    group: &PrerequisiteGroup,
    completed: &CompletedSubjects,
    policy: CreditsPolicy,
) -> bool {
    match group.group_type {
        GroupType::All => group.subject_ids.iter().all(|id| completed.contains(id)),
        GroupType::Any => group.subject_ids.iter().any(|id| completed.contains(id)),
        GroupType::Credits => {
            let (credit_sum, count) = completed_subset(group, completed);
            let meets_credits = credit_sum >= group.minimum_credits;
            let meets_count = count >= group.minimum_completed_subjects;
            match policy {
                CreditsPolicy::RequireBoth => meets_credits && meets_count,
                CreditsPolicy::RequireEither => meets_credits || meets_count,
            }
        }
    }
}

/// The subjects a student is still missing for a group, for reporting.
///
/// For an unsatisfied `Any` or `Credits` group, every uncompleted listed
/// subject is a candidate and all of them are reported.
pub fn missing_subjects(
    group: &PrerequisiteGroup,
    completed: &CompletedSubjects,
    policy: CreditsPolicy,
) -> Vec<String> {
    if evaluate_group(group, completed, policy) {
        return Vec::new();
    }
    group
        .subject_ids
        .iter()
        .filter(|id| !completed.contains(id))
        .cloned()
        .collect()
}

/// Credit sum and count over the intersection of the group's subjects
/// with the completed set.
fn completed_subset(group: &PrerequisiteGroup, completed: &CompletedSubjects) -> (u64, u64) {
    let mut credit_sum = 0u64;
    let mut count = 0u64;
    for id in &group.subject_ids {
        if completed.contains(id) {
            credit_sum += completed.credits_of(id);
            count += 1;
        }
    }
    (credit_sum, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(group_type: GroupType, subject_ids: &[&str]) -> PrerequisiteGroup {
        PrerequisiteGroup {
            id: "1".to_string(),
            subject_id: "target".to_string(),
            group_type,
            minimum_credits: 0,
            minimum_completed_subjects: 0,
            subject_ids: subject_ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn completed(pairs: &[(&str, u64)]) -> CompletedSubjects {
        pairs.iter().map(|&(id, c)| (id, c)).collect()
    }

    #[test]
    fn test_group_type_roundtrip() {
        for gt in [GroupType::All, GroupType::Any, GroupType::Credits] {
            assert_eq!(GroupType::parse(gt.as_str()).unwrap(), gt);
        }
        assert!(GroupType::parse("COMBINATION").is_err());
        assert!(GroupType::parse("all").is_err());
    }

    #[test]
    fn test_all_requires_every_subject() {
        let g = group(GroupType::All, &["a", "b"]);
        let done = completed(&[("a", 4), ("b", 4)]);
        assert!(evaluate_group(&g, &done, CreditsPolicy::RequireBoth));

        let partial = completed(&[("a", 4)]);
        assert!(!evaluate_group(&g, &partial, CreditsPolicy::RequireBoth));
        assert_eq!(
            missing_subjects(&g, &partial, CreditsPolicy::RequireBoth),
            vec!["b".to_string()]
        );
    }

    #[test]
    fn test_all_vacuous_on_empty_list() {
        let g = group(GroupType::All, &[]);
        assert!(evaluate_group(&g, &CompletedSubjects::new(), CreditsPolicy::RequireBoth));
    }

    #[test]
    fn test_any_requires_one() {
        let g = group(GroupType::Any, &["a", "b"]);
        assert!(evaluate_group(&g, &completed(&[("b", 2)]), CreditsPolicy::RequireBoth));
        assert!(!evaluate_group(&g, &completed(&[("c", 2)]), CreditsPolicy::RequireBoth));
    }

    #[test]
    fn test_any_fails_on_empty_list() {
        let g = group(GroupType::Any, &[]);
        assert!(!evaluate_group(&g, &completed(&[("a", 2)]), CreditsPolicy::RequireBoth));
    }

    #[test]
    fn test_credits_require_both() {
        let mut g = group(GroupType::Credits, &["a", "b", "c"]);
        g.minimum_credits = 8;
        g.minimum_completed_subjects = 2;

        // 8 credits over 2 subjects: both thresholds met.
        let done = completed(&[("a", 4), ("b", 4)]);
        assert!(evaluate_group(&g, &done, CreditsPolicy::RequireBoth));

        // 8 credits in a single subject: count threshold missed.
        let single = completed(&[("a", 8)]);
        assert!(!evaluate_group(&g, &single, CreditsPolicy::RequireBoth));

        // 2 subjects but only 4 credits: credit threshold missed.
        let thin = completed(&[("a", 2), ("b", 2)]);
        assert!(!evaluate_group(&g, &thin, CreditsPolicy::RequireBoth));
    }

    #[test]
    fn test_credits_require_either() {
        let mut g = group(GroupType::Credits, &["a", "b", "c"]);
        g.minimum_credits = 8;
        g.minimum_completed_subjects = 2;

        // Only the credit threshold is met.
        let single = completed(&[("a", 8)]);
        assert!(evaluate_group(&g, &single, CreditsPolicy::RequireEither));

        // Only the count threshold is met.
        let thin = completed(&[("a", 2), ("b", 2)]);
        assert!(evaluate_group(&g, &thin, CreditsPolicy::RequireEither));

        // Neither is met.
        let none = completed(&[("a", 2)]);
        assert!(!evaluate_group(&g, &none, CreditsPolicy::RequireEither));
    }

    #[test]
    fn test_credits_ignores_subjects_outside_group() {
        let mut g = group(GroupType::Credits, &["a"]);
        g.minimum_credits = 4;

        // "z" is completed but not part of the group.
        let done = completed(&[("z", 10)]);
        assert!(!evaluate_group(&g, &done, CreditsPolicy::RequireBoth));
    }
}
