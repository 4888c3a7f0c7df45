//! Subject content: essential fields on-ledger, extended content in the
//! blob store.
//!
//! A subject record carries only what queries need. The heavyweight
//! curriculum payload (objectives, bibliography, topic units) lives in the
//! content-addressed store, referenced by a `(content_hash, content_locator)`
//! pair that is either fully set or fully empty.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::record::{dim, IndexEntry, Record};

/// Classification of a subject within its course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    Required,
    Elective,
    Optional,
    Extracurricular,
}

impl SubjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Elective => "elective",
            Self::Optional => "optional",
            Self::Extracurricular => "extracurricular",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "required" => Ok(Self::Required),
            "elective" => Ok(Self::Elective),
            "optional" => Ok(Self::Optional),
            "extracurricular" => Ok(Self::Extracurricular),
            other => Err(CoreError::UnknownSubjectType(other.to_string())),
        }
    }
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Essential subject fields, stored directly in the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectContent {
    /// Primary index, assigned by the store's monotonic counter.
    pub index: String,

    /// Stable subject identifier; equal to `index`.
    pub subject_id: String,

    pub institution: String,
    pub course_id: String,
    pub title: String,
    pub code: String,
    pub credits: u32,
    pub workload_hours: u32,
    pub subject_type: SubjectType,
    pub knowledge_area: String,

    /// SHA-256 hex digest of the extended-content blob. Either both this
    /// and `content_locator` are set, or both are empty.
    pub content_hash: String,

    /// Locator of the extended-content blob in the content-addressed store.
    pub content_locator: String,
}

impl SubjectContent {
    /// Whether this subject carries extended content in the blob store.
    pub fn has_extended_content(&self) -> bool {
        !self.content_locator.is_empty()
    }

    /// Validate essential fields and the hash/locator pairing invariant.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.institution.is_empty() {
            return Err(CoreError::EmptyField("institution"));
        }
        if self.course_id.is_empty() {
            return Err(CoreError::EmptyField("course id"));
        }
        if self.title.is_empty() {
            return Err(CoreError::EmptyField("title"));
        }
        if self.code.is_empty() {
            return Err(CoreError::EmptyField("code"));
        }
        if self.credits == 0 {
            return Err(CoreError::ZeroField("credits"));
        }
        if self.workload_hours == 0 {
            return Err(CoreError::ZeroField("workload hours"));
        }
        if self.content_hash.is_empty() != self.content_locator.is_empty() {
            return Err(CoreError::DanglingContentRef);
        }
        Ok(())
    }
}

impl Record for SubjectContent {
    const KIND: &'static str = "subject";

    fn index(&self) -> &str {
        &self.index
    }

    fn set_index(&mut self, index: String) {
        // The subject id is the index; both are assigned together.
        self.subject_id = index.clone();
        self.index = index;
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::new(dim::INSTITUTION, &self.institution),
            IndexEntry::new(dim::COURSE, &self.course_id),
        ]
    }
}

/// The extended curriculum payload, serialized as a JSON blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedContent {
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default, rename = "topicUnits")]
    pub topic_units: Vec<String>,
    #[serde(default)]
    pub methodologies: Vec<String>,
    #[serde(default, rename = "evaluationMethods")]
    pub evaluation_methods: Vec<String>,
    #[serde(default, rename = "bibliographyBasic")]
    pub bibliography_basic: Vec<String>,
    #[serde(default, rename = "bibliographyComplementary")]
    pub bibliography_complementary: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ExtendedContent {
    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty()
            && self.topic_units.is_empty()
            && self.methodologies.is_empty()
            && self.evaluation_methods.is_empty()
            && self.bibliography_basic.is_empty()
            && self.bibliography_complementary.is_empty()
            && self.keywords.is_empty()
    }

    /// Serialize to the blob form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(|e| CoreError::Encoding(e.to_string()))
    }

    /// Deserialize from the blob form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::Encoding(e.to_string()))
    }

    /// Merge a partial update: only the provided fields are replaced.
    pub fn apply(&mut self, patch: ExtendedContentPatch) {
        if let Some(v) = patch.objectives {
            self.objectives = v;
        }
        if let Some(v) = patch.topic_units {
            self.topic_units = v;
        }
        if let Some(v) = patch.methodologies {
            self.methodologies = v;
        }
        if let Some(v) = patch.evaluation_methods {
            self.evaluation_methods = v;
        }
        if let Some(v) = patch.bibliography_basic {
            self.bibliography_basic = v;
        }
        if let Some(v) = patch.bibliography_complementary {
            self.bibliography_complementary = v;
        }
        if let Some(v) = patch.keywords {
            self.keywords = v;
        }
    }
}

/// A partial extended-content update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtendedContentPatch {
    pub objectives: Option<Vec<String>>,
    pub topic_units: Option<Vec<String>>,
    pub methodologies: Option<Vec<String>>,
    pub evaluation_methods: Option<Vec<String>>,
    pub bibliography_basic: Option<Vec<String>>,
    pub bibliography_complementary: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
}

impl ExtendedContentPatch {
    pub fn is_empty(&self) -> bool {
        self.objectives.is_none()
            && self.topic_units.is_none()
            && self.methodologies.is_none()
            && self.evaluation_methods.is_none()
            && self.bibliography_basic.is_none()
            && self.bibliography_complementary.is_none()
            && self.keywords.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_subject() -> SubjectContent {
        SubjectContent {
            index: "1".to_string(),
            subject_id: "1".to_string(),
            institution: "inst1".to_string(),
            course_id: "cs".to_string(),
            title: "Algorithms".to_string(),
            code: "CS101".to_string(),
            credits: 4,
            workload_hours: 60,
            subject_type: SubjectType::Required,
            knowledge_area: "computing".to_string(),
            content_hash: String::new(),
            content_locator: String::new(),
        }
    }

    #[test]
    fn test_validate_essential_fields() {
        sample_subject().validate().unwrap();

        let mut s = sample_subject();
        s.title = String::new();
        assert!(s.validate().is_err());

        let mut s = sample_subject();
        s.credits = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_dangling_content_ref() {
        let mut s = sample_subject();
        s.content_hash = "abc".to_string();
        assert!(matches!(s.validate(), Err(CoreError::DanglingContentRef)));

        s.content_locator = "mem://abc".to_string();
        s.validate().unwrap();
    }

    #[test]
    fn test_set_index_assigns_subject_id() {
        let mut s = sample_subject();
        s.index = String::new();
        s.subject_id = String::new();
        s.set_index("7".to_string());
        assert_eq!(s.index, "7");
        assert_eq!(s.subject_id, "7");
    }

    #[test]
    fn test_extended_content_merge() {
        let mut content = ExtendedContent {
            objectives: vec!["o1".to_string()],
            keywords: vec!["k1".to_string()],
            ..Default::default()
        };

        content.apply(ExtendedContentPatch {
            objectives: Some(vec!["o2".to_string()]),
            topic_units: Some(vec!["t1".to_string()]),
            ..Default::default()
        });

        assert_eq!(content.objectives, vec!["o2".to_string()]);
        assert_eq!(content.topic_units, vec!["t1".to_string()]);
        // Untouched by the patch.
        assert_eq!(content.keywords, vec!["k1".to_string()]);
    }

    #[test]
    fn test_extended_content_blob_roundtrip() {
        let content = ExtendedContent {
            objectives: vec!["understand sorting".to_string()],
            bibliography_basic: vec!["CLRS".to_string()],
            ..Default::default()
        };
        let bytes = content.to_bytes().unwrap();
        assert_eq!(ExtendedContent::from_bytes(&bytes).unwrap(), content);
    }
}
