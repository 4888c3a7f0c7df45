//! # Credex Core
//!
//! Pure primitives for the Credex equivalence ledger: record types,
//! canonical hashing, and the prerequisite evaluator.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over domain data structures.
//!
//! ## Key Types
//!
//! - [`EquivalenceRecord`] - The unit of state tracking how strongly two
//!   subjects are deemed academically equivalent
//! - [`SubjectContent`] - Essential subject fields plus a reference into
//!   the content-addressed blob store
//! - [`PrerequisiteGroup`] - Boolean/threshold logic over a student's
//!   completed-subject set
//! - [`Record`] - The contract every persisted record type fulfils:
//!   a kind, a primary index, and its secondary-index entries
//!
//! ## Canonicalization
//!
//! Analysis metadata is hashed over a deterministic CBOR encoding.
//! See the [`canonical`] module.

pub mod canonical;
pub mod equivalence;
pub mod error;
pub mod hash;
pub mod percent;
pub mod prerequisite;
pub mod record;
pub mod subject;

pub use canonical::{analysis_digest, canonical_value_bytes};
pub use equivalence::{EquivalenceRecord, EquivalenceStatus};
pub use error::CoreError;
pub use hash::Sha256Hash;
pub use percent::Percent;
pub use prerequisite::{
    evaluate_group, missing_subjects, CompletedSubjects, CreditsPolicy, GroupType,
    PrerequisiteGroup,
};
pub use record::{dim, IndexEntry, Record};
pub use subject::{ExtendedContent, ExtendedContentPatch, SubjectContent, SubjectType};
