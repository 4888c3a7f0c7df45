//! # Credex Testkit
//!
//! Testing utilities for Credex.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Helper structs wiring the engines over in-memory
//!   backends, with scripted analysis providers
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use credex_testkit::fixtures::{FixedProvider, TestFixture};
//!
//! # async fn example() {
//! let fixture = TestFixture::new();
//! let engine = fixture.equivalence_engine(FixedProvider::approving());
//! let index = engine.create_request("A", "B", "inst1", false).await.unwrap();
//! # }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use credex_testkit::generators::percent_string;
//!
//! proptest! {
//!     #[test]
//!     fn percent_normalization_is_idempotent(s in percent_string()) {
//!         let once = credex::Percent::parse(&s).unwrap();
//!         let twice = credex::Percent::parse(once.as_str()).unwrap();
//!         prop_assert_eq!(once, twice);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{FailingProvider, FixedProvider, TestFixture};
pub use generators::{group_type, percent_string, subject_code, subject_id};
