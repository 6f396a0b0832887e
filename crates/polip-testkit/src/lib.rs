//! # Polip Testkit
//!
//! Testing utilities for Polip devices.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known envelopes and keys with the tags the ingest service expects
//! - **Generators**: Proptest strategies for identities, counters and envelopes
//! - **Fixtures**: A simulated ingest service to run devices against
//!
//! ## Golden Vectors
//!
//! ```rust
//! use polip_testkit::vectors::{all_vectors, verify_all_vectors};
//!
//! assert!(verify_all_vectors().is_empty());
//! for vector in all_vectors() {
//!     println!("{}: {}", vector.name, vector.expected_tag);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use polip_testkit::generators::{envelope, shared_key};
//!
//! proptest! {
//!     #[test]
//!     fn tag_is_deterministic(env in envelope(), key in shared_key()) {
//!         prop_assert_eq!(polip_core::sign(&env, &key), polip_core::sign(&env, &key));
//!     }
//! }
//! ```
//!
//! ## Simulated Ingest
//!
//! ```rust
//! use polip_testkit::fixtures::{test_identity, MemoryIngest};
//!
//! let ingest = MemoryIngest::new();
//! ingest.set_server_value(42);
//! assert_eq!(ingest.server_value(), 42);
//! assert_eq!(test_identity().serial(), "fake-0-0001");
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{signed_ack, test_identity, MemoryIngest};
pub use generators::{envelope, identity, sequence_state, shared_key};
pub use vectors::{all_vectors, verify_all_vectors, TagVector};
