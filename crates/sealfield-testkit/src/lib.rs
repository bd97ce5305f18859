//! # Sealfield Testkit
//!
//! Testing utilities for Sealfield.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Crypto stubs**: deterministic [`CryptoProvider`](sealfield_codec::CryptoProvider)
//!   implementations that count their calls
//! - **Fixtures**: a memory broker wired to a client and a service
//! - **Generators**: Proptest strategies for key URIs and feature records
//!
//! ## Test Fixtures
//!
//! ```rust
//! use sealfield_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let service = fixture.service();
//! assert_eq!(fixture.broker.call_count(), 0);
//! # drop(service);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use sealfield_testkit::generators::task_request;
//!
//! proptest! {
//!     #[test]
//!     fn encrypt_keeps_status(request in task_request()) {
//!         // ...
//!     }
//! }
//! ```

pub mod crypto;
pub mod fixtures;
pub mod generators;

pub use crypto::{FixedCrypto, ReversibleCrypto};
pub use fixtures::{init_tracing, TestFixture};
