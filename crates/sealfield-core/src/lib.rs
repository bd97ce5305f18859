//! # Sealfield Core
//!
//! Pure primitives shared by every Sealfield crate: key identifiers, resolved
//! key material, and the normalized broker error model.
//!
//! This crate contains no I/O and no async code.
//!
//! ## Key Types
//!
//! - [`KeyUri`] - Opaque, possibly migrating key identifier (`kms://host/keys/id`)
//! - [`KeyMaterial`] - A resolved key: canonical URI plus an opaque JWK
//! - [`KeyRef`] - What a crypto primitive receives: a bare URI or resolved material
//! - [`KmsError`] - Immutable broker failure, built only from a broker reply
//!
//! ## Error rendering
//!
//! [`KmsError`] renders as exactly four lines. Log aggregation parses this
//! output, so the format must not change.

pub mod error;
pub mod types;

pub use error::{codes, BrokerReply, CoreError, KmsError, Result};
pub use types::{KeyMaterial, KeyRef, KeyUri};
