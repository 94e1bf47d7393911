//! hashdrop-core — digest engine, payload generation, record types and
//! configuration. All other hashdrop crates depend on this one.

pub mod config;
pub mod crypto;
pub mod payload;
pub mod record;
pub mod wire;

pub use crypto::{digest, Digest};
pub use payload::PayloadSpec;
pub use record::{PayloadLocator, TransferMetadata, VerificationRecord, VerificationStatus};
