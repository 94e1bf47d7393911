//! hashdrop-services — the producer's payload generator and the consumer's
//! transfer client, verification logs and payload sources.

pub mod generator;
pub mod log;
pub mod source;
pub mod sqlite_log;
pub mod transfer;

pub use generator::{GeneratorError, PayloadGenerator};
pub use log::{LogError, MemoryLog, VerificationLog};
pub use source::{HttpPayloadSource, PayloadSource, SourceError};
pub use sqlite_log::SqliteLog;
pub use transfer::{CycleError, CycleState, TransferClient, TransferSettings};
