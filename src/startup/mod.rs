//! Process startup module
//!
//! Everything that happens between argument parsing and the command body:
//! the one-time initialization sequence (configuration environment, logging,
//! resource limits, error reporting) and the invocation audit record.

pub mod audit;
pub mod limits;
pub mod logging;
pub mod reporting;
pub mod sequencer;

pub use audit::{InvocationRecord, REDACTION_MARKER};
pub use sequencer::{InitContext, InitSequencer, InitStage};
