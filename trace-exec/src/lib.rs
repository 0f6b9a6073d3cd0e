//! # Trace Execution Service
//!
//! Runs untrusted code snippets in isolated child processes under a
//! wall-clock deadline and, for Python, reconstructs a line-by-line
//! execution trace with local-variable snapshots for front-end playback.

mod dispatcher;
mod error;
mod languages;
mod protocol;
mod runner;
mod service;
mod types;
mod workspace;

pub use dispatcher::{Dispatcher, LanguageExecutor};
pub use error::Error;
pub use languages::{CExecutor, CppExecutor, JavaExecutor, PythonExecutor};
pub use protocol::{DecodedRun, SentinelCodec, TraceCodec, TracePayload};
pub use runner::{ProcessOutput, ProcessRunner, RunOutcome};
pub use service::ExecutionService;
pub use types::{ExecutionRequest, ExecutionResult, Language, ResourceLimits, TraceStep};
pub use workspace::Workspace;

/// Result type for execution pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
