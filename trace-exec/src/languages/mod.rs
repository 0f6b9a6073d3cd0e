//! Language-specific execution strategies

mod c;
mod cpp;
mod java;
mod python;

pub use c::CExecutor;
pub use cpp::CppExecutor;
pub use java::JavaExecutor;
pub use python::PythonExecutor;

use crate::runner::ProcessOutput;
use crate::types::ExecutionResult;

/// Result shape shared by the compiled run phases: the exit status drives the
/// success flag, stdout and stderr are trimmed, and timing is not measured
pub(crate) fn completed_result(output: &ProcessOutput) -> ExecutionResult {
    ExecutionResult {
        success: output.success(),
        output: output.stdout.trim().to_string(),
        error: output.stderr.trim().to_string(),
        steps: Vec::new(),
        execution_time_ms: 0,
    }
}

#[cfg(test)]
pub(crate) fn skip_if_not_available(tools: &[&str]) -> bool {
    let missing: Vec<_> = tools
        .iter()
        .filter(|tool| which::which(**tool).is_err())
        .map(|s| (*s).to_string())
        .collect();

    if !missing.is_empty() {
        eprintln!("Skipping test: {} not available", missing.join(", "));
        return true;
    }
    false
}
