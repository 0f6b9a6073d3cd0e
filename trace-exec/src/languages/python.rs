use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::{
    dispatcher::LanguageExecutor,
    error::Error,
    protocol::TraceCodec,
    runner::ProcessRunner,
    types::{ExecutionRequest, ExecutionResult},
    workspace::Workspace,
};

/// Interpreted strategy: stages an instrumented wrapper instead of the bare
/// source, then reconstructs the trace from the run's stdout
pub struct PythonExecutor {
    interpreter: String,
    codec: Arc<dyn TraceCodec>,
}

impl PythonExecutor {
    pub fn new(interpreter: Option<String>, codec: Arc<dyn TraceCodec>) -> Self {
        Self {
            interpreter: interpreter.unwrap_or_else(|| "python3".to_string()),
            codec,
        }
    }
}

#[async_trait]
impl LanguageExecutor for PythonExecutor {
    async fn prepare(&self, request: &ExecutionRequest) -> Result<Workspace, Error> {
        let default_input = Value::Array(Vec::new());
        let input = request.input_data.as_ref().unwrap_or(&default_input);
        let wrapper = self.codec.instrument(&request.code, input);
        Workspace::source_file("py", &wrapper).await
    }

    async fn run(
        &self,
        workspace: &Workspace,
        runner: &ProcessRunner,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, Error> {
        let source = workspace.source().to_string_lossy();
        let output = runner
            .run(&self.interpreter, &[source.as_ref()], None, request.timeout)
            .await?
            .into_output(request.timeout)?;

        let decoded = self.codec.decode(&output.stdout)?;

        // The in-band error wins; process stderr only fills in when the
        // wrapper reported none (e.g. the interpreter died before emitting)
        let error = match decoded.payload.error {
            Some(message) if !message.is_empty() => message,
            _ => output.stderr.trim().to_string(),
        };

        Ok(ExecutionResult {
            success: decoded.payload.success,
            output: decoded.output,
            error,
            steps: decoded.payload.steps,
            execution_time_ms: decoded.payload.execution_time_ms,
        })
    }
}
