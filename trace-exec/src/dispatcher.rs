use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    error::Error,
    languages::{CExecutor, CppExecutor, JavaExecutor, PythonExecutor},
    protocol::{SentinelCodec, TraceCodec},
    runner::ProcessRunner,
    types::{ExecutionRequest, ExecutionResult, Language, ResourceLimits},
    workspace::Workspace,
};

/// Per-language execution strategy: stage sources into a workspace, then
/// drive the compile and run phases through the shared process runner
#[async_trait]
pub trait LanguageExecutor: Send + Sync {
    /// Stage the source (and any instrumentation) into a fresh workspace
    async fn prepare(&self, request: &ExecutionRequest) -> Result<Workspace, Error>;

    /// Build phase; interpreted languages keep the no-op default
    async fn compile(
        &self,
        _workspace: &Workspace,
        _runner: &ProcessRunner,
        _request: &ExecutionRequest,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Run phase, producing the uniform result
    async fn run(
        &self,
        workspace: &Workspace,
        runner: &ProcessRunner,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, Error>;
}

/// Routes a request to its language strategy and folds every failure into
/// the uniform result shape; never returns an error to the caller
pub struct Dispatcher {
    runner: ProcessRunner,
    codec: Arc<dyn TraceCodec>,
}

impl Dispatcher {
    pub fn new(limits: ResourceLimits) -> Self {
        Self::with_codec(limits, Arc::new(SentinelCodec::default()))
    }

    /// A dispatcher with a custom trace framing strategy
    pub fn with_codec(limits: ResourceLimits, codec: Arc<dyn TraceCodec>) -> Self {
        Self {
            runner: ProcessRunner::new(limits),
            codec,
        }
    }

    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        match self.try_execute(request).await {
            Ok(result) => result,
            Err(err) => ExecutionResult::from_error(err),
        }
    }

    // The workspace lives until the phases are done and is released on every
    // exit path when it drops
    async fn try_execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, Error> {
        let executor = self.create_executor(request.language);
        let workspace = executor.prepare(request).await?;
        executor.compile(&workspace, &self.runner, request).await?;
        executor.run(&workspace, &self.runner, request).await
    }

    fn create_executor(&self, language: Language) -> Box<dyn LanguageExecutor> {
        match language {
            Language::Python => Box::new(PythonExecutor::new(None, Arc::clone(&self.codec))),
            Language::C => Box::new(CExecutor::new(None)),
            Language::Cpp => Box::new(CppExecutor::new(None, None)),
            Language::Java => Box::new(JavaExecutor::new(None)),
        }
    }
}
