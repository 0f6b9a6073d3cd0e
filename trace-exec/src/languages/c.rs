use async_trait::async_trait;

use crate::{
    dispatcher::LanguageExecutor,
    error::Error,
    languages::completed_result,
    runner::ProcessRunner,
    types::{ExecutionRequest, ExecutionResult},
    workspace::Workspace,
};

pub struct CExecutor {
    compiler: String,
}

impl CExecutor {
    pub fn new(compiler: Option<String>) -> Self {
        Self {
            compiler: compiler.unwrap_or_else(|| "gcc".to_string()),
        }
    }
}

#[async_trait]
impl LanguageExecutor for CExecutor {
    async fn prepare(&self, request: &ExecutionRequest) -> Result<Workspace, Error> {
        Workspace::source_file("c", &request.code).await
    }

    async fn compile(
        &self,
        workspace: &Workspace,
        runner: &ProcessRunner,
        request: &ExecutionRequest,
    ) -> Result<(), Error> {
        let source = workspace.source().to_string_lossy();
        let artifact = workspace.artifact();
        let artifact = artifact.to_string_lossy();

        let output = runner
            .run(
                &self.compiler,
                &[source.as_ref(), "-o", artifact.as_ref()],
                None,
                request.timeout,
            )
            .await?
            .into_output(request.timeout)?;

        if !output.success() {
            return Err(Error::Compilation(output.stderr));
        }
        Ok(())
    }

    async fn run(
        &self,
        workspace: &Workspace,
        runner: &ProcessRunner,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, Error> {
        let artifact = workspace.artifact();
        let output = runner
            .run(&artifact.to_string_lossy(), &[], None, request.timeout)
            .await?
            .into_output(request.timeout)?;

        Ok(completed_result(&output))
    }
}
