use async_trait::async_trait;

use crate::{
    dispatcher::LanguageExecutor,
    error::Error,
    languages::completed_result,
    runner::ProcessRunner,
    types::{ExecutionRequest, ExecutionResult},
    workspace::Workspace,
};

/// The compiler ties the file name to the public class, so submissions must
/// declare `class Main` and both phases run inside the workspace directory.
pub struct JavaExecutor {
    heap_mb: u64,
}

impl JavaExecutor {
    pub fn new(heap_mb: Option<u64>) -> Self {
        Self {
            heap_mb: heap_mb.unwrap_or(256),
        }
    }
}

#[async_trait]
impl LanguageExecutor for JavaExecutor {
    async fn prepare(&self, request: &ExecutionRequest) -> Result<Workspace, Error> {
        Workspace::directory("Main.java", &request.code).await
    }

    async fn compile(
        &self,
        workspace: &Workspace,
        runner: &ProcessRunner,
        request: &ExecutionRequest,
    ) -> Result<(), Error> {
        // The JVM trips the address-space rlimit long before its heap fills;
        // memory is bounded with -Xmx on the run phase instead
        let runner = runner.without_memory_limit();
        let output = runner
            .run("javac", &["Main.java"], workspace.dir(), request.timeout)
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
        let runner = runner.without_memory_limit();
        let heap = format!("-Xmx{}m", self.heap_mb);
        let output = runner
            .run(
                "java",
                &[heap.as_str(), "Main"],
                workspace.dir(),
                request.timeout,
            )
            .await?
            .into_output(request.timeout)?;

        Ok(completed_result(&output))
    }
}
