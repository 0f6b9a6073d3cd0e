use async_trait::async_trait;

use crate::{
    dispatcher::LanguageExecutor,
    error::Error,
    languages::completed_result,
    runner::ProcessRunner,
    types::{ExecutionRequest, ExecutionResult},
    workspace::Workspace,
};

pub struct CppExecutor {
    compiler: String,
    std_version: String,
}

impl CppExecutor {
    pub fn new(compiler: Option<String>, std_version: Option<String>) -> Self {
        Self {
            compiler: compiler.unwrap_or_else(|| "g++".to_string()),
            std_version: std_version.unwrap_or_else(|| "c++17".to_string()),
        }
    }
}

#[async_trait]
impl LanguageExecutor for CppExecutor {
    async fn prepare(&self, request: &ExecutionRequest) -> Result<Workspace, Error> {
        Workspace::source_file("cpp", &request.code).await
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
        let std_flag = format!("-std={}", self.std_version);

        let output = runner
            .run(
                &self.compiler,
                &[source.as_ref(), "-o", artifact.as_ref(), std_flag.as_str()],
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::skip_if_not_available;
    use crate::types::{Language, ResourceLimits};
    use std::time::Duration;

    fn request(code: &str) -> ExecutionRequest {
        ExecutionRequest {
            language: Language::Cpp,
            code: code.to_string(),
            input_data: None,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn compiles_with_the_configured_standard() {
        if skip_if_not_available(&["g++"]) {
            return;
        }

        let executor = CppExecutor::new(None, None);
        let runner = ProcessRunner::new(ResourceLimits::default());

        // Structured bindings need -std=c++17
        let code = "#include <iostream>\n#include <utility>\n\nint main() {\n    auto [a, b] = std::pair{1, 2};\n    std::cout << a + b << std::endl;\n    return 0;\n}\n";
        let request = request(code);

        let workspace = executor.prepare(&request).await.unwrap();
        executor.compile(&workspace, &runner, &request).await.unwrap();
        let result = executor.run(&workspace, &runner, &request).await.unwrap();

        assert!(result.success, "failed: {}", result.error);
        assert_eq!(result.output, "3");
        assert!(result.error.is_empty());
        assert!(result.steps.is_empty());
    }

    #[tokio::test]
    async fn compile_failure_carries_the_diagnostic() {
        if skip_if_not_available(&["g++"]) {
            return;
        }

        let executor = CppExecutor::new(None, None);
        let runner = ProcessRunner::new(ResourceLimits::default());
        let request = request("int main() { missing }\n");

        let workspace = executor.prepare(&request).await.unwrap();
        let err = executor
            .compile(&workspace, &runner, &request)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Compilation(_)));
    }
}
