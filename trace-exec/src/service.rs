use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::{
    dispatcher::Dispatcher,
    types::{ExecutionRequest, ExecutionResult, ResourceLimits},
};

/// Shared execution front door: a semaphore in front of the dispatcher caps
/// how many requests run at once, the rest queue for a permit
#[derive(Clone)]
pub struct ExecutionService {
    dispatcher: Arc<Dispatcher>,
    semaphore: Arc<Semaphore>,
}

impl ExecutionService {
    pub fn new(max_concurrent_executions: usize, limits: ResourceLimits) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(limits)),
            semaphore: Arc::new(Semaphore::new(max_concurrent_executions)),
        }
    }

    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                return ExecutionResult::failure(format!(
                    "Execution error: failed to acquire execution permit: {}",
                    e
                ))
            }
        };

        debug!(
            "Starting code execution for language: {:?}",
            request.language
        );

        let result = self.dispatcher.execute(&request).await;

        if result.success {
            info!("Code execution completed successfully");
        } else {
            error!("Code execution failed: {}", result.error);
        }

        result
    }

    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}
