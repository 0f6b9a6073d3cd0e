use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// Supported programming languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    C,
    Cpp,
    Java,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        match s.as_str() {
            "python" => Ok(Language::Python),
            "c" => Ok(Language::C),
            "cpp" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            _ => Err(format!("Unsupported language: {}", s)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::Python => "python",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
        };
        write!(f, "{}", name)
    }
}

/// Code execution request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Programming language
    pub language: Language,
    /// Source code to execute
    pub code: String,
    /// Structured input bound into the program; only the Python path reads it
    #[serde(default)]
    pub input_data: Option<serde_json::Value>,
    /// Wall-clock deadline per phase
    #[serde(
        with = "duration_serde",
        rename = "timeout_seconds",
        default = "default_timeout"
    )]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

/// One recorded line of an interpreted execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    /// 1-based line number in the submitted source
    pub line: u32,
    /// JSON-safe snapshot of the visible local bindings at that line
    pub locals: serde_json::Map<String, serde_json::Value>,
}

/// Execution result, returned for every request regardless of outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the program ran to completion
    pub success: bool,
    /// Program output (stdout, trimmed)
    pub output: String,
    /// Compiler diagnostic, runtime stderr, or internal message
    pub error: String,
    /// Line-by-line trace; empty for compiled languages
    pub steps: Vec<TraceStep>,
    /// Measured wall-clock time of the instrumented run, in milliseconds
    pub execution_time_ms: u64,
}

impl ExecutionResult {
    /// A failed result carrying only an error message
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: error.into(),
            steps: Vec::new(),
            execution_time_ms: 0,
        }
    }

    /// The uniform result for a run that exceeded its deadline; reports the
    /// configured limit as the elapsed time
    pub fn timed_out(limit_secs: u64) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: format!("Code execution timed out ({} second limit).", limit_secs),
            steps: Vec::new(),
            execution_time_ms: limit_secs.saturating_mul(1000),
        }
    }

    /// Fold a pipeline error into the uniform result shape
    pub fn from_error(err: Error) -> Self {
        match err {
            Error::Compilation(diagnostic) => {
                Self::failure(format!("Compilation error:\n{}", diagnostic))
            }
            Error::Timeout(secs) => Self::timed_out(secs),
            other => Self::failure(format!("Execution error: {}", other)),
        }
    }
}

/// Resource limits applied to executed programs
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    /// Maximum address space (bytes)
    pub memory: u64,
    /// Maximum file size (bytes)
    pub file_size: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory: 512 * 1024 * 1024,   // 512MB
            file_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
