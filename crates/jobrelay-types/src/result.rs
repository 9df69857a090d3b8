use serde::{Deserialize, Serialize};

use crate::error::ExecutorError;

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// Successful provider output before it is folded into an [`ExecutionResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub output: String,
    pub usage: TokenUsage,
}

/// Normalized outcome of a single job execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    Success { output: String, usage: TokenUsage },
    Failure { error: String },
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>, usage: TokenUsage) -> Self {
        ExecutionResult::Success {
            output: output.into(),
            usage,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ExecutionResult::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    pub fn output(&self) -> Option<&str> {
        match self {
            ExecutionResult::Success { output, .. } => Some(output),
            ExecutionResult::Failure { .. } => None,
        }
    }

    pub fn usage(&self) -> Option<TokenUsage> {
        match self {
            ExecutionResult::Success { usage, .. } => Some(*usage),
            ExecutionResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ExecutionResult::Success { .. } => None,
            ExecutionResult::Failure { error } => Some(error),
        }
    }
}

impl From<Completion> for ExecutionResult {
    fn from(c: Completion) -> Self {
        ExecutionResult::Success {
            output: c.output,
            usage: c.usage,
        }
    }
}

impl From<ExecutorError> for ExecutionResult {
    fn from(e: ExecutorError) -> Self {
        ExecutionResult::Failure {
            error: e.to_string(),
        }
    }
}

impl From<Result<Completion, ExecutorError>> for ExecutionResult {
    fn from(r: Result<Completion, ExecutorError>) -> Self {
        match r {
            Ok(c) => c.into(),
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_serialization_shape() {
        let result = ExecutionResult::success("hello", TokenUsage::new(10, 5));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["output"], "hello");
        assert_eq!(value["usage"]["input_tokens"], 10);
        assert_eq!(value["usage"]["output_tokens"], 5);
    }

    #[test]
    fn test_failure_serialization_shape() {
        let value = serde_json::to_value(ExecutionResult::failure("nope")).unwrap();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["error"], "nope");
        assert!(value.get("output").is_none());
    }

    #[test]
    fn test_from_error_keeps_message() {
        let err = ExecutorError::Provider {
            status: 500,
            body: "internal error".to_string(),
        };
        let result: ExecutionResult = Err::<Completion, _>(err).into();
        let msg = result.error().unwrap();
        assert!(msg.contains("500"));
        assert!(msg.contains("internal error"));
    }

    #[test]
    fn test_accessors() {
        let ok = ExecutionResult::success("x", TokenUsage::new(1, 1));
        assert!(ok.is_success());
        assert_eq!(ok.output(), Some("x"));
        assert_eq!(ok.error(), None);

        let err = ExecutionResult::failure("bad");
        assert!(!err.is_success());
        assert_eq!(err.usage(), None);
    }
}
