use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::JobExecutor;
use crate::config::ExecutorConfig;
use crate::prompt::{build_prompt, system_prompt_for};
use crate::simulate;
use jobrelay_types::{Completion, ExecutionResult, ExecutorError, Job, PromptProfile, TokenUsage};

/// Base delay between retry attempts, doubled per attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Upper bound on a single backoff sleep.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Executor that sends jobs to the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct ClaudeApiExecutor {
    client: Client,
    config: ExecutorConfig,
}

// -- Messages API request/response types --

#[derive(Debug, Serialize)]
pub(crate) struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl ClaudeApiExecutor {
    /// Build an executor with its own HTTP client.
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutorError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ExecutorError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Validate the job and assemble the request body. No I/O happens here.
    pub(crate) fn build_request(
        &self,
        job: &Job,
        profile: Option<&PromptProfile>,
    ) -> Result<MessagesRequest, ExecutorError> {
        job.validate()?;
        let context = job.context()?;

        Ok(MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: system_prompt_for(profile).to_string(),
            messages: vec![ApiMessage {
                role: "user",
                content: build_prompt(job, &context),
            }],
        })
    }

    async fn try_execute(
        &self,
        job: &Job,
        profile: Option<&PromptProfile>,
    ) -> Result<Completion, ExecutorError> {
        let request = self.build_request(job, profile)?;

        tracing::debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            model = %request.model,
            prompt_len = request.messages[0].content.len(),
            "sending job to provider"
        );

        let mut attempt = 0;
        loop {
            match self.send_request(&request).await {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = retry_delay(attempt);
                    attempt += 1;
                    tracing::warn!(
                        job_id = %job.id,
                        attempt,
                        error = %e,
                        "transient provider failure, retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    /// Perform one POST to the Messages API.
    async fn send_request(&self, request: &MessagesRequest) -> Result<Completion, ExecutorError> {
        let response = self
            .client
            .post(self.config.messages_url())
            .header("content-type", "application/json")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(request)
            .send()
            .await
            .map_err(|e| ExecutorError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExecutorError::Transport(format!("Failed to read response body: {e}")))?;

        if status != StatusCode::OK {
            return Err(ExecutorError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(&body)
    }
}

/// Extract the first text block and the token counts from a 200 body.
fn parse_response(body: &str) -> Result<Completion, ExecutorError> {
    let parsed: MessagesResponse =
        serde_json::from_str(body).map_err(|e| ExecutorError::ResponseParse(e.to_string()))?;

    let output = parsed
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .ok_or_else(|| {
            ExecutorError::ResponseParse("response contained no text content".to_string())
        })?;

    Ok(Completion {
        output,
        usage: TokenUsage::new(parsed.usage.input_tokens, parsed.usage.output_tokens),
    })
}

#[async_trait]
impl JobExecutor for ClaudeApiExecutor {
    async fn execute(&self, job: &Job, profile: Option<&PromptProfile>) -> ExecutionResult {
        let result = self.try_execute(job, profile).await;
        match &result {
            Ok(c) => tracing::info!(
                job_id = %job.id,
                input_tokens = c.usage.input_tokens,
                output_tokens = c.usage.output_tokens,
                "job completed"
            ),
            Err(e) => tracing::warn!(job_id = %job.id, error = %e, "job failed"),
        }
        result.into()
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn simulate_job(&self, job: &Job) -> ExecutionResult {
        simulate::simulate_job(job, self.config.simulation_delay()).await
    }

    fn name(&self) -> &str {
        "ClaudeApiExecutor"
    }
}

/// Backoff before retry number `attempt + 1`: exponential from
/// `RETRY_BASE_DELAY`, capped at `MAX_RETRY_DELAY`.
fn retry_delay(attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    RETRY_BASE_DELAY.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobrelay_types::ContextData;

    fn executor() -> ClaudeApiExecutor {
        ClaudeApiExecutor::new(ExecutorConfig::default().with_api_key("test-key")).unwrap()
    }

    #[test]
    fn test_retry_delay_doubles_then_caps() {
        assert_eq!(retry_delay(0), Duration::from_millis(250));
        assert_eq!(retry_delay(1), Duration::from_millis(500));
        assert_eq!(retry_delay(4), Duration::from_secs(4));
        assert_eq!(retry_delay(7), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(31), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(32), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(u32::MAX), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_request_body_shape() {
        let job = Job::new("debug", "Fix the crash");
        let request = executor().build_request(&job, None).unwrap();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "claude-3-5-sonnet-20241022");
        assert_eq!(json["max_tokens"], 4096);
        assert_eq!(json["system"], crate::DEFAULT_SYSTEM_PROMPT);
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(
            json["messages"][0]["content"]
                .as_str()
                .unwrap()
                .contains("Fix the crash")
        );
    }

    #[test]
    fn test_request_uses_profile_system_prompt() {
        let job = Job::new("feature", "Add search");
        let profile = PromptProfile::new("Be terse.");
        let request = executor().build_request(&job, Some(&profile)).unwrap();
        assert_eq!(request.system, "Be terse.");
    }

    #[test]
    fn test_request_carries_context() {
        let ctx = ContextData {
            files: Some(vec!["src/app.ts".into()]),
            current_code: Some("let a = 1;".into()),
        };
        let job = Job::new("refactor", "Use const").with_context(&ctx);
        let request = executor().build_request(&job, None).unwrap();
        let content = &request.messages[0].content;
        assert!(content.contains("src/app.ts"));
        assert!(content.contains("let a = 1;"));
    }

    #[test]
    fn test_build_request_rejects_bad_context() {
        let job = Job::new("debug", "x").with_raw_context("{not json");
        let err = executor().build_request(&job, None).unwrap_err();
        assert!(matches!(err, ExecutorError::RequestBuild(_)));
    }

    #[test]
    fn test_parse_response_first_block() {
        let body = r#"{
            "content": [{"type": "text", "text": "first"}, {"type": "text", "text": "second"}],
            "usage": {"input_tokens": 12, "output_tokens": 34}
        }"#;
        let completion = parse_response(body).unwrap();
        assert_eq!(completion.output, "first");
        assert_eq!(completion.usage, TokenUsage::new(12, 34));
    }

    #[test]
    fn test_parse_response_malformed() {
        let err = parse_response("<html>oops").unwrap_err();
        assert!(matches!(err, ExecutorError::ResponseParse(_)));
    }

    #[test]
    fn test_parse_response_empty_content() {
        let body = r#"{"content": [], "usage": {"input_tokens": 1, "output_tokens": 0}}"#;
        let err = parse_response(body).unwrap_err();
        assert!(err.to_string().contains("no text content"));
    }

    #[test]
    fn test_name_and_configured() {
        let exec = executor();
        assert_eq!(exec.name(), "ClaudeApiExecutor");
        assert!(exec.is_configured());

        let unconfigured = ClaudeApiExecutor::new(ExecutorConfig::default()).unwrap();
        assert!(!unconfigured.is_configured());
    }
}
