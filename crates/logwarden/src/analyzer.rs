//! Classifier boundary.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint (OpenRouter by
//! default) and turns its JSON answers into the report types. The
//! contract with the rest of the pipeline is deliberately infallible:
//! transport failures and unparseable responses become a synthetic
//! `has_issues = true` report with empty findings, so unattended runs
//! always have something to act on instead of crashing.

use anyhow::{bail, Context, Result};
use logwarden_common::{
    AnalysisReport, Config, ConfigAuditReport, GeneratedFile, HealthReport,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

const LOG_ANALYSIS_PROMPT: &str = r#"You are an expert Linux System Administrator AI.
Your task is to review the provided system logs, identify any errors, warnings, or anomalies, and suggest potential fixes.

Output your analysis in valid JSON format with the following structure:
{
    "has_issues": boolean,
    "summary": "Brief summary of the log status",
    "findings": [
        {
            "log_entry": "The specific log line or block indicating the issue",
            "severity": "critical|error|warning|info",
            "explanation": "What this error means",
            "suggested_fix": {
                "description": "Human readable description of the fix",
                "command": "The exact shell command to run to fix it (or null if unrelated to a command)",
                "requires_sudo": boolean
            }
        }
    ]
}
If existing logs are just information or empty, set has_issues to false."#;

const CONFIG_AUDIT_PROMPT: &str = r#"You are an expert DevOps Engineer and Security Specialist.
Your task is to review the provided configuration file for:
1. Syntax errors.
2. Security vulnerabilities (e.g., weak passwords, exposed keys, permissive permissions).
3. Deprecated settings.
4. Best practice violations.

Output your analysis in valid JSON format:
{
    "has_issues": boolean,
    "summary": "Brief executive summary",
    "findings": [
        {
            "line_number": integer or null,
            "parameter": "The specific config key/section",
            "issue": "Description of the problem",
            "severity": "critical|warning|info",
            "suggestion": "How to fix it",
            "suggested_value": "The optimized value (if applicable)"
        }
    ]
}"#;

const HEALTH_PROMPT: &str = r#"You are an expert System Performance Analyst.
Your task is to analyze the provided system specifications, real-time metrics, and recent logs to diagnose lag, crashes, or bottlenecks.

Output your analysis in valid JSON format with the following structure:
{
    "has_issues": boolean,
    "overall_status": "Healthy|Degraded|Critical",
    "summary": "Executive summary of system health",
    "findings": [
        {
            "issue": "High CPU Usage / Memory Leak / etc",
            "severity": "critical|warning|info",
            "evidence": "Description of the data point proving the issue",
            "recommendation": "Technical recommendation to resolve the issue"
        }
    ]
}"#;

const GENERATE_PROMPT: &str = r#"You are an expert DevOps Engineer.
Your task is to generate a configuration file based on the user's requirements.
Ensure the configuration is secure, follows best practices, and includes comments explaining key settings.

Output valid JSON:
{
    "content": "The full content of the generated configuration file"
}"#;

/// Seam between the pipeline and the external reasoning service. The
/// production implementation is [`LlmAnalyzer`]; tests substitute scripted
/// ones.
pub trait Classifier {
    /// Interpret a filtered log batch. Never fails: technical problems
    /// come back as a synthetic error report.
    fn analyze_logs(
        &self,
        logs: &str,
        model: &str,
    ) -> impl std::future::Future<Output = AnalysisReport> + Send;
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format: &'static str,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Client for the chat-completions endpoint.
pub struct LlmAnalyzer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LlmAnalyzer {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.classifier.request_timeout_secs))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base_url: config.classifier.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key().to_string(),
        })
    }

    /// One request/response round trip. The caller supplies the fixed
    /// system framing; the endpoint is asked for a JSON document.
    async fn chat(&self, model: &str, system_prompt: &str, user_message: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_message.to_string(),
                },
            ],
            response_format: ResponseFormat {
                format: "json_object",
            },
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to reach classifier endpoint")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Classifier request failed ({status}): {text}");
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .context("Failed to parse classifier envelope")?;

        match chat.choices.into_iter().next() {
            Some(choice) => Ok(choice.message.content),
            None => bail!("Classifier returned no choices"),
        }
    }

    /// Audit a configuration file.
    pub async fn analyze_config(
        &self,
        content: &str,
        file_path: &str,
        model: &str,
        extra_prompt: Option<&str>,
    ) -> ConfigAuditReport {
        let system = format!("{CONFIG_AUDIT_PROMPT}\n\nFile path: {file_path}");
        let mut user = format!("Config File Content:\n\n{content}");
        if let Some(extra) = extra_prompt {
            user.push_str(&format!("\n\nAdditional Instruction: {extra}"));
        }

        match self.chat(model, &system, &user).await {
            Ok(content) => parse_document(&content).unwrap_or_else(|e| {
                warn!("Unparseable audit response: {e}");
                ConfigAuditReport::technical_failure(e)
            }),
            Err(e) => ConfigAuditReport::technical_failure(e),
        }
    }

    /// Diagnose system health from specs, sampled metrics, and log context.
    pub async fn analyze_health(
        &self,
        payload: &serde_json::Value,
        model: &str,
    ) -> HealthReport {
        let user = format!(
            "System Health Data:\n\n{}",
            serde_json::to_string_pretty(payload).unwrap_or_default()
        );

        match self.chat(model, HEALTH_PROMPT, &user).await {
            Ok(content) => parse_document(&content).unwrap_or_else(|e| {
                warn!("Unparseable health response: {e}");
                HealthReport::technical_failure(e)
            }),
            Err(e) => HealthReport::technical_failure(e),
        }
    }

    /// Generate file content from a free-form requirement. Unlike log
    /// analysis there is no sensible synthetic fallback, so errors
    /// propagate to the CLI.
    pub async fn generate_file(&self, prompt: &str, model: &str) -> Result<GeneratedFile> {
        let content = self.chat(model, GENERATE_PROMPT, prompt).await?;
        let generated: GeneratedFile =
            parse_document(&content).context("Failed to parse generation response")?;
        if generated.content.is_empty() {
            bail!("Generation returned no content");
        }
        Ok(generated)
    }
}

impl Classifier for LlmAnalyzer {
    async fn analyze_logs(&self, logs: &str, model: &str) -> AnalysisReport {
        let user = format!("Logs to analyze:\n\n{logs}");
        match self.chat(model, LOG_ANALYSIS_PROMPT, &user).await {
            Ok(content) => analysis_from_content(&content),
            Err(e) => {
                warn!("Classifier unavailable: {e:#}");
                AnalysisReport::technical_failure(e)
            }
        }
    }
}

/// Parse a classifier answer into an [`AnalysisReport`], degrading to the
/// synthetic error report when the document is not valid JSON.
pub fn analysis_from_content(content: &str) -> AnalysisReport {
    parse_document(content).unwrap_or_else(|e| {
        warn!("Unparseable analysis response: {e}");
        AnalysisReport::technical_failure(e)
    })
}

/// Strip a wrapping markdown code fence, if any, and parse the JSON body.
fn parse_document<T: DeserializeOwned>(content: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_code_fence(content))
}

/// Models sometimes wrap the requested JSON in a ```json fence despite the
/// response-format hint. Peel it off before parsing.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}
