//! Notification fan-out.
//!
//! A finding goes to every configured channel independently: a webhook
//! embed and/or a plain-text mail. Channels without configuration are
//! skipped silently; a failing channel is logged and reported `false` in
//! the outcome map but never stops the other channels or the pipeline.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use logwarden_common::config::NotifyConfig;
use logwarden_common::{Finding, SmtpConfig};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

/// Webhook requests get a short leash; notification latency should never
/// dominate a run.
const WEBHOOK_TIMEOUT_SECS: u64 = 15;

/// Webhook embed field limit for the quoted log excerpt.
const MAX_EXCERPT_CHARS: usize = 1000;

/// Embed accent colors.
const COLOR_URGENT: u32 = 15158332;
const COLOR_NOTICE: u32 = 15105570;

/// Best-effort notification dispatcher.
pub struct Notifier {
    webhook_url: Option<String>,
    smtp: Option<SmtpConfig>,
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(config: &NotifyConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            webhook_url: config.webhook_url.clone(),
            smtp: config.smtp.clone(),
            client,
        }
    }

    /// Whether any channel is configured at all.
    pub fn has_channels(&self) -> bool {
        self.webhook_url.is_some() || self.smtp.is_some()
    }

    /// Deliver `finding` to every configured channel. The result maps
    /// channel name to delivery outcome; unconfigured channels are absent.
    pub async fn dispatch(&self, finding: &Finding) -> BTreeMap<String, bool> {
        let mut results = BTreeMap::new();

        if self.webhook_url.is_some() {
            let ok = match self.send_webhook(finding).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Webhook delivery failed: {e:#}");
                    false
                }
            };
            results.insert("webhook".to_string(), ok);
        }

        if self.smtp.is_some() {
            let ok = match self.send_email(finding).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Email delivery failed: {e:#}");
                    false
                }
            };
            results.insert("email".to_string(), ok);
        }

        if !results.is_empty() {
            info!(
                "Dispatched {} finding to {} channel(s)",
                finding.severity,
                results.len()
            );
        }
        results
    }

    async fn send_webhook(&self, finding: &Finding) -> anyhow::Result<()> {
        let url = self.webhook_url.as_deref().expect("webhook configured");
        let payload = webhook_payload(finding);

        let resp = self.client.post(url).json(&payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("webhook endpoint returned {status}");
        }
        Ok(())
    }

    async fn send_email(&self, finding: &Finding) -> anyhow::Result<()> {
        let smtp = self.smtp.as_ref().expect("smtp configured");

        let from: Mailbox = smtp
            .from
            .as_deref()
            .unwrap_or(&smtp.user)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid sender address: {e}"))?;
        let to: Mailbox = smtp
            .to
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid recipient address: {e}"))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(email_subject(finding))
            .body(email_body(finding))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.server)?
            .port(smtp.port)
            .credentials(Credentials::new(smtp.user.clone(), smtp.password.clone()))
            .build();

        transport.send(message).await?;
        Ok(())
    }
}

/// Embed-style webhook document for one finding.
fn webhook_payload(finding: &Finding) -> serde_json::Value {
    let color = if finding.severity.is_urgent() {
        COLOR_URGENT
    } else {
        COLOR_NOTICE
    };
    let excerpt = truncate_chars(&finding.log_entry, MAX_EXCERPT_CHARS);
    let fix = finding
        .suggested_fix
        .as_ref()
        .map(|f| f.description.clone())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "None".to_string());

    serde_json::json!({
        "embeds": [{
            "title": format!("Logwarden Alert: {}", finding.severity.as_str().to_uppercase()),
            "description": finding.summary(),
            "color": color,
            "fields": [
                { "name": "Log Entry", "value": format!("```\n{excerpt}\n```") },
                { "name": "Suggested Fix", "value": fix },
            ],
            "footer": { "text": "logwarden automated monitor" },
        }]
    })
}

fn email_subject(finding: &Finding) -> String {
    format!("[logwarden] {}: issue detected", finding.severity)
}

fn email_body(finding: &Finding) -> String {
    let fix = finding
        .suggested_fix
        .as_ref()
        .map(|f| match &f.command {
            Some(cmd) => format!("{} ({cmd})", f.description),
            None => f.description.clone(),
        })
        .unwrap_or_else(|| "None".to_string());

    format!(
        "Logwarden has detected an issue.\n\n\
         Severity: {}\n\
         Findings: {}\n\n\
         Log Entry:\n{}\n\n\
         Suggested Fix:\n{}\n",
        finding.severity,
        finding.summary(),
        finding.log_entry,
        fix
    )
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
