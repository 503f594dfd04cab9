//! Breach-directory HTTP client.
//!
//! Blocking lookups against a haveibeenpwned-compatible API. 404 means no
//! breaches; a rate limit is retried once after a fixed backoff; any other
//! unexpected status is logged and treated as no data.
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use ureq::Agent;

use super::BreachDirectory;
use crate::config::BreachConfig;
use crate::pipeline::{BreachDetail, Category, Finding, Tier};

const USER_AGENT: &str = "mapard-engine";

/// One breach record as returned by the directory API.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct BreachRecord {
    pub name: String,
    #[serde(default)]
    pub data_classes: Vec<String>,
    #[serde(default)]
    pub breach_date: String,
    #[serde(default)]
    pub description: String,
}

/// Blocking breach-directory client with bounded timeouts.
#[derive(Debug)]
pub struct BreachApiClient {
    agent: Agent,
    api_base: String,
    api_key: Option<String>,
    retry_backoff: Duration,
}

impl BreachApiClient {
    pub fn from_config(config: &BreachConfig) -> Self {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build();
        Self {
            agent: agent_config.into(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            retry_backoff: Duration::from_secs(config.retry_backoff_secs),
        }
    }
}

impl BreachDirectory for BreachApiClient {
    fn breaches_for(&self, email: &str) -> Result<Vec<BreachRecord>> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("breach directory api key missing; skipping lookup");
            return Ok(Vec::new());
        };
        let url = format!(
            "{}/breachedaccount/{email}?truncateResponse=false",
            self.api_base
        );

        let mut attempts = 0;
        loop {
            attempts += 1;
            tracing::info!(email, attempt = attempts, "breach directory lookup");
            match self
                .agent
                .get(&url)
                .header("hibp-api-key", api_key)
                .header("user-agent", USER_AGENT)
                .call()
            {
                Ok(mut response) => {
                    let records: Vec<BreachRecord> = response
                        .body_mut()
                        .read_json()
                        .context("parse breach directory response")?;
                    return Ok(records);
                }
                Err(ureq::Error::StatusCode(404)) => return Ok(Vec::new()),
                Err(ureq::Error::StatusCode(429)) if attempts == 1 => {
                    tracing::warn!(
                        backoff_secs = self.retry_backoff.as_secs(),
                        "breach directory rate limited; retrying once"
                    );
                    thread::sleep(self.retry_backoff);
                }
                Err(ureq::Error::StatusCode(code)) => {
                    tracing::warn!(code, "breach directory returned unexpected status; treating as no data");
                    return Ok(Vec::new());
                }
                Err(err) => return Err(err).context("breach directory request"),
            }
        }
    }
}

/// Map a breach record onto the canonical finding shape.
///
/// Breach results bypass normalization; data classes exposing password
/// material are critical, everything else high.
pub fn breach_finding(email: &str, record: &BreachRecord) -> Finding {
    let exposes_passwords = record
        .data_classes
        .iter()
        .any(|class| class.to_lowercase().contains("password"));
    let tier = if exposes_passwords {
        Tier::Critical
    } else {
        Tier::High
    };
    Finding {
        finding_id: format!("BREACH-{}", record.name),
        category: Category::DataLeak,
        entity: "Compromised Credentials".to_string(),
        value: email.to_string(),
        source_name: "breach-directory".to_string(),
        raw_type: "BREACH".to_string(),
        url: None,
        confidence: 1.0,
        captured_at: Utc::now(),
        tier: Some(tier),
        rationale: Some(format!(
            "Confirmed breach exposure in {}. Data classes: {}.",
            record.name,
            record.data_classes.join(", ")
        )),
        breach: Some(BreachDetail {
            name: record.name.clone(),
            data_classes: record.data_classes.clone(),
            breach_date: record.breach_date.clone(),
            description: record.description.clone(),
        }),
        mention: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(classes: &[&str]) -> BreachRecord {
        BreachRecord {
            name: "ExampleBreach".to_string(),
            data_classes: classes.iter().map(|c| c.to_string()).collect(),
            breach_date: "2023-04-01".to_string(),
            description: "Test breach".to_string(),
        }
    }

    #[test]
    fn password_classes_are_critical() {
        let finding = breach_finding("a@b.com", &record(&["Email addresses", "Passwords"]));
        assert_eq!(finding.tier, Some(Tier::Critical));
        assert_eq!(finding.category, Category::DataLeak);
        assert_eq!(finding.value, "a@b.com");
    }

    #[test]
    fn non_password_classes_are_high() {
        let finding = breach_finding("a@b.com", &record(&["Email addresses", "Usernames"]));
        assert_eq!(finding.tier, Some(Tier::High));
        assert!(finding.rationale.unwrap().contains("ExampleBreach"));
    }

    #[test]
    fn missing_api_key_skips_the_lookup() {
        let client = BreachApiClient::from_config(&BreachConfig::default());
        assert!(client.breaches_for("a@b.com").unwrap().is_empty());
    }
}
