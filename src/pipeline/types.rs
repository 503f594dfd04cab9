//! Canonical evidence types shared across the processing pipeline.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_module() -> String {
    "Internal".to_string()
}

/// One raw event record as emitted by a collection source.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RawEvent {
    #[serde(rename = "type", alias = "event_type")]
    pub kind: String,
    #[serde(default)]
    pub data: String,
    #[serde(default = "default_module")]
    pub module: String,
    /// Source confidence on a 0-100 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Coarse classification of a finding.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Contact,
    #[serde(rename = "Data Leak")]
    DataLeak,
    #[serde(rename = "Social Footprint")]
    SocialFootprint,
    Identity,
    Threat,
    Footprint,
    #[serde(rename = "Web Mention")]
    WebMention,
}

impl Category {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Contact => "Contact",
            Category::DataLeak => "Data Leak",
            Category::SocialFootprint => "Social Footprint",
            Category::Identity => "Identity",
            Category::Threat => "Threat",
            Category::Footprint => "Footprint",
            Category::WebMention => "Web Mention",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse priority classification assigned by scoring.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Critical,
    High,
    Medium,
    Low,
}

impl Tier {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Critical => "critical",
            Tier::High => "high",
            Tier::Medium => "medium",
            Tier::Low => "low",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breach metadata carried on findings sourced from a breach directory.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BreachDetail {
    pub name: String,
    pub data_classes: Vec<String>,
    pub breach_date: String,
    pub description: String,
}

/// Web-mention metadata carried on findings sourced from public search.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MentionDetail {
    pub title: String,
    pub snippet: String,
}

/// One normalized piece of evidence about a client.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Finding {
    /// Content-derived identifier; identical evidence collapses to one record.
    pub finding_id: String,
    pub category: Category,
    pub entity: String,
    pub value: String,
    pub source_name: String,
    pub raw_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub captured_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breach: Option<BreachDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention: Option<MentionDetail>,
}
