//! Finding prioritization.
//!
//! Layered rules evaluated in a strict order, later rules overriding earlier
//! ones: baseline low, category/entity escalation, then a sensitive-keyword
//! scan of the value that unconditionally escalates to critical.
use super::types::{Category, Finding, Tier};

/// Keywords whose presence in a finding value always escalates to critical:
/// financial institutions and credential/secret material.
const SENSITIVE_KEYWORDS: &[&str] = &[
    "banorte",
    "bbva",
    "santander",
    "banamex",
    "password",
    "contraseña",
    "passwd",
    "token",
    "cvv",
    "clabe",
    "secret",
    "api_key",
];

const RATIONALE_LOW: &str = "Low-impact public footprint information recognized in open sources.";
const RATIONALE_DATA_LEAK: &str =
    "Critical: credentials or private data exposed in a detected leak.";
const RATIONALE_THREAT: &str =
    "High: positive association with malicious infrastructure or attack vectors.";
const RATIONALE_SQUATTING: &str =
    "Medium: similar or squatted domain detected with impersonation risk.";

/// Score a batch of findings, preserving order.
pub fn score(findings: Vec<Finding>) -> Vec<Finding> {
    tracing::info!(findings = findings.len(), "scoring findings");
    findings.into_iter().map(score_finding).collect()
}

/// Assign the priority tier and rationale for a single finding.
pub fn score_finding(mut finding: Finding) -> Finding {
    let mut tier = Tier::Low;
    let mut rationale = RATIONALE_LOW.to_string();

    if finding.category == Category::DataLeak || finding.entity == "Compromised Credentials" {
        tier = Tier::Critical;
        rationale = RATIONALE_DATA_LEAK.to_string();
    } else if finding.category == Category::Threat {
        tier = Tier::High;
        rationale = RATIONALE_THREAT.to_string();
    } else if finding.entity == "Squatted/Similar Domain" {
        tier = Tier::Medium;
        rationale = RATIONALE_SQUATTING.to_string();
    }

    let value = finding.value.to_lowercase();
    for keyword in SENSITIVE_KEYWORDS {
        if value.contains(keyword) {
            tier = Tier::Critical;
            rationale = format!("Critical: high-sensitivity keyword detected ({keyword}).");
            break;
        }
    }

    if matches!(tier, Tier::Critical | Tier::High) {
        tracing::warn!(tier = tier.as_str(), finding = %finding.finding_id, "high risk finding");
    }
    finding.tier = Some(tier);
    finding.rationale = Some(rationale);
    finding
}
