//! Raw event normalization.
//!
//! Maps source-specific event types onto the canonical (category, entity)
//! vocabulary and derives a deterministic finding id so reprocessing the same
//! raw input yields the same record.
use chrono::Utc;

use super::types::{Category, Finding, RawEvent};
use crate::util::sha256_hex;

/// Exact-match indicator table: raw event type -> (category, entity label).
/// Consulted after the malicious/blacklisted substring rules.
const INDICATOR_MAP: &[(&str, Category, &str)] = &[
    ("EMAILADDR", Category::Contact, "Email"),
    ("PHONE_NUMBER", Category::Contact, "Phone"),
    ("PHYSICAL_ADDRESS", Category::Contact, "Address"),
    ("EMAILADDR_COMPROMISED", Category::DataLeak, "Compromised Credentials"),
    ("ACCOUNT_EXTERNAL_OWNED", Category::SocialFootprint, "External Account"),
    ("HUMAN_NAME", Category::Identity, "Full Name"),
    ("USERNAME", Category::Identity, "Handle/User"),
    ("DOMAIN_NAME", Category::Identity, "Domain"),
    ("INTERNET_NAME", Category::Identity, "Host/Subdomain"),
    ("MALICIOUS_IPADDR", Category::Threat, "Malicious IP"),
    ("MALICIOUS_AFFILIATE_IPADDR", Category::Threat, "Malicious Host"),
    ("BLACKLISTED_IPADDR", Category::Threat, "Blacklisted IP"),
    ("INTERESTING_FILE", Category::DataLeak, "Sensitive File Exposed"),
    ("RAW_FILE_META_DATA", Category::DataLeak, "Document Metadata"),
    ("SIMILARDOMAIN", Category::Identity, "Squatted/Similar Domain"),
];

/// Normalize a batch of raw events, preserving input order.
///
/// Empty records (no type and no data) are dropped silently; they carry no
/// evidence and are not an error.
pub fn normalize(raw: &[RawEvent]) -> Vec<Finding> {
    tracing::debug!(events = raw.len(), "normalizing raw events");
    let findings: Vec<Finding> = raw
        .iter()
        .filter(|event| !(event.kind.trim().is_empty() && event.data.trim().is_empty()))
        .map(normalize_event)
        .collect();
    tracing::info!(findings = findings.len(), "normalization finished");
    findings
}

/// Normalize a single raw event into a canonical finding.
pub fn normalize_event(event: &RawEvent) -> Finding {
    let (category, entity) = classify(&event.kind);
    let confidence = (event.confidence.unwrap_or(100.0) / 100.0).clamp(0.0, 1.0);
    Finding {
        finding_id: finding_id(&event.kind, &event.data),
        category,
        entity,
        value: event.data.clone(),
        source_name: event.module.clone(),
        raw_type: event.kind.clone(),
        url: event.url.clone(),
        confidence,
        captured_at: Utc::now(),
        tier: None,
        rationale: None,
        breach: None,
        mention: None,
    }
}

/// Deterministic identity: first 16 hex chars of SHA-256 over type and value.
pub fn finding_id(raw_type: &str, value: &str) -> String {
    sha256_hex(format!("{raw_type}:{value}").as_bytes())[..16].to_string()
}

/// Resolve (category, entity label) for a raw event type.
///
/// Security indicators take priority over the exact-match table, which takes
/// priority over the humanized footprint fallback.
fn classify(raw_type: &str) -> (Category, String) {
    if raw_type.contains("MALICIOUS") {
        return (Category::Threat, "Malicious Association".to_string());
    }
    if raw_type.contains("BLACKLISTED") {
        return (Category::Threat, "Blacklisted Association".to_string());
    }
    if let Some((_, category, entity)) = INDICATOR_MAP
        .iter()
        .find(|(kind, _, _)| *kind == raw_type)
    {
        return (*category, (*entity).to_string());
    }
    (Category::Footprint, humanize(raw_type))
}

/// Turn an undocumented raw type into a readable entity label.
fn humanize(raw_type: &str) -> String {
    raw_type
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, data: &str) -> RawEvent {
        RawEvent {
            kind: kind.to_string(),
            data: data.to_string(),
            module: "test".to_string(),
            confidence: None,
            url: None,
        }
    }

    #[test]
    fn identity_is_deterministic_across_runs() {
        let raw = event("EMAILADDR_COMPROMISED", "a@b.com");
        let first = normalize_event(&raw);
        let second = normalize_event(&raw);
        assert_eq!(first.finding_id, second.finding_id);
        assert_eq!(first.finding_id.len(), 16);
    }

    #[test]
    fn compromised_email_maps_to_data_leak() {
        let finding = normalize_event(&event("EMAILADDR_COMPROMISED", "a@b.com"));
        assert_eq!(finding.category, Category::DataLeak);
        assert_eq!(finding.entity, "Compromised Credentials");
    }

    #[test]
    fn malicious_substring_beats_the_exact_table() {
        let finding = normalize_event(&event("MALICIOUS_IPADDR", "203.0.113.9"));
        assert_eq!(finding.category, Category::Threat);
        assert_eq!(finding.entity, "Malicious Association");
    }

    #[test]
    fn unknown_types_fall_back_to_humanized_footprint() {
        let finding = normalize_event(&event("TCP_PORT_OPEN", "example.com:443"));
        assert_eq!(finding.category, Category::Footprint);
        assert_eq!(finding.entity, "Tcp Port Open");
    }

    #[test]
    fn confidence_is_coerced_to_unit_scale() {
        let mut raw = event("EMAILADDR", "a@b.com");
        raw.confidence = Some(75.0);
        assert!((normalize_event(&raw).confidence - 0.75).abs() < f64::EPSILON);
        raw.confidence = None;
        assert!((normalize_event(&raw).confidence - 1.0).abs() < f64::EPSILON);
        raw.confidence = Some(250.0);
        assert!((normalize_event(&raw).confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_records_are_dropped_and_order_is_preserved() {
        let raw = [
            event("DOMAIN_NAME", "example.com"),
            event("", ""),
            event("EMAILADDR", "a@b.com"),
        ];
        let findings = normalize(&raw);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].raw_type, "DOMAIN_NAME");
        assert_eq!(findings[1].raw_type, "EMAILADDR");
    }
}
