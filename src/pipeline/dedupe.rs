//! Finding deduplication.
//!
//! Single left-to-right pass, first occurrence wins. Exact duplicates are
//! dropped by finding id; members of the equivalent-value group are also
//! dropped when their normalized value was already seen under another type.
//! Metadata of dropped duplicates is discarded, not merged.
use std::collections::HashSet;

use super::types::Finding;

/// Raw types that denote the same real-world host/domain concept. A value
/// seen under one member makes the same value redundant under any other.
pub const EQUIVALENT_VALUE_GROUP: &[&str] = &[
    "DOMAIN_NAME",
    "INTERNET_NAME",
    "SIMILARDOMAIN",
    "AFFILIATE_IPADDR",
];

/// Deduplicate findings with the default equivalent-value group.
pub fn dedupe(findings: Vec<Finding>) -> Vec<Finding> {
    dedupe_with_group(findings, EQUIVALENT_VALUE_GROUP)
}

/// Deduplicate findings against a caller-supplied equivalent-value group.
pub fn dedupe_with_group(findings: Vec<Finding>, group: &[&str]) -> Vec<Finding> {
    let initial = findings.len();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_values: HashSet<String> = HashSet::new();
    let mut unique: Vec<Finding> = Vec::with_capacity(initial);

    for finding in findings {
        if seen_ids.contains(&finding.finding_id) {
            continue;
        }
        if group.contains(&finding.raw_type.as_str()) {
            let value = finding.value.trim().to_lowercase();
            if seen_values.contains(&value) {
                continue;
            }
            seen_values.insert(value);
        }
        seen_ids.insert(finding.finding_id.clone());
        unique.push(finding);
    }

    tracing::info!(removed = initial - unique.len(), kept = unique.len(), "deduplication finished");
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::normalize_event;
    use crate::pipeline::types::RawEvent;

    fn finding(kind: &str, data: &str) -> Finding {
        normalize_event(&RawEvent {
            kind: kind.to_string(),
            data: data.to_string(),
            module: "test".to_string(),
            confidence: None,
            url: None,
        })
    }

    #[test]
    fn exact_duplicates_collapse_to_first_occurrence() {
        let input = vec![
            finding("EMAILADDR", "a@b.com"),
            finding("EMAILADDR", "a@b.com"),
            finding("EMAILADDR", "c@d.com"),
        ];
        let output = dedupe(input);
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].value, "a@b.com");
        assert_eq!(output[1].value, "c@d.com");
    }

    #[test]
    fn equivalent_values_collapse_across_types() {
        let input = vec![
            finding("DOMAIN_NAME", "Example.com"),
            finding("INTERNET_NAME", "example.com "),
        ];
        let output = dedupe(input);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].raw_type, "DOMAIN_NAME");
    }

    #[test]
    fn same_value_outside_the_group_is_kept() {
        let input = vec![
            finding("USERNAME", "example"),
            finding("HUMAN_NAME", "example"),
        ];
        assert_eq!(dedupe(input).len(), 2);
    }

    #[test]
    fn output_is_never_longer_and_dedupe_is_idempotent() {
        let input = vec![
            finding("DOMAIN_NAME", "example.com"),
            finding("INTERNET_NAME", "EXAMPLE.COM"),
            finding("EMAILADDR", "a@b.com"),
            finding("EMAILADDR", "a@b.com"),
            finding("USERNAME", "ada"),
        ];
        let once = dedupe(input.clone());
        assert!(once.len() <= input.len());

        let once_ids: Vec<_> = once.iter().map(|f| f.finding_id.clone()).collect();
        let twice = dedupe(once);
        let twice_ids: Vec<_> = twice.iter().map(|f| f.finding_id.clone()).collect();
        assert_eq!(once_ids, twice_ids);
    }
}
