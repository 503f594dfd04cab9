//! Deterministic finding-processing pipeline.
//!
//! Three independent pure transforms over evidence lists: normalize raw
//! events into canonical findings, deduplicate them, and assign priority
//! tiers. Each stage depends only on its input list.
mod dedupe;
mod normalize;
mod score;
mod types;

pub use dedupe::{dedupe, dedupe_with_group, EQUIVALENT_VALUE_GROUP};
pub use normalize::{finding_id, normalize, normalize_event};
pub use score::{score, score_finding};
pub use types::{BreachDetail, Category, Finding, MentionDetail, RawEvent, Tier};

/// Run the full normalize -> deduplicate -> score pipeline.
pub fn process(raw: &[RawEvent]) -> Vec<Finding> {
    score(dedupe(normalize(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalent_hosts_collapse_through_the_full_pipeline() {
        let raw = [
            RawEvent {
                kind: "DOMAIN_NAME".to_string(),
                data: "Example.com".to_string(),
                module: "dns".to_string(),
                confidence: None,
                url: None,
            },
            RawEvent {
                kind: "INTERNET_NAME".to_string(),
                data: "example.com ".to_string(),
                module: "crawler".to_string(),
                confidence: None,
                url: None,
            },
        ];
        let findings = process(&raw);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].raw_type, "DOMAIN_NAME");
        assert!(findings[0].tier.is_some());
    }
}
