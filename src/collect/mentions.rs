//! Public web-mention search collaborator.
//!
//! The hosted deployment fronted an external web-search engine; here the
//! search itself stays external and results reach the pipeline as export
//! files dropped into the mentions directory. Mentions arrive with the
//! lowest tier pre-assigned and are never re-scored.
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use super::MentionSearch;
use crate::pipeline::{Category, Finding, MentionDetail, Tier};
use crate::store::sanitize_slug;
use crate::util::sha256_hex;

/// One search result row in an export file.
#[derive(Debug, Deserialize)]
struct MentionExport {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

/// Reads search-export files (`<slugged target>.json`) from a directory.
///
/// A missing file simply means no mentions were collected for the target.
#[derive(Debug, Clone)]
pub struct FileMentionSearch {
    dir: PathBuf,
}

impl FileMentionSearch {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl MentionSearch for FileMentionSearch {
    fn mentions(&self, query: &str) -> Result<Vec<Finding>> {
        let path = self.dir.join(format!("{}.json", sanitize_slug(query)));
        if !path.is_file() {
            tracing::debug!(query, "no mention export present");
            return Ok(Vec::new());
        }
        let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        let exports: Vec<MentionExport> = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse mention export {}", path.display()))?;
        tracing::info!(query, mentions = exports.len(), "mention export loaded");
        Ok(exports
            .iter()
            .map(|row| mention_finding(&row.url, &row.title, &row.snippet))
            .collect())
    }
}

/// Build a web-mention finding from a search result.
pub fn mention_finding(url: &str, title: &str, snippet: &str) -> Finding {
    Finding {
        finding_id: format!("MENTION-{}", &sha256_hex(url.as_bytes())[..12]),
        category: Category::WebMention,
        entity: "Public Record / Web Disclosure".to_string(),
        value: url.to_string(),
        source_name: "web-search".to_string(),
        raw_type: "WEB_MENTION".to_string(),
        url: Some(url.to_string()),
        confidence: 0.5,
        captured_at: Utc::now(),
        tier: Some(Tier::Low),
        rationale: Some(format!("Public web mention detected: {title}.")),
        breach: None,
        mention: Some(MentionDetail {
            title: title.to_string(),
            snippet: snippet.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentions_default_to_the_lowest_tier() {
        let finding = mention_finding("https://example.com/p", "Example page", "snippet");
        assert_eq!(finding.tier, Some(Tier::Low));
        assert_eq!(finding.category, Category::WebMention);
    }

    #[test]
    fn mention_ids_are_deterministic_per_url() {
        let first = mention_finding("https://example.com/p", "A", "s");
        let second = mention_finding("https://example.com/p", "B", "t");
        assert_eq!(first.finding_id, second.finding_id);
    }

    #[test]
    fn export_files_are_loaded_by_slugged_target() {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::write(
            dir.path().join("ada-lovelace.json"),
            r#"[{"url": "https://example.com/p", "title": "Profile", "snippet": "bio"}]"#,
        )
        .unwrap();

        let search = FileMentionSearch::new(dir.path().to_path_buf());
        let found = search.mentions("Ada Lovelace").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "https://example.com/p");
        assert!(search.mentions("nobody").unwrap().is_empty());
    }
}
