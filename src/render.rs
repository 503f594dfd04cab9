//! Report artifact rendering collaborator.
//!
//! Rendering is an external concern; the engine only depends on the
//! `ArtifactRenderer` trait. The bundled markdown renderer builds the
//! conventional artifact filename and emits the fixed section layout the
//! quality gate checks for.
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::pipeline::{Finding, Tier};
use crate::store::{sanitize_slug, Client, Intake};

/// Current brand spelling used when naming artifacts.
pub const BRAND: &str = "MAPARD";

/// Section headings every rendered report must contain.
pub const REQUIRED_SECTIONS: &[&str] = &[
    "## 1. Executive Summary",
    "## 2. Confirmed Threats",
    "## 3. Consolidated Action Plan",
    "## 4. Privacy Rights Management",
    "## 5. Conclusion",
    "## 6. Technical Annex",
];

/// Closed document-type vocabulary used in artifact filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocType {
    ClientData,
    Onboarding,
    Intake,
    Report,
    LegalRequest,
    Qc,
    Metadata,
}

impl DocType {
    /// Return the filename token for this document type.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::ClientData => "CLIENT_DATA",
            DocType::Onboarding => "ONBOARDING",
            DocType::Intake => "INTAKE",
            DocType::Report => "REPORT",
            DocType::LegalRequest => "LEGAL_REQUEST",
            DocType::Qc => "QC",
            DocType::Metadata => "METADATA",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the conventional artifact filename stem (no extension):
/// `<brand> - <docType> - <clientId> - <clientSlug> - <recordId> - <date>`.
pub fn artifact_stem(
    doc_type: DocType,
    client_id: &str,
    client_slug: &str,
    record_id: &str,
    date: NaiveDate,
) -> String {
    format!(
        "{BRAND} - {doc_type} - {client_id} - {client_slug} - {record_id} - {}",
        date.format("%Y-%m-%d")
    )
}

/// Inputs for rendering one report artifact.
pub struct RenderRequest<'a> {
    pub client: &'a Client,
    pub intake: &'a Intake,
    pub report_id: &'a str,
    pub findings: &'a [Finding],
}

/// Paths produced by a render.
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub document_path: PathBuf,
    pub legal_request_paths: Vec<PathBuf>,
}

/// Document rendering seam between the engine and the templating concern.
pub trait ArtifactRenderer {
    fn render(&self, request: &RenderRequest) -> Result<RenderedArtifact>;
}

/// Renders the report as a markdown document plus per-breach legal requests.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    reports_dir: PathBuf,
    legal_dir: PathBuf,
}

impl MarkdownRenderer {
    pub fn new(reports_dir: PathBuf, legal_dir: PathBuf) -> Self {
        Self {
            reports_dir,
            legal_dir,
        }
    }

    /// Emit one data-removal request document per breach finding.
    fn write_legal_requests(
        &self,
        request: &RenderRequest,
        date: NaiveDate,
    ) -> Result<Vec<PathBuf>> {
        let breached: Vec<&Finding> = request
            .findings
            .iter()
            .filter(|finding| finding.breach.is_some())
            .collect();
        if breached.is_empty() {
            return Ok(Vec::new());
        }

        let stem = artifact_stem(
            DocType::LegalRequest,
            &request.client.id,
            &request.client.slug,
            request.report_id,
            date,
        );
        let dir = self.legal_dir.join(stem);
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;

        let mut paths = Vec::new();
        for finding in breached {
            let Some(detail) = finding.breach.as_ref() else {
                continue;
            };
            let path = dir.join(format!("{}.md", sanitize_slug(&detail.name)));
            let content = format!(
                "# Data removal request\n\nClient: {} ({})\nBreach: {}\nBreach date: {}\nData classes: {}\n\n{}\n",
                request.client.full_name,
                request.client.id,
                detail.name,
                detail.breach_date,
                detail.data_classes.join(", "),
                detail.description,
            );
            fs::write(&path, content).with_context(|| format!("write {}", path.display()))?;
            paths.push(path);
        }
        Ok(paths)
    }
}

impl ArtifactRenderer for MarkdownRenderer {
    fn render(&self, request: &RenderRequest) -> Result<RenderedArtifact> {
        fs::create_dir_all(&self.reports_dir)
            .with_context(|| format!("create {}", self.reports_dir.display()))?;

        let today = Utc::now().date_naive();
        let stem = artifact_stem(
            DocType::Report,
            &request.client.id,
            &request.client.slug,
            request.report_id,
            today,
        );
        let document_path = self.reports_dir.join(format!("{stem}.md"));
        let content = render_document(request);
        fs::write(&document_path, content)
            .with_context(|| format!("write {}", document_path.display()))?;
        tracing::info!(path = %document_path.display(), "report artifact rendered");

        let legal_request_paths = self.write_legal_requests(request, today)?;
        Ok(RenderedArtifact {
            document_path,
            legal_request_paths,
        })
    }
}

fn render_document(request: &RenderRequest) -> String {
    let mut counts = [0usize; 4];
    for finding in request.findings {
        match finding.tier.unwrap_or(Tier::Low) {
            Tier::Critical => counts[0] += 1,
            Tier::High => counts[1] += 1,
            Tier::Medium => counts[2] += 1,
            Tier::Low => counts[3] += 1,
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "# {BRAND} Intelligence Report {}\n\n",
        request.report_id
    ));
    out.push_str(&format!(
        "Client: {} ({})\n",
        request.client.full_name, request.client.id
    ));
    out.push_str(&format!(
        "Intake: {} ({})\n",
        request.intake.id,
        request.intake.intake_type.as_str()
    ));
    out.push_str(&format!("Generated: {}\n\n", Utc::now().format("%Y-%m-%d")));

    out.push_str(REQUIRED_SECTIONS[0]);
    out.push_str(&format!(
        "\n\nThis report consolidates {} findings: {} critical, {} high, {} medium, {} low.\n\n",
        request.findings.len(),
        counts[0],
        counts[1],
        counts[2],
        counts[3],
    ));

    out.push_str(REQUIRED_SECTIONS[1]);
    out.push('\n');
    let mut threats: Vec<&Finding> = request
        .findings
        .iter()
        .filter(|f| matches!(f.tier, Some(Tier::Critical) | Some(Tier::High)))
        .collect();
    threats.sort_by_key(|f| f.tier.unwrap_or(Tier::Low));
    if threats.is_empty() {
        out.push_str("\nNo confirmed threats were detected in this cycle.\n");
    } else {
        out.push('\n');
        for finding in threats {
            out.push_str(&format!(
                "- [{}] {}: {} ({})\n",
                finding.tier.unwrap_or(Tier::Low),
                finding.entity,
                finding.value,
                finding.rationale.as_deref().unwrap_or(""),
            ));
        }
    }
    out.push('\n');

    out.push_str(REQUIRED_SECTIONS[2]);
    out.push_str("\n\n");
    if counts[0] > 0 {
        out.push_str("- Rotate every credential referenced by a critical finding immediately.\n");
    }
    out.push_str("- Review the technical annex and dispute any finding that looks incorrect.\n");
    out.push_str("- Keep multi-factor authentication enabled on all listed accounts.\n\n");

    out.push_str(REQUIRED_SECTIONS[3]);
    out.push_str("\n\n");
    let breach_count = request
        .findings
        .iter()
        .filter(|f| f.breach.is_some())
        .count();
    if breach_count > 0 {
        out.push_str(&format!(
            "{breach_count} data-removal request document(s) were prepared alongside this report.\n\n"
        ));
    } else {
        out.push_str("No data-removal requests are applicable to this cycle.\n\n");
    }

    out.push_str(REQUIRED_SECTIONS[4]);
    out.push_str("\n\nFindings are re-evaluated on every monitoring cycle; priorities may change as sources update.\n\n");

    out.push_str(REQUIRED_SECTIONS[5]);
    out.push_str("\n\n");
    for finding in request.findings {
        out.push_str(&format!(
            "- `{}` [{}] {} / {} = {} (source: {}, confidence: {:.2})\n",
            finding.finding_id,
            finding.tier.unwrap_or(Tier::Low),
            finding.category,
            finding.entity,
            finding.value,
            finding.source_name,
            finding.confidence,
        ));
    }
    out
}
