//! Entity schema types for the persisted tracking store.
//!
//! These types mirror the persisted JSON document. Serde defaults keep older
//! documents readable after schema additions, and the transition tables are
//! the single source of truth for legal status changes.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::StoreError;

/// Client classification.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClientClass {
    #[default]
    Individual,
    Organization,
}

impl ClientClass {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientClass::Individual => "individual",
            ClientClass::Organization => "organization",
        }
    }

    /// Parse a class string, rejecting unknown values at the boundary.
    pub fn parse(value: &str) -> Result<Self, StoreError> {
        match value {
            "individual" => Ok(ClientClass::Individual),
            "organization" => Ok(ClientClass::Organization),
            other => Err(StoreError::InvalidType {
                kind: "client class",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ClientClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intake (and derived report) type.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IntakeType {
    Baseline,
    Periodic,
    Incident,
    Rescue,
    OnDemand,
}

impl IntakeType {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntakeType::Baseline => "baseline",
            IntakeType::Periodic => "periodic",
            IntakeType::Incident => "incident",
            IntakeType::Rescue => "rescue",
            IntakeType::OnDemand => "on-demand",
        }
    }

    /// Parse a type string, rejecting unknown values at the boundary.
    pub fn parse(value: &str) -> Result<Self, StoreError> {
        match value {
            "baseline" => Ok(IntakeType::Baseline),
            "periodic" => Ok(IntakeType::Periodic),
            "incident" => Ok(IntakeType::Incident),
            "rescue" => Ok(IntakeType::Rescue),
            "on-demand" => Ok(IntakeType::OnDemand),
            other => Err(StoreError::InvalidType {
                kind: "intake type",
                value: other.to_string(),
            }),
        }
    }

    /// Scheduler rank; lower runs first.
    pub fn priority_rank(&self) -> u8 {
        match self {
            IntakeType::Rescue => 0,
            IntakeType::Incident => 1,
            IntakeType::Periodic => 2,
            IntakeType::Baseline => 3,
            IntakeType::OnDemand => 4,
        }
    }
}

impl fmt::Display for IntakeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intake workflow state.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStatus {
    Submitted,
    Authorized,
    Executed,
}

impl IntakeStatus {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntakeStatus::Submitted => "submitted",
            IntakeStatus::Authorized => "authorized",
            IntakeStatus::Executed => "executed",
        }
    }
}

impl fmt::Display for IntakeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report workflow state.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Generated,
    UnderReview,
    TacitlyApproved,
    Disputed,
    Invalidated,
}

impl ReportStatus {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Generated => "generated",
            ReportStatus::UnderReview => "under_review",
            ReportStatus::TacitlyApproved => "tacitly_approved",
            ReportStatus::Disputed => "disputed",
            ReportStatus::Invalidated => "invalidated",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality-control verdict state; set exactly once after `pending`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QcStatus {
    Pending,
    Approved,
    Failed,
}

impl QcStatus {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            QcStatus::Pending => "pending",
            QcStatus::Approved => "approved",
            QcStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for QcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason recorded when a report is invalidated.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    QcFailure,
    ClientDispute,
}

impl InvalidationReason {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidationReason::QcFailure => "qc_failure",
            InvalidationReason::ClientDispute => "client_dispute",
        }
    }
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal intake transitions: submitted -> authorized -> executed.
pub const INTAKE_TRANSITIONS: &[(IntakeStatus, IntakeStatus)] = &[
    (IntakeStatus::Submitted, IntakeStatus::Authorized),
    (IntakeStatus::Authorized, IntakeStatus::Executed),
];

/// Legal report transitions. The generated -> invalidated pair is the QC
/// failure bypass that skips the review window.
pub const REPORT_TRANSITIONS: &[(ReportStatus, ReportStatus)] = &[
    (ReportStatus::Generated, ReportStatus::UnderReview),
    (ReportStatus::UnderReview, ReportStatus::TacitlyApproved),
    (ReportStatus::UnderReview, ReportStatus::Disputed),
    (ReportStatus::Disputed, ReportStatus::Invalidated),
    (ReportStatus::Generated, ReportStatus::Invalidated),
];

pub(crate) fn check_transition<T>(table: &[(T, T)], from: T, to: T) -> Result<(), StoreError>
where
    T: Copy + PartialEq + fmt::Display,
{
    if table.iter().any(|(f, t)| *f == from && *t == to) {
        Ok(())
    } else {
        Err(StoreError::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

fn default_incident_limit() -> u32 {
    2
}

/// Current year-month key used for monthly counter resets.
pub fn current_month_key() -> String {
    Utc::now().format("%Y-%m").to_string()
}

/// A registered service subscriber.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Client {
    pub id: String,
    pub full_name: String,
    pub slug: String,
    #[serde(default)]
    pub class: ClientClass,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_incident_limit")]
    pub incident_limit_month: u32,
    #[serde(default)]
    pub incident_count_month: u32,
    #[serde(default = "current_month_key")]
    pub incident_month_key: String,
    #[serde(default)]
    pub last_valid_report_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub intakes: Vec<String>,
    #[serde(default)]
    pub reports: Vec<String>,
    #[serde(default)]
    pub intake_seq: u32,
    #[serde(default)]
    pub report_seq: u32,
}

/// Identity data used to target collection for an intake.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct IdentityPayload {
    #[serde(default)]
    pub emails: Vec<String>,
}

/// One authorized unit of scan work tied to a client.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Intake {
    pub id: String,
    pub client_id: String,
    pub intake_type: IntakeType,
    pub status: IntakeStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    pub requested_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces_report_id: Option<String>,
    #[serde(default)]
    pub identity: IdentityPayload,
}

/// Paths of artifacts produced for a report.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ArtifactRecord {
    #[serde(default)]
    pub document_path: Option<PathBuf>,
    #[serde(default)]
    pub legal_request_paths: Vec<PathBuf>,
    #[serde(default)]
    pub qc_checklist_path: Option<PathBuf>,
}

/// The generated deliverable record tied to exactly one intake.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Report {
    pub id: String,
    pub client_id: String,
    pub intake_id: String,
    pub report_type: IntakeType,
    pub status: ReportStatus,
    pub qc_status: QcStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_deadline_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalidation_reason: Option<InvalidationReason>,
    #[serde(default)]
    pub artifacts: ArtifactRecord,
}

/// Entity kinds referenced by audit log entries.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Client,
    Intake,
    Report,
}

impl EntityKind {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Client => "client",
            EntityKind::Intake => "intake",
            EntityKind::Report => "report",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit log action kinds.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Create,
    StatusChange,
    QcChange,
}

/// One append-only audit log record.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EventLogEntry {
    pub timestamp: DateTime<Utc>,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub action: LogAction,
    #[serde(default)]
    pub from_state: Option<String>,
    pub to_state: String,
    pub actor: String,
}

/// Convert a name into a URL-safe, filesystem-safe slug.
pub fn sanitize_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().to_lowercase().chars() {
        let mapped = match ch {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'a'..='z' | '0'..='9' | '_' | '-' => ch,
            _ => '-',
        };
        if mapped == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(mapped);
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "client".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_folds_accents_and_collapses_separators() {
        assert_eq!(
            sanitize_slug("Felipe de Jesús  Miramontes"),
            "felipe-de-jesus-miramontes"
        );
    }

    #[test]
    fn slug_falls_back_when_nothing_survives() {
        assert_eq!(sanitize_slug("¡¡¡"), "client");
        assert_eq!(sanitize_slug(""), "client");
    }

    #[test]
    fn intake_type_parse_rejects_unknown_values() {
        assert!(IntakeType::parse("on-demand").is_ok());
        let err = IntakeType::parse("MONTHLY").unwrap_err();
        assert!(matches!(err, StoreError::InvalidType { .. }));
    }

    #[test]
    fn priority_ranks_order_rescue_first() {
        assert!(IntakeType::Rescue.priority_rank() < IntakeType::Incident.priority_rank());
        assert!(IntakeType::Incident.priority_rank() < IntakeType::Periodic.priority_rank());
        assert!(IntakeType::Periodic.priority_rank() < IntakeType::Baseline.priority_rank());
        assert!(IntakeType::Baseline.priority_rank() < IntakeType::OnDemand.priority_rank());
    }

    #[test]
    fn report_transition_table_contains_qc_bypass_edge() {
        assert!(check_transition(
            REPORT_TRANSITIONS,
            ReportStatus::Generated,
            ReportStatus::Invalidated
        )
        .is_ok());
        assert!(check_transition(
            REPORT_TRANSITIONS,
            ReportStatus::Invalidated,
            ReportStatus::Generated
        )
        .is_err());
    }
}
