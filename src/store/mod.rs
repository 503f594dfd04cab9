//! Persistent entity store for clients, intakes, reports, and the audit log.
//!
//! The store is the single mutation point for lifecycle state. Every legal
//! status change is an explicit pair in a transition table, every mutation
//! appends an audit log entry, and the whole document is rewritten
//! synchronously before the call returns. Persist failures are surfaced to
//! the caller; the in-memory state stays authoritative.
mod types;

pub use types::*;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

use crate::util::sha256_hex;

/// Validation and persistence failures raised by store mutations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid {kind}: {value:?}")]
    InvalidType { kind: &'static str, value: String },
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },
    #[error("rescue intake requires the report id it replaces")]
    RescueRequiresReplacement,
    #[error("qc status already resolved to {0}")]
    QcAlreadySet(String),
    #[error("failed to persist store to {path}: {detail}")]
    Persist { path: PathBuf, detail: String },
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct StoreData {
    #[serde(default)]
    clients: BTreeMap<String, Client>,
    #[serde(default)]
    intakes: BTreeMap<String, Intake>,
    #[serde(default)]
    reports: BTreeMap<String, Report>,
    #[serde(default)]
    logs: Vec<EventLogEntry>,
}

/// Whole-document JSON store; read-all/write-all on every mutation.
#[derive(Debug)]
pub struct EntityStore {
    path: PathBuf,
    data: StoreData,
}

impl EntityStore {
    /// Open the store at `path`, starting empty when the file is missing.
    ///
    /// A present-but-unreadable document is an error: silently resetting it
    /// would destroy lifecycle history.
    pub fn open(path: PathBuf) -> Result<Self> {
        let data = if path.is_file() {
            let bytes =
                fs::read(&path).with_context(|| format!("read store {}", path.display()))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("parse store {}", path.display()))?
        } else {
            StoreData::default()
        };
        Ok(Self { path, data })
    }

    pub fn client(&self, id: &str) -> Option<&Client> {
        self.data.clients.get(id)
    }

    pub fn intake(&self, id: &str) -> Option<&Intake> {
        self.data.intakes.get(id)
    }

    pub fn report(&self, id: &str) -> Option<&Report> {
        self.data.reports.get(id)
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.data.clients.values()
    }

    pub fn intakes(&self) -> impl Iterator<Item = &Intake> {
        self.data.intakes.values()
    }

    pub fn logs(&self) -> &[EventLogEntry] {
        &self.data.logs
    }

    /// Register a client. Idempotent on the registration email: an existing
    /// registration returns the existing id without any mutation.
    pub fn create_client(
        &mut self,
        full_name: &str,
        class: ClientClass,
        email: &str,
    ) -> Result<String, StoreError> {
        let key = email.trim().to_ascii_lowercase();
        if let Some(existing) = self
            .data
            .clients
            .values()
            .find(|client| client.email.as_deref() == Some(key.as_str()))
        {
            return Ok(existing.id.clone());
        }

        let id = self.allocate_client_id(&key);
        let client = Client {
            id: id.clone(),
            full_name: full_name.to_string(),
            slug: sanitize_slug(full_name),
            class,
            email: Some(key),
            incident_limit_month: 2,
            incident_count_month: 0,
            incident_month_key: current_month_key(),
            last_valid_report_id: None,
            created_at: Utc::now(),
            intakes: Vec::new(),
            reports: Vec::new(),
            intake_seq: 0,
            report_seq: 0,
        };
        self.data.clients.insert(id.clone(), client);
        self.log_event(EntityKind::Client, &id, LogAction::Create, None, "created", "system");
        tracing::info!(client = %id, "client registered");
        self.persist()?;
        Ok(id)
    }

    /// Derive a short readable id from the registration key, probing on the
    /// (unlikely) prefix collision.
    fn allocate_client_id(&self, key: &str) -> String {
        let mut id = sha256_hex(key.as_bytes())[..7].to_ascii_uppercase();
        while self.data.clients.contains_key(&id) {
            id = sha256_hex(format!("{key}{id}").as_bytes())[..7].to_ascii_uppercase();
        }
        id
    }

    /// Create a new intake in `submitted` state, rolling the owning client's
    /// monthly counters first when the month changed.
    pub fn create_intake(
        &mut self,
        client_id: &str,
        intake_type: IntakeType,
        requested_by: &str,
        replaces_report_id: Option<String>,
        identity: IdentityPayload,
    ) -> Result<String, StoreError> {
        if intake_type == IntakeType::Rescue && replaces_report_id.is_none() {
            return Err(StoreError::RescueRequiresReplacement);
        }
        let client = self
            .data
            .clients
            .get_mut(client_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "client",
                id: client_id.to_string(),
            })?;

        let current = current_month_key();
        if client.incident_month_key != current {
            client.incident_count_month = 0;
            client.incident_month_key = current;
        }
        if intake_type == IntakeType::Incident {
            client.incident_count_month += 1;
        }

        let seq = client.intake_seq + 1;
        client.intake_seq = seq;
        let id = format!("I-{client_id}-{seq:04}");
        client.intakes.push(id.clone());

        let intake = Intake {
            id: id.clone(),
            client_id: client_id.to_string(),
            intake_type,
            status: IntakeStatus::Submitted,
            created_at: Utc::now(),
            authorized_at: None,
            executed_at: None,
            requested_by: requested_by.to_string(),
            replaces_report_id,
            identity,
        };
        self.data.intakes.insert(id.clone(), intake);
        self.log_event(
            EntityKind::Intake,
            &id,
            LogAction::Create,
            None,
            IntakeStatus::Submitted.as_str(),
            requested_by,
        );
        tracing::info!(intake = %id, client = client_id, intake_type = intake_type.as_str(), "intake created");
        self.persist()?;
        Ok(id)
    }

    /// Apply an intake status transition, stamping the matching timestamp.
    pub fn update_intake_status(
        &mut self,
        intake_id: &str,
        to: IntakeStatus,
        actor: &str,
    ) -> Result<(), StoreError> {
        let intake = self
            .data
            .intakes
            .get_mut(intake_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "intake",
                id: intake_id.to_string(),
            })?;
        let from = intake.status;
        check_transition(INTAKE_TRANSITIONS, from, to)?;

        intake.status = to;
        let now = Utc::now();
        match to {
            IntakeStatus::Authorized => intake.authorized_at = Some(now),
            IntakeStatus::Executed => intake.executed_at = Some(now),
            IntakeStatus::Submitted => {}
        }
        self.log_event(
            EntityKind::Intake,
            intake_id,
            LogAction::StatusChange,
            Some(from.as_str()),
            to.as_str(),
            actor,
        );
        tracing::info!(intake = intake_id, from = from.as_str(), to = to.as_str(), actor, "intake status change");
        self.persist()
    }

    /// Create a new report record in `generated` state with QC `pending`.
    pub fn create_report(
        &mut self,
        client_id: &str,
        intake_id: &str,
        report_type: IntakeType,
    ) -> Result<String, StoreError> {
        let client = self
            .data
            .clients
            .get_mut(client_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "client",
                id: client_id.to_string(),
            })?;

        let seq = client.report_seq + 1;
        client.report_seq = seq;
        let id = format!("R-{client_id}-{seq:04}");
        client.reports.push(id.clone());

        let report = Report {
            id: id.clone(),
            client_id: client_id.to_string(),
            intake_id: intake_id.to_string(),
            report_type,
            status: ReportStatus::Generated,
            qc_status: QcStatus::Pending,
            created_at: Utc::now(),
            sent_at: None,
            review_deadline_at: None,
            invalidation_reason: None,
            artifacts: ArtifactRecord::default(),
        };
        self.data.reports.insert(id.clone(), report);
        self.log_event(
            EntityKind::Report,
            &id,
            LogAction::Create,
            None,
            ReportStatus::Generated.as_str(),
            "system",
        );
        tracing::info!(report = %id, client = client_id, intake = intake_id, "report created");
        self.persist()?;
        Ok(id)
    }

    /// Apply a report status transition. Entering `under_review` stamps the
    /// send time and the 48-hour review deadline.
    pub fn update_report_status(
        &mut self,
        report_id: &str,
        to: ReportStatus,
        actor: &str,
        reason: Option<InvalidationReason>,
    ) -> Result<(), StoreError> {
        let report = self
            .data
            .reports
            .get_mut(report_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "report",
                id: report_id.to_string(),
            })?;
        let from = report.status;
        check_transition(REPORT_TRANSITIONS, from, to)?;

        report.status = to;
        if to == ReportStatus::UnderReview {
            let now = Utc::now();
            report.sent_at = Some(now);
            report.review_deadline_at = Some(now + Duration::hours(48));
        }
        if let Some(reason) = reason {
            report.invalidation_reason = Some(reason);
        }
        self.log_event(
            EntityKind::Report,
            report_id,
            LogAction::StatusChange,
            Some(from.as_str()),
            to.as_str(),
            actor,
        );
        tracing::info!(report = report_id, from = from.as_str(), to = to.as_str(), actor, "report status change");
        self.persist()
    }

    /// Record artifact paths for a report.
    pub fn set_artifacts(
        &mut self,
        report_id: &str,
        update: impl FnOnce(&mut ArtifactRecord),
    ) -> Result<(), StoreError> {
        let report = self
            .data
            .reports
            .get_mut(report_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "report",
                id: report_id.to_string(),
            })?;
        update(&mut report.artifacts);
        self.persist()
    }

    /// Resolve the QC verdict for a report. The verdict is set exactly once.
    pub fn update_qc_status(&mut self, report_id: &str, to: QcStatus) -> Result<(), StoreError> {
        let report = self
            .data
            .reports
            .get_mut(report_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "report",
                id: report_id.to_string(),
            })?;
        if report.qc_status != QcStatus::Pending {
            return Err(StoreError::QcAlreadySet(report.qc_status.to_string()));
        }
        if to == QcStatus::Pending {
            return Err(StoreError::IllegalTransition {
                from: QcStatus::Pending.to_string(),
                to: to.to_string(),
            });
        }
        report.qc_status = to;
        self.log_event(
            EntityKind::Report,
            report_id,
            LogAction::QcChange,
            Some(QcStatus::Pending.as_str()),
            to.as_str(),
            "system",
        );
        tracing::info!(report = report_id, qc = to.as_str(), "qc verdict recorded");
        self.persist()
    }

    fn log_event(
        &mut self,
        entity_type: EntityKind,
        entity_id: &str,
        action: LogAction,
        from_state: Option<&str>,
        to_state: &str,
        actor: &str,
    ) {
        self.data.logs.push(EventLogEntry {
            timestamp: Utc::now(),
            entity_type,
            entity_id: entity_id.to_string(),
            action,
            from_state: from_state.map(str::to_string),
            to_state: to_state.to_string(),
            actor: actor.to_string(),
        });
    }

    fn persist(&self) -> Result<(), StoreError> {
        let persist_err = |detail: String| StoreError::Persist {
            path: self.path.clone(),
            detail,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| persist_err(err.to_string()))?;
        }
        let text = serde_json::to_string_pretty(&self.data)
            .map_err(|err| persist_err(err.to_string()))?;
        fs::write(&self.path, text.as_bytes()).map_err(|err| persist_err(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, EntityStore) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = EntityStore::open(dir.path().join("state.json")).expect("open store");
        (dir, store)
    }

    #[test]
    fn create_client_is_idempotent_on_email() {
        let (_dir, mut store) = temp_store();
        let first = store
            .create_client("Ada Lovelace", ClientClass::Individual, "ada@example.com")
            .unwrap();
        let second = store
            .create_client("Ada L.", ClientClass::Organization, "ADA@example.com ")
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.clients().count(), 1);
    }

    #[test]
    fn intake_ids_follow_the_client_sequence() {
        let (_dir, mut store) = temp_store();
        let client = store
            .create_client("Ada Lovelace", ClientClass::Individual, "ada@example.com")
            .unwrap();
        let first = store
            .create_intake(&client, IntakeType::Baseline, "operator", None, IdentityPayload::default())
            .unwrap();
        let second = store
            .create_intake(&client, IntakeType::Periodic, "operator", None, IdentityPayload::default())
            .unwrap();
        assert_eq!(first, format!("I-{client}-0001"));
        assert_eq!(second, format!("I-{client}-0002"));
        assert_eq!(store.client(&client).unwrap().intake_seq, 2);
    }

    #[test]
    fn create_intake_rejects_unknown_client() {
        let (_dir, mut store) = temp_store();
        let err = store
            .create_intake("NOPE", IntakeType::Baseline, "operator", None, IdentityPayload::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "client", .. }));
    }

    #[test]
    fn rescue_intake_requires_replaced_report() {
        let (_dir, mut store) = temp_store();
        let client = store
            .create_client("Ada Lovelace", ClientClass::Individual, "ada@example.com")
            .unwrap();
        let err = store
            .create_intake(&client, IntakeType::Rescue, "system", None, IdentityPayload::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::RescueRequiresReplacement));
    }

    #[test]
    fn illegal_intake_transition_leaves_status_unchanged() {
        let (_dir, mut store) = temp_store();
        let client = store
            .create_client("Ada Lovelace", ClientClass::Individual, "ada@example.com")
            .unwrap();
        let intake = store
            .create_intake(&client, IntakeType::Baseline, "operator", None, IdentityPayload::default())
            .unwrap();

        let err = store
            .update_intake_status(&intake, IntakeStatus::Executed, "operator")
            .unwrap_err();
        assert!(matches!(err, StoreError::IllegalTransition { .. }));
        assert_eq!(store.intake(&intake).unwrap().status, IntakeStatus::Submitted);

        store
            .update_intake_status(&intake, IntakeStatus::Authorized, "operator")
            .unwrap();
        assert_eq!(store.intake(&intake).unwrap().status, IntakeStatus::Authorized);
        assert!(store.intake(&intake).unwrap().authorized_at.is_some());
    }

    #[test]
    fn report_qc_bypass_edge_is_legal_and_review_path_stamps_deadline() {
        let (_dir, mut store) = temp_store();
        let client = store
            .create_client("Ada Lovelace", ClientClass::Individual, "ada@example.com")
            .unwrap();
        let intake = store
            .create_intake(&client, IntakeType::Baseline, "operator", None, IdentityPayload::default())
            .unwrap();

        let failed = store.create_report(&client, &intake, IntakeType::Baseline).unwrap();
        store
            .update_report_status(&failed, ReportStatus::Invalidated, "system", Some(InvalidationReason::QcFailure))
            .unwrap();
        let record = store.report(&failed).unwrap();
        assert_eq!(record.status, ReportStatus::Invalidated);
        assert_eq!(record.invalidation_reason, Some(InvalidationReason::QcFailure));

        let sent = store.create_report(&client, &intake, IntakeType::Baseline).unwrap();
        store
            .update_report_status(&sent, ReportStatus::UnderReview, "system", None)
            .unwrap();
        let record = store.report(&sent).unwrap();
        assert!(record.sent_at.is_some());
        assert!(record.review_deadline_at.unwrap() > record.sent_at.unwrap());

        let err = store
            .update_report_status(&sent, ReportStatus::Generated, "system", None)
            .unwrap_err();
        assert!(matches!(err, StoreError::IllegalTransition { .. }));
        assert_eq!(store.report(&sent).unwrap().status, ReportStatus::UnderReview);
    }

    #[test]
    fn qc_status_is_set_exactly_once() {
        let (_dir, mut store) = temp_store();
        let client = store
            .create_client("Ada Lovelace", ClientClass::Individual, "ada@example.com")
            .unwrap();
        let intake = store
            .create_intake(&client, IntakeType::Baseline, "operator", None, IdentityPayload::default())
            .unwrap();
        let report = store.create_report(&client, &intake, IntakeType::Baseline).unwrap();

        store.update_qc_status(&report, QcStatus::Approved).unwrap();
        let err = store.update_qc_status(&report, QcStatus::Failed).unwrap_err();
        assert!(matches!(err, StoreError::QcAlreadySet(_)));
        assert_eq!(store.report(&report).unwrap().qc_status, QcStatus::Approved);
    }

    #[test]
    fn monthly_counters_reset_on_month_rollover() {
        let (_dir, mut store) = temp_store();
        let client = store
            .create_client("Ada Lovelace", ClientClass::Individual, "ada@example.com")
            .unwrap();
        {
            let record = store.data.clients.get_mut(&client).unwrap();
            record.incident_month_key = "2020-01".to_string();
            record.incident_count_month = 5;
        }

        store
            .create_intake(&client, IntakeType::Baseline, "operator", None, IdentityPayload::default())
            .unwrap();
        let record = store.client(&client).unwrap();
        assert_eq!(record.incident_month_key, current_month_key());
        assert_eq!(record.incident_count_month, 0);

        store
            .create_intake(&client, IntakeType::Incident, "operator", None, IdentityPayload::default())
            .unwrap();
        assert_eq!(store.client(&client).unwrap().incident_count_month, 1);
    }

    #[test]
    fn open_backfills_defaults_for_older_documents() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"clients":{"C1":{"id":"C1","full_name":"Ada","slug":"ada"}}}"#,
        )
        .unwrap();

        let store = EntityStore::open(path).expect("open store");
        let client = store.client("C1").unwrap();
        assert_eq!(client.class, ClientClass::Individual);
        assert_eq!(client.incident_limit_month, 2);
        assert_eq!(client.incident_count_month, 0);
        assert!(client.intakes.is_empty());
    }

    #[test]
    fn mutations_append_audit_log_entries() {
        let (_dir, mut store) = temp_store();
        let client = store
            .create_client("Ada Lovelace", ClientClass::Individual, "ada@example.com")
            .unwrap();
        let intake = store
            .create_intake(&client, IntakeType::Baseline, "operator", None, IdentityPayload::default())
            .unwrap();
        store
            .update_intake_status(&intake, IntakeStatus::Authorized, "operator")
            .unwrap();

        let logs = store.logs();
        assert_eq!(logs.len(), 3);
        let last = logs.last().unwrap();
        assert_eq!(last.entity_type, EntityKind::Intake);
        assert_eq!(last.from_state.as_deref(), Some("submitted"));
        assert_eq!(last.to_state, "authorized");
        assert_eq!(last.actor, "operator");
    }
}
