//! Lifecycle engine: drives one intake from execution to dispatch or rescue.
//!
//! The engine is the only writer of intake/report status. External
//! collaborator failures degrade to "no data from this source" and the run
//! continues; the one exception is artifact rendering, which aborts the
//! intake because a report without a document is not a report.
use anyhow::Result;
use chrono::Utc;

use crate::collect::{breach_finding, BreachDirectory, EvidenceCollector, MentionSearch};
use crate::notify::{DispatchRequest, ReportDispatcher};
use crate::paths::DataPaths;
use crate::pipeline::{self, Finding};
use crate::qc;
use crate::render::{artifact_stem, ArtifactRenderer, DocType, RenderRequest};
use crate::store::{
    Client, EntityStore, Intake, IntakeStatus, IntakeType, InvalidationReason, QcStatus,
    ReportStatus, StoreError,
};
use crate::util::write_json_pretty;

/// External collaborators the engine drives one intake through.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub collector: &'a dyn EvidenceCollector,
    pub breaches: &'a dyn BreachDirectory,
    pub mentions: &'a dyn MentionSearch,
    pub renderer: &'a dyn ArtifactRenderer,
    pub dispatcher: &'a dyn ReportDispatcher,
}

/// Result of one end-to-end intake run.
#[derive(Debug)]
pub struct RunOutcome {
    pub report_id: String,
    pub qc_status: QcStatus,
    pub rescue_intake_id: Option<String>,
    pub findings: Vec<Finding>,
}

/// Drives one intake through the full lifecycle against the entity store.
pub struct Engine<'a> {
    store: &'a mut EntityStore,
    paths: &'a DataPaths,
    collab: Collaborators<'a>,
}

impl<'a> Engine<'a> {
    pub fn new(store: &'a mut EntityStore, paths: &'a DataPaths, collab: Collaborators<'a>) -> Self {
        Self {
            store,
            paths,
            collab,
        }
    }

    /// Run one authorized intake end to end.
    pub fn run_intake(&mut self, intake_id: &str) -> Result<RunOutcome> {
        let intake = self
            .store
            .intake(intake_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "intake",
                id: intake_id.to_string(),
            })?;
        let client = self
            .store
            .client(&intake.client_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "client",
                id: intake.client_id.clone(),
            })?;
        tracing::info!(intake = intake_id, client = %client.id, "pipeline start");

        self.store
            .update_intake_status(intake_id, IntakeStatus::Executed, "system")?;

        let target = resolve_target(&intake, &client);
        let raw_events = match self.collab.collector.collect(&target) {
            Ok(events) => events,
            Err(err) => {
                tracing::error!(target = %target, error = %err, "collection failed; continuing with no evidence");
                Vec::new()
            }
        };
        self.persist_raw_events(&client, intake_id, &raw_events);

        let mut findings = pipeline::process(&raw_events);

        for email in &intake.identity.emails {
            match self.collab.breaches.breaches_for(email) {
                Ok(records) => {
                    findings.extend(records.iter().map(|record| breach_finding(email, record)));
                }
                Err(err) => {
                    tracing::error!(email = %email, error = %err, "breach lookup failed; treating as no data");
                }
            }
        }

        match self.collab.mentions.mentions(&target) {
            Ok(mentions) => findings.extend(mentions),
            Err(err) => {
                tracing::error!(error = %err, "mention search failed; treating as no data");
            }
        }

        let report_id =
            self.store
                .create_report(&client.id, intake_id, intake.intake_type)?;

        let artifact = self.collab.renderer.render(&RenderRequest {
            client: &client,
            intake: &intake,
            report_id: &report_id,
            findings: &findings,
        })?;
        self.store.set_artifacts(&report_id, |record| {
            record.document_path = Some(artifact.document_path.clone());
            record.legal_request_paths = artifact.legal_request_paths.clone();
        })?;

        let checklist = qc::run_checklist(self.store, &report_id, Some(&artifact.document_path))?;
        let checklist_path = self.paths.reports_dir().join(format!(
            "{}.json",
            artifact_stem(
                DocType::Qc,
                &client.id,
                &client.slug,
                &report_id,
                Utc::now().date_naive(),
            )
        ));
        if let Err(err) = write_json_pretty(&checklist_path, &checklist) {
            tracing::warn!(error = %err, "failed to write qc checklist artifact");
        } else {
            self.store.set_artifacts(&report_id, |record| {
                record.qc_checklist_path = Some(checklist_path.clone());
            })?;
        }
        self.store.update_qc_status(&report_id, checklist.status)?;

        let rescue_intake_id = if checklist.status == QcStatus::Approved {
            self.store
                .update_report_status(&report_id, ReportStatus::UnderReview, "system", None)?;
            self.dispatch_report(&client, &intake, &report_id, &artifact.document_path);
            None
        } else {
            tracing::warn!(report = %report_id, "qc failed; invalidating and creating rescue intake");
            self.store.update_report_status(
                &report_id,
                ReportStatus::Invalidated,
                "system",
                Some(InvalidationReason::QcFailure),
            )?;
            let rescue_id = self.store.create_intake(
                &client.id,
                IntakeType::Rescue,
                "system",
                Some(report_id.clone()),
                crate::store::IdentityPayload::default(),
            )?;
            tracing::info!(rescue = %rescue_id, replaces = %report_id, "rescue intake created");
            Some(rescue_id)
        };

        tracing::info!(intake = intake_id, report = %report_id, qc = checklist.status.as_str(), "pipeline finished");
        Ok(RunOutcome {
            report_id,
            qc_status: checklist.status,
            rescue_intake_id,
            findings,
        })
    }

    /// Keep the raw evidence on disk for audit; failure here is not fatal.
    fn persist_raw_events(&self, client: &Client, intake_id: &str, events: &[crate::pipeline::RawEvent]) {
        let path = self
            .paths
            .raw_dir()
            .join(&client.slug)
            .join(intake_id)
            .join("events.json");
        if let Err(err) = write_json_pretty(&path, &events) {
            tracing::warn!(error = %err, "failed to persist raw evidence");
        }
    }

    /// Send the approved report. Send failures are logged, never rolled back.
    fn dispatch_report(
        &self,
        client: &Client,
        intake: &Intake,
        report_id: &str,
        artifact: &std::path::Path,
    ) {
        let mut recipients = intake.identity.emails.clone();
        if recipients.is_empty() {
            recipients.extend(client.email.clone());
        }
        if recipients.is_empty() {
            tracing::warn!(report = report_id, "no recipients resolved; skipping dispatch");
            return;
        }
        let request = DispatchRequest {
            report_id,
            recipients: &recipients,
            subject: format!("Intelligence report {report_id}"),
            artifact,
        };
        match self.collab.dispatcher.dispatch(&request) {
            Ok(receipt) => {
                tracing::info!(report = report_id, message_id = %receipt.message_id, "report dispatched");
            }
            Err(err) => {
                tracing::error!(report = report_id, error = %err, "report dispatch failed");
            }
        }
    }
}

/// Pick the best scan target: identity email, then full name, then slug.
fn resolve_target(intake: &Intake, client: &Client) -> String {
    if let Some(email) = intake.identity.emails.first() {
        return email.clone();
    }
    if !client.full_name.trim().is_empty() {
        return client.full_name.clone();
    }
    client.slug.clone()
}
