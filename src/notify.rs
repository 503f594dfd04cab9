//! Report dispatch collaborator.
//!
//! Transport of the final artifact is an external concern behind the
//! `ReportDispatcher` trait. The bundled implementation queues a JSON
//! envelope into the outbox directory for a separate sender to pick up.
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use crate::util::write_json_pretty;

/// Inputs for dispatching one report.
pub struct DispatchRequest<'a> {
    pub report_id: &'a str,
    pub recipients: &'a [String],
    pub subject: String,
    pub artifact: &'a Path,
}

/// Proof of a queued or sent dispatch.
#[derive(Debug, Clone)]
pub struct DispatchReceipt {
    pub message_id: String,
}

/// Outbound notification seam between the engine and the transport concern.
pub trait ReportDispatcher {
    fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReceipt>;
}

/// Writes dispatch envelopes into an outbox directory.
#[derive(Debug, Clone)]
pub struct OutboxDispatcher {
    outbox_dir: PathBuf,
    sender: String,
}

impl OutboxDispatcher {
    pub fn new(outbox_dir: PathBuf, sender: String) -> Self {
        Self { outbox_dir, sender }
    }
}

impl ReportDispatcher for OutboxDispatcher {
    fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReceipt> {
        fs::create_dir_all(&self.outbox_dir)
            .with_context(|| format!("create {}", self.outbox_dir.display()))?;

        let message_id = format!("{}-{}", request.report_id, Utc::now().timestamp_millis());
        let envelope = serde_json::json!({
            "message_id": message_id,
            "sender": self.sender,
            "recipients": request.recipients,
            "subject": request.subject,
            "artifact": request.artifact,
            "queued_at": Utc::now().to_rfc3339(),
        });
        let path = self.outbox_dir.join(format!("msg-{message_id}.json"));
        write_json_pretty(&path, &envelope)?;

        tracing::info!(message_id = %message_id, path = %path.display(), "dispatch envelope queued");
        Ok(DispatchReceipt { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_queues_an_envelope_in_the_outbox() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let dispatcher = OutboxDispatcher::new(
            dir.path().join("outbox"),
            "noreply@mapard.example".to_string(),
        );
        let recipients = ["ada@example.com".to_string()];
        let receipt = dispatcher
            .dispatch(&DispatchRequest {
                report_id: "R-C1-0001",
                recipients: &recipients,
                subject: "Intelligence report R-C1-0001".to_string(),
                artifact: Path::new("/tmp/report.md"),
            })
            .unwrap();

        let envelope_path = dir
            .path()
            .join("outbox")
            .join(format!("msg-{}.json", receipt.message_id));
        let raw = fs::read_to_string(envelope_path).unwrap();
        let envelope: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(envelope["recipients"][0], "ada@example.com");
        assert_eq!(envelope["sender"], "noreply@mapard.example");
    }
}
