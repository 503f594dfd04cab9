//! Priority scheduler for authorized intakes.
//!
//! Selection order is fixed: rescue before incident before periodic before
//! baseline, FIFO by creation time within a class. Batch execution keeps
//! going past individual intake failures and reports final counts.
use crate::engine::{Collaborators, Engine};
use crate::paths::DataPaths;
use crate::store::{EntityStore, Intake, IntakeStatus};

/// Counts reported by one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub executed: usize,
    pub failed: usize,
}

/// Return authorized intakes in execution order.
pub fn list_runnable(store: &EntityStore) -> Vec<Intake> {
    let mut runnable: Vec<Intake> = store
        .intakes()
        .filter(|intake| intake.status == IntakeStatus::Authorized)
        .cloned()
        .collect();
    runnable.sort_by_key(|intake| (intake.intake_type.priority_rank(), intake.created_at));
    runnable
}

/// Execute every authorized intake in priority order.
///
/// One intake's failure is caught and logged; subsequent intakes in the same
/// batch still run.
pub fn run_batch(
    store: &mut EntityStore,
    paths: &DataPaths,
    collab: Collaborators<'_>,
) -> BatchSummary {
    let runnable = list_runnable(store);
    tracing::info!(pending = runnable.len(), "scheduler batch start");

    let mut summary = BatchSummary::default();
    for intake in runnable {
        match Engine::new(store, paths, collab).run_intake(&intake.id) {
            Ok(outcome) => {
                summary.executed += 1;
                tracing::info!(
                    intake = %intake.id,
                    report = %outcome.report_id,
                    qc = outcome.qc_status.as_str(),
                    "batch intake finished"
                );
            }
            Err(err) => {
                summary.failed += 1;
                tracing::error!(intake = %intake.id, error = %err, "batch intake failed; continuing");
            }
        }
    }
    tracing::info!(executed = summary.executed, failed = summary.failed, "scheduler batch finished");
    summary
}
