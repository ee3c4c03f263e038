use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::pacer::Pacer;
use super::query::{Cell, HarvestPlan};
use super::record::{HarvestResult, NormalizedRecord, normalize};
use crate::backend::{BackendError, RawResult, SearchBackend};

/// Walks a [`HarvestPlan`] one backend call at a time.
///
/// Failed or timed-out calls contribute nothing to their cell and never stop
/// the run. The pacer runs after every call, successful or not.
pub struct Harvester<'a, B, P> {
    backend: &'a B,
    pacer: &'a P,
    call_timeout: Duration,
}

impl<'a, B: SearchBackend, P: Pacer> Harvester<'a, B, P> {
    pub fn new(backend: &'a B, pacer: &'a P, call_timeout: Duration) -> Self {
        Self {
            backend,
            pacer,
            call_timeout,
        }
    }

    pub async fn run(&self, plan: &HarvestPlan) -> HarvestResult {
        let total = plan.subjects.len();
        let this = self;

        let records = stream::iter(plan.cells())
            .fold(Vec::new(), move |mut acc, cell| async move {
                if cell.opens_subject(&plan.specs) {
                    info!(
                        "[{}/{}] checking {}",
                        cell.subject_index + 1,
                        total,
                        cell.subject.name
                    );
                }
                acc.extend(this.harvest_cell(cell).await);
                acc
            })
            .await;

        HarvestResult::finalize(records)
    }

    async fn harvest_cell(&self, cell: Cell<'_>) -> Vec<NormalizedRecord> {
        let spec = cell.spec;
        let subject = cell.subject.name.as_str();
        let query = cell.query();

        let records = match self.call(&query, cell).await {
            Ok(raw) => {
                debug!(subject, category = %spec.category, count = raw.len(), "search returned");
                raw.iter()
                    .take(spec.result_limit)
                    .map(|r| normalize(r, subject, spec.category))
                    .collect()
            }
            Err(e) => {
                warn!(subject, category = %spec.category, error = %e, "search failed (continuing)");
                Vec::new()
            }
        };

        self.pacer.pace(spec.pace_class()).await;
        records
    }

    async fn call(&self, query: &str, cell: Cell<'_>) -> Result<Vec<RawResult>, BackendError> {
        tokio::time::timeout(
            self.call_timeout,
            self.backend.execute(cell.spec.backend, query, cell.spec.result_limit),
        )
        .await
        .unwrap_or_else(|_| Err(BackendError::Timeout(self.call_timeout)))
    }
}
