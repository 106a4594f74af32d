//! [`ResultSink`] that checkpoints each finished chunk into the run ledger.

use async_trait::async_trait;
use outreach_shared::{ProcessingResult, Result, RunId};
use outreach_storage::Ledger;
use tracing::debug;

use crate::batch::ResultSink;

pub struct LedgerSink<'a> {
    ledger: &'a Ledger,
    run_id: &'a RunId,
}

impl<'a> LedgerSink<'a> {
    pub fn new(ledger: &'a Ledger, run_id: &'a RunId) -> Self {
        Self { ledger, run_id }
    }
}

#[async_trait]
impl ResultSink for LedgerSink<'_> {
    async fn chunk_finished(
        &mut self,
        chunk_index: usize,
        results: &[ProcessingResult],
    ) -> Result<()> {
        self.ledger.save_results(self.run_id, results).await?;
        debug!(
            run_id = %self.run_id,
            chunk = chunk_index,
            saved = results.len(),
            "chunk checkpointed"
        );
        Ok(())
    }
}
