//! Chunked batch execution with bounded concurrency.
//!
//! Chunks run one after another. Inside a chunk, prospects are spawned as
//! tasks limited by a semaphore and awaited in input order, so results come
//! out in input order no matter which task finishes first. After each chunk
//! the results are handed to a [`ResultSink`] before the next chunk starts.
//!
//! Cancellation only takes effect between chunks: a chunk that has started
//! always runs to completion, so no paid-for call is thrown away.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use outreach_artifacts::StatusCounts;
use outreach_shared::{OutreachError, PipelineConfig, ProcessingResult, Prospect, Result};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::chunker::{self, chunk_count};
use crate::orchestrator::{Orchestrator, failed_result};

// ---------------------------------------------------------------------------
// Settings and results
// ---------------------------------------------------------------------------

/// Batch shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    pub chunk_size: usize,
    pub concurrency_limit: usize,
}

impl From<&PipelineConfig> for BatchSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            concurrency_limit: config.concurrency_limit,
        }
    }
}

/// How the batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Completed,
    /// Stopped by the cancellation token; later prospects were not processed.
    Cancelled,
}

/// Everything a batch produced.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub outcome: BatchOutcome,
    pub counts: StatusCounts,
    pub chunks_total: usize,
    /// Chunks whose every prospect has a result.
    pub chunks_processed: usize,
    /// Results carried over from an earlier run instead of being processed.
    pub resumed: usize,
    /// One entry per processed prospect, in input order.
    pub results: Vec<ProcessingResult>,
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Compact JSON for the run ledger.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "outcome": self.outcome,
            "counts": self.counts,
            "chunks_total": self.chunks_total,
            "chunks_processed": self.chunks_processed,
            "resumed": self.resumed,
            "processed": self.results.len(),
            "elapsed_ms": self.elapsed.as_millis() as u64,
        })
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called once before the first chunk.
    fn started(&self, total: usize, already_done: usize);
    /// Called when a chunk begins.
    fn chunk_started(&self, index: usize, chunks_total: usize, size: usize);
    /// Called for every prospect that reaches a terminal state.
    fn prospect_finished(&self, result: &ProcessingResult);
    /// Called when the batch stops, whether finished or cancelled.
    fn done(&self, summary: &BatchSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn started(&self, _total: usize, _already_done: usize) {}
    fn chunk_started(&self, _index: usize, _chunks_total: usize, _size: usize) {}
    fn prospect_finished(&self, _result: &ProcessingResult) {}
    fn done(&self, _summary: &BatchSummary) {}
}

/// Receives each chunk's results, in input order, as soon as the chunk ends.
#[async_trait]
pub trait ResultSink: Send {
    async fn chunk_finished(
        &mut self,
        chunk_index: usize,
        results: &[ProcessingResult],
    ) -> Result<()>;
}

/// Sink that drops everything.
pub struct NullSink;

#[async_trait]
impl ResultSink for NullSink {
    async fn chunk_finished(
        &mut self,
        _chunk_index: usize,
        _results: &[ProcessingResult],
    ) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Run every prospect through `orchestrator`, chunk by chunk.
///
/// `prior` holds results from an interrupted run; their positions are not
/// processed again and they are merged into the summary in order.
///
/// `cancel` is checked before each chunk. Cancelling while a chunk is running
/// lets that chunk finish and checkpoint, then stops.
///
/// An authentication failure stops the chunk's remaining prospects, passes
/// its finished results to `sink`, and is returned as `Err`.
#[instrument(skip_all, fields(prospects = prospects.len(), chunk_size = settings.chunk_size))]
pub async fn run_batch(
    prospects: &[Prospect],
    orchestrator: Arc<Orchestrator>,
    settings: &BatchSettings,
    prior: Vec<ProcessingResult>,
    sink: &mut dyn ResultSink,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<BatchSummary> {
    if settings.concurrency_limit == 0 {
        return Err(OutreachError::validation("concurrency limit must be greater than 0"));
    }
    let chunks = chunker::chunk(prospects, settings.chunk_size)?;

    let start = Instant::now();
    let chunks_total = chunk_count(prospects.len(), settings.chunk_size);

    let mut done: BTreeMap<usize, ProcessingResult> = prior
        .into_iter()
        .filter(|r| r.position < prospects.len())
        .map(|r| (r.position, r))
        .collect();
    let resumed = done.len();

    info!(chunks_total, resumed, "starting batch");
    progress.started(prospects.len(), resumed);

    let mut outcome = BatchOutcome::Completed;
    let mut chunks_processed = 0;

    for chunk in chunks {
        if cancel.is_cancelled() {
            info!(chunk = chunk.index, "cancellation requested, stopping before chunk");
            outcome = BatchOutcome::Cancelled;
            break;
        }

        let pending: Vec<(usize, &Prospect)> = chunk
            .positions()
            .zip(chunk.items)
            .filter(|(position, _)| !done.contains_key(position))
            .collect();

        if pending.is_empty() {
            chunks_processed += 1;
            continue;
        }

        progress.chunk_started(chunk.index, chunks_total, chunk.items.len());
        info!(
            chunk = chunk.index,
            offset = chunk.offset,
            pending = pending.len(),
            "processing chunk"
        );

        // Independent of `cancel`; only an auth failure trips it.
        let abort = CancellationToken::new();
        let semaphore = Arc::new(Semaphore::new(settings.concurrency_limit));
        let mut handles = Vec::with_capacity(pending.len());

        for (position, prospect) in pending {
            let sem = semaphore.clone();
            let orchestrator = orchestrator.clone();
            let token = abort.clone();
            let owned = prospect.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = sem.acquire_owned().await else {
                    return None;
                };
                if token.is_cancelled() {
                    return None;
                }
                let processed = tokio::select! {
                    biased;
                    _ = token.cancelled() => return None,
                    processed = orchestrator.process(position, owned) => processed,
                };
                if matches!(&processed, Err(e) if e.is_auth()) {
                    token.cancel();
                }
                Some(processed)
            });
            handles.push((position, prospect, handle));
        }

        let mut chunk_results = Vec::with_capacity(handles.len());
        let mut fatal: Option<OutreachError> = None;

        for (position, prospect, handle) in handles {
            match handle.await {
                Ok(Some(Ok(result))) => {
                    progress.prospect_finished(&result);
                    chunk_results.push(result);
                }
                Ok(Some(Err(e))) => {
                    if fatal.is_none() {
                        error!(position, error = %e, "batch-fatal error, stopping");
                        fatal = Some(e);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!(position, error = %e, "prospect task failed");
                    let result =
                        failed_result(position, prospect.clone(), format!("task failed: {e}"));
                    progress.prospect_finished(&result);
                    chunk_results.push(result);
                }
            }
        }

        sink.chunk_finished(chunk.index, &chunk_results).await?;
        done.extend(chunk_results.into_iter().map(|r| (r.position, r)));

        if let Some(e) = fatal {
            warn!(chunk = chunk.index, kept = done.len(), "batch aborted");
            return Err(e);
        }

        chunks_processed += 1;
        if cancel.is_cancelled() {
            info!(chunk = chunk.index, "cancellation requested, chunk finished and saved");
        }
    }

    let results: Vec<ProcessingResult> = done.into_values().collect();
    let summary = BatchSummary {
        outcome,
        counts: StatusCounts::tally(&results),
        chunks_total,
        chunks_processed,
        resumed,
        results,
        elapsed: start.elapsed(),
    };

    info!(
        outcome = ?summary.outcome,
        completed = summary.counts.completed,
        partial_failure = summary.counts.partial_failure,
        failure = summary.counts.failure,
        chunks_processed = summary.chunks_processed,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "batch finished"
    );
    progress.done(&summary);

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use outreach_gateway::Step;
    use outreach_shared::{GatewayError, ProcessingStatus};

    use super::*;
    use crate::orchestrator::tests::{ScriptedGateway, orchestrator};

    fn prospects(n: usize) -> Vec<Prospect> {
        (0..n)
            .map(|i| Prospect::new(format!("Person {i}"), format!("Company {i}"), None))
            .collect()
    }

    fn settings(chunk_size: usize, concurrency_limit: usize) -> BatchSettings {
        BatchSettings {
            chunk_size,
            concurrency_limit,
        }
    }

    /// Records every chunk handed to it.
    #[derive(Default)]
    struct MemorySink {
        chunks: Vec<(usize, Vec<usize>)>,
    }

    #[async_trait]
    impl ResultSink for MemorySink {
        async fn chunk_finished(
            &mut self,
            chunk_index: usize,
            results: &[ProcessingResult],
        ) -> Result<()> {
            self.chunks
                .push((chunk_index, results.iter().map(|r| r.position).collect()));
            Ok(())
        }
    }

    /// Cancels the token once `after` prospects have finished.
    struct CancelAfter {
        token: CancellationToken,
        after: usize,
        seen: AtomicUsize,
    }

    impl ProgressReporter for CancelAfter {
        fn started(&self, _total: usize, _already_done: usize) {}
        fn chunk_started(&self, _index: usize, _chunks_total: usize, _size: usize) {}
        fn prospect_finished(&self, _result: &ProcessingResult) {
            if self.seen.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
                self.token.cancel();
            }
        }
        fn done(&self, _summary: &BatchSummary) {}
    }

    /// Delay derived from the person number in the prompt, so later
    /// prospects tend to finish first.
    fn reverse_delay(prompt: &str) -> Duration {
        let n: u64 = prompt
            .split("Person ")
            .nth(1)
            .and_then(|rest| rest.split(|c: char| !c.is_ascii_digit()).next())
            .and_then(|digits| digits.parse().ok())
            .unwrap_or(0);
        Duration::from_millis(40u64.saturating_sub(n * 3))
    }

    #[tokio::test]
    async fn results_follow_input_order() {
        let gateway = Arc::new(ScriptedGateway::new().with_delay(reverse_delay));
        let orch = Arc::new(orchestrator(gateway.clone(), 0));
        let input = prospects(12);
        let mut sink = MemorySink::default();

        let summary = run_batch(
            &input,
            orch,
            &settings(5, 4),
            Vec::new(),
            &mut sink,
            &SilentProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, BatchOutcome::Completed);
        assert_eq!(summary.chunks_total, 3);
        assert_eq!(summary.chunks_processed, 3);
        let positions: Vec<_> = summary.results.iter().map(|r| r.position).collect();
        assert_eq!(positions, (0..12).collect::<Vec<_>>());
        for (result, prospect) in summary.results.iter().zip(&input) {
            assert_eq!(&result.prospect, prospect);
        }
        assert_eq!(summary.counts.completed, 12);
        assert_eq!(
            sink.chunks,
            vec![
                (0, vec![0, 1, 2, 3, 4]),
                (1, vec![5, 6, 7, 8, 9]),
                (2, vec![10, 11]),
            ]
        );
        assert_eq!(gateway.calls(Step::Research), 12);
        assert_eq!(gateway.calls(Step::EmailGeneration), 12);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_siblings() {
        let gateway = Arc::new(ScriptedGateway::new().push(
            Step::Research,
            Err(GatewayError::MalformedResponse {
                message: "empty".into(),
            }),
        ));
        let orch = Arc::new(orchestrator(gateway, 3));

        let summary = run_batch(
            &prospects(3),
            orch,
            &settings(5, 1),
            Vec::new(),
            &mut NullSink,
            &SilentProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.results.len(), 3);
        assert_eq!(summary.results[0].status, ProcessingStatus::Failure);
        assert_eq!(summary.results[1].status, ProcessingStatus::Completed);
        assert_eq!(summary.results[2].status, ProcessingStatus::Completed);
        assert_eq!(summary.counts.failure, 1);
        assert_eq!(summary.counts.completed, 2);
    }

    #[tokio::test]
    async fn auth_error_aborts_and_flushes_finished_results() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .push(Step::Research, Ok("General Report: fine"))
                .always(
                    Step::Research,
                    Err(GatewayError::AuthError {
                        status: 401,
                        message: "invalid key".into(),
                    }),
                ),
        );
        let orch = Arc::new(orchestrator(gateway.clone(), 3));
        let mut sink = MemorySink::default();

        let err = run_batch(
            &prospects(6),
            orch,
            &settings(3, 1),
            Vec::new(),
            &mut sink,
            &SilentProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(err.is_auth());
        // first prospect finished before the bad key was hit
        assert_eq!(sink.chunks, vec![(0, vec![0])]);
        // no retries on auth, and the second chunk never started
        assert_eq!(gateway.calls(Step::Research), 2);
    }

    #[tokio::test]
    async fn cancellation_before_start_processes_nothing() {
        let gateway = Arc::new(ScriptedGateway::new());
        let orch = Arc::new(orchestrator(gateway.clone(), 0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = run_batch(
            &prospects(4),
            orch,
            &settings(2, 2),
            Vec::new(),
            &mut NullSink,
            &SilentProgress,
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, BatchOutcome::Cancelled);
        assert!(summary.results.is_empty());
        assert_eq!(summary.chunks_processed, 0);
        assert_eq!(gateway.calls(Step::Research), 0);
    }

    #[tokio::test]
    async fn cancellation_mid_chunk_finishes_the_chunk() {
        let gateway = Arc::new(ScriptedGateway::new());
        let orch = Arc::new(orchestrator(gateway.clone(), 0));
        let cancel = CancellationToken::new();
        // cancelled as soon as the first prospect of the first chunk is done
        let progress = CancelAfter {
            token: cancel.clone(),
            after: 1,
            seen: AtomicUsize::new(0),
        };
        let mut sink = MemorySink::default();

        let summary = run_batch(
            &prospects(6),
            orch,
            &settings(3, 1),
            Vec::new(),
            &mut sink,
            &progress,
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, BatchOutcome::Cancelled);
        assert_eq!(summary.chunks_processed, 1);
        let positions: Vec<_> = summary.results.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert!(summary.results.iter().all(|r| r.is_success()));
        assert_eq!(sink.chunks, vec![(0, vec![0, 1, 2])]);
        assert_eq!(gateway.calls(Step::Research), 3);
        assert_eq!(gateway.calls(Step::EmailGeneration), 3);
    }

    fn slow_person_3(prompt: &str) -> Duration {
        if prompt.contains("Person 3") {
            Duration::from_millis(300)
        } else {
            Duration::ZERO
        }
    }

    #[tokio::test]
    async fn cancel_during_slow_call_keeps_its_result() {
        let gateway = Arc::new(ScriptedGateway::new().with_delay(slow_person_3));
        let orch = Arc::new(orchestrator(gateway.clone(), 0));
        let cancel = CancellationToken::new();
        let trigger = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            })
        };

        let summary = run_batch(
            &prospects(6),
            orch,
            &settings(4, 4),
            Vec::new(),
            &mut NullSink,
            &SilentProgress,
            &cancel,
        )
        .await
        .unwrap();
        trigger.await.unwrap();

        assert_eq!(summary.outcome, BatchOutcome::Cancelled);
        let positions: Vec<_> = summary.results.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
        assert_eq!(summary.results[3].status, ProcessingStatus::Completed);
        assert_eq!(gateway.calls(Step::Research), 4);
        assert_eq!(gateway.calls(Step::EmailGeneration), 4);
    }

    #[tokio::test]
    async fn karl_martin_runs_as_one_chunk() {
        let gateway = Arc::new(ScriptedGateway::new());
        let orch = Arc::new(orchestrator(gateway.clone(), 3));
        let karl = vec![Prospect::new(
            "Karl Martin",
            "integrate.ai",
            Some("https://www.linkedin.com/in/karlmartin0".into()),
        )];
        let mut sink = MemorySink::default();

        let summary = run_batch(
            &karl,
            orch,
            &settings(5, 2),
            Vec::new(),
            &mut sink,
            &SilentProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, BatchOutcome::Completed);
        assert_eq!(summary.chunks_total, 1);
        assert_eq!(summary.chunks_processed, 1);
        assert_eq!(sink.chunks, vec![(0, vec![0])]);
        let result = &summary.results[0];
        assert_eq!(result.status, ProcessingStatus::Completed);
        assert!(result.research.is_some());
        assert!(result.email.is_some());
    }

    #[tokio::test]
    async fn always_transient_prospect_fails_after_four_attempts() {
        let gateway = Arc::new(ScriptedGateway::new().always(
            Step::Research,
            Err(GatewayError::TransientServerError {
                status: 503,
                message: "service unavailable".into(),
            }),
        ));
        let orch = Arc::new(orchestrator(gateway.clone(), 3));

        let summary = run_batch(
            &prospects(1),
            orch,
            &settings(5, 2),
            Vec::new(),
            &mut NullSink,
            &SilentProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.chunks_total, 1);
        let result = &summary.results[0];
        assert_eq!(result.status, ProcessingStatus::Failure);
        assert_eq!(result.attempts, 4);
        assert!(result.research.is_none());
        assert!(result.email.is_none());
        assert!(result.error_detail.as_deref().unwrap().contains("retries exhausted"));
        assert_eq!(gateway.calls(Step::Research), 4);
        assert_eq!(gateway.calls(Step::EmailGeneration), 0);
    }

    #[tokio::test]
    async fn prior_results_are_not_reprocessed() {
        let gateway = Arc::new(ScriptedGateway::new());
        let orch = Arc::new(orchestrator(gateway.clone(), 0));
        let input = prospects(5);

        let mut earlier = failed_result(1, input[1].clone(), "from an earlier run".into());
        earlier.attempts = 4;
        let prior = vec![
            failed_result(0, input[0].clone(), "from an earlier run".into()),
            earlier,
        ];

        let summary = run_batch(
            &input,
            orch,
            &settings(2, 2),
            prior,
            &mut NullSink,
            &SilentProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.resumed, 2);
        assert_eq!(summary.chunks_processed, 3);
        assert_eq!(summary.results.len(), 5);
        assert_eq!(summary.results[1].attempts, 4);
        assert_eq!(summary.results[0].status, ProcessingStatus::Failure);
        assert!(summary.results[2..].iter().all(|r| r.is_success()));
        assert_eq!(gateway.calls(Step::Research), 3);
    }

    #[tokio::test]
    async fn zero_chunk_size_is_rejected() {
        let gateway = Arc::new(ScriptedGateway::new());
        let err = run_batch(
            &prospects(1),
            Arc::new(orchestrator(gateway, 0)),
            &settings(0, 1),
            Vec::new(),
            &mut NullSink,
            &SilentProgress,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OutreachError::Validation { .. }));
    }

    #[test]
    fn summary_json_has_counts() {
        let summary = BatchSummary {
            outcome: BatchOutcome::Cancelled,
            counts: StatusCounts {
                completed: 2,
                partial_failure: 1,
                failure: 0,
            },
            chunks_total: 2,
            chunks_processed: 1,
            resumed: 0,
            results: Vec::new(),
            elapsed: Duration::from_millis(1500),
        };
        let json: serde_json::Value = serde_json::from_str(&summary.to_json()).unwrap();
        assert_eq!(json["outcome"], "cancelled");
        assert_eq!(json["counts"]["partial_failure"], 1);
        assert_eq!(json["elapsed_ms"], 1500);
    }
}
