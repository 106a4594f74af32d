//! End-to-end `run` pipeline: CSV → ledger → batch → reports.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use outreach_artifacts::{ArtifactMeta, OutputPrefixes, RunInfo};
use outreach_gateway::Gateway;
use outreach_shared::{
    OutputConfig, OutreachError, PipelineConfig, ProcessingResult, Result, RunId, SenderProfile,
    input_fingerprint,
};
use outreach_storage::{LEDGER_FILE_NAME, Ledger, NewRun, RunStatus};

use crate::batch::{self, BatchOutcome, BatchSettings, BatchSummary, ProgressReporter};
use crate::input;
use crate::orchestrator::Orchestrator;
use crate::sink::LedgerSink;

/// Configuration for the `run_pipeline` entry point.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Prospect CSV to read.
    pub input_path: PathBuf,
    /// Batch, retry and model settings.
    pub pipeline: PipelineConfig,
    /// Where reports and the ledger go.
    pub output: OutputConfig,
    /// Who the outreach is written for.
    pub sender: SenderProfile,
    /// Continue an interrupted run instead of starting a new one.
    pub resume: Option<RunId>,
}

/// Result of the `run_pipeline` entry point.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: RunId,
    pub summary: BatchSummary,
    /// Reports written for this run, manifest last.
    pub artifacts: Vec<ArtifactMeta>,
    pub ledger_path: PathBuf,
}

/// Location of the run ledger inside an output directory.
pub fn ledger_path(output_dir: &Path) -> PathBuf {
    output_dir.join(LEDGER_FILE_NAME)
}

/// Run the full pipeline.
///
/// 1. Read and validate the prospect CSV
/// 2. Open the ledger and start (or resume) a run
/// 3. Process prospects chunk by chunk, checkpointing each chunk
/// 4. Write reports and record the run's final status
///
/// Reports are written for cancelled runs too, covering the prospects
/// processed so far. An authentication failure marks the run aborted and
/// is returned without writing reports.
#[instrument(skip_all, fields(input = %config.input_path.display()))]
pub async fn run_pipeline(
    config: &RunConfig,
    gateway: Arc<dyn Gateway>,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<RunReport> {
    config.pipeline.validate()?;

    // --- Phase 1: Input ---
    let input = input::read_prospects_csv(&config.input_path)?;
    let prospects = input.prospects;
    let fingerprint = input_fingerprint(&prospects);

    // --- Phase 2: Ledger ---
    let output_dir = PathBuf::from(&config.output.output_dir);
    let ledger_path = ledger_path(&output_dir);
    let ledger = Ledger::open(&ledger_path).await?;

    let (run_id, prior) = match &config.resume {
        Some(id) => {
            let prior = resume_run(&ledger, id, &fingerprint).await?;
            (id.clone(), prior)
        }
        None => {
            let id = RunId::new();
            let input_path = config.input_path.display().to_string();
            ledger
                .insert_run(&NewRun {
                    id: &id,
                    input_path: &input_path,
                    input_fingerprint: &fingerprint,
                    model_id: &config.pipeline.model_id,
                    total: prospects.len(),
                })
                .await?;
            (id, Vec::new())
        }
    };

    info!(
        %run_id,
        prospects = prospects.len(),
        resumed = prior.len(),
        model = %config.pipeline.model_id,
        "starting run"
    );

    // --- Phase 3: Batch ---
    let orchestrator = Arc::new(Orchestrator::new(
        gateway,
        &config.pipeline,
        config.sender.clone(),
    ));
    let settings = BatchSettings::from(&config.pipeline);
    let mut sink = LedgerSink::new(&ledger, &run_id);

    let summary = match batch::run_batch(
        &prospects,
        orchestrator,
        &settings,
        prior,
        &mut sink,
        progress,
        cancel,
    )
    .await
    {
        Ok(summary) => summary,
        Err(e) => {
            error!(%run_id, error = %e, "run aborted");
            let detail = serde_json::json!({ "error": e.to_string() }).to_string();
            if let Err(status_err) = ledger
                .set_run_status(&run_id, RunStatus::Aborted, Some(&detail))
                .await
            {
                warn!(error = %status_err, "failed to record aborted run");
            }
            return Err(e);
        }
    };

    // --- Phase 4: Reports ---
    let stamp = outreach_artifacts::timestamp(Utc::now());
    let run_info = RunInfo {
        run_id: run_id.to_string(),
        model_id: config.pipeline.model_id.clone(),
        total_prospects: prospects.len(),
    };
    let artifacts = outreach_artifacts::write_outputs(
        &output_dir,
        &stamp,
        &OutputPrefixes::from(&config.output),
        &run_info,
        &summary.results,
    )?;

    let status = match summary.outcome {
        BatchOutcome::Completed => RunStatus::Completed,
        BatchOutcome::Cancelled => RunStatus::Cancelled,
    };
    ledger
        .set_run_status(&run_id, status, Some(&summary.to_json()))
        .await?;

    info!(%run_id, %status, artifacts = artifacts.len(), "run finished");

    Ok(RunReport {
        run_id,
        summary,
        artifacts,
        ledger_path,
    })
}

/// Check that `id` can be resumed with this input and load its results.
async fn resume_run(
    ledger: &Ledger,
    id: &RunId,
    fingerprint: &str,
) -> Result<Vec<ProcessingResult>> {
    let run = ledger
        .get_run(id)
        .await?
        .ok_or_else(|| OutreachError::validation(format!("no run with id {id} in the ledger")))?;

    if !run.status.is_resumable() {
        return Err(OutreachError::validation(format!(
            "run {id} is already {}; start a new run instead",
            run.status
        )));
    }
    if run.input_fingerprint != fingerprint {
        return Err(OutreachError::validation(format!(
            "input does not match run {id} (it was started from {})",
            run.input_path
        )));
    }

    ledger.set_run_status(id, RunStatus::Running, None).await?;
    let prior = ledger.load_results(id).await?;
    info!(%id, restored = prior.len(), "resuming run");
    Ok(prior)
}
