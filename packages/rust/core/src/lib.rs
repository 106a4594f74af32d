//! Core pipeline orchestration and domain logic for Outreach.
//!
//! This crate ties together prospect input, prompting, the model gateway,
//! response parsing, and report writing into the end-to-end `run` workflow
//! ([`pipeline::run_pipeline`]).

pub mod batch;
pub mod chunker;
pub mod input;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod sink;

pub use batch::{
    BatchOutcome, BatchSettings, BatchSummary, NullSink, ProgressReporter, ResultSink,
    SilentProgress, run_batch,
};
pub use chunker::{Chunk, Chunks, chunk};
pub use input::{
    InputSummary, ProspectInput, SkippedRow, read_prospects_csv, validate_prospects_csv,
};
pub use orchestrator::Orchestrator;
pub use pipeline::{RunConfig, RunReport, ledger_path, run_pipeline};
