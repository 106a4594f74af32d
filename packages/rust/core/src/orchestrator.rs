//! Per-prospect pipeline: research call, then email call.
//!
//! Each prospect moves through
//! `Pending → ResearchInFlight → ResearchDone → EmailInFlight → Completed`,
//! or stops at `ResearchFailed` (no email call is made) or `EmailFailed`
//! (research is kept). Only an authentication failure escapes as `Err`;
//! every other failure is recorded on the prospect's result.

use std::sync::Arc;
use std::time::Duration;

use outreach_gateway::{Attempted, Gateway, GatewayRequest, RetryPolicy, Step};
use outreach_parser::{ParsedEmail, ParsedResearch, parse_email, parse_research};
use outreach_shared::{
    GatewayError, OutreachError, PipelineConfig, PipelineFailure, ProcessingResult,
    ProcessingStatus, Prospect, Result, RetryFailure, SenderProfile,
};
use tracing::{debug, instrument, warn};

use crate::prompts::{self, Prompt};

/// Where a prospect is in the pipeline.
#[derive(Debug)]
enum Stage {
    Pending,
    ResearchInFlight,
    ResearchDone(ParsedResearch),
    EmailInFlight(ParsedResearch),
    Completed(ParsedResearch, ParsedEmail),
    ResearchFailed(RetryFailure),
    EmailFailed(ParsedResearch, RetryFailure),
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ResearchInFlight => "research_in_flight",
            Self::ResearchDone(_) => "research_done",
            Self::EmailInFlight(_) => "email_in_flight",
            Self::Completed(..) => "completed",
            Self::ResearchFailed(_) => "research_failed",
            Self::EmailFailed(..) => "email_failed",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed(..) | Self::ResearchFailed(_) | Self::EmailFailed(..)
        )
    }
}

/// Drives single prospects through research and email generation.
pub struct Orchestrator {
    gateway: Arc<dyn Gateway>,
    retry: RetryPolicy,
    model_id: String,
    timeout: Duration,
    sender: SenderProfile,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn Gateway>, config: &PipelineConfig, sender: SenderProfile) -> Self {
        Self {
            gateway,
            retry: RetryPolicy::from_config(config),
            model_id: config.model_id.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            sender,
        }
    }

    /// Replace the retry policy derived from the config.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run one prospect to a terminal state.
    ///
    /// Returns `Err` only for [`GatewayError::AuthError`], which invalidates
    /// every remaining prospect.
    #[instrument(skip_all, fields(position = position, prospect = %prospect.display_name()))]
    pub async fn process(&self, position: usize, prospect: Prospect) -> Result<ProcessingResult> {
        let mut stage = Stage::Pending;
        let mut attempts = 0u32;

        while !stage.is_terminal() {
            stage = match stage {
                Stage::Pending => Stage::ResearchInFlight,

                Stage::ResearchInFlight => {
                    let prompt = prompts::research_prompt(&prospect, &self.sender);
                    match self.call(Step::Research, prompt).await {
                        Ok(done) => {
                            attempts += done.attempts;
                            let parsed = parse_research(&done.value);
                            if parsed.report.is_degraded() {
                                warn!(
                                    matched = parsed.report.matched,
                                    expected = parsed.report.expected,
                                    shape = ?parsed.shape,
                                    "research response only partially matched"
                                );
                            }
                            Stage::ResearchDone(parsed)
                        }
                        Err(failure) => {
                            attempts += failure.attempts;
                            check_auth(&failure)?;
                            Stage::ResearchFailed(failure)
                        }
                    }
                }

                Stage::ResearchDone(research) => Stage::EmailInFlight(research),

                Stage::EmailInFlight(research) => {
                    let prompt = prompts::email_prompt(&prospect, &research.record, &self.sender);
                    match self.call(Step::EmailGeneration, prompt).await {
                        Ok(done) => {
                            attempts += done.attempts;
                            let email = parse_email(&done.value);
                            if !email.subject_found {
                                warn!(
                                    body_source = ?email.body_source,
                                    "email response had no subject, using default"
                                );
                            }
                            let email = email.with_default_subject(&prospect.company_name);
                            Stage::Completed(research, email)
                        }
                        Err(failure) => {
                            attempts += failure.attempts;
                            check_auth(&failure)?;
                            Stage::EmailFailed(research, failure)
                        }
                    }
                }

                terminal => terminal,
            };
            debug!(stage = stage.name(), attempts, "stage transition");
        }

        Ok(finish(position, prospect, stage, attempts))
    }

    async fn call(
        &self,
        step: Step,
        prompt: Prompt,
    ) -> std::result::Result<Attempted<String>, RetryFailure> {
        let request = GatewayRequest::new(step, self.model_id.as_str(), prompt.user, self.timeout)
            .with_system(prompt.system);
        let request = &request;
        let gateway = &self.gateway;

        self.retry
            .execute(move |attempt| async move {
                debug!(step = step.as_str(), attempt, "calling gateway");
                gateway.call(request).await
            })
            .await
    }
}

fn check_auth(failure: &RetryFailure) -> Result<()> {
    match &failure.error {
        GatewayError::AuthError { .. } => Err(OutreachError::Gateway(failure.error.clone())),
        _ => Ok(()),
    }
}

fn finish(position: usize, prospect: Prospect, stage: Stage, attempts: u32) -> ProcessingResult {
    match stage {
        Stage::Completed(research, email) => ProcessingResult {
            position,
            prospect,
            research: Some(research.record),
            email: Some(email.record),
            status: ProcessingStatus::Completed,
            failure: None,
            error_detail: None,
            research_match: Some(research.report),
            email_subject_found: Some(email.subject_found),
            attempts,
        },
        Stage::EmailFailed(research, failure) => ProcessingResult {
            position,
            prospect,
            research: Some(research.record),
            email: None,
            status: ProcessingStatus::PartialFailure,
            failure: Some(PipelineFailure::EmailFailed),
            error_detail: Some(failure.to_string()),
            research_match: Some(research.report),
            email_subject_found: None,
            attempts,
        },
        Stage::ResearchFailed(failure) => {
            let mut result = failed_result(position, prospect, failure.to_string());
            result.attempts = attempts;
            result
        }
        other => failed_result(
            position,
            prospect,
            format!("pipeline stopped in non-terminal stage {}", other.name()),
        ),
    }
}

/// A `Failure` result with no research or email.
pub(crate) fn failed_result(
    position: usize,
    prospect: Prospect,
    detail: String,
) -> ProcessingResult {
    ProcessingResult {
        position,
        prospect,
        research: None,
        email: None,
        status: ProcessingStatus::Failure,
        failure: Some(PipelineFailure::ResearchFailed),
        error_detail: Some(detail),
        research_match: None,
        email_subject_found: None,
        attempts: 0,
    }
}
