//! End-to-end analyze pipeline: intake form + attachments → prompt → model → sections.

use std::time::{Duration, Instant};

use tracing::{info, instrument};

use underwriter_gateway::ModelGateway;
use underwriter_intake::compose;
use underwriter_shared::{AnalysisReport, Attachment, IntakeForm, Result, UnderwriterError};

/// Progress callback for analyze runs.
pub trait AnalysisProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the report is ready.
    fn done(&self, report: &AnalysisReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl AnalysisProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _report: &AnalysisReport) {}
}

/// Compose the prompt and send it through the gateway.
///
/// Returns the raw answer text, which may be empty. This is the exchange the
/// HTTP endpoint exposes; it does not validate the form.
#[instrument(skip_all, fields(attachments = attachments.len()))]
pub async fn request_analysis(
    gateway: &ModelGateway,
    form: &IntakeForm,
    attachments: &[Attachment],
) -> Result<String> {
    let prompt = compose(form, attachments);
    info!(
        narrative_len = prompt.narrative.len(),
        images = prompt.image_count(),
        "prompt composed"
    );
    gateway.complete(&prompt.parts).await
}

/// Run one full analyze invocation.
///
/// 1. Validate the intake form
/// 2. Compose and send the prompt
/// 3. Reject an empty answer
/// 4. Segment the answer into sections
#[instrument(skip_all, fields(model = %gateway.model()))]
pub async fn analyze(
    gateway: &ModelGateway,
    form: &IntakeForm,
    attachments: &[Attachment],
    progress: &dyn AnalysisProgress,
) -> Result<AnalysisReport> {
    form.validate()?;

    progress.phase("Analyzing case");
    let start = Instant::now();
    let answer = request_analysis(gateway, form, attachments).await?;

    progress.phase("Segmenting response");
    let report = build_report(answer, gateway.model(), attachments.len(), start.elapsed())?;

    progress.done(&report);
    Ok(report)
}

/// Turn a raw answer into a report.
///
/// Blank answers are an [`UnderwriterError::EmptyResult`]; segmentation only
/// runs on real text.
pub fn build_report(
    answer: String,
    model: &str,
    attachment_count: usize,
    elapsed: Duration,
) -> Result<AnalysisReport> {
    if answer.trim().is_empty() {
        return Err(UnderwriterError::EmptyResult);
    }

    let sections = underwriter_segment::segment(&answer);
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    info!(sections = sections.len(), elapsed_ms, "analysis complete");

    Ok(AnalysisReport {
        sections,
        raw_text: answer,
        model: model.to_string(),
        attachment_count,
        elapsed_ms,
        generated_at: chrono::Utc::now(),
    })
}
