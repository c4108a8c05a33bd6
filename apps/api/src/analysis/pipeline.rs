//! Analysis Orchestrator — one resume-vs-job analysis per request.
//!
//! Flow: extract resume text → resolve model id → build prompt → invoke the
//! model → parse the reply → assemble the response. Stages run strictly in
//! sequence and exactly once; the only retry in the whole pipeline is the
//! LLM client's single transient-transport retry.

use bytes::Bytes;
use tracing::{debug, info};

use crate::analysis::parser::parse_report;
use crate::analysis::prompts::{build_analysis_prompt, ANALYSIS_SYSTEM};
use crate::analysis::report::AnalysisResponse;
use crate::errors::AppError;
use crate::extract::{extract_text, normalize_raw_text};
use crate::state::AppState;

/// Pipeline stage, logged on every transition.
#[derive(Debug, Clone, Copy)]
pub enum Stage {
    Received,
    Extracting,
    Prompting,
    Invoking,
    Parsing,
    Completed,
    Failed,
}

fn enter(stage: Stage) {
    debug!("analysis stage: {stage:?}");
}

/// The resume as the caller supplied it. A document takes precedence over
/// raw text when a request somehow carries both representations.
#[derive(Debug)]
pub enum ResumeSource {
    Text(String),
    Document {
        bytes: Bytes,
        filename: Option<String>,
    },
}

/// One analysis request, already validated by the handlers.
#[derive(Debug)]
pub struct AnalysisInput {
    pub resume: ResumeSource,
    pub job_posting: String,
    pub model_id: Option<String>,
}

/// Runs the full analysis pipeline for one request.
pub async fn run_analysis(
    state: &AppState,
    input: AnalysisInput,
) -> Result<AnalysisResponse, AppError> {
    enter(Stage::Received);
    match run_stages(state, input).await {
        Ok(response) => {
            enter(Stage::Completed);
            Ok(response)
        }
        Err(err) => {
            enter(Stage::Failed);
            Err(err)
        }
    }
}

async fn run_stages(state: &AppState, input: AnalysisInput) -> Result<AnalysisResponse, AppError> {
    // Stage 1: resume text
    enter(Stage::Extracting);
    let resume_text = match input.resume {
        ResumeSource::Text(text) => normalize_raw_text(&text)
            .map_err(|_| AppError::Validation("resume_text cannot be empty".to_string()))?,
        ResumeSource::Document { bytes, filename } => {
            let max_bytes = state.config.max_upload_bytes;
            // pdf/docx decoding is CPU-bound; keep it off the async workers
            tokio::task::spawn_blocking(move || {
                extract_text(&bytes, filename.as_deref(), max_bytes)
            })
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("extraction task failed: {e}")))??
        }
    };
    info!("Resume text ready ({} chars)", resume_text.len());

    // Stage 2: model resolution — request, then catalog free tier, then config
    let model_id = match requested_model(input.model_id) {
        Some(id) => id,
        None => state
            .catalog
            .default_model()
            .await
            .unwrap_or_else(|| state.config.default_model.clone()),
    };

    // Stage 3: prompt
    enter(Stage::Prompting);
    let prompt = build_analysis_prompt(&resume_text, &input.job_posting);

    // Stage 4: invoke
    enter(Stage::Invoking);
    info!("Invoking model {model_id}");
    let reply = state.llm.call(&model_id, ANALYSIS_SYSTEM, &prompt).await?;

    // Stage 5: parse
    enter(Stage::Parsing);
    let report = parse_report(&reply.text)?;
    info!(
        "Analysis completed (overall relevancy {})",
        report.relevancy_score.overall.value()
    );

    Ok(AnalysisResponse {
        report,
        model_used: reply.model.unwrap_or(model_id),
        raw_model_text: reply.text,
    })
}

/// A requested model id counts only when it is non-blank.
fn requested_model(model_id: Option<String>) -> Option<String> {
    model_id.filter(|id| !id.trim().is_empty())
}
