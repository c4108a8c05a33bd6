// Resume-vs-job analysis pipeline.
// Implements: prompt construction, model invocation, tolerant reply parsing,
// and the per-request orchestration. All LLM calls go through llm_client —
// no direct provider calls here.

pub mod handlers;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod report;
