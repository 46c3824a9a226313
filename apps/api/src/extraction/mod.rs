// CV Extraction: PDF text to a structured CvRecord, plus partial updates.
// All LLM calls go through llm_client::StructuredCompletion; agents never call each other.

pub mod agents;
pub mod cleaning;
pub mod handlers;
pub mod orchestrator;
pub mod prompts;
pub mod update;
