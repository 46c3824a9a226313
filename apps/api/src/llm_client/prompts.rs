// Shared prompt fragments.
// Each module that needs LLM calls defines its own prompts.rs alongside it.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, ATS-grade CV parser. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Extraction-only contract appended to every field agent prompt.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    CRITICAL: Extract only what is explicitly present in the CV text. \
    Do NOT invent, infer, or complete missing information. \
    When a value is not present, use null for single values and [] for lists.";
