// Skill/role reference store, exact role matching and bounded skill selection.
// Pure and synchronous; the orchestrator calls it after the field agents finish.

pub mod matcher;
pub mod reference;
pub mod selector;
