// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments.

/// Appended to every advisor system prompt.
pub const GROUNDING_INSTRUCTION: &str = "\
    Only state course codes, prerequisites, term offerings and workloads that appear in the \
    provided context or the student's profile. If the context does not cover a question, say so \
    and point the student to the official undergraduate calendar instead of guessing.";
