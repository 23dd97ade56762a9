pub mod context;
pub mod handlers;
pub mod memory;
pub mod prompts;
pub mod triggers;
