//! Paperflow Extract - LLM metadata extraction from converted papers
//!
//! Per paper: markdown → main content (references cut) → chat completion →
//! JSON repair → [`PaperInfo`] → `<info_dir>/<id>.json`.

pub mod chat;
pub mod handler;
pub mod prompt;
pub mod repair;
pub mod schema;
pub mod trim;

pub use chat::{ChatClient, Completion, LlmConfig};
pub use handler::ExtractHandler;
pub use repair::{parse_paper_info, repair_json};
pub use schema::{Hypothesis, PaperInfo};
pub use trim::main_content;
