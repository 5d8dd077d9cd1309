//! Paperflow MinerU - converter output layout, markdown splitting, PDF conversion
//!
//! The PDF converter writes one directory per paper:
//! `<output>/<paper_id>/txt/<name>.md`. Every later stage reads markdown
//! from that layout.

pub mod convert;
pub mod markdown;
pub mod split;

pub use convert::{ConvertConfig, ConvertHandler};
pub use markdown::{MarkdownExists, load_markdown, markdown_path};
pub use split::{Section, split_sections};
