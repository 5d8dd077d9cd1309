//! Paperflow Embed - chunk papers, embed them, store and query a Lance index
//!
//! ```text
//! markdown ─► sections (level-1 headers) ─► chunks ─► /embeddings ─► Lance dataset
//! query ─► /embeddings ─► nearest("vector", k) ─► hits
//! ```

pub mod chunk;
pub mod client;
pub mod handler;
pub mod index;
pub mod schema;

pub use chunk::{Chunk, chunk_id, chunk_paper};
pub use client::{Embedder, EmbeddingClient, EmbeddingConfig};
pub use handler::EmbedHandler;
pub use index::{LanceIndex, SearchHit};
