//! Company-data knowledge access.
//!
//! Everything between a JSON record folder and a ranked list of matches:
//! - [`loader`]: flattens JSON record files into [`Record`]s
//! - [`embeddings`]: sentence-embedding providers
//! - [`vector_index`]: the vector index seam, with Pinecone and in-memory backends
//! - [`ingest`]: embeds records and upserts them into an index

pub mod embeddings;
pub mod ingest;
pub mod loader;
pub mod memory_index;
pub mod pinecone;
pub mod types;
pub mod vector_index;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingProvider};
pub use ingest::{ingest, IngestStats};
pub use loader::load_json_records;
pub use memory_index::MemoryIndex;
pub use pinecone::PineconeIndex;
pub use types::{Record, RecordMetadata, ScoredMatch, VectorRecord};
pub use vector_index::{create_index, VectorIndex};
