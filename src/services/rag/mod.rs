//! Semantic (RAG) retrieval: chunking, embedding, vector storage, and
//! the indexing lifecycle.

pub mod chunker;
pub mod embedder;
pub mod index_manager;
pub mod types;
pub mod vector_store;

pub use chunker::{chunker_for, Chunker};
pub use embedder::{Embedder, MockEmbedder, OllamaEmbedder};
pub use index_manager::{collect_code_files, is_code_extension, RagIndexer};
pub use types::{Chunk, FileResult, HybridResult, IndexStats, LineRange, SearchResult};
pub use vector_store::{cosine_similarity, SqliteVectorStore, VectorStore};
