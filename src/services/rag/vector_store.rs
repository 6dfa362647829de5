//! SQLite Vector Store
//!
//! Persistent storage for `(chunk, vector)` pairs with brute-force
//! cosine search. Vectors are packed little-endian IEEE-754 f32 blobs.
//! Uses rusqlite with r2d2 connection pooling; writers are serialized
//! by an exclusive lock while readers run concurrently.

use std::path::Path;
use std::sync::RwLock;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::utils::error::{AppError, AppResult};

use super::types::{Chunk, SearchResult};

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Stores and searches embeddings.
pub trait VectorStore: Send + Sync {
    fn insert(&self, chunk: &Chunk, embedding: &[f32]) -> AppResult<()>;
    fn insert_batch(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> AppResult<()>;
    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<SearchResult>>;
    /// Remove all chunks belonging to a file; returns the number removed.
    fn delete(&self, file_path: &str) -> AppResult<usize>;
    fn clear(&self) -> AppResult<()>;
    fn count(&self) -> AppResult<usize>;
}

/// Vector store persisted in a SQLite database file.
pub struct SqliteVectorStore {
    pool: DbPool,
    dims: usize,
    /// Writers take the write half; `search`/`count` take the read half.
    lock: RwLock<()>,
}

impl SqliteVectorStore {
    /// Open (or create) the store at `db_path` with a fixed dimension.
    pub fn new(db_path: &Path, dims: usize) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| AppError::internal(format!("failed to create connection pool: {}", e)))?;

        let store = Self {
            pool,
            dims,
            lock: RwLock::new(()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store for tests. A single pooled connection keeps every
    /// caller on the same database.
    pub fn new_in_memory(dims: usize) -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::internal(format!("failed to create connection pool: {}", e)))?;

        let store = Self {
            pool,
            dims,
            lock: RwLock::new(()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Configured embedding dimension.
    pub fn dimension(&self) -> usize {
        self.dims
    }

    fn init_schema(&self) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunks (
              id TEXT PRIMARY KEY,
              file_path TEXT NOT NULL,
              start_line INTEGER,
              end_line INTEGER,
              chunk_type TEXT,
              symbol_name TEXT,
              language TEXT,
              content TEXT,
              token_count INTEGER,
              hash TEXT,
              embedding BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_file ON chunks(file_path);",
        )?;
        Ok(())
    }

    fn get_connection(
        &self,
    ) -> AppResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| AppError::internal(format!("failed to get connection: {}", e)))
    }
}

impl VectorStore for SqliteVectorStore {
    fn insert(&self, chunk: &Chunk, embedding: &[f32]) -> AppResult<()> {
        self.insert_batch(std::slice::from_ref(chunk), &[embedding.to_vec()])
    }

    fn insert_batch(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> AppResult<()> {
        if chunks.len() != embeddings.len() {
            return Err(AppError::validation(format!(
                "chunks and embeddings length mismatch: {} vs {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let _write = self.lock.write().expect("vector store lock poisoned");
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO chunks
                   (id, file_path, start_line, end_line, chunk_type, symbol_name,
                    language, content, token_count, hash, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;

            for (chunk, embedding) in chunks.iter().zip(embeddings) {
                if embedding.len() != self.dims {
                    return Err(AppError::validation(format!(
                        "embedding dims mismatch: expected {} got {}",
                        self.dims,
                        embedding.len()
                    )));
                }
                stmt.execute(params![
                    chunk.id,
                    chunk.file_path,
                    chunk.start_line as i64,
                    chunk.end_line as i64,
                    chunk.chunk_type,
                    chunk.symbol_name,
                    chunk.language,
                    chunk.content,
                    chunk.token_count as i64,
                    chunk.hash,
                    encode_embedding(embedding),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<SearchResult>> {
        let _read = self.lock.read().expect("vector store lock poisoned");
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(
            "SELECT id, file_path, start_line, end_line, chunk_type, symbol_name,
                    language, content, token_count, hash, embedding
             FROM chunks",
        )?;

        let rows = stmt.query_map([], |row| {
            let blob: Vec<u8> = row.get(10)?;
            Ok((
                Chunk {
                    id: row.get(0)?,
                    file_path: row.get(1)?,
                    start_line: row.get::<_, i64>(2)? as usize,
                    end_line: row.get::<_, i64>(3)? as usize,
                    chunk_type: row.get(4)?,
                    symbol_name: row.get(5)?,
                    language: row.get(6)?,
                    content: row.get(7)?,
                    token_count: row.get::<_, i64>(8)? as usize,
                    hash: row.get(9)?,
                },
                blob,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (chunk, blob) = row?;
            let vector = decode_embedding(&blob, self.dims)?;
            let score = cosine_similarity(query_embedding, &vector);
            results.push(SearchResult {
                chunk,
                score,
                source: "rag".to_string(),
            });
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }

    fn delete(&self, file_path: &str) -> AppResult<usize> {
        let _write = self.lock.write().expect("vector store lock poisoned");
        let conn = self.get_connection()?;
        let deleted = conn.execute("DELETE FROM chunks WHERE file_path = ?1", params![file_path])?;
        Ok(deleted)
    }

    fn clear(&self) -> AppResult<()> {
        let _write = self.lock.write().expect("vector store lock poisoned");
        let conn = self.get_connection()?;
        conn.execute("DELETE FROM chunks", [])?;
        Ok(())
    }

    fn count(&self) -> AppResult<usize> {
        let _read = self.lock.read().expect("vector store lock poisoned");
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Pack a vector as little-endian IEEE-754 f32 bytes.
pub fn encode_embedding(vec: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

/// Unpack little-endian f32 bytes; the byte length must match `dims * 4`.
pub fn decode_embedding(data: &[u8], dims: usize) -> AppResult<Vec<f32>> {
    if data.len() != dims * 4 {
        return Err(AppError::validation(format!(
            "embedding length mismatch: want {} bytes got {}",
            dims * 4,
            data.len()
        )));
    }
    Ok(data
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine similarity; 0.0 on length mismatch or zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
