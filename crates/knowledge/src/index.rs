//! Passage Index: embedded chunks with top-k similarity search.
//!
//! An index is immutable once built. Rebuilding produces a new instance that
//! callers publish through [`IndexHandle`], so in-flight queries keep the
//! instance they started with.
//!
//! Persisted form is a standalone SQLite file:
//! - `meta(key, value)`: format version, dimensions, model, fingerprint, entry count
//! - `entries(ordinal, source_id, position, content, embedding)`, with the
//!   embedding stored as little-endian `f32` bytes

use crate::embeddings::Embedder;
use crate::similarity::cosine_similarity;
use crate::types::Chunk;
use askpolicy_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Version of the persisted layout.
pub const INDEX_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone)]
struct IndexedEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Summary of a persisted index, read without loading vectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStatus {
    pub path: PathBuf,
    pub entries: usize,
    pub dimensions: usize,
    pub model: String,
    pub fingerprint: String,
}

pub struct PassageIndex {
    entries: Vec<IndexedEntry>,
    embedder: Arc<Embedder>,
    fingerprint: String,
}

impl PassageIndex {
    /// Embed every chunk once and build an index over them.
    ///
    /// # Errors
    /// [`AppError::EmptyCorpus`] when `chunks` is empty.
    pub async fn build(chunks: Vec<Chunk>, embedder: Arc<Embedder>) -> AppResult<Self> {
        if chunks.is_empty() {
            return Err(AppError::EmptyCorpus);
        }

        tracing::info!(
            chunks = chunks.len(),
            model = %embedder.model_id(),
            "Building passage index"
        );

        let fingerprint = corpus_fingerprint(&chunks);
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedEntry { chunk, vector })
            .collect();

        Ok(Self {
            entries,
            embedder,
            fingerprint,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// Fingerprint of the chunks this index was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Chunks in insertion order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|entry| &entry.chunk)
    }

    /// Return the `k` chunks most similar to `text`, best first.
    pub async fn query(&self, text: &str, k: usize) -> AppResult<Vec<Chunk>> {
        Ok(self
            .query_scored(text, k)
            .await?
            .into_iter()
            .map(|(chunk, _)| chunk)
            .collect())
    }

    /// Like [`query`](Self::query) but keeps the similarity scores.
    pub async fn query_scored(&self, text: &str, k: usize) -> AppResult<Vec<(Chunk, f32)>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(text).await?;
        let results = self.rank(&query_vector, k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{}), scores: {:?}",
            results.len(),
            k,
            results.iter().map(|(_, s)| *s).collect::<Vec<_>>()
        );

        Ok(results)
    }

    fn rank(&self, query_vector: &[f32], k: usize) -> Vec<(Chunk, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(query_vector, &entry.vector)))
            .collect();

        // Stable: equal scores keep insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| (self.entries[i].chunk.clone(), score))
            .collect()
    }

    /// Write the index to `path`, replacing any existing file atomically.
    pub fn persist(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = temp_path(path);
        if tmp_path.exists() {
            std::fs::remove_file(&tmp_path)?;
        }

        self.write_sqlite(&tmp_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to persist index: {}", e)))?;
        std::fs::rename(&tmp_path, path)?;

        tracing::info!(entries = self.len(), "Persisted passage index to {:?}", path);
        Ok(())
    }

    fn write_sqlite(&self, path: &Path) -> rusqlite::Result<()> {
        let mut conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE entries (
                ordinal INTEGER PRIMARY KEY,
                source_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL
            );
            "#,
        )?;

        let tx = conn.transaction()?;
        {
            let mut meta = tx.prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")?;
            meta.execute(params!["format_version", INDEX_FORMAT_VERSION.to_string()])?;
            meta.execute(params!["dimensions", self.dimensions().to_string()])?;
            meta.execute(params!["model", self.embedder.model_id()])?;
            meta.execute(params!["fingerprint", self.fingerprint])?;
            meta.execute(params!["entry_count", self.len().to_string()])?;

            let mut insert = tx.prepare(
                "INSERT INTO entries (ordinal, source_id, position, content, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (ordinal, entry) in self.entries.iter().enumerate() {
                insert.execute(params![
                    ordinal as i64,
                    entry.chunk.source_id,
                    entry.chunk.position as i64,
                    entry.chunk.content,
                    embedding_to_bytes(&entry.vector),
                ])?;
            }
        }
        tx.commit()
    }

    /// Load an index written by [`persist`](Self::persist).
    ///
    /// # Errors
    /// [`AppError::CorruptIndex`] when the file is unreadable, malformed,
    /// from another format version, or was built by a different model or
    /// dimension than `embedder`.
    pub fn restore(path: &Path, embedder: Arc<Embedder>) -> AppResult<Self> {
        if !path.is_file() {
            return Err(AppError::CorruptIndex(format!("no index file at {:?}", path)));
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(corrupt)?;
        let meta = read_meta(&conn)?;

        if meta.format_version != INDEX_FORMAT_VERSION {
            return Err(AppError::CorruptIndex(format!(
                "unsupported format version {}",
                meta.format_version
            )));
        }
        if meta.dimensions != embedder.dimensions() {
            return Err(AppError::CorruptIndex(format!(
                "index has {} dimensions, embedder produces {}",
                meta.dimensions,
                embedder.dimensions()
            )));
        }
        if meta.model != embedder.model_id() {
            return Err(AppError::CorruptIndex(format!(
                "index was built with '{}', embedder is '{}'",
                meta.model,
                embedder.model_id()
            )));
        }

        let entries = read_entries(&conn, meta.dimensions)?;
        if entries.len() != meta.entry_count {
            return Err(AppError::CorruptIndex(format!(
                "expected {} entries, found {}",
                meta.entry_count,
                entries.len()
            )));
        }

        tracing::info!(entries = entries.len(), "Restored passage index from {:?}", path);

        Ok(Self {
            entries,
            embedder,
            fingerprint: meta.fingerprint,
        })
    }

    /// Read the summary of a persisted index.
    pub fn status(path: &Path) -> AppResult<IndexStatus> {
        if !path.is_file() {
            return Err(AppError::CorruptIndex(format!("no index file at {:?}", path)));
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(corrupt)?;
        let meta = read_meta(&conn)?;

        Ok(IndexStatus {
            path: path.to_path_buf(),
            entries: meta.entry_count,
            dimensions: meta.dimensions,
            model: meta.model,
            fingerprint: meta.fingerprint,
        })
    }
}

impl std::fmt::Debug for PassageIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassageIndex")
            .field("entries", &self.entries.len())
            .field("embedder", &self.embedder)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// Restore the index at `path` if it matches `chunks`, otherwise build and
/// persist a fresh one.
///
/// Returns `None` for an empty corpus; the pipeline treats that as an index
/// with no passages.
pub async fn load_or_build(
    path: &Path,
    chunks: Vec<Chunk>,
    embedder: Arc<Embedder>,
) -> AppResult<Option<PassageIndex>> {
    if chunks.is_empty() {
        tracing::warn!("Corpus has no chunks; answering without an index");
        return Ok(None);
    }

    if path.exists() {
        let expected = corpus_fingerprint(&chunks);
        match PassageIndex::restore(path, embedder.clone()) {
            Ok(index) if index.fingerprint() == expected => return Ok(Some(index)),
            Ok(_) => tracing::info!("Corpus changed since the index was built; rebuilding"),
            Err(AppError::CorruptIndex(reason)) => {
                tracing::warn!("Persisted index unusable ({}); rebuilding", reason)
            }
            Err(e) => return Err(e),
        }
    }

    rebuild(path, chunks, embedder).await.map(Some)
}

/// Build from `chunks` and persist to `path` unconditionally.
pub async fn rebuild(path: &Path, chunks: Vec<Chunk>, embedder: Arc<Embedder>) -> AppResult<PassageIndex> {
    let index = PassageIndex::build(chunks, embedder).await?;
    index.persist(path)?;
    Ok(index)
}

/// Atomically swappable reference to the active index.
#[derive(Debug, Default)]
pub struct IndexHandle {
    active: RwLock<Option<Arc<PassageIndex>>>,
}

impl IndexHandle {
    pub fn new(index: Option<PassageIndex>) -> Self {
        Self {
            active: RwLock::new(index.map(Arc::new)),
        }
    }

    /// The index queries should use right now.
    pub fn current(&self) -> Option<Arc<PassageIndex>> {
        self.active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Publish a new index, returning the previous one.
    pub fn swap(&self, index: Option<PassageIndex>) -> Option<Arc<PassageIndex>> {
        let mut active = self
            .active
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *active, index.map(Arc::new))
    }

    /// Query the active index; no index yields no chunks.
    pub async fn query(&self, text: &str, k: usize) -> AppResult<Vec<Chunk>> {
        match self.current() {
            Some(index) => index.query(text, k).await,
            None => Ok(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.current().map_or(0, |index| index.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// SHA-256 over each chunk's source id, position and content.
pub fn corpus_fingerprint(chunks: &[Chunk]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk.source_id.as_bytes());
        hasher.update([0u8]);
        hasher.update((chunk.position as u64).to_le_bytes());
        hasher.update(chunk.content.as_bytes());
        hasher.update([0u8]);
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

struct IndexMeta {
    format_version: u32,
    dimensions: usize,
    model: String,
    fingerprint: String,
    entry_count: usize,
}

fn corrupt(e: rusqlite::Error) -> AppError {
    AppError::CorruptIndex(e.to_string())
}

fn read_meta(conn: &Connection) -> AppResult<IndexMeta> {
    let get = |key: &str| -> AppResult<String> {
        conn.query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(corrupt)?
            .ok_or_else(|| AppError::CorruptIndex(format!("missing meta key '{}'", key)))
    };

    Ok(IndexMeta {
        format_version: parse_meta("format_version", &get("format_version")?)?,
        dimensions: parse_meta("dimensions", &get("dimensions")?)?,
        model: get("model")?,
        fingerprint: get("fingerprint")?,
        entry_count: parse_meta("entry_count", &get("entry_count")?)?,
    })
}

fn parse_meta<T: std::str::FromStr>(key: &str, value: &str) -> AppResult<T> {
    value.parse().map_err(|_| {
        AppError::CorruptIndex(format!("meta key '{}' is not a valid number: {}", key, value))
    })
}

fn read_entries(conn: &Connection, dimensions: usize) -> AppResult<Vec<IndexedEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT source_id, position, content, embedding FROM entries ORDER BY ordinal",
        )
        .map_err(corrupt)?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })
        .map_err(corrupt)?;

    let mut entries = Vec::new();
    for row in rows {
        let (source_id, position, content, bytes) = row.map_err(corrupt)?;
        let vector = bytes_to_embedding(&bytes)?;
        if vector.len() != dimensions {
            return Err(AppError::CorruptIndex(format!(
                "entry has {} dimensions, expected {}",
                vector.len(),
                dimensions
            )));
        }
        let position = usize::try_from(position)
            .map_err(|_| AppError::CorruptIndex(format!("negative position {}", position)))?;

        entries.push(IndexedEntry {
            chunk: Chunk::new(content, source_id, position),
            vector,
        });
    }

    Ok(entries)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::CorruptIndex(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
