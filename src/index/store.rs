//! SQLite + sqlite-vec artifact for [`VectorIndex`].
use std::fs;
use std::path::Path;
use std::sync::Once;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, params};
use sqlite_vec::sqlite3_vec_init;
use tracing::{info, warn};

use super::VectorIndex;
use super::models::Chunk;
use crate::error::{RagError, Result};

fn schema_sql(dimensions: usize) -> String {
    format!(
        r#"
CREATE TABLE index_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    embedding_model TEXT NOT NULL,
    dimensions INTEGER NOT NULL,
    chunk_count INTEGER NOT NULL,
    built_at DATETIME NOT NULL
);

CREATE TABLE chunks (
    id INTEGER PRIMARY KEY,
    position INTEGER NOT NULL UNIQUE,
    provenance TEXT NOT NULL,
    content TEXT NOT NULL
);

CREATE INDEX idx_provenance ON chunks(provenance);

CREATE VIRTUAL TABLE vec_chunks USING vec0(
    embedding FLOAT[{dimensions}]
);
"#
    )
}

static INIT_VEC: Once = Once::new();

/// Initialize the sqlite-vec extension. Safe to call multiple times.
fn init_sqlite_vec() {
    INIT_VEC.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Helper to serialize a float32 vector into bytes for the vec0 virtual table.
pub fn serialize_vector(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Inverse of [`serialize_vector`]; `None` if the blob has the wrong length.
fn deserialize_vector(blob: &[u8], dimensions: usize) -> Option<Vec<f32>> {
    if blob.len() != dimensions * 4 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}

fn persistence(e: impl std::fmt::Display) -> RagError {
    RagError::Persistence(e.to_string())
}

fn corrupt(e: impl std::fmt::Display) -> RagError {
    RagError::CorruptArtifact(e.to_string())
}

/// Write `index` to a temporary file next to `path`, then rename it into place.
///
/// On any failure the previous artifact at `path` is left untouched.
pub fn write(index: &VectorIndex, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(persistence)?;

    let tmp = tempfile::Builder::new()
        .prefix(".vector_index")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(persistence)?;

    init_sqlite_vec();
    let mut conn = Connection::open(tmp.path()).map_err(persistence)?;
    conn.execute_batch(&schema_sql(index.dimensions()))
        .map_err(persistence)?;

    let tx = conn.transaction().map_err(persistence)?;
    tx.execute(
        "INSERT INTO index_meta (id, embedding_model, dimensions, chunk_count, built_at) VALUES (1, ?, ?, ?, ?)",
        params![
            index.model_name(),
            index.dimensions() as i64,
            index.len() as i64,
            index.built_at(),
        ],
    )
    .map_err(persistence)?;

    for (position, (chunk, vector)) in index.chunks().iter().zip(index.vectors()).enumerate() {
        let chunk_id = position as i64 + 1;
        tx.execute(
            "INSERT INTO chunks (id, position, provenance, content) VALUES (?, ?, ?, ?)",
            params![chunk_id, position as i64, chunk.provenance, chunk.text],
        )
        .map_err(persistence)?;
        tx.execute(
            "INSERT INTO vec_chunks (rowid, embedding) VALUES (?, ?)",
            params![chunk_id, serialize_vector(vector)],
        )
        .map_err(persistence)?;
    }
    tx.commit().map_err(persistence)?;
    conn.close().map_err(|(_, e)| persistence(e))?;

    // tempfile creates 0600; the artifact is read by whichever user serves it.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o644)).map_err(persistence)?;
    }

    tmp.persist(path).map_err(|e| persistence(e.error))?;

    info!(path = %path.display(), chunks = index.len(), "vector index persisted");
    Ok(())
}

/// Read an artifact written by [`write`].
pub fn read(path: &Path) -> Result<VectorIndex> {
    if !path.is_file() {
        return Err(RagError::NotFound(format!(
            "index artifact {} does not exist",
            path.display()
        )));
    }

    init_sqlite_vec();
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(corrupt)?;

    let (model, dimensions, chunk_count, built_at): (String, i64, i64, DateTime<Utc>) = conn
        .query_row(
            "SELECT embedding_model, dimensions, chunk_count, built_at FROM index_meta WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .map_err(corrupt)?;

    let dimensions = usize::try_from(dimensions)
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| corrupt(format!("invalid dimensions {dimensions}")))?;

    let mut stmt = conn
        .prepare(
            r#"
            SELECT c.provenance, c.content, v.embedding
            FROM chunks c
            JOIN vec_chunks v ON v.rowid = c.id
            ORDER BY c.position ASC
            "#,
        )
        .map_err(corrupt)?;

    let rows = stmt
        .query_map([], |row| {
            let provenance: String = row.get(0)?;
            let content: String = row.get(1)?;
            let blob: Vec<u8> = row.get(2)?;
            Ok((provenance, content, blob))
        })
        .map_err(corrupt)?;

    let mut chunks = Vec::new();
    let mut vectors = Vec::new();
    for row in rows {
        let (provenance, text, blob) = row.map_err(corrupt)?;
        let vector = deserialize_vector(&blob, dimensions).ok_or_else(|| {
            corrupt(format!(
                "vector blob of {} bytes does not match {dimensions} dimensions",
                blob.len()
            ))
        })?;
        chunks.push(Chunk { text, provenance });
        vectors.push(vector);
    }

    if chunks.len() as i64 != chunk_count {
        return Err(corrupt(format!(
            "artifact declares {chunk_count} chunks but holds {}",
            chunks.len()
        )));
    }
    if chunks.is_empty() {
        return Err(corrupt("artifact holds no chunks"));
    }

    let index = VectorIndex::from_parts(model, dimensions, built_at, chunks, vectors)?;
    info!(
        path = %path.display(),
        chunks = index.len(),
        model = %index.model_name(),
        built_at = %index.built_at(),
        "vector index restored"
    );
    Ok(index)
}

/// Warn when the artifact was embedded with a different model than configured.
pub fn warn_on_model_mismatch(index: &VectorIndex, configured_model: &str) {
    if index.model_name() != configured_model {
        warn!(
            artifact_model = %index.model_name(),
            configured_model,
            "index artifact was built with a different embedding model"
        );
    }
}
