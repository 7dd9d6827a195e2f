//! Policy document loading.

use crate::types::Document;
use askpolicy_core::{AppError, AppResult};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Load every policy document directly inside `dir` whose extension is in
/// `extensions`.
///
/// Documents are sorted by `source_id` (the file name) so chunk order, and
/// with it retrieval tie-breaking, does not depend on directory iteration
/// order.
pub fn load_documents(dir: &Path, extensions: &[String]) -> AppResult<Vec<Document>> {
    if !dir.is_dir() {
        return Err(AppError::Config(format!(
            "Policy directory not found: {:?}",
            dir
        )));
    }

    let mut documents = Vec::new();

    for entry in WalkDir::new(dir)
        .max_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !has_extension(path, extensions) {
            continue;
        }

        let Some(source_id) = path.file_name().and_then(|n| n.to_str()) else {
            tracing::warn!("Skipping file with non UTF-8 name: {:?}", path);
            continue;
        };

        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

        tracing::debug!(source = source_id, bytes = content.len(), "Loaded document");
        documents.push(Document::new(content, source_id));
    }

    documents.sort_by(|a, b| a.source_id.cmp(&b.source_id));

    tracing::info!("Loaded {} documents from {:?}", documents.len(), dir);
    Ok(documents)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}
