use crate::core::{Node, SourceFile};
use anyhow::{Context, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CacheEntry {
    pub hash: String,
    pub nodes: Vec<Node>,
}

/// Per-file parse results keyed by repository-relative path
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ParseCache {
    pub entries: DashMap<String, CacheEntry>,
}

impl ParseCache {
    /// Loads a cache file; a missing or unreadable file yields an empty cache.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable parse cache {:?}: {}", path, e);
                ParseCache::default()
            }),
            Err(_) => ParseCache::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string(&self)?;
        fs::write(path, content).with_context(|| format!("Failed to write cache {:?}", path))?;
        Ok(())
    }

    /// Cached nodes for `path` when the stored hash still matches.
    pub fn get(&self, path: &str, hash: &str) -> Option<Vec<Node>> {
        self.entries
            .get(path)
            .filter(|entry| entry.hash == hash)
            .map(|entry| entry.nodes.clone())
    }

    pub fn update(&self, path: String, entry: CacheEntry) {
        self.entries.insert(path, entry);
    }

    /// Drops entries for files no longer present.
    pub fn retain_paths(&self, live: &std::collections::HashSet<String>) {
        self.entries.retain(|path, _| live.contains(path));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash of a read file under the given scan settings; a file cut at the size cap
    /// also hashes its full size.
    pub fn compute_hash(source: &SourceFile, fingerprint: &str) -> String {
        let mut context = md5::Context::new();
        context.consume(source.content.as_bytes());
        if let Some(size) = source.truncated_from {
            context.consume(size.to_le_bytes());
        }
        context.consume(fingerprint.as_bytes());
        format!("{:x}", context.finalize())
    }
}
