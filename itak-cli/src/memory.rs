//! A `MEMORY.md`-backed `MemoryPort` implementation.
//!
//! Grounded on `clawft-tools::memory_tool`'s paragraph-level substring
//! search over a single markdown file; the vector-similarity variant
//! gated behind that crate's `vector-memory` feature is out of scope here
//! (no embedder/vector store is part of this workspace).

use async_trait::async_trait;
use itak_core::ports::{MemoryHealth, MemoryHit, MemoryPort};
use itak_types::Result;
use std::path::PathBuf;
use tokio::sync::Mutex;

pub struct FileMemory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileMemory {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }

    fn read(&self) -> String {
        std::fs::read_to_string(&self.path).unwrap_or_default()
    }

    /// Case-insensitive paragraph search, paragraphs split on blank lines.
    fn search_paragraphs(content: &str, query: &str) -> Vec<String> {
        let needle = query.to_lowercase();
        content
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .filter(|p| p.to_lowercase().contains(&needle))
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl MemoryPort for FileMemory {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MemoryHit>> {
        let _guard = self.lock.lock().await;
        let content = self.read();
        Ok(Self::search_paragraphs(&content, query)
            .into_iter()
            .take(limit)
            .map(|content| MemoryHit { content, score: 1.0 })
            .collect())
    }

    async fn save(&self, category: &str, content: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut existing = self.read();
        if !existing.is_empty() && !existing.ends_with('\n') {
            existing.push('\n');
        }
        existing.push_str(&format!("\n## {category}\n\n{content}\n"));
        std::fs::write(&self.path, existing)?;
        Ok(())
    }

    async fn delete(&self, content: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let existing = self.read();
        let filtered: Vec<&str> = existing.split("\n\n").filter(|p| !p.contains(content)).collect();
        std::fs::write(&self.path, filtered.join("\n\n"))?;
        Ok(())
    }

    async fn health(&self) -> MemoryHealth {
        match self.path.parent() {
            Some(parent) if parent.exists() || parent.as_os_str().is_empty() => {
                MemoryHealth { healthy: true, detail: "file memory ready".to_string() }
            }
            Some(parent) => MemoryHealth {
                healthy: false,
                detail: format!("memory directory {} does not exist", parent.display()),
            },
            None => MemoryHealth { healthy: true, detail: "file memory ready".to_string() },
        }
    }

    async fn reconnect(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("itak-cli-memory-test-{label}-{}.md", std::process::id()))
    }

    #[tokio::test]
    async fn save_then_search_finds_paragraph() {
        let path = temp_path("roundtrip");
        let memory = FileMemory::new(path.clone());
        memory.save("notes", "remember the deploy window is Friday").await.unwrap();

        let hits = memory.search("deploy window", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("Friday"));

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn search_on_missing_file_returns_empty() {
        let path = temp_path("missing");
        let memory = FileMemory::new(path);
        let hits = memory.search("anything", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_matching_paragraph() {
        let path = temp_path("delete");
        let memory = FileMemory::new(path.clone());
        memory.save("notes", "paragraph one").await.unwrap();
        memory.save("notes", "paragraph two").await.unwrap();

        memory.delete("paragraph one").await.unwrap();
        let hits = memory.search("paragraph", 10).await.unwrap();
        assert!(hits.iter().all(|h| !h.content.contains("paragraph one")));

        std::fs::remove_file(&path).ok();
    }
}
