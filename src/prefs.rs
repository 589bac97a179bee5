//! Persistent user state: category selections and the saved-papers list.
//!
//! Both stores load once at construction and rewrite their JSON file on every
//! mutation, so process restarts always see the latest state. A missing or
//! corrupt file starts the store empty rather than failing.

use crate::error::StoreError;
use crate::paper::Paper;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Per-field limit on selected subcategories
pub const MAX_PER_FIELD: usize = 3;

/// Default selections file path: `~/.rustarxiv_selections.json`
fn default_selections_path() -> Result<PathBuf, StoreError> {
    dirs::home_dir()
        .map(|home| home.join(".rustarxiv_selections.json"))
        .ok_or(StoreError::NoHomeDir)
}

/// Default saved-papers file path: `~/.rustarxiv_saved.json`
fn default_saved_path() -> Result<PathBuf, StoreError> {
    dirs::home_dir()
        .map(|home| home.join(".rustarxiv_saved.json"))
        .ok_or(StoreError::NoHomeDir)
}

/// Load a JSON store file, tolerating absence and corruption.
fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        debug!("Store file not found: {:?}", path);
        return T::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(err) => {
                warn!("Failed to parse store file {:?}: {}", path, err);
                T::default()
            }
        },
        Err(err) => {
            warn!("Failed to read store file {:?}: {}", path, err);
            T::default()
        }
    }
}

fn save_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Bounded per-field category selections.
///
/// Maps a field id (e.g. `cs`) to at most [`MAX_PER_FIELD`] subcategory ids
/// within that field. The flattened selection is the input the load pipeline
/// consumes.
pub struct CategorySelections {
    path: PathBuf,
    selections: BTreeMap<String, BTreeSet<String>>,
}

impl CategorySelections {
    /// Open the store at its default location, loading any persisted state.
    pub fn new() -> Result<Self, StoreError> {
        Ok(Self::with_path(default_selections_path()?))
    }

    /// Open the store at a custom path (tests).
    pub fn with_path(path: PathBuf) -> Self {
        let selections = load_or_default(&path);
        Self { path, selections }
    }

    /// Subcategories currently selected within one field.
    pub fn selected_in(&self, field: &str) -> BTreeSet<String> {
        self.selections.get(field).cloned().unwrap_or_default()
    }

    /// All selected subcategories across fields, flattened in stable order.
    pub fn all_selected(&self) -> Vec<String> {
        self.selections
            .values()
            .flat_map(|set| set.iter().cloned())
            .collect()
    }

    /// Toggle a subcategory within a field and persist.
    ///
    /// Adding past the per-field limit is silently ignored.
    pub fn toggle(&mut self, field: &str, subcategory: &str) -> Result<(), StoreError> {
        let set = self.selections.entry(field.to_string()).or_default();
        if !set.remove(subcategory) {
            if set.len() >= MAX_PER_FIELD {
                debug!(field, subcategory, "Selection limit reached; ignoring");
                return Ok(());
            }
            set.insert(subcategory.to_string());
        }
        self.save()
    }

    /// Drop all selections and persist.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.selections.clear();
        self.save()
    }

    fn save(&self) -> Result<(), StoreError> {
        save_json(&self.path, &self.selections)?;
        info!(
            fields = self.selections.len(),
            "Saved selections to {:?}", self.path
        );
        Ok(())
    }
}

/// The user's saved-papers list, kept sorted by publication date descending.
pub struct SavedPapers {
    path: PathBuf,
    papers: Vec<Paper>,
}

impl SavedPapers {
    /// Open the store at its default location, loading any persisted state.
    pub fn new() -> Result<Self, StoreError> {
        Ok(Self::with_path(default_saved_path()?))
    }

    /// Open the store at a custom path (tests).
    pub fn with_path(path: PathBuf) -> Self {
        let papers = load_or_default(&path);
        Self { path, papers }
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn is_saved(&self, id: &str) -> bool {
        self.papers.iter().any(|paper| paper.id == id)
    }

    /// Add or remove a paper and persist.
    pub fn toggle(&mut self, paper: &Paper) -> Result<(), StoreError> {
        if let Some(idx) = self.papers.iter().position(|p| p.id == paper.id) {
            self.papers.remove(idx);
        } else {
            self.papers.push(paper.clone());
        }
        self.papers.sort_by(|a, b| b.published.cmp(&a.published));
        save_json(&self.path, &self.papers)?;
        info!(count = self.papers.len(), "Saved paper list to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::NamedTempFile;

    fn paper(id: &str, year: i32) -> Paper {
        Paper {
            id: id.to_string(),
            title: format!("Paper {id}"),
            summary: "Abstract.".to_string(),
            authors: Vec::new(),
            categories: Vec::new(),
            published: Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap(),
            link: format!("https://arxiv.org/abs/{id}"),
        }
    }

    #[test]
    fn test_selections_toggle_and_cap() -> Result<(), StoreError> {
        let temp = NamedTempFile::new()?;
        let mut store = CategorySelections::with_path(temp.path().to_path_buf());

        store.toggle("cs", "cs.AI")?;
        store.toggle("cs", "cs.LG")?;
        store.toggle("cs", "cs.CL")?;
        // Fourth selection in the same field is ignored.
        store.toggle("cs", "cs.CV")?;
        assert_eq!(store.selected_in("cs").len(), 3);
        assert!(!store.selected_in("cs").contains("cs.CV"));

        // Removing frees a slot.
        store.toggle("cs", "cs.AI")?;
        store.toggle("cs", "cs.CV")?;
        assert!(store.selected_in("cs").contains("cs.CV"));
        Ok(())
    }

    #[test]
    fn test_selections_persist_across_reopen() -> Result<(), StoreError> {
        let temp = NamedTempFile::new()?;
        {
            let mut store = CategorySelections::with_path(temp.path().to_path_buf());
            store.toggle("cs", "cs.AI")?;
            store.toggle("math", "math.CO")?;
        }

        let reopened = CategorySelections::with_path(temp.path().to_path_buf());
        assert_eq!(reopened.all_selected(), vec!["cs.AI", "math.CO"]);
        Ok(())
    }

    #[test]
    fn test_corrupt_selections_file_loads_empty() -> Result<(), StoreError> {
        let temp = NamedTempFile::new()?;
        std::fs::write(temp.path(), "not json")?;
        let store = CategorySelections::with_path(temp.path().to_path_buf());
        assert!(store.all_selected().is_empty());
        Ok(())
    }

    #[test]
    fn test_saved_papers_toggle_sorts_and_persists() -> Result<(), StoreError> {
        let temp = NamedTempFile::new()?;
        {
            let mut store = SavedPapers::with_path(temp.path().to_path_buf());
            store.toggle(&paper("old", 2020))?;
            store.toggle(&paper("new", 2024))?;
            assert!(store.is_saved("old"));
            let ids: Vec<&str> = store.papers().iter().map(|p| p.id.as_str()).collect();
            assert_eq!(ids, vec!["new", "old"]);
        }

        let mut reopened = SavedPapers::with_path(temp.path().to_path_buf());
        assert_eq!(reopened.papers().len(), 2);

        // Toggling an existing id removes it.
        reopened.toggle(&paper("old", 2020))?;
        assert!(!reopened.is_saved("old"));
        Ok(())
    }
}
