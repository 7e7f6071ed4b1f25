//! Text repository trait and the JSON-file implementation.

use super::types::{MotivationText, MotivationType, TextStatus};
use crate::error::{BotError, Result};
use rand::RngCore;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info};

/// Storage-agnostic access to the motivational text catalog.
pub trait TextRepository: Send + Sync {
    /// Look up a text by id.
    fn get(&self, id: &str) -> Option<MotivationText>;

    /// Texts with the given status, restricted to `category` when one is given.
    fn filter_by_category_and_status(
        &self,
        category: Option<MotivationType>,
        status: &TextStatus,
    ) -> Vec<MotivationText>;

    /// Mark a text as sent. Returns `false` when no such id exists.
    fn mark_consumed(&self, id: &str) -> Result<bool>;

    /// Re-read the backing document. Returns the number of texts loaded.
    fn reload(&self) -> Result<usize>;

    /// Mark every text new again. Returns how many changed.
    fn reset_statuses(&self) -> Result<usize>;

    /// Number of texts currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pick one new text uniformly at random from `category`, or from the
    /// whole catalog when no category is given.
    fn draw(
        &self,
        category: Option<MotivationType>,
        rng: &mut dyn RngCore,
    ) -> Option<MotivationText> {
        self.filter_by_category_and_status(category, &TextStatus::New)
            .choose(rng)
            .cloned()
    }
}

/// Catalog backed by a single JSON array on disk.
///
/// The whole document is held in memory and rewritten on every status change.
pub struct JsonTextCatalog {
    path: PathBuf,
    texts: Mutex<Vec<MotivationText>>,
}

impl JsonTextCatalog {
    /// Open the catalog at `path`.
    ///
    /// A missing or malformed document is logged and yields an empty catalog;
    /// a later [`TextRepository::reload`] can recover once the file is fixed.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let texts = match Self::read_document(&path) {
            Ok(texts) => {
                info!(count = texts.len(), path = %path.display(), "text catalog loaded");
                texts
            }
            Err(e) => {
                error!(path = %path.display(), "failed to load text catalog, starting empty: {e}");
                Vec::new()
            }
        };
        Self {
            path,
            texts: Mutex::new(texts),
        }
    }

    /// Build a catalog from in-memory texts, persisting to `path` on change.
    pub fn with_texts(path: impl Into<PathBuf>, texts: Vec<MotivationText>) -> Self {
        Self {
            path: path.into(),
            texts: Mutex::new(texts),
        }
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the catalog document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::Catalog`] if the file cannot be read or is not a JSON
    /// array of texts.
    pub fn read_document(path: &Path) -> Result<Vec<MotivationText>> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BotError::Catalog(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| BotError::Catalog(format!("cannot parse {}: {e}", path.display())))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<MotivationText>>> {
        self.texts
            .lock()
            .map_err(|e| BotError::Lock(format!("text catalog lock poisoned: {e}")))
    }

    fn write_document(&self, texts: &[MotivationText]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(texts)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body)
            .and_then(|()| std::fs::rename(&tmp, &self.path))
            .map_err(|e| BotError::Catalog(format!("cannot write {}: {e}", self.path.display())))
    }
}

impl TextRepository for JsonTextCatalog {
    fn get(&self, id: &str) -> Option<MotivationText> {
        let texts = self.lock().ok()?;
        texts.iter().find(|t| t.id == id).cloned()
    }

    fn filter_by_category_and_status(
        &self,
        category: Option<MotivationType>,
        status: &TextStatus,
    ) -> Vec<MotivationText> {
        let Ok(texts) = self.lock() else {
            return Vec::new();
        };
        texts
            .iter()
            .filter(|t| &t.status == status)
            .filter(|t| category.is_none_or(|c| t.category == c.as_canonical()))
            .cloned()
            .collect()
    }

    fn mark_consumed(&self, id: &str) -> Result<bool> {
        let mut texts = self.lock()?;
        let Some(text) = texts.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        text.status = TextStatus::Sent;
        debug!(id, "text marked as sent");
        self.write_document(&texts)?;
        Ok(true)
    }

    fn reload(&self) -> Result<usize> {
        let fresh = Self::read_document(&self.path)?;
        let count = fresh.len();
        *self.lock()? = fresh;
        info!(count, "text catalog reloaded");
        Ok(count)
    }

    fn reset_statuses(&self) -> Result<usize> {
        let mut texts = self.lock()?;
        let mut changed = 0;
        for text in texts.iter_mut().filter(|t| !t.status.is_new()) {
            text.status = TextStatus::New;
            changed += 1;
        }
        if changed > 0 {
            self.write_document(&texts)?;
        }
        info!(changed, "text statuses reset");
        Ok(changed)
    }

    fn len(&self) -> usize {
        self.lock().map(|t| t.len()).unwrap_or(0)
    }
}
