//! Knowledge store - persisted input→responses mapping
//!
//! One JSON document per model, `<models_dir>/<model>.<extension>`, holding
//! a single object of key → ordered response list. Every successful learn
//! rewrites the whole document; the first mutation of a session takes a
//! timestamped backup copy first.
//!
//! Single-writer by design: there is no file locking, and two engines
//! pointed at the same document will clobber each other.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Local;
use rand::seq::IndexedRandom;
use tracing::{debug, info};

use crate::error::{EngineError, Result};

/// Persistent mapping from a learned input to its candidate responses.
#[derive(Debug)]
pub struct KnowledgeStore {
    model: String,
    models_dir: PathBuf,
    extension: String,
    ascii_only: bool,
    entries: HashMap<String, Vec<String>>,
    backup_created: bool,
}

impl KnowledgeStore {
    /// Load an existing model document.
    ///
    /// Fails with [`EngineError::StoreUnavailable`] when the document is
    /// missing or not valid JSON; stores are never auto-created.
    pub fn open(
        model: &str,
        models_dir: &Path,
        extension: &str,
        ascii_only: bool,
    ) -> Result<Self> {
        let path = models_dir.join(format!("{}.{}", model, extension));
        let unavailable = |reason: String| EngineError::StoreUnavailable {
            model: model.to_string(),
            path: path.clone(),
            reason,
        };

        let raw = std::fs::read_to_string(&path).map_err(|e| unavailable(e.to_string()))?;
        let entries: HashMap<String, Vec<String>> =
            serde_json::from_str(&raw).map_err(|e| unavailable(e.to_string()))?;

        debug!(
            "loaded model '{}' from {} ({} keys)",
            model,
            path.display(),
            entries.len()
        );

        Ok(Self {
            model: model.to_string(),
            models_dir: models_dir.to_path_buf(),
            extension: extension.to_string(),
            ascii_only,
            entries,
            backup_created: false,
        })
    }

    fn document_path(&self) -> PathBuf {
        self.models_dir
            .join(format!("{}.{}", self.model, self.extension))
    }

    /// Responses learned for an exact key, if any.
    pub fn lookup(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(|v| v.as_slice())
    }

    /// Commit `response` under `key`.
    ///
    /// Self-loops (`key == response`) and already-present responses change
    /// nothing. Returns whether the store was mutated; a mutation is
    /// persisted synchronously before returning.
    pub fn learn(&mut self, key: &str, response: &str) -> Result<bool> {
        if key == response {
            debug!("rejected self-loop entry for '{}'", key);
            return Ok(false);
        }

        let responses = self.entries.entry(key.to_string()).or_default();
        if responses.iter().any(|r| r == response) {
            return Ok(false);
        }
        responses.push(response.to_string());

        if !self.backup_created {
            self.make_backup()?;
        }
        self.persist()?;
        info!("learned `{}` => `{}`", key, response);
        Ok(true)
    }

    /// Uniformly pick one existing key.
    pub fn random_key(&self) -> Result<&str> {
        let keys: Vec<&String> = self.entries.keys().collect();
        keys.choose(&mut rand::rng())
            .map(|k| k.as_str())
            .ok_or(EngineError::EmptyStore)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy the current document to
    /// `<models_dir>/backups/<model>/<model>-<dd-mm-YYYY_HH:MM:SS>.<extension>.backup`.
    ///
    /// Runs at most once per session, lazily before the first mutation.
    fn make_backup(&mut self) -> Result<()> {
        let stamp = Local::now().format("%d-%m-%Y_%H:%M:%S");
        let backup_dir = self.models_dir.join("backups").join(&self.model);
        std::fs::create_dir_all(&backup_dir)?;

        let backup_path = backup_dir.join(format!(
            "{}-{}.{}.backup",
            self.model, stamp, self.extension
        ));
        std::fs::copy(self.document_path(), &backup_path)?;
        self.backup_created = true;
        info!("created knowledge backup at {}", backup_path.display());
        Ok(())
    }

    /// Full-document rewrite. Documents stay small, so correctness of a
    /// partial write is not worth the complexity of an append log.
    fn persist(&self) -> Result<()> {
        let mut doc = serde_json::to_string(&self.entries)?;
        if self.ascii_only {
            doc = escape_non_ascii(&doc);
        }
        std::fs::write(self.document_path(), doc)?;
        Ok(())
    }
}

/// Escape every non-ASCII character in a JSON document as `\uXXXX`
/// (surrogate pairs outside the BMP). Non-ASCII only occurs inside JSON
/// strings, so a character-level pass over the document is safe.
fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut units = [0u16; 2];
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{:04x}", unit);
            }
        }
    }
    out
}
