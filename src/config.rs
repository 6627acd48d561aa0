//! Engine configuration
//!
//! An `EngineConfig` is built once and is immutable after the engine takes
//! it. The serde-able toggles mirror the persisted config surface; the
//! callback slots (learn filters, custom response handlers) are runtime
//! registrations and are skipped by serde.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::filters::{LearnFilter, ResponseHandler};
use crate::telemetry;

/// How the engine treats each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    /// Look up a response, optionally learning from the previous turn.
    Conversational,
    /// Every call is an explicit teach command; no lookups, no telemetry.
    ManualTeach,
}

/// What to do when the input matches nothing in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownInputPolicy {
    /// Answer with a random response from a random known key.
    RandomResponse,
    /// Report the sentinel unknown-input reply instead of guessing.
    ReturnError,
}

/// Behavioral toggles for a [`ResponseEngine`](crate::ResponseEngine).
#[derive(Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding `<model>.<extension>` documents.
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    #[serde(default = "default_mode")]
    pub mode: EngineMode,
    /// Master switch for learning from observed turns.
    #[serde(default = "default_true")]
    pub learning: bool,
    /// Lowercase inputs before matching.
    #[serde(default = "default_true")]
    pub case_insensitive: bool,
    /// Store the normalized (rather than raw) input as a learned response.
    #[serde(default)]
    pub case_insensitive_in_responses: bool,
    /// Enforce terminal punctuation on stored keys.
    #[serde(default = "default_true")]
    pub interpunction: bool,
    /// Map Polish diacritics to base Latin before matching.
    #[serde(default = "default_true")]
    pub strip_diacritics: bool,
    /// Never learn keys containing a Discord invite link.
    #[serde(default)]
    pub ignore_invite_links: bool,
    /// Never learn keys containing any other link.
    #[serde(default)]
    pub ignore_other_links: bool,
    /// Document text encoding. Only `utf-8` is honored; the field exists
    /// for config-surface compatibility.
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Escape non-ASCII characters in the persisted document.
    #[serde(default)]
    pub ascii_only: bool,
    #[serde(default = "default_if_unknown")]
    pub if_unknown: UnknownInputPolicy,
    /// File extension of model documents.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Interactions retained by the telemetry ring.
    #[serde(default = "default_telemetry_capacity")]
    pub telemetry_capacity: usize,

    /// Single learn filter; mutually exclusive with `learn_filters`.
    #[serde(skip)]
    pub learn_filter: Option<LearnFilter>,
    /// Ordered learn filters; mutually exclusive with `learn_filter`.
    #[serde(skip)]
    pub learn_filters: Vec<LearnFilter>,
    /// Single response handler; mutually exclusive with
    /// `custom_response_handlers`.
    #[serde(skip)]
    pub custom_response_handler: Option<ResponseHandler>,
    /// Ordered response handlers; mutually exclusive with
    /// `custom_response_handler`.
    #[serde(skip)]
    pub custom_response_handlers: Vec<ResponseHandler>,
}

fn default_models_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "mimic", "mimic")
        .map(|dirs| dirs.data_dir().join("models"))
        .unwrap_or_else(|| PathBuf::from("models"))
}

fn default_mode() -> EngineMode {
    EngineMode::Conversational
}

fn default_true() -> bool {
    true
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_if_unknown() -> UnknownInputPolicy {
    UnknownInputPolicy::RandomResponse
}

fn default_extension() -> String {
    "basic-model".to_string()
}

fn default_telemetry_capacity() -> usize {
    telemetry::DEFAULT_CAPACITY
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            mode: default_mode(),
            learning: true,
            case_insensitive: true,
            case_insensitive_in_responses: false,
            interpunction: true,
            strip_diacritics: true,
            ignore_invite_links: false,
            ignore_other_links: false,
            encoding: default_encoding(),
            ascii_only: false,
            if_unknown: default_if_unknown(),
            extension: default_extension(),
            telemetry_capacity: default_telemetry_capacity(),
            learn_filter: None,
            learn_filters: Vec::new(),
            custom_response_handler: None,
            custom_response_handlers: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Defaults, with both link filters enabled.
    pub fn secure() -> Self {
        Self {
            ignore_invite_links: true,
            ignore_other_links: true,
            ..Self::default()
        }
    }

    /// Defaults, with learning disabled.
    pub fn chat_only() -> Self {
        Self {
            learning: false,
            ..Self::default()
        }
    }

    /// Defaults, in manual-teach mode.
    pub fn manual_learning() -> Self {
        Self {
            mode: EngineMode::ManualTeach,
            ..Self::default()
        }
    }

    /// Reject configurations that fill both the single and the list slot
    /// of a callback pair.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.learn_filter.is_some() && !self.learn_filters.is_empty() {
            return Err(EngineError::ConfigurationConflict(
                "supply either `learn_filter` or `learn_filters`, not both",
            ));
        }
        if self.custom_response_handler.is_some() && !self.custom_response_handlers.is_empty() {
            return Err(EngineError::ConfigurationConflict(
                "supply either `custom_response_handler` or `custom_response_handlers`, not both",
            ));
        }
        Ok(())
    }

    /// Collapse the two filter slots into one ordered chain.
    pub(crate) fn filter_chain(&self) -> Vec<LearnFilter> {
        match &self.learn_filter {
            Some(single) => vec![single.clone()],
            None => self.learn_filters.clone(),
        }
    }

    /// Collapse the two handler slots into one ordered chain.
    pub(crate) fn handler_chain(&self) -> Vec<ResponseHandler> {
        match &self.custom_response_handler {
            Some(single) => vec![single.clone()],
            None => self.custom_response_handlers.clone(),
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("models_dir", &self.models_dir)
            .field("mode", &self.mode)
            .field("learning", &self.learning)
            .field("case_insensitive", &self.case_insensitive)
            .field(
                "case_insensitive_in_responses",
                &self.case_insensitive_in_responses,
            )
            .field("interpunction", &self.interpunction)
            .field("strip_diacritics", &self.strip_diacritics)
            .field("ignore_invite_links", &self.ignore_invite_links)
            .field("ignore_other_links", &self.ignore_other_links)
            .field("encoding", &self.encoding)
            .field("ascii_only", &self.ascii_only)
            .field("if_unknown", &self.if_unknown)
            .field("extension", &self.extension)
            .field("telemetry_capacity", &self.telemetry_capacity)
            .field("learn_filters", &self.filter_chain().len())
            .field("custom_response_handlers", &self.handler_chain().len())
            .finish()
    }
}
