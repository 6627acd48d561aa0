//! Learn-filter and custom-response callback chains
//!
//! Filters gate whether an observed turn gets committed to the knowledge
//! store; response handlers can substitute the final reply. Both run as
//! ordered chains over the normalized input, registered once at engine
//! construction.

use std::sync::Arc;

use tracing::debug;

/// What a learn filter reports about a candidate input.
///
/// Two calling conventions are supported, mirroring the callback contract
/// this engine inherits: `Passed(true)` means the turn is eligible to be
/// learned, while `FailedFlag` carries the already-inverted flag directly
/// (`FailedFlag(true)` == the filter signalled failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Passed(bool),
    FailedFlag(bool),
}

impl FilterVerdict {
    fn failed(self) -> bool {
        match self {
            FilterVerdict::Passed(passed) => !passed,
            FilterVerdict::FailedFlag(failed) => failed,
        }
    }
}

/// Predicate over the normalized input, gating knowledge commits.
pub type LearnFilter = Arc<dyn Fn(&str) -> FilterVerdict + Send + Sync>;

/// Override callback; the first handler returning `Some` wins.
pub type ResponseHandler = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Ordered chain of learn filters.
///
/// Evaluation short-circuits at the first filter signalling failure. With
/// no filters registered the chain reports the commit-eligible value.
#[derive(Default)]
pub struct LearnPipeline {
    filters: Vec<LearnFilter>,
}

impl LearnPipeline {
    pub fn new(filters: Vec<LearnFilter>) -> Self {
        Self { filters }
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run the chain against a normalized input.
    ///
    /// Returns the failure flag the engine uses as its commit gate. No
    /// filters means the default gate value (`true`).
    pub fn failed(&self, normalized_input: &str) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        let mut failed = false;
        for (idx, filter) in self.filters.iter().enumerate() {
            failed = filter(normalized_input).failed();
            if failed {
                debug!("learn filter #{} signalled failure, short-circuiting", idx);
                break;
            }
        }
        failed
    }
}

/// Ordered chain of custom response handlers.
#[derive(Default)]
pub struct HandlerChain {
    handlers: Vec<ResponseHandler>,
}

impl HandlerChain {
    pub fn new(handlers: Vec<ResponseHandler>) -> Self {
        Self { handlers }
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// First non-`None` handler result, if any.
    pub fn respond(&self, normalized_input: &str) -> Option<String> {
        for handler in &self.handlers {
            if let Some(response) = handler(normalized_input) {
                return Some(response);
            }
        }
        None
    }
}
