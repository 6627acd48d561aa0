//! Mimic - self-learning conversational responder
//!
//! Given an input utterance, returns a previously learned response or a
//! configured fallback, and learns new input→response associations either
//! by observing conversational turns or through explicit teach commands.
//!
//! - Persistent knowledge store (one JSON document per model, with
//!   backup-on-first-write)
//! - Configurable normalization: case folding, diacritic stripping,
//!   interpunction enforcement
//! - Learn-filter chain gating what gets committed
//! - Custom response handlers that can override the reply
//! - Bounded telemetry ring recording recent activity
//!
//! # Example
//!
//! ```no_run
//! use mimic::{EngineConfig, ResponseEngine};
//!
//! fn main() -> mimic::Result<()> {
//!     let mut engine = ResponseEngine::open("basic", EngineConfig::default())?;
//!     let result = engine.interact("hello there", None, None, true)?;
//!     println!("{:?}", result.reply);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod filters;
pub mod store;
pub mod telemetry;
pub mod text;

// Re-export the public surface
pub use config::{EngineConfig, EngineMode, UnknownInputPolicy};
pub use engine::{Interaction, Reply, ResponseEngine};
pub use error::{EngineError, Result};
pub use filters::{FilterVerdict, LearnFilter, ResponseHandler};
pub use store::KnowledgeStore;
pub use telemetry::{TelemetryRing, TelemetrySnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
