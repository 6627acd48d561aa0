//! Response engine - one interaction from input to reply
//!
//! Orchestrates a single turn: normalize the input, run the learn-filter
//! gate, consult custom response handlers, optionally commit the previous
//! turn to the knowledge store, look up (or fall back), format, and record
//! telemetry. Construction validates the config and loads the store; both
//! failure classes there are fatal, per-call errors are not.

use std::time::Instant;

use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, EngineMode, UnknownInputPolicy};
use crate::error::{EngineError, Result};
use crate::filters::{HandlerChain, LearnPipeline};
use crate::store::KnowledgeStore;
use crate::telemetry::{TelemetryRing, TelemetrySnapshot};
use crate::text;

/// The engine's answer to one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// Sentinel for "no knowledge and the policy is to say so". A normal
    /// return value, not an error.
    Unknown,
}

impl Reply {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text(s) => Some(s),
            Reply::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Reply::Unknown)
    }
}

/// Outcome of one [`ResponseEngine::interact`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub reply: Reply,
    /// Whether this call committed the previous turn to the store.
    pub learned: bool,
}

/// Self-learning conversational responder over one knowledge store.
pub struct ResponseEngine {
    model: String,
    config: EngineConfig,
    store: KnowledgeStore,
    pipeline: LearnPipeline,
    handlers: HandlerChain,
    telemetry: TelemetryRing,
}

impl std::fmt::Debug for ResponseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseEngine")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ResponseEngine {
    /// Load `<model>.<extension>` from the configured models directory and
    /// build an engine around it.
    ///
    /// Fails with [`EngineError::ConfigurationConflict`] when both the
    /// single and the list slot of a callback pair are filled, and with
    /// [`EngineError::StoreUnavailable`] when the model document is missing
    /// or unreadable.
    pub fn open(model: &str, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let store = KnowledgeStore::open(
            model,
            &config.models_dir,
            &config.extension,
            config.ascii_only,
        )?;
        let pipeline = LearnPipeline::new(config.filter_chain());
        let handlers = HandlerChain::new(config.handler_chain());
        let telemetry = TelemetryRing::new(config.telemetry_capacity);
        info!("engine ready for model '{}' ({} keys)", model, store.len());
        Ok(Self {
            model: model.to_string(),
            config,
            store,
            pipeline,
            handlers,
            telemetry,
        })
    }

    /// Run one interaction.
    ///
    /// In conversational mode, `previous_response` is the engine's own
    /// previous message; when present (and learning is allowed through),
    /// the pair (previous_response, input) is committed to the store.
    /// `teach_output` is only consulted in manual-teach mode, where it is
    /// required. `should_learn` is the caller's per-call override.
    pub fn interact(
        &mut self,
        input: &str,
        previous_response: Option<&str>,
        teach_output: Option<&str>,
        should_learn: bool,
    ) -> Result<Interaction> {
        if self.config.mode == EngineMode::ManualTeach {
            return self.teach(input, teach_output);
        }

        let start = Instant::now();
        let normalized = self.normalize(input);
        debug!("input '{}' normalized to '{}'", input, normalized);

        let gate = self.pipeline.failed(&normalized);
        let custom_response = self.handlers.respond(&normalized);
        let learned_flag =
            should_learn && gate && custom_response.is_none() && self.config.learning;

        if let Some(previous) = previous_response {
            if self.config.learning && should_learn && gate {
                let response = if self.config.case_insensitive_in_responses {
                    normalized.as_str()
                } else {
                    input
                };
                self.commit(previous, response)?;
            }
        }

        let (chosen, knowledge_hit) = match self.store.lookup(&normalized) {
            Some(responses) => (uniform_choice(responses)?, true),
            None => match self.config.if_unknown {
                UnknownInputPolicy::RandomResponse => {
                    warn!("no knowledge for '{}', answering at random", normalized);
                    let key = self.store.random_key()?.to_string();
                    let responses = self.store.lookup(&key).ok_or(EngineError::EmptyStore)?;
                    (uniform_choice(responses)?, false)
                }
                // Short-circuit: no formatting, no telemetry.
                UnknownInputPolicy::ReturnError => {
                    debug!("no knowledge for '{}', reporting unknown input", normalized);
                    return Ok(Interaction {
                        reply: Reply::Unknown,
                        learned: learned_flag,
                    });
                }
            },
        };

        let formatted = text::enforce_terminal_punctuation(&text::capitalize_first(&chosen));
        self.telemetry
            .record(input, start.elapsed().as_secs_f64(), knowledge_hit);

        Ok(Interaction {
            reply: Reply::Text(custom_response.unwrap_or(formatted)),
            learned: learned_flag,
        })
    }

    /// Manual-teach branch: commit the pair and confirm. An administrative
    /// action, so no telemetry is recorded.
    fn teach(&mut self, input: &str, teach_output: Option<&str>) -> Result<Interaction> {
        let output = teach_output.ok_or(EngineError::MissingTeachTarget)?;
        let changed = self.commit(input, output)?;
        Ok(Interaction {
            reply: Reply::Text(format!("Added new phrase. `{}` => `{}`", input, output)),
            learned: changed,
        })
    }

    /// Apply the configured normalization to a raw input.
    fn normalize(&self, input: &str) -> String {
        let mut s = if self.config.case_insensitive {
            text::fold_case(input)
        } else {
            input.to_string()
        };
        if self.config.strip_diacritics {
            s = text::strip_diacritics(&s);
        }
        s
    }

    /// Shape a key and commit one (key, response) pair, honoring the link
    /// policies. Returns whether the store changed.
    fn commit(&mut self, key: &str, response: &str) -> Result<bool> {
        if self.blocked_by_link_policy(key) {
            debug!("link policy blocked learning key '{}'", key);
            return Ok(false);
        }
        let key = self.shape_key(key);
        self.store.learn(&key, response)
    }

    /// Keys get terminal punctuation when interpunction is enabled, and a
    /// leading capital when matching is case-sensitive.
    fn shape_key(&self, key: &str) -> String {
        if !self.config.interpunction {
            return key.to_string();
        }
        let shaped = text::enforce_terminal_punctuation(key);
        if self.config.case_insensitive {
            shaped
        } else {
            text::capitalize_first(&shaped)
        }
    }

    fn blocked_by_link_policy(&self, key: &str) -> bool {
        let lower = key.to_lowercase();
        if self.config.ignore_invite_links
            && (lower.contains("discord.gg") || lower.contains("discord.com/invite"))
        {
            return true;
        }
        if self.config.ignore_other_links
            && (lower.contains("http://") || lower.contains("https://") || lower.contains("www."))
        {
            return true;
        }
        false
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of learned keys.
    pub fn knowledge_len(&self) -> usize {
        self.store.len()
    }

    /// Copy of the recent-activity buffers.
    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    pub fn clear_telemetry(&mut self) {
        self.telemetry.clear();
    }
}

/// Uniform pick from a non-empty response list.
fn uniform_choice(responses: &[String]) -> Result<String> {
    responses
        .choose(&mut rand::rng())
        .cloned()
        .ok_or(EngineError::EmptyStore)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    fn seed_model(dir: &Path, json: &str) {
        std::fs::write(dir.join("test.basic-model"), json).unwrap();
    }

    fn engine_with(dir: &Path, config: EngineConfig) -> ResponseEngine {
        let config = EngineConfig {
            models_dir: dir.to_path_buf(),
            ..config
        };
        ResponseEngine::open("test", config).unwrap()
    }

    #[test]
    fn test_open_validates_config_before_store() {
        let dir = tempfile::tempdir().unwrap();
        // No model document either; the conflict must win.
        let config = EngineConfig {
            models_dir: dir.path().to_path_buf(),
            learn_filter: Some(Arc::new(|_: &str| crate::FilterVerdict::Passed(true))),
            learn_filters: vec![Arc::new(|_: &str| crate::FilterVerdict::Passed(true))],
            ..EngineConfig::default()
        };
        assert!(matches!(
            ResponseEngine::open("test", config).unwrap_err(),
            EngineError::ConfigurationConflict(_)
        ));
    }

    #[test]
    fn test_known_input_formats_response() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), r#"{"hi.": ["hello there"]}"#);
        let mut engine = engine_with(dir.path(), EngineConfig::default());

        let result = engine.interact("HI.", None, None, true).unwrap();
        assert_eq!(result.reply, Reply::Text("Hello there.".to_string()));
    }

    #[test]
    fn test_normalization_strips_diacritics_for_lookup() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), r#"{"czesc.": ["hej"]}"#);
        let mut engine = engine_with(dir.path(), EngineConfig::default());

        let result = engine.interact("CZEŚĆ.", None, None, true).unwrap();
        assert_eq!(result.reply, Reply::Text("Hej.".to_string()));
    }

    #[test]
    fn test_unknown_with_return_error_policy() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), r#"{"hi.": ["hello"]}"#);
        let config = EngineConfig {
            if_unknown: UnknownInputPolicy::ReturnError,
            ..EngineConfig::default()
        };
        let mut engine = engine_with(dir.path(), config);

        let result = engine.interact("never seen", None, None, true).unwrap();
        assert!(result.reply.is_unknown());
        // Telemetry is bypassed on the sentinel path.
        assert!(engine.telemetry().questions.is_empty());
    }

    #[test]
    fn test_unknown_with_random_policy_on_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), "{}");
        let mut engine = engine_with(dir.path(), EngineConfig::default());

        assert!(matches!(
            engine.interact("anything", None, None, true).unwrap_err(),
            EngineError::EmptyStore
        ));
    }

    #[test]
    fn test_learns_previous_turn() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), r#"{"hi.": ["hello"]}"#);
        let mut engine = engine_with(dir.path(), EngineConfig::default());

        let result = engine
            .interact("how are you", Some("what's up"), None, true)
            .unwrap();
        assert!(result.learned);
        // The previous message became a key (shaped with interpunction).
        let followup = engine.interact("what's up.", None, None, true).unwrap();
        assert_eq!(followup.reply, Reply::Text("How are you.".to_string()));
    }

    #[test]
    fn test_should_learn_false_blocks_commit() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), r#"{"hi.": ["hello"]}"#);
        let mut engine = engine_with(dir.path(), EngineConfig::default());

        let result = engine
            .interact("hi", Some("previous message"), None, false)
            .unwrap();
        assert!(!result.learned);
        assert_eq!(engine.knowledge_len(), 1);
    }

    #[test]
    fn test_learning_disabled_blocks_commit() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), r#"{"hi.": ["hello"]}"#);
        let mut engine = engine_with(dir.path(), EngineConfig::chat_only());

        let result = engine
            .interact("hi", Some("previous message"), None, true)
            .unwrap();
        assert!(!result.learned);
        assert_eq!(engine.knowledge_len(), 1);
    }

    #[test]
    fn test_custom_handler_overrides_reply_but_not_learning() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), r#"{"hi.": ["hello"]}"#);
        let config = EngineConfig {
            custom_response_handler: Some(Arc::new(|input: &str| {
                input.contains("hi").then(|| "override!".to_string())
            })),
            ..EngineConfig::default()
        };
        let mut engine = engine_with(dir.path(), config);

        let result = engine.interact("hi", Some("earlier"), None, true).unwrap();
        assert_eq!(result.reply, Reply::Text("override!".to_string()));
        // Commit still happened; the flag reports no learning because the
        // reply was overridden.
        assert!(!result.learned);
        assert_eq!(engine.knowledge_len(), 2);
    }

    #[test]
    fn test_invite_link_never_learned() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), r#"{"hi.": ["hello"]}"#);
        let config = EngineConfig {
            ignore_invite_links: true,
            ..EngineConfig::default()
        };
        let mut engine = engine_with(dir.path(), config);

        engine
            .interact("hi", Some("join discord.gg/abc now"), None, true)
            .unwrap();
        assert_eq!(engine.knowledge_len(), 1);
    }

    #[test]
    fn test_other_links_never_learned_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), r#"{"hi.": ["hello"]}"#);
        let mut engine = engine_with(dir.path(), EngineConfig::secure());

        engine
            .interact("hi", Some("see https://example.com"), None, true)
            .unwrap();
        engine
            .interact("hi", Some("see www.example.com"), None, true)
            .unwrap();
        assert_eq!(engine.knowledge_len(), 1);
    }

    #[test]
    fn test_case_sensitive_key_shaping_capitalizes() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), "{}");
        let config = EngineConfig {
            case_insensitive: false,
            if_unknown: UnknownInputPolicy::ReturnError,
            ..EngineConfig::default()
        };
        let mut engine = engine_with(dir.path(), config);

        engine
            .interact("fine, thanks", Some("how are you"), None, true)
            .unwrap();
        // Key was capitalized and punctuated; matching is case-sensitive.
        let hit = engine.interact("How are you.", None, None, false).unwrap();
        assert_eq!(hit.reply, Reply::Text("Fine, thanks.".to_string()));
        let miss = engine.interact("how are you.", None, None, false).unwrap();
        assert!(miss.reply.is_unknown());
    }

    #[test]
    fn test_manual_teach_requires_output() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), "{}");
        let mut engine = engine_with(dir.path(), EngineConfig::manual_learning());

        assert!(matches!(
            engine.interact("hi", None, None, true).unwrap_err(),
            EngineError::MissingTeachTarget
        ));
        // The failed call left the store untouched and the engine usable.
        assert_eq!(engine.knowledge_len(), 0);
        let ok = engine.interact("hi", None, Some("hello"), true).unwrap();
        assert!(ok.learned);
        assert_eq!(
            ok.reply,
            Reply::Text("Added new phrase. `hi` => `hello`".to_string())
        );
    }

    #[test]
    fn test_manual_teach_records_no_telemetry() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), "{}");
        let mut engine = engine_with(dir.path(), EngineConfig::manual_learning());

        engine.interact("hi", None, Some("hello"), true).unwrap();
        assert!(engine.telemetry().questions.is_empty());
    }

    #[test]
    fn test_manual_teach_duplicate_reports_not_learned() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), "{}");
        let mut engine = engine_with(dir.path(), EngineConfig::manual_learning());

        assert!(engine.interact("hi", None, Some("hello"), true).unwrap().learned);
        assert!(!engine.interact("hi", None, Some("hello"), true).unwrap().learned);
    }

    #[test]
    fn test_telemetry_records_hits_and_misses() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), r#"{"hi.": ["hello"], "bye.": ["later"]}"#);
        let mut engine = engine_with(dir.path(), EngineConfig::default());

        engine.interact("hi.", None, None, false).unwrap();
        engine.interact("unheard of", None, None, false).unwrap();

        let snap = engine.telemetry();
        assert_eq!(snap.questions, vec!["hi.", "unheard of"]);
        assert_eq!(snap.knowledge_hits, vec![true, false]);
        assert!(snap.average_response_time.is_some());
    }

    #[test]
    fn test_learn_filter_gate() {
        let dir = tempfile::tempdir().unwrap();
        seed_model(dir.path(), r#"{"hi.": ["hello"]}"#);
        let config = EngineConfig {
            // Everything passes the filter, which closes the commit gate.
            learn_filter: Some(Arc::new(|_: &str| crate::FilterVerdict::Passed(true))),
            ..EngineConfig::default()
        };
        let mut engine = engine_with(dir.path(), config);

        let result = engine.interact("hi", Some("earlier"), None, true).unwrap();
        assert!(!result.learned);
        assert_eq!(engine.knowledge_len(), 1);
    }
}
