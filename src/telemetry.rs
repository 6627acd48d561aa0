//! Telemetry ring - bounded recent-activity buffers
//!
//! Three parallel ring buffers (question, response latency, whether the
//! answer came from learned knowledge) with a shared capacity. Each engine
//! owns its own ring; nothing here is process-global.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of interactions retained.
pub const DEFAULT_CAPACITY: usize = 100;

/// Fixed-capacity record of recent interactions.
#[derive(Debug, Clone)]
pub struct TelemetryRing {
    capacity: usize,
    questions: VecDeque<String>,
    response_times: VecDeque<f64>,
    knowledge_hits: VecDeque<bool>,
}

/// Owned copy of the ring contents, safe to hand to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub questions: Vec<String>,
    /// Per-call wall-clock latency in seconds.
    pub response_times: Vec<f64>,
    /// Whether each answer came from learned knowledge (vs. fallback).
    pub knowledge_hits: Vec<bool>,
    /// Mean of `response_times`; `None` when nothing has been recorded.
    pub average_response_time: Option<f64>,
}

impl Default for TelemetryRing {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TelemetryRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            questions: VecDeque::with_capacity(capacity),
            response_times: VecDeque::with_capacity(capacity),
            knowledge_hits: VecDeque::with_capacity(capacity),
        }
    }

    /// Append one interaction to all three buffers, evicting the oldest
    /// entry once capacity is exceeded. The buffers always stay the same
    /// length.
    pub fn record(&mut self, question: &str, response_time: f64, knowledge_hit: bool) {
        if self.questions.len() == self.capacity {
            self.questions.pop_front();
            self.response_times.pop_front();
            self.knowledge_hits.pop_front();
        }
        self.questions.push_back(question.to_string());
        self.response_times.push_back(response_time);
        self.knowledge_hits.push_back(knowledge_hit);
    }

    /// Copy out the current contents plus the derived average latency.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let average_response_time = if self.response_times.is_empty() {
            None
        } else {
            Some(self.response_times.iter().sum::<f64>() / self.response_times.len() as f64)
        };
        TelemetrySnapshot {
            questions: self.questions.iter().cloned().collect(),
            response_times: self.response_times.iter().copied().collect(),
            knowledge_hits: self.knowledge_hits.iter().copied().collect(),
            average_response_time,
        }
    }

    /// Reset all three buffers to empty.
    pub fn clear(&mut self) {
        self.questions.clear();
        self.response_times.clear();
        self.knowledge_hits.clear();
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
