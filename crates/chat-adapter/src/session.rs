use std::sync::Arc;

use uuid::Uuid;

use crate::harness::HarnessInner;
use crate::model::{GenerationConfig, ModelRef, RunOptions};
use crate::run::RunBuilder;

/// Defaults shared by every run of a session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Shown in logs next to each run.
    pub name: String,
    /// Generation parameters each run starts from.
    pub generation: GenerationConfig,
    pub options: RunOptions,
}

impl SessionConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generation: GenerationConfig::default(),
            options: RunOptions::default(),
        }
    }

    pub fn generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.options.stream_buffer_capacity = capacity;
        self
    }
}

/// A conversation scope for runs.
///
/// Sessions hold no connection and keep no message history; streams started
/// from one session share no state.
#[derive(Clone)]
pub struct Session {
    harness: Arc<HarnessInner>,
    id: Uuid,
    config: SessionConfig,
}

impl Session {
    pub(crate) fn new(harness: Arc<HarnessInner>, config: SessionConfig) -> Self {
        Self {
            harness,
            id: Uuid::new_v4(),
            config,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Starts a run against `model`, seeded with the session defaults.
    pub fn run(&self, model: ModelRef) -> RunBuilder {
        RunBuilder::new(self.harness.clone(), self.id, model)
            .session_name(self.config.name.clone())
            .generation_config(self.config.generation.clone())
            .stream_buffer_capacity(self.config.options.stream_buffer_capacity)
    }
}
