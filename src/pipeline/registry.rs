//! Name-keyed stage factory.
//!
//! The registry is populated before any document is deserialized. The
//! embedding application registers whatever stage classes it ships; the
//! built-in array stages are available via `with_builtins`.

use crate::pipeline::stage::Stage;
use crate::pipeline::stages::{
    ClampStage, CreateArrayStage, RenameArrayStage, ScaleStage, StatisticsStage, ThresholdStage,
};
use std::collections::BTreeMap;

type StageFactory = Box<dyn Fn() -> Box<dyn Stage> + Send + Sync>;

/// Factory collaborator instantiating stages from class-name strings.
pub struct StageRegistry {
    factories: BTreeMap<String, StageFactory>,
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StageRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry preloaded with the built-in array stages.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("CreateArray", || Box::new(CreateArrayStage::new()));
        registry.register("Scale", || Box::new(ScaleStage::new()));
        registry.register("Clamp", || Box::new(ClampStage::new()));
        registry.register("Threshold", || Box::new(ThresholdStage::new()));
        registry.register("RenameArray", || Box::new(RenameArrayStage::new()));
        registry.register("Statistics", || Box::new(StatisticsStage::new()));
        registry
    }

    /// Register a factory under `class_name`, replacing any previous entry.
    pub fn register<F>(&mut self, class_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Stage> + Send + Sync + 'static,
    {
        let class_name = class_name.into();
        if self.factories.insert(class_name.clone(), Box::new(factory)).is_some() {
            tracing::warn!("Stage class '{}' re-registered", class_name);
        }
    }

    /// Instantiate a stage by class name.
    pub fn create(&self, class_name: &str) -> Option<Box<dyn Stage>> {
        self.factories.get(class_name).map(|factory| factory())
    }

    /// Whether `class_name` is registered.
    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    /// Registered class names in sorted order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no classes are registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRegistry")
            .field("classes", &self.factories.len())
            .finish()
    }
}
