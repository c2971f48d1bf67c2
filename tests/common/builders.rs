//! Builders and scripted stages for integration tests.

use pipeflow_rs::pipeline::{
    ErrorCode, ParamMap, ParamValue, Stage, StageContext, StageRegistry,
};
use pipeflow_rs::store::DataStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Build a registry stage and apply parameters in one call.
pub fn stage_with(
    registry: &StageRegistry,
    class: &str,
    params: &[(&str, ParamValue)],
) -> Box<dyn Stage> {
    let mut stage = registry
        .create(class)
        .unwrap_or_else(|| panic!("unknown stage class {class}"));
    for (name, value) in params {
        assert!(
            stage.set_parameter(name, value),
            "stage {class} rejected parameter {name}"
        );
    }
    stage
}

/// Shorthand for a CreateArray stage in the Default container.
pub fn create_array(registry: &StageRegistry, array: &str, tuples: i64, fill: f64) -> Box<dyn Stage> {
    stage_with(
        registry,
        "CreateArray",
        &[
            ("array", ParamValue::String(array.to_string())),
            ("tuples", ParamValue::Int(tuples)),
            ("fill", ParamValue::Float(fill)),
        ],
    )
}

/// Shorthand for a Scale stage in the Default container.
pub fn scale(registry: &StageRegistry, array: &str, factor: f64) -> Box<dyn Stage> {
    stage_with(
        registry,
        "Scale",
        &[
            ("array", ParamValue::String(array.to_string())),
            ("factor", ParamValue::Float(factor)),
        ],
    )
}

/// Scripted stage: counts executions, can fail its run with a fixed code,
/// and can trip a cancellation flag from inside its run.
pub struct ScriptedStage {
    pub runs: Arc<AtomicUsize>,
    pub run_code: ErrorCode,
    pub cancel_on_run: Option<Arc<AtomicBool>>,
}

impl ScriptedStage {
    pub fn counting(runs: Arc<AtomicUsize>) -> Self {
        Self {
            runs,
            run_code: 0,
            cancel_on_run: None,
        }
    }
}

impl Stage for ScriptedStage {
    fn class_name(&self) -> &'static str {
        "Scripted"
    }

    fn label(&self) -> &'static str {
        "Scripted Stage"
    }

    fn parameters(&self) -> ParamMap {
        ParamMap::new()
    }

    fn set_parameter(&mut self, _name: &str, _value: &ParamValue) -> bool {
        false
    }

    fn validate(
        &mut self,
        _store: &mut DataStore,
        _ctx: &mut StageContext<'_>,
        _dry_run: bool,
    ) -> ErrorCode {
        0
    }

    fn run(&mut self, _store: &mut DataStore, ctx: &mut StageContext<'_>) -> ErrorCode {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(flag) = &self.cancel_on_run {
            flag.store(true, Ordering::Relaxed);
        }
        if self.run_code < 0 {
            ctx.error(self.run_code, "scripted failure");
        }
        self.run_code
    }
}
