//! Statistics — summarizes a float64 array into a [min, max, mean] tuple.
//!
//! The summary lands in the store as a one-tuple, three-component array so
//! later stages (or the shell) can read it back, and is also echoed as
//! standard output.

use crate::pipeline::stage::{
    assign_string, ErrorCode, ParamMap, ParamValue, Stage, StageContext,
};
use crate::store::{ArrayKind, DataArray, DataStore};

/// Missing input array name parameter.
pub const ERR_EMPTY_NAME: ErrorCode = -241;
/// Required array absent from the store.
pub const ERR_MISSING_ARRAY: ErrorCode = -242;
/// Array present but not float64.
pub const ERR_WRONG_KIND: ErrorCode = -243;
/// Input array holds no values.
pub const ERR_EMPTY_ARRAY: ErrorCode = -244;

pub struct StatisticsStage {
    container: String,
    array: String,
    output: String,
}

impl StatisticsStage {
    pub fn new() -> Self {
        Self {
            container: "Default".to_string(),
            array: String::new(),
            output: String::new(),
        }
    }

    /// Output name: explicit parameter, or `<input>_Statistics`.
    fn output_name(&self) -> String {
        if self.output.is_empty() {
            format!("{}_Statistics", self.array)
        } else {
            self.output.clone()
        }
    }
}

impl Default for StatisticsStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for StatisticsStage {
    fn class_name(&self) -> &'static str {
        "Statistics"
    }

    fn label(&self) -> &'static str {
        "Array Statistics"
    }

    fn parameters(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("container".into(), ParamValue::String(self.container.clone()));
        map.insert("array".into(), ParamValue::String(self.array.clone()));
        map.insert("output".into(), ParamValue::String(self.output.clone()));
        map
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> bool {
        match name {
            "container" => assign_string(&mut self.container, value),
            "array" => assign_string(&mut self.array, value),
            "output" => assign_string(&mut self.output, value),
            _ => false,
        }
    }

    fn validate(
        &mut self,
        store: &mut DataStore,
        ctx: &mut StageContext<'_>,
        dry_run: bool,
    ) -> ErrorCode {
        if self.array.is_empty() {
            ctx.error(ERR_EMPTY_NAME, "Array name must not be empty");
            return ERR_EMPTY_NAME;
        }
        match store.array(&self.container, &self.array) {
            None => {
                ctx.error(
                    ERR_MISSING_ARRAY,
                    format!(
                        "Required array '{}' not found in container '{}'",
                        self.array, self.container
                    ),
                );
                return ERR_MISSING_ARRAY;
            }
            Some(array) if array.kind() != ArrayKind::Float64 => {
                ctx.error(
                    ERR_WRONG_KIND,
                    format!(
                        "Array '{}' has kind {}, expected float64",
                        self.array,
                        array.kind()
                    ),
                );
                return ERR_WRONG_KIND;
            }
            Some(array) if array.is_empty() => {
                ctx.error(
                    ERR_EMPTY_ARRAY,
                    format!("Array '{}' holds no values to summarize", self.array),
                );
                return ERR_EMPTY_ARRAY;
            }
            Some(_) => {}
        }

        if dry_run {
            store.create_container(self.container.clone()).insert_array(
                self.output_name(),
                DataArray::filled_f64(1, 3, 0.0),
            );
        }
        0
    }

    fn run(&mut self, store: &mut DataStore, ctx: &mut StageContext<'_>) -> ErrorCode {
        ctx.status(format!("Summarizing '{}'", self.array));
        let Some(values) = store
            .array(&self.container, &self.array)
            .and_then(|a| a.as_f64())
        else {
            ctx.error(ERR_MISSING_ARRAY, format!("Array '{}' disappeared", self.array));
            return ERR_MISSING_ARRAY;
        };

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &value in values {
            min = min.min(value);
            max = max.max(value);
            sum += value;
        }
        let mean = sum / values.len() as f64;

        ctx.stdout(format!(
            "{}: min {}, max {}, mean {}",
            self.array, min, max, mean
        ));

        let mut summary = DataArray::filled_f64(1, 3, 0.0);
        if let Some(target) = summary.as_f64_mut() {
            target.copy_from_slice(&[min, max, mean]);
        }
        store
            .create_container(self.container.clone())
            .insert_array(self.output_name(), summary);
        ctx.progress(100);
        0
    }
}
