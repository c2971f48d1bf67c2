//! Threshold — derives a boolean mask array from a float64 input.
//!
//! Writes a new array of the same shape as the input; each mask value is
//! whether the corresponding input value exceeds the threshold.

use crate::pipeline::stage::{
    assign_float, assign_string, ErrorCode, ParamMap, ParamValue, Stage, StageContext,
};
use crate::store::{ArrayKind, DataArray, DataStore};

/// Missing input array name parameter.
pub const ERR_EMPTY_INPUT: ErrorCode = -221;
/// Missing output array name parameter.
pub const ERR_EMPTY_OUTPUT: ErrorCode = -222;
/// Required input array absent from the store.
pub const ERR_MISSING_ARRAY: ErrorCode = -223;
/// Input array present but not float64.
pub const ERR_WRONG_KIND: ErrorCode = -224;

pub struct ThresholdStage {
    container: String,
    array: String,
    output: String,
    threshold: f64,
}

impl ThresholdStage {
    pub fn new() -> Self {
        Self {
            container: "Default".to_string(),
            array: String::new(),
            output: "Mask".to_string(),
            threshold: 0.0,
        }
    }
}

impl Default for ThresholdStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for ThresholdStage {
    fn class_name(&self) -> &'static str {
        "Threshold"
    }

    fn label(&self) -> &'static str {
        "Threshold Array"
    }

    fn parameters(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("container".into(), ParamValue::String(self.container.clone()));
        map.insert("array".into(), ParamValue::String(self.array.clone()));
        map.insert("output".into(), ParamValue::String(self.output.clone()));
        map.insert("threshold".into(), ParamValue::Float(self.threshold));
        map
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> bool {
        match name {
            "container" => assign_string(&mut self.container, value),
            "array" => assign_string(&mut self.array, value),
            "output" => assign_string(&mut self.output, value),
            "threshold" => assign_float(&mut self.threshold, value),
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
            ctx.error(ERR_EMPTY_INPUT, "Input array name must not be empty");
            return ERR_EMPTY_INPUT;
        }
        if self.output.is_empty() {
            ctx.error(ERR_EMPTY_OUTPUT, "Output array name must not be empty");
            return ERR_EMPTY_OUTPUT;
        }
        let (tuples, components) = match store.array(&self.container, &self.array) {
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
            Some(array) => (array.tuples(), array.components()),
        };

        if dry_run {
            // Register the mask's shape for downstream stages.
            store.create_container(self.container.clone()).insert_array(
                self.output.clone(),
                DataArray::filled_bool(tuples, components, false),
            );
        }
        0
    }

    fn run(&mut self, store: &mut DataStore, ctx: &mut StageContext<'_>) -> ErrorCode {
        ctx.status(format!(
            "Thresholding '{}' at {} into '{}'",
            self.array, self.threshold, self.output
        ));
        let Some(input) = store.array(&self.container, &self.array) else {
            ctx.error(ERR_MISSING_ARRAY, format!("Array '{}' disappeared", self.array));
            return ERR_MISSING_ARRAY;
        };
        let (tuples, components) = (input.tuples(), input.components());
        // Validate confirmed the kind.
        let mask: Vec<bool> = match input.as_f64() {
            Some(values) => values.iter().map(|&v| v > self.threshold).collect(),
            None => {
                ctx.error(ERR_WRONG_KIND, format!("Array '{}' changed kind", self.array));
                return ERR_WRONG_KIND;
            }
        };

        let mut array = DataArray::filled_bool(tuples, components, false);
        if let Some(target) = array.as_bool_mut() {
            target.copy_from_slice(&mask);
        }
        store
            .create_container(self.container.clone())
            .insert_array(self.output.clone(), array);
        ctx.progress(100);
        0
    }
}
