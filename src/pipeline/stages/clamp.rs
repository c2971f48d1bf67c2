//! Clamp — limits every value of a float64 array to a closed range.

use crate::pipeline::stage::{
    assign_float, assign_string, ErrorCode, ParamMap, ParamValue, Stage, StageContext,
};
use crate::store::{ArrayKind, DataStore};

/// Missing array name parameter.
pub const ERR_EMPTY_NAME: ErrorCode = -211;
/// Lower bound above upper bound.
pub const ERR_BAD_RANGE: ErrorCode = -212;
/// Required array absent from the store.
pub const ERR_MISSING_ARRAY: ErrorCode = -213;
/// Array present but not float64.
pub const ERR_WRONG_KIND: ErrorCode = -214;

pub struct ClampStage {
    container: String,
    array: String,
    min: f64,
    max: f64,
}

impl ClampStage {
    pub fn new() -> Self {
        Self {
            container: "Default".to_string(),
            array: String::new(),
            min: 0.0,
            max: 1.0,
        }
    }
}

impl Default for ClampStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for ClampStage {
    fn class_name(&self) -> &'static str {
        "Clamp"
    }

    fn label(&self) -> &'static str {
        "Clamp Array"
    }

    fn parameters(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("container".into(), ParamValue::String(self.container.clone()));
        map.insert("array".into(), ParamValue::String(self.array.clone()));
        map.insert("min".into(), ParamValue::Float(self.min));
        map.insert("max".into(), ParamValue::Float(self.max));
        map
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> bool {
        match name {
            "container" => assign_string(&mut self.container, value),
            "array" => assign_string(&mut self.array, value),
            "min" => assign_float(&mut self.min, value),
            "max" => assign_float(&mut self.max, value),
            _ => false,
        }
    }

    fn validate(
        &mut self,
        store: &mut DataStore,
        ctx: &mut StageContext<'_>,
        _dry_run: bool,
    ) -> ErrorCode {
        if self.array.is_empty() {
            ctx.error(ERR_EMPTY_NAME, "Array name must not be empty");
            return ERR_EMPTY_NAME;
        }
        if self.min > self.max {
            ctx.error(
                ERR_BAD_RANGE,
                format!("Invalid range: min {} > max {}", self.min, self.max),
            );
            return ERR_BAD_RANGE;
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
                ERR_MISSING_ARRAY
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
                ERR_WRONG_KIND
            }
            Some(_) => 0,
        }
    }

    fn run(&mut self, store: &mut DataStore, ctx: &mut StageContext<'_>) -> ErrorCode {
        ctx.status(format!(
            "Clamping '{}' to [{}, {}]",
            self.array, self.min, self.max
        ));
        let Some(values) = store
            .array_mut(&self.container, &self.array)
            .and_then(|a| a.as_f64_mut())
        else {
            ctx.error(ERR_MISSING_ARRAY, format!("Array '{}' disappeared", self.array));
            return ERR_MISSING_ARRAY;
        };
        for value in values.iter_mut() {
            *value = value.clamp(self.min, self.max);
        }
        ctx.progress(100);
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::message::MessageChannel;
    use crate::store::DataArray;

    #[test]
    fn test_inverted_range_rejected() {
        let mut stage = ClampStage::new();
        stage.set_parameter("array", &ParamValue::String("A".into()));
        stage.set_parameter("min", &ParamValue::Float(2.0));
        stage.set_parameter("max", &ParamValue::Float(1.0));
        let mut store = DataStore::new();
        let mut channel = MessageChannel::new();
        let mut ctx = StageContext::new(0, stage.label(), &mut channel);
        assert_eq!(stage.validate(&mut store, &mut ctx, true), ERR_BAD_RANGE);
    }

    #[test]
    fn test_run_clamps_values() {
        let mut stage = ClampStage::new();
        stage.set_parameter("array", &ParamValue::String("A".into()));
        stage.set_parameter("min", &ParamValue::Float(-1.0));
        stage.set_parameter("max", &ParamValue::Float(1.0));
        let mut store = DataStore::new();
        store
            .create_container("Default")
            .insert_array("A", DataArray::from_f64(vec![-5.0, 0.5, 5.0]));
        let mut channel = MessageChannel::new();
        let mut ctx = StageContext::new(0, stage.label(), &mut channel);
        assert_eq!(stage.validate(&mut store, &mut ctx, false), 0);
        assert_eq!(stage.run(&mut store, &mut ctx), 0);
        assert_eq!(
            store.array("Default", "A").unwrap().as_f64().unwrap(),
            &[-1.0, 0.5, 1.0]
        );
    }
}
