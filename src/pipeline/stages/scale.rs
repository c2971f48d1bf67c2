//! Scale — multiplies every value of a float64 array in place.

use crate::pipeline::stage::{
    assign_float, assign_string, ErrorCode, ParamMap, ParamValue, Stage, StageContext,
};
use crate::store::{ArrayKind, DataStore};

/// Missing array name parameter.
pub const ERR_EMPTY_NAME: ErrorCode = -201;
/// Required array absent from the store.
pub const ERR_MISSING_ARRAY: ErrorCode = -202;
/// Array present but not float64.
pub const ERR_WRONG_KIND: ErrorCode = -203;

pub struct ScaleStage {
    container: String,
    array: String,
    factor: f64,
}

impl ScaleStage {
    pub fn new() -> Self {
        Self {
            container: "Default".to_string(),
            array: String::new(),
            factor: 1.0,
        }
    }

    fn check_input(&self, store: &DataStore, ctx: &mut StageContext<'_>) -> ErrorCode {
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
}

impl Default for ScaleStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for ScaleStage {
    fn class_name(&self) -> &'static str {
        "Scale"
    }

    fn label(&self) -> &'static str {
        "Scale Array"
    }

    fn parameters(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("container".into(), ParamValue::String(self.container.clone()));
        map.insert("array".into(), ParamValue::String(self.array.clone()));
        map.insert("factor".into(), ParamValue::Float(self.factor));
        map
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> bool {
        match name {
            "container" => assign_string(&mut self.container, value),
            "array" => assign_string(&mut self.array, value),
            "factor" => assign_float(&mut self.factor, value),
            _ => false,
        }
    }

    fn validate(
        &mut self,
        store: &mut DataStore,
        ctx: &mut StageContext<'_>,
        _dry_run: bool,
    ) -> ErrorCode {
        self.check_input(store, ctx)
    }

    fn run(&mut self, store: &mut DataStore, ctx: &mut StageContext<'_>) -> ErrorCode {
        ctx.status_progress(
            format!("Scaling '{}' by {}", self.array, self.factor),
            0,
        );
        // Validate already confirmed existence and kind.
        let Some(values) = store
            .array_mut(&self.container, &self.array)
            .and_then(|a| a.as_f64_mut())
        else {
            ctx.error(ERR_MISSING_ARRAY, format!("Array '{}' disappeared", self.array));
            return ERR_MISSING_ARRAY;
        };
        for value in values.iter_mut() {
            *value *= self.factor;
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

    fn stage_for(array: &str, factor: f64) -> ScaleStage {
        let mut stage = ScaleStage::new();
        stage.set_parameter("array", &ParamValue::String(array.to_string()));
        stage.set_parameter("factor", &ParamValue::Float(factor));
        stage
    }

    #[test]
    fn test_missing_array_reports_name_and_code() {
        let mut stage = stage_for("Foo", 2.0);
        let mut store = DataStore::new();
        let mut channel = MessageChannel::new();
        let mut ctx = StageContext::new(0, stage.label(), &mut channel);
        assert_eq!(stage.validate(&mut store, &mut ctx, true), ERR_MISSING_ARRAY);

        let cached = channel.cached();
        assert_eq!(cached.len(), 1);
        match &cached[0].content {
            crate::pipeline::message::MessageContent::Error { code, text } => {
                assert_eq!(*code, ERR_MISSING_ARRAY);
                assert!(text.contains("Foo"));
            }
            other => panic!("expected error message, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let mut stage = stage_for("Mask", 2.0);
        let mut store = DataStore::new();
        store
            .create_container("Default")
            .insert_array("Mask", DataArray::filled_bool(3, 1, false));
        let mut channel = MessageChannel::new();
        let mut ctx = StageContext::new(0, stage.label(), &mut channel);
        assert_eq!(stage.validate(&mut store, &mut ctx, true), ERR_WRONG_KIND);
    }

    #[test]
    fn test_run_scales_in_place() {
        let mut stage = stage_for("Density", -2.0);
        let mut store = DataStore::new();
        store
            .create_container("Default")
            .insert_array("Density", DataArray::from_f64(vec![1.0, 2.0, 3.0]));
        let mut channel = MessageChannel::new();
        let mut ctx = StageContext::new(0, stage.label(), &mut channel);
        assert_eq!(stage.validate(&mut store, &mut ctx, false), 0);
        assert_eq!(stage.run(&mut store, &mut ctx), 0);
        assert_eq!(
            store.array("Default", "Density").unwrap().as_f64().unwrap(),
            &[-2.0, -4.0, -6.0]
        );
    }

    #[test]
    fn test_int_factor_accepted() {
        let mut stage = ScaleStage::new();
        assert!(stage.set_parameter("factor", &ParamValue::Int(3)));
        assert_eq!(stage.parameters()["factor"], ParamValue::Float(3.0));
    }
}
