//! CreateArray — source stage that materializes a named float64 array.
//!
//! The only built-in stage that introduces data into the store. During
//! preflight it registers the array (shape and fill) so downstream stages
//! can check existence; during execute it creates the array for real.

use crate::pipeline::stage::{
    assign_float, assign_int, assign_string, ErrorCode, ParamMap, ParamValue, Stage, StageContext,
};
use crate::store::{DataArray, DataStore};

/// Missing array name parameter.
pub const ERR_EMPTY_NAME: ErrorCode = -301;
/// Negative tuple count parameter.
pub const ERR_BAD_TUPLES: ErrorCode = -302;
/// Component count below 1.
pub const ERR_BAD_COMPONENTS: ErrorCode = -303;

pub struct CreateArrayStage {
    container: String,
    array: String,
    tuples: i64,
    components: i64,
    fill: f64,
}

impl CreateArrayStage {
    pub fn new() -> Self {
        Self {
            container: "Default".to_string(),
            array: String::new(),
            tuples: 0,
            components: 1,
            fill: 0.0,
        }
    }

    fn build_array(&self) -> DataArray {
        DataArray::filled_f64(self.tuples as usize, self.components as usize, self.fill)
    }
}

impl Default for CreateArrayStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for CreateArrayStage {
    fn class_name(&self) -> &'static str {
        "CreateArray"
    }

    fn label(&self) -> &'static str {
        "Create Array"
    }

    fn parameters(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("container".into(), ParamValue::String(self.container.clone()));
        map.insert("array".into(), ParamValue::String(self.array.clone()));
        map.insert("tuples".into(), ParamValue::Int(self.tuples));
        map.insert("components".into(), ParamValue::Int(self.components));
        map.insert("fill".into(), ParamValue::Float(self.fill));
        map
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> bool {
        match name {
            "container" => assign_string(&mut self.container, value),
            "array" => assign_string(&mut self.array, value),
            "tuples" => assign_int(&mut self.tuples, value),
            "components" => assign_int(&mut self.components, value),
            "fill" => assign_float(&mut self.fill, value),
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
        if self.tuples < 0 {
            ctx.error(
                ERR_BAD_TUPLES,
                format!("Tuple count must be >= 0, got {}", self.tuples),
            );
            return ERR_BAD_TUPLES;
        }
        if self.components < 1 {
            ctx.error(
                ERR_BAD_COMPONENTS,
                format!("Component count must be >= 1, got {}", self.components),
            );
            return ERR_BAD_COMPONENTS;
        }

        if store.array(&self.container, &self.array).is_some() {
            ctx.warning(
                0,
                format!(
                    "Array '{}' already exists in container '{}' and will be overwritten",
                    self.array, self.container
                ),
            );
        }

        if dry_run {
            // Register the shape so downstream stages can validate against it.
            store
                .create_container(self.container.clone())
                .insert_array(self.array.clone(), self.build_array());
        }
        0
    }

    fn run(&mut self, store: &mut DataStore, ctx: &mut StageContext<'_>) -> ErrorCode {
        ctx.status(format!(
            "Creating array '{}' ({} tuples x {} components)",
            self.array, self.tuples, self.components
        ));
        store
            .create_container(self.container.clone())
            .insert_array(self.array.clone(), self.build_array());
        ctx.progress(100);
        0
    }
}
