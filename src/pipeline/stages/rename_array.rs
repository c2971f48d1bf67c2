//! RenameArray — moves an array to a new name within its container.
//!
//! The dry-run performs the rename on the preflight scratch store so
//! downstream stages validate against the new name.

use crate::pipeline::stage::{
    assign_string, ErrorCode, ParamMap, ParamValue, Stage, StageContext,
};
use crate::store::DataStore;

/// Missing source array name parameter.
pub const ERR_EMPTY_SOURCE: ErrorCode = -231;
/// Missing target array name parameter.
pub const ERR_EMPTY_TARGET: ErrorCode = -232;
/// Source array absent from the store.
pub const ERR_MISSING_ARRAY: ErrorCode = -233;
/// Target name already taken.
pub const ERR_TARGET_EXISTS: ErrorCode = -234;

pub struct RenameArrayStage {
    container: String,
    from: String,
    to: String,
}

impl RenameArrayStage {
    pub fn new() -> Self {
        Self {
            container: "Default".to_string(),
            from: String::new(),
            to: String::new(),
        }
    }

    fn rename(&self, store: &mut DataStore) -> bool {
        let Some(container) = store.container_mut(&self.container) else {
            return false;
        };
        match container.remove_array(&self.from) {
            Some(array) => {
                container.insert_array(self.to.clone(), array);
                true
            }
            None => false,
        }
    }
}

impl Default for RenameArrayStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for RenameArrayStage {
    fn class_name(&self) -> &'static str {
        "RenameArray"
    }

    fn label(&self) -> &'static str {
        "Rename Array"
    }

    fn parameters(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("container".into(), ParamValue::String(self.container.clone()));
        map.insert("from".into(), ParamValue::String(self.from.clone()));
        map.insert("to".into(), ParamValue::String(self.to.clone()));
        map
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> bool {
        match name {
            "container" => assign_string(&mut self.container, value),
            "from" => assign_string(&mut self.from, value),
            "to" => assign_string(&mut self.to, value),
            _ => false,
        }
    }

    fn validate(
        &mut self,
        store: &mut DataStore,
        ctx: &mut StageContext<'_>,
        dry_run: bool,
    ) -> ErrorCode {
        if self.from.is_empty() {
            ctx.error(ERR_EMPTY_SOURCE, "Source array name must not be empty");
            return ERR_EMPTY_SOURCE;
        }
        if self.to.is_empty() {
            ctx.error(ERR_EMPTY_TARGET, "Target array name must not be empty");
            return ERR_EMPTY_TARGET;
        }
        if store.array(&self.container, &self.from).is_none() {
            ctx.error(
                ERR_MISSING_ARRAY,
                format!(
                    "Required array '{}' not found in container '{}'",
                    self.from, self.container
                ),
            );
            return ERR_MISSING_ARRAY;
        }
        if store.array(&self.container, &self.to).is_some() {
            ctx.error(
                ERR_TARGET_EXISTS,
                format!(
                    "Array '{}' already exists in container '{}'",
                    self.to, self.container
                ),
            );
            return ERR_TARGET_EXISTS;
        }

        if dry_run {
            // Downstream stages must see the new name during preflight.
            self.rename(store);
        }
        0
    }

    fn run(&mut self, store: &mut DataStore, ctx: &mut StageContext<'_>) -> ErrorCode {
        ctx.status(format!("Renaming '{}' to '{}'", self.from, self.to));
        if !self.rename(store) {
            ctx.error(ERR_MISSING_ARRAY, format!("Array '{}' disappeared", self.from));
            return ERR_MISSING_ARRAY;
        }
        0
    }
}
