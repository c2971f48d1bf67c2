//! The shared data store stages read from and write to.
//!
//! A `DataStore` is a named mapping of containers, each holding named typed
//! arrays. Stages mutate it in place during execute; the execution host deep
//! copies it (`Clone`) before a run and restores the copy afterwards so the
//! editable view survives the run untouched.
//!
//! `BTreeMap` keeps iteration order deterministic, which keeps preflight
//! messages and test assertions stable.

pub mod array;

pub use array::{ArrayKind, ArrayValues, DataArray};

use std::collections::BTreeMap;

/// A named collection of data arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataContainer {
    arrays: BTreeMap<String, DataArray>,
}

impl DataContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an array under `name`.
    pub fn insert_array(&mut self, name: impl Into<String>, array: DataArray) {
        self.arrays.insert(name.into(), array);
    }

    /// Look up an array by name.
    pub fn array(&self, name: &str) -> Option<&DataArray> {
        self.arrays.get(name)
    }

    /// Look up an array mutably by name.
    pub fn array_mut(&mut self, name: &str) -> Option<&mut DataArray> {
        self.arrays.get_mut(name)
    }

    /// Remove an array, returning it if present.
    pub fn remove_array(&mut self, name: &str) -> Option<DataArray> {
        self.arrays.remove(name)
    }

    /// Whether an array with `name` exists.
    pub fn contains_array(&self, name: &str) -> bool {
        self.arrays.contains_key(name)
    }

    /// Iterate array names in sorted order.
    pub fn array_names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    /// Number of arrays in the container.
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// Whether the container holds no arrays.
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

/// The shared, named container-of-arrays state a pipeline operates on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataStore {
    containers: BTreeMap<String, DataContainer>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a container with `name`.
    pub fn create_container(&mut self, name: impl Into<String>) -> &mut DataContainer {
        self.containers.entry(name.into()).or_default()
    }

    /// Look up a container by name.
    pub fn container(&self, name: &str) -> Option<&DataContainer> {
        self.containers.get(name)
    }

    /// Look up a container mutably by name.
    pub fn container_mut(&mut self, name: &str) -> Option<&mut DataContainer> {
        self.containers.get_mut(name)
    }

    /// Remove a container, returning it if present.
    pub fn remove_container(&mut self, name: &str) -> Option<DataContainer> {
        self.containers.remove(name)
    }

    /// Whether a container with `name` exists.
    pub fn contains_container(&self, name: &str) -> bool {
        self.containers.contains_key(name)
    }

    /// Shorthand lookup: array `array` inside container `container`.
    pub fn array(&self, container: &str, array: &str) -> Option<&DataArray> {
        self.containers.get(container)?.array(array)
    }

    /// Shorthand mutable lookup: array `array` inside container `container`.
    pub fn array_mut(&mut self, container: &str, array: &str) -> Option<&mut DataArray> {
        self.containers.get_mut(container)?.array_mut(array)
    }

    /// Iterate container names in sorted order.
    pub fn container_names(&self) -> impl Iterator<Item = &str> {
        self.containers.keys().map(String::as_str)
    }

    /// Number of containers.
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Whether the store holds no containers.
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}
