//! Serialized pipeline documents.
//!
//! A document is an ordered list of stage descriptors (class identifier plus
//! parameter map) and a display name. Two on-disk representations are
//! supported: JSON (read and write) and a legacy INI text format (read
//! only). Instantiation goes through the `StageRegistry`, which must know
//! every class the document names.

use crate::error::{PipeflowError, Result};
use crate::pipeline::executor::Pipeline;
use crate::pipeline::registry::StageRegistry;
use crate::pipeline::stage::{ParamMap, ParamValue};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One stage entry in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    pub class_name: String,
    #[serde(default)]
    pub parameters: ParamMap,
}

/// A serialized pipeline: display name plus ordered stage descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stages: Vec<StageDescriptor>,
}

impl PipelineDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Snapshot a live pipeline into a document.
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        Self {
            name: pipeline.name().to_string(),
            stages: pipeline
                .stages()
                .map(|stage| StageDescriptor {
                    class_name: stage.class_name().to_string(),
                    parameters: stage.parameters(),
                })
                .collect(),
        }
    }

    /// Instantiate a pipeline from this document via `registry`.
    ///
    /// Unknown class names abort with `UnknownStageClass`. Parameters the
    /// stage does not recognize are logged and skipped, not fatal.
    pub fn to_pipeline(&self, registry: &StageRegistry) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new(self.name.clone());
        for descriptor in &self.stages {
            let mut stage = registry
                .create(&descriptor.class_name)
                .ok_or_else(|| PipeflowError::UnknownStageClass(descriptor.class_name.clone()))?;
            for (name, value) in &descriptor.parameters {
                if !stage.set_parameter(name, value) {
                    tracing::warn!(
                        "Stage '{}' ignored parameter '{}'",
                        descriptor.class_name,
                        name
                    );
                }
            }
            pipeline.push_stage(stage);
        }
        Ok(pipeline)
    }

    /// Read a document from disk, dispatching on the file extension:
    /// `.json` for the current format, `.ini`/`.txt` for the legacy one.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match extension_of(path) {
            Some("json") => {
                let content = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&content)?)
            }
            Some("ini") | Some("txt") => {
                let content = std::fs::read_to_string(path)?;
                Self::from_legacy_text(&content)
            }
            _ => Err(PipeflowError::UnsupportedExtension(path.to_path_buf())),
        }
    }

    /// Write the document as pretty JSON. The write path is JSON only;
    /// an existing file at `path` is overwritten.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if extension_of(path) != Some("json") {
            return Err(PipeflowError::UnsupportedExtension(path.to_path_buf()));
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parse the legacy INI text format (read-only path).
    ///
    /// ```text
    /// [Pipeline]
    /// Name=Edge Detection
    ///
    /// [0]
    /// Class=CreateArray
    /// array=Foo
    /// tuples=100
    /// ```
    ///
    /// Numeric sections are stage descriptors, ordered by their index. The
    /// `Class` key names the stage class; every other key becomes a typed
    /// parameter (`true`/`false`, integer, float, else string).
    pub fn from_legacy_text(text: &str) -> Result<Self> {
        enum Section {
            None,
            Header,
            Stage(usize),
        }

        let mut name = String::new();
        // (index, class, params) per numeric section.
        let mut entries: Vec<(usize, Option<String>, ParamMap)> = Vec::new();
        let mut section = Section::None;

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                section = if let Ok(index) = header.trim().parse::<usize>() {
                    entries.push((index, None, ParamMap::new()));
                    Section::Stage(entries.len() - 1)
                } else {
                    Section::Header
                };
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(PipeflowError::Malformed(format!(
                    "line {}: expected 'key=value', got '{}'",
                    line_no + 1,
                    line
                )));
            };
            let (key, value) = (key.trim(), value.trim());

            match &mut section {
                Section::None => {
                    return Err(PipeflowError::Malformed(format!(
                        "line {}: key '{}' outside any section",
                        line_no + 1,
                        key
                    )));
                }
                Section::Header => {
                    if key.eq_ignore_ascii_case("name") {
                        name = value.to_string();
                    }
                    // Other header keys (counts, versions) are informational.
                }
                Section::Stage(slot) => {
                    let entry = &mut entries[*slot];
                    if key.eq_ignore_ascii_case("class") {
                        entry.1 = Some(value.to_string());
                    } else {
                        entry.2.insert(key.to_string(), parse_legacy_value(value));
                    }
                }
            }
        }

        entries.sort_by_key(|(index, _, _)| *index);

        let mut stages = Vec::with_capacity(entries.len());
        for (index, class, parameters) in entries {
            let class_name = class.ok_or_else(|| {
                PipeflowError::Malformed(format!("stage section [{index}] has no Class key"))
            })?;
            stages.push(StageDescriptor {
                class_name,
                parameters,
            });
        }

        Ok(Self { name, stages })
    }
}

fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

fn parse_legacy_value(value: &str) -> ParamValue {
    if value.eq_ignore_ascii_case("true") {
        return ParamValue::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return ParamValue::Bool(false);
    }
    if let Ok(i) = value.parse::<i64>() {
        return ParamValue::Int(i);
    }
    if let Ok(f) = value.parse::<f64>() {
        return ParamValue::Float(f);
    }
    ParamValue::String(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PipelineDocument {
        let mut doc = PipelineDocument::new("Sample");
        let mut parameters = ParamMap::new();
        parameters.insert("array".into(), ParamValue::String("Foo".into()));
        parameters.insert("tuples".into(), ParamValue::Int(100));
        doc.stages.push(StageDescriptor {
            class_name: "CreateArray".into(),
            parameters,
        });
        let mut parameters = ParamMap::new();
        parameters.insert("array".into(), ParamValue::String("Foo".into()));
        parameters.insert("factor".into(), ParamValue::Float(2.5));
        doc.stages.push(StageDescriptor {
            class_name: "Scale".into(),
            parameters,
        });
        doc
    }

    #[test]
    fn test_json_round_trip_preserves_order_and_params() {
        let doc = sample();
        let json = serde_json::to_string_pretty(&doc).unwrap();
        let back: PipelineDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, back);
        let classes: Vec<_> = back.stages.iter().map(|s| s.class_name.as_str()).collect();
        assert_eq!(classes, vec!["CreateArray", "Scale"]);
    }

    #[test]
    fn test_to_pipeline_unknown_class() {
        let mut doc = PipelineDocument::new("bad");
        doc.stages.push(StageDescriptor {
            class_name: "DoesNotExist".into(),
            parameters: ParamMap::new(),
        });
        let registry = StageRegistry::with_builtins();
        let err = doc.to_pipeline(&registry).unwrap_err();
        assert!(matches!(err, PipeflowError::UnknownStageClass(name) if name == "DoesNotExist"));
    }

    #[test]
    fn test_pipeline_document_round_trip() {
        let registry = StageRegistry::with_builtins();
        let doc = sample();
        let pipeline = doc.to_pipeline(&registry).unwrap();
        let back = PipelineDocument::from_pipeline(&pipeline);
        assert_eq!(back.name, "Sample");
        assert_eq!(back.stages.len(), 2);
        assert_eq!(back.stages[0].class_name, "CreateArray");
        assert_eq!(
            back.stages[0].parameters.get("array"),
            Some(&ParamValue::String("Foo".into()))
        );
        assert_eq!(
            back.stages[1].parameters.get("factor"),
            Some(&ParamValue::Float(2.5))
        );
    }

    #[test]
    fn test_legacy_text_parses() {
        let text = r"
; legacy pipeline export
[Pipeline]
Name=Legacy Sample
Stage_Count=2

[1]
Class=Scale
array=Foo
factor=2.5

[0]
Class=CreateArray
array=Foo
tuples=100
fill=0.5
";
        let doc = PipelineDocument::from_legacy_text(text).unwrap();
        assert_eq!(doc.name, "Legacy Sample");
        // Sections ordered by numeric index, not file order.
        assert_eq!(doc.stages[0].class_name, "CreateArray");
        assert_eq!(doc.stages[1].class_name, "Scale");
        assert_eq!(doc.stages[0].parameters["tuples"], ParamValue::Int(100));
        assert_eq!(doc.stages[0].parameters["fill"], ParamValue::Float(0.5));
        assert_eq!(doc.stages[1].parameters["factor"], ParamValue::Float(2.5));
    }

    #[test]
    fn test_legacy_text_missing_class() {
        let text = "[0]\narray=Foo\n";
        let err = PipelineDocument::from_legacy_text(text).unwrap_err();
        assert!(matches!(err, PipeflowError::Malformed(_)));
    }

    #[test]
    fn test_legacy_text_key_outside_section() {
        let err = PipelineDocument::from_legacy_text("stray=1\n").unwrap_err();
        assert!(matches!(err, PipeflowError::Malformed(_)));
    }

    #[test]
    fn test_legacy_value_typing() {
        assert_eq!(parse_legacy_value("true"), ParamValue::Bool(true));
        assert_eq!(parse_legacy_value("False"), ParamValue::Bool(false));
        assert_eq!(parse_legacy_value("42"), ParamValue::Int(42));
        assert_eq!(parse_legacy_value("-1.5"), ParamValue::Float(-1.5));
        assert_eq!(parse_legacy_value("Density"), ParamValue::String("Density".into()));
    }

    #[test]
    fn test_save_rejects_non_json() {
        let doc = sample();
        let err = doc.save("pipeline.ini").unwrap_err();
        assert!(matches!(err, PipeflowError::UnsupportedExtension(_)));
    }
}
