//! Static description of the archiver's configuration form.

use serde::Serialize;

/// Notifier name used to namespace form ids and field names.
pub const NOTIFIER_NAME: &str = "Artifacts";

/// Input widget for a field.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
}

/// One configurable field.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Key under which the value is stored in the notifier options.
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// HTML element id, e.g. `artifacts_artifact_root`.
    pub fn html_id(&self) -> String {
        format!("{}_{}", NOTIFIER_NAME.to_lowercase(), self.key)
    }

    /// Form parameter name, e.g. `notifiers[Artifacts][artifact_root]`.
    pub fn html_name(&self) -> String {
        format!("notifiers[{}][{}]", NOTIFIER_NAME, self.key)
    }
}

/// Fields shown when configuring the archiver for a project.
pub fn form_schema() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor {
            key: "artifact_root",
            label: "Artifact Root",
            kind: FieldKind::Text,
        },
        FieldDescriptor {
            key: "config_path",
            label: "Config YAML",
            kind: FieldKind::Text,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArchiverOptions;

    #[test]
    fn schema_lists_root_then_config() {
        let keys: Vec<_> = form_schema().iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["artifact_root", "config_path"]);
    }

    #[test]
    fn html_ids_and_names() {
        let schema = form_schema();
        assert_eq!(schema[0].html_id(), "artifacts_artifact_root");
        assert_eq!(schema[0].html_name(), "notifiers[Artifacts][artifact_root]");
        assert_eq!(schema[1].label, "Config YAML");
        assert_eq!(schema[1].html_name(), "notifiers[Artifacts][config_path]");
    }

    #[test]
    fn schema_keys_deserialize_into_options() {
        let mut form = serde_json::Map::new();
        for field in form_schema() {
            form.insert(field.key.to_string(), serde_json::Value::from("/some/path"));
        }
        let opts: ArchiverOptions =
            serde_json::from_value(serde_json::Value::Object(form)).unwrap();
        assert!(opts.artifact_root.is_some());
        assert!(opts.config_path.is_some());
    }

    #[test]
    fn legacy_config_yaml_field_fills_config_path() {
        let form = serde_json::json!({
            "artifact_root": "",
            "config_yaml": "config/artifacts.yml",
        });
        let opts: ArchiverOptions = serde_json::from_value(form).unwrap();
        assert_eq!(
            opts,
            ArchiverOptions::default().with_config_path("config/artifacts.yml")
        );
    }

    #[test]
    fn schema_serializes_kind() {
        let json = serde_json::to_value(form_schema()).unwrap();
        assert_eq!(json[0]["kind"], "text");
        assert_eq!(json[1]["key"], "config_path");
    }
}
