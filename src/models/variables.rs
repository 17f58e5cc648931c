use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of value a variable is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableType {
    PlainText,
    DataModel,
    Connection,
    /// Types this tool does not interpret; kept verbatim.
    #[serde(untagged)]
    Other(String),
}

/// A named parameter of a package bound to a concrete value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableAssignment {
    pub key: String,
    #[serde(rename = "type")]
    pub variable_type: VariableType,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl VariableAssignment {
    /// Reads a string field of the metadata object.
    #[must_use]
    pub fn metadata_str(&self, field: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(field)?.as_str()
    }

    /// Sets a metadata field, creating the metadata object when absent.
    pub fn set_metadata(&mut self, field: &str, value: impl Into<Value>) {
        self.metadata.get_or_insert_with(Map::new).insert(field.to_string(), value.into());
    }

    /// Id of the referenced data model for DATA_MODEL assignments.
    ///
    /// The value is either the id itself or an object carrying an `id` field.
    #[must_use]
    pub fn data_model_id(&self) -> Option<&str> {
        if self.variable_type != VariableType::DataModel {
            return None;
        }
        match &self.value {
            Value::String(id) => Some(id),
            Value::Object(obj) => obj.get("id").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Variables of one package version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableManifestEntry {
    pub package_key: String,
    pub version: String,
    #[serde(default)]
    pub variables: Vec<VariableAssignment>,
}

/// A data model referenced by a package, with display names when known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataModelRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_name: Option<String>,
}
