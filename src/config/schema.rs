use serde::{Deserialize, Serialize};

/// Schema Validator configuration: where schemas live and whether egress is
/// checked too. Ingress validation is always on (§4.5); egress validation is
/// opt-in and observational only (§4.6, §6 `ENABLE_SCHEMA_VALIDATION`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchemaConfig {
    pub schema_dir: String,
    pub validate_egress: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            schema_dir: "schemas".to_string(),
            validate_egress: false,
        }
    }
}
