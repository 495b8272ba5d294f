//! Schema Validator (§4.1, §4.5, §4.6): compiles and caches named JSON
//! schemas, used to validate ingress payloads (always) and, optionally,
//! egress payloads (env-gated, observational only).

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::Path;

use jsonschema::Validator;
use serde_json::Value;

use crate::error::SchemaLoadError;

pub struct SchemaValidator {
    validators: HashMap<String, Validator>,
}

impl SchemaValidator {
    /// Loads every `*.json` schema found directly under `dir` and its
    /// immediate subdirectories (`client-to-server/`, `server-to-client/`),
    /// keyed by file stem (e.g. `input-state-data`). Schemas are compiled
    /// once at process start per the spec's "compiles and caches named
    /// schemas" responsibility; there is no hot-reload.
    pub fn load_from_dir(dir: &Path) -> Result<Self, SchemaLoadError> {
        let mut validators = HashMap::new();

        for entry_dir in [
            dir.to_path_buf(),
            dir.join("client-to-server"),
            dir.join("server-to-client"),
        ] {
            if !entry_dir.is_dir() {
                continue;
            }
            let read_dir = std::fs::read_dir(&entry_dir).map_err(|source| SchemaLoadError::Io {
                path: entry_dir.display().to_string(),
                source,
            })?;
            for entry in read_dir {
                let entry = entry.map_err(|source| SchemaLoadError::Io {
                    path: entry_dir.display().to_string(),
                    source,
                })?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let raw = std::fs::read_to_string(&path).map_err(|source| SchemaLoadError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                let schema_json: Value =
                    serde_json::from_str(&raw).map_err(|source| SchemaLoadError::InvalidJson {
                        path: path.display().to_string(),
                        source,
                    })?;
                let validator =
                    jsonschema::validator_for(&schema_json).map_err(|err| SchemaLoadError::Compile {
                        name: name.to_string(),
                        message: err.to_string(),
                    })?;
                validators.insert(name.to_string(), validator);
            }
        }

        Ok(Self { validators })
    }

    pub fn with_no_schemas() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    pub fn schema_count(&self) -> usize {
        self.validators.len()
    }

    /// Ingress validation (§4.5): a missing schema for a name that should
    /// be registered is a hard failure (drop + log), not a silent pass.
    pub fn validate_ingress(&self, name: &str, value: &Value) -> Result<(), String> {
        match self.validators.get(name) {
            Some(validator) => first_error(validator, value),
            None => Err(format!("no ingress schema registered for '{name}'")),
        }
    }

    /// Egress validation (§4.6): observational only. A missing schema is
    /// not an error (not every egress type necessarily has one); a
    /// validator panic (e.g. triggered by a NaN that slipped past
    /// sanitization) is caught and reported as an `Err` rather than
    /// propagating, matching §7's "validator panic: recovered; logged;
    /// egress still sent".
    pub fn validate_egress(&self, name: &str, value: &Value) -> Result<(), String> {
        let Some(validator) = self.validators.get(name) else {
            return Ok(());
        };

        match std::panic::catch_unwind(AssertUnwindSafe(|| first_error(validator, value))) {
            Ok(result) => result,
            Err(_) => Err(format!("schema validator panicked while checking '{name}'")),
        }
    }
}

fn first_error(validator: &Validator, value: &Value) -> Result<(), String> {
    if validator.is_valid(value) {
        return Ok(());
    }
    let message = validator
        .iter_errors(value)
        .next()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "schema validation failed".to_string());
    Err(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator_with(name: &str, schema: Value) -> SchemaValidator {
        let validator = jsonschema::validator_for(&schema).unwrap();
        let mut validators = HashMap::new();
        validators.insert(name.to_string(), validator);
        SchemaValidator { validators }
    }

    #[test]
    fn ingress_missing_schema_is_error() {
        let validator = SchemaValidator::with_no_schemas();
        let result = validator.validate_ingress("input-state-data", &serde_json::json!({}));
        assert!(result.is_err());
    }

    #[test]
    fn egress_missing_schema_is_ok() {
        let validator = SchemaValidator::with_no_schemas();
        let result = validator.validate_egress("roll-start-data", &serde_json::json!({}));
        assert!(result.is_ok());
    }

    #[test]
    fn ingress_rejects_missing_required_field() {
        let schema = serde_json::json!({
            "type": "object",
            "required": ["up", "down", "left", "right", "aimAngle", "isSprinting"],
            "properties": {
                "up": {"type": "boolean"},
                "down": {"type": "boolean"},
                "left": {"type": "boolean"},
                "right": {"type": "boolean"},
                "aimAngle": {"type": "number"},
                "isSprinting": {"type": "boolean"}
            }
        });
        let validator = validator_with("input-state-data", schema);
        let payload = serde_json::json!({"up": true, "down": false, "left": true, "aimAngle": 1.5});
        assert!(validator.validate_ingress("input-state-data", &payload).is_err());
    }

    #[test]
    fn ingress_accepts_complete_payload() {
        let schema = serde_json::json!({
            "type": "object",
            "required": ["up", "down", "left", "right", "aimAngle", "isSprinting"],
            "properties": {
                "up": {"type": "boolean"},
                "down": {"type": "boolean"},
                "left": {"type": "boolean"},
                "right": {"type": "boolean"},
                "aimAngle": {"type": "number"},
                "isSprinting": {"type": "boolean"}
            }
        });
        let validator = validator_with("input-state-data", schema);
        let payload = serde_json::json!({
            "up": true, "down": false, "left": true, "right": false,
            "aimAngle": 1.5, "isSprinting": false
        });
        assert!(validator.validate_ingress("input-state-data", &payload).is_ok());
    }
}
