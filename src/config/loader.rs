//! Configuration loading and environment parsing.

use serde_json::Value;
use std::fs;
use std::path::Path;

use super::Config;

/// Load configuration with the following precedence (highest first):
/// 1) `SHOOTER_CONFIG_JSON` env var containing raw JSON
/// 2) If `SHOOTER_CONFIG_STDIN=true/1`, read JSON from stdin
/// 3) File pointed by `SHOOTER_CONFIG_PATH` env var
/// 4) config.json in current working directory
/// 5) config.json next to the executable (application directory)
/// 6) Defaults compiled into the binary
///
/// Individual fields can be overridden by environment variables with prefix
/// `SHOOTER` and `__` as a nested separator, e.g. `SHOOTER__PORT=8080` or
/// `SHOOTER__LOGGING__LEVEL=debug`. The three env vars the spec names
/// literally (`ENABLE_SCHEMA_VALIDATION`, `SIMULATE_LATENCY`,
/// `SIMULATE_PACKET_LOSS`) are applied last, unprefixed, exactly as named.
///
/// Any errors while reading/parsing are printed to stderr and defaults are
/// used; `load()` never fails.
#[must_use]
pub fn load() -> Config {
    use std::env;
    use std::io::Read;
    use std::path::PathBuf;

    let defaults = Config::default();
    let mut merged =
        serde_json::to_value(&defaults).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

    if let Ok(json) = env::var("SHOOTER_CONFIG_JSON") {
        if let Some(value) = parse_json_document(&json, "SHOOTER_CONFIG_JSON") {
            merge_values(&mut merged, value);
        }
    }

    if let Ok(val) = env::var("SHOOTER_CONFIG_STDIN") {
        if env_var_truthy(&val) {
            let mut buf = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
                eprintln!("Failed to read config from stdin: {e}");
            } else if let Some(value) = parse_json_document(&buf, "stdin") {
                merge_values(&mut merged, value);
            }
        }
    }

    if let Ok(path) = env::var("SHOOTER_CONFIG_PATH") {
        merge_file_source(&mut merged, &PathBuf::from(path));
    }

    merge_file_source(&mut merged, &PathBuf::from("config.json"));

    if let Ok(exe_path) = env::current_exe() {
        if let Some(mut exe_dir) = exe_path.parent().map(std::path::Path::to_path_buf) {
            exe_dir.push("config.json");
            merge_file_source(&mut merged, &exe_dir);
        }
    }

    apply_env_overrides(&mut merged);
    apply_literal_env_vars(&mut merged);

    match serde_json::from_value::<Config>(merged) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to deserialize config; using defaults: {e}");
            defaults
        }
    }
}

/// Applies the three spec-literal environment variables directly, bypassing
/// the `SHOOTER__` nested-override scheme since the spec names these bare.
fn apply_literal_env_vars(root: &mut Value) {
    use std::env;

    if let Ok(val) = env::var("ENABLE_SCHEMA_VALIDATION") {
        set_nested_value(
            root,
            &["schema".to_string(), "validate_egress".to_string()],
            Value::Bool(env_var_truthy(&val)),
        );
    }

    if let Ok(val) = env::var("SIMULATE_LATENCY") {
        if let Ok(ms) = val.trim().parse::<u64>() {
            set_nested_value(
                root,
                &[
                    "network_sim".to_string(),
                    "simulate_latency_ms".to_string(),
                ],
                Value::Number(ms.min(300).into()),
            );
        }
    }

    if let Ok(val) = env::var("SIMULATE_PACKET_LOSS") {
        if let Ok(pct) = val.trim().parse::<u64>() {
            set_nested_value(
                root,
                &[
                    "network_sim".to_string(),
                    "simulate_packet_loss_percent".to_string(),
                ],
                Value::Number(pct.min(20).into()),
            );
        }
    }
}

fn parse_json_document(raw: &str, label: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }

    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            eprintln!("Failed to parse config from {label}: {err}");
            None
        }
    }
}

fn merge_file_source(target: &mut Value, path: &Path) {
    if path.as_os_str().is_empty() || !path.exists() {
        return;
    }

    match fs::read_to_string(path) {
        Ok(contents) => {
            if let Some(value) = parse_json_document(&contents, &format!("file {}", path.display()))
            {
                merge_values(target, value);
            }
        }
        Err(err) => {
            eprintln!("Failed to read config from {}: {}", path.display(), err);
        }
    }
}

fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target_slot, source_value) => {
            *target_slot = source_value;
        }
    }
}

fn apply_env_overrides(root: &mut Value) {
    for (key, raw_value) in std::env::vars() {
        let Some(stripped) = key.strip_prefix("SHOOTER__") else {
            continue;
        };

        let segments: Vec<String> = stripped
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        if segments.is_empty() {
            continue;
        }

        let value = parse_env_value(&raw_value);
        set_nested_value(root, &segments, value);
    }
}

fn env_var_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn parse_env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.contains(',') {
        let items = trimmed
            .split(',')
            .map(|segment| parse_scalar(segment.trim()))
            .collect::<Vec<_>>();
        return Value::Array(items);
    }

    parse_scalar(trimmed)
}

fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }

    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn set_nested_value(target: &mut Value, segments: &[String], value: Value) {
    if segments.is_empty() {
        *target = value;
        return;
    }

    if segments.len() == 1 {
        let map = ensure_object(target);
        #[allow(clippy::indexing_slicing)]
        map.insert(segments[0].clone(), value);
        return;
    }

    let map = ensure_object(target);
    #[allow(clippy::indexing_slicing)]
    let key = segments[0].clone();
    let entry = map
        .entry(key)
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    #[allow(clippy::indexing_slicing)]
    let rest = &segments[1..];
    set_nested_value(entry, rest, value);
}

fn ensure_object(value: &mut Value) -> &mut serde_json::Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(serde_json::Map::new());
    }

    #[allow(clippy::expect_used)]
    value
        .as_object_mut()
        .expect("value should be coerced into an object")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_nested_value_creates_intermediate_objects() {
        let mut root = Value::Object(serde_json::Map::new());
        set_nested_value(
            &mut root,
            &["server".to_string(), "room_capacity".to_string()],
            Value::Number(4.into()),
        );
        assert_eq!(root["server"]["room_capacity"], Value::Number(4.into()));
    }

    #[test]
    fn merge_values_overlays_nested_objects() {
        let mut target = serde_json::json!({"a": {"x": 1, "y": 2}});
        let source = serde_json::json!({"a": {"y": 3}});
        merge_values(&mut target, source);
        assert_eq!(target, serde_json::json!({"a": {"x": 1, "y": 3}}));
    }
}
