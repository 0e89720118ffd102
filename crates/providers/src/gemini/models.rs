use chat_core::{ChatError, Model};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

static MAJOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"gemini-(\d+)").unwrap());

const EXCLUDED: [&str; 3] = ["vision", "embedding", "multimodal"];

/// Used whenever the live list is empty or unavailable.
pub fn fallback_models() -> Vec<Model> {
    vec![
        Model::new("gemini-2.0-flash-exp", "Gemini 2.0 Flash (Experimental)"),
        Model::new(
            "gemini-2.0-flash-thinking-exp-01-21",
            "Gemini 2.0 Think Flash (Experimental)",
        ),
        Model::new("gemini-2.5-pro-exp-03-25", "Gemini 2.5 Pro (Experimental)"),
        Model::new("gemini-3.0-flash-exp", "Gemini 3.0 Flash (Experimental)"),
    ]
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModel {
    name: String,
    display_name: Option<String>,
    /// Left untyped so an odd shape does not reject the whole entry.
    supported_generation_methods: Option<Value>,
}

fn is_v2_plus(name: &str) -> bool {
    MAJOR_RE
        .captures(name)
        .and_then(|c| c[1].parse::<u32>().ok())
        .map(|major| major >= 2)
        .unwrap_or(false)
}

fn keep(raw: &RawModel) -> bool {
    if !is_v2_plus(&raw.name) || EXCLUDED.iter().any(|x| raw.name.contains(x)) {
        return false;
    }
    match raw.supported_generation_methods.as_ref().and_then(Value::as_array) {
        Some(methods) => methods.iter().any(|m| m.as_str() == Some("generateContent")),
        None => true,
    }
}

/// Filter and normalize a `models.list` payload.
///
/// A payload without a `models` array is a decode error. Individual entries
/// that do not parse are skipped.
pub fn parse_model_list(payload: &Value) -> Result<Vec<Model>, ChatError> {
    let entries = payload
        .get("models")
        .and_then(Value::as_array)
        .ok_or_else(|| ChatError::Decode("response has no \"models\" array".into()))?;
    let models = entries
        .iter()
        .filter_map(|v| serde_json::from_value::<RawModel>(v.clone()).ok())
        .filter(keep)
        .map(|raw| {
            let id = raw
                .name
                .strip_prefix("models/")
                .unwrap_or(&raw.name)
                .to_string();
            Model {
                id,
                name: Some(raw.display_name.unwrap_or(raw.name)),
            }
        })
        .collect();
    Ok(models)
}
