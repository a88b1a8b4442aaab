//! Per-call render options

use crate::error::{RenderError, Result};
use crate::template::{Map, Value};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Host-framework view settings that override engine defaults for one call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    /// Extension to use instead of the configured one
    #[serde(
        rename = "view engine",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub view_engine: Option<String>,

    /// Search directory to use instead of the configured one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<PathBuf>,
}

impl ViewSettings {
    pub fn with_view_engine(mut self, extension: impl Into<String>) -> Self {
        self.view_engine = Some(extension.into());
        self
    }

    pub fn with_views(mut self, views: impl Into<PathBuf>) -> Self {
        self.views = Some(views.into());
        self
    }
}

/// Caller locals plus optional view settings
///
/// Both are forwarded to every nested `include(...)`.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub locals: Map,
    pub settings: Option<ViewSettings>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.locals.insert(name.into(), value.into());
        self
    }

    pub fn with_settings(mut self, settings: ViewSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Build options from a JSON object
    ///
    /// A top-level `settings` key is lifted into [`ViewSettings`]; every other
    /// key becomes a local.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(mut object) = value else {
            return Err(RenderError::Config(format!(
                "render options must be a JSON object, got {}",
                json_type_name(&value)
            )));
        };

        let settings = match object.remove("settings") {
            Some(raw) => Some(
                serde_json::from_value::<ViewSettings>(raw)
                    .map_err(|e| RenderError::Config(format!("invalid settings: {}", e)))?,
            ),
            None => None,
        };

        let locals = object
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect();

        Ok(Self { locals, settings })
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_lifts_settings() {
        let options = RenderOptions::from_json(json!({
            "title": "Home",
            "count": 2,
            "settings": { "view engine": "html", "views": "/srv/views", "etag": true }
        }))
        .unwrap();

        assert_eq!(options.locals.get("title"), Some(&Value::from("Home")));
        assert_eq!(options.locals.get("count"), Some(&Value::Number(2.0)));
        assert!(!options.locals.contains_key("settings"));

        let settings = options.settings.unwrap();
        assert_eq!(settings.view_engine.as_deref(), Some("html"));
        assert_eq!(settings.views, Some(PathBuf::from("/srv/views")));
    }

    #[test]
    fn test_from_json_without_settings() {
        let options = RenderOptions::from_json(json!({ "a": null })).unwrap();
        assert!(options.settings.is_none());
        assert_eq!(options.locals.get("a"), Some(&Value::Null));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = RenderOptions::from_json(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("got array"));
    }

    #[test]
    fn test_builder() {
        let options = RenderOptions::new()
            .with_local("x", 1.0)
            .with_settings(ViewSettings::default().with_view_engine("txt"));
        assert_eq!(options.locals.get("x"), Some(&Value::Number(1.0)));
        assert_eq!(
            options.settings.and_then(|s| s.view_engine),
            Some("txt".to_string())
        );
    }
}
