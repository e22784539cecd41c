use crate::error::{ApiError, Result};
use openapiv3::OpenAPI;
use pipeline_api_pipeline::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;

/// Top-level configuration file (YAML, camelCase keys).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// `OpenAPI` version written in the served document.
    #[serde(default = "default_openapi_version")]
    pub openapi: String,

    /// Document metadata.
    #[serde(default)]
    pub info: InfoConfig,

    /// Listen address (`host:port`). CLI/env settings take precedence.
    #[serde(default)]
    pub bind: Option<String>,

    /// In-memory resources served by the binary.
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            openapi: default_openapi_version(),
            info: InfoConfig::default(),
            bind: None,
            resources: Vec::new(),
        }
    }
}

fn default_openapi_version() -> String {
    "3.0.0".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Default for InfoConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            version: default_version(),
            description: None,
        }
    }
}

fn default_title() -> String {
    "Pipeline API".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// A resource backed by an in-memory pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    /// Singular resource name.
    pub name: String,

    /// Plural resource name (defaults to `name` + `"s"`).
    #[serde(default)]
    pub plural: Option<String>,

    /// JSON Schema of one resource (must be an object schema).
    pub model: Value,

    /// Only expose `read`.
    #[serde(default)]
    pub read_only: bool,

    /// Initial items.
    #[serde(default)]
    pub seed: Vec<JsonObject>,
}

impl ApiConfig {
    /// Load a config file. A missing file is an error (unlike the optional `--config` flag).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ApiError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        let cfg: Self = serde_yaml::from_str(&raw).map_err(|source| ApiError::ConfigParse {
            path: path.display().to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.info.title.trim().is_empty() {
            return Err(ApiError::Config("info.title must be non-empty".to_string()));
        }
        for r in &self.resources {
            if r.name.trim().is_empty() {
                return Err(ApiError::Config("resource name must be non-empty".to_string()));
            }
            if r.model.get("type").and_then(Value::as_str) != Some("object") {
                return Err(ApiError::Config(format!(
                    "model of resource '{}' must be an object schema",
                    r.name
                )));
            }
        }
        Ok(())
    }

    /// Initial `OpenAPI` document: version and info, no paths yet.
    pub fn document(&self) -> Result<OpenAPI> {
        let mut info = json!({
            "title": self.info.title,
            "version": self.info.version,
        });
        if let Some(description) = &self.info.description {
            info["description"] = json!(description);
        }
        Ok(serde_json::from_value(json!({
            "openapi": self.openapi,
            "info": info,
            "paths": {},
        }))?)
    }
}
