//! API registry.
//!
//! Owns the `OpenAPI` document and the configured transports, and forwards every registered
//! pipeline to every transport.

use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::options;
use crate::transport::{ApiSurface, PipelineRegistration, Transport};
use axum::routing::{MethodRouter, get};
use axum::{Json, Router};
use openapiv3::{Components, OpenAPI, Parameter, ReferenceOr, Schema};
use parking_lot::RwLock;
use pipeline_api_pipeline::Pipeline;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Path of the JSON `OpenAPI` document endpoint.
pub const API_DOCUMENT_PATH: &str = "/api.json";

pub struct Api {
    surface: ApiSurface,
    transports: Vec<Box<dyn Transport>>,
    registrations: Vec<PipelineRegistration>,
}

impl Api {
    /// Create a registry around `document` and route [`API_DOCUMENT_PATH`].
    ///
    /// `components` is created when absent so the served document always carries the
    /// `openapi`, `info`, `paths` and `components` keys.
    #[must_use]
    pub fn new(mut document: OpenAPI) -> Self {
        if document.components.is_none() {
            document.components = Some(Components::default());
        }
        let document = Arc::new(RwLock::new(document));
        let served = Arc::clone(&document);
        let route = get(move || {
            let served = Arc::clone(&served);
            async move { Json(served.read().clone()) }
        });

        Self {
            surface: ApiSurface::serving(document, API_DOCUMENT_PATH, route),
            transports: Vec::new(),
            registrations: Vec::new(),
        }
    }

    /// Create a registry from the `openapi`/`info` section of a config file.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Ok(Self::new(config.document()?))
    }

    /// Initialize `transport` and add it to the registry.
    ///
    /// Pipelines registered before this call are replayed to the new transport, in
    /// registration order, right after `init`.
    pub fn configure(&mut self, transport: impl Transport + 'static) -> Result<&mut Self> {
        let mut transport: Box<dyn Transport> = Box::new(transport);
        transport.init(&mut self.surface)?;
        for registration in &self.registrations {
            transport.use_pipeline(&mut self.surface, registration)?;
        }
        tracing::info!(
            transport = transport.name(),
            replayed = self.registrations.len(),
            "transport configured"
        );
        self.transports.push(transport);
        Ok(self)
    }

    /// Register `pipeline` under `name` (and `plural_name`, defaulting to `name` + `"s"`).
    ///
    /// Every transport receives the registration, then the model schema is published in
    /// `components.schemas` under the upper-first singular name. The first transport error is
    /// returned as is; the registration and its component are then not recorded, while routes
    /// added by transports earlier in the list stay.
    pub fn use_pipeline(
        &mut self,
        pipeline: Arc<dyn Pipeline>,
        name: &str,
        plural_name: Option<&str>,
    ) -> Result<&mut Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Config("pipeline name must be non-empty".to_string()));
        }
        let plural_name = plural_name
            .map(str::trim)
            .map_or_else(|| format!("{name}s"), str::to_string);
        if plural_name.is_empty() {
            return Err(ApiError::Config(format!(
                "plural name of '{name}' must be non-empty"
            )));
        }
        if let Some(existing) = self
            .registrations
            .iter()
            .find(|r| r.name() == name || r.plural_name() == plural_name)
        {
            return Err(ApiError::NameCollision(format!(
                "'{name}'/'{plural_name}' conflicts with registered pipeline '{}'/'{}'",
                existing.name(),
                existing.plural_name()
            )));
        }

        let (component, schema) = self.model_component(name, pipeline.schemas().model.clone())?;

        let registration = PipelineRegistration::new(pipeline, name, &plural_name);
        for transport in &mut self.transports {
            transport.use_pipeline(&mut self.surface, &registration)?;
        }
        self.surface
            .document_mut()
            .components
            .get_or_insert_with(Components::default)
            .schemas
            .insert(component, ReferenceOr::Item(schema));
        tracing::info!(
            resource = %name,
            plural = %plural_name,
            transports = self.transports.len(),
            "pipeline registered"
        );
        self.registrations.push(registration);
        Ok(self)
    }

    /// Component name and schema for the model of `name`, checked against the document.
    fn model_component(&self, name: &str, model: Value) -> Result<(String, Schema)> {
        let component = schema_component_name(name);
        let schema: Schema = serde_json::from_value(model).map_err(|e| {
            ApiError::Schema(format!("model schema of '{name}' is not an OpenAPI schema: {e}"))
        })?;

        let taken = self
            .surface
            .document()
            .components
            .as_ref()
            .is_some_and(|c| c.schemas.contains_key(&component));
        if taken {
            return Err(ApiError::NameCollision(format!(
                "component schema '{component}' is already defined"
            )));
        }
        Ok((component, schema))
    }

    /// Serve an extra route next to the transports' ones (health checks and the like).
    ///
    /// Routing a path first makes a later pipeline whose routes need it fail with
    /// [`ApiError::NameCollision`].
    pub fn route(&mut self, path: &str, method_router: MethodRouter) -> Result<&mut Self> {
        self.surface.route(path, method_router)?;
        Ok(self)
    }

    #[must_use]
    pub fn registrations(&self) -> &[PipelineRegistration] {
        &self.registrations
    }

    /// Snapshot of the current `OpenAPI` document.
    #[must_use]
    pub fn openapi(&self) -> OpenAPI {
        self.surface.document().clone()
    }

    /// Router with every route registered so far.
    #[must_use]
    pub fn router(&self) -> Router {
        self.surface.router()
    }

    #[must_use]
    pub fn into_router(self) -> Router {
        self.surface.into_router()
    }

    #[must_use]
    pub fn is_not_an_internal_option(&self, key: &str) -> bool {
        options::is_not_an_internal_option(key)
    }

    #[must_use]
    pub fn filter_internal_options(&self, options: &Map<String, Value>) -> Map<String, Value> {
        options::filter_internal_options(options)
    }

    #[must_use]
    pub fn filter_internal_parameters(
        &self,
        parameters: &[ReferenceOr<Parameter>],
    ) -> Vec<ReferenceOr<Parameter>> {
        options::filter_internal_parameters(parameters)
    }
}

/// `OpenAPI` component name of a resource: its singular name, upper-first.
#[must_use]
pub fn schema_component_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
