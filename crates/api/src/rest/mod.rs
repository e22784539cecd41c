//! REST transport.
//!
//! Maps a pipeline registered as `name`/`plural` onto:
//!
//! | Route | Pipeline call |
//! |---|---|
//! | `GET /{plural}` | `read` |
//! | `POST /{plural}` | `create` (object or array body) |
//! | `GET /{plural}/{id}` | `read` with `id` in the query |
//! | `PUT /{plural}/{id}` | `update` |
//! | `PATCH /{plural}/{id}` | `patch` with `id` in the query |
//! | `DELETE /{plural}/{id}` | `delete` with `id` in the query |
//!
//! Only operations in the pipeline's capability set are routed. Inputs are validated against
//! the pipeline's declared schemas; violations answer `400 Bad Request`.

mod error;
mod handlers;
mod openapi;
mod request;
mod validation;

use crate::error::{ApiError, Result};
use crate::transport::{ApiSurface, PipelineRegistration, Transport, validate_route_path};
use axum::routing::MethodRouter;
use handlers::RestResource;
use openapiv3::ReferenceOr;
use pipeline_api_pipeline::Operation;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct RestTransport {
    prefix: String,
    initialized: bool,
    resources: Vec<String>,
}

impl RestTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount every resource below `prefix` (e.g. `/v1`).
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Plural names exposed so far, in registration order.
    #[must_use]
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    fn validate_prefix(&self) -> Result<()> {
        let p = &self.prefix;
        if p.is_empty() {
            return Ok(());
        }
        if !p.starts_with('/') || p.ends_with('/') || p.contains(['{', '}']) {
            return Err(ApiError::Config(format!(
                "REST prefix '{p}' must start with '/', must not end with '/' and must not contain path parameters"
            )));
        }
        validate_route_path(p)
    }
}

fn validate_segment(plural: &str) -> Result<()> {
    if plural.is_empty()
        || plural.starts_with([':', '*'])
        || plural.contains(['/', '{', '}', '?', '#'])
    {
        return Err(ApiError::Config(format!(
            "'{plural}' cannot be used as a REST path segment"
        )));
    }
    Ok(())
}

impl Transport for RestTransport {
    fn name(&self) -> &str {
        "rest"
    }

    fn init(&mut self, _surface: &mut ApiSurface) -> Result<()> {
        if self.initialized {
            return Err(ApiError::Startup(
                "REST transport is already initialized".to_string(),
            ));
        }
        self.validate_prefix()?;
        self.initialized = true;
        tracing::debug!(prefix = %self.prefix, "REST transport initialized");
        Ok(())
    }

    fn use_pipeline(
        &mut self,
        surface: &mut ApiSurface,
        registration: &PipelineRegistration,
    ) -> Result<()> {
        if !self.initialized {
            return Err(ApiError::Startup(
                "REST transport used before init".to_string(),
            ));
        }
        let plural = registration.plural_name();
        validate_segment(plural)?;

        let collection_path = format!("{}/{plural}", self.prefix);
        let item_path = format!("{collection_path}/{{id}}");
        for path in [&collection_path, &item_path] {
            if surface.is_routed(path) || surface.document().paths.paths.contains_key(path) {
                return Err(ApiError::NameCollision(format!(
                    "path '{path}' is already registered"
                )));
            }
        }

        // Everything that can fail on bad schemas runs before the surface is touched.
        let resource = Arc::new(RestResource::compile(registration)?);
        let paths = openapi::resource_paths(registration)?;

        let mut collection: MethodRouter<Arc<RestResource>> = MethodRouter::new();
        let mut collection_routed = false;
        if resource.supports(Operation::Read) {
            collection = collection.get(handlers::find);
            collection_routed = true;
        }
        if resource.supports(Operation::Create) {
            collection = collection.post(handlers::create);
            collection_routed = true;
        }

        let mut item: MethodRouter<Arc<RestResource>> = MethodRouter::new();
        let mut item_routed = false;
        if resource.supports(Operation::Read) {
            item = item.get(handlers::get_one);
            item_routed = true;
        }
        if resource.supports(Operation::Update) {
            item = item.put(handlers::replace);
            item_routed = true;
        }
        if resource.supports(Operation::Patch) {
            item = item.patch(handlers::patch);
            item_routed = true;
        }
        if resource.supports(Operation::Delete) {
            item = item.delete(handlers::remove);
            item_routed = true;
        }

        if collection_routed {
            surface.route(&collection_path, collection.with_state(Arc::clone(&resource)))?;
        }
        if item_routed {
            surface.route(&item_path, item.with_state(resource))?;
        }

        {
            let mut document = surface.document_mut();
            if let Some(p) = paths.collection {
                document
                    .paths
                    .paths
                    .insert(collection_path.clone(), ReferenceOr::Item(p));
            }
            if let Some(p) = paths.item {
                document
                    .paths
                    .paths
                    .insert(item_path.clone(), ReferenceOr::Item(p));
            }
        }

        tracing::info!(
            resource = %registration.name(),
            collection = %collection_path,
            item = %item_path,
            "REST routes registered"
        );
        self.resources.push(plural.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_must_be_a_plain_absolute_path() {
        assert!(RestTransport::new().validate_prefix().is_ok());
        assert!(RestTransport::with_prefix("/v1").validate_prefix().is_ok());
        assert!(RestTransport::with_prefix("v1").validate_prefix().is_err());
        assert!(RestTransport::with_prefix("/v1/").validate_prefix().is_err());
        assert!(RestTransport::with_prefix("/{tenant}").validate_prefix().is_err());
        assert!(RestTransport::with_prefix("/:v1").validate_prefix().is_err());
        assert!(RestTransport::with_prefix("/api/*rest").validate_prefix().is_err());
        assert!(RestTransport::with_prefix("//v1").validate_prefix().is_err());
    }

    #[test]
    fn plural_names_must_be_single_segments() {
        assert!(validate_segment("tests").is_ok());
        assert!(validate_segment("").is_err());
        assert!(validate_segment("a/b").is_err());
        assert!(validate_segment("{id}").is_err());
        assert!(validate_segment(":x").is_err());
        assert!(validate_segment("*rest").is_err());
        assert!(validate_segment("a:b").is_ok());
    }
}
