//! Transport contract.
//!
//! A transport is a way to expose pipelines to an external interface: REST routes, web
//! sockets, query languages, ... The registry ([`crate::Api`]) drives every transport through
//! the same lifecycle: [`Transport::init`] exactly once, then [`Transport::use_pipeline`] once
//! per registered pipeline, in registration order.

use crate::error::{ApiError, Result};
use axum::Router;
use axum::routing::MethodRouter;
use openapiv3::OpenAPI;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use pipeline_api_pipeline::Pipeline;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub trait Transport: Send {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Bind this transport to the registry's server and document.
    fn init(&mut self, surface: &mut ApiSurface) -> Result<()>;

    /// Expose one pipeline. Errors propagate unchanged to the caller of
    /// [`crate::Api::use_pipeline`].
    fn use_pipeline(
        &mut self,
        surface: &mut ApiSurface,
        registration: &PipelineRegistration,
    ) -> Result<()>;
}

/// A pipeline registered under a singular and a plural resource name.
#[derive(Clone)]
pub struct PipelineRegistration {
    pipeline: Arc<dyn Pipeline>,
    name: String,
    plural_name: String,
}

impl PipelineRegistration {
    #[must_use]
    pub fn new(pipeline: Arc<dyn Pipeline>, name: &str, plural_name: &str) -> Self {
        Self {
            pipeline,
            name: name.to_string(),
            plural_name: plural_name.to_string(),
        }
    }

    #[must_use]
    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    /// Singular name, used to address a single resource.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plural name, used to address the collection.
    #[must_use]
    pub fn plural_name(&self) -> &str {
        &self.plural_name
    }
}

impl fmt::Debug for PipelineRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRegistration")
            .field("name", &self.name)
            .field("plural_name", &self.plural_name)
            .finish_non_exhaustive()
    }
}

/// What a transport binds to: the HTTP router being assembled and the `OpenAPI` document.
///
/// The document is shared with the `/api.json` handler, so writes through
/// [`ApiSurface::document_mut`] are visible to clients immediately.
pub struct ApiSurface {
    router: Router,
    routed_paths: HashSet<String>,
    document: Arc<RwLock<OpenAPI>>,
}

impl ApiSurface {
    /// Surface whose router already serves `document_path`.
    pub(crate) fn serving(
        document: Arc<RwLock<OpenAPI>>,
        document_path: &'static str,
        document_route: MethodRouter,
    ) -> Self {
        Self {
            router: Router::new().route(document_path, document_route),
            routed_paths: HashSet::from([document_path.to_string()]),
            document,
        }
    }

    /// Route `path` to `method_router`.
    ///
    /// Paths axum would refuse (see [`validate_route_path`]) are a [`ApiError::Config`], and
    /// each path is routed once: a second registration is a [`ApiError::NameCollision`].
    /// Neither case reaches axum's route panics.
    pub fn route(&mut self, path: &str, method_router: MethodRouter) -> Result<&mut Self> {
        validate_route_path(path)?;
        if self.routed_paths.contains(path) {
            return Err(ApiError::NameCollision(format!(
                "route '{path}' is already registered"
            )));
        }
        self.routed_paths.insert(path.to_string());
        self.router = std::mem::take(&mut self.router).route(path, method_router);
        Ok(self)
    }

    #[must_use]
    pub fn is_routed(&self, path: &str) -> bool {
        self.routed_paths.contains(path)
    }

    #[must_use]
    pub fn document(&self) -> RwLockReadGuard<'_, OpenAPI> {
        self.document.read()
    }

    pub fn document_mut(&mut self) -> RwLockWriteGuard<'_, OpenAPI> {
        self.document.write()
    }

    pub(crate) fn router(&self) -> Router {
        self.router.clone()
    }

    pub(crate) fn into_router(self) -> Router {
        self.router
    }
}

/// Check `path` against a subset of the route syntax accepted by [`Router::route`].
///
/// A path starts with `/` and has no empty segments; segments are either literal (no braces, not starting with `:` or
/// `*`) or a whole-segment `{name}` capture.
pub fn validate_route_path(path: &str) -> Result<()> {
    let invalid = |why: &str| -> Result<()> {
        Err(ApiError::Config(format!("invalid route path '{path}': {why}")))
    };
    let Some(rest) = path.strip_prefix('/') else {
        return invalid("must start with '/'");
    };
    if rest.is_empty() {
        return Ok(());
    }
    for segment in rest.split('/') {
        if segment.is_empty() {
            return invalid("empty segment");
        }
        if segment.starts_with([':', '*']) {
            return invalid("segments must not start with ':' or '*'");
        }
        if let Some(name) = segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
        {
            if name.is_empty() || name.starts_with('*') || name.contains(['{', '}']) {
                return invalid("captures must be a plain '{name}'");
            }
        } else if segment.contains(['{', '}']) {
            return invalid("braces are only allowed around a whole segment");
        }
    }
    Ok(())
}
