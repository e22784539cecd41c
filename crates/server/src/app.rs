use anyhow::Context as _;
use axum::Router;
use axum::routing::get;
use pipeline_api::config::ResourceConfig;
use pipeline_api::{Api, ApiConfig, RestTransport};
use pipeline_api_pipeline::{MemoryPipeline, Operation, SchemaSet};
use std::sync::Arc;

pub const DEFAULT_BIND: &str = "127.0.0.1:8089";
pub const HEALTH_PATH: &str = "/health";

fn resource_pipeline(resource: &ResourceConfig) -> MemoryPipeline {
    let mut schemas = SchemaSet::from_model(resource.model.clone());
    if resource.read_only {
        for op in Operation::ALL {
            if op != Operation::Read {
                schemas = schemas.without(op);
            }
        }
    }
    MemoryPipeline::with_schemas(schemas).with_items(resource.seed.iter().cloned())
}

/// Build the registry described by `config`: health check, REST transport, then one memory
/// pipeline per configured resource.
///
/// # Errors
///
/// Returns an error if the document is invalid or a resource cannot be registered (including
/// a resource whose routes would shadow [`HEALTH_PATH`]).
pub fn build_api(config: &ApiConfig) -> anyhow::Result<Api> {
    let mut api = Api::from_config(config).context("build API document")?;
    api.route(HEALTH_PATH, get(|| async { "ok" }))
        .context("route health check")?;
    api.configure(RestTransport::new())
        .context("configure REST transport")?;

    for resource in &config.resources {
        let pipeline = Arc::new(resource_pipeline(resource));
        api.use_pipeline(pipeline, &resource.name, resource.plural.as_deref())
            .with_context(|| format!("register resource '{}'", resource.name))?;
    }
    Ok(api)
}

/// Full application router.
///
/// # Errors
///
/// See [`build_api`].
pub fn build_router(config: &ApiConfig) -> anyhow::Result<Router> {
    Ok(build_api(config)?.into_router())
}

/// Resolve the listen address: explicit bind, then the config file, then [`DEFAULT_BIND`].
/// `port` replaces the port of whichever address wins.
///
/// # Errors
///
/// Returns an error if the chosen address has no `:port` suffix.
pub fn resolve_bind(
    cli_bind: Option<&str>,
    config_bind: Option<&str>,
    port: Option<u16>,
) -> anyhow::Result<String> {
    let bind = cli_bind.or(config_bind).unwrap_or(DEFAULT_BIND);
    let Some(port) = port else {
        return Ok(bind.to_string());
    };
    let (host, _) = bind
        .rsplit_once(':')
        .with_context(|| format!("bind address '{bind}' must be host:port"))?;
    Ok(format!("{host}:{port}"))
}
