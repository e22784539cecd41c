//! Expose pipelines as HTTP/`OpenAPI` endpoints.
//!
//! [`Api`] owns the `OpenAPI` document (served at `/api.json`) and a set of [`Transport`]s.
//! Every pipeline registered with [`Api::use_pipeline`] is forwarded to every transport;
//! [`rest::RestTransport`] maps it onto CRUD routes.
//!
//! Options whose key starts with [`options::INTERNAL_OPTION_MARKER`] are internal: they never
//! appear in generated parameter lists and clients cannot set them.

pub mod api;
pub mod config;
pub mod error;
pub mod options;
pub mod rest;
pub mod transport;

pub use api::{API_DOCUMENT_PATH, Api};
pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use rest::RestTransport;
pub use transport::{ApiSurface, PipelineRegistration, Transport};
