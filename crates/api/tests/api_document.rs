use pipeline_api::{Api, ApiConfig, RestTransport};
use pipeline_api_pipeline::MemoryPipeline;
use pipeline_api_test_support::TestServer;
use serde_json::{Value, json};
use std::sync::Arc;

fn unit_test_api() -> Api {
    let document = serde_json::from_value(json!({
        "openapi": "3.0.0",
        "info": { "version": "1.0.0", "title": "Unit test Api" },
        "paths": {},
    }))
    .expect("valid document");
    Api::new(document)
}

#[tokio::test]
async fn serves_api_document_without_transports_or_pipelines() -> anyhow::Result<()> {
    let api = unit_test_api();
    let server = TestServer::start(api.into_router()).await?;

    let resp = reqwest::get(server.url("/api.json")).await?;
    assert_eq!(resp.status().as_u16(), 200);
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    assert_eq!(content_type.as_deref(), Some("application/json"));

    let body: Value = resp.json().await?;
    for key in ["openapi", "info", "paths", "components"] {
        assert!(body.get(key).is_some(), "api.json is missing '{key}': {body}");
    }
    assert_eq!(body["info"]["title"], json!("Unit test Api"));

    server.shutdown().await
}

#[tokio::test]
async fn api_document_lists_registered_resources() -> anyhow::Result<()> {
    let mut api = Api::from_config(&ApiConfig::default())?;
    api.configure(RestTransport::new())?;
    api.use_pipeline(
        Arc::new(MemoryPipeline::new(json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "name": { "type": "string" },
            },
        }))),
        "mouse",
        Some("mice"),
    )?;

    let server = TestServer::start(api.into_router()).await?;
    let body: Value = reqwest::get(server.url("/api.json")).await?.json().await?;

    assert_eq!(body["info"]["title"], json!("Pipeline API"));
    assert!(body["paths"].get("/mice").is_some());
    assert!(body["paths"].get("/mice/{id}").is_some());
    assert_eq!(body["paths"]["/mice"]["get"]["operationId"], json!("findMice"));
    assert!(body["components"]["schemas"].get("Mouse").is_some());

    server.shutdown().await
}
