use pipeline_api_test_support::{KillOnDrop, pick_unused_port, wait_http_ok};
use serde_json::{Value, json};
use std::io::Write as _;
use std::process::{Command, Stdio};
use std::time::Duration;

const CONFIG: &str = r"
info:
  title: Zoo
  version: 2.0.0
resources:
  - name: mouse
    plural: mice
    model:
      type: object
      properties:
        id: { type: string, maxLength: 2 }
        name: { type: string }
    seed:
      - { id: m1, name: Jerry }
  - name: keeper
    readOnly: true
    model:
      type: object
      properties:
        id: { type: integer }
        name: { type: string }
    seed:
      - { id: 1, name: Ann }
";

fn spawn_server(config: &std::path::Path, port: u16) -> anyhow::Result<KillOnDrop> {
    let child = Command::new(env!("CARGO_BIN_EXE_pipeline-api-server"))
        .arg("--config")
        .arg(config)
        .arg("--bind")
        .arg(format!("127.0.0.1:{port}"))
        .env("PIPELINE_API_LOG", "warn")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(KillOnDrop(child))
}

#[tokio::test]
async fn serves_configured_resources() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(CONFIG.as_bytes())?;

    let port = pick_unused_port()?;
    let _server = spawn_server(file.path(), port)?;
    let base = format!("http://127.0.0.1:{port}");
    wait_http_ok(&format!("{base}/health"), Duration::from_secs(20)).await?;

    let client = reqwest::Client::new();

    let doc: Value = client.get(format!("{base}/api.json")).send().await?.json().await?;
    assert_eq!(doc["info"]["title"], json!("Zoo"));
    assert!(doc["paths"].get("/mice").is_some());
    assert!(doc["paths"]["/keepers"].get("post").is_none());
    assert!(doc["components"]["schemas"].get("Keeper").is_some());

    let mice: Value = client.get(format!("{base}/mice")).send().await?.json().await?;
    assert_eq!(mice["data"][0]["name"], json!("Jerry"));

    let keeper = client.get(format!("{base}/keepers/1")).send().await?;
    assert_eq!(keeper.status().as_u16(), 200);
    assert_eq!(keeper.json::<Value>().await?["name"], json!("Ann"));

    let not_a_number = client.get(format!("{base}/keepers/abc")).send().await?;
    assert_eq!(not_a_number.status().as_u16(), 400);

    let bad_id = client.get(format!("{base}/mice/badId")).send().await?;
    assert_eq!(bad_id.status().as_u16(), 400);

    let rejected = client
        .post(format!("{base}/keepers"))
        .json(&json!({ "id": 2, "name": "Bob" }))
        .send()
        .await?;
    assert_eq!(rejected.status().as_u16(), 405);

    Ok(())
}

#[test]
fn invalid_config_exits_non_zero() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(b"resources:\n  - name: x\n    model: { type: string }\n")?;

    let status = Command::new(env!("CARGO_BIN_EXE_pipeline-api-server"))
        .arg("--config")
        .arg(file.path())
        .arg("--bind")
        .arg("127.0.0.1:0")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    assert!(!status.success());
    Ok(())
}
