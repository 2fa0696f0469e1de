#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;

use monk_crud::auth::{generate_jwt, Claims};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let resources = concat!(env!("CARGO_MANIFEST_DIR"), "/resources");
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_monk-crud"));
        cmd.arg("--in-memory")
            .arg("--resource")
            .arg(format!("{}/users.yaml", resources))
            .arg("--resource")
            .arg(format!("{}/notes.yaml", resources))
            .env("MONK_API_PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // JWT_SECRET and APP_ENV are inherited so tokens minted here verify there
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Bearer token for a principal with the given id and access label
pub fn token(id: &str, access: &str) -> String {
    generate_jwt(&Claims::new(id, access)).expect("jwt secret configured for tests")
}

/// Fresh principal id so tests sharing one server never see each other's documents
pub fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

/// Read the body as JSON, failing with the raw text when it is not JSON
pub async fn json_body(res: reqwest::Response) -> Result<Value> {
    let text = res.text().await?;
    serde_json::from_str(&text).with_context(|| format!("non-JSON body: {}", text))
}
