use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Create a minimal valid config with the scheduler disabled
fn minimal_config(port: u16, data_dir: &std::path::Path) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {port}

[database]
path = "{db}"

[storage]
descriptor_dir = "{torrents}"

[upstream]
feed_url = "http://127.0.0.1:9/rss.xml"
descriptor_url = "http://127.0.0.1:9/download.php?id={{id}}"

[trackers]
announce = ["http://bt.example/announce.php?uk={{token}}"]
"#,
        port = port,
        db = data_dir.join("test.db").display(),
        torrents = data_dir.join("torrents").display(),
    )
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &std::path::Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_episodecast"))
        .env("EPISODECAST_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_health_endpoint() {
    let port = get_available_port();
    let data_dir = TempDir::new().unwrap();

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(minimal_config(port, data_dir.path()).as_bytes())
        .unwrap();
    temp_file.flush().unwrap();

    let mut server = spawn_server(temp_file.path()).await;

    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["status"], "ok");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_episodecast"))
            .env("EPISODECAST_CONFIG", "/nonexistent/config.toml")
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_missing_upstream_section_exits_with_error() {
    let config_without_upstream = r#"
[server]
port = 8080

[trackers]
announce = ["http://bt.example/announce.php?uk={token}"]
"#;

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(config_without_upstream.as_bytes())
        .unwrap();
    temp_file.flush().unwrap();

    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_episodecast"))
            .env("EPISODECAST_CONFIG", temp_file.path())
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}
