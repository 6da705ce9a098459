//! Managing the application under test - spawning and health checking

use std::process::{Child, Command, Stdio};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// How to start the application under test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Command to run, e.g. `target/debug/wirecheck-stub` or `python3`
    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments, e.g. `["app.py"]` for the upstream Flask service
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment for the child; `PORT` is always set
    #[serde(default)]
    pub env: Vec<(String, String)>,

    /// Port to listen on (None = find a free port)
    #[serde(default)]
    pub port: Option<u16>,

    /// Path polled until the service answers 2xx
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Startup budget in milliseconds
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
}

fn default_command() -> String {
    "target/debug/wirecheck-stub".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_startup_timeout_ms() -> u64 {
    30_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            env: Vec::new(),
            port: None,
            health_path: default_health_path(),
            startup_timeout_ms: default_startup_timeout_ms(),
        }
    }
}

/// Handle to a running application-under-test process.
pub struct ServerHandle {
    child: Child,
    base_url: String,
    pub port: u16,
}

impl ServerHandle {
    /// Spawn the application and wait until it answers health checks.
    pub async fn spawn(config: ServerConfig) -> E2eResult<Self> {
        let port = config.port.unwrap_or_else(find_free_port);
        let base_url = format!("http://127.0.0.1:{port}");

        info!("Spawning application under test on port {}", port);

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args).env("PORT", port.to_string());
        for (key, value) in &config.env {
            cmd.env(key, value);
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn {}: {e}", config.command))
        })?;

        let handle = ServerHandle {
            child,
            base_url,
            port,
        };

        handle
            .wait_for_healthy(
                &config.health_path,
                Duration::from_millis(config.startup_timeout_ms),
            )
            .await?;

        info!("Application is healthy at {}", handle.base_url);
        Ok(handle)
    }

    /// Poll the health path until it answers 2xx or the budget elapses.
    async fn wait_for_healthy(
        &self,
        health_path: &str,
        timeout_duration: Duration,
    ) -> E2eResult<()> {
        let health_url = format!("{}{}", self.base_url, health_path);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for application to start...");
                    }
                    // Connection refused is expected while the app starts
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    /// Base URL of the running application.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the application.
    pub fn stop(&mut self) -> E2eResult<()> {
        info!("Stopping application (pid: {})", self.child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        // Force kill if still running
        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Find a free port to use.
fn find_free_port() -> u16 {
    use std::net::TcpListener;

    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to find free port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_free_port() {
        let port1 = find_free_port();
        let port2 = find_free_port();

        // Ports should be in valid range
        assert!(port1 > 1024);
        assert!(port2 > 1024);
    }

    #[test]
    fn test_config_from_yaml() {
        let config: ServerConfig = serde_yaml::from_str(
            r#"
command: python3
args: ["app.py"]
env:
  - ["ENVIRONMENT", "test"]
port: 8081
"#,
        )
        .unwrap();
        assert_eq!(config.command, "python3");
        assert_eq!(config.args, vec!["app.py"]);
        assert_eq!(config.port, Some(8081));
        assert_eq!(config.health_path, "/health");
    }
}
