use convert_service::config::ConvertConfig;
use convert_service::startup::Application;
use std::path::PathBuf;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub scratch_dir: PathBuf,
}

impl TestApp {
    /// Spawn the service with `cat` as the converter: output is a byte-for-
    /// byte copy of the uploaded file, which makes success paths checkable.
    pub async fn spawn() -> Self {
        Self::spawn_with("cat", 5).await
    }

    /// Spawn with an arbitrary stand-in converter argv and timeout. `false`
    /// simulates a converter crash, `true` an empty-output run, `sleep N`
    /// a hang.
    pub async fn spawn_with(converter: &str, timeout_secs: u64) -> Self {
        let scratch_dir = PathBuf::from(format!("target/test-scratch-{}", Uuid::new_v4()));

        let mut config = ConvertConfig::load().expect("Failed to load configuration");
        config.common.port = 0; // Random port for testing
        config.converter.command = converter.split_whitespace().map(str::to_string).collect();
        config.converter.timeout_secs = timeout_secs;
        config.converter.scratch_dir = scratch_dir.clone();

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("http://127.0.0.1:{}/health", port);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            scratch_dir,
        }
    }

    /// Files currently present in this app's scratch directory.
    pub fn scratch_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.scratch_dir) {
            Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Cleanup test resources (scratch directory).
    pub async fn cleanup(&self) {
        let _ = tokio::fs::remove_dir_all(&self.scratch_dir).await;
    }
}
