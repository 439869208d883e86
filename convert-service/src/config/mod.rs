use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ConvertConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub converter: ConverterConfig,
    /// Upload size cap in MiB; 0 disables the cap entirely.
    pub max_upload_mb: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConverterConfig {
    /// Argv of the external converter. The first element is the program;
    /// no shell is involved at any point.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    /// Directory holding per-request scratch files.
    pub scratch_dir: PathBuf,
}

impl ConverterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ConvertConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let command_line = get_env(
            "CONVERTER_COMMAND",
            Some("docker run --rm -i markitdown:latest"),
            is_prod,
        )?;
        let command: Vec<String> = command_line
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if command.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "CONVERTER_COMMAND must name a program"
            )));
        }

        let timeout_secs = get_env("CONVERTER_TIMEOUT_SECS", Some("30"), is_prod)?
            .parse::<u64>()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid CONVERTER_TIMEOUT_SECS: {}", e))
            })?;

        let scratch_dir = match env::var("SCRATCH_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => env::temp_dir(),
        };

        // Uncapped by default: converter input is arbitrary documents and
        // the upstream surface accepts any size.
        let max_upload_mb = get_env("MAX_UPLOAD_MB", Some("0"), is_prod)?
            .parse::<u64>()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid MAX_UPLOAD_MB: {}", e))
            })?;

        Ok(ConvertConfig {
            common: common_config,
            converter: ConverterConfig {
                command,
                timeout_secs,
                scratch_dir,
            },
            max_upload_mb,
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}
