use crate::config::ConverterConfig;
use service_core::error::AppError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Runs the configured external converter once per request: the staged
/// input file is wired to the child's stdin, captured stdout becomes the
/// output artifact. The command is an argv list; no shell is involved.
#[derive(Clone)]
pub struct MarkdownConverter {
    command: Vec<String>,
    timeout: Duration,
}

impl MarkdownConverter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            command: config.command.clone(),
            timeout: config.timeout(),
        }
    }

    pub async fn convert(&self, input: &Path, output: &Path) -> Result<(), AppError> {
        let input_file = tokio::fs::File::open(input).await?.into_std().await;

        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..])
            .stdin(Stdio::from(input_file))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            command = ?self.command,
            input = ?input,
            timeout_secs = %self.timeout.as_secs(),
            "Executing converter"
        );

        let result = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                tracing::error!(
                    command = ?self.command,
                    timeout_secs = %self.timeout.as_secs(),
                    "Converter timed out"
                );
                AppError::ConversionFailed(anyhow::anyhow!(
                    "Converter timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            tracing::error!(
                command = ?self.command,
                status = %result.status,
                stderr = %stderr,
                "Converter failed"
            );
            return Err(AppError::ConversionFailed(anyhow::anyhow!(
                "Converter exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        if !result.stderr.is_empty() {
            tracing::warn!(
                stderr = %String::from_utf8_lossy(&result.stderr),
                "Converter stderr"
            );
        }

        tokio::fs::write(output, &result.stdout).await?;

        // The artifact itself is the source of truth for success.
        let size = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(AppError::ConversionFailed(anyhow::anyhow!(
                "Conversion produced no output"
            )));
        }

        tracing::debug!(output = ?output, output_size = size, "Converter succeeded");

        Ok(())
    }
}
