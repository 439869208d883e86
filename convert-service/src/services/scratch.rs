use service_core::error::AppError;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Per-request pair of scratch files: the staged upload and the converter
/// output. Both are removed when the pair is dropped, so every exit path
/// out of the handler (including cancellation) cleans up after itself.
pub struct ScratchPair {
    input: PathBuf,
    output: PathBuf,
}

impl ScratchPair {
    /// Write the upload bytes to a uniquely named input file and reserve a
    /// unique `.md` output path next to it. The input keeps the upload's
    /// extension so the converter can sniff the format.
    pub async fn stage(
        scratch_dir: &Path,
        original_name: &str,
        data: &[u8],
    ) -> Result<Self, AppError> {
        fs::create_dir_all(scratch_dir).await?;

        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin");

        let input = scratch_dir.join(format!("{}.{}", Uuid::new_v4(), extension));
        let output = scratch_dir.join(format!("{}.md", Uuid::new_v4()));

        fs::write(&input, data).await?;
        tracing::debug!(input = ?input, output = ?output, "Staged upload for conversion");

        Ok(Self { input, output })
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl Drop for ScratchPair {
    fn drop(&mut self) {
        for path in [&self.input, &self.output] {
            match std::fs::remove_file(path) {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    // Never overrides the request outcome.
                    tracing::warn!(path = ?path, error = %e, "Failed to remove scratch file");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stage_preserves_extension_and_writes_bytes() {
        let dir = std::env::temp_dir().join(format!("scratch-test-{}", Uuid::new_v4()));
        let pair = ScratchPair::stage(&dir, "report.docx", b"content")
            .await
            .expect("Failed to stage");

        assert_eq!(pair.input().extension().unwrap(), "docx");
        assert_eq!(pair.output().extension().unwrap(), "md");
        assert_eq!(std::fs::read(pair.input()).unwrap(), b"content");

        drop(pair);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn drop_removes_both_files() {
        let dir = std::env::temp_dir().join(format!("scratch-test-{}", Uuid::new_v4()));
        let pair = ScratchPair::stage(&dir, "notes.txt", b"content")
            .await
            .expect("Failed to stage");
        std::fs::write(pair.output(), b"# converted").expect("Failed to write output");

        let (input, output) = (pair.input().to_path_buf(), pair.output().to_path_buf());
        drop(pair);

        assert!(!input.exists());
        assert!(!output.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn drop_tolerates_missing_output() {
        let dir = std::env::temp_dir().join(format!("scratch-test-{}", Uuid::new_v4()));
        let pair = ScratchPair::stage(&dir, "notes.txt", b"content")
            .await
            .expect("Failed to stage");
        // Output was never produced (failed conversion); drop must not panic.
        drop(pair);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
