use crate::dtos::LivenessProbe;
use crate::services::ScratchPair;
use crate::startup::AppState;
use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use service_core::error::AppError;
use std::path::Path;
use std::time::Instant;

/// Largest JSON body accepted on the liveness path.
const JSON_BODY_LIMIT: usize = 64 * 1024;

/// POST /convert: accepts a multipart upload in the `file` field, runs the
/// external converter on it and returns the Markdown as an attachment. A
/// JSON body is treated as a liveness probe instead.
pub async fn convert_file(
    State(state): State<AppState>,
    req: Request,
) -> Result<Response, AppError> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.starts_with("application/json") {
        let body = axum::body::to_bytes(req.into_body(), JSON_BODY_LIMIT)
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read body: {}", e)))?;
        let probe: LivenessProbe = serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid JSON body: {}", e)))?;

        if probe.test {
            tracing::info!("Received test request");
            return Ok((StatusCode::OK, Json(json!({"status": "ok"}))).into_response());
        }
        // A real conversion request never arrives as JSON.
        return Err(AppError::BadRequest(anyhow::anyhow!("No file part")));
    }

    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("No file part")))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        // A field without a filename is a plain value, not a file part.
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if original_name.is_empty() {
            tracing::error!("No selected file");
            return Err(AppError::BadRequest(anyhow::anyhow!("No selected file")));
        }

        let data = field.bytes().await.map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e))
        })?;
        upload = Some((original_name, data));
        break;
    }

    let (original_name, data) = upload.ok_or_else(|| {
        tracing::error!("No file part in request");
        AppError::BadRequest(anyhow::anyhow!("No file part"))
    })?;

    tracing::info!(
        filename = %original_name,
        size = data.len(),
        "Processing file"
    );

    // Scratch files are removed when `scratch` drops, on every exit path.
    let scratch = ScratchPair::stage(
        &state.config.converter.scratch_dir,
        &original_name,
        &data,
    )
    .await?;

    let started = Instant::now();
    let result = state
        .converter
        .convert(scratch.input(), scratch.output())
        .await;
    metrics::histogram!("conversion_duration_seconds").record(started.elapsed().as_secs_f64());

    let outcome = if result.is_ok() { "success" } else { "failure" };
    metrics::counter!("conversions_total", "outcome" => outcome).increment(1);
    result?;

    let converted = tokio::fs::read(scratch.output()).await?;
    let download_name = markdown_name(&original_name);

    tracing::info!(
        filename = %original_name,
        download_name = %download_name,
        output_size = converted.len(),
        "Conversion completed"
    );

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                "text/markdown; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download_name),
            ),
        ],
        converted,
    )
        .into_response())
}

/// OPTIONS /convert: cross-origin preflight.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Attachment name for the converted document: the sanitized base name of
/// the upload with its extension replaced by `.md`.
fn markdown_name(original: &str) -> String {
    let safe = secure_filename(original);
    let stem = Path::new(&safe)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    format!("{}.md", stem)
}

/// Reduce an untrusted filename to a safe flat name: path components are
/// stripped, whitespace runs collapse to a single `_`, anything else
/// outside `[A-Za-z0-9._-]` is dropped, and leading/trailing dots and
/// underscores are trimmed so the result is never hidden or relative.
fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let trimmed = cleaned.trim_matches(['.', '_']);
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_filename_strips_path_components() {
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("C:\\temp\\report.docx"), "report.docx");
    }

    #[test]
    fn secure_filename_collapses_whitespace_and_drops_unsafe_characters() {
        assert_eq!(secure_filename("my report (final).pdf"), "my_report_final.pdf");
        assert_eq!(secure_filename("r\u{e9}sum\u{e9}.doc"), "rsum.doc");
    }

    #[test]
    fn secure_filename_never_yields_hidden_or_empty_names() {
        assert_eq!(secure_filename(".bashrc"), "bashrc");
        assert_eq!(secure_filename("..."), "file");
        assert_eq!(secure_filename("///"), "file");
    }

    #[test]
    fn markdown_name_replaces_extension() {
        assert_eq!(markdown_name("report.docx"), "report.md");
        assert_eq!(markdown_name("archive.tar.gz"), "archive.tar.md");
        assert_eq!(markdown_name("no_extension"), "no_extension.md");
        assert_eq!(markdown_name("../../etc passwd.txt"), "etc_passwd.md");
    }
}
