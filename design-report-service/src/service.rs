use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use report_flow::{GeneratorConfig, MediaType, RawDocument, ReportPipeline};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::figma::FigmaClient;
use crate::models::ReportResponse;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ReportPipeline>,
    pub figma: Arc<FigmaClient>,
}

pub fn create_app(config: &GeneratorConfig) -> Router {
    let state = AppState {
        pipeline: Arc::new(ReportPipeline::from_config(config)),
        figma: Arc::new(FigmaClient::from_env()),
    };
    build_router(state)
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/report", post(create_report))
        .route("/sample-report", post(sample_report))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Design Report Service",
        "version": "1.0.0",
        "description": "Turns uploaded product briefs into UI design reports and Figma files",
        "endpoints": {
            "POST /report": "Upload a brief (multipart field 'file') and receive a UI report",
            "POST /sample-report": "Generate a report from the configured sample document",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "provider": state.pipeline.provider_name(),
        "has_figma_access": state.figma.has_real_access(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

struct Upload {
    bytes: Vec<u8>,
    file_name: Option<String>,
    content_type: Option<String>,
}

async fn create_report(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<ReportResponse> {
    let upload = read_upload(&mut multipart).await?;
    info!(
        file_name = upload.file_name.as_deref().unwrap_or("<unnamed>"),
        size = upload.bytes.len(),
        "processing uploaded brief"
    );
    Ok(Json(process_document(&state, upload).await))
}

/// Generate a report from the document at `SAMPLE_DOCUMENT_PATH`.
async fn sample_report(State(state): State<AppState>) -> ApiResult<ReportResponse> {
    let path = std::env::var("SAMPLE_DOCUMENT_PATH")
        .unwrap_or_else(|_| "./sample-data/ecommerce_brief.pdf".to_string());

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| internal_error("could not read sample document", &e.to_string()))?;

    let upload = Upload {
        bytes,
        file_name: Some(path),
        content_type: None,
    };
    Ok(Json(process_document(&state, upload).await))
}

/// Shared flow behind both endpoints: pipeline, project-name backfill from
/// the file name, design-file duplication.
async fn process_document(state: &AppState, upload: Upload) -> ReportResponse {
    let media_type = MediaType::sniff(upload.content_type.as_deref(), upload.file_name.as_deref());
    let raw = RawDocument::new(upload.bytes, media_type);

    let mut report = state.pipeline.process(&raw).await;
    if report.project_name.is_empty() {
        report.project_name = project_name_from_file(upload.file_name.as_deref());
    }

    let design_url = state.figma.create_file(&report.project_name).await;
    ReportResponse { design_url, report }
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request_error(&format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request_error(&format!("could not read upload: {e}")))?
            .to_vec();
        return Ok(Upload {
            bytes,
            file_name,
            content_type,
        });
    }
    Err(bad_request_error("multipart field 'file' is required"))
}

/// Title-cased project name from an uploaded file name, used when the model
/// did not surface one.
fn project_name_from_file(file_name: Option<&str>) -> String {
    let stem = file_name
        .map(std::path::Path::new)
        .and_then(|path| path.file_stem())
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();

    let name = stem
        .replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if name.is_empty() {
        "Untitled Project".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use report_flow::Provider;
    use tower::ServiceExt;

    #[test]
    fn project_name_is_title_cased_from_file_stem() {
        assert_eq!(
            project_name_from_file(Some("gadget_shop-brief.pdf")),
            "Gadget Shop Brief"
        );
        assert_eq!(project_name_from_file(Some("brief.docx")), "Brief");
        assert_eq!(project_name_from_file(None), "Untitled Project");
        assert_eq!(project_name_from_file(Some(".pdf")), "Untitled Project");
    }

    #[tokio::test]
    async fn health_reports_provider_and_figma_access() {
        let config = GeneratorConfig::new(Provider::Groq, "test-key", "test-model");
        let app = create_app(&config);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["provider"], "groq");
    }

    #[tokio::test]
    async fn report_without_file_field_is_a_bad_request() {
        let config = GeneratorConfig::new(Provider::Groq, "test-key", "test-model");
        let app = create_app(&config);

        let body = "--boundary\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--boundary--\r\n";
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/report")
                    .header("content-type", "multipart/form-data; boundary=boundary")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
