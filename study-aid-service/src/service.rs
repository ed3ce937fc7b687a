use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use study_core::{
    AnalysisResult, ComprehensiveAnalysis, FixedPacer, GeminiClient, ImageInput, ImageQuiz,
    PageAnalysis, QuestionResult, StudyAnalyzer, StudyError,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::{
    config::ServiceConfig,
    models::{
        AnalyzeImageRequest, AnalyzePageRequest, AnalyzePdfPageRequest, AnalyzeTextRequest,
        ImageQuizRequest, PageQuizRequest, QuizRequest,
    },
    pdf::PdfPages,
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message })))
}

fn upstream_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
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

fn study_error(operation: &str, err: StudyError) -> ApiError {
    let details = err.to_string();
    match err {
        StudyError::InvalidPageRange { .. }
        | StudyError::InvalidQuestionCount { .. }
        | StudyError::NoContent => {
            warn!("Rejected {} request: {}", operation, details);
            bad_request_error(&details)
        }
        StudyError::PageOutOfRange { .. } => not_found_error(&details),
        StudyError::PageSource(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "error": details })))
        }
        StudyError::Transport { status, .. } => {
            error!("{} failed: upstream returned {}", operation, status);
            upstream_error(&format!("{operation} failed"), &details)
        }
        StudyError::Http(_) | StudyError::EmptyResponse | StudyError::MalformedJson(_) => {
            error!("{} failed: {}", operation, details);
            upstream_error(&format!("{operation} failed"), &details)
        }
        StudyError::Config(_) => {
            error!("{} failed: {}", operation, details);
            internal_error(&format!("{operation} failed"), &details)
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub analyzer: StudyAnalyzer,
}

pub fn create_app(config: &ServiceConfig) -> Router {
    let client = GeminiClient::new(config.gemini.clone());
    let analyzer = StudyAnalyzer::new(Arc::new(client))
        .with_pacer(Arc::new(FixedPacer(config.page_delay)));

    build_router(AppState { analyzer }, config.max_body_bytes)
}

pub fn build_router(app_state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/analyze/image", post(analyze_image))
        .route("/analyze/text", post(analyze_text))
        .route("/analyze/page", post(analyze_page_text))
        .route("/analyze/pdf-page", post(analyze_pdf_page))
        .route("/analyze/comprehensive", post(analyze_comprehensive))
        .route("/quiz", post(generate_quiz))
        .route("/quiz/pages", post(generate_page_quiz))
        .route("/quiz/images", post(generate_image_quiz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "TNPSC Study Aid Service",
        "version": "1.0.0",
        "description": "AI-powered analysis of study material into key points, study points and quizzes",
        "endpoints": {
            "POST /analyze/image": "Analyze one image of study material",
            "POST /analyze/text": "Analyze a whole document's text",
            "POST /analyze/page": "Analyze the text of a single page",
            "POST /analyze/pdf-page": "Render and analyze one page of a PDF on disk",
            "POST /analyze/comprehensive": "Analyze OCR text page by page",
            "POST /quiz": "Generate questions from prior analyses",
            "POST /quiz/pages": "Generate questions for a page range of a comprehensive analysis",
            "POST /quiz/images": "Analyze images and generate one quiz from them",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

fn decode_image(payload: &crate::models::ImagePayload) -> Result<ImageInput, ApiError> {
    payload.decode().map_err(|e| bad_request_error(&e))
}

fn validate_text(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(bad_request_error("Text is required"));
    }
    Ok(())
}

async fn analyze_image(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeImageRequest>,
) -> ApiResult<AnalysisResult> {
    let image = decode_image(&request.image)?;
    info!("Image analysis requested ({} bytes)", image.data.len());

    state
        .analyzer
        .analyze_image(image, request.language)
        .await
        .map(Json)
        .map_err(|e| study_error("Image analysis", e))
}

async fn analyze_text(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeTextRequest>,
) -> ApiResult<AnalysisResult> {
    validate_text(&request.text)?;

    state
        .analyzer
        .analyze_text(&request.text, request.language)
        .await
        .map(Json)
        .map_err(|e| study_error("Document analysis", e))
}

async fn analyze_page_text(
    State(state): State<AppState>,
    Json(request): Json<AnalyzePageRequest>,
) -> ApiResult<PageAnalysis> {
    validate_text(&request.text)?;
    if request.page_number == 0 {
        return Err(bad_request_error("Page numbers start at 1"));
    }

    state
        .analyzer
        .analyze_page_text(request.page_number, &request.text, request.language)
        .await
        .map(Json)
        .map_err(|e| study_error("Page analysis", e))
}

async fn analyze_pdf_page(
    State(state): State<AppState>,
    Json(request): Json<AnalyzePdfPageRequest>,
) -> ApiResult<PageAnalysis> {
    if request.pdf_path.trim().is_empty() {
        return Err(bad_request_error("PDF path is required"));
    }
    info!(
        "PDF page analysis requested: {} page {}",
        request.pdf_path, request.page_number
    );

    let pdf = PdfPages::open(&request.pdf_path)
        .await
        .map_err(|e| study_error("PDF page analysis", e))?;

    state
        .analyzer
        .analyze_page(&pdf, request.page_number, request.language)
        .await
        .map(Json)
        .map_err(|e| study_error("PDF page analysis", e))
}

async fn analyze_comprehensive(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeTextRequest>,
) -> ApiResult<ComprehensiveAnalysis> {
    validate_text(&request.text)?;

    info!(
        "Comprehensive analysis requested ({} characters)",
        request.text.chars().count()
    );

    let result = state
        .analyzer
        .analyze_comprehensive(&request.text, request.language)
        .await;
    Ok(Json(result))
}

async fn generate_quiz(
    State(state): State<AppState>,
    Json(request): Json<QuizRequest>,
) -> ApiResult<QuestionResult> {
    state
        .analyzer
        .generate_questions(&request.analyses, &request.options)
        .await
        .map(Json)
        .map_err(|e| study_error("Question generation", e))
}

async fn generate_page_quiz(
    State(state): State<AppState>,
    Json(request): Json<PageQuizRequest>,
) -> ApiResult<QuestionResult> {
    state
        .analyzer
        .generate_questions_for_pages(
            &request.document,
            request.start_page,
            request.end_page,
            &request.options,
        )
        .await
        .map(Json)
        .map_err(|e| study_error("Question generation", e))
}

async fn generate_image_quiz(
    State(state): State<AppState>,
    Json(request): Json<ImageQuizRequest>,
) -> ApiResult<ImageQuiz> {
    let images = request
        .images
        .iter()
        .map(decode_image)
        .collect::<Result<Vec<_>, _>>()?;

    state
        .analyzer
        .analyze_images_and_generate_questions(&images, &request.options)
        .await
        .map(Json)
        .map_err(|e| study_error("Image quiz generation", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use study_core::{ContentRequest, GenerativeModel, NoPacing};
    use tower::ServiceExt;

    /// Replies with the same text (or status) to every prompt
    struct CannedModel {
        reply: Result<String, u16>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerativeModel for CannedModel {
        async fn generate(&self, _request: &ContentRequest) -> study_core::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(StudyError::Transport {
                    status: *status,
                    body: "upstream".to_string(),
                }),
            }
        }
    }

    fn app(reply: Result<&str, u16>) -> (Router, Arc<CannedModel>) {
        let model = Arc::new(CannedModel {
            reply: reply.map(str::to_string),
            calls: AtomicUsize::new(0),
        });
        let analyzer = StudyAnalyzer::new(model.clone()).with_pacer(Arc::new(NoPacing));
        (build_router(AppState { analyzer }, 1024 * 1024), model)
    }

    async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _) = app(Ok("{}"));
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_analyze_text_returns_camel_case_defaults() {
        let (router, _) = app(Ok("```json\n{\"keyPoints\": [\"Kaveri\"]}\n```"));
        let (status, body) = post_json(
            router,
            "/analyze/text",
            json!({"text": "Rivers of Tamil Nadu", "language": "english"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["keyPoints"], json!(["Kaveri"]));
        assert_eq!(body["summary"], "");
        assert_eq!(body["studyPoints"], json!([]));
        assert_eq!(body["tnpscCategories"], json!([]));
    }

    #[tokio::test]
    async fn test_reversed_page_range_is_rejected_without_upstream_call() {
        let (router, model) = app(Ok("{}"));
        let (status, body) = post_json(
            router,
            "/quiz/pages",
            json!({
                "document": {"pageAnalyses": [{"pageNumber": 3, "keyPoints": ["x"]}]},
                "startPage": 5,
                "endPage": 3,
                "count": 5
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("5-3"));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let (router, _) = app(Err(500));
        let (status, body) =
            post_json(router, "/analyze/text", json!({"text": "some text"})).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Document analysis failed");
    }

    #[tokio::test]
    async fn test_malformed_reply_is_bad_gateway() {
        let (router, _) = app(Ok("Sorry, I cannot help with that."));
        let (status, _) = post_json(
            router,
            "/analyze/page",
            json!({"text": "page text", "pageNumber": 2}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_invalid_image_is_bad_request() {
        let (router, model) = app(Ok("{}"));
        let (status, _) =
            post_json(router, "/analyze/image", json!({"image": "not base64!"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_comprehensive_never_fails() {
        let (router, _) = app(Err(503));
        let long = "Pallava rock-cut architecture at Mamallapuram. ".repeat(3);
        let (status, body) = post_json(
            router,
            "/analyze/comprehensive",
            json!({"text": format!("=== Page 1 ===\n{long}\n=== Page 2 ===\n{long}")}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pageAnalyses"], json!([]));
        assert_eq!(body["pagesRequested"], 2);
        assert_eq!(body["summary"], "Analyzed 0 pages and extracted 0 key points");
    }

    #[tokio::test]
    async fn test_quiz_from_analyses() {
        let (router, _) = app(Ok(
            r#"{"questions": [{"question": "Q1", "type": "short"}, {"question": "Q2", "options": ["a","b","c","d"], "answer": "D"}]}"#,
        ));
        let (status, body) = post_json(
            router,
            "/quiz",
            json!({
                "analyses": [{"keyPoints": ["Vaikom Satyagraha 1924"]}],
                "count": 2,
                "difficulty": "easy"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalQuestions"], 2);
        assert_eq!(body["difficulty"], "easy");
        assert_eq!(body["questions"][0]["type"], "mcq");
        assert_eq!(body["questions"][0]["answer"], "A");
        assert_eq!(body["questions"][0]["options"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_missing_pdf_is_unprocessable() {
        let (router, _) = app(Ok("{}"));
        let (status, _) = post_json(
            router,
            "/analyze/pdf-page",
            json!({"pdfPath": "/no/such/file.pdf", "pageNumber": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_connection_error_body_does_not_expose_api_key() {
        let config = study_core::GeminiConfig::new("SECRET-KEY-123")
            .unwrap()
            .with_base_url("http://127.0.0.1:1/v1beta");
        let analyzer = StudyAnalyzer::new(Arc::new(GeminiClient::new(config)))
            .with_pacer(Arc::new(NoPacing));
        let router = build_router(AppState { analyzer }, 1024 * 1024);

        let (status, body) =
            post_json(router, "/analyze/text", json!({"text": "some text"})).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["details"].as_str().unwrap().starts_with("HTTP error"));
        assert!(!body.to_string().contains("SECRET-KEY-123"));
    }
}
