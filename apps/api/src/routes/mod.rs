pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::scoring::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/evaluate", post(handlers::handle_evaluate))
        .route("/api/v1/extract", post(handlers::handle_extract))
        .route("/api/v1/rank", post(handlers::handle_rank))
        .route(
            "/api/v1/analyze",
            post(handlers::handle_analyze).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/v1/evaluations/:document_id",
            get(handlers::handle_get_evaluations),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::collaborators::Collaborators;

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected() {
        let mut state = AppState::for_tests(Collaborators::disabled());
        state.config.max_upload_bytes = 64;
        let app = build_router(state);

        let boundary = "limit-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cv.txt\"\r\n\r\n{}\r\n--{boundary}--\r\n",
            "x".repeat(1024)
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/analyze")
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = build_router(AppState::for_tests(Collaborators::disabled()));
        let request = Request::builder().uri("/api/v1/nope").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
