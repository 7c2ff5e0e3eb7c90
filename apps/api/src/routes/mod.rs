pub mod health;

use axum::{
    http::Uri,
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::recommend::handlers;
use crate::state::AppState;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {uri}"))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Recommendation API
        .route("/api/v1/recommendations", post(handlers::handle_recommend))
        .route(
            "/api/v1/recommendations/scored",
            post(handlers::handle_recommend_scored),
        )
        .route(
            "/api/v1/recommendations/locations",
            get(handlers::handle_locations),
        )
        .fallback(not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::recommend::artifacts::{ArtifactBundle, JobPosting};
    use crate::recommend::scorer::CosineRecommender;

    fn posting(
        company: &str,
        text: &str,
        experience: f64,
        salary: f64,
        location: &str,
    ) -> JobPosting {
        JobPosting {
            company: company.to_string(),
            link: format!("{}.co", company.to_lowercase()),
            text: text.to_string(),
            experience,
            salary,
            location: location.to_string(),
        }
    }

    fn test_router() -> Router {
        let bundle = ArtifactBundle::fit(&[
            posting("A", "python ml", 2.0, 10.0, "bangalore"),
            posting("B", "java backend", 5.0, 20.0, "pune"),
        ]).unwrap();
        let state = AppState {
            config: Config {
                artifacts_path: PathBuf::from("artifacts.json"),
                port: 0,
                default_top_n: 5,
                rust_log: "info".to_string(),
            },
            recommender: Arc::new(CosineRecommender::new(Arc::new(bundle))),
        };
        build_router(state)
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_recommend_returns_best_match() {
        let request = post_json(
            "/api/v1/recommendations",
            json!({
                "title": "Data Scientist",
                "skills": ["python", "ml"],
                "section": "AI",
                "experience": 2,
                "salary": 10,
                "locations": ["bangalore"],
                "top_n": 1
            }),
        );
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"recommendations": [{"company": "A", "link": "a.co"}]})
        );
    }

    #[tokio::test]
    async fn test_recommend_defaults_top_n_and_fields() {
        let request = post_json("/api/v1/recommendations", json!({"title": "engineer"}));
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::OK);
        // default_top_n = 5 against a 2-row catalog
        assert_eq!(body["recommendations"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_recommend_scored_includes_similarity() {
        let request = post_json(
            "/api/v1/recommendations/scored",
            json!({
                "skills": ["java", "backend"],
                "experience": 5,
                "salary": 20,
                "locations": ["Pune"]
            }),
        );
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::OK);
        let matches = body["matches"].as_array().unwrap();
        assert_eq!(matches[0]["company"], "B");
        assert_eq!(matches[0]["index"], 1);
        assert!(matches[0]["similarity"].as_f64().unwrap() > 0.99);
    }

    #[tokio::test]
    async fn test_negative_top_n_is_validation_error() {
        let request = post_json(
            "/api/v1/recommendations",
            json!({"title": "engineer", "top_n": -1}),
        );
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_null_skills_is_validation_error() {
        let request = post_json("/api/v1/recommendations/scored", json!({"skills": null}));
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/recommendations")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"title\": "))
            .unwrap();
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_locations() {
        let request = Request::get("/api/v1/recommendations/locations")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"locations": ["bangalore", "pune"]}));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let request = Request::get("/api/v1/trends").body(Body::empty()).unwrap();
        let (status, body) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
