//! The `/check-device-health` endpoint.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use health_check::{HealthCheckRequest, HealthChecker, RELAY_PATH};
use serde::Serialize;
use warp::http::{HeaderMap, HeaderValue, StatusCode};
use warp::reply::Response;
use warp::{Filter, Reply};

/// Largest request body the relay will buffer.
pub const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Headers allowed on cross-origin requests.
pub const CORS_ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    error: &'a str,
}

fn json_error(code: StatusCode, error: &str) -> Response {
    warp::reply::with_status(warp::reply::json(&ErrorBody { status: None, error }), code).into_response()
}

fn internal_error() -> Response {
    let body = ErrorBody {
        status: Some("offline"),
        error: "Internal server error",
    };
    warp::reply::with_status(warp::reply::json(&body), StatusCode::INTERNAL_SERVER_ERROR).into_response()
}

/// Wildcard-origin CORS headers added to every relay response
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers
}

/// Build the relay filter around a checker.
///
/// The returned filter never rejects: unknown paths become JSON 404s,
/// oversized bodies 413s and unexpected faults JSON 500s, all with CORS
/// headers. POST bodies are capped at [`MAX_BODY_BYTES`].
pub fn relay_routes(
    checker: Arc<dyn HealthChecker>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let preflight = warp::options()
        .map(|| warp::reply::with_status(warp::reply(), StatusCode::OK).into_response());

    let check = warp::post()
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::bytes())
        .and_then(move |body: Bytes| {
            let checker = Arc::clone(&checker);
            async move { Ok::<_, warp::Rejection>(handle_check(body, checker).await) }
        });

    warp::path(RELAY_PATH)
        .and(warp::path::end())
        .and(preflight.or(check).unify())
        .recover(handle_rejection)
        .with(warp::reply::with::headers(cors_headers()))
}

async fn handle_check(body: Bytes, checker: Arc<dyn HealthChecker>) -> Response {
    let request: HealthCheckRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!("Rejecting relay request with unreadable body: {}", e);
            return json_error(StatusCode::BAD_REQUEST, "Invalid JSON body");
        }
    };

    let address = match request.address() {
        Some(address) => address.to_string(),
        None => return json_error(StatusCode::BAD_REQUEST, "IP address is required"),
    };

    tracing::info!("Health check request for {}", address);

    // A panicking checker must not take the server down with it
    let check = tokio::spawn({
        let address = address.clone();
        async move { checker.check(&address).await }
    });

    match check.await {
        Ok(report) => {
            tracing::info!("Relay result for {}: {}", address, report.status);
            warp::reply::with_status(warp::reply::json(&report), StatusCode::OK).into_response()
        }
        Err(e) => {
            tracing::error!("Error in health check for {}: {}", address, e);
            internal_error()
        }
    }
}

async fn handle_rejection(err: warp::Rejection) -> Result<Response, Infallible> {
    if err.is_not_found() {
        return Ok(json_error(StatusCode::NOT_FOUND, "Not found"));
    }

    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(json_error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"));
    }

    if err.find::<warp::reject::LengthRequired>().is_some() {
        return Ok(json_error(StatusCode::LENGTH_REQUIRED, "Content-Length required"));
    }

    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"));
    }

    tracing::error!("Unhandled relay rejection: {:?}", err);
    Ok(internal_error())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use health_check::HealthReport;

    struct FixedChecker(HealthReport);

    #[async_trait]
    impl HealthChecker for FixedChecker {
        async fn check(&self, _address: &str) -> HealthReport {
            self.0.clone()
        }
    }

    struct PanickingChecker;

    #[async_trait]
    impl HealthChecker for PanickingChecker {
        async fn check(&self, _address: &str) -> HealthReport {
            panic!("checker exploded");
        }
    }

    fn online() -> Arc<dyn HealthChecker> {
        Arc::new(FixedChecker(HealthReport::online(Some("pi-01".to_string()))))
    }

    fn body_json(body: &[u8]) -> serde_json::Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_post_returns_report() {
        let response = warp::test::request()
            .method("POST")
            .path("/check-device-health")
            .body(r#"{"ipAddress":"10.0.0.3"}"#)
            .reply(&relay_routes(online()))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(
            body_json(response.body()),
            serde_json::json!({"status": "online", "hostname": "pi-01"})
        );
    }

    #[tokio::test]
    async fn test_offline_report_is_still_200() {
        let checker: Arc<dyn HealthChecker> = Arc::new(FixedChecker(HealthReport::offline("HTTP 500")));
        let response = warp::test::request()
            .method("POST")
            .path("/check-device-health")
            .body(r#"{"ipAddress":"10.0.0.3"}"#)
            .reply(&relay_routes(checker))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response.body())["error"], "HTTP 500");
    }

    #[tokio::test]
    async fn test_missing_address_is_400() {
        let response = warp::test::request()
            .method("POST")
            .path("/check-device-health")
            .body(r#"{}"#)
            .reply(&relay_routes(online()))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response.body())["error"], "IP address is required");
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let response = warp::test::request()
            .method("POST")
            .path("/check-device-health")
            .body("not json")
            .reply(&relay_routes(online()))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let response = warp::test::request()
            .method("GET")
            .path("/check-device-health")
            .reply(&relay_routes(online()))
            .await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_json(response.body())["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_preflight() {
        let response = warp::test::request()
            .method("OPTIONS")
            .path("/check-device-health")
            .reply(&relay_routes(online()))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-headers"], CORS_ALLOW_HEADERS);
    }

    #[tokio::test]
    async fn test_checker_panic_is_500() {
        let response = warp::test::request()
            .method("POST")
            .path("/check-device-health")
            .body(r#"{"ipAddress":"10.0.0.3"}"#)
            .reply(&relay_routes(Arc::new(PanickingChecker)))
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response.body()),
            serde_json::json!({"status": "offline", "error": "Internal server error"})
        );
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let padding = "x".repeat(MAX_BODY_BYTES as usize);
        let response = warp::test::request()
            .method("POST")
            .path("/check-device-health")
            .body(format!(r#"{{"ipAddress":"10.0.0.3","padding":"{}"}}"#, padding))
            .reply(&relay_routes(online()))
            .await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(body_json(response.body())["error"], "Request body too large");
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let response = warp::test::request()
            .method("POST")
            .path("/elsewhere")
            .reply(&relay_routes(online()))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
