//! HTTP response building module
//!
//! Provides builders for the status code responses produced outside the
//! artifact framer, and conversion of a framed head into a hyper response.

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::Response;

use super::framer::ResponseHead;

/// Body type of every response the server sends
pub type ResponseBody = BoxBody<Bytes, std::io::Error>;

/// Body with the given fixed content
pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

/// Body without content
pub fn empty_body() -> ResponseBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

/// Build a response from a framed head and a body
pub fn build_framed_response(head: ResponseHead, body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    *response.status_mut() = head.status;
    *response.headers_mut() = head.headers;
    response
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<ResponseBody> {
    Response::builder()
        .status(404)
        .header("Content-Type", "text/plain")
        .body(full_body("404 Not Found"))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(full_body("404 Not Found"))
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ResponseBody> {
    Response::builder()
        .status(405)
        .header("Content-Type", "text/plain")
        .header("Allow", "GET, HEAD, OPTIONS")
        .body(full_body("405 Method Not Allowed"))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(full_body("405 Method Not Allowed"))
        })
}

/// Build OPTIONS response
pub fn build_options_response() -> Response<ResponseBody> {
    Response::builder()
        .status(204)
        .header("Allow", "GET, HEAD, OPTIONS")
        .header("Accept-Ranges", "bytes")
        .body(empty_body())
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(empty_body())
        })
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<ResponseBody> {
    Response::builder()
        .status(500)
        .header("Content-Type", "text/plain")
        .body(full_body("500 Internal Server Error"))
        .unwrap_or_else(|e| {
            log_build_error("500", &e);
            Response::new(full_body("500 Internal Server Error"))
        })
}

/// Build health check response
pub fn build_health_response(status: &str) -> Response<ResponseBody> {
    let body = serde_json::json!({ "status": status }).to_string();
    Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-cache")
        .body(full_body(body))
        .unwrap_or_else(|e| {
            log_build_error("health", &e);
            Response::new(empty_body())
        })
}

/// Build checksum file response (`<hash>  <filename>`)
pub fn build_checksum_response(
    content: String,
    content_disposition: &str,
    is_head: bool,
) -> Response<ResponseBody> {
    let content_length = content.len();
    let body = if is_head {
        empty_body()
    } else {
        full_body(content)
    };

    Response::builder()
        .status(200)
        .header("Content-Type", "text/plain")
        .header("Content-Length", content_length)
        .header("Content-Disposition", content_disposition)
        .header("X-Content-Type-Options", "nosniff")
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error("checksum", &e);
            build_500_response()
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    tracing::error!("Failed to build {status} response: {error}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{HeaderMap, HeaderValue, CONTENT_RANGE};
    use hyper::StatusCode;

    async fn body_bytes(response: Response<ResponseBody>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_404() {
        let response = build_404_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_bytes(response).await, "404 Not Found");
    }

    #[test]
    fn test_405_allow() {
        let response = build_405_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()["allow"], "GET, HEAD, OPTIONS");
    }

    #[tokio::test]
    async fn test_health() {
        let response = build_health_response("ok");
        assert_eq!(body_bytes(response).await, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_checksum_head_has_length_without_body() {
        let response = build_checksum_response("abc  file1".to_string(), "attachment;filename=file1.SHA256SUM", true);
        assert_eq!(response.headers()["content-length"], "10");
        assert!(body_bytes(response).await.is_empty());
    }

    #[test]
    fn test_framed_response() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_RANGE, HeaderValue::from_static("bytes */10"));
        let head = ResponseHead {
            status: StatusCode::RANGE_NOT_SATISFIABLE,
            headers,
        };
        let response = build_framed_response(head, empty_body());
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[CONTENT_RANGE], "bytes */10");
    }
}
