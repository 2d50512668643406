use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

use super::public::ServedPage;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Run the request inside a span carrying a fresh request id, and echo the id
/// back to the client.
pub async fn set_request_context(request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!(
        target: "lectern::http",
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Log every page served and every failure, using what the handler left in
/// the response extensions.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let mut response = next.run(request).await;
    let status = response.status().as_u16();
    let elapsed_ms = start.elapsed().as_millis();

    if let Some(report) = response.extensions_mut().remove::<ErrorReport>() {
        let slug = report.slug.as_deref().unwrap_or("-");
        if response.status().is_server_error() {
            error!(
                target = "lectern::http::response",
                status,
                elapsed_ms,
                origin = report.origin,
                slug,
                detail = report.detail(),
                chain = ?report.chain,
                "request failed"
            );
        } else {
            warn!(
                target = "lectern::http::response",
                status,
                elapsed_ms,
                origin = report.origin,
                slug,
                detail = report.detail(),
                "request rejected"
            );
        }
    } else if status >= 400 {
        warn!(
            target = "lectern::http::response",
            status,
            elapsed_ms,
            "request rejected by extractor"
        );
    } else if let Some(served) = response.extensions_mut().remove::<ServedPage>() {
        debug!(
            target = "lectern::http::response",
            status,
            elapsed_ms,
            slug = %served.slug,
            cache = served.cache.as_str(),
            "page served"
        );
    }

    response
}
