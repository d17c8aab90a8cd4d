/// Webserver middleware
use axum::{
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};

/// Close the socket after every response except a protocol switch
///
/// Raw-socket faults are only detected on the first request of a
/// connection, so a client must never reuse one. hyper closes the
/// connection after sending a response carrying `Connection: close`.
/// 101 responses keep hyper's own `Connection: upgrade`.
pub async fn one_request_per_connection(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    if response.status() != StatusCode::SWITCHING_PROTOCOLS {
        response
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("close"));
    }

    response
}
