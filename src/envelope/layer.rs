use axum::extract::Request;
use axum::http::{Method, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::Envelope;
use super::cors::apply_cors;

/// Router-wide middleware that owns cross-origin handling.
///
/// Every `OPTIONS` request is answered as a preflight without reaching a
/// handler, whatever its path. Every other response leaves with the CORS
/// header set, echoing the request's `Origin`.
///
/// ```rust
/// use axum::{Router, middleware, routing::get};
/// use dashboard_dal::envelope::cors_envelope;
///
/// let app: Router = Router::new()
///     .route("/ping", get(|| async { "pong" }))
///     .layer(middleware::from_fn(cors_envelope));
/// # let _ = app;
/// ```
pub async fn cors_envelope(request: Request, next: Next) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();
    if request.method() == Method::OPTIONS {
        return Envelope::preflight(origin.as_ref()).into_response();
    }
    let mut response = next.run(request).await;
    apply_cors(response.headers_mut(), origin.as_ref());
    response
}
