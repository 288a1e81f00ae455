use std::time::Instant;

use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use nearcar_core::QueryError;
use tracing::{debug, error, info};

use crate::app::App;
use crate::input::NearestCarQuery;

/// Routes of the public API. Anything unrouted, or a wrong method, is a 404.
///
/// HEAD is routed explicitly, otherwise axum would answer it with the GET handler.
pub(crate) fn router(app: App) -> Router {
    Router::new()
        .route(
            "/nearest-car",
            get(nearest_car).head(not_found).fallback(not_found),
        )
        .fallback(not_found)
        .layer(middleware::from_fn(log_request))
        .with_state(app)
}

async fn nearest_car(State(app): State<App>, Query(query): Query<NearestCarQuery>) -> Response {
    let target = match query.target() {
        Ok(target) => target,
        Err(err) => {
            debug!(?err, "rejected nearest-car query");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match app.service.nearest_eta(&target).await {
        Ok(minutes) => (StatusCode::OK, Json(minutes)).into_response(),
        Err(QueryError::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(QueryError::Upstream(err)) => {
            error!(%target, error = %err, "nearest-car lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn log_request(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let query = req.uri().query().unwrap_or_default().to_owned();

    let resp = next.run(req).await;

    info!(
        %method,
        path,
        query,
        status = resp.status().as_u16(),
        duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "request handled"
    );
    resp
}
