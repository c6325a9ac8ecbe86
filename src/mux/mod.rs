//! Webhook multiplexing: the `POST /slackmux/{endpoint}/{token}` handler.
//!
//! A request flows through four stages, one submodule each:
//!
//! 1. [`inbound`] decodes the body and authorizes the endpoint.
//! 2. [`payload`] derives each destination's body from the inbound one.
//! 3. [`dispatch`] resolves destinations and delivers, collecting outcomes.
//! 4. [`response`] folds the outcomes into a single HTTP response.
//!
//! Stages 1 and 3 can reject the whole request with a [`MuxRejection`];
//! individual delivery failures never do, they are aggregated instead.

pub mod dispatch;
pub mod inbound;
pub mod payload;
pub mod response;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::server::AppState;
use response::DispatchReport;

/// Request-level failures. Each maps to a status code with an empty body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MuxRejection {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("no such endpoint '{0}'")]
    UnknownEndpoint(String),

    #[error("token mismatch for endpoint '{0}'")]
    TokenMismatch(String),

    #[error("configuration error: destination '{0}' not found")]
    UnknownDestination(String),
}

impl MuxRejection {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnknownEndpoint(_) => StatusCode::NOT_FOUND,
            Self::TokenMismatch(_) => StatusCode::FORBIDDEN,
            Self::UnknownDestination(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MuxRejection {
    fn into_response(self) -> Response {
        self.status().into_response()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MuxPath {
    pub endpoint: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Runs the pipeline on its own task so a caller that hangs up mid fan-out
/// does not cancel the remaining deliveries.
pub async fn mux_handler(
    State(state): State<Arc<AppState>>,
    Path(params): Path<MuxPath>,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let correlation_id = req_headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    let task = tokio::spawn(process(
        state,
        params,
        req_headers,
        body,
        correlation_id.clone(),
    ));

    let mut response = task.await.unwrap_or_else(|join_err| {
        tracing::error!(
            correlation_id = %correlation_id,
            error = %join_err,
            "request task panicked"
        );
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    });

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert("x-correlation-id", value);
    }
    response
}

async fn process(
    state: Arc<AppState>,
    params: MuxPath,
    req_headers: HeaderMap,
    body: Bytes,
    correlation_id: String,
) -> Response {
    match handle(&state, &params, &req_headers, &body, &correlation_id).await {
        Ok(report) => {
            state.stats.accepted.fetch_add(1, Ordering::Relaxed);
            state
                .stats
                .delivered
                .fetch_add(report.succeeded() as u64, Ordering::Relaxed);
            state
                .stats
                .failed
                .fetch_add(report.failures as u64, Ordering::Relaxed);
            tracing::info!(
                correlation_id = %correlation_id,
                endpoint = %params.endpoint,
                attempted = report.attempted,
                failures = report.failures,
                "request processed"
            );
            report.into_response()
        }
        Err(rejection) => {
            state.stats.rejected.fetch_add(1, Ordering::Relaxed);
            if let MuxRejection::UnknownDestination(_) = rejection {
                tracing::error!(
                    correlation_id = %correlation_id,
                    endpoint = %params.endpoint,
                    error = %rejection,
                    "request aborted"
                );
            } else {
                tracing::debug!(
                    correlation_id = %correlation_id,
                    endpoint = %params.endpoint,
                    error = %rejection,
                    "request rejected"
                );
            }
            rejection.into_response()
        }
    }
}

async fn handle(
    state: &AppState,
    params: &MuxPath,
    req_headers: &HeaderMap,
    body: &[u8],
    correlation_id: &str,
) -> Result<DispatchReport, MuxRejection> {
    let config = &state.config.config;

    let decoded = inbound::decode_body(req_headers, body)?;
    let inbound = inbound::effective_body(decoded)?;
    let endpoint =
        inbound::authorize(&config.mux, &params.endpoint, params.token.as_deref())?;

    tracing::info!(
        correlation_id = %correlation_id,
        endpoint = %params.endpoint,
        destinations = endpoint.mux_to.len(),
        "processing request"
    );

    let plan = dispatch::plan(&config.mux, &config.defaults, endpoint, &inbound);
    dispatch::execute(
        &state.http_client,
        plan,
        config.defaults.fanout,
        correlation_id,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_status_codes() {
        assert_eq!(
            MuxRejection::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MuxRejection::UnknownEndpoint("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            MuxRejection::TokenMismatch("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            MuxRejection::UnknownDestination("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn rejection_response_has_empty_body() {
        use http_body_util::BodyExt;

        let response = MuxRejection::TokenMismatch("alerts".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }
}
