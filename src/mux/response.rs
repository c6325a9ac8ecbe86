//! Aggregation of delivery outcomes into the handler's response.
//!
//! All delivered: `200` with an empty body. Anything failed: `500` with a
//! JSON object mapping each failed destination to its error description,
//! in configured order. Successful destinations never appear in it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{Map, Value};

use super::dispatch::DeliveryOutcome;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    /// Counts every failed attempt, even when a destination listed twice
    /// shares a single `errors` entry.
    pub failures: usize,
    pub errors: Map<String, Value>,
}

impl DispatchReport {
    pub fn record(&mut self, dest: &str, outcome: DeliveryOutcome) {
        self.attempted += 1;
        if let DeliveryOutcome::Failed(description) = outcome {
            self.failures += 1;
            self.errors
                .insert(dest.to_string(), Value::String(description));
        }
    }

    #[must_use]
    pub const fn succeeded(&self) -> usize {
        self.attempted - self.failures
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failures == 0
    }
}

impl IntoResponse for DispatchReport {
    fn into_response(self) -> Response {
        if self.is_success() {
            StatusCode::OK.into_response()
        } else {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(Value::Object(self.errors))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;

    async fn body_of(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    #[tokio::test]
    async fn all_delivered_is_ok_with_empty_body() {
        let mut report = DispatchReport::default();
        report.record("a", DeliveryOutcome::Delivered);
        report.record("b", DeliveryOutcome::Delivered);
        assert_eq!(report.succeeded(), 2);

        let response = report.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn no_directives_is_ok() {
        let response = DispatchReport::default().into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn failures_are_listed_without_successes() {
        let mut report = DispatchReport::default();
        report.record("a", DeliveryOutcome::Delivered);
        report.record("b", DeliveryOutcome::Failed("oops (status 500)".into()));

        let response = report.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(body, json!({"b": "oops (status 500)"}));
    }

    #[test]
    fn repeated_destination_keeps_last_error_but_counts_both() {
        let mut report = DispatchReport::default();
        report.record("a", DeliveryOutcome::Failed("first".into()));
        report.record("b", DeliveryOutcome::Failed("other".into()));
        report.record("a", DeliveryOutcome::Failed("second".into()));

        assert_eq!(report.failures, 3);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors["a"], "second");
        let keys: Vec<&str> = report.errors.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "b"]);
    }
}
