//! Delivery of one inbound payload to an endpoint's destinations.
//!
//! Dispatch runs in two steps. [`plan`] walks the directives in configured
//! order, resolving each destination and serializing its payload; it stops
//! at the first destination that is not configured. [`execute`] then
//! delivers every planned directive and folds the outcomes into a
//! [`DispatchReport`].
//!
//! An unresolved destination aborts the request with
//! [`MuxRejection::UnknownDestination`] once the directives listed before
//! it have been delivered. Nothing after it is attempted, and nothing
//! already delivered is retracted.
//!
//! In [`FanoutMode::Sequential`] each delivery is awaited before the next
//! starts, so destinations observe configured order. In
//! [`FanoutMode::Concurrent`] every planned delivery is spawned at once and
//! the handles are joined in configured order; only timing differs.

use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{CONTENT_TYPE, USER_AGENT};
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};

use super::inbound::InboundPayload;
use super::payload::build_payload;
use super::response::DispatchReport;
use super::MuxRejection;
use crate::config::model::{Defaults, Endpoint, FanoutMode, MuxConfig};
use crate::server::HttpClient;

const USER_AGENT_VALUE: &str = concat!("slackmux/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

impl DeliveryOutcome {
    /// Only an exact `200 OK` counts as delivered.
    #[must_use]
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        if status == StatusCode::OK {
            Self::Delivered
        } else {
            Self::Failed(format!(
                "{} (status {})",
                String::from_utf8_lossy(body),
                status.as_u16()
            ))
        }
    }
}

/// A failure below HTTP: connect, DNS, TLS, body read, or timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// OS error number, when the fault carries one.
    pub code: Option<i32>,
    pub message: String,
}

impl TransportError {
    /// Flatten an error and its `source()` chain into one message.
    #[must_use]
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut code = None;
        let mut parts = Vec::new();
        let mut current = Some(err);
        while let Some(e) = current {
            let text = e.to_string();
            if !parts.contains(&text) {
                parts.push(text);
            }
            if code.is_none() {
                code = e
                    .downcast_ref::<std::io::Error>()
                    .and_then(std::io::Error::raw_os_error);
            }
            current = e.source();
        }
        Self {
            code,
            message: parts.join(": "),
        }
    }

    fn timed_out(after: Duration) -> Self {
        Self {
            code: None,
            message: format!("request timed out after {}ms", after.as_millis()),
        }
    }
}

impl From<TransportError> for DeliveryOutcome {
    fn from(err: TransportError) -> Self {
        let code = err.code.map(|c| c.to_string()).unwrap_or_default();
        Self::Failed(format!("internal error {code}: {}", err.message))
    }
}

/// One resolved directive, ready to send.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub dest: String,
    pub url: String,
    pub timeout: Option<Duration>,
    pub body: Bytes,
}

#[derive(Debug, Default)]
pub struct Plan {
    pub deliveries: Vec<Delivery>,
    /// First directive whose destination is not configured.
    pub unresolved: Option<String>,
}

#[must_use]
pub fn plan(
    mux: &MuxConfig,
    defaults: &Defaults,
    endpoint: &Endpoint,
    inbound: &InboundPayload,
) -> Plan {
    let mut plan = Plan::default();

    for directive in &endpoint.mux_to {
        let Some(destination) = mux.destination(&directive.dest) else {
            plan.unresolved = Some(directive.dest.clone());
            break;
        };

        let payload = build_payload(inbound, directive);
        // A JSON object with string keys always serializes
        let body = serde_json::to_vec(&*payload).unwrap_or_default();

        plan.deliveries.push(Delivery {
            dest: directive.dest.clone(),
            url: destination.url().to_string(),
            timeout: destination.timeout(defaults),
            body: Bytes::from(body),
        });
    }

    plan
}

pub async fn execute(
    client: &HttpClient,
    plan: Plan,
    mode: FanoutMode,
    correlation_id: &str,
) -> Result<DispatchReport, MuxRejection> {
    let mut report = DispatchReport::default();

    match mode {
        FanoutMode::Sequential => {
            for delivery in &plan.deliveries {
                let outcome = deliver(client, delivery, correlation_id).await;
                report.record(&delivery.dest, outcome);
            }
        }
        FanoutMode::Concurrent => {
            let handles: Vec<_> = plan
                .deliveries
                .iter()
                .map(|delivery| {
                    let client = client.clone();
                    let delivery = delivery.clone();
                    let correlation_id = correlation_id.to_string();
                    tokio::spawn(async move { deliver(&client, &delivery, &correlation_id).await })
                })
                .collect();

            for (delivery, handle) in plan.deliveries.iter().zip(handles) {
                let outcome = handle.await.unwrap_or_else(|join_err| {
                    tracing::error!(
                        correlation_id = %correlation_id,
                        dest = %delivery.dest,
                        error = %join_err,
                        "delivery task panicked"
                    );
                    TransportError::from_error(&join_err).into()
                });
                report.record(&delivery.dest, outcome);
            }
        }
    }

    if let Some(dest) = plan.unresolved {
        tracing::error!(
            correlation_id = %correlation_id,
            dest = %dest,
            delivered_before_abort = report.attempted,
            "configuration error: destination not found"
        );
        return Err(MuxRejection::UnknownDestination(dest));
    }

    Ok(report)
}

/// POST one payload. Never fails: every fault becomes an outcome.
#[allow(clippy::cast_possible_truncation)]
pub async fn deliver(client: &HttpClient, delivery: &Delivery, correlation_id: &str) -> DeliveryOutcome {
    tracing::debug!(
        correlation_id = %correlation_id,
        dest = %delivery.dest,
        payload = %String::from_utf8_lossy(&delivery.body),
        "notifying destination"
    );

    let start = Instant::now();
    let exchange = send(client, delivery, correlation_id);
    let result = match delivery.timeout {
        Some(limit) => tokio::time::timeout(limit, exchange)
            .await
            .unwrap_or_else(|_| Err(TransportError::timed_out(limit))),
        None => exchange.await,
    };
    let latency_ms = start.elapsed().as_millis() as u64;

    let outcome = match result {
        Ok((status, body)) => DeliveryOutcome::from_response(status, &body),
        Err(err) => err.into(),
    };

    match &outcome {
        DeliveryOutcome::Delivered => tracing::info!(
            correlation_id = %correlation_id,
            dest = %delivery.dest,
            latency_ms,
            "destination notified"
        ),
        DeliveryOutcome::Failed(description) => tracing::warn!(
            correlation_id = %correlation_id,
            dest = %delivery.dest,
            latency_ms,
            error = %description,
            "delivery failed"
        ),
    }

    outcome
}

async fn send(
    client: &HttpClient,
    delivery: &Delivery,
    correlation_id: &str,
) -> Result<(StatusCode, Bytes), TransportError> {
    let req = http::Request::builder()
        .method(Method::POST)
        .uri(delivery.url.as_str())
        .header(CONTENT_TYPE, "application/json")
        .header(USER_AGENT, USER_AGENT_VALUE)
        .header("x-correlation-id", correlation_id)
        .body(Full::new(delivery.body.clone()))
        .map_err(|e| TransportError::from_error(&e))?;

    let response = client
        .request(req)
        .await
        .map_err(|e| TransportError::from_error(&e))?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| TransportError::from_error(&e))?
        .to_bytes();

    Ok((status, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{Destination, DestinationSpec, MuxDirective};
    use serde_json::{json, Value};

    fn inbound() -> InboundPayload {
        match json!({"text": "orig", "channel": "c1"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn mux() -> MuxConfig {
        let mut mux = MuxConfig::default();
        mux.destinations
            .insert("a".into(), Destination::from("http://127.0.0.1:1/a"));
        mux.destinations.insert(
            "b".into(),
            Destination::Detailed(DestinationSpec {
                url: "http://127.0.0.1:1/b".into(),
                timeout: Some(250),
            }),
        );
        mux
    }

    #[test]
    fn plan_resolves_in_order() {
        let endpoint = Endpoint {
            token: None,
            mux_to: vec![MuxDirective::to("b"), MuxDirective::to("a")],
        };
        let plan = plan(&mux(), &Defaults::default(), &endpoint, &inbound());
        assert!(plan.unresolved.is_none());
        let dests: Vec<&str> = plan.deliveries.iter().map(|d| d.dest.as_str()).collect();
        assert_eq!(dests, ["b", "a"]);
        assert_eq!(plan.deliveries[0].timeout, Some(Duration::from_millis(250)));
        assert_eq!(plan.deliveries[1].timeout, None);
    }

    #[test]
    fn plan_stops_at_first_unresolved_destination() {
        let endpoint = Endpoint {
            token: None,
            mux_to: vec![
                MuxDirective::to("a"),
                MuxDirective::to("ghost"),
                MuxDirective::to("b"),
            ],
        };
        let plan = plan(&mux(), &Defaults::default(), &endpoint, &inbound());
        assert_eq!(plan.deliveries.len(), 1);
        assert_eq!(plan.deliveries[0].dest, "a");
        assert_eq!(plan.unresolved.as_deref(), Some("ghost"));
    }

    #[test]
    fn plan_serializes_overridden_payload() {
        let mut overrides = serde_json::Map::new();
        overrides.insert("text".into(), json!("x"));
        let endpoint = Endpoint {
            token: None,
            mux_to: vec![MuxDirective::to("a").with_override(overrides)],
        };
        let plan = plan(&mux(), &Defaults::default(), &endpoint, &inbound());
        let sent: Value = serde_json::from_slice(&plan.deliveries[0].body).unwrap();
        assert_eq!(sent, json!({"text": "x", "channel": "c1"}));
    }

    #[test]
    fn plan_applies_default_timeout() {
        let defaults = Defaults {
            timeout: Some(1000),
            fanout: FanoutMode::Sequential,
        };
        let endpoint = Endpoint {
            token: None,
            mux_to: vec![MuxDirective::to("a"), MuxDirective::to("b")],
        };
        let plan = plan(&mux(), &defaults, &endpoint, &inbound());
        assert_eq!(plan.deliveries[0].timeout, Some(Duration::from_millis(1000)));
        assert_eq!(plan.deliveries[1].timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn only_exact_200_is_delivered() {
        assert_eq!(
            DeliveryOutcome::from_response(StatusCode::OK, b"ok"),
            DeliveryOutcome::Delivered
        );
        assert_eq!(
            DeliveryOutcome::from_response(StatusCode::NO_CONTENT, b""),
            DeliveryOutcome::Failed(" (status 204)".into())
        );
        assert_eq!(
            DeliveryOutcome::from_response(StatusCode::NOT_FOUND, b"no_service"),
            DeliveryOutcome::Failed("no_service (status 404)".into())
        );
    }

    #[test]
    fn transport_error_formats_code_when_present() {
        let refused = std::io::Error::from_raw_os_error(111);
        let outcome: DeliveryOutcome = TransportError::from_error(&refused).into();
        let DeliveryOutcome::Failed(description) = outcome else {
            panic!("expected failure");
        };
        assert!(description.starts_with("internal error 111: "));
    }

    #[test]
    fn transport_error_code_may_be_empty() {
        let outcome: DeliveryOutcome = TransportError::timed_out(Duration::from_millis(50)).into();
        assert_eq!(
            outcome,
            DeliveryOutcome::Failed("internal error : request timed out after 50ms".into())
        );
    }

    #[test]
    fn transport_error_walks_source_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("client error (Connect)")]
        struct Outer(#[source] std::io::Error);

        let err = Outer(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        let transport = TransportError::from_error(&err);
        assert_eq!(transport.code, None);
        assert_eq!(transport.message, "client error (Connect): connection refused");
    }
}
