//! HTTP surface: one route per configured protocol plus the statistics route.
//!
//! Handlers do all their work synchronously once the body has been read, so
//! the statistics lock is never held across an await point.

use crate::config::{ProtocolConfig, ServerConfig};
use crate::error::{ErrorCode, RequestError};
use crate::logging::endpoint_span;
use crate::statistics::StatisticsTree;
use crate::validation::{ValidationError, Validator, ValueKind, compile};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::any,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reason recorded for a declared field absent from the body.
pub const MISSED: &str = "<missed>";

/// Builds the router for every configured protocol and the statistics route.
pub fn build_router(config: &ServerConfig, statistics: Arc<StatisticsTree>) -> Router {
    let statistics_route = Arc::new(StatisticsRoute {
        path: config.statistics_path.clone(),
        statistics: statistics.clone(),
    });
    let mut router = Router::new()
        .route(&config.statistics_path, any(statistics_handler))
        .with_state(statistics_route);

    for protocol in &config.protocols {
        info!(method = %protocol.method, path = %protocol.path, "registering protocol");
        let endpoint = Arc::new(Endpoint::compile(protocol, statistics.clone()));
        router = router.merge(
            Router::new()
                .route(&protocol.path, any(endpoint_handler))
                .with_state(endpoint),
        );
    }

    router
}

/// Per-field result of validating one request.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    Valid,
    Invalid(ValidationError),
    Missed,
}

impl FieldOutcome {
    fn statistics_suffix(&self) -> &'static str {
        match self {
            FieldOutcome::Valid => "args.valid",
            FieldOutcome::Invalid(_) => "args.invalid",
            FieldOutcome::Missed => "args.missed",
        }
    }
}

/// Fields split by outcome, in declaration order.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: Map<String, Value>,
    pub invalid: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct SuccessEnvelope<'a> {
    code: ErrorCode,
    valid: &'a Map<String, Value>,
    invalid: &'a Map<String, Value>,
}

#[derive(Debug)]
struct CompiledField {
    name: String,
    validator: Option<Validator>,
}

/// A configured protocol with its validators compiled.
#[derive(Debug)]
pub struct Endpoint {
    path: String,
    method: String,
    fields: Vec<CompiledField>,
    statistics: Arc<StatisticsTree>,
}

impl Endpoint {
    pub fn compile(protocol: &ProtocolConfig, statistics: Arc<StatisticsTree>) -> Self {
        let fields = protocol
            .fields
            .iter()
            .map(|field| CompiledField {
                name: field.name.clone(),
                validator: compile(field),
            })
            .collect();

        Self {
            path: protocol.path.clone(),
            method: protocol.method.clone(),
            fields,
            statistics,
        }
    }

    /// Handles one request body.
    ///
    /// The hit and body size are counted before the method is checked, so
    /// rejected requests still show up in the statistics.
    pub fn handle(&self, method: &str, body: &[u8]) -> Result<ValidationReport, RequestError> {
        self.record_hit(body.len());

        if method != self.method {
            return Err(RequestError::MethodNotSupported(method.to_string()));
        }

        let data = match serde_json::from_slice::<Value>(body)? {
            Value::Object(data) => data,
            other => return Err(RequestError::NotAnObject(ValueKind::of(&other))),
        };

        Ok(self.validate(&data))
    }

    /// Validates every declared field of a decoded body.
    ///
    /// Fields not declared for the endpoint are ignored.
    pub fn validate(&self, data: &Map<String, Value>) -> ValidationReport {
        let mut report = ValidationReport::default();

        for field in &self.fields {
            let outcome = match (data.get(&field.name), &field.validator) {
                (None, _) => FieldOutcome::Missed,
                (Some(_), None) => FieldOutcome::Valid,
                (Some(value), Some(validator)) => match validator.validate(value) {
                    Ok(()) => FieldOutcome::Valid,
                    Err(error) => FieldOutcome::Invalid(error),
                },
            };

            self.record(outcome.statistics_suffix(), 1);

            match outcome {
                FieldOutcome::Valid => {
                    let value = data.get(&field.name).cloned().unwrap_or(Value::Null);
                    report.valid.insert(field.name.clone(), value);
                }
                FieldOutcome::Invalid(error) => {
                    debug!(field = %field.name, %error, "field rejected");
                    report
                        .invalid
                        .insert(field.name.clone(), Value::String(format!("<err: {error}>")));
                }
                FieldOutcome::Missed => {
                    report
                        .invalid
                        .insert(field.name.clone(), Value::String(MISSED.to_string()));
                }
            }
        }

        report
    }

    fn record_hit(&self, body_len: usize) {
        self.record("request", 1);
        self.record("total_size", i64::try_from(body_len).unwrap_or(i64::MAX));
    }

    fn record(&self, suffix: &str, delta: i64) {
        let key = format!("{}.{}", self.path, suffix);
        if let Err(error) = self.statistics.increment(&key, delta) {
            warn!(%key, %error, "failed to record statistic");
        }
    }
}

async fn endpoint_handler(
    State(endpoint): State<Arc<Endpoint>>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    endpoint_span(&endpoint.path, method.as_str()).in_scope(|| {
        let result = match body {
            Ok(body) => endpoint.handle(method.as_str(), &body),
            Err(rejection) => {
                endpoint.record_hit(0);
                Err(RequestError::BodyUnreadable(rejection.body_text()))
            }
        };

        match result {
            Ok(report) => {
                debug!(
                    valid = report.valid.len(),
                    invalid = report.invalid.len(),
                    "request validated"
                );
                let envelope = SuccessEnvelope {
                    code: ErrorCode::Ok,
                    valid: &report.valid,
                    invalid: &report.invalid,
                };
                (StatusCode::OK, Json(envelope)).into_response()
            }
            Err(error) => {
                debug!(
                    code = %error.code(),
                    category = error.code().category(),
                    %error,
                    "request rejected"
                );
                error.into_response()
            }
        }
    })
}

#[derive(Debug)]
struct StatisticsRoute {
    path: String,
    statistics: Arc<StatisticsTree>,
}

/// Counts the read itself, then serves the snapshot.
async fn statistics_handler(State(route): State<Arc<StatisticsRoute>>) -> Response {
    let key = format!("{}.request", route.path);
    if let Err(error) = route.statistics.increment(&key, 1) {
        warn!(%key, %error, "failed to record statistic");
    }

    match route.statistics.snapshot() {
        Ok(snapshot) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            snapshot,
        )
            .into_response(),
        Err(error) => {
            warn!(%error, "failed to serialize statistics");
            RequestError::from(error).into_response()
        }
    }
}
