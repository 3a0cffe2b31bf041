//! Response encoding and error mapping.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::domain::BrokerError;
use crate::output::yaml::to_yaml;

/// `?output_format=` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Encode `value` with `status` in the requested format.
pub fn encode<T: Serialize>(format: OutputFormat, status: StatusCode, value: &T) -> Response {
    let encoded = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(|body| (body, "application/json"))
            .map_err(|e| e.to_string()),
        OutputFormat::Yaml => to_yaml(value)
            .map(|body| (body, "application/yaml"))
            .map_err(|e| e.to_string()),
    };
    match encoded {
        Ok((body, content_type)) => (status, [(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "cannot encode response");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

/// Render a broker error as its stable error body.
///
/// Internal errors are logged here and reach the client as a generic message.
pub fn error_response(format: OutputFormat, err: &BrokerError) -> Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "internal error");
    } else {
        tracing::debug!(code = err.code(), error = %err, "request rejected");
    }
    encode(format, status, &err.to_body(false))
}
