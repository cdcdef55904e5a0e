use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::{AppError, ErrorKind};

pub const MAX_ERROR_BODY_PREVIEW: usize = 200;

/// Field names tried, in order, when pulling a message out of an error body.
const ERROR_MESSAGE_FIELDS: [&str; 3] = ["message", "detail", "error"];

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpError {
    /// Non-2xx reply. Displays only the extracted message.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Transport failure, carrying the transport's own message.
    #[error("{message}")]
    Network { message: String },

    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },
}

impl From<HttpError> for AppError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Status { status, message } => AppError::from_http_status(status, message),
            HttpError::Network { message } => {
                AppError::new(ErrorKind::Network, message.clone()).with_internal(message)
            }
            HttpError::InvalidResponse { reason } => {
                AppError::new(ErrorKind::Deserialization, "Invalid response from server")
                    .with_internal(reason)
            }
        }
    }
}

/// Status and raw body of a completed request, independent of the HTTP
/// client the shell uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    status: u16,
    body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string().into_bytes())
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(|e| HttpError::InvalidResponse {
            reason: format!("failed to parse JSON: {e}"),
        })
    }

    /// Passes 2xx responses through; anything else becomes `HttpError::Status`.
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HttpError::Status {
                status: self.status,
                message: error_message(self.status, &self.body),
            })
        }
    }
}

/// Message for a failed response: the first string-valued `message`,
/// `detail` or `error` field of a JSON body, else a generic status line.
/// A body that cannot be read is logged and otherwise ignored.
#[must_use]
pub fn error_message(status: u16, body: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => {
            let extracted = ERROR_MESSAGE_FIELDS
                .iter()
                .find_map(|field| value.get(field).and_then(serde_json::Value::as_str))
                .filter(|message| !message.trim().is_empty());
            if let Some(message) = extracted {
                return message.to_string();
            }
        }
        Err(e) => {
            tracing::warn!(
                status,
                error = %e,
                body = %body_preview(body),
                "error response body is not JSON"
            );
        }
    }
    format!("HTTP error! Status: {status}")
}

fn body_preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.chars().count() <= MAX_ERROR_BODY_PREVIEW {
        text.into_owned()
    } else {
        let cut: String = text.chars().take(MAX_ERROR_BODY_PREVIEW).collect();
        format!("{cut}...")
    }
}

/// Converts the shell's reply into an [`HttpResponse`]. Status errors from
/// the client keep their status and body; everything else is a transport
/// failure.
pub fn into_raw_response(
    result: Result<crux_http::Response<Vec<u8>>, crux_http::Error>,
) -> Result<HttpResponse, HttpError> {
    match result {
        Ok(mut response) => {
            let status = u16::from(response.status());
            Ok(HttpResponse::new(status, response.take_body().unwrap_or_default()))
        }
        Err(crux_http::Error::Http(e)) => {
            Ok(HttpResponse::new(u16::from(e.code), e.body.unwrap_or_default()))
        }
        Err(e) => Err(HttpError::Network {
            message: e.to_string(),
        }),
    }
}
