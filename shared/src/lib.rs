#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod event;
pub mod fetch;
pub mod model;
pub mod pagination;
pub mod password;
pub mod selection;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::ExplorerConfig;
pub use event::Event;
pub use model::Model;

pub const DEFAULT_API_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 500;
pub const DEFAULT_FULL_LIST_LIMIT: usize = 100_000;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PICTURE_BYTES: u64 = 2 * 1024 * 1024;
pub const ALLOWED_PICTURE_TYPES: &[&str] = &["image/png", "image/jpeg"];

pub const ALLOWED_COUNTRIES: &[&str] = &[
    "Argentina",
    "Australia",
    "Belarus",
    "Brazil",
    "Canada",
    "China",
    "France",
    "Germany",
    "India",
    "Italy",
    "Japan",
    "Kazakhstan",
    "Mexico",
    "Poland",
    "Russia",
    "Spain",
    "Ukraine",
    "United Kingdom",
    "United States",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Http,
    NotFound,
    RateLimited,
    Server,
    Deserialization,
    Serialization,
    Storage,
    Validation,
    InvalidState,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Http => "HTTP_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimited => "RATE_LIMITED",
            Self::Server => "SERVER_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::Storage => "STORAGE_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::InvalidState => "INVALID_STATE",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::RateLimited | Self::Server | Self::Storage => {
                ErrorSeverity::Transient
            }

            Self::Deserialization | Self::Serialization | Self::InvalidState => {
                ErrorSeverity::Fatal
            }

            Self::Http | Self::NotFound | Self::Validation => {
                ErrorSeverity::Permanent
            }
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::RateLimited | Self::Server | Self::Storage
        )
    }

    #[must_use]
    pub const fn for_http_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::Server,
            _ => Self::Http,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    /// Message shown to the user. Upstream errors keep the message extracted
    /// from the response body.
    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Http
            | ErrorKind::NotFound
            | ErrorKind::RateLimited
            | ErrorKind::Server
            | ErrorKind::Validation => self.message.clone(),
            ErrorKind::Network => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Deserialization | ErrorKind::Serialization => {
                "The server sent data we could not read. Please try again later.".into()
            }
            ErrorKind::Storage => "Unable to access local storage.".into(),
            ErrorKind::InvalidState => {
                "The app is in an invalid state. Please reload the page.".into()
            }
        }
    }

    #[must_use]
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::for_http_status(status), message)
            .with_context("http_status", status.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

#[must_use]
pub fn get_current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub fn now() -> Self {
        Self(get_current_time_ms())
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl Default for UnixTimeMs {
    fn default() -> Self {
        Self::now()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub is_retryable: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == ErrorSeverity::Transient,
            is_retryable: e.is_retryable(),
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListItemView {
    pub id: Option<u32>,
    pub name: String,
    pub url: String,
    pub is_selected: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExplorerView {
    pub search_term: String,
    /// Last submitted search, offered as the search box's initial value.
    pub remembered_search: String,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub items: Vec<ListItemView>,
    pub is_loading: bool,
    pub error: Option<UserFacingError>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetailView {
    Hidden,
    Loading { key: String },
    Ready { item: model::DetailItem },
    Failed { key: String, error: UserFacingError },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectionView {
    pub count: usize,
    pub items: Vec<selection::SelectedItem>,
    pub export: Option<selection::CsvExport>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionView {
    pub id: String,
    pub created_at_ms: u64,
    pub kind: model::FormStyle,
    pub name: String,
    pub age: u32,
    pub email: String,
    pub country: String,
    pub gender: model::Gender,
    pub accept_terms: bool,
    pub picture_name: String,
}

impl From<&model::Submission> for SubmissionView {
    fn from(s: &model::Submission) -> Self {
        Self {
            id: s.id.to_string(),
            created_at_ms: s.created_at.as_millis(),
            kind: s.kind,
            name: s.data.name.clone(),
            age: s.data.age,
            email: s.data.email.clone(),
            country: s.data.country.clone(),
            gender: s.data.gender,
            accept_terms: s.data.accept_terms,
            picture_name: s.data.picture.name.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FormsView {
    pub values: model::FormValues,
    pub errors: validation::FieldErrors,
    pub uncontrolled_errors: validation::FieldErrors,
    pub password_strength: password::PasswordStrength,
    pub countries: Vec<String>,
    pub submissions: Vec<SubmissionView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub query_string: String,
    pub theme: model::Theme,
    pub explorer: ExplorerView,
    pub detail: DetailView,
    pub selection: SelectionView,
    pub forms: FormsView,
    pub error: Option<UserFacingError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_for_http_status() {
        assert_eq!(ErrorKind::for_http_status(404), ErrorKind::NotFound);
        assert_eq!(ErrorKind::for_http_status(429), ErrorKind::RateLimited);
        assert_eq!(ErrorKind::for_http_status(503), ErrorKind::Server);
        assert_eq!(ErrorKind::for_http_status(400), ErrorKind::Http);
    }

    #[test]
    fn test_http_errors_keep_extracted_message() {
        let error = AppError::from_http_status(404, "Pokemon not found");
        assert_eq!(error.user_facing_message(), "Pokemon not found");
        assert_eq!(error.context.get("http_status").map(String::as_str), Some("404"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_fatal_errors_are_not_retryable() {
        let error = AppError::new(ErrorKind::Storage, "disk").with_internal("quota");
        assert!(error.is_retryable());

        let mut fatal = error.clone();
        fatal.severity = ErrorSeverity::Fatal;
        assert!(!fatal.is_retryable());
        assert_eq!(error.to_string(), "[STORAGE_ERROR] disk (internal: quota)");
    }

    #[test]
    fn test_user_facing_error_conversion() {
        let error = AppError::new(ErrorKind::Network, "connection reset");
        let view = UserFacingError::from(&error);
        assert!(view.is_transient);
        assert!(view.is_retryable);
        assert_eq!(view.error_code, "NETWORK_ERROR");
        assert!(view.message.contains("internet connection"));
    }
}
