use serde::{Deserialize, Serialize};

use crate::capabilities::{HttpError, HttpResponse, PersistedSlot, StorageError};
use crate::config::ExplorerConfig;
use crate::model::{FieldUpdate, FormValues, ListItem, ListMode};

pub type HttpOutcome = Result<HttpResponse, HttpError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Noop,

    // Lifecycle
    AppStarted {
        /// Query string of the page the shell was opened on.
        query: String,
    },
    Configure(ExplorerConfig),
    DismissError,

    // Navigation
    NavigationChanged {
        query: String,
    },
    SearchSubmitted {
        term: String,
    },
    PageSelected {
        page: usize,
    },
    RetryRequested,

    // Details
    ItemSelected {
        id_or_name: String,
    },
    DetailClosed,
    ClearDetailCache,

    // Selection & Export
    ToggleSelection(ListItem),
    ClearSelection,
    ExportSelectionRequested,
    ExportDismissed,
    ToggleTheme,

    // Forms
    FormFieldChanged(FieldUpdate),
    ControlledFormSubmitted,
    UncontrolledFormSubmitted(Box<FormValues>),
    FormReset,

    // Capability Responses (boxed to keep enum size small)
    #[serde(skip)]
    ListResponse {
        seq: u64,
        mode: ListMode,
        result: Box<HttpOutcome>,
    },
    #[serde(skip)]
    DetailResponse {
        key: String,
        url: String,
        result: Box<HttpOutcome>,
    },
    #[serde(skip)]
    StorageLoaded {
        slot: PersistedSlot,
        result: Result<Option<Vec<u8>>, StorageError>,
    },
    #[serde(skip)]
    StorageWritten {
        slot: PersistedSlot,
        result: Result<(), StorageError>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::AppStarted { .. } => "app_started",
            Self::Configure(_) => "configure",
            Self::DismissError => "dismiss_error",
            Self::NavigationChanged { .. } => "navigation_changed",
            Self::SearchSubmitted { .. } => "search_submitted",
            Self::PageSelected { .. } => "page_selected",
            Self::RetryRequested => "retry_requested",
            Self::ItemSelected { .. } => "item_selected",
            Self::DetailClosed => "detail_closed",
            Self::ClearDetailCache => "clear_detail_cache",
            Self::ToggleSelection(_) => "toggle_selection",
            Self::ClearSelection => "clear_selection",
            Self::ExportSelectionRequested => "export_selection_requested",
            Self::ExportDismissed => "export_dismissed",
            Self::ToggleTheme => "toggle_theme",
            Self::FormFieldChanged(_) => "form_field_changed",
            Self::ControlledFormSubmitted => "controlled_form_submitted",
            Self::UncontrolledFormSubmitted(_) => "uncontrolled_form_submitted",
            Self::FormReset => "form_reset",
            Self::ListResponse { .. } => "list_response",
            Self::DetailResponse { .. } => "detail_response",
            Self::StorageLoaded { .. } => "storage_loaded",
            Self::StorageWritten { .. } => "storage_written",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::Noop
                | Self::AppStarted { .. }
                | Self::Configure(_)
                | Self::NavigationChanged { .. }
                | Self::ListResponse { .. }
                | Self::DetailResponse { .. }
                | Self::StorageLoaded { .. }
                | Self::StorageWritten { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_events_deserialize() {
        let event: Event = serde_json::from_str(r#"{"SearchSubmitted":{"term":"pika"}}"#).unwrap();
        assert_eq!(event.name(), "search_submitted");

        let event: Event =
            serde_json::from_str(r#"{"FormFieldChanged":{"field":"age","value":"12"}}"#).unwrap();
        assert!(matches!(event, Event::FormFieldChanged(FieldUpdate::Age(ref a)) if a == "12"));
    }

    #[test]
    fn test_responses_are_not_user_initiated() {
        let response = Event::ListResponse {
            seq: 1,
            mode: ListMode::Server,
            result: Box::new(Ok(HttpResponse::new(200, Vec::new()))),
        };
        assert!(!response.is_user_initiated());
        assert!(Event::ToggleTheme.is_user_initiated());
    }

    #[test]
    fn test_internal_events_cannot_be_sent_by_the_shell() {
        let parsed = serde_json::from_str::<Event>(r#"{"StorageWritten":{"slot":"Theme","result":{"Ok":null}}}"#);
        assert!(parsed.is_err());
    }
}
