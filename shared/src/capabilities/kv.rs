use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

use crate::{AppError, ErrorKind};

pub const MAX_VALUE_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyNamespace {
    Settings,
    Selection,
    Forms,
}

impl KeyNamespace {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::Selection => "selection",
            Self::Forms => "forms",
        }
    }
}

/// Every value the core keeps in the shell's key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersistedSlot {
    LastSearch,
    Theme,
    Selection,
    FormDraft,
}

impl PersistedSlot {
    pub const ALL: [Self; 4] = [Self::LastSearch, Self::Theme, Self::Selection, Self::FormDraft];

    #[must_use]
    pub const fn namespace(self) -> KeyNamespace {
        match self {
            Self::LastSearch | Self::Theme => KeyNamespace::Settings,
            Self::Selection => KeyNamespace::Selection,
            Self::FormDraft => KeyNamespace::Forms,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LastSearch => "last_search",
            Self::Theme => "theme",
            Self::Selection => "snapshot",
            Self::FormDraft => "draft",
        }
    }

    #[must_use]
    pub fn kv_key(self) -> String {
        format!("{}:{}", self.namespace().prefix(), self.name())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageError {
    #[error("failed to read '{key}': {message}")]
    Read { key: String, message: String },

    #[error("failed to write '{key}': {message}")]
    Write { key: String, message: String },

    #[error("corrupt value under '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    #[error("failed to encode value for '{key}': {reason}")]
    Encode { key: String, reason: String },

    #[error("value for '{key}' too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { key: String, size: usize, max: usize },
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        let kind = match &e {
            StorageError::Corrupt { .. } => ErrorKind::Deserialization,
            StorageError::Encode { .. } => ErrorKind::Serialization,
            _ => ErrorKind::Storage,
        };
        AppError::new(kind, "Local storage is unavailable").with_internal(e.to_string())
    }
}

/// Maps a `get` reply to the stored bytes, `None` when the key is absent.
pub fn read_result<E: Display>(
    slot: PersistedSlot,
    result: Result<Option<Vec<u8>>, E>,
) -> Result<Option<Vec<u8>>, StorageError> {
    result
        .map(|value| value.filter(|bytes| !bytes.is_empty()))
        .map_err(|e| StorageError::Read {
            key: slot.kv_key(),
            message: e.to_string(),
        })
}

pub fn write_result<T, E: Display>(
    slot: PersistedSlot,
    result: Result<T, E>,
) -> Result<(), StorageError> {
    result.map(|_| ()).map_err(|e| StorageError::Write {
        key: slot.kv_key(),
        message: e.to_string(),
    })
}

pub fn encode<T: Serialize>(slot: PersistedSlot, value: &T) -> Result<Vec<u8>, StorageError> {
    let bytes = serde_json::to_vec(value).map_err(|e| StorageError::Encode {
        key: slot.kv_key(),
        reason: e.to_string(),
    })?;
    if bytes.len() > MAX_VALUE_SIZE {
        return Err(StorageError::ValueTooLarge {
            key: slot.kv_key(),
            size: bytes.len(),
            max: MAX_VALUE_SIZE,
        });
    }
    Ok(bytes)
}

pub fn decode<T: DeserializeOwned>(slot: PersistedSlot, bytes: &[u8]) -> Result<T, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Corrupt {
        key: slot.kv_key(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_keys() {
        assert_eq!(PersistedSlot::LastSearch.kv_key(), "settings:last_search");
        assert_eq!(PersistedSlot::Theme.kv_key(), "settings:theme");
        assert_eq!(PersistedSlot::Selection.kv_key(), "selection:snapshot");
        assert_eq!(PersistedSlot::FormDraft.kv_key(), "forms:draft");
    }

    #[test]
    fn test_slot_keys_are_unique() {
        let keys: std::collections::HashSet<String> =
            PersistedSlot::ALL.iter().map(|s| s.kv_key()).collect();
        assert_eq!(keys.len(), PersistedSlot::ALL.len());
    }

    #[test]
    fn test_read_result_treats_empty_as_absent() {
        let ok: Result<Option<Vec<u8>>, String> = Ok(Some(Vec::new()));
        assert_eq!(read_result(PersistedSlot::Theme, ok).unwrap(), None);

        let value: Result<Option<Vec<u8>>, String> = Ok(Some(b"\"dark\"".to_vec()));
        assert_eq!(
            read_result(PersistedSlot::Theme, value).unwrap(),
            Some(b"\"dark\"".to_vec())
        );
    }

    #[test]
    fn test_read_error_carries_key() {
        let failed: Result<Option<Vec<u8>>, String> = Err("quota exceeded".into());
        let err = read_result(PersistedSlot::Selection, failed).unwrap_err();
        assert_eq!(
            err,
            StorageError::Read {
                key: "selection:snapshot".into(),
                message: "quota exceeded".into(),
            }
        );
    }

    #[test]
    fn test_write_result_discards_previous_value() {
        let ok: Result<Option<Vec<u8>>, String> = Ok(Some(b"old".to_vec()));
        assert!(write_result(PersistedSlot::FormDraft, ok).is_ok());
    }

    #[test]
    fn test_decode_corrupt_snapshot() {
        let err = decode::<Vec<String>>(PersistedSlot::Selection, b"{oops").unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));

        let app: AppError = err.into();
        assert_eq!(app.kind, ErrorKind::Deserialization);
    }

    #[test]
    fn test_encode_decode_string() {
        let bytes = encode(PersistedSlot::LastSearch, &"pika").unwrap();
        let back: String = decode(PersistedSlot::LastSearch, &bytes).unwrap();
        assert_eq!(back, "pika");
    }
}
