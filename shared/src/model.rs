use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use uuid::Uuid;

use crate::capabilities::PersistedSlot;
use crate::config::ExplorerConfig;
use crate::fetch::{DetailCache, RequestSeq};
use crate::pagination::{Named, PaginationSearchState};
use crate::selection::{CsvExport, SelectionSet};
use crate::validation::FieldErrors;
use crate::{AppError, UnixTimeMs};

/// Entry of the upstream list endpoint. Identity is the `url`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListItem {
    pub name: String,
    pub url: String,
}

impl ListItem {
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Numeric id from the trailing path segment of `url`, if there is one.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        parse_trailing_id(&self.url)
    }
}

impl Named for ListItem {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Parses `.../pokemon/25/` and `.../pokemon/25` as `25`.
#[must_use]
pub fn parse_trailing_id(url: &str) -> Option<u32> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|segment| segment.parse().ok())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailItem {
    pub id: u32,
    pub name: String,
    pub image_url: Option<String>,
    pub stats: Vec<Stat>,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStyle {
    Controlled,
    Uncontrolled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
}

impl PictureFile {
    /// Attached byte length wins over the declared size.
    #[must_use]
    pub fn effective_size(&self) -> u64 {
        self.bytes
            .as_ref()
            .map_or(self.size_bytes, |b| u64::try_from(b.len()).unwrap_or(u64::MAX))
    }
}

impl fmt::Debug for PictureFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PictureFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.size_bytes)
            .field("bytes_len", &self.bytes.as_ref().map(Vec::len))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    Name,
    Age,
    Email,
    Country,
    Password,
    ConfirmPassword,
    Gender,
    AcceptTerms,
    Picture,
}

impl FormField {
    pub const ALL: [Self; 9] = [
        Self::Name,
        Self::Age,
        Self::Email,
        Self::Country,
        Self::Password,
        Self::ConfirmPassword,
        Self::Gender,
        Self::AcceptTerms,
        Self::Picture,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Age => "age",
            Self::Email => "email",
            Self::Country => "country",
            Self::Password => "password",
            Self::ConfirmPassword => "confirmPassword",
            Self::Gender => "gender",
            Self::AcceptTerms => "acceptTerms",
            Self::Picture => "picture",
        }
    }
}

/// Single-field edit coming from the controlled form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum FieldUpdate {
    Name(String),
    Age(String),
    Email(String),
    Country(String),
    Password(String),
    ConfirmPassword(String),
    Gender(Option<String>),
    AcceptTerms(bool),
    Picture(Option<PictureFile>),
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormValues {
    pub name: String,
    pub age: String,
    pub email: String,
    pub country: String,
    pub password: String,
    pub confirm_password: String,
    pub gender: Option<String>,
    pub accept_terms: bool,
    pub picture: Option<PictureFile>,
}

impl FormValues {
    pub fn apply(&mut self, update: FieldUpdate) -> FormField {
        match update {
            FieldUpdate::Name(v) => {
                self.name = v;
                FormField::Name
            }
            FieldUpdate::Age(v) => {
                self.age = v;
                FormField::Age
            }
            FieldUpdate::Email(v) => {
                self.email = v;
                FormField::Email
            }
            FieldUpdate::Country(v) => {
                self.country = v;
                FormField::Country
            }
            FieldUpdate::Password(v) => {
                self.password = v;
                FormField::Password
            }
            FieldUpdate::ConfirmPassword(v) => {
                self.confirm_password = v;
                FormField::ConfirmPassword
            }
            FieldUpdate::Gender(v) => {
                self.gender = v;
                FormField::Gender
            }
            FieldUpdate::AcceptTerms(v) => {
                self.accept_terms = v;
                FormField::AcceptTerms
            }
            FieldUpdate::Picture(v) => {
                self.picture = v;
                FormField::Picture
            }
        }
    }

    /// Copy safe to write to local storage: no passwords, no file.
    #[must_use]
    pub fn draft_snapshot(&self) -> Self {
        Self {
            password: String::new(),
            confirm_password: String::new(),
            picture: None,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn is_pristine(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Debug for FormValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormValues")
            .field("name", &self.name)
            .field("age", &self.age)
            .field("email", &self.email)
            .field("country", &self.country)
            .field("password_present", &!self.password.is_empty())
            .field("confirm_password_present", &!self.confirm_password.is_empty())
            .field("gender", &self.gender)
            .field("accept_terms", &self.accept_terms)
            .field("picture", &self.picture)
            .finish()
    }
}

/// Typed output of a successful validation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedForm {
    pub name: String,
    pub age: u32,
    pub email: String,
    pub country: String,
    pub password: String,
    pub gender: Gender,
    pub accept_terms: bool,
    pub picture: PictureFile,
}

impl fmt::Debug for ParsedForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedForm")
            .field("name", &self.name)
            .field("age", &self.age)
            .field("email", &self.email)
            .field("country", &self.country)
            .field("password", &"[REDACTED]")
            .field("gender", &self.gender)
            .field("accept_terms", &self.accept_terms)
            .field("picture", &self.picture)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub created_at: UnixTimeMs,
    pub kind: FormStyle,
    pub data: ParsedForm,
}

impl Submission {
    #[must_use]
    pub fn new(kind: FormStyle, data: ParsedForm) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: UnixTimeMs::now(),
            kind,
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListMode {
    /// One page served by the upstream offset/limit endpoint.
    Server,
    /// Whole list, filtered and paged locally.
    FullList,
}

#[derive(Debug, Default)]
pub struct ListState {
    pub items: Vec<ListItem>,
    pub total: usize,
    pub full_list: Option<Vec<ListItem>>,
    /// Sequence number of the full-list request in flight, if any.
    pub pending_full_list: Option<u64>,
    pub is_loading: bool,
    pub seq: RequestSeq,
    pub error: Option<AppError>,
}

#[derive(Debug, Default)]
pub struct DetailState {
    pub cache: DetailCache,
    pub in_flight: HashSet<String>,
    pub selected_key: Option<String>,
    pub error: Option<AppError>,
}

#[derive(Debug, Default)]
pub struct ControlledForm {
    pub values: FormValues,
    pub touched: BTreeSet<FormField>,
    pub errors: FieldErrors,
}

impl ControlledForm {
    pub fn reset(&mut self) {
        self.values = FormValues::default();
        self.touched.clear();
        self.errors = FieldErrors::default();
    }
}

#[derive(Debug, Default)]
pub struct FormState {
    pub controlled: ControlledForm,
    pub uncontrolled_errors: FieldErrors,
    pub submissions: Vec<Submission>,
}

/// Whole application state, owned by the core and mutated only in `update`.
#[derive(Debug, Default)]
pub struct Model {
    pub config: ExplorerConfig,
    pub navigation: PaginationSearchState,
    pub list: ListState,
    pub details: DetailState,
    pub selection: SelectionSet,
    pub export: Option<CsvExport>,
    pub theme: Theme,
    pub forms: FormState,
    pub active_error: Option<AppError>,
    /// Slots the user changed this session; stored values no longer apply.
    pub user_set: HashSet<PersistedSlot>,
}

impl Model {
    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }
}
