//! Form schema: independent per-field validators followed by cross-field
//! invariants. Validation never fails loudly; it returns a field-keyed map.

use image::ImageFormat;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use crate::model::{FormField, FormValues, Gender, ParsedForm, PictureFile};
use crate::{ALLOWED_COUNTRIES, ALLOWED_PICTURE_TYPES, MAX_PICTURE_BYTES, MIN_PASSWORD_LENGTH};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex pattern")
});

/// At most one message per field; valid fields are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// First failing rule wins: a second message for the same field is ignored.
    pub fn insert_first(&mut self, field: FormField, message: impl Into<String>) {
        self.0
            .entry(field.key().to_string())
            .or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0.get(field.key()).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, field: FormField) -> bool {
        self.0.contains_key(field.key())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn retain_fields(&mut self, fields: &BTreeSet<FormField>) {
        let keys: BTreeSet<&str> = fields.iter().map(|f| f.key()).collect();
        self.0.retain(|k, _| keys.contains(k.as_str()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Success(ParsedForm),
    Failure(FieldErrors),
}

impl ValidationOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Success(_) => None,
            Self::Failure(errors) => Some(errors),
        }
    }
}

type Check = fn(&FormValues) -> Result<(), String>;

struct FieldValidator {
    field: FormField,
    check: Check,
}

struct CrossFieldRule {
    /// Field the error is reported on.
    field: FormField,
    depends_on: &'static [FormField],
    check: Check,
}

pub struct FormSchema {
    fields: Vec<FieldValidator>,
    cross_field: Vec<CrossFieldRule>,
}

impl Default for FormSchema {
    fn default() -> Self {
        Self::standard()
    }
}

impl FormSchema {
    #[must_use]
    pub fn standard() -> Self {
        Self {
            fields: vec![
                FieldValidator { field: FormField::Name, check: check_name },
                FieldValidator { field: FormField::Age, check: check_age },
                FieldValidator { field: FormField::Email, check: check_email },
                FieldValidator { field: FormField::Country, check: check_country },
                FieldValidator { field: FormField::Password, check: check_password },
                FieldValidator {
                    field: FormField::ConfirmPassword,
                    check: check_confirm_password,
                },
                FieldValidator { field: FormField::Gender, check: check_gender },
                FieldValidator {
                    field: FormField::AcceptTerms,
                    check: check_accept_terms,
                },
                FieldValidator { field: FormField::Picture, check: check_picture },
            ],
            cross_field: vec![CrossFieldRule {
                field: FormField::ConfirmPassword,
                depends_on: &[FormField::Password, FormField::ConfirmPassword],
                check: check_passwords_match,
            }],
        }
    }

    #[must_use]
    pub fn collect_errors(&self, values: &FormValues) -> FieldErrors {
        let mut errors = FieldErrors::default();

        for validator in &self.fields {
            if let Err(message) = (validator.check)(values) {
                errors.insert_first(validator.field, message);
            }
        }

        for rule in &self.cross_field {
            if rule.depends_on.iter().any(|f| errors.contains(*f)) {
                continue;
            }
            if let Err(message) = (rule.check)(values) {
                errors.insert_first(rule.field, message);
            }
        }

        errors
    }

    /// Errors for the given fields only, as shown while the user is typing.
    #[must_use]
    pub fn errors_for(&self, values: &FormValues, fields: &BTreeSet<FormField>) -> FieldErrors {
        let mut errors = self.collect_errors(values);
        errors.retain_fields(fields);
        errors
    }

    #[must_use]
    pub fn validate(&self, values: &FormValues) -> ValidationOutcome {
        let errors = self.collect_errors(values);
        if !errors.is_empty() {
            return ValidationOutcome::Failure(errors);
        }

        match parse(values) {
            Some(data) => ValidationOutcome::Success(data),
            None => {
                tracing::error!("form passed every rule but could not be parsed");
                let mut errors = FieldErrors::default();
                errors.insert_first(FormField::Name, "Form could not be processed");
                ValidationOutcome::Failure(errors)
            }
        }
    }
}

#[must_use]
pub fn validate(values: &FormValues) -> ValidationOutcome {
    FormSchema::standard().validate(values)
}

fn parse(values: &FormValues) -> Option<ParsedForm> {
    Some(ParsedForm {
        name: values.name.clone(),
        age: parse_age(&values.age).ok()?,
        email: values.email.trim().to_string(),
        country: values.country.clone(),
        password: values.password.clone(),
        gender: Gender::parse(values.gender.as_deref()?)?,
        accept_terms: values.accept_terms,
        picture: values.picture.clone()?,
    })
}

fn parse_age(raw: &str) -> Result<u32, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("Age is required".into());
    }
    let age: i64 = raw.parse().map_err(|_| "Age must be a number".to_string())?;
    if age < 0 {
        return Err("Age must be a non-negative number".into());
    }
    u32::try_from(age).map_err(|_| "Age is out of range".to_string())
}

fn check_name(values: &FormValues) -> Result<(), String> {
    if values.name.trim().is_empty() {
        return Err("Name is required".into());
    }
    if !values.name.chars().next().is_some_and(char::is_uppercase) {
        return Err("Name must start with an uppercase letter".into());
    }
    Ok(())
}

fn check_age(values: &FormValues) -> Result<(), String> {
    parse_age(&values.age).map(|_| ())
}

fn check_email(values: &FormValues) -> Result<(), String> {
    let email = values.email.trim();
    if email.is_empty() {
        return Err("Email is required".into());
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err("Invalid email address".into());
    }
    Ok(())
}

fn check_country(values: &FormValues) -> Result<(), String> {
    if values.country.is_empty() {
        return Err("Country is required".into());
    }
    if !ALLOWED_COUNTRIES.contains(&values.country.as_str()) {
        return Err("Please select a country from the list".into());
    }
    Ok(())
}

fn check_password(values: &FormValues) -> Result<(), String> {
    let password = &values.password;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err("Password must contain at least one uppercase letter".into());
    }
    if !password.chars().any(char::is_lowercase) {
        return Err("Password must contain at least one lowercase letter".into());
    }
    if !password.chars().any(char::is_numeric) {
        return Err("Password must contain at least one number".into());
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err("Password must contain at least one special character".into());
    }
    Ok(())
}

fn check_confirm_password(values: &FormValues) -> Result<(), String> {
    if values.confirm_password.is_empty() {
        return Err("Please confirm your password".into());
    }
    Ok(())
}

fn check_passwords_match(values: &FormValues) -> Result<(), String> {
    if values.password == values.confirm_password {
        Ok(())
    } else {
        Err("Passwords do not match".into())
    }
}

fn check_gender(values: &FormValues) -> Result<(), String> {
    match values.gender.as_deref() {
        None => Err("Please select a gender".into()),
        Some(value) if Gender::parse(value).is_none() => Err("Invalid gender".into()),
        Some(_) => Ok(()),
    }
}

fn check_accept_terms(values: &FormValues) -> Result<(), String> {
    if values.accept_terms {
        Ok(())
    } else {
        Err("You must accept the terms and conditions".into())
    }
}

fn check_picture(values: &FormValues) -> Result<(), String> {
    let Some(picture) = &values.picture else {
        return Err("Picture is required".into());
    };
    if picture.effective_size() > MAX_PICTURE_BYTES {
        return Err(format!(
            "File size must be less than {} MB",
            MAX_PICTURE_BYTES / (1024 * 1024)
        ));
    }
    if !ALLOWED_PICTURE_TYPES.contains(&picture.mime_type.as_str()) {
        return Err("Only PNG and JPEG images are allowed".into());
    }
    if let Some(sniffed) = sniff_mime_type(picture) {
        if sniffed != picture.mime_type {
            return Err("File content does not match its type".into());
        }
    }
    Ok(())
}

/// MIME type detected from the attached bytes, if any were attached.
fn sniff_mime_type(picture: &PictureFile) -> Option<&'static str> {
    let bytes = picture.bytes.as_deref()?;
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Some("image/png"),
        Ok(ImageFormat::Jpeg) => Some("image/jpeg"),
        _ => Some("application/octet-stream"),
    }
}
