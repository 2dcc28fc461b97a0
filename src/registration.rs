//! Registration record the form renders, with per-field edit authority and validity.
//!
//! Writers are crate-private: only the field synchronizer mutates values or authority,
//! so the UI and embedders get a read-only view.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Registration form fields. Wire names are camelCase; snake_case is accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    #[serde(alias = "full_name")]
    FullName,
    Email,
    Phone,
    #[serde(alias = "date_of_birth")]
    DateOfBirth,
    Address,
    #[serde(alias = "has_license")]
    HasLicense,
    #[serde(alias = "license_number")]
    LicenseNumber,
    #[serde(alias = "preferred_transmission")]
    PreferredTransmission,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::FullName,
        Field::Email,
        Field::Phone,
        Field::DateOfBirth,
        Field::Address,
        Field::HasLicense,
        Field::LicenseNumber,
        Field::PreferredTransmission,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Field::FullName => "fullName",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::DateOfBirth => "dateOfBirth",
            Field::Address => "address",
            Field::HasLicense => "hasLicense",
            Field::LicenseNumber => "licenseNumber",
            Field::PreferredTransmission => "preferredTransmission",
        }
    }

    /// Parse a wire name in camelCase or snake_case.
    #[must_use]
    pub fn parse_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|ch| *ch != '_')
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        Field::ALL
            .into_iter()
            .find(|field| field.as_str().to_ascii_lowercase() == normalized)
    }

    #[must_use]
    pub fn is_flag(self) -> bool {
        matches!(self, Field::HasLicense)
    }

    /// Fields that must be non-empty regardless of other answers.
    #[must_use]
    pub fn always_required(self) -> bool {
        matches!(
            self,
            Field::FullName | Field::Email | Field::Phone | Field::DateOfBirth | Field::Address
        )
    }

    fn default_value(self) -> FieldValue {
        match self {
            Field::HasLicense => FieldValue::Flag(false),
            Field::PreferredTransmission => {
                FieldValue::Text(Transmission::Automatic.as_str().to_string())
            }
            _ => FieldValue::Text(String::new()),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field payload as carried on the wire: a string or a boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Flag(_) => None,
        }
    }

    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(flag) => Some(*flag),
            FieldValue::Text(_) => None,
        }
    }

    /// Convert a backend value into the shape `field` stores. Text is kept exactly as
    /// sent; only the licence flag is coerced.
    pub fn coerce_inbound(self, field: Field) -> Result<FieldValue, RecordError> {
        match (field, self) {
            (Field::HasLicense, value) => value.coerce_flag(field),
            (_, FieldValue::Text(text)) => Ok(FieldValue::Text(text)),
            (_, FieldValue::Flag(flag)) => Ok(FieldValue::Text(flag.to_string())),
        }
    }

    /// Convert a form edit. Stricter than backend values: text fields refuse booleans
    /// and the transmission must be one the form offers.
    pub fn coerce_edit(self, field: Field) -> Result<FieldValue, RecordError> {
        match (field, self) {
            (Field::HasLicense, value) => value.coerce_flag(field),
            (Field::PreferredTransmission, FieldValue::Text(text)) => {
                Transmission::parse(&text)
                    .map(|transmission| FieldValue::Text(transmission.as_str().to_string()))
                    .ok_or(RecordError::InvalidValue { field, value: text })
            }
            (_, FieldValue::Text(text)) => Ok(FieldValue::Text(text)),
            (_, FieldValue::Flag(_)) => Err(RecordError::TypeMismatch { field }),
        }
    }

    fn coerce_flag(self, field: Field) -> Result<FieldValue, RecordError> {
        match self {
            FieldValue::Flag(flag) => Ok(FieldValue::Flag(flag)),
            FieldValue::Text(text) => parse_yes_no(&text)
                .map(FieldValue::Flag)
                .ok_or(RecordError::InvalidValue { field, value: text }),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Flag(flag) => write!(f, "{flag}"),
            FieldValue::Text(text) => f.write_str(text),
        }
    }
}

/// Yes/no answer, judged by its first word ("Yes, I do" is a yes).
fn parse_yes_no(raw: &str) -> Option<bool> {
    let first_word = raw
        .trim()
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .next()
        .unwrap_or("");
    match first_word.to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transmission {
    Automatic,
    Manual,
}

impl Transmission {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Transmission::Automatic => "automatic",
            Transmission::Manual => "manual",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "automatic" => Some(Transmission::Automatic),
            "manual" => Some(Transmission::Manual),
            _ => None,
        }
    }
}

/// Which surface may currently write a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditAuthority {
    ChatControlled,
    #[default]
    UserControlled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    TypeMismatch { field: Field },
    InvalidValue { field: Field, value: String },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { field } => write!(f, "{field} does not accept a yes/no value"),
            Self::InvalidValue { field, value } => {
                write!(f, "{value:?} is not a valid value for {field}")
            }
        }
    }
}

impl std::error::Error for RecordError {}

/// Reasons the form may not be submitted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingFields(Vec<Field>),
    /// Present but outside what the form accepts.
    InvalidFields(Vec<Field>),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFields(fields) => {
                let names: Vec<&str> = fields.iter().map(|field| field.as_str()).collect();
                write!(f, "missing required fields: {}", names.join(", "))
            }
            Self::InvalidFields(fields) => {
                let names: Vec<&str> = fields.iter().map(|field| field.as_str()).collect();
                write!(f, "invalid values for: {}", names.join(", "))
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationRecord {
    values: BTreeMap<Field, FieldValue>,
    authority: BTreeMap<Field, EditAuthority>,
}

impl Default for RegistrationRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationRecord {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Field::ALL
                .into_iter()
                .map(|field| (field, field.default_value()))
                .collect(),
            authority: Field::ALL
                .into_iter()
                .map(|field| (field, EditAuthority::UserControlled))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, field: Field) -> &FieldValue {
        // Every field is seeded in `new`, so the lookup only misses on a logic error.
        self.values.get(&field).unwrap_or(&EMPTY_TEXT)
    }

    #[must_use]
    pub fn text(&self, field: Field) -> &str {
        self.get(field).as_text().unwrap_or("")
    }

    #[must_use]
    pub fn flag(&self, field: Field) -> bool {
        self.get(field).as_flag().unwrap_or(false)
    }

    #[must_use]
    pub fn authority(&self, field: Field) -> EditAuthority {
        self.authority.get(&field).copied().unwrap_or_default()
    }

    pub fn chat_controlled(&self) -> impl Iterator<Item = Field> + '_ {
        self.authority
            .iter()
            .filter(|(_, authority)| **authority == EditAuthority::ChatControlled)
            .map(|(field, _)| *field)
    }

    /// Store a backend-derived value, returning the one it replaced.
    pub(crate) fn apply(
        &mut self,
        field: Field,
        value: FieldValue,
    ) -> Result<FieldValue, RecordError> {
        let value = value.coerce_inbound(field)?;
        Ok(self.store(field, value))
    }

    /// Store a form edit, returning the value it replaced.
    pub(crate) fn apply_edit(
        &mut self,
        field: Field,
        value: FieldValue,
    ) -> Result<FieldValue, RecordError> {
        let value = value.coerce_edit(field)?;
        Ok(self.store(field, value))
    }

    fn store(&mut self, field: Field, value: FieldValue) -> FieldValue {
        self.values
            .insert(field, value)
            .unwrap_or_else(|| field.default_value())
    }

    pub(crate) fn set_authority(&mut self, field: Field, authority: EditAuthority) {
        self.authority.insert(field, authority);
    }

    /// Hand every field back to the user, returning the ones that were chat-controlled.
    pub(crate) fn release_all(&mut self) -> Vec<Field> {
        let released: Vec<Field> = self.chat_controlled().collect();
        for authority in self.authority.values_mut() {
            *authority = EditAuthority::UserControlled;
        }
        released
    }

    /// Fields that still block submission, in form order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<Field> {
        let mut missing: Vec<Field> = Field::ALL
            .into_iter()
            .filter(|field| field.always_required() && self.text(*field).trim().is_empty())
            .collect();
        if self.flag(Field::HasLicense) && self.text(Field::LicenseNumber).trim().is_empty() {
            missing.push(Field::LicenseNumber);
        }
        missing
    }

    /// Filled fields whose value the form does not accept.
    #[must_use]
    pub fn invalid_fields(&self) -> Vec<Field> {
        if Transmission::parse(self.text(Field::PreferredTransmission)).is_some() {
            Vec::new()
        } else {
            vec![Field::PreferredTransmission]
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }
        let invalid = self.invalid_fields();
        if !invalid.is_empty() {
            return Err(ValidationError::InvalidFields(invalid));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Flat camelCase object as the registration endpoint expects it.
    #[must_use]
    pub fn to_payload(&self) -> serde_json::Map<String, serde_json::Value> {
        self.values
            .iter()
            .map(|(field, value)| {
                let json = match (field, value) {
                    (_, FieldValue::Flag(flag)) => serde_json::Value::Bool(*flag),
                    (Field::PreferredTransmission, FieldValue::Text(text)) => {
                        let normalized = Transmission::parse(text)
                            .map_or_else(|| text.clone(), |t| t.as_str().to_string());
                        serde_json::Value::String(normalized)
                    }
                    (_, FieldValue::Text(text)) => serde_json::Value::String(text.clone()),
                };
                (field.as_str().to_string(), json)
            })
            .collect()
    }
}

static EMPTY_TEXT: FieldValue = FieldValue::Text(String::new());

#[cfg(test)]
pub(crate) fn filled_record() -> RegistrationRecord {
    let mut record = RegistrationRecord::new();
    for (field, value) in [
        (Field::FullName, "Jane Doe"),
        (Field::Email, "jane@example.com"),
        (Field::Phone, "555-0100"),
        (Field::DateOfBirth, "1990-04-01"),
        (Field::Address, "1 Main St"),
    ] {
        record
            .apply(field, FieldValue::text(value))
            .expect("text field accepts text");
    }
    record
}
