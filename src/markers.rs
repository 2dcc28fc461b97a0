//! Marker table: bot phrases that hand a field to the chat flow or end guided entry.
//!
//! Matching is an exact, case-sensitive substring test. Completion phrases are checked
//! before prompt phrases, and prompts are tried in table order; the first hit wins.
//!
//! Tables load from YAML:
//!
//! ```yaml
//! prompts:
//!   - phrase: "What's your full name?"
//!     field: fullName
//! completions:
//!   - "Thanks for the info!"
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::registration::Field;

const BUILTIN_PROMPTS: &[(&str, Field)] = &[
    ("What's your full name?", Field::FullName),
    ("What's your email address?", Field::Email),
    ("Can you provide your phone number?", Field::Phone),
    ("What's your date of birth?", Field::DateOfBirth),
    ("Please provide your address.", Field::Address),
    ("Do you have a driving license?", Field::HasLicense),
    ("please provide the license number", Field::LicenseNumber),
    ("What transmission do you prefer?", Field::PreferredTransmission),
];

const BUILTIN_COMPLETIONS: &[&str] = &["Thanks for the info!"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerMatch {
    Prompt(Field),
    Completion,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMarker {
    pub phrase: String,
    pub field: Field,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerFileError {
    Io(String),
    Parse(String),
    EmptyPhrase,
    NoMarkers,
}

impl fmt::Display for MarkerFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "marker file unreadable: {msg}"),
            Self::Parse(msg) => write!(f, "marker file invalid: {msg}"),
            Self::EmptyPhrase => write!(f, "marker phrases cannot be blank"),
            Self::NoMarkers => write!(f, "marker file defines no prompts or completions"),
        }
    }
}

impl std::error::Error for MarkerFileError {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawMarkerFile {
    #[serde(default)]
    prompts: Vec<PromptMarker>,
    #[serde(default)]
    completions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerTable {
    prompts: Vec<PromptMarker>,
    completions: Vec<String>,
    source_path: Option<PathBuf>,
}

impl Default for MarkerTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MarkerTable {
    /// Phrases the registration backend asks, one per form field.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            prompts: BUILTIN_PROMPTS
                .iter()
                .map(|(phrase, field)| PromptMarker {
                    phrase: (*phrase).to_string(),
                    field: *field,
                })
                .collect(),
            completions: BUILTIN_COMPLETIONS.iter().map(|s| (*s).to_string()).collect(),
            source_path: None,
        }
    }

    pub fn new(prompts: Vec<PromptMarker>, completions: Vec<String>) -> Result<Self, MarkerFileError> {
        let table = Self {
            prompts,
            completions,
            source_path: None,
        };
        table.check()?;
        Ok(table)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, MarkerFileError> {
        let contents = fs::read_to_string(path)
            .map_err(|err| MarkerFileError::Io(format!("{}: {err}", path.display())))?;
        let mut table = Self::parse(&contents)?;
        table.source_path = Some(path.to_path_buf());
        tracing::debug!(
            path = %path.display(),
            prompts = table.prompts.len(),
            completions = table.completions.len(),
            "loaded marker table"
        );
        Ok(table)
    }

    pub fn parse(raw: &str) -> Result<Self, MarkerFileError> {
        let parsed: RawMarkerFile =
            serde_norway::from_str(raw).map_err(|err| MarkerFileError::Parse(err.to_string()))?;
        Self::new(parsed.prompts, parsed.completions)
    }

    fn check(&self) -> Result<(), MarkerFileError> {
        if self.prompts.is_empty() && self.completions.is_empty() {
            return Err(MarkerFileError::NoMarkers);
        }
        let blank_prompt = self.prompts.iter().any(|p| p.phrase.trim().is_empty());
        let blank_completion = self.completions.iter().any(|c| c.trim().is_empty());
        if blank_prompt || blank_completion {
            return Err(MarkerFileError::EmptyPhrase);
        }
        Ok(())
    }

    /// Classify a bot message.
    #[must_use]
    pub fn classify(&self, text: &str) -> MarkerMatch {
        if self.completions.iter().any(|phrase| text.contains(phrase.as_str())) {
            return MarkerMatch::Completion;
        }
        self.prompts
            .iter()
            .find(|marker| text.contains(marker.phrase.as_str()))
            .map_or(MarkerMatch::None, |marker| MarkerMatch::Prompt(marker.field))
    }

    #[must_use]
    pub fn prompts(&self) -> &[PromptMarker] {
        &self.prompts
    }

    #[must_use]
    pub fn completions(&self) -> &[String] {
        &self.completions
    }

    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn to_yaml(&self) -> Result<String, MarkerFileError> {
        let raw = RawMarkerFile {
            prompts: self.prompts.clone(),
            completions: self.completions.clone(),
        };
        serde_norway::to_string(&raw).map_err(|err| MarkerFileError::Parse(err.to_string()))
    }
}
