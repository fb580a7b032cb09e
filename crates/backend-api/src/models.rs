//! Wire models for the catalog and profile endpoints.
//!
//! The client never writes catalog records, so the models are tolerant on
//! the way in: unknown fields are ignored and missing or null optional fields
//! fall back to defaults instead of failing the whole list.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Read a string field that the server may send as `null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

/// One grade tier, used for browsing only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    /// Grade identifier, e.g. "Grade 5".
    pub grade: String,
    /// Cover image URL, empty when the grade has none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image: String,
}

impl Grade {
    pub fn new(grade: impl Into<String>) -> Self {
        Self {
            grade: grade.into(),
            image: String::new(),
        }
    }

    pub fn has_image(&self) -> bool {
        !self.image.trim().is_empty()
    }
}

/// Catalog partition a book belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edition {
    #[serde(rename = "annual edition")]
    Annual,
    #[serde(rename = "term edition")]
    Term,
    #[serde(rename = "semester edition")]
    Semester,
}

impl Edition {
    pub const ALL: [Edition; 3] = [Edition::Annual, Edition::Term, Edition::Semester];

    /// Identifier used by the catalog API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Edition::Annual => "annual edition",
            Edition::Term => "term edition",
            Edition::Semester => "semester edition",
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown edition: {0:?} (expected annual, term or semester)")]
pub struct ParseEditionError(pub String);

impl FromStr for Edition {
    type Err = ParseEditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "annual edition" | "annual" => Ok(Edition::Annual),
            "term edition" | "term" => Ok(Edition::Term),
            "semester edition" | "semester" => Ok(Edition::Semester),
            _ => Err(ParseEditionError(s.to_string())),
        }
    }
}

/// How the reader view should present a book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl From<Option<String>> for Orientation {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref().map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("landscape") => Orientation::Landscape,
            _ => Orientation::Portrait,
        }
    }
}

impl From<Orientation> for Option<String> {
    fn from(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Portrait => None,
            Orientation::Landscape => Some("landscape".to_string()),
        }
    }
}

/// A catalog book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Cover image URL, empty when the book has none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image: String,
    /// Grade identifier, compared by string equality.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub grade: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subject: String,
    /// Raw edition identifier as served; see [`Book::edition_kind`].
    #[serde(default, deserialize_with = "null_as_empty")]
    pub edition: String,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub author: Option<String>,
    /// Remote document location opened by the reader.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub uri: String,
    #[serde(default)]
    pub orientation: Orientation,
}

impl Book {
    pub fn new(
        title: impl Into<String>,
        grade: impl Into<String>,
        edition: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            image: String::new(),
            grade: grade.into(),
            subject: String::new(),
            edition: edition.into(),
            author: None,
            uri: String::new(),
            orientation: Orientation::Portrait,
        }
    }

    /// The edition as a known partition, if the server value is one.
    pub fn edition_kind(&self) -> Option<Edition> {
        self.edition.parse().ok()
    }

    pub fn has_image(&self) -> bool {
        !self.image.trim().is_empty()
    }

    pub fn is_landscape(&self) -> bool {
        self.orientation == Orientation::Landscape
    }
}

/// User profile kept by the backend alongside the identity provider record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendUser {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}
