//! Song catalog domain types
//!
//! A [`Song`] doubles as the listing filter and as the partial update body:
//! empty strings and a missing release date mean "not set".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SongError};

/// Database-assigned song identifier, `0` means unset.
pub type SongId = u64;

/// 1-based page number, used both for listing pages and verse pages.
pub type Page = u32;

/// A filter is a partially populated song.
pub type SongFilter = Song;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Song {
    pub id: SongId,
    pub name: String,
    pub group: String,
    #[serde(rename = "releaseDate", with = "release_date")]
    pub release_date: Option<NaiveDate>,
    pub text: String,
    pub link: String,
}

impl Song {
    pub fn new(name: &str, group: &str, release_date: Option<NaiveDate>, text: &str, link: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            group: group.to_string(),
            release_date,
            text: text.to_string(),
            link: link.to_string(),
        }
    }

    /// True when nothing besides the id is set.
    pub fn is_empty_update(&self) -> bool {
        self.name.is_empty()
            && self.group.is_empty()
            && self.release_date.is_none()
            && self.text.is_empty()
            && self.link.is_empty()
    }
}

/// Body of a create request: the pair the lookup API is asked about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSongRequest {
    pub group: String,
    #[serde(rename = "song")]
    pub name: String,
}

/// Details returned by the external lookup API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SongDetails {
    #[serde(rename = "releaseDate", with = "release_date")]
    pub release_date: Option<NaiveDate>,
    pub text: String,
    pub link: String,
}

pub fn ensure_page(page: Page) -> Result<()> {
    if page == 0 {
        return Err(SongError::invalid_input("Invalid page"));
    }
    Ok(())
}

/// Release date codec shared by the JSON bodies and the query string.
pub mod release_date {
    use chrono::{DateTime, Datelike, NaiveDate};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Format accepted in the `releaseDate` query parameter.
    pub const QUERY_FORMAT: &str = "%d.%m.%Y";
    pub const JSON_FORMAT: &str = "%Y-%m-%d";

    /// Parses `YYYY-MM-DD`, `dd.mm.yyyy` or an RFC 3339 timestamp.
    ///
    /// The zero timestamp `0001-01-01T00:00:00Z` some clients send for
    /// "no date" maps to `None`.
    pub fn parse(value: &str) -> Option<Option<NaiveDate>> {
        let value = value.trim();
        if value.is_empty() {
            return Some(None);
        }

        let date = NaiveDate::parse_from_str(value, JSON_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(value, QUERY_FORMAT))
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))?;

        if date.year() == 1 && date.ordinal() == 1 {
            return Some(None);
        }
        Some(Some(date))
    }

    pub fn parse_query(value: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(value.trim(), QUERY_FORMAT).ok()
    }

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&date.format(JSON_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(value) => parse(&value).ok_or_else(|| {
                serde::de::Error::custom(format!("invalid release date '{}'", value))
            }),
        }
    }
}
