//! Dynamic SQL for the `song` table
//!
//! Filters and partial updates are turned into parameterized statements with
//! `sqlx::QueryBuilder`; user values only ever travel as bind arguments.

use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};

use crate::core::song::{ensure_page, Page, Song, SongFilter, SongId};
use crate::error::{Result, SongError};

/// Songs per listing page.
pub const PAGE_SIZE: i64 = 20;

pub const SONG_COLUMNS: &str = "id, group_name, song_name, release_date, text, link";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Id(i64),
    /// Case-sensitive substring match, the pattern is already LIKE-escaped.
    Contains { column: &'static str, pattern: String },
    Equals { column: &'static str, date: NaiveDate },
}

/// Converts a song id into the database key type.
///
/// Ids beyond `i64::MAX` can never have been issued by the database.
pub fn db_id(id: SongId) -> Result<i64> {
    i64::try_from(id).map_err(|_| SongError::not_found("Song with this id does not exist"))
}

/// Escapes LIKE wildcards so the value matches literally.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains(column: &'static str, value: &str) -> Predicate {
    Predicate::Contains {
        column,
        pattern: format!("%{}%", escape_like(value)),
    }
}

/// Predicates a filter narrows the listing with.
///
/// A set id wins over everything else.
pub fn filter_predicates(filter: &SongFilter) -> Result<Vec<Predicate>> {
    if filter.id != 0 {
        return Ok(vec![Predicate::Id(db_id(filter.id)?)]);
    }

    let mut predicates = Vec::new();
    if !filter.name.is_empty() {
        predicates.push(contains("song_name", &filter.name));
    }
    if !filter.group.is_empty() {
        predicates.push(contains("group_name", &filter.group));
    }
    if let Some(date) = filter.release_date {
        predicates.push(Predicate::Equals {
            column: "release_date",
            date,
        });
    }
    if !filter.text.is_empty() {
        predicates.push(contains("text", &filter.text));
    }
    if !filter.link.is_empty() {
        predicates.push(contains("link", &filter.link));
    }
    Ok(predicates)
}

pub fn page_offset(page: Page) -> Result<i64> {
    ensure_page(page)?;
    Ok(PAGE_SIZE * (i64::from(page) - 1))
}

pub fn select_songs(filter: &SongFilter, page: Page) -> Result<QueryBuilder<'static, Postgres>> {
    let offset = page_offset(page)?;
    let mut query = QueryBuilder::new(format!("SELECT {} FROM song", SONG_COLUMNS));

    for (index, predicate) in filter_predicates(filter)?.into_iter().enumerate() {
        query.push(if index == 0 { " WHERE " } else { " AND " });
        match predicate {
            Predicate::Id(id) => {
                query.push("id = ").push_bind(id);
            }
            Predicate::Contains { column, pattern } => {
                query.push(column).push(" LIKE ").push_bind(pattern);
            }
            Predicate::Equals { column, date } => {
                query.push(column).push(" = ").push_bind(date);
            }
        }
    }

    query
        .push(" ORDER BY id OFFSET ")
        .push_bind(offset)
        .push(" LIMIT ")
        .push_bind(PAGE_SIZE);
    Ok(query)
}

/// `UPDATE` with one assignment per non-empty field, keyed by id.
pub fn update_song(song: &Song) -> Result<QueryBuilder<'static, Postgres>> {
    if song.is_empty_update() {
        return Err(SongError::invalid_input("Invalid body"));
    }
    let id = db_id(song.id)?;

    let mut query = QueryBuilder::new("UPDATE song SET ");
    {
        let mut assignments = query.separated(", ");
        if !song.name.is_empty() {
            assignments.push("song_name = ").push_bind_unseparated(song.name.clone());
        }
        if !song.group.is_empty() {
            assignments.push("group_name = ").push_bind_unseparated(song.group.clone());
        }
        if let Some(date) = song.release_date {
            assignments.push("release_date = ").push_bind_unseparated(date);
        }
        if !song.text.is_empty() {
            assignments.push("text = ").push_bind_unseparated(song.text.clone());
        }
        if !song.link.is_empty() {
            assignments.push("link = ").push_bind_unseparated(song.link.clone());
        }
    }
    query.push(" WHERE id = ").push_bind(id);
    Ok(query)
}
