//! Request parsing and the five catalog endpoints
//!
//! Query parameters are read as plain strings so that every malformed value
//! is reported with the service's own message instead of an extractor
//! rejection.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;

use super::AppState;
use crate::core::song::{release_date, NewSongRequest, Page, Song, SongFilter, SongId};
use crate::error::{Result, SongError};

type Params = HashMap<String, String>;

fn param<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params.get(name).map(String::as_str).filter(|value| !value.is_empty())
}

fn parse_id(value: &str) -> Result<SongId> {
    value.parse().map_err(|_| SongError::invalid_input("Invalid id"))
}

fn required_id(params: &Params) -> Result<SongId> {
    match param(params, "id") {
        Some(value) => parse_id(value),
        None => Err(SongError::invalid_input("id is a required parameter")),
    }
}

/// `page` parameter, 1 when absent.
fn page(params: &Params) -> Result<Page> {
    match param(params, "page") {
        Some(value) => value.parse().map_err(|_| SongError::invalid_input("Invalid page")),
        None => Ok(1),
    }
}

/// Listing filter from `id`, `song`, `group`, `releaseDate`, `text` and `link`.
fn filter(params: &Params) -> Result<SongFilter> {
    let id = param(params, "id").map(parse_id).transpose()?.unwrap_or(0);

    let release_date = match param(params, "releaseDate") {
        Some(value) => Some(release_date::parse_query(value).ok_or_else(|| {
            SongError::invalid_input("Invalid date format, correct format - 16.07.2006")
        })?),
        None => None,
    };

    let text = |name: &str| param(params, name).unwrap_or_default().to_string();
    Ok(Song {
        id,
        name: text("song"),
        group: text("group"),
        release_date,
        text: text("text"),
        link: text("link"),
    })
}

fn json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body).map_err(|_| SongError::invalid_input("Invalid body"))
}

/// GET /lib
pub async fn get_lib(State(state): State<AppState>, Query(params): Query<Params>) -> Result<Json<Vec<Song>>> {
    let filter = filter(&params)?;
    let page = page(&params)?;

    let songs = state.service.get_lib(&filter, page).await?;
    Ok(Json(songs))
}

/// GET /text
pub async fn get_text(State(state): State<AppState>, Query(params): Query<Params>) -> Result<Json<String>> {
    let id = required_id(&params)?;
    let page = page(&params)?;

    let verse = state.service.get_text(id, page).await?;
    Ok(Json(verse))
}

/// DELETE /song
pub async fn del_song(State(state): State<AppState>, Query(params): Query<Params>) -> Result<Json<Value>> {
    let id = required_id(&params)?;

    state.service.del_song(id).await?;
    Ok(Json(Value::Null))
}

/// PATCH /song, the body holds only the fields to overwrite.
pub async fn change_song(
    State(state): State<AppState>,
    Query(params): Query<Params>,
    body: Bytes,
) -> Result<Json<Value>> {
    let id = required_id(&params)?;
    let mut song: Song = json_body(&body)?;
    song.id = id;

    state.service.change_song(&song).await?;
    Ok(Json(Value::Null))
}

/// POST /song
pub async fn create_song(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>> {
    let data: NewSongRequest = json_body(&body)?;

    let id = state.service.create_song(&data, &state.api_url).await?;
    Ok(Json(json!({ "song_id": id })))
}
