//! Client for the external song lookup API
//!
//! `GET {base}/info?group=..&song=..` answers with the release date, lyrics
//! and link of a song. Each phase of the call fails with its own
//! [`RequestError`] variant so callers can tell them apart.

use tracing::{debug, info};
use url::Url;

use crate::core::song::{NewSongRequest, SongDetails};
use crate::error::RequestError;

pub const INFO_PATH: &str = "info";

#[derive(Clone)]
pub struct MetadataClient {
    client: reqwest::Client,
}

impl MetadataClient {
    /// Builds a client without a request timeout, the transport default applies.
    pub fn new() -> Result<Self, RequestError> {
        let version = env!("CARGO_PKG_VERSION");
        let user_agent = format!("song-catalog v{}", version);

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| RequestError::Build(e.to_string()))?;

        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// `base` with `/info` appended and the query replaced by `group` and `song`.
    pub fn info_url(base: &Url, data: &NewSongRequest) -> Result<Url, RequestError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| RequestError::Build(format!("{} cannot be used as a base URL", base)))?
            .pop_if_empty()
            .push(INFO_PATH);

        url.query_pairs_mut()
            .clear()
            .append_pair("group", &data.group)
            .append_pair("song", &data.name);

        Ok(url)
    }

    /// Looks up the details of `data`.
    ///
    /// The HTTP status is not inspected: an error page that is not valid JSON
    /// surfaces as a decode failure.
    pub async fn fetch_details(&self, base: &Url, data: &NewSongRequest) -> Result<SongDetails, RequestError> {
        let url = Self::info_url(base, data)?;
        let request = self
            .client
            .get(url)
            .build()
            .map_err(|e| RequestError::Build(e.to_string()))?;

        debug!("Requesting song details: {}", request.url());
        let response = self
            .client
            .execute(request)
            .await
            .map_err(RequestError::Execute)?;

        let status = response.status();
        let details: SongDetails = response.json().await.map_err(RequestError::Decode)?;

        info!("Fetched details for: {} - {} ({})", data.group, data.name, status);
        Ok(details)
    }
}
