use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::RemoteFetchError;
use crate::models::{Credits, Movie, MovieDetails, Page};

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";

const OP_POPULAR: &str = "fetch popular movies";
const OP_RECOMMENDED: &str = "fetch recommended movies";
const OP_DETAILS: &str = "fetch movie details";
const OP_CREDITS: &str = "fetch movie credits";
const OP_SEARCH: &str = "search movies";

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn popular_movies(&self) -> Result<Vec<Movie>, RemoteFetchError>;
    async fn recommended_movies(&self, movie_id: u32) -> Result<Vec<Movie>, RemoteFetchError>;
    async fn movie_details(&self, movie_id: u32) -> Result<MovieDetails, RemoteFetchError>;
    async fn movie_credits(&self, movie_id: u32) -> Result<Credits, RemoteFetchError>;
    /// Blank queries resolve to an empty list without touching the network.
    async fn search_movies(&self, query: &str) -> Result<Vec<Movie>, RemoteFetchError>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let user_agent = format!("cinefind/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.tmdb_api_key.clone(), config.tmdb_base_url.clone())
    }

    async fn get_page(&self, operation: &'static str, url: &str) -> Result<Vec<Movie>, RemoteFetchError> {
        let page: Page<Movie> = self.get_json(operation, url).await?;
        debug!(
            "{}: page {} of {} ({} results total)",
            operation, page.page, page.total_pages, page.total_results
        );
        Ok(page.results)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &'static str,
        url: &str,
    ) -> Result<T, RemoteFetchError> {
        debug!("{}: GET {}", operation, redact_key(url));
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| RemoteFetchError::Transport { operation, source })?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|source| RemoteFetchError::Transport { operation, source })?;
        if !status.is_success() {
            return Err(RemoteFetchError::Status {
                operation,
                status,
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|source| RemoteFetchError::Decode { operation, source })
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn popular_movies(&self) -> Result<Vec<Movie>, RemoteFetchError> {
        let url = format!("{}/movie/popular?api_key={}", self.base_url, self.api_key);
        self.get_page(OP_POPULAR, &url).await
    }

    async fn recommended_movies(&self, movie_id: u32) -> Result<Vec<Movie>, RemoteFetchError> {
        let id = valid_id(OP_RECOMMENDED, movie_id)?;
        let url = format!(
            "{}/movie/{id}/recommendations?api_key={}",
            self.base_url, self.api_key
        );
        self.get_page(OP_RECOMMENDED, &url).await
    }

    async fn movie_details(&self, movie_id: u32) -> Result<MovieDetails, RemoteFetchError> {
        let id = valid_id(OP_DETAILS, movie_id)?;
        let url = format!("{}/movie/{id}?api_key={}", self.base_url, self.api_key);
        self.get_json(OP_DETAILS, &url).await
    }

    async fn movie_credits(&self, movie_id: u32) -> Result<Credits, RemoteFetchError> {
        let id = valid_id(OP_CREDITS, movie_id)?;
        let url = format!("{}/movie/{id}/credits?api_key={}", self.base_url, self.api_key);
        self.get_json(OP_CREDITS, &url).await
    }

    async fn search_movies(&self, query: &str) -> Result<Vec<Movie>, RemoteFetchError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}/search/movie?api_key={}&query={}",
            self.base_url,
            self.api_key,
            urlencoding::encode(query)
        );
        self.get_page(OP_SEARCH, &url).await
    }
}

fn valid_id(operation: &'static str, id: u32) -> Result<u32, RemoteFetchError> {
    if id == 0 {
        return Err(RemoteFetchError::InvalidId { operation, id });
    }
    Ok(id)
}

fn redact_key(url: &str) -> String {
    match url.find("api_key=") {
        Some(start) => {
            let value_start = start + "api_key=".len();
            let value_end = url[value_start..]
                .find('&')
                .map(|i| value_start + i)
                .unwrap_or(url.len());
            format!("{}***{}", &url[..value_start], &url[value_end..])
        }
        None => url.to_string(),
    }
}
