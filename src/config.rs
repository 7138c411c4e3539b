use anyhow::{Context, Result};
use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::images::IMAGE_BASE;
use crate::tmdb::TMDB_BASE;

pub const DEFAULT_FAVORITES_PATH: &str = "data/favorites.json";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3146";
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_FEATURED_MOVIE_ID: u32 = 550;

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub image_base_url: String,
    pub favorites_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub search_debounce: Duration,
    /// Seed title for the home page's "Recommended" row.
    pub featured_movie_id: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let tmdb_api_key = env::var("TMDB_API_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .context("TMDB_API_KEY not set")?;
        let mut config = Self::with_api_key(tmdb_api_key);

        if let Ok(url) = env::var("TMDB_BASE_URL") {
            config.tmdb_base_url = url;
        }
        if let Ok(url) = env::var("TMDB_IMAGE_BASE_URL") {
            config.image_base_url = url;
        }
        if let Ok(path) = env::var("FAVORITES_PATH") {
            config.favorites_path = PathBuf::from(path);
        }
        config.bind_addr = parse_var("BIND_ADDR", config.bind_addr)?;
        config.search_debounce = Duration::from_millis(parse_var(
            "SEARCH_DEBOUNCE_MS",
            DEFAULT_DEBOUNCE_MS,
        )?);
        config.featured_movie_id = parse_var("FEATURED_MOVIE_ID", config.featured_movie_id)?;
        Ok(config)
    }

    pub fn with_api_key(tmdb_api_key: impl Into<String>) -> Self {
        Self {
            tmdb_api_key: tmdb_api_key.into(),
            tmdb_base_url: TMDB_BASE.to_string(),
            image_base_url: IMAGE_BASE.to_string(),
            favorites_path: PathBuf::from(DEFAULT_FAVORITES_PATH),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3146)),
            search_debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            featured_movie_id: DEFAULT_FEATURED_MOVIE_ID,
        }
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: '{}' ({})", key, raw, e)),
        Err(_) => Ok(default),
    }
}
