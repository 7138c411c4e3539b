//! Fetch TMDB records through the library client and print them as JSON.
//! Usage:
//!   cargo run --bin movie_props -- popular
//!   cargo run --bin movie_props -- recommended <tmdb_id>
//!   cargo run --bin movie_props -- details <tmdb_id>
//!   cargo run --bin movie_props -- credits <tmdb_id>
//!   cargo run --bin movie_props -- search <query...>
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{anyhow, Context, Result};
use cinefind::config::Config;
use cinefind::images::{self, ImageSize};
use cinefind::tmdb::{TmdbApi, TmdbClient};
use cinefind::utils;
use dotenvy::dotenv;
use serde_json::{json, Value};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Popular,
    Recommended,
    Details,
    Credits,
    Search,
}

impl FromStr for Command {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "popular" => Ok(Command::Popular),
            "recommended" => Ok(Command::Recommended),
            "details" => Ok(Command::Details),
            "credits" => Ok(Command::Credits),
            "search" => Ok(Command::Search),
            _ => Err(anyhow!(
                "command must be one of popular, recommended, details, credits, search"
            )),
        }
    }
}

fn parse_id(arg: Option<&String>) -> Result<u32> {
    arg.ok_or_else(|| anyhow!("missing <tmdb_id>"))?
        .parse()
        .context("tmdb_id must be a positive integer")
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    let args: Vec<String> = env::args().skip(1).collect();
    let command: Command = args
        .first()
        .ok_or_else(|| anyhow!("usage: movie_props <command> [args]"))?
        .parse()?;

    let config = Config::from_env()?;
    let client = TmdbClient::from_config(&config)?;
    let base = config.image_base_url.as_str();

    let output: Value = match command {
        Command::Popular => json!(client.popular_movies().await?),
        Command::Recommended => json!(client.recommended_movies(parse_id(args.get(1))?).await?),
        Command::Details => {
            let details = client.movie_details(parse_id(args.get(1))?).await?;
            json!({
                "details": details,
                "runtime": details.runtime.map(utils::format_runtime),
                "age_restriction": utils::age_restriction(details.movie.adult),
                "stars": utils::star_bar(details.movie.vote_average),
                "hero_image": images::hero_image(
                    base,
                    details.movie.poster_path.as_deref(),
                    details.movie.backdrop_path.as_deref(),
                ),
                "imdb_url": details.imdb_id.as_deref().map(utils::imdb_url),
            })
        }
        Command::Credits => {
            let credits = client.movie_credits(parse_id(args.get(1))?).await?;
            let cast: Vec<Value> = credits
                .top_billed(10)
                .into_iter()
                .map(|c| {
                    json!({
                        "name": c.name,
                        "character": c.character,
                        "profile": images::resolve_image(base, c.profile_path.as_deref(), ImageSize::W200),
                    })
                })
                .collect();
            json!({ "cast": cast, "crew_count": credits.crew.len() })
        }
        Command::Search => {
            let query = args[1..].join(" ");
            json!(client.search_movies(&query).await?)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
