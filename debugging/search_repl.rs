//! Interactive search session. Each line typed replaces the whole query, the
//! way an edit in a search box would; results are printed as they settle.
//!
//! Commands:
//!   :fav <n>   toggle the n-th listed result as a favorite
//!   :favs      list favorites
//!   :quit      exit
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::Result;
use cinefind::config::Config;
use cinefind::favorites::{FavoritesHandle, FavoritesStore, FileStorage};
use cinefind::search::{SearchCoordinator, SearchSnapshot};
use cinefind::tmdb::{TmdbApi, TmdbClient};
use cinefind::utils;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const SHOWN_RESULTS: usize = 5;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn render(snapshot: &SearchSnapshot, favorites: &FavoritesHandle) {
    if snapshot.searching {
        println!("Searching...");
        return;
    }
    if snapshot.results.is_empty() {
        println!("No movies found");
        return;
    }
    for (i, movie) in snapshot.results.iter().take(SHOWN_RESULTS).enumerate() {
        let marker = if favorites.is_favorite(movie.id) { "♥" } else { " " };
        println!(
            "{marker} {}. {} ({}) {}",
            i + 1,
            movie.title,
            utils::release_year(&movie.release_date).unwrap_or("----"),
            utils::star_bar(movie.vote_average)
        );
    }
}

fn handle_command(line: &str, search: &SearchCoordinator, favorites: &FavoritesHandle) {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some(":favs") => {
            let list = favorites.list();
            if list.is_empty() {
                println!("No favorites yet");
            }
            for movie in list {
                println!("♥ {} [{}]", movie.title, movie.id);
            }
        }
        Some(":fav") => {
            let index = parts.next().and_then(|n| n.parse::<usize>().ok());
            let snapshot = search.snapshot();
            match index.and_then(|n| n.checked_sub(1)).and_then(|i| snapshot.results.get(i)) {
                Some(movie) => {
                    let title = movie.title.clone();
                    let now = favorites.toggle(movie.clone());
                    println!("{} {}", if now { "Added" } else { "Removed" }, title);
                }
                None => println!("usage: :fav <n> with n from the listed results"),
            }
        }
        _ => println!("unknown command"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    init_tracing();

    let config = Config::from_env()?;
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::from_config(&config)?);
    let favorites =
        FavoritesStore::load(FileStorage::new(config.favorites_path.clone())).into_handle();
    let search = SearchCoordinator::new(tmdb, config.search_debounce);

    let mut updates = search.subscribe();
    let favorites_for_render = favorites.clone();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            render(&snapshot, &favorites_for_render);
        }
    });

    println!("Type to search, :fav <n>, :favs, :quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == ":quit" {
            break;
        }
        if line.starts_with(':') {
            handle_command(&line, &search, &favorites);
            continue;
        }
        search.set_query(&line);
    }
    Ok(())
}
