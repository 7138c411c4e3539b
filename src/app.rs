use crate::config::Config;
use crate::favorites::{FavoritesHandle, FavoritesStore, FileStorage};
use crate::images;
use crate::models::{CastMember, Movie, MovieDetails};
use crate::tmdb::{TmdbApi, TmdbClient};
use crate::utils;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;
const TOP_CAST: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
    pub favorites: FavoritesHandle,
    pub image_base_url: String,
    pub featured_movie_id: u32,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::from_config(config)?);
        let favorites =
            FavoritesStore::load(FileStorage::new(config.favorites_path.clone())).into_handle();
        Ok(Self {
            tmdb,
            favorites,
            image_base_url: config.image_base_url.clone(),
            featured_movie_id: config.featured_movie_id,
        })
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    info!("Favorites stored at {}", config.favorites_path.display());
    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/home", get(home))
        .route("/api/movies/popular", get(popular))
        .route("/api/movies/:id", get(movie_detail))
        .route("/api/movies/:id/recommendations", get(recommendations))
        .route("/api/search", get(search))
        .route("/api/favorites", get(list_favorites).put(add_favorite))
        .route("/api/favorites/toggle", post(toggle_favorite))
        .route(
            "/api/favorites/:id",
            get(favorite_status).delete(remove_favorite),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HomeView {
    pub popular: Vec<Movie>,
    pub recommended: Vec<Movie>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MovieList {
    pub results: Vec<Movie>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchView {
    pub results: Vec<Movie>,
    pub searching: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FavoriteStatus {
    pub id: u32,
    pub favorite: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MovieView {
    pub details: MovieDetails,
    pub cast: Vec<CastMember>,
    pub runtime: Option<String>,
    pub age_restriction: String,
    pub stars: usize,
    pub hero_image: String,
    pub imdb_url: Option<String>,
    pub favorite: bool,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
}

fn or_empty(
    context: &str,
    result: Result<Vec<Movie>, crate::error::RemoteFetchError>,
) -> Vec<Movie> {
    result.unwrap_or_else(|e| {
        warn!("{} unavailable: {}", context, e);
        Vec::new()
    })
}

async fn home(State(state): State<AppState>) -> Json<HomeView> {
    let (popular, recommended) = tokio::join!(
        state.tmdb.popular_movies(),
        state.tmdb.recommended_movies(state.featured_movie_id),
    );
    Json(HomeView {
        popular: or_empty("Popular movies", popular),
        recommended: or_empty("Recommended movies", recommended),
    })
}

async fn popular(State(state): State<AppState>) -> Json<MovieList> {
    let results = or_empty("Popular movies", state.tmdb.popular_movies().await);
    Json(MovieList { results })
}

async fn recommendations(State(state): State<AppState>, Path(id): Path<u32>) -> Json<MovieList> {
    let results = or_empty(
        "Recommended movies",
        state.tmdb.recommended_movies(id).await,
    );
    Json(MovieList { results })
}

async fn movie_detail(State(state): State<AppState>, Path(id): Path<u32>) -> Response {
    let (details, credits) = tokio::join!(
        state.tmdb.movie_details(id),
        state.tmdb.movie_credits(id),
    );
    let (details, credits) = match (details, credits) {
        (Ok(d), Ok(c)) => (d, c),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to load movie {}: {}", id, e);
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Movie not found" })),
            )
                .into_response();
        }
    };

    let view = MovieView {
        cast: credits.top_billed(TOP_CAST),
        runtime: details.runtime.map(utils::format_runtime),
        age_restriction: utils::age_restriction(details.movie.adult).to_string(),
        stars: utils::star_rating(details.movie.vote_average),
        hero_image: images::hero_image(
            &state.image_base_url,
            details.movie.poster_path.as_deref(),
            details.movie.backdrop_path.as_deref(),
        ),
        imdb_url: details.imdb_id.as_deref().map(utils::imdb_url),
        favorite: state.favorites.is_favorite(details.movie.id),
        details,
    };
    Json(view).into_response()
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchView> {
    if params.query.trim().is_empty() {
        return Json(SearchView {
            results: Vec::new(),
            searching: false,
        });
    }
    let results = or_empty("Search results", state.tmdb.search_movies(&params.query).await);
    Json(SearchView {
        results,
        searching: false,
    })
}

async fn list_favorites(State(state): State<AppState>) -> Json<Vec<Movie>> {
    Json(state.favorites.list())
}

async fn add_favorite(State(state): State<AppState>, Json(movie): Json<Movie>) -> Json<FavoriteStatus> {
    let id = movie.id;
    if state.favorites.add(movie) {
        info!("Added favorite {}", id);
    }
    Json(FavoriteStatus { id, favorite: true })
}

async fn remove_favorite(State(state): State<AppState>, Path(id): Path<u32>) -> Json<FavoriteStatus> {
    if state.favorites.remove(id) {
        info!("Removed favorite {}", id);
    }
    Json(FavoriteStatus {
        id,
        favorite: false,
    })
}

async fn toggle_favorite(
    State(state): State<AppState>,
    Json(movie): Json<Movie>,
) -> Json<FavoriteStatus> {
    let id = movie.id;
    let favorite = state.favorites.toggle(movie);
    info!("Toggled favorite {} -> {}", id, favorite);
    Json(FavoriteStatus { id, favorite })
}

async fn favorite_status(State(state): State<AppState>, Path(id): Path<u32>) -> Json<FavoriteStatus> {
    Json(FavoriteStatus {
        id,
        favorite: state.favorites.is_favorite(id),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
