use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cinefind::app::{build_router, AppState, FavoriteStatus, HomeView, MovieList, MovieView, SearchView};
use cinefind::error::RemoteFetchError;
use cinefind::favorites::{FavoritesStore, MemoryStorage};
use cinefind::models::{CastMember, Credits, Movie, MovieDetails};
use cinefind::tmdb::TmdbApi;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

struct FakeTmdb {
    popular: Vec<Movie>,
    recommended: Vec<Movie>,
    details: Option<MovieDetails>,
    credits: Credits,
    fail_popular: bool,
    search_calls: AtomicUsize,
    recommended_for: Mutex<Vec<u32>>,
}

fn status_error(operation: &'static str) -> RemoteFetchError {
    RemoteFetchError::Status {
        operation,
        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        body: "upstream down".to_string(),
    }
}

#[async_trait::async_trait]
impl TmdbApi for FakeTmdb {
    async fn popular_movies(&self) -> Result<Vec<Movie>, RemoteFetchError> {
        if self.fail_popular {
            return Err(status_error("fetch popular movies"));
        }
        Ok(self.popular.clone())
    }

    async fn recommended_movies(&self, movie_id: u32) -> Result<Vec<Movie>, RemoteFetchError> {
        self.recommended_for.lock().unwrap().push(movie_id);
        Ok(self.recommended.clone())
    }

    async fn movie_details(&self, movie_id: u32) -> Result<MovieDetails, RemoteFetchError> {
        self.details
            .clone()
            .filter(|d| d.movie.id == movie_id)
            .ok_or_else(|| RemoteFetchError::Status {
                operation: "fetch movie details",
                status: reqwest::StatusCode::NOT_FOUND,
                body: "{}".to_string(),
            })
    }

    async fn movie_credits(&self, _movie_id: u32) -> Result<Credits, RemoteFetchError> {
        Ok(self.credits.clone())
    }

    async fn search_movies(&self, query: &str) -> Result<Vec<Movie>, RemoteFetchError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if query == "explode" {
            return Err(status_error("search movies"));
        }
        Ok(self
            .popular
            .iter()
            .filter(|m| m.title.to_lowercase().contains(&query.to_lowercase()))
            .cloned()
            .collect())
    }
}

fn movie(id: u32, title: &str) -> Movie {
    serde_json::from_value(json!({
        "id": id,
        "title": title,
        "overview": format!("{title} overview"),
        "poster_path": format!("/{id}.jpg"),
        "release_date": "2010-07-15",
        "vote_average": 8.2,
        "vote_count": 1000
    }))
    .unwrap()
}

fn details() -> MovieDetails {
    serde_json::from_value(json!({
        "id": 27205,
        "title": "Inception",
        "overview": "A thief who steals corporate secrets...",
        "poster_path": null,
        "backdrop_path": "/backdrop.jpg",
        "release_date": "2010-07-15",
        "vote_average": 8.4,
        "vote_count": 35000,
        "adult": false,
        "runtime": 148,
        "imdb_id": "tt1375666",
        "genres": [{ "id": 28, "name": "Action" }, { "id": 878, "name": "Science Fiction" }]
    }))
    .unwrap()
}

fn credits() -> Credits {
    let cast = (0..12u32)
        .rev()
        .map(|order| {
            serde_json::from_value::<CastMember>(json!({
                "id": 100 + order,
                "name": format!("Actor {order}"),
                "character": format!("Role {order}"),
                "order": order
            }))
            .unwrap()
        })
        .collect();
    Credits {
        id: Some(27205),
        cast,
        crew: vec![],
    }
}

fn fake_tmdb() -> FakeTmdb {
    FakeTmdb {
        popular: vec![movie(27205, "Inception"), movie(157336, "Interstellar")],
        recommended: vec![movie(155, "The Dark Knight")],
        details: Some(details()),
        credits: credits(),
        fail_popular: false,
        search_calls: AtomicUsize::new(0),
        recommended_for: Mutex::new(Vec::new()),
    }
}

fn app_with(tmdb: FakeTmdb, storage: Arc<MemoryStorage>) -> (Router, Arc<FakeTmdb>) {
    let tmdb = Arc::new(tmdb);
    let state = AppState {
        tmdb: tmdb.clone(),
        favorites: FavoritesStore::load(storage).into_handle(),
        image_base_url: IMAGE_BASE.to_string(),
        featured_movie_id: 550,
    };
    (build_router(state), tmdb)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let res = app.clone().oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn get_json<T: DeserializeOwned>(app: &Router, uri: &str) -> (StatusCode, T) {
    let (status, body) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    let body = body.to_string();
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("content-length", body.len())
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (app, _) = app_with(fake_tmdb(), Arc::new(MemoryStorage::new()));
    let (status, body) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn home_lists_popular_and_featured_recommendations() {
    let (app, tmdb) = app_with(fake_tmdb(), Arc::new(MemoryStorage::new()));
    let (status, home): (_, HomeView) = get_json(&app, "/api/home").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(home.popular.len(), 2);
    assert_eq!(home.recommended[0].title, "The Dark Knight");
    assert_eq!(*tmdb.recommended_for.lock().unwrap(), vec![550]);
}

#[tokio::test]
async fn home_degrades_failed_list_to_empty() {
    let mut tmdb = fake_tmdb();
    tmdb.fail_popular = true;
    let (app, _) = app_with(tmdb, Arc::new(MemoryStorage::new()));

    let (status, home): (_, HomeView) = get_json(&app, "/api/home").await;
    assert_eq!(status, StatusCode::OK);
    assert!(home.popular.is_empty());
    assert_eq!(home.recommended.len(), 1);

    let (status, list): (_, MovieList) = get_json(&app, "/api/movies/popular").await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.results.is_empty());
}

#[tokio::test]
async fn recommendations_use_path_id() {
    let (app, tmdb) = app_with(fake_tmdb(), Arc::new(MemoryStorage::new()));
    let (status, list): (_, MovieList) =
        get_json(&app, "/api/movies/27205/recommendations").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.results.len(), 1);
    assert_eq!(*tmdb.recommended_for.lock().unwrap(), vec![27205]);
}

#[tokio::test]
async fn movie_detail_builds_view() {
    let (app, _) = app_with(fake_tmdb(), Arc::new(MemoryStorage::new()));
    let (status, view): (_, MovieView) = get_json(&app, "/api/movies/27205").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view.details.movie.title, "Inception");
    assert_eq!(view.runtime.as_deref(), Some("2h 28min"));
    assert_eq!(view.age_restriction, "+13");
    assert_eq!(view.stars, 4);
    assert_eq!(view.hero_image, format!("{IMAGE_BASE}/w780/backdrop.jpg"));
    assert_eq!(
        view.imdb_url.as_deref(),
        Some("https://www.imdb.com/title/tt1375666")
    );
    assert!(!view.favorite);
    assert_eq!(view.cast.len(), 10);
    assert_eq!(view.cast[0].name, "Actor 0");
    assert_eq!(view.cast[9].name, "Actor 9");
}

#[tokio::test]
async fn unknown_movie_is_not_found() {
    let (app, _) = app_with(fake_tmdb(), Arc::new(MemoryStorage::new()));
    let (status, body): (_, Value) = get_json(&app, "/api/movies/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Movie not found");
}

#[tokio::test]
async fn blank_search_never_reaches_the_api() {
    let (app, tmdb) = app_with(fake_tmdb(), Arc::new(MemoryStorage::new()));
    for uri in ["/api/search?query=", "/api/search?query=%20%20%20", "/api/search"] {
        let (status, view): (_, SearchView) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(view.results.is_empty());
        assert!(!view.searching);
    }
    assert_eq!(tmdb.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn search_returns_matches_and_degrades_on_error() {
    let (app, tmdb) = app_with(fake_tmdb(), Arc::new(MemoryStorage::new()));
    let (_, view): (_, SearchView) = get_json(&app, "/api/search?query=inter").await;
    assert_eq!(view.results.len(), 1);
    assert_eq!(view.results[0].title, "Interstellar");

    let (status, view): (_, SearchView) = get_json(&app, "/api/search?query=explode").await;
    assert_eq!(status, StatusCode::OK);
    assert!(view.results.is_empty());
    assert_eq!(tmdb.search_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn favorites_round_trip_and_persist() {
    let storage = Arc::new(MemoryStorage::new());
    let (app, _) = app_with(fake_tmdb(), storage.clone());
    let inception = serde_json::to_value(movie(27205, "Inception")).unwrap();
    let interstellar = serde_json::to_value(movie(157336, "Interstellar")).unwrap();

    let (status, body) = send(&app, json_request("PUT", "/api/favorites", &inception)).await;
    assert_eq!(status, StatusCode::OK);
    let added: FavoriteStatus = serde_json::from_slice(&body).unwrap();
    assert!(added.favorite);
    // Second add is a no-op.
    send(&app, json_request("PUT", "/api/favorites", &inception)).await;

    let (_, body) = send(&app, json_request("POST", "/api/favorites/toggle", &interstellar)).await;
    let toggled: FavoriteStatus = serde_json::from_slice(&body).unwrap();
    assert_eq!(toggled.id, 157336);
    assert!(toggled.favorite);

    let (_, list): (_, Vec<Movie>) = get_json(&app, "/api/favorites").await;
    assert_eq!(
        list.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![27205, 157336]
    );

    let (_, view): (_, MovieView) = get_json(&app, "/api/movies/27205").await;
    assert!(view.favorite);

    let delete = Request::delete("/api/favorites/27205").body(Body::empty()).unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);

    let (_, status_view): (_, FavoriteStatus) = get_json(&app, "/api/favorites/27205").await;
    assert!(!status_view.favorite);

    let saved: Vec<Movie> = serde_json::from_str(&storage.blob().unwrap()).unwrap();
    assert_eq!(saved.iter().map(|m| m.id).collect::<Vec<_>>(), vec![157336]);
}

#[tokio::test]
async fn favorites_survive_storage_failure() {
    let (app, _) = app_with(fake_tmdb(), Arc::new(MemoryStorage::failing()));
    let inception = serde_json::to_value(movie(27205, "Inception")).unwrap();
    let (status, _) = send(&app, json_request("POST", "/api/favorites/toggle", &inception)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, status_view): (_, FavoriteStatus) = get_json(&app, "/api/favorites/27205").await;
    assert!(status_view.favorite);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (app, _) = app_with(fake_tmdb(), Arc::new(MemoryStorage::new()));
    let huge = json!({ "id": 1, "title": "x".repeat(128 * 1024) });
    let (status, _) = send(&app, json_request("PUT", "/api/favorites", &huge)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
