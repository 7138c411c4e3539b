//! Favorites store: an ordered, id-unique set of movies persisted to a single
//! storage slot after every mutation.
//!
//! The in-memory set is the source of truth for the running session. Storage
//! failures are logged and never reach callers.

use chrono::Utc;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::PersistenceError;
use crate::models::Movie;

/// Shared handle owned by the application root and passed to consumers.
pub type FavoritesHandle = Arc<FavoritesStore>;

/// A single named slot holding the serialized favorite set.
pub trait FavoritesStorage: Send + Sync {
    /// Raw bytes, `Ok(None)` when nothing has been saved yet. Decoding is
    /// the store's job so undecodable bytes can still be quarantined.
    fn read(&self) -> Result<Option<Vec<u8>>, PersistenceError>;
    fn write(&self, blob: &str) -> Result<(), PersistenceError>;
    /// Keep an unparseable blob somewhere the next write will not overwrite.
    fn quarantine(&self, _blob: &[u8]) -> Result<(), PersistenceError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_err(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl FavoritesStorage for FileStorage {
    fn read(&self) -> Result<Option<Vec<u8>>, PersistenceError> {
        match fs::read(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write(&self, blob: &str) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.write_err(e))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, blob).map_err(|e| self.write_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.write_err(e))
    }

    fn quarantine(&self, blob: &[u8]) -> Result<(), PersistenceError> {
        let mut target = self.path.clone().into_os_string();
        target.push(format!(".corrupt-{}", Utc::now().format("%Y%m%d%H%M%S")));
        let target = PathBuf::from(target);
        fs::write(&target, blob).map_err(|e| self.write_err(e))?;
        warn!("Corrupt favorites preserved at {}", target.display());
        Ok(())
    }
}

/// In-process slot. Writes can be made to fail to exercise degraded paths.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<Vec<u8>>>,
    quarantined: Mutex<Vec<Vec<u8>>>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<Vec<u8>>) -> Self {
        Self {
            slot: Mutex::new(Some(blob.into())),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn blob(&self) -> Option<String> {
        lock(&self.slot)
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn quarantined(&self) -> Vec<Vec<u8>> {
        lock(&self.quarantined).clone()
    }
}

impl FavoritesStorage for MemoryStorage {
    fn read(&self) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(lock(&self.slot).clone())
    }

    fn write(&self, blob: &str) -> Result<(), PersistenceError> {
        if self.fail_writes {
            return Err(PersistenceError::Write {
                path: PathBuf::from(":memory:"),
                source: std::io::Error::new(ErrorKind::Other, "storage unavailable"),
            });
        }
        *lock(&self.slot) = Some(blob.as_bytes().to_vec());
        Ok(())
    }

    fn quarantine(&self, blob: &[u8]) -> Result<(), PersistenceError> {
        lock(&self.quarantined).push(blob.to_vec());
        Ok(())
    }
}

impl<S: FavoritesStorage + ?Sized> FavoritesStorage for Arc<S> {
    fn read(&self) -> Result<Option<Vec<u8>>, PersistenceError> {
        (**self).read()
    }
    fn write(&self, blob: &str) -> Result<(), PersistenceError> {
        (**self).write(blob)
    }
    fn quarantine(&self, blob: &[u8]) -> Result<(), PersistenceError> {
        (**self).quarantine(blob)
    }
}

pub struct FavoritesStore {
    movies: Mutex<Vec<Movie>>,
    storage: Box<dyn FavoritesStorage>,
}

impl FavoritesStore {
    /// Read the persisted set. Missing, unreadable or corrupt data yields an
    /// empty set.
    pub fn load(storage: impl FavoritesStorage + 'static) -> Self {
        let movies = match storage.read() {
            Ok(Some(blob)) => match parse_favorites(&blob) {
                Ok(movies) => movies,
                Err(e) => {
                    warn!("Ignoring stored favorites: {}", e);
                    if let Err(e) = storage.quarantine(&blob) {
                        warn!("Failed to preserve corrupt favorites: {}", e);
                    }
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Starting with empty favorites: {}", e);
                Vec::new()
            }
        };
        info!("Loaded {} favorite(s)", movies.len());
        Self {
            movies: Mutex::new(movies),
            storage: Box::new(storage),
        }
    }

    pub fn into_handle(self) -> FavoritesHandle {
        Arc::new(self)
    }

    /// Returns `true` if the movie was appended.
    pub fn add(&self, movie: Movie) -> bool {
        let mut movies = lock(&self.movies);
        let added = insert(&mut movies, movie);
        self.persist(&movies);
        added
    }

    /// Returns `true` if a movie was removed.
    pub fn remove(&self, id: u32) -> bool {
        let mut movies = lock(&self.movies);
        let removed = delete(&mut movies, id);
        self.persist(&movies);
        removed
    }

    /// Returns whether the movie is a favorite afterwards.
    pub fn toggle(&self, movie: Movie) -> bool {
        let mut movies = lock(&self.movies);
        let now_favorite = if delete(&mut movies, movie.id) {
            false
        } else {
            insert(&mut movies, movie)
        };
        self.persist(&movies);
        now_favorite
    }

    pub fn is_favorite(&self, id: u32) -> bool {
        lock(&self.movies).iter().any(|m| m.id == id)
    }

    pub fn list(&self) -> Vec<Movie> {
        lock(&self.movies).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.movies).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.movies).is_empty()
    }

    // Called with the set lock held so concurrent writers flush in order.
    // Blocking: the file write runs on the caller's thread, async handlers
    // included.
    fn persist(&self, movies: &[Movie]) {
        let blob = match serde_json::to_string(movies) {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to serialize favorites: {}", e);
                return;
            }
        };
        match self.storage.write(&blob) {
            Ok(()) => debug!("Persisted {} favorite(s)", movies.len()),
            Err(e) => warn!("Failed to persist favorites: {}", e),
        }
    }
}

fn parse_favorites(blob: &[u8]) -> Result<Vec<Movie>, PersistenceError> {
    // from_slice rejects invalid UTF-8 as a parse error.
    let parsed: Vec<Movie> = serde_json::from_slice(blob)?;
    let mut movies = Vec::with_capacity(parsed.len());
    for movie in parsed {
        insert(&mut movies, movie);
    }
    Ok(movies)
}

fn insert(movies: &mut Vec<Movie>, movie: Movie) -> bool {
    if movies.iter().any(|m| m.id == movie.id) {
        return false;
    }
    movies.push(movie);
    true
}

fn delete(movies: &mut Vec<Movie>, id: u32) -> bool {
    let before = movies.len();
    movies.retain(|m| m.id != id);
    movies.len() != before
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
