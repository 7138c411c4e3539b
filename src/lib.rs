pub mod app;
pub mod config;
pub mod error;
pub mod favorites;
pub mod images;
pub mod models;
pub mod search;
pub mod tmdb;
pub mod utils;
