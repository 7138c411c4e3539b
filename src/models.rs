use serde::{Deserialize, Serialize};

/// A title as returned by TMDB list and search endpoints.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Movie {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub adult: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre_ids: Option<Vec<u32>>,
    #[serde(default)]
    pub original_language: String,
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub video: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub movie: Movie,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub production_companies: Vec<ProductionCompany>,
    #[serde(default)]
    pub production_countries: Vec<ProductionCountry>,
    #[serde(default)]
    pub spoken_languages: Vec<SpokenLanguage>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProductionCompany {
    pub id: u32,
    #[serde(default)]
    pub logo_path: Option<String>,
    pub name: String,
    #[serde(default)]
    pub origin_country: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProductionCountry {
    pub iso_3166_1: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpokenLanguage {
    #[serde(default)]
    pub english_name: String,
    pub iso_639_1: String,
    #[serde(default)]
    pub name: String,
}

/// Cast and crew share one record shape; crew entries fill `job`/`department`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CastMember {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub known_for_department: String,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub credit_id: String,
    #[serde(default)]
    pub gender: Option<u8>,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub cast_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Credits {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CastMember>,
}

impl Credits {
    /// First `max` cast members by billing order. Entries without an order
    /// sort last; ties keep the API's order.
    pub fn top_billed(&self, max: usize) -> Vec<CastMember> {
        let mut cast = self.cast.clone();
        cast.sort_by_key(|c| c.order.unwrap_or(u32::MAX));
        cast.truncate(max);
        cast
    }
}

/// Envelope of TMDB list endpoints, kept verbatim.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Page<T> {
    pub page: u32,
    pub results: Vec<T>,
    pub total_pages: u32,
    pub total_results: u32,
}
