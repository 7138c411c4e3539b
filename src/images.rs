use anyhow::anyhow;
use std::fmt;
use std::str::FromStr;

pub const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
pub const PLACEHOLDER_IMAGE: &str = "/placeholder-movie.jpg";

/// Size tokens accepted by the TMDB image CDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageSize {
    W92,
    W200,
    W300,
    #[default]
    W500,
    W780,
    Original,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::W92 => "w92",
            ImageSize::W200 => "w200",
            ImageSize::W300 => "w300",
            ImageSize::W500 => "w500",
            ImageSize::W780 => "w780",
            ImageSize::Original => "original",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "w92" => Ok(ImageSize::W92),
            "w200" => Ok(ImageSize::W200),
            "w300" => Ok(ImageSize::W300),
            "w500" => Ok(ImageSize::W500),
            "w780" => Ok(ImageSize::W780),
            "original" => Ok(ImageSize::Original),
            _ => Err(anyhow!("unknown image size '{}'", s)),
        }
    }
}

/// Resolve a relative TMDB image path against `base`, falling back to the
/// local placeholder when the record has no image.
pub fn resolve_image(base: &str, path: Option<&str>, size: ImageSize) -> String {
    match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => format!(
            "{}/{}/{}",
            base.trim_end_matches('/'),
            size,
            p.trim_start_matches('/')
        ),
        None => PLACEHOLDER_IMAGE.to_string(),
    }
}

/// Detail pages prefer the poster and fall back to the backdrop.
pub fn hero_image(base: &str, poster_path: Option<&str>, backdrop_path: Option<&str>) -> String {
    let path = poster_path
        .filter(|p| !p.is_empty())
        .or(backdrop_path.filter(|p| !p.is_empty()));
    resolve_image(base, path, ImageSize::W780)
}
