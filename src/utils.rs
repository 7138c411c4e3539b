pub fn format_runtime(minutes: u32) -> String {
    format!("{}h {}min", minutes / 60, minutes % 60)
}

/// Vote averages are on a 0-10 scale; cards show five stars.
pub fn star_rating(vote_average: f64) -> usize {
    if !vote_average.is_finite() {
        return 0;
    }
    (vote_average / 2.0).round().clamp(0.0, 5.0) as usize
}

pub fn star_bar(vote_average: f64) -> String {
    let full = star_rating(vote_average);
    format!("{}{}", "★".repeat(full), "☆".repeat(5 - full))
}

pub fn age_restriction(adult: bool) -> &'static str {
    if adult {
        "+18"
    } else {
        "+13"
    }
}

pub fn release_year(date: &str) -> Option<&str> {
    date.split('-').next().filter(|y| !y.is_empty())
}

pub fn imdb_url(imdb_id: &str) -> String {
    format!("https://www.imdb.com/title/{imdb_id}")
}
