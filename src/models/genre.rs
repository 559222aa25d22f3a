use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Number of canonical genres tracked per user
pub const GENRE_COUNT: usize = 20;

/// Canonical movie genres, in the column order of the `users` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    NoGenresListed,
    Action,
    Adventure,
    Animation,
    Children,
    Comedy,
    Crime,
    Documentary,
    Drama,
    Fantasy,
    FilmNoir,
    Horror,
    Imax,
    Musical,
    Mystery,
    Romance,
    SciFi,
    Thriller,
    War,
    Western,
}

impl Genre {
    pub const ALL: [Genre; GENRE_COUNT] = [
        Genre::NoGenresListed,
        Genre::Action,
        Genre::Adventure,
        Genre::Animation,
        Genre::Children,
        Genre::Comedy,
        Genre::Crime,
        Genre::Documentary,
        Genre::Drama,
        Genre::Fantasy,
        Genre::FilmNoir,
        Genre::Horror,
        Genre::Imax,
        Genre::Musical,
        Genre::Mystery,
        Genre::Romance,
        Genre::SciFi,
        Genre::Thriller,
        Genre::War,
        Genre::Western,
    ];

    /// Position of this genre in [`Genre::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Feature name used by the training pipeline (normalised genre token)
    pub fn feature_name(self) -> &'static str {
        match self {
            Genre::NoGenresListed => "no_genres_listed",
            Genre::Action => "Action",
            Genre::Adventure => "Adventure",
            Genre::Animation => "Animation",
            Genre::Children => "Children",
            Genre::Comedy => "Comedy",
            Genre::Crime => "Crime",
            Genre::Documentary => "Documentary",
            Genre::Drama => "Drama",
            Genre::Fantasy => "Fantasy",
            Genre::FilmNoir => "Film_Noir",
            Genre::Horror => "Horror",
            Genre::Imax => "IMAX",
            Genre::Musical => "Musical",
            Genre::Mystery => "Mystery",
            Genre::Romance => "Romance",
            Genre::SciFi => "Sci_Fi",
            Genre::Thriller => "Thriller",
            Genre::War => "War",
            Genre::Western => "Western",
        }
    }

    /// Column holding this genre's weight in the `users` table
    pub fn column(self) -> &'static str {
        match self {
            Genre::NoGenresListed => "no_genres_listed",
            Genre::Action => "action",
            Genre::Adventure => "adventure",
            Genre::Animation => "animation",
            Genre::Children => "children",
            Genre::Comedy => "comedy",
            Genre::Crime => "crime",
            Genre::Documentary => "documentary",
            Genre::Drama => "drama",
            Genre::Fantasy => "fantasy",
            Genre::FilmNoir => "film_noir",
            Genre::Horror => "horror",
            Genre::Imax => "imax",
            Genre::Musical => "musical",
            Genre::Mystery => "mystery",
            Genre::Romance => "romance",
            Genre::SciFi => "sci_fi",
            Genre::Thriller => "thriller",
            Genre::War => "war",
            Genre::Western => "western",
        }
    }

    /// Label as it appears in the pipe-delimited `movies.genres` field
    pub fn label(self) -> &'static str {
        match self {
            Genre::NoGenresListed => "(no genres listed)",
            Genre::FilmNoir => "Film-Noir",
            Genre::SciFi => "Sci-Fi",
            other => other.feature_name(),
        }
    }

    /// Resolves a training feature name (e.g. `Sci_Fi`) to a genre
    pub fn from_feature_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.feature_name() == name)
    }

    /// Resolves a raw `movies.genres` token (e.g. `Sci-Fi`) to a genre
    ///
    /// Tokens are normalised like the training pipeline does: parentheses
    /// dropped, dashes and spaces turned into underscores.
    pub fn from_label(token: &str) -> Option<Self> {
        Self::from_feature_name(&normalize_token(token))
    }
}

impl Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

fn normalize_token(token: &str) -> String {
    token
        .trim()
        .chars()
        .filter(|c| *c != '(' && *c != ')')
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

/// A user's average affinity for each canonical genre
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GenreWeights([f64; GENRE_COUNT]);

impl GenreWeights {
    pub fn get(&self, genre: Genre) -> f64 {
        self.0[genre.index()]
    }

    pub fn set(&mut self, genre: Genre, weight: f64) {
        self.0[genre.index()] = weight;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Genre, f64)> + '_ {
        Genre::ALL.into_iter().map(move |g| (g, self.get(g)))
    }

    /// Averages the genre dummies of a set of movies
    ///
    /// Each entry is a raw pipe-delimited genres field. Missing fields count
    /// as "(no genres listed)". Returns the weights and the number of movies
    /// they were computed from.
    pub fn from_genre_fields<'a, I>(fields: I) -> (Self, usize)
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut sums = [0.0_f64; GENRE_COUNT];
        let mut count = 0usize;

        for field in fields {
            count += 1;
            let mut seen = [false; GENRE_COUNT];
            match field {
                Some(raw) if !raw.trim().is_empty() => {
                    for token in raw.split('|') {
                        match Genre::from_label(token) {
                            Some(genre) => seen[genre.index()] = true,
                            None => tracing::debug!(token = %token, "Ignoring unknown genre token"),
                        }
                    }
                }
                _ => seen[Genre::NoGenresListed.index()] = true,
            }
            for (sum, hit) in sums.iter_mut().zip(seen) {
                if hit {
                    *sum += 1.0;
                }
            }
        }

        if count > 0 {
            for sum in sums.iter_mut() {
                *sum /= count as f64;
            }
        }

        (Self(sums), count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_index_matches_all_order() {
        for (i, genre) in Genre::ALL.iter().enumerate() {
            assert_eq!(genre.index(), i);
        }
    }

    #[test]
    fn test_from_label_normalises_tokens() {
        assert_eq!(Genre::from_label("Sci-Fi"), Some(Genre::SciFi));
        assert_eq!(Genre::from_label("Film-Noir"), Some(Genre::FilmNoir));
        assert_eq!(
            Genre::from_label("(no genres listed)"),
            Some(Genre::NoGenresListed)
        );
        assert_eq!(Genre::from_label("IMAX"), Some(Genre::Imax));
        assert_eq!(Genre::from_label("Bollywood"), None);
    }

    #[test]
    fn test_label_round_trips_through_from_label() {
        for genre in Genre::ALL {
            assert_eq!(Genre::from_label(genre.label()), Some(genre));
        }
    }

    #[test]
    fn test_from_genre_fields_averages_dummies() {
        let (weights, count) =
            GenreWeights::from_genre_fields([Some("Action|Sci-Fi"), Some("Action"), None]);

        assert_eq!(count, 3);
        assert!((weights.get(Genre::Action) - 2.0 / 3.0).abs() < 1e-9);
        assert!((weights.get(Genre::SciFi) - 1.0 / 3.0).abs() < 1e-9);
        assert!((weights.get(Genre::NoGenresListed) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(weights.get(Genre::Drama), 0.0);
    }

    #[test]
    fn test_from_genre_fields_empty_history_is_zero() {
        let (weights, count) = GenreWeights::from_genre_fields(std::iter::empty());
        assert_eq!(count, 0);
        assert!(weights.iter().all(|(_, w)| w == 0.0));
    }
}
