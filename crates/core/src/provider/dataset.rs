use crate::domain::contract::{self, GenreStatsRow};
use crate::domain::genre::GenreStats;
use crate::domain::movie::{GenreFilter, MovieQuery, MovieRecord, PageResult, SortField, SortOrder};
use crate::provider::{GenreStatsProvider, MovieCatalogProvider};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct DatasetFile {
    genres: Vec<GenreStatsRow>,
    #[serde(default)]
    movies: Vec<MovieRecord>,
}

/// In-memory genre stats and catalog, e.g. loaded from an exported JSON file.
#[derive(Debug, Clone, Default)]
pub struct StaticDataset {
    genres: Vec<GenreStats>,
    movies: Vec<MovieRecord>,
}

impl StaticDataset {
    pub fn new(genres: Vec<GenreStats>, movies: Vec<MovieRecord>) -> Self {
        Self { genres, movies }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let file: DatasetFile =
            serde_json::from_str(text).context("dataset is not valid JSON for the dataset schema")?;
        let genres = contract::validate_genre_rows(file.genres)?;
        Ok(Self {
            genres,
            movies: file.movies,
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset {}", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn movie_count(&self) -> usize {
        self.movies.len()
    }

    /// Filters, sorts and slices the catalog the way the explore route does.
    pub fn page(&self, query: &MovieQuery) -> Result<PageResult> {
        query.validate()?;

        let search = query.search.trim().to_lowercase();
        let genre = match &query.genre_filter {
            GenreFilter::All => None,
            GenreFilter::Genre(g) => Some(g.to_lowercase()),
        };

        let mut matched: Vec<&MovieRecord> = self
            .movies
            .iter()
            .filter(|m| search.is_empty() || m.title.to_lowercase().contains(&search))
            .filter(|m| {
                genre
                    .as_deref()
                    .map_or(true, |g| m.genres.to_lowercase().contains(g))
            })
            .filter(|m| query.outcome_filter.matches(m.success_label))
            .collect();

        matched.sort_by(|a, b| {
            let ord = compare_by(query.sort_by, a, b);
            match query.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total_count = matched.len() as u64;
        let start = (query.page as usize - 1).saturating_mul(query.page_size as usize);
        let records: Vec<MovieRecord> = matched
            .into_iter()
            .skip(start)
            .take(query.page_size as usize)
            .cloned()
            .collect();

        Ok(PageResult {
            records,
            total_count,
            total_pages: PageResult::expected_total_pages(total_count, query.page_size),
            page: query.page,
            page_size: query.page_size,
        })
    }
}

fn compare_by(field: SortField, a: &MovieRecord, b: &MovieRecord) -> Ordering {
    match field {
        SortField::Roi => a.roi.total_cmp(&b.roi),
        SortField::Year => a.year.cmp(&b.year),
        SortField::BoxOffice => a.box_office.cmp(&b.box_office),
        SortField::ImdbRating => a.imdb_rating.total_cmp(&b.imdb_rating),
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
    }
}

#[async_trait::async_trait]
impl GenreStatsProvider for StaticDataset {
    fn provider_name(&self) -> &'static str {
        "static_dataset"
    }

    async fn fetch_genre_stats(&self) -> Result<Vec<GenreStats>> {
        Ok(self.genres.clone())
    }
}

#[async_trait::async_trait]
impl MovieCatalogProvider for StaticDataset {
    fn provider_name(&self) -> &'static str {
        "static_dataset"
    }

    async fn query(&self, query: &MovieQuery) -> Result<PageResult> {
        self.page(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::movie::{Outcome, OutcomeFilter};
    use serde_json::json;

    fn dataset() -> StaticDataset {
        let movies: Vec<_> = [
            ("Sholay", 1975, "Action|Drama", 4.2, "Hit", 8.1),
            ("Lagaan", 2001, "Drama|Sport", 2.9, "Hit", 8.1),
            ("Raees", 2017, "Action|Crime", 1.1, "Average", 6.8),
            ("Zero", 2018, "Comedy|Drama", 0.4, "Flop", 5.4),
            ("Dil Se", 1998, "Romance|Drama", 0.9, "Flop", 7.6),
        ]
        .iter()
        .map(|(title, year, genres, roi, label, rating)| {
            json!({
                "title": title,
                "year": year,
                "genres": genres,
                "roi": roi,
                "box_office": (*roi * 1_000_000.0) as u64,
                "imdb_rating": rating,
                "success_label": label,
            })
        })
        .collect();

        StaticDataset::from_json_str(
            &json!({
                "genres": [
                    {"genre": "Drama", "avg_roi": 1.9, "roi_volatility": 1.3,
                     "success_rate": 40.0, "total_movies": 4},
                ],
                "movies": movies,
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn default_query_sorts_by_roi_desc() {
        let page = dataset().page(&MovieQuery::default()).unwrap();
        let titles: Vec<_> = page.records.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Sholay", "Lagaan", "Raees", "Dil Se", "Zero"]);
        assert_eq!(page.total_count, 5);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn filters_compose() {
        let q = MovieQuery {
            genre_filter: GenreFilter::Genre("drama".into()),
            outcome_filter: OutcomeFilter::Flop,
            ..Default::default()
        };
        let page = dataset().page(&q).unwrap();
        assert_eq!(page.total_count, 2);
        assert!(page
            .records
            .iter()
            .all(|m| m.success_label == Outcome::Flop));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let q = MovieQuery {
            search: "DIL".into(),
            ..Default::default()
        };
        let page = dataset().page(&q).unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].title, "Dil Se");
    }

    #[test]
    fn paginates_with_ceiling_page_count() {
        let q = MovieQuery {
            page: 3,
            page_size: 2,
            sort_by: SortField::Year,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        let page = dataset().page(&q).unwrap();
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].title, "Zero");
    }

    #[test]
    fn no_match_is_an_empty_page_not_an_error() {
        let q = MovieQuery {
            search: "nonexistent".into(),
            ..Default::default()
        };
        let page = dataset().page(&q).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let q = MovieQuery {
            page: 9,
            ..Default::default()
        };
        let page = dataset().page(&q).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_count, 5);
    }
}
