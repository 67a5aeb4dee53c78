//! Wire shapes returned by the upstream analytics backend, and the checks that turn them into
//! domain values.

use crate::domain::genre::GenreStats;
use crate::domain::movie::{MovieQuery, MovieRecord, PageResult};
use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One row of the genre-overall table. Numeric columns arrive as floats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreStatsRow {
    pub genre: String,
    pub avg_roi: f64,
    pub roi_volatility: f64,
    pub success_rate: f64,
    pub total_movies: f64,
    #[serde(default)]
    pub avg_budget: Option<f64>,
}

impl GenreStatsRow {
    fn validate_and_into_stats(self, seen: &mut BTreeSet<String>) -> anyhow::Result<GenreStats> {
        let genre = self.genre.trim().to_string();
        ensure!(!genre.is_empty(), "genre must be non-empty");
        ensure!(seen.insert(genre.clone()), "duplicate genre: {genre}");

        // Losses down to a total write-off are kept; the risk scorer clamps them.
        ensure!(
            self.avg_roi.is_finite() && self.avg_roi >= -1.0,
            "avg_roi must be finite and >= -1 for {genre} (got {})",
            self.avg_roi
        );
        ensure!(
            self.roi_volatility.is_finite() && self.roi_volatility >= 0.0,
            "roi_volatility must be finite and >= 0 for {genre} (got {})",
            self.roi_volatility
        );
        ensure!(
            (0.0..=100.0).contains(&self.success_rate),
            "success_rate must be between 0 and 100 for {genre} (got {})",
            self.success_rate
        );
        ensure!(
            self.total_movies >= 0.0
                && self.total_movies.fract() == 0.0
                && self.total_movies <= f64::from(u32::MAX),
            "total_movies must be a non-negative integer for {genre} (got {})",
            self.total_movies
        );

        let avg_budget = self.avg_budget.filter(|b| b.is_finite() && *b >= 0.0);

        Ok(GenreStats {
            genre,
            avg_roi: self.avg_roi,
            roi_volatility: self.roi_volatility,
            success_rate: self.success_rate,
            total_movies: self.total_movies as u32,
            avg_budget,
        })
    }
}

pub fn validate_genre_rows(rows: Vec<GenreStatsRow>) -> anyhow::Result<Vec<GenreStats>> {
    let mut seen = BTreeSet::<String>::new();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(row.validate_and_into_stats(&mut seen)?);
    }
    Ok(out)
}

/// Response body of the catalog explore route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreResponse {
    pub movies: Vec<MovieRecord>,
    pub total_count: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl ExploreResponse {
    pub fn validate_and_into_page(self, query: &MovieQuery) -> anyhow::Result<PageResult> {
        let page = PageResult {
            records: self.movies,
            total_count: self.total_count,
            total_pages: self.total_pages,
            page: self.page,
            page_size: self.limit,
        };
        validate_page(&page, query)?;
        Ok(page)
    }
}

/// Checks that a page answers `query` and is internally consistent.
pub fn validate_page(page: &PageResult, query: &MovieQuery) -> anyhow::Result<()> {
    ensure!(
        page.page == query.page && page.page_size == query.page_size,
        "page echo mismatch: requested page {} size {}, got page {} size {}",
        query.page,
        query.page_size,
        page.page,
        page.page_size
    );

    let expected = PageResult::expected_total_pages(page.total_count, page.page_size);
    ensure!(
        page.total_pages == expected,
        "total_pages {} inconsistent with total_count {} at page_size {} (expected {expected})",
        page.total_pages,
        page.total_count,
        page.page_size
    );

    ensure!(
        page.records.len() <= page.page_size as usize,
        "page holds {} records, more than page_size {}",
        page.records.len(),
        page.page_size
    );
    ensure!(
        page.records.len() as u64 <= page.total_count,
        "page holds {} records but total_count is {}",
        page.records.len(),
        page.total_count
    );
    Ok(())
}
