use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GenreFilter {
    All,
    Genre(String),
}

impl GenreFilter {
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => "All",
            Self::Genre(g) => g,
        }
    }
}

impl From<String> for GenreFilter {
    fn from(s: String) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Genre(trimmed.to_string())
        }
    }
}

impl From<&str> for GenreFilter {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<GenreFilter> for String {
    fn from(f: GenreFilter) -> Self {
        f.as_str().to_string()
    }
}

/// Box-office outcome label attached to each title upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Hit,
    Average,
    Flop,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeFilter {
    #[default]
    All,
    Hit,
    Average,
    Flop,
}

impl OutcomeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Hit => "Hit",
            Self::Average => "Average",
            Self::Flop => "Flop",
        }
    }

    pub fn matches(&self, outcome: Outcome) -> bool {
        match self {
            Self::All => true,
            Self::Hit => outcome == Outcome::Hit,
            Self::Average => outcome == Outcome::Average,
            Self::Flop => outcome == Outcome::Flop,
        }
    }
}

impl FromStr for OutcomeFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "hit" => Ok(Self::Hit),
            "average" => Ok(Self::Average),
            "flop" => Ok(Self::Flop),
            other => Err(CoreError::invalid(
                "outcome_filter",
                format!("unknown outcome {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Roi,
    Year,
    BoxOffice,
    ImdbRating,
    Title,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roi => "roi",
            Self::Year => "year",
            Self::BoxOffice => "box_office",
            Self::ImdbRating => "imdb_rating",
            Self::Title => "title",
        }
    }
}

impl FromStr for SortField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "roi" => Ok(Self::Roi),
            "year" => Ok(Self::Year),
            "box_office" => Ok(Self::BoxOffice),
            "imdb_rating" => Ok(Self::ImdbRating),
            "title" => Ok(Self::Title),
            other => Err(CoreError::invalid(
                "sort_by",
                format!("unknown sort field {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(CoreError::invalid(
                "sort_order",
                format!("unknown sort order {other:?}"),
            )),
        }
    }
}

/// One user-intended catalog query. Superseded wholesale by the next edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieQuery {
    pub page: u32,
    pub page_size: u32,
    pub search: String,
    pub genre_filter: GenreFilter,
    pub outcome_filter: OutcomeFilter,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for MovieQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search: String::new(),
            genre_filter: GenreFilter::All,
            outcome_filter: OutcomeFilter::All,
            sort_by: SortField::Roi,
            sort_order: SortOrder::Desc,
        }
    }
}

impl MovieQuery {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.page < 1 {
            return Err(CoreError::invalid("page", "page must be >= 1"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(CoreError::invalid(
                "page_size",
                format!(
                    "page_size must be 1..={MAX_PAGE_SIZE} (got {})",
                    self.page_size
                ),
            ));
        }
        Ok(())
    }

    /// Applies a partial edit and validates the outcome.
    ///
    /// A change to `search`, `genre_filter` or `outcome_filter` sends the query back to page 1,
    /// even when the same patch also names a page.
    pub fn with_patch(&self, patch: &MovieQueryPatch) -> Result<MovieQuery, CoreError> {
        let mut next = self.clone();
        if let Some(page) = patch.page {
            next.page = page;
        }
        if let Some(page_size) = patch.page_size {
            next.page_size = page_size;
        }
        if let Some(sort_by) = patch.sort_by {
            next.sort_by = sort_by;
        }
        if let Some(sort_order) = patch.sort_order {
            next.sort_order = sort_order;
        }

        let mut filters_changed = false;
        if let Some(search) = &patch.search {
            filters_changed |= *search != self.search;
            next.search = search.clone();
        }
        if let Some(genre) = &patch.genre_filter {
            filters_changed |= *genre != self.genre_filter;
            next.genre_filter = genre.clone();
        }
        if let Some(outcome) = patch.outcome_filter {
            filters_changed |= outcome != self.outcome_filter;
            next.outcome_filter = outcome;
        }
        if filters_changed {
            next.page = 1;
        }

        next.validate()?;
        Ok(next)
    }
}

/// A partial edit to the current query; `None` fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieQueryPatch {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub genre_filter: Option<GenreFilter>,
    pub outcome_filter: Option<OutcomeFilter>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
}

impl MovieQueryPatch {
    /// Checks the fields that are invalid regardless of the query they are applied to.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.page == Some(0) {
            return Err(CoreError::invalid("page", "page must be >= 1"));
        }
        if let Some(page_size) = self.page_size {
            if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
                return Err(CoreError::invalid(
                    "page_size",
                    format!("page_size must be 1..={MAX_PAGE_SIZE} (got {page_size})"),
                ));
            }
        }
        Ok(())
    }

    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn genre(genre: impl Into<GenreFilter>) -> Self {
        Self {
            genre_filter: Some(genre.into()),
            ..Default::default()
        }
    }

    pub fn outcome(outcome: OutcomeFilter) -> Self {
        Self {
            outcome_filter: Some(outcome),
            ..Default::default()
        }
    }

    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Default::default()
        }
    }

    pub fn sort(sort_by: SortField, sort_order: SortOrder) -> Self {
        Self {
            sort_by: Some(sort_by),
            sort_order: Some(sort_order),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub title: String,
    pub year: i32,
    /// Pipe-separated genre list, e.g. `Action|Drama`.
    pub genres: String,
    pub roi: f64,
    pub box_office: u64,
    #[serde(default)]
    pub poster_url: String,
    pub imdb_rating: f64,
    pub success_label: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub records: Vec<MovieRecord>,
    pub total_count: u64,
    pub total_pages: u64,
    pub page: u32,
    pub page_size: u32,
}

impl PageResult {
    pub fn expected_total_pages(total_count: u64, page_size: u32) -> u64 {
        total_count.div_ceil(u64::from(page_size.max(1)))
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
