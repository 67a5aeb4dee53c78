use crate::domain::genre::GenreStats;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Genres with fewer titles than this are ignored unless nothing else qualifies.
pub const RELIABLE_SAMPLE_SIZE: u32 = 5;
/// Mean `avg_roi` above which the market reads as expanding.
pub const EXPANSION_ROI_THRESHOLD: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketPhase {
    Expansion,
    Consolidation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicInsight {
    pub top_roi_genre: String,
    pub most_volatile_genre: String,
    pub safest_genre: String,
    pub market_phase: MarketPhase,
    pub mean_avg_roi: f64,
    /// False when no genre met the sample-size bar and every genre was considered.
    pub reliable_sample: bool,
    pub summary: String,
}

/// Picks the headline genres from one snapshot. `None` when there are no genres at all.
pub fn derive<'a>(genres: impl IntoIterator<Item = &'a GenreStats>) -> Option<StrategicInsight> {
    let all: Vec<&GenreStats> = genres.into_iter().collect();
    let reliable: Vec<&GenreStats> = all
        .iter()
        .copied()
        .filter(|g| g.total_movies >= RELIABLE_SAMPLE_SIZE)
        .collect();
    let reliable_sample = !reliable.is_empty();
    let pool = if reliable_sample { reliable } else { all };

    // Ties keep the alphabetically first genre.
    let top_roi = pool.iter().copied().reduce(|best, g| {
        if g.avg_roi.total_cmp(&best.avg_roi) == Ordering::Greater {
            g
        } else {
            best
        }
    })?;
    let most_volatile = pool.iter().copied().reduce(|best, g| {
        if g.roi_volatility.total_cmp(&best.roi_volatility) == Ordering::Greater {
            g
        } else {
            best
        }
    })?;
    let safest = pool.iter().copied().min_by(|a, b| {
        b.success_rate
            .total_cmp(&a.success_rate)
            .then_with(|| a.roi_volatility.total_cmp(&b.roi_volatility))
            .then_with(|| a.genre.cmp(&b.genre))
    })?;

    let mean_avg_roi = pool.iter().map(|g| g.avg_roi).sum::<f64>() / pool.len() as f64;
    let market_phase = if mean_avg_roi > EXPANSION_ROI_THRESHOLD {
        MarketPhase::Expansion
    } else {
        MarketPhase::Consolidation
    };

    let summary = format!(
        "{} leads ROI at {:.1}x; {} is the most volatile (sigma {:.1}); {} is the stability anchor ({:.1}% hit rate).",
        top_roi.genre,
        top_roi.avg_roi,
        most_volatile.genre,
        most_volatile.roi_volatility,
        safest.genre,
        safest.success_rate,
    );

    Some(StrategicInsight {
        top_roi_genre: top_roi.genre.clone(),
        most_volatile_genre: most_volatile.genre.clone(),
        safest_genre: safest.genre.clone(),
        market_phase,
        mean_avg_roi,
        reliable_sample,
        summary,
    })
}
