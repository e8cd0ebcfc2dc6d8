use crate::classify::{color_for, Bucket};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendRow {
    pub color: &'static str,
    pub threshold: u32,
    pub label: String,
}

/// One row per bucket. Each swatch shows the colour a count just above the
/// threshold would get; the top row is open-ended.
pub fn legend_rows() -> Vec<LegendRow> {
    Bucket::all()
        .map(|bucket| {
            let label = match bucket.upper() {
                Some(next) => format!("{}\u{2013}{}", bucket.threshold, next),
                None => format!("{}+", bucket.threshold),
            };
            LegendRow {
                color: color_for(Some(bucket.threshold + 1)),
                threshold: bucket.threshold,
                label,
            }
        })
        .collect()
}
