use crate::aggregate::CountryCountTable;
use crate::classify::color_for;
use serde::Serialize;

/// Path style handed to the map client, field names as the client expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<&'static str>,
    pub weight: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    pub color: &'static str,
    pub dash_array: &'static str,
    pub fill_opacity: f64,
}

pub const FILL_OPACITY: f64 = 0.7;

/// Resting style of a region, derived from the current count table.
pub fn base_style(table: &CountryCountTable, name: &str) -> RegionStyle {
    RegionStyle {
        fill_color: Some(color_for(table.get(name))),
        weight: 2,
        opacity: Some(1.0),
        color: "white",
        dash_array: "3",
        fill_opacity: FILL_OPACITY,
    }
}

/// Emphasis applied on hover. Fill colour and opacity are left as they are.
pub fn highlight_style() -> RegionStyle {
    RegionStyle {
        fill_color: None,
        weight: 5,
        opacity: None,
        color: "#666",
        dash_array: "",
        fill_opacity: FILL_OPACITY,
    }
}
