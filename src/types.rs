use geo::MultiPolygon;

/// One row of the airport dataset. Only the country matters here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirportRecord {
    pub country: Option<String>,
}

impl AirportRecord {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: Some(country.into()),
        }
    }

    #[cfg(test)]
    pub fn missing() -> Self {
        Self { country: None }
    }
}

/// A renderable country polygon.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}
