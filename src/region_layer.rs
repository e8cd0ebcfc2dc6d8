use crate::aggregate::CountryCountTable;
use crate::interaction::InteractionLayer;
use crate::style::base_style;
use crate::types::Region;
use anyhow::Result;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use geojson::{Feature, FeatureCollection, Geometry};
use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;
use tracing::info;

// Wrapper for RTree indexing
struct RegionEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Country polygons joined with their airport counts, plus a spatial index
/// for point lookups.
pub struct RegionLayer {
    regions: Vec<Region>,
    tree: RTree<RegionEnvelope>,
    table: Arc<CountryCountTable>,
}

impl RegionLayer {
    pub fn new(regions: Vec<Region>, table: Arc<CountryCountTable>) -> Self {
        let items: Vec<RegionEnvelope> = regions
            .iter()
            .enumerate()
            .filter_map(|(index, region)| {
                let rect = region.geometry.bounding_rect()?;
                Some(RegionEnvelope {
                    index,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();

        let unmatched = regions
            .iter()
            .filter(|r| table.get(&r.name).is_none())
            .count();
        info!(
            "Indexed {} regions ({} without airport data)",
            items.len(),
            unmatched
        );

        Self {
            regions,
            tree: RTree::bulk_load(items),
            table,
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn table(&self) -> &Arc<CountryCountTable> {
        &self.table
    }

    pub fn count(&self, name: &str) -> Option<u32> {
        self.table.get(name)
    }

    /// Region containing the given coordinate, if any.
    pub fn locate(&self, lon: f64, lat: f64) -> Option<&Region> {
        let point = Point::new(lon, lat);
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
            .filter_map(|candidate| self.regions.get(candidate.index))
            .find(|region| region.geometry.contains(&point))
    }

    /// Regions whose bounding box touches the given lon/lat box.
    pub fn candidates(&self, min: [f64; 2], max: [f64; 2]) -> Vec<&Region> {
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_corners(min, max))
            .filter_map(|candidate| self.regions.get(candidate.index))
            .collect()
    }

    /// Register enter/leave handling for every region on the given layer.
    pub fn register_handlers(&self, interaction: &mut InteractionLayer) {
        for region in &self.regions {
            interaction.register(region.name.clone());
        }
    }

    pub fn interaction(&self) -> InteractionLayer {
        let mut interaction = InteractionLayer::new(Arc::clone(&self.table));
        self.register_handlers(&mut interaction);
        interaction
    }

    /// Styled FeatureCollection for the map client. Each feature carries
    /// `name`, `count` (null without airport data) and `style`.
    pub fn to_geojson(&self) -> Result<FeatureCollection> {
        let mut features = Vec::with_capacity(self.regions.len());

        for region in &self.regions {
            let mut properties = serde_json::Map::new();
            properties.insert("name".into(), region.name.clone().into());
            properties.insert(
                "count".into(),
                self.table
                    .get(&region.name)
                    .map(serde_json::Value::from)
                    .unwrap_or(serde_json::Value::Null),
            );
            properties.insert(
                "style".into(),
                serde_json::to_value(base_style(&self.table, &region.name))?,
            );

            features.push(Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(&region.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::parse_regions;
    use crate::data::tests::TWO_SQUARES;
    use crate::types::AirportRecord;

    /// Westland has 75 airports, Eastland none.
    pub(crate) fn sample_layer() -> RegionLayer {
        let regions = parse_regions(TWO_SQUARES, "name").unwrap();
        let records: Vec<AirportRecord> =
            (0..75).map(|_| AirportRecord::new("Westland")).collect();
        RegionLayer::new(regions, Arc::new(CountryCountTable::from_records(&records)))
    }

    #[test]
    fn locates_point_in_region() {
        let layer = sample_layer();
        assert_eq!(layer.locate(-10.0, 0.0).map(|r| r.name.as_str()), Some("Westland"));
        assert_eq!(layer.locate(10.0, 5.0).map(|r| r.name.as_str()), Some("Eastland"));
        assert!(layer.locate(0.0, 0.0).is_none());
        assert!(layer.locate(-10.0, 50.0).is_none());
    }

    #[test]
    fn candidates_filter_by_envelope() {
        let layer = sample_layer();
        let names: Vec<&str> = layer
            .candidates([5.0, -5.0], [6.0, 5.0])
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["Eastland"]);
    }

    #[test]
    fn geojson_carries_count_and_style() {
        let layer = sample_layer();
        let json = serde_json::to_value(layer.to_geojson().unwrap()).unwrap();
        let features = json["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);

        let west = &features[0]["properties"];
        assert_eq!(west["name"], "Westland");
        assert_eq!(west["count"], 75);
        assert_eq!(west["style"]["fillColor"], "#6baed6");

        let east = &features[1]["properties"];
        assert!(east["count"].is_null());
        assert_eq!(east["style"]["fillColor"], "#deebf7");
    }

    #[test]
    fn every_region_gets_handlers() {
        let layer = sample_layer();
        let interaction = layer.interaction();
        assert!(interaction.is_registered("Westland"));
        assert!(interaction.is_registered("Eastland"));
        assert!(!interaction.is_registered("Atlantis"));
    }
}
