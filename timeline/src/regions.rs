use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use geo::{Contains, Coord, LineString, MultiPolygon, Point, Polygon};
use geojson::{feature, GeoJson, Value};
use geom::LonLat;
use serde::Serialize;

use itinerary::HexColor;

use crate::VisitRecord;

/// Answers which named regions (countries, states) hold a point.
pub trait RegionLookup {
    fn regions_containing(&self, pos: LonLat) -> Vec<&str>;
}

/// What a boundary file holds. Only country names get normalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionKind {
    Countries,
    States,
}

/// Region boundaries from a GeoJSON FeatureCollection of polygons and multipolygons.
pub struct GeoJsonRegions {
    regions: Vec<(String, MultiPolygon<f64>)>,
}

impl GeoJsonRegions {
    pub fn load<R: std::io::Read>(mut reader: R, kind: RegionKind) -> Result<Self> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        let gj: GeoJson = raw.parse()?;
        Self::from_geojson(gj, kind)
    }

    pub fn from_geojson(gj: GeoJson, kind: RegionKind) -> Result<Self> {
        let collection = match gj {
            GeoJson::FeatureCollection(collection) => collection,
            _ => bail!("Region boundaries must be a FeatureCollection"),
        };

        let mut regions = Vec::new();
        let mut skipped = 0;
        for feature in collection.features {
            let name = feature
                .properties
                .as_ref()
                .and_then(|props| props.get("name"))
                .and_then(|name| name.as_str())
                .map(|name| name.to_string())
                .or_else(|| {
                    feature.id.as_ref().map(|id| match id {
                        feature::Id::String(x) => x.clone(),
                        feature::Id::Number(x) => x.to_string(),
                    })
                })
                .unwrap_or_else(|| "Unknown".to_string());
            let polygons = match feature.geometry.map(|g| g.value) {
                Some(Value::Polygon(rings)) => vec![to_polygon(&name, rings)?],
                Some(Value::MultiPolygon(polygons)) => polygons
                    .into_iter()
                    .map(|rings| to_polygon(&name, rings))
                    .collect::<Result<Vec<_>>>()?,
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            let name = match kind {
                RegionKind::Countries => normalize_country_name(&name),
                RegionKind::States => name,
            };
            regions.push((name, MultiPolygon::new(polygons)));
        }
        if skipped > 0 {
            warn!("Skipped {skipped} region features without polygons");
        }
        debug!("Loaded {} {:?}", regions.len(), kind);
        Ok(Self { regions })
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl RegionLookup for GeoJsonRegions {
    fn regions_containing(&self, pos: LonLat) -> Vec<&str> {
        let pt = Point::new(pos.x(), pos.y());
        self.regions
            .iter()
            .filter(|(_, shape)| shape.contains(&pt))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

fn to_polygon(name: &str, rings: Vec<Vec<Vec<f64>>>) -> Result<Polygon<f64>> {
    let mut rings = rings
        .into_iter()
        .map(|ring| {
            ring.into_iter()
                .map(|pos| match pos.as_slice() {
                    [x, y, ..] => Ok(Coord { x: *x, y: *y }),
                    _ => bail!("{name} has a position with {} coordinates", pos.len()),
                })
                .collect::<Result<Vec<_>>>()
                .map(LineString::new)
        })
        .collect::<Result<Vec<_>>>()?;
    if rings.is_empty() {
        bail!("{name} has a polygon with no rings");
    }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

/// Different boundary datasets spell a few countries differently.
pub fn normalize_country_name(name: &str) -> String {
    let normalized = name.to_lowercase().replace('.', "");
    match normalized.trim() {
        "fr guiana" | "french guiana" | "french guinea" => "French Guinea".to_string(),
        _ => name.to_string(),
    }
}

/// The earliest visit inside some region.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegionVisit {
    pub color: HexColor,
    pub first_visited: DateTime<Utc>,
}

impl RegionVisit {
    /// None if the region hasn't been reached yet
    pub fn fill(&self, now: DateTime<Utc>, alpha: f64) -> Option<String> {
        if self.first_visited > now {
            return None;
        }
        Some(self.color.with_opacity(alpha))
    }
}

/// For every region holding at least one visit, the color and time of the earliest one.
pub fn region_first_visits<'a, I, L>(visits: I, lookup: &L) -> BTreeMap<String, RegionVisit>
where
    I: IntoIterator<Item = &'a VisitRecord>,
    L: RegionLookup,
{
    let mut by_date: Vec<&VisitRecord> = visits.into_iter().collect();
    by_date.sort_by_key(|v| v.first_visited);

    let mut results: BTreeMap<String, RegionVisit> = BTreeMap::new();
    for visit in by_date {
        if !visit.pos.x().is_finite() || !visit.pos.y().is_finite() {
            continue;
        }
        for name in lookup.regions_containing(visit.pos) {
            let earlier = results
                .get(name)
                .map(|existing| visit.first_visited < existing.first_visited)
                .unwrap_or(true);
            if earlier {
                results.insert(
                    name.to_string(),
                    RegionVisit {
                        color: visit.color.clone(),
                        first_visited: visit.first_visited,
                    },
                );
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::TimeZone;

    use itinerary::TripName;

    use super::*;
    use crate::VisitKey;

    const SQUARES: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "properties": { "name": "Left" },
          "geometry": {
            "type": "Polygon",
            "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
          }
        },
        {
          "type": "Feature",
          "id": "both",
          "properties": {},
          "geometry": {
            "type": "MultiPolygon",
            "coordinates": [
              [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]],
              [[[20, 0], [30, 0], [30, 10], [20, 10], [20, 0]]]
            ]
          }
        },
        {
          "type": "Feature",
          "properties": { "name": "Fr. Guiana" },
          "geometry": {
            "type": "Polygon",
            "coordinates": [[[-54, 2], [-51, 2], [-51, 6], [-54, 6], [-54, 2]]]
          }
        },
        {
          "type": "Feature",
          "properties": { "name": "Nowhere" },
          "geometry": null
        }
      ]
    }"#;

    fn visit(lon: f64, lat: f64, color: &str, day: u32) -> VisitRecord {
        let pos = LonLat::new(lon, lat);
        let t = Utc.with_ymd_and_hms(2024, 7, day, 0, 0, 0).unwrap();
        VisitRecord {
            key: VisitKey::quantize(pos).unwrap(),
            pos,
            label: String::new(),
            trips: BTreeSet::from([TripName::new("a")]),
            color: HexColor::new(color),
            visits: 1,
            first_visited: t,
            last_visited: t,
        }
    }

    #[test]
    fn lookup() {
        let regions = GeoJsonRegions::load(SQUARES.as_bytes(), RegionKind::Countries).unwrap();
        assert_eq!(regions.len(), 3);
        assert_eq!(
            regions.regions_containing(LonLat::new(5.0, 5.0)),
            vec!["Left", "both"]
        );
        assert_eq!(regions.regions_containing(LonLat::new(25.0, 5.0)), vec!["both"]);
        assert_eq!(
            regions.regions_containing(LonLat::new(-52.3, 4.9)),
            vec!["French Guinea"]
        );
        assert!(regions.regions_containing(LonLat::new(15.0, 5.0)).is_empty());
    }

    #[test]
    fn state_names_are_left_alone() {
        let regions = GeoJsonRegions::load(SQUARES.as_bytes(), RegionKind::States).unwrap();
        assert_eq!(
            regions.regions_containing(LonLat::new(-52.3, 4.9)),
            vec!["Fr. Guiana"]
        );
    }

    #[test]
    fn not_a_collection() {
        let point = r#"{"type": "Point", "coordinates": [1, 2]}"#;
        assert!(GeoJsonRegions::load(point.as_bytes(), RegionKind::Countries).is_err());

        let empty = r#"{"type": "FeatureCollection", "features": []}"#;
        assert!(GeoJsonRegions::load(empty.as_bytes(), RegionKind::States)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn earliest_visit_colors_region() {
        let regions = GeoJsonRegions::load(SQUARES.as_bytes(), RegionKind::Countries).unwrap();
        let visits = vec![
            visit(5.0, 5.0, "#222222", 9),
            visit(25.0, 5.0, "#111111", 2),
            visit(6.0, 6.0, "#333333", 4),
            visit(15.0, 5.0, "#444444", 1),
        ];
        let results = region_first_visits(&visits, &regions);
        assert_eq!(results.len(), 2);
        assert_eq!(results["both"].color, HexColor::new("#111111"));
        assert_eq!(results["Left"].color, HexColor::new("#333333"));

        let left = &results["Left"];
        let before = Utc.with_ymd_and_hms(2024, 7, 3, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 7, 4, 0, 0, 0).unwrap();
        assert_eq!(left.fill(before, 0.5), None);
        assert_eq!(
            left.fill(after, 0.5),
            Some("rgba(51, 51, 51, 0.5)".to_string())
        );
    }

    #[test]
    fn country_names() {
        assert_eq!(normalize_country_name("French Guiana"), "French Guinea");
        assert_eq!(normalize_country_name(" fr. guiana "), "French Guinea");
        assert_eq!(normalize_country_name("France"), "France");
    }
}
