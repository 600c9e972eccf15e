use std::collections::BTreeMap;
use std::fs;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::refmap::*;

/// Reads the region boundaries from a GeoJSON `FeatureCollection`.
///
/// The boundaries are keyed by the code property of each feature, as written
/// in the file. Features that are not polygons are skipped.
pub fn read_geojson(path: &str, cfs: &FileSource) -> RefmapResult<BTreeMap<String, RegionGeometry>> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let geometries = parse_geojson(&contents, cfs.code_property()).map_err(|message| {
        RefmapError::InvalidGeoJson {
            path: path.to_string(),
            message,
        }
    })?;
    info!("Read {} region boundaries from {}", geometries.len(), path);
    Ok(geometries)
}

pub fn parse_geojson(contents: &str, code_property: &str) -> Result<BTreeMap<String, RegionGeometry>, String> {
    let value: JSValue = serde_json::from_str(contents).map_err(|e| e.to_string())?;
    let features = value["features"]
        .as_array()
        .ok_or_else(|| "expected a FeatureCollection with a features array".to_string())?;

    let mut res: BTreeMap<String, RegionGeometry> = BTreeMap::new();
    for (idx, feature) in features.iter().enumerate() {
        let code = match &feature["properties"][code_property] {
            JSValue::String(s) => s.clone(),
            JSValue::Number(n) => match n.as_u64() {
                Some(x) => x.to_string(),
                None => return Err(format!("feature {}: invalid code {}", idx, n)),
            },
            _ => return Err(format!("feature {}: missing property {:?}", idx, code_property)),
        };
        let geometry = &feature["geometry"];
        let boundary = match geometry["type"].as_str() {
            Some("Polygon") => MultiPolygon::new(vec![parse_polygon(&geometry["coordinates"])?]),
            Some("MultiPolygon") => parse_multipolygon(&geometry["coordinates"])?,
            other => {
                warn!(
                    "parse_geojson: feature {} ({}): skipping geometry of type {:?}",
                    idx, code, other
                );
                continue;
            }
        };
        if res.contains_key(&code) {
            warn!("parse_geojson: duplicate feature for code {:?}, keeping the first one", code);
            continue;
        }
        debug!("parse_geojson: feature {}: code {} with {} polygons", idx, code, boundary.0.len());
        res.insert(code.clone(), RegionGeometry { code, boundary });
    }
    Ok(res)
}

/// `[[polygon], [polygon], ...]`
fn parse_multipolygon(coords: &JSValue) -> Result<MultiPolygon<f64>, String> {
    let polygons = coords
        .as_array()
        .ok_or_else(|| "MultiPolygon coordinates must be an array".to_string())?
        .iter()
        .map(parse_polygon)
        .collect::<Result<Vec<Polygon<f64>>, String>>()?;
    Ok(MultiPolygon::new(polygons))
}

/// `[exterior, hole, hole, ...]`
fn parse_polygon(coords: &JSValue) -> Result<Polygon<f64>, String> {
    let rings = coords
        .as_array()
        .ok_or_else(|| "Polygon coordinates must be an array of rings".to_string())?;
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| "Polygon without exterior ring".to_string())?;
    let interiors = interiors
        .iter()
        .map(parse_ring)
        .collect::<Result<Vec<LineString<f64>>, String>>()?;
    Ok(Polygon::new(parse_ring(exterior)?, interiors))
}

/// `[[x, y], [x, y], ...]`
fn parse_ring(coords: &JSValue) -> Result<LineString<f64>, String> {
    let positions = coords
        .as_array()
        .ok_or_else(|| "a ring must be an array of positions".to_string())?;
    let mut points: Vec<Coord<f64>> = Vec::with_capacity(positions.len());
    for position in positions {
        match position.as_array().map(|p| p.as_slice()) {
            Some([x, y, ..]) => {
                let x = x.as_f64().ok_or_else(|| format!("invalid x coordinate {}", x))?;
                let y = y.as_f64().ok_or_else(|| format!("invalid y coordinate {}", y))?;
                points.push(Coord { x, y });
            }
            _ => return Err(format!("invalid position {}", position)),
        }
    }
    Ok(LineString::new(points))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGIONS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"code": "11", "nom": "Île-de-France"},
             "geometry": {"type": "Polygon", "coordinates": [[[2.0, 48.0], [3.0, 48.0], [3.0, 49.0], [2.0, 49.0], [2.0, 48.0]]]}},
            {"type": "Feature", "properties": {"code": "94", "nom": "Corse"},
             "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[8.5, 41.5], [9.5, 41.5], [9.5, 43.0], [8.5, 41.5]]],
                [[[9.0, 41.0], [9.2, 41.0], [9.2, 41.2], [9.0, 41.0]], [[9.05, 41.05], [9.1, 41.05], [9.1, 41.1], [9.05, 41.05]]]
             ]}},
            {"type": "Feature", "properties": {"code": "99"},
             "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}},
            {"type": "Feature", "properties": {"code": 1},
             "geometry": {"type": "Polygon", "coordinates": [[[-61.0, 16.0], [-61.5, 16.0], [-61.5, 16.5], [-61.0, 16.0]]]}}
        ]
    }"#;

    #[test]
    fn reads_polygons_and_multipolygons() {
        let res = parse_geojson(REGIONS, "code").unwrap();
        assert_eq!(res.keys().collect::<Vec<_>>(), vec!["1", "11", "94"]);
        let idf = &res["11"].boundary;
        assert_eq!(idf.0.len(), 1);
        assert_eq!(idf.0[0].exterior().0.len(), 5);
        let corse = &res["94"].boundary;
        assert_eq!(corse.0.len(), 2);
        assert_eq!(corse.0[1].interiors().len(), 1);
    }

    #[test]
    fn custom_code_property() {
        let res = parse_geojson(REGIONS, "nom").unwrap_err();
        // The third feature has no "nom" property.
        assert!(res.contains("feature 2"));
    }

    #[test]
    fn rejects_non_collections() {
        assert!(parse_geojson(r#"{"type": "Feature"}"#, "code").is_err());
        assert!(parse_geojson("not json", "code").is_err());
    }

    #[test]
    fn rejects_bad_positions() {
        let js = r#"{"features": [{"properties": {"code": "11"},
            "geometry": {"type": "Polygon", "coordinates": [[[2.0], [3.0, 48.0]]]}}]}"#;
        assert!(parse_geojson(js, "code").unwrap_err().contains("invalid position"));
    }
}
