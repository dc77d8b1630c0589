//! Minimal GeoJSON codec over `serde_json::Value`.
//!
//! Supports the seven geometry types, `Feature` / `FeatureCollection`
//! wrappers and the legacy named `crs` member, which is how the vector-file
//! sink records its coordinate reference system.
use crate::error::GeometryError;
use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde_json::{json, Map, Value};

/// One decoded feature.
#[derive(Clone, Debug, PartialEq)]
pub struct GeoFeature {
    pub geometry: Geometry<f64>,
    pub properties: Map<String, Value>,
}

/// A decoded `FeatureCollection`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureCollection {
    pub crs: Option<String>,
    pub features: Vec<GeoFeature>,
}

pub fn parse_feature_collection(text: &str) -> Result<FeatureCollection, GeometryError> {
    let root: Value = serde_json::from_str(text).map_err(|e| invalid(format!("invalid JSON: {e}")))?;
    feature_collection_from_value(&root)
}

pub fn feature_collection_from_value(root: &Value) -> Result<FeatureCollection, GeometryError> {
    match type_of(root)? {
        "FeatureCollection" => {
            let feats = root
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| invalid("FeatureCollection missing 'features' array"))?;
            let features = feats
                .iter()
                .map(feature_from_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(FeatureCollection {
                crs: crs_name(root),
                features,
            })
        }
        "Feature" => Ok(FeatureCollection {
            crs: crs_name(root),
            features: vec![feature_from_value(root)?],
        }),
        _ => Ok(FeatureCollection {
            crs: crs_name(root),
            features: vec![GeoFeature {
                geometry: geometry_from_value(root)?,
                properties: Map::new(),
            }],
        }),
    }
}

pub fn feature_from_value(value: &Value) -> Result<GeoFeature, GeometryError> {
    if type_of(value)? != "Feature" {
        return Err(invalid("expected a Feature"));
    }
    let geometry = value
        .get("geometry")
        .ok_or_else(|| invalid("feature missing geometry"))?;
    let properties = value
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    Ok(GeoFeature {
        geometry: geometry_from_value(geometry)?,
        properties,
    })
}

pub fn geometry_from_value(value: &Value) -> Result<Geometry<f64>, GeometryError> {
    let gtype = type_of(value)?;
    if gtype == "GeometryCollection" {
        let members = value
            .get("geometries")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("GeometryCollection missing 'geometries'"))?;
        let geoms = members
            .iter()
            .map(geometry_from_value)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Geometry::GeometryCollection(GeometryCollection(geoms)));
    }
    let coords = value
        .get("coordinates")
        .ok_or_else(|| invalid("geometry missing coordinates"))?;
    Ok(match gtype {
        "Point" => Geometry::Point(Point::from(position(coords)?)),
        "MultiPoint" => Geometry::MultiPoint(MultiPoint(
            positions(coords)?.into_iter().map(Point::from).collect(),
        )),
        "LineString" => Geometry::LineString(LineString::new(positions(coords)?)),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString(
            array(coords)?
                .iter()
                .map(|l| positions(l).map(LineString::new))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        "Polygon" => Geometry::Polygon(polygon(coords)?),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon(
            array(coords)?
                .iter()
                .map(polygon)
                .collect::<Result<Vec<_>, _>>()?,
        )),
        other => return Err(invalid(format!("unsupported geometry type {other:?}"))),
    })
}

pub fn geometry_to_value(geom: &Geometry<f64>) -> Value {
    match geom {
        Geometry::Point(p) => json!({"type": "Point", "coordinates": coord(&p.0)}),
        Geometry::Line(l) => {
            json!({"type": "LineString", "coordinates": [coord(&l.start), coord(&l.end)]})
        }
        Geometry::LineString(ls) => json!({"type": "LineString", "coordinates": ring(ls)}),
        Geometry::Polygon(p) => json!({"type": "Polygon", "coordinates": polygon_rings(p)}),
        Geometry::MultiPoint(mp) => json!({
            "type": "MultiPoint",
            "coordinates": mp.0.iter().map(|p| coord(&p.0)).collect::<Vec<_>>(),
        }),
        Geometry::MultiLineString(mls) => json!({
            "type": "MultiLineString",
            "coordinates": mls.0.iter().map(ring).collect::<Vec<_>>(),
        }),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.0.iter().map(polygon_rings).collect::<Vec<_>>(),
        }),
        Geometry::GeometryCollection(gc) => json!({
            "type": "GeometryCollection",
            "geometries": gc.0.iter().map(geometry_to_value).collect::<Vec<_>>(),
        }),
        Geometry::Rect(r) => geometry_to_value(&Geometry::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => geometry_to_value(&Geometry::Polygon(t.to_polygon())),
    }
}

pub fn feature_to_value(geometry: &Geometry<f64>, properties: Map<String, Value>) -> Value {
    json!({
        "type": "Feature",
        "properties": properties,
        "geometry": geometry_to_value(geometry),
    })
}

/// Legacy named-CRS member, e.g. `{"type": "name", "properties": {"name": "EPSG:4326"}}`.
pub fn crs_member(name: &str) -> Value {
    json!({"type": "name", "properties": {"name": name}})
}

fn crs_name(root: &Value) -> Option<String> {
    root.get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .map(str::to_owned)
}

fn type_of(value: &Value) -> Result<&str, GeometryError> {
    value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("object missing 'type'"))
}

fn array(value: &Value) -> Result<&Vec<Value>, GeometryError> {
    value
        .as_array()
        .ok_or_else(|| invalid("coordinates must be an array"))
}

fn position(value: &Value) -> Result<Coord<f64>, GeometryError> {
    let p = array(value)?;
    match (p.first().and_then(Value::as_f64), p.get(1).and_then(Value::as_f64)) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err(invalid("position must hold two numbers")),
    }
}

fn positions(value: &Value) -> Result<Vec<Coord<f64>>, GeometryError> {
    array(value)?.iter().map(position).collect()
}

fn polygon(value: &Value) -> Result<Polygon<f64>, GeometryError> {
    let mut rings = array(value)?
        .iter()
        .map(|r| positions(r).map(LineString::new))
        .collect::<Result<Vec<_>, _>>()?;
    if rings.is_empty() {
        return Err(invalid("polygon without rings"));
    }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

fn coord(c: &Coord<f64>) -> Value {
    json!([c.x, c.y])
}

fn ring(ls: &LineString<f64>) -> Vec<Value> {
    ls.coords().map(coord).collect()
}

fn polygon_rings(p: &Polygon<f64>) -> Vec<Vec<Value>> {
    std::iter::once(p.exterior())
        .chain(p.interiors())
        .map(ring)
        .collect()
}

fn invalid(msg: impl Into<String>) -> GeometryError {
    GeometryError::InvalidGeoJson(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn parses_collection_with_crs() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "EPSG:31982"}},
            "features": [
                {"type": "Feature", "properties": {"id": 1},
                 "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}},
                {"type": "Feature", "properties": null,
                 "geometry": {"type": "MultiPolygon", "coordinates": [[[[0,0],[1,0],[1,1],[0,0]]]]}}
            ]
        }"#;
        let fc = parse_feature_collection(text).unwrap();
        assert_eq!(fc.crs.as_deref(), Some("EPSG:31982"));
        assert_eq!(fc.features.len(), 2);
        assert!(matches!(fc.features[1].geometry, Geometry::MultiPolygon(_)));
        assert_eq!(fc.features[0].properties["id"], json!(1));
    }

    #[test]
    fn polygon_value_round_trip_keeps_holes() {
        let p = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            interiors: [[(x: 2.0, y: 2.0), (x: 3.0, y: 2.0), (x: 3.0, y: 3.0)]],
        );
        let value = geometry_to_value(&Geometry::Polygon(p.clone()));
        assert_eq!(geometry_from_value(&value).unwrap(), Geometry::Polygon(p));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let value = json!({"type": "Circle", "coordinates": [0, 0]});
        assert!(geometry_from_value(&value).is_err());
    }
}
