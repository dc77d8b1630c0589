//! Type-tagged conversions between point, line and polygon geometries.
//!
//! Used by the rasterizer to normalise heterogeneous vector layers into a
//! single geometry type before burning. Conversions only go down in
//! dimension; anything else is an [`GeometryError::InvalidGeometryConversion`].
use crate::error::GeometryError;
use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, Point, Polygon,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Target geometry family of a conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeomType {
    Point,
    Line,
    Polygon,
}

/// Short type name used in diagnostics.
pub fn geometry_kind(geom: &Geometry<f64>) -> &'static str {
    match geom {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Coerce `geom` to the `target` family.
///
/// - points pass through unchanged whatever the target;
/// - geometries already of the target family pass through;
/// - polygons become their boundary (`Line`) or their deduplicated
///   boundary vertices (`Point`);
/// - lines become their vertices (`Point`);
/// - collections are converted member by member.
pub fn convert(geom: Geometry<f64>, target: GeomType) -> Result<Geometry<f64>, GeometryError> {
    match (geom, target) {
        (g @ (Geometry::Point(_) | Geometry::MultiPoint(_)), _) => Ok(g),
        (g @ (Geometry::Polygon(_) | Geometry::MultiPolygon(_)), GeomType::Polygon) => Ok(g),
        (g @ (Geometry::LineString(_) | Geometry::MultiLineString(_)), GeomType::Line) => Ok(g),
        (Geometry::Line(line), target) => convert(Geometry::LineString(line.into()), target),
        (Geometry::Rect(rect), target) => convert(Geometry::Polygon(rect.to_polygon()), target),
        (Geometry::Triangle(tri), target) => convert(Geometry::Polygon(tri.to_polygon()), target),
        (Geometry::GeometryCollection(collection), target) => {
            let members = collection
                .0
                .into_iter()
                .map(|g| convert(g, target))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Geometry::GeometryCollection(GeometryCollection(members)))
        }
        (Geometry::Polygon(polygon), GeomType::Line) => Ok(polygon_boundary(&[polygon])),
        (Geometry::MultiPolygon(mp), GeomType::Line) => {
            Ok(Geometry::MultiLineString(MultiLineString(rings(&mp.0))))
        }
        (Geometry::Polygon(polygon), GeomType::Point) => {
            Ok(Geometry::MultiPoint(unique_points(rings(&[polygon]).iter())))
        }
        (Geometry::MultiPolygon(mp), GeomType::Point) => {
            Ok(Geometry::MultiPoint(unique_points(rings(&mp.0).iter())))
        }
        (Geometry::LineString(ls), GeomType::Point) => Ok(Geometry::MultiPoint(vertices(&[ls]))),
        (Geometry::MultiLineString(mls), GeomType::Point) => {
            Ok(Geometry::MultiPoint(vertices(&mls.0)))
        }
        (g, target) => Err(GeometryError::InvalidGeometryConversion {
            from: geometry_kind(&g),
            to: target,
        }),
    }
}

/// Convert every geometry, keeping the successes and handing each failure to
/// `on_error` together with the index of the offending input.
pub fn convert_all<I, F>(geoms: I, target: GeomType, mut on_error: F) -> Vec<Geometry<f64>>
where
    I: IntoIterator<Item = Geometry<f64>>,
    F: FnMut(usize, GeometryError),
{
    geoms
        .into_iter()
        .enumerate()
        .filter_map(|(i, g)| match convert(g, target) {
            Ok(converted) => Some(converted),
            Err(e) => {
                on_error(i, e);
                None
            }
        })
        .collect()
}

fn rings(polygons: &[Polygon<f64>]) -> Vec<LineString<f64>> {
    polygons
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .cloned()
        .collect()
}

fn polygon_boundary(polygons: &[Polygon<f64>]) -> Geometry<f64> {
    let mut all = rings(polygons);
    if all.len() == 1 {
        Geometry::LineString(all.remove(0))
    } else {
        Geometry::MultiLineString(MultiLineString(all))
    }
}

fn unique_points<'a>(lines: impl Iterator<Item = &'a LineString<f64>>) -> MultiPoint<f64> {
    let mut seen = HashSet::new();
    let mut points = Vec::new();
    for c in lines.flat_map(|ls| ls.coords()) {
        if seen.insert(coord_key(c)) {
            points.push(Point::from(*c));
        }
    }
    MultiPoint(points)
}

fn vertices(lines: &[LineString<f64>]) -> MultiPoint<f64> {
    MultiPoint(
        lines
            .iter()
            .flat_map(|ls| ls.coords().map(|c| Point::from(*c)))
            .collect(),
    )
}

#[inline]
fn coord_key(c: &Coord<f64>) -> (u64, u64) {
    // -0.0 and 0.0 must collapse to the same vertex
    ((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon};

    fn square_with_hole() -> Polygon<f64> {
        polygon!(
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 10.0, y: 10.0),
                (x: 0.0, y: 10.0),
            ],
            interiors: [[
                (x: 4.0, y: 4.0),
                (x: 6.0, y: 4.0),
                (x: 6.0, y: 6.0),
                (x: 4.0, y: 6.0),
            ]],
        )
    }

    fn point_set(g: &Geometry<f64>) -> HashSet<(u64, u64)> {
        match g {
            Geometry::MultiPoint(mp) => mp.0.iter().map(|p| coord_key(&p.0)).collect(),
            other => panic!("expected MultiPoint, got {}", geometry_kind(other)),
        }
    }

    #[test]
    fn points_pass_through_for_any_target() {
        let p = Geometry::Point(point!(x: 1.0, y: 2.0));
        for target in [GeomType::Point, GeomType::Line, GeomType::Polygon] {
            assert_eq!(convert(p.clone(), target).unwrap(), p);
        }
    }

    #[test]
    fn polygon_to_line_keeps_all_rings() {
        let out = convert(Geometry::Polygon(square_with_hole()), GeomType::Line).unwrap();
        match out {
            Geometry::MultiLineString(mls) => assert_eq!(mls.0.len(), 2),
            other => panic!("unexpected {}", geometry_kind(&other)),
        }
    }

    #[test]
    fn polygon_to_point_deduplicates_closing_vertex() {
        let out = convert(Geometry::Polygon(square_with_hole()), GeomType::Point).unwrap();
        assert_eq!(point_set(&out).len(), 8);
        if let Geometry::MultiPoint(mp) = out {
            assert_eq!(mp.0.len(), 8);
        }
    }

    #[test]
    fn line_then_point_matches_direct_point_conversion() {
        let poly = Geometry::Polygon(square_with_hole());
        let via_line = convert(convert(poly.clone(), GeomType::Line).unwrap(), GeomType::Point)
            .unwrap();
        let direct = convert(poly, GeomType::Point).unwrap();
        assert_eq!(point_set(&via_line), point_set(&direct));
    }

    #[test]
    fn line_to_polygon_is_rejected() {
        let line = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]);
        let err = convert(line, GeomType::Polygon).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::InvalidGeometryConversion {
                from: "LineString",
                to: GeomType::Polygon
            }
        ));
    }

    #[test]
    fn collections_convert_member_wise() {
        let gc = Geometry::GeometryCollection(GeometryCollection(vec![
            Geometry::Polygon(square_with_hole()),
            Geometry::Point(point!(x: 3.0, y: 3.0)),
        ]));
        match convert(gc, GeomType::Line).unwrap() {
            Geometry::GeometryCollection(out) => {
                assert!(matches!(out.0[0], Geometry::MultiLineString(_)));
                assert!(matches!(out.0[1], Geometry::Point(_)));
            }
            other => panic!("unexpected {}", geometry_kind(&other)),
        }
    }

    #[test]
    fn collection_with_bad_member_fails_whole() {
        let gc = Geometry::GeometryCollection(GeometryCollection(vec![Geometry::LineString(
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
        )]));
        assert!(convert(gc, GeomType::Polygon).is_err());
    }

    #[test]
    fn convert_all_reports_failures_by_index() {
        let inputs = vec![
            Geometry::Polygon(square_with_hole()),
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]),
        ];
        let mut failed = Vec::new();
        let out = convert_all(inputs, GeomType::Polygon, |i, _| failed.push(i));
        assert_eq!(out.len(), 1);
        assert_eq!(failed, vec![1]);
    }
}
