//! Well-known-text encoding for the database sink.
use geo::{Coord, Geometry, LineString, Polygon};
use std::fmt::Write as _;

pub fn polygon_to_wkt(polygon: &Polygon<f64>) -> String {
    let mut out = String::from("POLYGON ");
    write_polygon_body(&mut out, polygon);
    out
}

pub fn geometry_to_wkt(geom: &Geometry<f64>) -> String {
    let mut out = String::new();
    match geom {
        Geometry::Point(p) => {
            out.push_str("POINT (");
            write_coord(&mut out, &p.0);
            out.push(')');
        }
        Geometry::Line(l) => {
            out.push_str("LINESTRING ");
            write_ring(&mut out, &LineString::from(*l));
        }
        Geometry::LineString(ls) => {
            out.push_str("LINESTRING ");
            write_ring(&mut out, ls);
        }
        Geometry::Polygon(p) => return polygon_to_wkt(p),
        Geometry::MultiPoint(mp) => {
            out.push_str("MULTIPOINT (");
            for (i, p) in mp.0.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push('(');
                write_coord(&mut out, &p.0);
                out.push(')');
            }
            out.push(')');
        }
        Geometry::MultiLineString(mls) => {
            out.push_str("MULTILINESTRING (");
            for (i, ls) in mls.0.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_ring(&mut out, ls);
            }
            out.push(')');
        }
        Geometry::MultiPolygon(mp) => {
            out.push_str("MULTIPOLYGON (");
            for (i, p) in mp.0.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_polygon_body(&mut out, p);
            }
            out.push(')');
        }
        Geometry::GeometryCollection(gc) => {
            out.push_str("GEOMETRYCOLLECTION (");
            for (i, g) in gc.0.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&geometry_to_wkt(g));
            }
            out.push(')');
        }
        Geometry::Rect(r) => return polygon_to_wkt(&r.to_polygon()),
        Geometry::Triangle(t) => return polygon_to_wkt(&t.to_polygon()),
    }
    out
}

fn write_polygon_body(out: &mut String, polygon: &Polygon<f64>) {
    out.push('(');
    write_ring(out, polygon.exterior());
    for interior in polygon.interiors() {
        out.push_str(", ");
        write_ring(out, interior);
    }
    out.push(')');
}

fn write_ring(out: &mut String, ring: &LineString<f64>) {
    out.push('(');
    for (i, c) in ring.coords().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_coord(out, c);
    }
    out.push(')');
}

#[inline]
fn write_coord(out: &mut String, c: &Coord<f64>) {
    let _ = write!(out, "{} {}", c.x, c.y);
}
