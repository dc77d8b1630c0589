//! Geometry handling: type coercion, affine georeferencing and the text
//! encodings (WKT, GeoJSON) used by the sinks and vector readers.
pub mod geojson;
pub mod handler;
pub mod transform;
pub mod wkt;

pub use self::handler::{convert, convert_all, geometry_kind, GeomType};
pub use self::transform::GeoTransform;
