//! Ground truth read from PostGIS with an arbitrary query.
//!
//! The query is wrapped so the server returns each geometry as GeoJSON
//! together with its SRID, which keeps the reader free of PostGIS types.
use crate::writer::database::quote_ident;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostgisSource {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Any `SELECT` returning a geometry column.
    pub sql: String,
    #[serde(default = "default_geometry_column")]
    pub geometry_column: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_geometry_column() -> String {
    "geom".to_string()
}

impl PostgisSource {
    /// `sql` wrapped as a subquery yielding `(geojson text, srid int)` rows.
    pub fn wrapped_query(&self) -> String {
        let inner = self.sql.trim().trim_end_matches(';').trim_end();
        let geom = format!("q.{}", quote_ident(&self.geometry_column));
        format!("SELECT ST_AsGeoJSON({geom}), ST_SRID({geom}) FROM ({inner}) AS q")
    }
}

#[cfg(feature = "postgis")]
pub use self::reader::read_layer;

#[cfg(feature = "postgis")]
mod reader {
    use super::PostgisSource;
    use crate::error::MaskError;
    use crate::geometry::geojson::{geometry_from_value, GeoFeature};
    use crate::vector::VectorLayer;
    use postgres::{Config, NoTls};
    use serde_json::{Map, Value};

    /// Run the query once and collect every non-null geometry.
    pub fn read_layer(src: &PostgisSource) -> Result<VectorLayer, MaskError> {
        let mut config = Config::new();
        config
            .host(&src.host)
            .port(src.port)
            .user(&src.user)
            .password(&src.password)
            .dbname(&src.database);
        let mut client = config.connect(NoTls).map_err(db_err)?;
        let rows = client.query(src.wrapped_query().as_str(), &[]).map_err(db_err)?;

        let mut layer = VectorLayer::default();
        for row in rows {
            let Some(text) = row.try_get::<_, Option<String>>(0).map_err(db_err)? else {
                continue;
            };
            let srid: Option<i32> = row.try_get(1).map_err(db_err)?;
            if layer.crs.is_none() {
                layer.crs = srid.filter(|s| *s > 0).map(|s| format!("EPSG:{s}"));
            }
            let value: Value = serde_json::from_str(&text)
                .map_err(|e| MaskError::Database(format!("bad ST_AsGeoJSON output: {e}")))?;
            layer.features.push(GeoFeature {
                geometry: geometry_from_value(&value)?,
                properties: Map::new(),
            });
        }
        log::info!("read {} features from {}", layer.len(), src.database);
        Ok(layer)
    }

    fn db_err(e: postgres::Error) -> MaskError {
        MaskError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_connection_fields() {
        let src: PostgisSource = serde_json::from_str(
            r#"{"user": "u", "password": "p", "database": "gt",
                "sql": "SELECT * FROM buildings WHERE tile = 3;"}"#,
        )
        .unwrap();
        assert_eq!(src.host, "localhost");
        assert_eq!(src.port, 5432);
        assert_eq!(
            src.wrapped_query(),
            "SELECT ST_AsGeoJSON(q.\"geom\"), ST_SRID(q.\"geom\") \
             FROM (SELECT * FROM buildings WHERE tile = 3) AS q"
        );
    }
}
