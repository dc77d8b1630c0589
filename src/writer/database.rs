//! Spatial-database sink.
//!
//! A write is planned as plain SQL statements first and then executed on a
//! fresh session in one transaction, so the planning is testable without a
//! server. [`PostgisConnector`] (feature `postgis`) runs the plan on
//! PostgreSQL/PostGIS through the `postgres` crate.
use super::DataWriter;
use crate::error::WriteError;
use crate::geometry::wkt::polygon_to_wkt;
use crate::polygonize::PolygonSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What to do when the target table already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IfExists {
    #[default]
    Append,
    Replace,
    Fail,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SqlStatement {
    fn plain(sql: String) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }
}

/// One database session. Only used from the thread that opened it.
pub trait SpatialSession {
    fn table_exists(&mut self, table: &str) -> Result<bool, WriteError>;
    /// Run all statements atomically.
    fn execute_transaction(&mut self, statements: &[SqlStatement]) -> Result<(), WriteError>;
}

/// Source of sessions, shared by every worker of a batch.
pub trait SpatialConnector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn SpatialSession>, WriteError>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorDatabaseOptions {
    pub table_name: String,
    #[serde(default = "default_geometry_column")]
    pub geometry_column: String,
    #[serde(default)]
    pub if_exists: IfExists,
    /// `EPSG:<code>` identifier of the stored geometries.
    pub crs: String,
}

fn default_geometry_column() -> String {
    "geom".to_string()
}

impl VectorDatabaseOptions {
    pub fn new(table_name: impl Into<String>, crs: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            geometry_column: default_geometry_column(),
            if_exists: IfExists::default(),
            crs: crs.into(),
        }
    }
}

pub struct VectorDatabaseDataWriter {
    connector: Arc<dyn SpatialConnector>,
    options: VectorDatabaseOptions,
}

impl VectorDatabaseDataWriter {
    pub fn new(connector: Arc<dyn SpatialConnector>, options: VectorDatabaseOptions) -> Self {
        Self { connector, options }
    }

    pub fn options(&self) -> &VectorDatabaseOptions {
        &self.options
    }

    /// Statements for writing `set` given whether the table already exists.
    pub fn plan(&self, set: &PolygonSet, table_exists: bool) -> Result<Vec<SqlStatement>, WriteError> {
        let srid = parse_srid(&self.options.crs)?;
        let table = quote_ident(&self.options.table_name);
        let geom = quote_ident(&self.options.geometry_column);

        let mut plan = Vec::with_capacity(set.len() + 2);
        let create = || {
            SqlStatement::plain(format!(
                "CREATE TABLE IF NOT EXISTS {table} (id SERIAL PRIMARY KEY, name TEXT, {geom} geometry(Polygon, {srid}))"
            ))
        };
        match (table_exists, self.options.if_exists) {
            (false, _) => plan.push(create()),
            (true, IfExists::Append) => {}
            (true, IfExists::Replace) => {
                plan.push(SqlStatement::plain(format!("DROP TABLE IF EXISTS {table}")));
                plan.push(create());
            }
            (true, IfExists::Fail) => {
                return Err(WriteError::TableExists(self.options.table_name.clone()))
            }
        }

        let insert = format!(
            "INSERT INTO {table} (name, {geom}) VALUES ($1, ST_GeomFromText($2, {srid}))"
        );
        for poly in &set.polygons {
            plan.push(SqlStatement {
                sql: insert.clone(),
                params: vec![
                    SqlParam::Text(set.name.clone()),
                    SqlParam::Text(polygon_to_wkt(poly)),
                ],
            });
        }
        Ok(plan)
    }
}

impl DataWriter<PolygonSet> for VectorDatabaseDataWriter {
    fn write_data(&self, data: PolygonSet) -> Result<(), WriteError> {
        let mut session = self.connector.connect()?;
        let exists = session.table_exists(&self.options.table_name)?;
        let plan = self.plan(&data, exists)?;
        session.execute_transaction(&plan)?;
        log::debug!(
            "inserted {} polygons of {} into {}",
            data.len(),
            data.name,
            self.options.table_name
        );
        Ok(())
    }
}

/// SRID from an `EPSG:<code>` identifier (case-insensitive) or a bare code.
pub fn parse_srid(crs: &str) -> Result<i32, WriteError> {
    let trimmed = crs.trim();
    let code = match trimmed.split_once(':') {
        Some((auth, code)) if auth.eq_ignore_ascii_case("epsg") => code,
        Some(_) => return Err(WriteError::InvalidCrs(crs.to_string())),
        None => trimmed,
    };
    code.trim()
        .parse::<i32>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| WriteError::InvalidCrs(crs.to_string()))
}

/// Double-quoted SQL identifier; `schema.table` quotes each part.
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(feature = "postgis")]
pub use self::postgis::PostgisConnector;

#[cfg(feature = "postgis")]
mod postgis {
    use super::{SpatialConnector, SpatialSession, SqlParam, SqlStatement};
    use crate::error::WriteError;
    use postgres::types::ToSql;
    use postgres::{Client, NoTls};

    /// Opens a new PostgreSQL connection for every write.
    #[derive(Clone, Debug)]
    pub struct PostgisConnector {
        params: String,
    }

    impl PostgisConnector {
        pub fn new(host: &str, port: u16, user: &str, password: &str, database: &str) -> Self {
            Self {
                params: format!(
                    "host={host} port={port} user={user} password={password} dbname={database}"
                ),
            }
        }
    }

    impl SpatialConnector for PostgisConnector {
        fn connect(&self) -> Result<Box<dyn SpatialSession>, WriteError> {
            let client = Client::connect(&self.params, NoTls).map_err(db_err)?;
            Ok(Box::new(PostgisSession { client }))
        }
    }

    struct PostgisSession {
        client: Client,
    }

    impl SpatialSession for PostgisSession {
        fn table_exists(&mut self, table: &str) -> Result<bool, WriteError> {
            let row = self
                .client
                .query_one("SELECT to_regclass($1) IS NOT NULL", &[&table])
                .map_err(db_err)?;
            Ok(row.get(0))
        }

        fn execute_transaction(&mut self, statements: &[SqlStatement]) -> Result<(), WriteError> {
            let mut tx = self.client.transaction().map_err(db_err)?;
            for st in statements {
                let params: Vec<&(dyn ToSql + Sync)> = st
                    .params
                    .iter()
                    .map(|p| match p {
                        SqlParam::Text(s) => s as &(dyn ToSql + Sync),
                        SqlParam::Int(v) => v as &(dyn ToSql + Sync),
                    })
                    .collect();
                tx.execute(st.sql.as_str(), &params).map_err(db_err)?;
            }
            tx.commit().map_err(db_err)
        }
    }

    fn db_err(e: postgres::Error) -> WriteError {
        WriteError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeoTransform;
    use geo::polygon;

    struct NoConnector;

    impl SpatialConnector for NoConnector {
        fn connect(&self) -> Result<Box<dyn SpatialSession>, WriteError> {
            Err(WriteError::Database("unreachable".into()))
        }
    }

    fn writer(if_exists: IfExists) -> VectorDatabaseDataWriter {
        let mut opts = VectorDatabaseOptions::new("public.buildings", "EPSG:31982");
        opts.geometry_column = "footprint".into();
        opts.if_exists = if_exists;
        VectorDatabaseDataWriter::new(Arc::new(NoConnector), opts)
    }

    fn set() -> PolygonSet {
        let p = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        PolygonSet::new("tile", vec![p.clone(), p], GeoTransform::identity())
    }

    #[test]
    fn fresh_table_is_created_with_renamed_geometry_column() {
        let plan = writer(IfExists::Fail).plan(&set(), false).unwrap();
        assert_eq!(plan.len(), 3);
        assert!(plan[0].sql.starts_with("CREATE TABLE IF NOT EXISTS \"public\".\"buildings\""));
        assert!(plan[0].sql.contains("\"footprint\" geometry(Polygon, 31982)"));
        assert!(plan[1].sql.contains("ST_GeomFromText($2, 31982)"));
        assert_eq!(plan[1].params[0], SqlParam::Text("tile".into()));
    }

    #[test]
    fn if_exists_policies() {
        assert_eq!(writer(IfExists::Append).plan(&set(), true).unwrap().len(), 2);
        let replace = writer(IfExists::Replace).plan(&set(), true).unwrap();
        assert!(replace[0].sql.starts_with("DROP TABLE"));
        assert_eq!(replace.len(), 4);
        assert!(matches!(
            writer(IfExists::Fail).plan(&set(), true),
            Err(WriteError::TableExists(_))
        ));
    }

    #[test]
    fn connection_failure_surfaces() {
        let err = writer(IfExists::Append).write_data(set()).unwrap_err();
        assert!(matches!(err, WriteError::Database(_)));
    }

    #[test]
    fn srid_parsing() {
        assert_eq!(parse_srid("EPSG:4326").unwrap(), 4326);
        assert_eq!(parse_srid("epsg:31982").unwrap(), 31982);
        assert_eq!(parse_srid("3857").unwrap(), 3857);
        assert!(parse_srid("WGS84").is_err());
        assert!(parse_srid("ESRI:102100").is_err());
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
