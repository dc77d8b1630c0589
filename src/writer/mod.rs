//! Output sinks for finished polygon sets and raster arrays.
//!
//! A sink writes or fails; errors are returned to the caller and never
//! retried here. Sinks are shared across workers, so every implementation is
//! `Send + Sync` and treats each call as an independent write.
pub mod database;
pub mod raster;
pub mod vector_file;

pub use self::database::{
    IfExists, SpatialConnector, SpatialSession, SqlParam, SqlStatement, VectorDatabaseDataWriter,
    VectorDatabaseOptions,
};
pub use self::raster::{RasterArray, RasterDataWriter};
pub use self::vector_file::{VectorFileDataWriter, VectorFormat};

use crate::error::WriteError;
use std::sync::Arc;

pub trait DataWriter<T>: Send + Sync {
    fn write_data(&self, data: T) -> Result<(), WriteError>;
}

impl<T, W: DataWriter<T> + ?Sized> DataWriter<T> for Arc<W> {
    fn write_data(&self, data: T) -> Result<(), WriteError> {
        (**self).write_data(data)
    }
}

impl<T, W: DataWriter<T> + ?Sized> DataWriter<T> for Box<W> {
    fn write_data(&self, data: T) -> Result<(), WriteError> {
        (**self).write_data(data)
    }
}
