//! JSON configurations of the command line tools.
pub mod mask;
pub mod polygonize;
