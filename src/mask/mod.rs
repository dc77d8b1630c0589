//! Mask builder: burns vector ground truth into polygon, boundary and vertex
//! masks aligned with georeferenced images, and catalogs the result as CSV.
pub mod builder;
pub mod catalog;

pub use self::builder::{
    build_destination_dirs, build_mask_type_list, build_masks, ImageMasks, MaskBuildReport,
    MaskOutputType,
};
pub use self::catalog::{write_dataset_csv, DatasetEntry, CSV_HEADER};
