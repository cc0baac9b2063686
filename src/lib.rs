//! FitsData - typed data access for FITS-like containers
//!
//! A pure Rust data layer for scientific binary containers: N-dimensional
//! image regions and binary-table columns, with the coordinate algebra and
//! chunked transfer engine needed to move them between memory buffers and a
//! storage backend.
//!
//! # Features
//!
//! - Positions and regions with compile-time (`Fix<N>`) or runtime (`Dyn`) arity
//! - Rasters over owned or borrowed buffers, with slices, sections and
//!   non-contiguous subrasters
//! - Binary-table columns with repeat counts, field shapes and reshaping
//! - File/memory region mappings with open-ended bounds resolved on use
//! - Chunked, heterogeneous multi-column transfers through narrow storage
//!   traits (implement [`ImageStore`] / [`ElementIo`] for your backend)
//!
//! # Example
//!
//! ```rust
//! use fitsdata::{
//!     read_region_into, write_raster, FileMemRegions, MemImage, Position, Region, VecRaster,
//! };
//!
//! # fn example() -> fitsdata::Result<()> {
//! // A 4x4 image in storage
//! let mut store = MemImage::from_raster(VecRaster::new(
//!     Position::from_slice(&[4, 4]),
//!     (0..16).collect::<Vec<i32>>(),
//! )?);
//!
//! // Read a 2x2 file region into the middle of a 4x4 raster
//! let mut raster = VecRaster::<i32>::zeroed(Position::from_slice(&[4, 4]))?;
//! let regions = FileMemRegions::from_file_region(
//!     Region::new(Position::from_slice(&[1, 0]), Position::from_slice(&[2, 1])),
//!     Position::from_slice(&[1, 1]),
//! );
//! read_region_into(&store, &regions, &mut raster)?;
//!
//! write_raster(&mut store, &raster)?;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod column;
pub mod error;
pub mod io;
pub mod mapping;
pub mod position;
pub mod raster;
pub mod region;
pub mod transfer;

// Re-exports
pub use column::{Column, ColumnInfo, ColumnValue, ColumnView, ColumnViewMut, VecColumn};
pub use error::{FitsError, Result};
pub use io::{ElementIo, ImageStore, MemImage, MemTable, TableStore};
pub use mapping::FileMemRegions;
pub use position::{linear_index, Dimension, Dyn, Fix, Position, MAX_COORD};
pub use raster::{Raster, RasterView, RasterViewMut, Subraster, SubrasterMut, VecRaster};
pub use region::{Region, RegionIter, Segment};
pub use transfer::{
    read_column, read_column_rows, read_columns, read_columns_rows, read_raster, read_region_into,
    write_column, write_column_rows, write_columns, write_columns_rows, write_raster,
    write_region_from, ColumnSetRead, ColumnSetWrite,
};

/// Version of the data layer
pub const FITSDATA_VERSION: &str = env!("CARGO_PKG_VERSION");
