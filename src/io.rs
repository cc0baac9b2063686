//! Storage-collaborator contracts and in-memory reference stores
//!
//! The transfer engine (see [`crate::transfer`]) talks to the underlying
//! file-format library only through the narrow traits in this module. All
//! calls are synchronous and bounded; the engine never retries. Row segments
//! and column indices are 1-based, following the container-file convention.

use crate::column::ColumnValue;
use crate::error::{FitsError, Result};
use crate::position::{Dyn, Position};
use crate::region::{Region, Segment};
use crate::raster::VecRaster;
use num_traits::Zero;
use std::any::Any;

/// Storage collaborator for N-dimensional image data.
///
/// Regions are expressed in the file coordinate frame with dynamic arity;
/// buffers are laid out in region-iteration order (first axis fastest).
pub trait ImageStore<T> {
    /// Shape of the stored image
    fn extent(&self) -> Result<Position<Dyn>>;

    /// Length of the stored image along one axis
    fn extent_in_axis(&self, axis: usize) -> Result<i64> {
        let extent = self.extent()?;
        if axis >= extent.dimension() {
            return Err(FitsError::Dimension(format!(
                "Axis {} outside {}-D extent",
                axis,
                extent.dimension()
            )));
        }
        Ok(extent[axis])
    }

    /// Read a bounded region into a contiguous buffer
    fn read_region(&self, region: &Region<Dyn>, out: &mut [T]) -> Result<()>;

    /// Write a contiguous buffer into a bounded region
    fn write_region(&mut self, region: &Region<Dyn>, data: &[T]) -> Result<()>;
}

/// Storage collaborator for tabular data: row bookkeeping and column lookup
pub trait TableStore {
    /// Total number of rows in the table
    fn row_count(&self) -> Result<i64>;

    /// Preferred number of rows per buffered I/O call.
    ///
    /// Zero is a fatal precondition violation for the chunked transfer
    /// engine, which reports it as [`FitsError::StorageProtocol`].
    fn preferred_row_chunk_size(&self) -> Result<i64>;

    /// 1-based index of a column, by name
    fn lookup_column_index(&self, name: &str) -> Result<i64>;
}

/// Typed, bounded element transfer for one column value type
pub trait ElementIo<T>: TableStore {
    /// Read the elements of the given 1-based rows of one column
    fn read_elements(&self, index: i64, rows: Segment, repeat_count: i64, out: &mut [T])
        -> Result<()>;

    /// Write the elements of the given 1-based rows of one column
    fn write_elements(
        &mut self,
        index: i64,
        rows: Segment,
        repeat_count: i64,
        data: &[T],
    ) -> Result<()>;
}

/// In-memory [`ImageStore`] backed by an owning raster.
///
/// The reference implementation used by tests, benches and demos; region
/// transfer goes through the same subraster machinery as the engine's
/// memory side.
#[derive(Debug, Clone)]
pub struct MemImage<T> {
    raster: VecRaster<T, Dyn>,
}

impl<T: Clone> MemImage<T> {
    /// Create a zero-filled image of the given shape
    pub fn new(shape: Position<Dyn>) -> Result<Self>
    where
        T: Zero,
    {
        Ok(Self {
            raster: VecRaster::zeroed(shape)?,
        })
    }

    /// Wrap an existing raster
    pub fn from_raster(raster: VecRaster<T, Dyn>) -> Self {
        Self { raster }
    }

    /// The backing raster
    pub fn raster(&self) -> &VecRaster<T, Dyn> {
        &self.raster
    }
}

impl<T: Clone> ImageStore<T> for MemImage<T> {
    fn extent(&self) -> Result<Position<Dyn>> {
        Ok(self.raster.shape().clone())
    }

    fn read_region(&self, region: &Region<Dyn>, out: &mut [T]) -> Result<()> {
        self.raster.subraster(region.clone())?.copy_into(out)
    }

    fn write_region(&mut self, region: &Region<Dyn>, data: &[T]) -> Result<()> {
        self.raster.subraster_mut(region.clone())?.copy_from(data)
    }
}

struct MemTableColumn {
    name: String,
    values: Box<dyn Any + Send + Sync>,
}

/// In-memory [`TableStore`] with typed per-column buffers.
///
/// Columns are added with [`MemTable::add_column`] and keep their element
/// type; the type is recovered at access time, and a mismatch between the
/// requested and stored types is a [`FitsError::StorageProtocol`] error.
pub struct MemTable {
    rows: i64,
    chunk_rows: i64,
    columns: Vec<MemTableColumn>,
}

impl MemTable {
    /// Create an empty table with a given row count and preferred chunk size
    pub fn new(rows: i64, chunk_rows: i64) -> Self {
        Self {
            rows,
            chunk_rows,
            columns: Vec::new(),
        }
    }

    /// Append a column; its buffer must hold `rows × elements-per-row`
    /// elements (one element per row for text columns).
    pub fn add_column<T: ColumnValue>(&mut self, name: impl Into<String>, repeat_count: i64, values: Vec<T>) -> Result<()> {
        let per_row = if T::TEXT { 1 } else { repeat_count };
        if values.len() as i64 != self.rows * per_row {
            return Err(FitsError::ShapeMismatch(format!(
                "Column buffer length {} does not match {} rows x {} elements",
                values.len(),
                self.rows,
                per_row
            )));
        }
        self.columns.push(MemTableColumn {
            name: name.into(),
            values: Box::new(values),
        });
        Ok(())
    }

    fn column(&self, index: i64) -> Result<&MemTableColumn> {
        self.columns
            .get(index as usize - 1)
            .ok_or_else(|| FitsError::StorageProtocol(format!("No column #{}", index)))
    }

    fn typed<T: ColumnValue>(&self, index: i64) -> Result<&Vec<T>> {
        let column = self.column(index)?;
        column.values.downcast_ref().ok_or_else(|| {
            FitsError::StorageProtocol(format!(
                "Column {} holds another element type",
                column.name
            ))
        })
    }

    fn typed_mut<T: ColumnValue>(&mut self, index: i64) -> Result<&mut Vec<T>> {
        let column = self
            .columns
            .get_mut(index as usize - 1)
            .ok_or_else(|| FitsError::StorageProtocol(format!("No column #{}", index)))?;
        let name = column.name.clone();
        column.values.downcast_mut().ok_or_else(|| {
            FitsError::StorageProtocol(format!("Column {} holds another element type", name))
        })
    }

    fn element_range<T: ColumnValue>(&self, rows: Segment, repeat_count: i64) -> Result<(usize, usize)> {
        let per_row = if T::TEXT { 1 } else { repeat_count };
        if rows.front < 1 || rows.back < rows.front || rows.back > self.rows {
            return Err(FitsError::OutOfBounds(format!(
                "Rows [{}, {}] outside [1, {}]",
                rows.front, rows.back, self.rows
            )));
        }
        let offset = ((rows.front - 1) * per_row) as usize;
        let count = (rows.size() * per_row) as usize;
        Ok((offset, count))
    }
}

impl TableStore for MemTable {
    fn row_count(&self) -> Result<i64> {
        Ok(self.rows)
    }

    fn preferred_row_chunk_size(&self) -> Result<i64> {
        Ok(self.chunk_rows)
    }

    fn lookup_column_index(&self, name: &str) -> Result<i64> {
        self.columns
            .iter()
            .position(|column| column.name == name)
            .map(|position| position as i64 + 1)
            .ok_or_else(|| FitsError::StorageProtocol(format!("No column named {}", name)))
    }
}

impl<T: ColumnValue> ElementIo<T> for MemTable {
    fn read_elements(
        &self,
        index: i64,
        rows: Segment,
        repeat_count: i64,
        out: &mut [T],
    ) -> Result<()> {
        let (offset, count) = self.element_range::<T>(rows, repeat_count)?;
        if out.len() != count {
            return Err(FitsError::ShapeMismatch(format!(
                "Buffer length {} does not match {} elements",
                out.len(),
                count
            )));
        }
        let values = self.typed::<T>(index)?;
        out.clone_from_slice(&values[offset..offset + count]);
        Ok(())
    }

    fn write_elements(
        &mut self,
        index: i64,
        rows: Segment,
        repeat_count: i64,
        data: &[T],
    ) -> Result<()> {
        let (offset, count) = self.element_range::<T>(rows, repeat_count)?;
        if data.len() != count {
            return Err(FitsError::ShapeMismatch(format!(
                "Buffer length {} does not match {} elements",
                data.len(),
                count
            )));
        }
        let values = self.typed_mut::<T>(index)?;
        values[offset..offset + count].clone_from_slice(data);
        Ok(())
    }
}
