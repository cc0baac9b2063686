//! Transfer engine between memory buffers and storage collaborators
//!
//! Raster transfers resolve a [`FileMemRegions`] mapping against the actual
//! extents, then pick the cheapest path: a single bounded store call when the
//! memory region is contiguous, a scratch buffer plus run-wise scatter or
//! gather otherwise. Column transfers go row-chunk by row-chunk, columns
//! inner, so heterogeneous column sets interleave their bounded calls.

use crate::column::{Column, ColumnInfo, ColumnValue, VecColumn};
use crate::error::{FitsError, Result};
use crate::io::{ElementIo, ImageStore, TableStore};
use crate::mapping::FileMemRegions;
use crate::position::{Dimension, Dyn, Position};
use crate::region::Segment;
use crate::raster::{Raster, VecRaster};
use num_traits::Zero;

/// Read a whole image into a newly allocated raster
pub fn read_raster<T, S>(store: &S) -> Result<VecRaster<T, Dyn>>
where
    T: Zero + Clone,
    S: ImageStore<T>,
{
    let extent = store.extent()?;
    let mut raster = VecRaster::zeroed(extent)?;
    let domain = raster.domain();
    store.read_region(&domain, raster.as_mut_slice())?;
    Ok(raster)
}

/// Write a whole raster over the stored image
pub fn write_raster<T, S, D, C>(store: &mut S, raster: &Raster<T, D, C>) -> Result<()>
where
    S: ImageStore<T>,
    D: Dimension,
    C: AsRef<[T]>,
{
    store.write_region(&raster.domain().to_dyn(), raster.as_slice())
}

/// Read a file region into a region of an existing raster.
///
/// Unbounded backs of `regions` are resolved against the store extent and
/// the raster shape first. When the memory region is contiguous the store
/// reads straight into the raster buffer; otherwise the chunk goes through a
/// scratch buffer and is scattered run by run.
pub fn read_region_into<T, S, D, C>(
    store: &S,
    regions: &FileMemRegions<D>,
    raster: &mut Raster<T, D, C>,
) -> Result<()>
where
    T: Zero + Clone,
    S: ImageStore<T>,
    D: Dimension,
    C: AsRef<[T]> + AsMut<[T]>,
{
    let extent = store.extent()?;
    let regions = resolved(&extent, regions, raster.shape())?;
    let file = regions.file().to_dyn();
    let memory = regions.memory().clone();
    if raster.is_contiguous(raster.dimension(), &memory) {
        let mut view = raster.slice_mut::<D>(&memory)?;
        store.read_region(&file, view.as_mut_slice())
    } else {
        let mut scratch = vec![T::zero(); memory.size() as usize];
        store.read_region(&file, &mut scratch)?;
        raster.subraster_mut(memory)?.copy_from(&scratch)
    }
}

/// Write a region of a raster into a file region.
///
/// The mirror of [`read_region_into`]: contiguous memory regions are handed
/// to the store directly, others are gathered into a scratch buffer first.
pub fn write_region_from<T, S, D, C>(
    store: &mut S,
    regions: &FileMemRegions<D>,
    raster: &Raster<T, D, C>,
) -> Result<()>
where
    T: Zero + Clone,
    S: ImageStore<T>,
    D: Dimension,
    C: AsRef<[T]>,
{
    let extent = store.extent()?;
    let regions = resolved(&extent, regions, raster.shape())?;
    let file = regions.file().to_dyn();
    let memory = regions.memory().clone();
    if raster.is_contiguous(raster.dimension(), &memory) {
        let view = raster.slice::<D>(&memory)?;
        store.write_region(&file, view.as_slice())
    } else {
        let mut scratch = vec![T::zero(); memory.size() as usize];
        raster.subraster(memory)?.copy_into(&mut scratch)?;
        store.write_region(&file, &scratch)
    }
}

fn resolved<D: Dimension>(
    extent: &Position<Dyn>,
    regions: &FileMemRegions<D>,
    shape: &Position<D>,
) -> Result<FileMemRegions<D>> {
    if extent.dimension() != shape.dimension() || regions.file().dimension() != shape.dimension() {
        return Err(FitsError::Dimension(format!(
            "Extent is {}-D, regions are {}-D, raster is {}-D",
            extent.dimension(),
            regions.file().dimension(),
            shape.dimension()
        )));
    }
    let file_last = Position::<D>::from_slice(extent.as_slice()) - 1;
    let memory_last = shape.clone() - 1;
    let mut regions = regions.clone();
    regions.resolve(&file_last, &memory_last);
    Ok(regions)
}

/// Read a 1-based row segment of one column into an exactly-sized buffer
pub fn read_column_rows<T, S, D, C>(
    store: &S,
    rows: Segment,
    column: &mut Column<T, D, C>,
) -> Result<()>
where
    T: ColumnValue,
    S: ElementIo<T>,
    D: Dimension,
    C: AsRef<[T]> + AsMut<[T]>,
{
    let index = store.lookup_column_index(&column.info().name)?;
    if Column::row_count(column) != rows.size() {
        return Err(FitsError::ShapeMismatch(format!(
            "Column {}: buffer holds {} rows but segment spans {}",
            column.info().name,
            Column::row_count(column),
            rows.size()
        )));
    }
    let repeat = column.info().repeat_count();
    store.read_elements(index, rows, repeat, column.as_mut_slice())
}

/// Write an exactly-sized buffer over a 1-based row segment of one column
pub fn write_column_rows<T, S, D, C>(
    store: &mut S,
    rows: Segment,
    column: &Column<T, D, C>,
) -> Result<()>
where
    T: ColumnValue,
    S: ElementIo<T>,
    D: Dimension,
    C: AsRef<[T]>,
{
    let index = store.lookup_column_index(&column.info().name)?;
    if column.row_count() != rows.size() {
        return Err(FitsError::ShapeMismatch(format!(
            "Column {}: buffer holds {} rows but segment spans {}",
            column.info().name,
            column.row_count(),
            rows.size()
        )));
    }
    store.write_elements(index, rows, column.info().repeat_count(), column.as_slice())
}

/// Read a whole column into a newly allocated buffer
pub fn read_column<T, S, D>(store: &S, info: ColumnInfo<D>) -> Result<VecColumn<T, D>>
where
    T: ColumnValue + Default,
    S: ElementIo<T>,
    D: Dimension,
{
    let rows = store.row_count()?;
    let mut column = VecColumn::with_row_count(info, rows)?;
    read_column_rows(store, Segment::from_size(1, rows), &mut column)?;
    Ok(column)
}

/// Write a whole column, starting at the first row
pub fn write_column<T, S, D, C>(store: &mut S, column: &Column<T, D, C>) -> Result<()>
where
    T: ColumnValue,
    S: ElementIo<T>,
    D: Dimension,
    C: AsRef<[T]>,
{
    write_column_rows(store, Segment::from_size(1, column.row_count()), column)
}

/// Readable side of a column set.
///
/// Implemented by single columns and, through the tuple implementations, by
/// heterogeneous sets of up to eight columns. `memory_front` is the 0-based
/// first row of the destination buffer; each call reads one bounded row
/// chunk per column.
pub trait ColumnSetRead<S: TableStore> {
    /// Number of rows the set can hold
    fn row_count(&self) -> i64;

    /// Read one chunk of file rows into the buffers, columns in order
    fn read_rows(&mut self, store: &S, file_rows: Segment, memory_front: i64) -> Result<()>;
}

/// Writable side of a column set.
///
/// For heterogeneous sets the engine spans the longest column; shorter
/// columns stop contributing once exhausted.
pub trait ColumnSetWrite<S: TableStore> {
    /// Number of rows the set provides, the maximum over its columns
    fn row_count(&self) -> i64;

    /// Write one chunk of file rows from the buffers, columns in order
    fn write_rows(&self, store: &mut S, file_rows: Segment, memory_front: i64) -> Result<()>;
}

impl<T, S, D, C> ColumnSetRead<S> for Column<T, D, C>
where
    T: ColumnValue,
    S: ElementIo<T>,
    D: Dimension,
    C: AsRef<[T]> + AsMut<[T]>,
{
    fn row_count(&self) -> i64 {
        Column::row_count(self)
    }

    fn read_rows(&mut self, store: &S, file_rows: Segment, memory_front: i64) -> Result<()> {
        let index = store.lookup_column_index(&self.info().name)?;
        let repeat = self.info().repeat_count();
        let memory = Segment::from_size(memory_front, file_rows.size());
        let mut view = self.slice_mut(memory)?;
        store.read_elements(index, file_rows, repeat, view.as_mut_slice())
    }
}

impl<T, S, D, C> ColumnSetWrite<S> for Column<T, D, C>
where
    T: ColumnValue,
    S: ElementIo<T>,
    D: Dimension,
    C: AsRef<[T]>,
{
    fn row_count(&self) -> i64 {
        Column::row_count(self)
    }

    fn write_rows(&self, store: &mut S, file_rows: Segment, memory_front: i64) -> Result<()> {
        let rows = Column::row_count(self);
        if memory_front >= rows {
            return Ok(());
        }
        let count = file_rows.size().min(rows - memory_front);
        let index = store.lookup_column_index(&self.info().name)?;
        let view = self.slice(Segment::from_size(memory_front, count))?;
        store.write_elements(
            index,
            Segment::from_size(file_rows.front, count),
            self.info().repeat_count(),
            view.as_slice(),
        )
    }
}

impl<S: TableStore, T: ColumnSetRead<S>> ColumnSetRead<S> for &mut T {
    fn row_count(&self) -> i64 {
        (**self).row_count()
    }

    fn read_rows(&mut self, store: &S, file_rows: Segment, memory_front: i64) -> Result<()> {
        (**self).read_rows(store, file_rows, memory_front)
    }
}

impl<S: TableStore, T: ColumnSetWrite<S>> ColumnSetWrite<S> for &T {
    fn row_count(&self) -> i64 {
        (**self).row_count()
    }

    fn write_rows(&self, store: &mut S, file_rows: Segment, memory_front: i64) -> Result<()> {
        (**self).write_rows(store, file_rows, memory_front)
    }
}

macro_rules! impl_column_set {
    ($($t:ident : $i:tt),+) => {
        impl<S: TableStore, $($t: ColumnSetRead<S>),+> ColumnSetRead<S> for ($($t,)+) {
            fn row_count(&self) -> i64 {
                let mut rows = 0;
                $(rows = rows.max(self.$i.row_count());)+
                rows
            }

            fn read_rows(&mut self, store: &S, file_rows: Segment, memory_front: i64) -> Result<()> {
                $(self.$i.read_rows(store, file_rows, memory_front)?;)+
                Ok(())
            }
        }

        impl<S: TableStore, $($t: ColumnSetWrite<S>),+> ColumnSetWrite<S> for ($($t,)+) {
            fn row_count(&self) -> i64 {
                let mut rows = 0;
                $(rows = rows.max(self.$i.row_count());)+
                rows
            }

            fn write_rows(&self, store: &mut S, file_rows: Segment, memory_front: i64) -> Result<()> {
                $(self.$i.write_rows(store, file_rows, memory_front)?;)+
                Ok(())
            }
        }
    };
}

impl_column_set!(A: 0);
impl_column_set!(A: 0, B: 1);
impl_column_set!(A: 0, B: 1, C: 2);
impl_column_set!(A: 0, B: 1, C: 2, D: 3);
impl_column_set!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_column_set!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_column_set!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_column_set!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

fn checked_chunk_size<S: TableStore>(store: &S) -> Result<i64> {
    let chunk = store.preferred_row_chunk_size()?;
    if chunk < 1 {
        return Err(FitsError::StorageProtocol(format!(
            "Preferred row chunk size must be positive, got {}",
            chunk
        )));
    }
    Ok(chunk)
}

/// Read a 1-based row segment into a column set, chunk by chunk.
///
/// Rows outer, columns inner: each chunk triggers one bounded store call per
/// column before the next chunk starts. Every column buffer must hold
/// `rows.size()` rows.
pub fn read_columns_rows<S, Set>(store: &S, rows: Segment, columns: &mut Set) -> Result<()>
where
    S: TableStore,
    Set: ColumnSetRead<S>,
{
    let chunk = checked_chunk_size(store)?;
    let mut first = rows.front;
    while first <= rows.back {
        let count = chunk.min(rows.back - first + 1);
        columns.read_rows(store, Segment::from_size(first, count), first - rows.front)?;
        first += count;
    }
    Ok(())
}

/// Read every row of the table into a column set
pub fn read_columns<S, Set>(store: &S, columns: &mut Set) -> Result<()>
where
    S: TableStore,
    Set: ColumnSetRead<S>,
{
    let rows = store.row_count()?;
    read_columns_rows(store, Segment::from_size(1, rows), columns)
}

/// Write a column set over a 1-based row segment, chunk by chunk.
///
/// Rows outer, columns inner, like [`read_columns_rows`]. Shorter columns of
/// a heterogeneous set stop contributing once exhausted.
pub fn write_columns_rows<S, Set>(store: &mut S, rows: Segment, columns: &Set) -> Result<()>
where
    S: TableStore,
    Set: ColumnSetWrite<S>,
{
    let chunk = checked_chunk_size(store)?;
    let mut first = rows.front;
    while first <= rows.back {
        let count = chunk.min(rows.back - first + 1);
        columns.write_rows(store, Segment::from_size(first, count), first - rows.front)?;
        first += count;
    }
    Ok(())
}

/// Write a column set starting at the first row, spanning its longest column
pub fn write_columns<S, Set>(store: &mut S, columns: &Set) -> Result<()>
where
    S: TableStore,
    Set: ColumnSetWrite<S>,
{
    let rows = columns.row_count();
    write_columns_rows(store, Segment::from_size(1, rows), columns)
}
