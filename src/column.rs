//! Binary-table column data and metadata

use crate::error::{FitsError, Result};
use crate::position::{Dimension, Dyn, Position};
use crate::region::Segment;
use crate::raster::{Raster, RasterView};
use std::fmt;
use std::marker::PhantomData;

/// Element types a column can hold.
///
/// For text columns ([`String`]) the declared repeat count is a maximum
/// encoded width, not an element multiplier: one element per row is stored
/// regardless of the repeat count, and reshape skips the divisibility check.
pub trait ColumnValue: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Whether the type is text-valued
    const TEXT: bool = false;
}

macro_rules! impl_column_value {
    ($($t:ty),+) => {
        $(impl ColumnValue for $t {})+
    };
}

impl_column_value!(u8, i16, i32, i64, u16, u32, u64, f32, f64);

impl ColumnValue for String {
    const TEXT: bool = true;
}

/// Column metadata: name, unit and field shape.
///
/// The repeat count is the product of the field shape components; scalar
/// columns have shape `(1)`, vector columns `(r)`, multidimensional columns
/// an arbitrary shape whose product is the repeat count.
#[derive(Debug, Clone)]
pub struct ColumnInfo<D: Dimension = Dyn> {
    /// Column name
    pub name: String,
    /// Unit of the values, empty when unitless
    pub unit: String,
    /// Field shape; the repeat count is its size
    pub shape: Position<D>,
}

impl<D: Dimension> ColumnInfo<D> {
    /// Create metadata for a scalar or vector column of given repeat count.
    ///
    /// The field shape is flat: first component = `repeat_count`, others = 1.
    pub fn new(name: impl Into<String>, unit: impl Into<String>, repeat_count: i64) -> Self {
        let mut shape = Position::oned(1);
        shape[0] = repeat_count;
        Self {
            name: name.into(),
            unit: unit.into(),
            shape,
        }
    }

    /// Create metadata for a multidimensional column of given field shape
    pub fn with_shape(
        name: impl Into<String>,
        unit: impl Into<String>,
        shape: Position<D>,
    ) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            shape,
        }
    }

    /// Number of elements per field, the product of the shape components
    pub fn repeat_count(&self) -> i64 {
        self.shape.size()
    }
}

/// Metadata is equal when name, unit and repeat count agree; the exact field
/// shape does not take part.
impl<D: Dimension> PartialEq for ColumnInfo<D> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.unit == other.unit
            && self.repeat_count() == other.repeat_count()
    }
}

impl<D: Dimension> Eq for ColumnInfo<D> {}

/// Dense per-row field buffer of a binary table column.
///
/// Like [`Raster`], the container parameter selects the ownership strategy:
/// [`VecColumn`] owns its buffer, [`ColumnView`] / [`ColumnViewMut`] borrow
/// an external one. Rows are 0-based in memory; the buffer holds
/// `row_count × repeat_count` elements (`row_count` elements for text
/// columns, whose repeat count is a width bound).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column<T: ColumnValue, D: Dimension = Dyn, C = Vec<T>> {
    info: ColumnInfo<D>,
    data: C,
    marker: PhantomData<T>,
}

/// Column owning its buffer as a `Vec`
pub type VecColumn<T, D = Dyn> = Column<T, D, Vec<T>>;

/// Column borrowing an external buffer
pub type ColumnView<'a, T, D = Dyn> = Column<T, D, &'a [T]>;

/// Column mutably borrowing an external buffer
pub type ColumnViewMut<'a, T, D = Dyn> = Column<T, D, &'a mut [T]>;

impl<T: ColumnValue, D: Dimension, C: AsRef<[T]>> Column<T, D, C> {
    /// Create a column over a buffer.
    ///
    /// For non-text columns the buffer length must be a multiple of the
    /// repeat count.
    pub fn new(info: ColumnInfo<D>, data: C) -> Result<Self> {
        let repeat = info.repeat_count();
        if repeat < 1 {
            return Err(FitsError::ShapeMismatch(format!(
                "Column {}: repeat count {} must be positive",
                info.name, repeat
            )));
        }
        if !T::TEXT && data.as_ref().len() as i64 % repeat != 0 {
            return Err(FitsError::ShapeMismatch(format!(
                "Column {}: buffer length {} is not a multiple of repeat count {}",
                info.name,
                data.as_ref().len(),
                repeat
            )));
        }
        Ok(Self {
            info,
            data,
            marker: PhantomData,
        })
    }

    /// The column metadata
    pub fn info(&self) -> &ColumnInfo<D> {
        &self.info
    }

    /// Number of buffer elements per row: the repeat count, or 1 for text
    pub fn elements_per_row(&self) -> i64 {
        if T::TEXT {
            1
        } else {
            self.info.repeat_count()
        }
    }

    /// Number of rows, derived from the buffer length
    pub fn row_count(&self) -> i64 {
        self.data.as_ref().len() as i64 / self.elements_per_row()
    }

    /// The flat buffer
    pub fn as_slice(&self) -> &[T] {
        self.data.as_ref()
    }

    /// Give up ownership of the container
    pub fn into_data(self) -> C {
        self.data
    }

    /// Unchecked access to the value at given row and repeat indices
    pub fn value(&self, row: i64, repeat: i64) -> &T {
        &self.as_slice()[(row * self.elements_per_row() + repeat) as usize]
    }

    /// Bounds-checked access with backward row indexing
    pub fn at(&self, row: i64, repeat: i64) -> Result<&T> {
        let (row, repeat) = self.normalize(row, repeat)?;
        Ok(self.value(row, repeat))
    }

    /// View the field at one row as a raster of the field shape
    pub fn field(&self, row: i64) -> Result<RasterView<'_, T, D>> {
        let rows = self.row_count();
        if row < 0 || row >= rows {
            return Err(FitsError::OutOfBounds(format!(
                "Column {}: row {} outside [0, {})",
                self.info.name, row, rows
            )));
        }
        let repeat = self.elements_per_row();
        let offset = (row * repeat) as usize;
        Raster::new(
            self.info.shape.clone(),
            &self.as_slice()[offset..offset + repeat as usize],
        )
    }

    /// View a contiguous 0-based row range
    pub fn slice(&self, rows: Segment) -> Result<ColumnView<'_, T, D>> {
        let (front, back) = self.check_rows(rows)?;
        let repeat = self.elements_per_row();
        Column::new(
            self.info.clone(),
            &self.as_slice()[(front * repeat) as usize..((back + 1) * repeat) as usize],
        )
    }

    /// Change the column name
    pub fn rename(&mut self, name: impl Into<String>) {
        self.info.name = name.into();
    }

    /// Change the repeat count without moving data (fold/unfold).
    ///
    /// The repeat count must divide the buffer length, except for text
    /// columns where it only bounds the encoded width. The resulting field
    /// shape is flat.
    pub fn reshape(&mut self, repeat_count: i64) -> Result<()> {
        if repeat_count < 1 {
            return Err(FitsError::ShapeMismatch(format!(
                "Column {}: repeat count {} must be positive",
                self.info.name, repeat_count
            )));
        }
        if !T::TEXT && self.as_slice().len() as i64 % repeat_count != 0 {
            return Err(FitsError::ShapeMismatch(format!(
                "Column {}: repeat count {} does not divide buffer length {}",
                self.info.name,
                repeat_count,
                self.as_slice().len()
            )));
        }
        for component in self.info.shape.as_mut_slice() {
            *component = 1;
        }
        self.info.shape[0] = repeat_count;
        Ok(())
    }

    /// Change the field shape without moving data.
    ///
    /// The shape size must divide the buffer length.
    pub fn reshape_shape(&mut self, shape: Position<D>) -> Result<()> {
        let repeat = shape.size();
        if repeat < 1 || (!T::TEXT && self.as_slice().len() as i64 % repeat != 0) {
            return Err(FitsError::ShapeMismatch(format!(
                "Column {}: shape {:?} does not divide buffer length {}",
                self.info.name,
                shape.as_slice(),
                self.as_slice().len()
            )));
        }
        self.info.shape = shape;
        Ok(())
    }

    fn normalize(&self, row: i64, repeat: i64) -> Result<(i64, i64)> {
        let rows = self.row_count();
        let width = self.elements_per_row();
        let mut r = row;
        if r < 0 {
            r += rows;
        }
        let mut k = repeat;
        if k < 0 {
            k += width;
        }
        if r < 0 || r >= rows || k < 0 || k >= width {
            return Err(FitsError::OutOfBounds(format!(
                "Column {}: ({}, {}) outside ({}, {}) rows x repeats",
                self.info.name, row, repeat, rows, width
            )));
        }
        Ok((r, k))
    }

    fn check_rows(&self, rows: Segment) -> Result<(i64, i64)> {
        let count = self.row_count();
        if rows.front < 0 || rows.back < rows.front || rows.back >= count {
            return Err(FitsError::OutOfBounds(format!(
                "Column {}: rows [{}, {}] outside [0, {})",
                self.info.name, rows.front, rows.back, count
            )));
        }
        Ok((rows.front, rows.back))
    }
}

impl<T: ColumnValue, D: Dimension, C: AsRef<[T]> + AsMut<[T]>> Column<T, D, C> {
    /// The flat buffer, mutable
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data.as_mut()
    }

    /// Unchecked mutable access to the value at given row and repeat indices
    pub fn value_mut(&mut self, row: i64, repeat: i64) -> &mut T {
        let index = (row * self.elements_per_row() + repeat) as usize;
        &mut self.as_mut_slice()[index]
    }

    /// Bounds-checked mutable access with backward row indexing
    pub fn at_mut(&mut self, row: i64, repeat: i64) -> Result<&mut T> {
        let (row, repeat) = self.normalize(row, repeat)?;
        Ok(self.value_mut(row, repeat))
    }

    /// Mutable counterpart of [`Column::slice`]
    pub fn slice_mut(&mut self, rows: Segment) -> Result<ColumnViewMut<'_, T, D>> {
        let (front, back) = self.check_rows(rows)?;
        let repeat = self.elements_per_row();
        Column::new(
            self.info.clone(),
            &mut self.as_mut_slice()[(front * repeat) as usize..((back + 1) * repeat) as usize],
        )
    }
}

impl<T: ColumnValue + Default, D: Dimension> VecColumn<T, D> {
    /// Allocate a default-filled column with the given row count
    pub fn with_row_count(info: ColumnInfo<D>, row_count: i64) -> Result<Self> {
        let repeat = if T::TEXT { 1 } else { info.repeat_count() };
        if info.repeat_count() < 1 || row_count < 0 {
            return Err(FitsError::ShapeMismatch(format!(
                "Column {}: invalid repeat count {} or row count {}",
                info.name,
                info.repeat_count(),
                row_count
            )));
        }
        let data = vec![T::default(); (repeat * row_count) as usize];
        Self::new(info, data)
    }
}
