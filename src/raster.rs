//! Dense N-dimensional buffers with views and contiguity analysis

use crate::error::{FitsError, Result};
use crate::position::{linear_index, Dimension, Dyn, Position};
use crate::region::Region;
use num_traits::Zero;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Dense, contiguous buffer of values addressed by [`Position`].
///
/// The container parameter `C` selects the ownership strategy: `Vec<T>` for
/// an owning raster ([`VecRaster`]), `&[T]` / `&mut [T]` for borrowed views
/// ([`RasterView`], [`RasterViewMut`]). All variants satisfy the same
/// access contract; the element at `pos` lives at
/// `linear_index(shape, pos)` in the flat buffer, first axis fastest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster<T, D: Dimension = Dyn, C = Vec<T>> {
    shape: Position<D>,
    data: C,
    marker: PhantomData<T>,
}

/// Raster owning its buffer as a `Vec`
pub type VecRaster<T, D = Dyn> = Raster<T, D, Vec<T>>;

/// Raster borrowing an external buffer
pub type RasterView<'a, T, D = Dyn> = Raster<T, D, &'a [T]>;

/// Raster mutably borrowing an external buffer
pub type RasterViewMut<'a, T, D = Dyn> = Raster<T, D, &'a mut [T]>;

impl<T, D: Dimension, C: AsRef<[T]>> Raster<T, D, C> {
    /// Create a raster over a buffer whose length must match the shape.
    pub fn new(shape: Position<D>, data: C) -> Result<Self> {
        let expected = shape.size();
        let actual = data.as_ref().len() as i64;
        if expected != actual {
            return Err(FitsError::ShapeMismatch(format!(
                "Buffer length {} does not match shape size {}",
                actual, expected
            )));
        }
        Ok(Self {
            shape,
            data,
            marker: PhantomData,
        })
    }

    /// The raster shape, i.e. the length along each axis
    pub fn shape(&self) -> &Position<D> {
        &self.shape
    }

    /// Number of axes
    pub fn dimension(&self) -> usize {
        self.shape.dimension()
    }

    /// Number of elements
    pub fn size(&self) -> i64 {
        self.data.as_ref().len() as i64
    }

    /// Length along one axis
    pub fn length(&self, axis: usize) -> i64 {
        self.shape[axis]
    }

    /// The region spanning the whole raster
    pub fn domain(&self) -> Region<D> {
        Region::new(
            Position::zeroed(self.dimension()),
            self.shape.clone() - 1,
        )
    }

    /// The flat buffer
    pub fn as_slice(&self) -> &[T] {
        self.data.as_ref()
    }

    /// Give up ownership of the container
    pub fn into_data(self) -> C {
        self.data
    }

    /// Linear index of a position, first axis fastest
    pub fn index(&self, pos: &Position<D>) -> i64 {
        linear_index(self.shape.as_slice(), pos.as_slice())
    }

    /// Bounds-checked access with backward indexing.
    ///
    /// A negative coordinate `c` along axis `i` is remapped to
    /// `shape[i] + c`; coordinates still outside `[0, shape[i])` after
    /// normalization are an [`FitsError::OutOfBounds`].
    pub fn at(&self, pos: &Position<D>) -> Result<&T> {
        let normalized = self.normalize(pos)?;
        Ok(&self.as_slice()[self.index(&normalized) as usize])
    }

    /// Check whether a region is made of contiguous values in memory when
    /// viewed as an `m`-dimensional raster.
    ///
    /// The region is contiguous if and only if it spans the whole of every
    /// axis `i < m - 1` and holds a single index along every axis `i >= m`.
    pub fn is_contiguous(&self, m: usize, region: &Region<D>) -> bool {
        let n = self.dimension();
        if m > n {
            return false;
        }
        let front = region.front.as_slice();
        let back = region.back.as_slice();
        let shape = self.shape.as_slice();
        for i in 0..n {
            if i + 1 < m {
                if front[i] != 0 || back[i] != shape[i] - 1 {
                    return false;
                }
            } else if i >= m && front[i] != back[i] {
                return false;
            }
        }
        true
    }

    /// View a contiguous region as a possibly-lower-dimensional raster.
    ///
    /// The target dimension is `DOut`'s arity, or the source dimension for a
    /// dynamic `DOut`. Fails with [`FitsError::Dimension`] when the target
    /// dimension exceeds the source one or the region is not contiguous, and
    /// with [`FitsError::OutOfBounds`] when the region leaves the domain.
    pub fn slice<DOut: Dimension>(&self, region: &Region<D>) -> Result<RasterView<'_, T, DOut>> {
        let (offset, len, shape) = self.slice_layout::<DOut>(region)?;
        Ok(Raster {
            shape,
            data: &self.as_slice()[offset..offset + len],
            marker: PhantomData,
        })
    }

    /// View a contiguous sub-range of the last axis.
    ///
    /// A section is a maximal slice of dimension `N`: always contiguous by
    /// construction, so only the index range is checked.
    pub fn section(&self, front: i64, back: i64) -> Result<RasterView<'_, T, D>> {
        let (offset, len, shape) = self.section_layout(front, back)?;
        Ok(Raster {
            shape,
            data: &self.as_slice()[offset..offset + len],
            marker: PhantomData,
        })
    }

    /// View the maximal slice at a single index of the last axis, one
    /// dimension lower than the source.
    pub fn section_at<DOut: Dimension>(&self, index: i64) -> Result<RasterView<'_, T, DOut>> {
        let (offset, len, shape) = self.section_at_layout::<DOut>(index)?;
        Ok(Raster {
            shape,
            data: &self.as_slice()[offset..offset + len],
            marker: PhantomData,
        })
    }

    /// View an arbitrary, possibly non-contiguous region.
    ///
    /// Element access recomputes linear offsets per position: slower than
    /// [`Raster::slice`], used when contiguity does not hold.
    pub fn subraster(&self, region: Region<D>) -> Result<Subraster<'_, T, D, C>> {
        self.check_region(&region)?;
        Ok(Subraster {
            raster: self,
            region,
        })
    }

    fn normalize(&self, pos: &Position<D>) -> Result<Position<D>> {
        let mut normalized = pos.clone();
        for axis in 0..self.dimension() {
            let length = self.shape[axis];
            let coord = &mut normalized[axis];
            if *coord < 0 {
                *coord += length;
            }
            if *coord < 0 || *coord >= length {
                return Err(FitsError::OutOfBounds(format!(
                    "Position {:?} along axis {} outside [0, {})",
                    pos.as_slice(),
                    axis,
                    length
                )));
            }
        }
        Ok(normalized)
    }

    fn check_region(&self, region: &Region<D>) -> Result<()> {
        let shape = self.shape.as_slice();
        let front = region.front.as_slice();
        let back = region.back.as_slice();
        if front.len() != shape.len() {
            return Err(FitsError::Dimension(format!(
                "Region dimension {} does not match raster dimension {}",
                front.len(),
                shape.len()
            )));
        }
        for i in 0..shape.len() {
            if front[i] < 0 || back[i] < front[i] || back[i] >= shape[i] {
                return Err(FitsError::OutOfBounds(format!(
                    "Region axis {}: [{}, {}] outside [0, {})",
                    i, front[i], back[i], shape[i]
                )));
            }
        }
        Ok(())
    }

    fn slice_layout<DOut: Dimension>(
        &self,
        region: &Region<D>,
    ) -> Result<(usize, usize, Position<DOut>)> {
        let n = self.dimension();
        let m = DOut::DIM.unwrap_or(n);
        if m > n {
            return Err(FitsError::Dimension(format!(
                "Cannot slice a {}-D raster to dimension {}",
                n, m
            )));
        }
        self.check_region(region)?;
        if !self.is_contiguous(m, region) {
            return Err(FitsError::Dimension(format!(
                "Region is not contiguous as a {}-D slice",
                m
            )));
        }
        let offset = self.index(&region.front) as usize;
        let len = region.size() as usize;
        let shape = Position::from_slice(&region.shape().as_slice()[..m]);
        Ok((offset, len, shape))
    }

    fn section_layout(&self, front: i64, back: i64) -> Result<(usize, usize, Position<D>)> {
        let n = self.dimension();
        if n == 0 {
            return Err(FitsError::Dimension(
                "Cannot section a 0-D raster".into(),
            ));
        }
        let last = self.shape[n - 1];
        if front < 0 || back < front || back >= last {
            return Err(FitsError::OutOfBounds(format!(
                "Section [{}, {}] outside [0, {})",
                front, back, last
            )));
        }
        let stride: i64 = self.shape.as_slice()[..n - 1].iter().product();
        let mut shape = self.shape.clone();
        shape[n - 1] = back - front + 1;
        Ok((
            (front * stride) as usize,
            ((back - front + 1) * stride) as usize,
            shape,
        ))
    }

    fn section_at_layout<DOut: Dimension>(
        &self,
        index: i64,
    ) -> Result<(usize, usize, Position<DOut>)> {
        let n = self.dimension();
        if n == 0 {
            return Err(FitsError::Dimension(
                "Cannot section a 0-D raster".into(),
            ));
        }
        if let Some(m) = DOut::DIM {
            if m != n - 1 {
                return Err(FitsError::Dimension(format!(
                    "Section of a {}-D raster has dimension {}, not {}",
                    n,
                    n - 1,
                    m
                )));
            }
        }
        let last = self.shape[n - 1];
        if index < 0 || index >= last {
            return Err(FitsError::OutOfBounds(format!(
                "Section index {} outside [0, {})",
                index, last
            )));
        }
        let stride: i64 = self.shape.as_slice()[..n - 1].iter().product();
        let shape = Position::from_slice(&self.shape.as_slice()[..n - 1]);
        Ok(((index * stride) as usize, stride as usize, shape))
    }
}

impl<T, D: Dimension, C: AsRef<[T]> + AsMut<[T]>> Raster<T, D, C> {
    /// The flat buffer, mutable
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data.as_mut()
    }

    /// Bounds-checked mutable access with backward indexing
    pub fn at_mut(&mut self, pos: &Position<D>) -> Result<&mut T> {
        let normalized = self.normalize(pos)?;
        let index = self.index(&normalized) as usize;
        Ok(&mut self.as_mut_slice()[index])
    }

    /// Mutable counterpart of [`Raster::slice`]
    pub fn slice_mut<DOut: Dimension>(
        &mut self,
        region: &Region<D>,
    ) -> Result<RasterViewMut<'_, T, DOut>> {
        let (offset, len, shape) = self.slice_layout::<DOut>(region)?;
        Ok(Raster {
            shape,
            data: &mut self.as_mut_slice()[offset..offset + len],
            marker: PhantomData,
        })
    }

    /// Mutable counterpart of [`Raster::section`]
    pub fn section_mut(&mut self, front: i64, back: i64) -> Result<RasterViewMut<'_, T, D>> {
        let (offset, len, shape) = self.section_layout(front, back)?;
        Ok(Raster {
            shape,
            data: &mut self.as_mut_slice()[offset..offset + len],
            marker: PhantomData,
        })
    }

    /// Set every element to the given value
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        for element in self.as_mut_slice() {
            *element = value.clone();
        }
    }

    /// Mutable counterpart of [`Raster::subraster`]
    pub fn subraster_mut(&mut self, region: Region<D>) -> Result<SubrasterMut<'_, T, D, C>> {
        self.check_region(&region)?;
        Ok(SubrasterMut {
            raster: self,
            region,
        })
    }
}

impl<T: Zero + Clone, D: Dimension> VecRaster<T, D> {
    /// Allocate a zero-filled raster of the given shape
    pub fn zeroed(shape: Position<D>) -> Result<Self> {
        if shape.as_slice().iter().any(|&length| length < 0) {
            return Err(FitsError::ShapeMismatch(format!(
                "Invalid shape {:?}",
                shape.as_slice()
            )));
        }
        let data = vec![T::zero(); shape.size() as usize];
        Self::new(shape, data)
    }
}

impl<T, D: Dimension, C: AsRef<[T]>> Index<&Position<D>> for Raster<T, D, C> {
    type Output = T;

    /// Unchecked access: no negative-index normalization, panics when the
    /// computed offset leaves the buffer.
    fn index(&self, pos: &Position<D>) -> &T {
        &self.as_slice()[Raster::index(self, pos) as usize]
    }
}

impl<T, D: Dimension, C: AsRef<[T]> + AsMut<[T]>> IndexMut<&Position<D>> for Raster<T, D, C> {
    fn index_mut(&mut self, pos: &Position<D>) -> &mut T {
        let index = Raster::index(self, pos) as usize;
        &mut self.as_mut_slice()[index]
    }
}

/// Non-contiguous view of a raster over an arbitrary region.
///
/// Elements are addressed positionwise; bulk transfer goes through
/// [`Subraster::copy_into`], which copies run by run along the first axis.
#[derive(Debug)]
pub struct Subraster<'a, T, D: Dimension, C> {
    raster: &'a Raster<T, D, C>,
    region: Region<D>,
}

impl<'a, T, D: Dimension, C: AsRef<[T]>> Subraster<'a, T, D, C> {
    /// The viewed region
    pub fn region(&self) -> &Region<D> {
        &self.region
    }

    /// Shape of the view
    pub fn shape(&self) -> Position<D> {
        self.region.shape()
    }

    /// Number of elements in the view
    pub fn size(&self) -> i64 {
        self.region.size()
    }

    /// Element at a region-relative position
    pub fn value(&self, relative: &Position<D>) -> &T {
        let absolute = relative.clone() + self.region.front.clone();
        &self.raster[&absolute]
    }

    /// Copy the region into a contiguous buffer, region-iteration order.
    pub fn copy_into(&self, out: &mut [T]) -> Result<()>
    where
        T: Clone,
    {
        if out.len() as i64 != self.size() {
            return Err(FitsError::ShapeMismatch(format!(
                "Buffer length {} does not match region size {}",
                out.len(),
                self.size()
            )));
        }
        let data = self.raster.as_slice();
        let mut cursor = 0;
        for (offset, len) in runs(self.raster, &self.region) {
            out[cursor..cursor + len].clone_from_slice(&data[offset..offset + len]);
            cursor += len;
        }
        Ok(())
    }
}

/// Mutable non-contiguous view of a raster
#[derive(Debug)]
pub struct SubrasterMut<'a, T, D: Dimension, C> {
    raster: &'a mut Raster<T, D, C>,
    region: Region<D>,
}

impl<'a, T, D: Dimension, C: AsRef<[T]> + AsMut<[T]>> SubrasterMut<'a, T, D, C> {
    /// The viewed region
    pub fn region(&self) -> &Region<D> {
        &self.region
    }

    /// Number of elements in the view
    pub fn size(&self) -> i64 {
        self.region.size()
    }

    /// Fill the region from a contiguous buffer, region-iteration order.
    pub fn copy_from(&mut self, src: &[T]) -> Result<()>
    where
        T: Clone,
    {
        if src.len() as i64 != self.size() {
            return Err(FitsError::ShapeMismatch(format!(
                "Buffer length {} does not match region size {}",
                src.len(),
                self.size()
            )));
        }
        let spans: Vec<_> = runs(self.raster, &self.region).collect();
        let data = self.raster.as_mut_slice();
        let mut cursor = 0;
        for (offset, len) in spans {
            data[offset..offset + len].clone_from_slice(&src[cursor..cursor + len]);
            cursor += len;
        }
        Ok(())
    }
}

/// Contiguous runs of a region: one `(offset, length)` pair per line along
/// the first axis.
fn runs<'a, T, D: Dimension, C: AsRef<[T]>>(
    raster: &'a Raster<T, D, C>,
    region: &Region<D>,
) -> impl Iterator<Item = (usize, usize)> + 'a {
    let run_len = (region.back[0] - region.front[0] + 1) as usize;
    let mut locus = region.clone();
    locus.back[0] = locus.front[0];
    locus
        .positions()
        .map(move |front| (raster.index(&front) as usize, run_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Fix;

    fn sequence(len: usize) -> Vec<i32> {
        (0..len as i32).collect()
    }

    #[test]
    fn test_construction_checks_length() {
        let shape = Position::<Fix<2>>::from([3, 2]);
        assert!(Raster::new(shape.clone(), sequence(6)).is_ok());
        assert!(matches!(
            Raster::new(shape, sequence(5)),
            Err(FitsError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_index_matches_buffer() {
        let shape = Position::<Fix<3>>::from([3, 4, 2]);
        let raster = Raster::new(shape, sequence(24)).unwrap();
        for pos in &raster.domain() {
            let index = raster.index(&pos);
            assert_eq!(raster[&pos], raster.as_slice()[index as usize]);
        }
    }

    #[test]
    fn test_dynamic_matches_fixed() {
        let data = sequence(24);
        let fixed = Raster::new(Position::<Fix<3>>::from([3, 4, 2]), data.clone()).unwrap();
        let dynamic = Raster::new(Position::<Dyn>::from_slice(&[3, 4, 2]), data).unwrap();
        for pos in &fixed.domain() {
            assert_eq!(fixed.index(&pos), dynamic.index(&pos.to_dyn()));
        }
    }

    #[test]
    fn test_at_backward_indexing() {
        let width = 4;
        let height = 3;
        let raster = Raster::new(
            Position::<Fix<2>>::from([width, height]),
            sequence((width * height) as usize),
        )
        .unwrap();
        let vec = raster.as_slice();
        assert_eq!(*raster.at(&Position::from([0, 0])).unwrap(), vec[0]);
        assert_eq!(
            *raster.at(&Position::from([-1, 0])).unwrap(),
            vec[(width - 1) as usize]
        );
        assert_eq!(*raster.at(&Position::from([-width, 0])).unwrap(), vec[0]);
        assert_eq!(
            *raster.at(&Position::from([0, -1])).unwrap(),
            vec[((height - 1) * width) as usize]
        );
        assert_eq!(
            *raster.at(&Position::from([-1, -1])).unwrap(),
            vec[(height * width - 1) as usize]
        );
        assert!(raster.at(&Position::from([width, 0])).is_err());
        assert!(raster.at(&Position::from([-1 - width, 0])).is_err());
        assert!(raster.at(&Position::from([0, height])).is_err());
        assert!(raster.at(&Position::from([0, -1 - height])).is_err());
    }

    #[test]
    fn test_at_mut() {
        let mut raster =
            Raster::new(Position::<Fix<2>>::from([4, 3]), sequence(12)).unwrap();
        *raster.at_mut(&Position::from([1, -1])).unwrap() = 99;
        assert_eq!(*raster.at(&Position::from([1, 2])).unwrap(), 99);
    }

    #[test]
    fn test_contiguity_rule() {
        let raster = Raster::new(Position::<Fix<3>>::from([4, 3, 2]), sequence(24)).unwrap();

        // Whole axis 0, fixed axes 1 and 2: contiguous as 1-D
        let line = Region::new(Position::from([0, 1, 1]), Position::from([3, 1, 1]));
        assert!(raster.is_contiguous(1, &line));
        assert!(raster.is_contiguous(2, &line));

        // Partial axis 0 with several rows: not contiguous as 2-D
        let block = Region::new(Position::from([1, 0, 0]), Position::from([2, 2, 0]));
        assert!(!raster.is_contiguous(2, &block));
        // but a single partial row is
        let row = Region::new(Position::from([1, 0, 0]), Position::from([2, 0, 0]));
        assert!(raster.is_contiguous(2, &row));

        // Whole planes: contiguous as 3-D
        let planes = Region::new(Position::from([0, 0, 0]), Position::from([3, 2, 1]));
        assert!(raster.is_contiguous(3, &planes));

        // Spanning axis 2 with a partial axis 1: not contiguous
        let bad = Region::new(Position::from([0, 0, 0]), Position::from([3, 1, 1]));
        assert!(!raster.is_contiguous(3, &bad));

        assert!(!raster.is_contiguous(4, &planes));
    }

    #[test]
    fn test_slice() {
        let raster = Raster::new(Position::<Fix<3>>::from([4, 3, 2]), sequence(24)).unwrap();
        let region = Region::new(Position::from([0, 0, 1]), Position::from([3, 2, 1]));
        let slice = raster.slice::<Fix<2>>(&region).unwrap();
        assert_eq!(slice.shape(), &Position::from([4, 3]));
        assert_eq!(slice.as_slice(), &raster.as_slice()[12..24]);

        // Non-contiguous region is rejected
        let ragged = Region::new(Position::from([1, 0, 0]), Position::from([2, 2, 1]));
        assert!(matches!(
            raster.slice::<Fix<2>>(&ragged),
            Err(FitsError::Dimension(_))
        ));

        // Higher target dimension is rejected
        let whole = raster.domain();
        assert!(matches!(
            raster.slice::<Fix<4>>(&whole),
            Err(FitsError::Dimension(_))
        ));
    }

    #[test]
    fn test_section() {
        let raster = Raster::new(Position::<Fix<3>>::from([4, 3, 2]), sequence(24)).unwrap();
        let section = raster.section(1, 1).unwrap();
        assert_eq!(section.shape(), &Position::from([4, 3, 1]));
        assert_eq!(section.as_slice(), &raster.as_slice()[12..24]);

        let plane = raster.section_at::<Fix<2>>(0).unwrap();
        assert_eq!(plane.shape(), &Position::from([4, 3]));
        assert_eq!(plane.as_slice(), &raster.as_slice()[..12]);

        assert!(raster.section(0, 2).is_err());
        assert!(raster.section_at::<Fix<2>>(2).is_err());
    }

    #[test]
    fn test_subraster_copy() {
        let raster = Raster::new(Position::<Fix<2>>::from([4, 3]), sequence(12)).unwrap();
        let region = Region::new(Position::from([1, 0]), Position::from([2, 2]));
        let subraster = raster.subraster(region).unwrap();
        let mut out = vec![0; 6];
        subraster.copy_into(&mut out).unwrap();
        assert_eq!(out, vec![1, 2, 5, 6, 9, 10]);

        let mut target =
            VecRaster::<i32, Fix<2>>::zeroed(Position::from([4, 3])).unwrap();
        let region = Region::new(Position::from([1, 0]), Position::from([2, 2]));
        target.subraster_mut(region).unwrap().copy_from(&out).unwrap();
        assert_eq!(target.as_slice(), &[0, 1, 2, 0, 0, 5, 6, 0, 0, 9, 10, 0]);
    }

    #[test]
    fn test_subraster_rejects_out_of_domain() {
        let raster = Raster::new(Position::<Fix<2>>::from([4, 3]), sequence(12)).unwrap();
        let region = Region::new(Position::from([0, 0]), Position::from([4, 2]));
        assert!(matches!(
            raster.subraster(region),
            Err(FitsError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_fill() {
        let mut raster = Raster::new(Position::<Fix<2>>::from([2, 2]), sequence(4)).unwrap();
        raster.fill(7);
        assert_eq!(raster.as_slice(), &[7, 7, 7, 7]);
    }

    #[test]
    fn test_zeroed() {
        let raster = VecRaster::<f32, Dyn>::zeroed(Position::from_slice(&[5, 2])).unwrap();
        assert_eq!(raster.size(), 10);
        assert!(raster.as_slice().iter().all(|&v| v == 0.0));
    }
}
