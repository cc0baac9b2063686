//! N-dimensional integer coordinates with fixed or runtime arity

use crate::error::{FitsError, Result};
use smallvec::SmallVec;
use std::fmt;
use std::ops::{Add, Index, IndexMut, Sub};

/// Component value marking an axis bound as "unbounded, resolve later".
///
/// Conventionally placed in the `back` position of a [`crate::Region`] and
/// replaced with the actual last valid index by
/// [`crate::FileMemRegions::resolve`].
pub const MAX_COORD: i64 = i64::MAX;

/// Coordinate storage strategy: arity known at compile time ([`Fix`]) or at
/// construction time ([`Dyn`]).
///
/// Keeping the arity as a type parameter lets one implementation of the
/// coordinate algebra serve both cases; the Horner index formula in
/// [`linear_index`] operates on plain slices and is shared by all arities.
pub trait Dimension: Copy + Clone + PartialEq + Eq + fmt::Debug + 'static {
    /// The coordinate container, a fixed array or a small vector.
    type Coords: AsRef<[i64]> + AsMut<[i64]> + Clone + PartialEq + Eq + fmt::Debug + Send + Sync;

    /// Compile-time arity, `None` when determined at construction.
    const DIM: Option<usize>;

    /// Allocate zero-filled coordinates of the given arity.
    ///
    /// For fixed arities `len` must equal `N`.
    fn alloc(len: usize) -> Self::Coords;
}

/// Arity known at compile time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fix<const N: usize>;

/// Arity known at construction time only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dyn;

impl<const N: usize> Dimension for Fix<N> {
    type Coords = [i64; N];

    const DIM: Option<usize> = Some(N);

    fn alloc(len: usize) -> Self::Coords {
        debug_assert_eq!(len, N);
        [0; N]
    }
}

impl Dimension for Dyn {
    type Coords = SmallVec<[i64; 4]>;

    const DIM: Option<usize> = None;

    fn alloc(len: usize) -> Self::Coords {
        SmallVec::from_elem(0, len)
    }
}

/// An N-component signed integer coordinate.
///
/// `Position<Fix<N>>` fixes the arity at compile time and stores the
/// components inline; `Position<Dyn>` fixes it at construction. Components
/// may be negative: their meaning (offset or backward index) is the contract
/// of the consuming API. A [`MAX_COORD`] component marks an open-ended bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position<D: Dimension = Dyn> {
    coords: D::Coords,
}

impl<D: Dimension> Position<D> {
    /// Build a position by copying components from a slice.
    ///
    /// For fixed arities the slice length must equal `N`.
    pub fn from_slice(components: &[i64]) -> Self {
        let mut coords = D::alloc(components.len());
        coords.as_mut().copy_from_slice(components);
        Self { coords }
    }

    /// Zero position of the given arity (ignored for fixed arities).
    pub(crate) fn zeroed(dimension: usize) -> Self {
        Self {
            coords: D::alloc(D::DIM.unwrap_or(dimension)),
        }
    }

    /// All-ones position of the given arity (ignored for fixed arities).
    pub(crate) fn oned(dimension: usize) -> Self {
        let mut position = Self::zeroed(dimension);
        for component in position.as_mut_slice() {
            *component = 1;
        }
        position
    }

    /// Number of components
    pub fn dimension(&self) -> usize {
        self.coords.as_ref().len()
    }

    /// Components as a slice
    pub fn as_slice(&self) -> &[i64] {
        self.coords.as_ref()
    }

    /// Components as a mutable slice
    pub fn as_mut_slice(&mut self) -> &mut [i64] {
        self.coords.as_mut()
    }

    /// Check whether the component along one axis is the sentinel
    pub fn is_max_at(&self, axis: usize) -> bool {
        self.as_slice()[axis] == MAX_COORD
    }

    /// Check whether every component is the sentinel
    pub fn is_max(&self) -> bool {
        !self.as_slice().is_empty() && self.as_slice().iter().all(|&c| c == MAX_COORD)
    }

    /// Check whether at least one component is the sentinel
    pub fn has_max(&self) -> bool {
        self.as_slice().contains(&MAX_COORD)
    }

    /// Copy into a dynamic-arity position
    pub fn to_dyn(&self) -> Position<Dyn> {
        Position::from_slice(self.as_slice())
    }

    /// Copy into a fixed-arity position, checking the arity
    pub fn to_fixed<const N: usize>(&self) -> Result<Position<Fix<N>>> {
        if self.dimension() != N {
            return Err(FitsError::Dimension(format!(
                "Cannot convert a {}-D position to dimension {}",
                self.dimension(),
                N
            )));
        }
        Ok(Position::from_slice(self.as_slice()))
    }

    /// Product of the components, e.g. the element count of a shape
    pub fn size(&self) -> i64 {
        self.as_slice().iter().product()
    }
}

impl<const N: usize> Position<Fix<N>> {
    /// Position with all components = 0
    pub fn zero() -> Self {
        Self { coords: [0; N] }
    }

    /// Position with all components = 1
    pub fn one() -> Self {
        Self { coords: [1; N] }
    }

    /// Position with all components = [`MAX_COORD`]
    pub fn max() -> Self {
        Self {
            coords: [MAX_COORD; N],
        }
    }
}

impl Position<Dyn> {
    /// Position of given arity with all components = 0
    pub fn zero(dimension: usize) -> Self {
        Self::zeroed(dimension)
    }

    /// Position of given arity with all components = 1
    pub fn one(dimension: usize) -> Self {
        Self {
            coords: SmallVec::from_elem(1, dimension),
        }
    }

    /// Position of given arity with all components = [`MAX_COORD`]
    pub fn max(dimension: usize) -> Self {
        Self {
            coords: SmallVec::from_elem(MAX_COORD, dimension),
        }
    }
}

impl<const N: usize> From<[i64; N]> for Position<Fix<N>> {
    fn from(coords: [i64; N]) -> Self {
        Self { coords }
    }
}

impl From<Vec<i64>> for Position<Dyn> {
    fn from(coords: Vec<i64>) -> Self {
        Self {
            coords: SmallVec::from_vec(coords),
        }
    }
}

impl<D: Dimension> Index<usize> for Position<D> {
    type Output = i64;

    fn index(&self, axis: usize) -> &i64 {
        &self.coords.as_ref()[axis]
    }
}

impl<D: Dimension> IndexMut<usize> for Position<D> {
    fn index_mut(&mut self, axis: usize) -> &mut i64 {
        &mut self.coords.as_mut()[axis]
    }
}

impl<D: Dimension> Add for Position<D> {
    type Output = Position<D>;

    fn add(mut self, rhs: Position<D>) -> Position<D> {
        for (c, r) in self.as_mut_slice().iter_mut().zip(rhs.as_slice()) {
            *c += r;
        }
        self
    }
}

impl<D: Dimension> Sub for Position<D> {
    type Output = Position<D>;

    fn sub(mut self, rhs: Position<D>) -> Position<D> {
        for (c, r) in self.as_mut_slice().iter_mut().zip(rhs.as_slice()) {
            *c -= r;
        }
        self
    }
}

impl<D: Dimension> Add<i64> for Position<D> {
    type Output = Position<D>;

    fn add(mut self, rhs: i64) -> Position<D> {
        for c in self.as_mut_slice() {
            *c += rhs;
        }
        self
    }
}

impl<D: Dimension> Sub<i64> for Position<D> {
    type Output = Position<D>;

    fn sub(mut self, rhs: i64) -> Position<D> {
        for c in self.as_mut_slice() {
            *c -= rhs;
        }
        self
    }
}

/// Linear index of a position in a buffer of the given shape.
///
/// Right-to-left Horner evaluation, so the first axis varies fastest:
/// `index = pos[0] + shape[0] * (pos[1] + shape[1] * (...))`.
/// Fixed- and dynamic-arity positions built from the same components yield
/// bit-identical results since both go through this one slice formula.
pub fn linear_index(shape: &[i64], pos: &[i64]) -> i64 {
    debug_assert_eq!(shape.len(), pos.len());
    let mut index = 0;
    for (length, coord) in shape.iter().zip(pos).rev() {
        index = coord + length * index;
    }
    index
}
