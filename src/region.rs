//! Axis-aligned inclusive coordinate boxes and row segments

use crate::position::{Dimension, Dyn, Fix, Position};

/// Axis-aligned box over a [`Position`] space, inclusive on both ends.
///
/// Any component of `back` may hold [`crate::position::MAX_COORD`], meaning "extend to the
/// data's actual last index along that axis"; such regions must be resolved
/// (see [`crate::FileMemRegions`]) before their shape or iteration is
/// meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region<D: Dimension = Dyn> {
    /// First position of the box
    pub front: Position<D>,
    /// Last position of the box, inclusive
    pub back: Position<D>,
}

impl<D: Dimension> Region<D> {
    /// Create a region from its first and last positions
    pub fn new(front: Position<D>, back: Position<D>) -> Self {
        Self { front, back }
    }

    /// Create a region from its first position and its shape
    pub fn from_shape(front: Position<D>, shape: Position<D>) -> Self {
        let back = front.clone() + shape - 1;
        Self { front, back }
    }

    /// Number of axes
    pub fn dimension(&self) -> usize {
        self.front.dimension()
    }

    /// Shape of the region, `back - front + 1` componentwise.
    ///
    /// Saturates on unresolved (open-ended) axes; only meaningful once every
    /// `back` component is resolved.
    pub fn shape(&self) -> Position<D> {
        let mut shape = self.back.clone();
        for (s, f) in shape.as_mut_slice().iter_mut().zip(self.front.as_slice()) {
            *s = s.saturating_sub(*f).saturating_add(1);
        }
        shape
    }

    /// Number of positions in the region
    pub fn size(&self) -> i64 {
        self.shape().size()
    }

    /// Check whether a position lies inside the region
    pub fn contains(&self, position: &Position<D>) -> bool {
        position
            .as_slice()
            .iter()
            .zip(self.front.as_slice())
            .zip(self.back.as_slice())
            .all(|((&p, &f), &b)| p >= f && p <= b)
    }

    /// Copy into a dynamic-arity region
    pub fn to_dyn(&self) -> Region<Dyn> {
        Region {
            front: self.front.to_dyn(),
            back: self.back.to_dyn(),
        }
    }

    /// Lazily iterate over every position in the region, first axis fastest.
    ///
    /// The order matches the linear-index convention of
    /// [`crate::position::linear_index`], so a full-domain walk visits the
    /// backing buffer in order. Restartable: each call yields a fresh
    /// iterator over the same sequence.
    pub fn positions(&self) -> RegionIter<D> {
        RegionIter::new(self.clone())
    }
}

impl<const N: usize> Region<Fix<N>> {
    /// Open region spanning a whole, not yet known, extent
    pub fn whole() -> Self {
        Self {
            front: Position::<Fix<N>>::zero(),
            back: Position::<Fix<N>>::max(),
        }
    }
}

impl Region<Dyn> {
    /// Open region of given arity spanning a whole, not yet known, extent
    pub fn whole(dimension: usize) -> Self {
        Self {
            front: Position::<Dyn>::zero(dimension),
            back: Position::<Dyn>::max(dimension),
        }
    }
}

impl<'a, D: Dimension> IntoIterator for &'a Region<D> {
    type Item = Position<D>;
    type IntoIter = RegionIter<D>;

    fn into_iter(self) -> RegionIter<D> {
        self.positions()
    }
}

/// Lazy iterator over the positions of a region, first axis fastest
#[derive(Debug, Clone)]
pub struct RegionIter<D: Dimension> {
    region: Region<D>,
    current: Option<Position<D>>,
}

impl<D: Dimension> RegionIter<D> {
    fn new(region: Region<D>) -> Self {
        let empty = region.dimension() == 0
            || region
                .front
                .as_slice()
                .iter()
                .zip(region.back.as_slice())
                .any(|(f, b)| f > b);
        let current = if empty {
            None
        } else {
            Some(region.front.clone())
        };
        Self { region, current }
    }
}

impl<D: Dimension> Iterator for RegionIter<D> {
    type Item = Position<D>;

    fn next(&mut self) -> Option<Position<D>> {
        let current = self.current.take()?;
        let mut next = current.clone();
        let mut axis = 0;
        loop {
            next[axis] += 1;
            if next[axis] <= self.region.back[axis] {
                self.current = Some(next);
                break;
            }
            next[axis] = self.region.front[axis];
            axis += 1;
            if axis == self.region.dimension() {
                break;
            }
        }
        Some(current)
    }
}

/// Inclusive 1-D index range, the row-wise counterpart of [`Region`].
///
/// Storage-facing segments are 1-based, following the container-file
/// convention; see [`crate::transfer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// First index of the range
    pub front: i64,
    /// Last index of the range, inclusive
    pub back: i64,
}

impl Segment {
    /// Create a segment from its first and last indices
    pub fn new(front: i64, back: i64) -> Self {
        Self { front, back }
    }

    /// Create a segment from its first index and size
    pub fn from_size(front: i64, size: i64) -> Self {
        Self {
            front,
            back: front + size - 1,
        }
    }

    /// Number of indices in the segment
    pub fn size(&self) -> i64 {
        self.back - self.front + 1
    }
}
