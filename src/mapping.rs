//! File-frame / memory-frame region mapping for partial transfers

use crate::error::{FitsError, Result};
use crate::position::{Dimension, Dyn, Position};
use crate::region::Region;

/// Mapping between an in-file region and an in-memory region for reading and
/// writing data unit regions.
///
/// Both regions have the same shape once resolved. Either side's `back` may
/// carry [`crate::position::MAX_COORD`] components, meaning "extend to the actual last index
/// along that axis"; [`FileMemRegions::resolve`] fills them in from the
/// extents of the collaborating sides, translating the other side so the
/// shapes stay equal. The ambiguous configuration, both backs unbounded
/// along the same axis, is rejected at construction: the positional
/// factories cannot produce it, and [`FileMemRegions::new`] checks for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMemRegions<D: Dimension = Dyn> {
    file: Region<D>,
    memory: Region<D>,
}

impl<D: Dimension> FileMemRegions<D> {
    /// Create a mapping from explicit in-file and in-memory regions.
    ///
    /// Fails with [`FitsError::Dimension`] when the regions disagree on
    /// dimension or both backs are unbounded along the same axis, and with
    /// [`FitsError::ShapeMismatch`] when a fully bounded axis has different
    /// extents on the two sides.
    pub fn new(file: Region<D>, memory: Region<D>) -> Result<Self> {
        if file.dimension() != memory.dimension() {
            return Err(FitsError::Dimension(format!(
                "File region is {}-D but memory region is {}-D",
                file.dimension(),
                memory.dimension()
            )));
        }
        for axis in 0..file.dimension() {
            let file_open = file.back.is_max_at(axis);
            let memory_open = memory.back.is_max_at(axis);
            if file_open && memory_open {
                return Err(FitsError::Dimension(format!(
                    "File and memory backs are both unbounded along axis {}",
                    axis
                )));
            }
            if !file_open
                && !memory_open
                && file.back[axis] - file.front[axis] != memory.back[axis] - memory.front[axis]
            {
                return Err(FitsError::ShapeMismatch(format!(
                    "File and memory extents differ along axis {}: {} vs {}",
                    axis,
                    file.back[axis] - file.front[axis] + 1,
                    memory.back[axis] - memory.front[axis] + 1
                )));
            }
        }
        Ok(Self { file, memory })
    }

    /// Create a mapping from an in-file region and an in-memory position.
    ///
    /// The memory region takes the file region's shape; axes with an
    /// unbounded file back stay to be resolved.
    pub fn from_file_region(file: Region<D>, memory_position: Position<D>) -> Self {
        let mut memory_back = memory_position.clone();
        for axis in 0..file.dimension() {
            if !file.back.is_max_at(axis) {
                memory_back[axis] += file.back[axis] - file.front[axis];
            }
        }
        Self {
            file,
            memory: Region::new(memory_position, memory_back),
        }
    }

    /// Create a mapping from an in-file position and an in-memory region.
    ///
    /// The file region takes the memory region's shape; axes with an
    /// unbounded memory back stay to be resolved.
    pub fn from_memory_region(file_position: Position<D>, memory: Region<D>) -> Self {
        let mut file_back = file_position.clone();
        for axis in 0..memory.dimension() {
            if !memory.back.is_max_at(axis) {
                file_back[axis] += memory.back[axis] - memory.front[axis];
            }
        }
        Self {
            file: Region::new(file_position, file_back),
            memory,
        }
    }

    /// Create a mapping with the in-file region at the origin
    pub fn at_file_origin(memory: Region<D>) -> Self {
        let origin = Position::zeroed(memory.dimension());
        Self::from_memory_region(origin, memory)
    }

    /// Create a mapping with the in-memory region at the origin
    pub fn at_memory_origin(file: Region<D>) -> Self {
        let origin = Position::zeroed(file.dimension());
        Self::from_file_region(file, origin)
    }

    /// The in-file region
    pub fn file(&self) -> &Region<D> {
        &self.file
    }

    /// The in-memory region
    pub fn memory(&self) -> &Region<D> {
        &self.memory
    }

    /// Fill in unbounded backs from the actual last valid positions.
    ///
    /// For each axis with an unbounded file back, the back is set from
    /// `file_last` and the memory back derived through the translation
    /// vector; symmetrically for unbounded memory backs from `memory_last`.
    /// Afterwards `file().shape() == memory().shape()`. Idempotent.
    pub fn resolve(&mut self, file_last: &Position<D>, memory_last: &Position<D>) {
        let translation = self.file_to_memory();
        for axis in 0..self.file.dimension() {
            if self.file.back.is_max_at(axis) {
                self.file.back[axis] = file_last[axis];
                self.memory.back[axis] = self.file.back[axis] + translation[axis];
            } else if self.memory.back.is_max_at(axis) {
                self.memory.back[axis] = memory_last[axis];
                self.file.back[axis] = self.memory.back[axis] - translation[axis];
            }
        }
    }

    /// Check whether any axis still carries an unbounded back
    pub fn is_resolved(&self) -> bool {
        !self.file.back.has_max() && !self.memory.back.has_max()
    }

    /// The per-axis translation vector from in-file to in-memory coordinates
    pub fn file_to_memory(&self) -> Position<D> {
        self.memory.front.clone() - self.file.front.clone()
    }

    /// The per-axis translation vector from in-memory to in-file coordinates
    pub fn memory_to_file(&self) -> Position<D> {
        self.file.front.clone() - self.memory.front.clone()
    }
}
