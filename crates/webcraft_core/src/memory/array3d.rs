//! # Dense 3D Grid
//!
//! Linear storage of `u16` cells. The linear index is
//! `x + z * sx + y * sx * sz`: X varies fastest, then Z, then Y.
//! Chunk meshing relies on this exact order.

use crate::error::{CoreError, CoreResult};

/// A dense 3D grid of 16-bit cells.
///
/// The hot-path accessors only `debug_assert!` their bounds; use
/// [`Array3D::try_get`] / [`Array3D::try_set`] at API boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Array3D {
    data: Box<[u16]>,
    sx: usize,
    sy: usize,
    sz: usize,
}

impl Array3D {
    /// Creates a zeroed grid of `sx * sy * sz` cells.
    ///
    /// Note: This allocates. Only call during setup, never per mesh pass.
    #[must_use]
    pub fn new(sx: usize, sy: usize, sz: usize) -> Self {
        Self {
            data: vec![0u16; sx * sy * sz].into_boxed_slice(),
            sx,
            sy,
            sz,
        }
    }

    /// Creates a zeroed cube with side `size`.
    #[must_use]
    pub fn cube(size: usize) -> Self {
        Self::new(size, size, size)
    }

    /// Grid dimensions `(sx, sy, sz)`.
    #[inline]
    #[must_use]
    pub const fn dims(&self) -> (usize, usize, usize) {
        (self.sx, self.sy, self.sz)
    }

    /// Total number of cells.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the grid has no cells.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if `(x, y, z)` lies inside the grid.
    #[inline]
    #[must_use]
    pub const fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.sx && y < self.sy && z < self.sz
    }

    /// Linear index of `(x, y, z)`.
    #[inline]
    #[must_use]
    pub const fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.sx);
        debug_assert!(y < self.sy);
        debug_assert!(z < self.sz);
        x + z * self.sx + y * self.sx * self.sz
    }

    /// Reads a cell.
    ///
    /// # Panics
    /// Panics if coordinates are out of bounds (debug builds, or when the
    /// linear index leaves the buffer).
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize, z: usize) -> u16 {
        self.data[self.index(x, y, z)]
    }

    /// Writes a cell.
    ///
    /// # Panics
    /// Panics if coordinates are out of bounds (debug builds, or when the
    /// linear index leaves the buffer).
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: u16) {
        let idx = self.index(x, y, z);
        self.data[idx] = value;
    }

    /// Reads a cell, or `None` if out of bounds.
    #[inline]
    #[must_use]
    pub fn try_get(&self, x: usize, y: usize, z: usize) -> Option<u16> {
        if self.contains(x, y, z) {
            Some(self.data[self.index(x, y, z)])
        } else {
            None
        }
    }

    /// Writes a cell.
    ///
    /// # Errors
    /// Returns [`CoreError::OutOfBounds`] if the coordinate is outside the grid.
    pub fn try_set(&mut self, x: usize, y: usize, z: usize, value: u16) -> CoreResult<()> {
        if !self.contains(x, y, z) {
            return Err(CoreError::OutOfBounds {
                x,
                y,
                z,
                sx: self.sx,
                sy: self.sy,
                sz: self.sz,
            });
        }
        self.set(x, y, z, value);
        Ok(())
    }

    /// Sets every cell to `value`.
    #[inline]
    pub fn fill(&mut self, value: u16) {
        self.data.fill(value);
    }

    /// Raw cells in linear order.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u16] {
        &self.data
    }

    /// Raw cells in linear order, mutable.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u16] {
        &mut self.data
    }

    /// Converts a linear index back to `(x, y, z)`.
    #[inline]
    #[must_use]
    pub const fn coords(&self, index: usize) -> (usize, usize, usize) {
        let plane = self.sx * self.sz;
        let y = index / plane;
        let rem = index % plane;
        (rem % self.sx, y, rem / self.sx)
    }
}
