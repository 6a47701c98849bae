// eval/grid.rs - grid containers shared by every stage
//
// Three grids flow through a pass:
//   CoarseGrid  (R+1)×(R+1) value points at the heatmap's resolution
//   ValueMap    resampled scalar per target cell, for one sub-rectangle
//   WeightMap   per-layer blend weights per target cell
//
// All of them are x-major: a "row" is one x index, and rows are the unit of
// parallel work and of cancellation checks.

use crate::schema::{Rect, Vec3};
use serde::Serialize;

/// One coarse-grid cell.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ValuePoint {
    pub value: f32,
    /// Position of the cell on the target grid.
    pub coord: (u32, u32),
    /// World position the cell was derived from.
    pub world: Vec3,
}

/// The heatmap's low-resolution scalar field.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CoarseGrid {
    /// Heatmap resolution R. `cells.len() == (R+1)²`.
    pub resolution: u32,
    pub cells: Vec<ValuePoint>,
}

impl CoarseGrid {
    /// Build a grid by evaluating `f(x, y)` for every cell.
    pub fn from_fn(resolution: u32, mut f: impl FnMut(u32, u32) -> ValuePoint) -> Self {
        let side = resolution as usize + 1;
        let mut cells = Vec::with_capacity(side * side);
        for x in 0..=resolution {
            for y in 0..=resolution {
                cells.push(f(x, y));
            }
        }
        Self { resolution, cells }
    }

    /// Cells per side, R+1.
    #[inline]
    pub fn side(&self) -> u32 {
        self.resolution + 1
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        x as usize * self.side() as usize + y as usize
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        let r = self.resolution as i64;
        (0..=r).contains(&x) && (0..=r).contains(&y)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> &ValuePoint {
        &self.cells[self.index(x, y)]
    }

    #[inline]
    pub fn get_mut(&mut self, x: u32, y: u32) -> &mut ValuePoint {
        let idx = self.index(x, y);
        &mut self.cells[idx]
    }

    #[inline]
    pub fn value(&self, x: u32, y: u32) -> f32 {
        self.get(x, y).value
    }

    /// (min, max) over every cell.
    pub fn extrema(&self) -> (f32, f32) {
        self.cells
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| {
                (lo.min(p.value), hi.max(p.value))
            })
    }
}

/// Resampled values for one sub-rectangle of the target grid.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValueMap {
    pub rect: Rect,
    /// x-major, `rect.width × rect.height`.
    pub values: Vec<f32>,
}

impl ValueMap {
    pub fn zeroed(rect: Rect) -> Self {
        Self {
            rect,
            values: vec![0.0; rect.area()],
        }
    }

    /// Value at absolute target coordinates.
    #[inline]
    pub fn get(&self, i: u32, j: u32) -> f32 {
        let lx = (i - self.rect.x) as usize;
        let ly = (j - self.rect.y) as usize;
        self.values[lx * self.rect.height as usize + ly]
    }
}

/// Dense per-layer weights. Cell (x, y) owns `layers` consecutive floats.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeightMap {
    pub width: u32,
    pub height: u32,
    pub layers: usize,
    pub data: Vec<f32>,
}

impl WeightMap {
    pub fn new(width: u32, height: u32, layers: usize) -> Self {
        Self {
            width,
            height,
            layers,
            data: vec![0.0; width as usize * height as usize * layers],
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (x as usize * self.height as usize + y as usize) * self.layers
    }

    /// All layer weights of cell (x, y).
    #[inline]
    pub fn cell(&self, x: u32, y: u32) -> &[f32] {
        let o = self.offset(x, y);
        &self.data[o..o + self.layers]
    }

    #[inline]
    pub fn cell_mut(&mut self, x: u32, y: u32) -> &mut [f32] {
        let o = self.offset(x, y);
        let n = self.layers;
        &mut self.data[o..o + n]
    }

    /// Floats per x row.
    #[inline]
    pub fn row_len(&self) -> usize {
        self.height as usize * self.layers
    }

    /// Copy out `rect` with all layers.
    pub fn extract(&self, rect: Rect) -> Option<WeightMap> {
        if !rect.fits_within(self.width, self.height) {
            return None;
        }
        let mut chunk = WeightMap::new(rect.width, rect.height, self.layers);
        let span = rect.height as usize * self.layers;
        for lx in 0..rect.width {
            let src = self.offset(rect.x + lx, rect.y);
            let dst = chunk.offset(lx, 0);
            chunk.data[dst..dst + span].copy_from_slice(&self.data[src..src + span]);
        }
        Some(chunk)
    }

    /// Paste `chunk` with its origin at (x, y). Returns false, writing
    /// nothing, when the chunk does not fit or its layer count differs.
    pub fn write_chunk(&mut self, x: u32, y: u32, chunk: &WeightMap) -> bool {
        let placed = Rect::new(x, y, chunk.width, chunk.height);
        if chunk.layers != self.layers || !placed.fits_within(self.width, self.height) {
            return false;
        }
        let span = chunk.height as usize * self.layers;
        for lx in 0..chunk.width {
            let src = chunk.offset(lx, 0);
            let dst = self.offset(x + lx, y);
            self.data[dst..dst + span].copy_from_slice(&chunk.data[src..src + span]);
        }
        true
    }
}
