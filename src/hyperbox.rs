//! Hyperbox: an N-dimensional grid of candidate FileStates
//!
//! Candidates are packed into a grid so that a whole slice (every leaf sharing one
//! coordinate on one axis) can be tested and discarded at once. Each slice also
//! remembers how long its last failing test took; the fastest failures point at the
//! leaves most likely to hold the culprit.
//!
//! Leaves are stored flat in raster order with axis 0 varying fastest.

use crate::state::FileState;
use std::time::Duration;

/// Grid of FileState leaves with per-slice timing history
#[derive(Debug, Clone)]
pub struct Hyperbox {
    dimensions: Vec<usize>,
    durations: Vec<Vec<Option<Duration>>>,
    cells: Vec<FileState>,
}

impl Hyperbox {
    /// Create an empty box; `dimensions` must be non-empty with every size at least 1
    pub fn new(dimensions: Vec<usize>) -> Self {
        assert!(!dimensions.is_empty(), "hyperbox dimensions must be nonempty");
        assert!(
            dimensions.iter().all(|&size| size >= 1),
            "illegal hyperbox dimensions {:?}",
            dimensions
        );
        let durations = dimensions.iter().map(|&size| vec![None; size]).collect();
        let total = dimensions.iter().product();
        Self {
            dimensions,
            durations,
            cells: vec![FileState::new(); total],
        }
    }

    pub fn num_dimensions(&self) -> usize {
        self.dimensions.len()
    }

    pub fn size(&self, dimension: usize) -> usize {
        self.dimensions[dimension]
    }

    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    pub fn slice_duration(&self, dimension: usize, index: usize) -> Option<Duration> {
        self.durations[dimension][index]
    }

    pub fn set_slice_duration(&mut self, dimension: usize, index: usize, value: Option<Duration>) {
        self.durations[dimension][index] = value;
    }

    /// Drop one slice, shrinking its axis by one
    pub fn remove_slice(&mut self, dimension: usize, index: usize) {
        let dimensions = self.dimensions.clone();
        let cells = std::mem::take(&mut self.cells);
        self.cells = cells
            .into_iter()
            .enumerate()
            .filter(|(flat, _)| coordinate_of(&dimensions, *flat, dimension) != index)
            .map(|(_, cell)| cell)
            .collect();
        self.durations[dimension].remove(index);
        self.dimensions[dimension] -= 1;
    }

    /// Index along `dimension` whose last failure was quickest (first wins ties)
    pub fn fastest_index(&self, dimension: usize) -> Option<usize> {
        let mut fastest: Option<(usize, Duration)> = None;
        for (index, value) in self.durations[dimension].iter().enumerate() {
            if let Some(value) = value {
                if fastest.map_or(true, |(_, best)| *value < best) {
                    fastest = Some((index, *value));
                }
            }
        }
        fastest.map(|(index, _)| index)
    }

    /// Fastest index on every axis, or `None` if some axis has no recorded durations
    pub fn fastest_indices(&self) -> Option<Vec<usize>> {
        (0..self.num_dimensions())
            .map(|dimension| self.fastest_index(dimension))
            .collect()
    }

    pub fn files(&self, coordinates: &[usize]) -> &FileState {
        &self.cells[self.flat_index(coordinates)]
    }

    pub fn set_files(&mut self, coordinates: &[usize], files: FileState) {
        let flat = self.flat_index(coordinates);
        self.cells[flat] = files;
    }

    pub fn clear_files(&mut self, coordinates: &[usize]) {
        self.set_files(coordinates, FileState::new());
    }

    /// Union of every leaf whose coordinate on `dimension` is `index`
    pub fn slice(&self, dimension: usize, index: usize) -> FileState {
        self.cells
            .iter()
            .enumerate()
            .filter(|(flat, _)| coordinate_of(&self.dimensions, *flat, dimension) == index)
            .fold(FileState::new(), |acc, (_, cell)| acc.merged_with(cell))
    }

    /// All non-empty leaves in raster order
    pub fn children(&self) -> Vec<FileState> {
        self.cells.iter().filter(|c| !c.is_empty()).cloned().collect()
    }

    pub fn into_children(self) -> Vec<FileState> {
        self.cells.into_iter().filter(|c| !c.is_empty()).collect()
    }

    pub fn num_children(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    pub fn num_files(&self) -> usize {
        self.cells.iter().map(FileState::size).sum()
    }

    /// Next coordinates in raster order, or `None` after the last cell
    pub fn increment_coordinates(&self, coordinates: &[usize]) -> Option<Vec<usize>> {
        let mut next = coordinates.to_vec();
        for (axis, value) in next.iter_mut().enumerate() {
            *value += 1;
            if *value >= self.dimensions[axis] {
                *value = 0;
            } else {
                return Some(next);
            }
        }
        None
    }

    fn flat_index(&self, coordinates: &[usize]) -> usize {
        debug_assert_eq!(coordinates.len(), self.dimensions.len());
        let mut flat = 0;
        let mut stride = 1;
        for (coordinate, size) in coordinates.iter().zip(&self.dimensions) {
            flat += coordinate * stride;
            stride *= size;
        }
        flat
    }
}

fn coordinate_of(dimensions: &[usize], flat: usize, dimension: usize) -> usize {
    let stride: usize = dimensions[..dimension].iter().product();
    (flat / stride) % dimensions[dimension]
}

/// Choose box dimensions for `count` candidates: axes of 3 (2x2 for exactly 4)
pub fn dimensions_for(count: usize) -> Vec<usize> {
    if count <= 1 {
        return vec![1];
    }
    let mut remaining = count;
    let mut dimensions = Vec::new();
    while remaining > 1 {
        let next = if remaining == 4 { 2 } else { remaining.min(3) };
        dimensions.push(next);
        remaining = remaining.div_ceil(next);
    }
    dimensions
}

/// Pack candidate states into a box in raster order
pub fn box_from_list(states: Vec<FileState>) -> Hyperbox {
    let mut hyperbox = Hyperbox::new(dimensions_for(states.len()));
    for (flat, state) in states.into_iter().enumerate() {
        hyperbox.cells[flat] = state;
    }
    hyperbox
}
