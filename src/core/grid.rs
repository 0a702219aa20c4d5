use crate::core::error::{CompareError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Index;

/// A fixed-shape 2D grid stored row-major (`cells[y * width + x]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    try_from = "GridRepr<T>",
    bound(deserialize = "T: Copy + Deserialize<'de>")
)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

/// Unchecked wire form; every deserialized grid passes through `from_cells`.
#[derive(Deserialize)]
struct GridRepr<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Copy> TryFrom<GridRepr<T>> for Grid<T> {
    type Error = CompareError;

    fn try_from(repr: GridRepr<T>) -> Result<Self> {
        Self::from_cells(repr.width, repr.height, repr.cells)
    }
}

impl<T: Copy> Grid<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width * height],
        }
    }

    /// Build a grid by evaluating `f(x, y)` for every cell in row-major order.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn from_cells(width: usize, height: usize, cells: Vec<T>) -> Result<Self> {
        if cells.len() != width * height {
            return Err(CompareError::ShapeMismatch {
                expected: (width, height),
                found: (cells.len(), 1),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x < self.width && y < self.height {
            Some(self.cells[y * self.width + x])
        } else {
            None
        }
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.cells.iter().copied()
    }

    /// Iterate `(x, y, value)` in row-major order.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i % width, i / width, v))
    }

    pub fn map<U: Copy>(&self, f: impl FnMut(T) -> U) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().copied().map(f).collect(),
        }
    }

    pub fn ensure_same_shape<U>(&self, other: &Grid<U>) -> Result<()> {
        if self.dimensions() != (other.width, other.height) {
            return Err(CompareError::ShapeMismatch {
                expected: self.dimensions(),
                found: (other.width, other.height),
            });
        }
        Ok(())
    }

    /// Combine two equally shaped grids cell by cell.
    pub fn zip_with<U: Copy, V: Copy>(
        &self,
        other: &Grid<U>,
        mut f: impl FnMut(T, U) -> V,
    ) -> Result<Grid<V>> {
        self.ensure_same_shape(other)?;
        Ok(Grid {
            width: self.width,
            height: self.height,
            cells: self
                .cells
                .iter()
                .zip(other.cells.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }
}

impl<T: Copy + Ord> Grid<T> {
    /// Lexicographic comparison in row-major order: the first unequal cell
    /// decides. Grids of different shapes are rejected.
    pub fn compare(&self, other: &Self) -> Result<Ordering> {
        self.ensure_same_shape(other)?;
        for (a, b) in self.cells.iter().zip(other.cells.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                unequal => return Ok(unequal),
            }
        }
        Ok(Ordering::Equal)
    }

    pub fn max_value(&self) -> Option<T> {
        self.cells.iter().copied().max()
    }
}

/// Comparison where an absent grid contributes nothing: if either side is
/// `None` the result is `Equal`.
///
/// This relation is not transitive, so it must not be used as a sort key.
pub fn compare_optional<T: Copy + Ord>(a: Option<&Grid<T>>, b: Option<&Grid<T>>) -> Result<Ordering> {
    match (a, b) {
        (Some(a), Some(b)) => a.compare(b),
        _ => Ok(Ordering::Equal),
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    fn index(&self, (x, y): (usize, usize)) -> &T {
        assert!(x < self.width && y < self.height, "grid index ({x}, {y}) out of bounds");
        &self.cells[y * self.width + x]
    }
}

/// One bracketed row per line, values right-aligned to three columns.
impl<T: fmt::Display> fmt::Display for Grid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.width.max(1)) {
            write!(f, "[")?;
            for value in row {
                write!(f, "{value:>3},")?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_layout() {
        let grid = Grid::from_fn(3, 2, |x, y| (y * 10 + x) as u8);
        assert_eq!(grid.cells(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(grid[(2, 1)], 12);
        assert_eq!(grid.get(3, 0), None);
    }

    #[test]
    fn test_compare_equal_grids() {
        let a = Grid::filled(16, 16, 42u8);
        let b = Grid::filled(16, 16, 42u8);
        assert_eq!(a.compare(&b).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_compare_first_difference_decides() {
        let a = Grid::from_fn(4, 4, |x, y| if (x, y) == (1, 0) { 5u8 } else { 9 });
        let b = Grid::from_fn(4, 4, |x, y| if (x, y) == (3, 3) { 0u8 } else { 9 });
        // a differs at (1, 0), which comes before (3, 3) in row-major order.
        assert_eq!(a.compare(&b).unwrap(), Ordering::Less);
        assert_eq!(b.compare(&a).unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_compare_rejects_shape_mismatch() {
        let a = Grid::filled(16, 16, 0u8);
        let b = Grid::filled(8, 16, 0u8);
        let err = a.compare(&b).unwrap_err();
        assert!(matches!(
            err,
            CompareError::ShapeMismatch {
                expected: (16, 16),
                found: (8, 16)
            }
        ));
    }

    #[test]
    fn test_compare_optional_absent_side_is_equal() {
        let a = Grid::filled(2, 2, 1u8);
        let b = Grid::filled(2, 2, 200u8);
        assert_eq!(compare_optional(Some(&a), None).unwrap(), Ordering::Equal);
        assert_eq!(compare_optional(None, Some(&b)).unwrap(), Ordering::Equal);
        assert_eq!(compare_optional::<u8>(None, None).unwrap(), Ordering::Equal);
        assert_eq!(compare_optional(Some(&a), Some(&b)).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_from_cells_checks_length() {
        assert!(Grid::from_cells(2, 2, vec![1u8, 2, 3]).is_err());
        assert!(Grid::from_cells(2, 2, vec![1u8, 2, 3, 4]).is_ok());
    }

    #[test]
    fn test_deserialize_checks_cell_count() {
        let short = serde_json::from_str::<Grid<u8>>(r#"{"width":16,"height":16,"cells":[1,2,3]}"#);
        assert!(short.is_err());

        let grid: Grid<u8> =
            serde_json::from_str(r#"{"width":2,"height":2,"cells":[1,2,3,4]}"#).unwrap();
        assert_eq!(grid[(1, 1)], 4);
        assert_eq!(serde_json::from_str::<Grid<u8>>(&serde_json::to_string(&grid).unwrap()).unwrap(), grid);
    }

    #[test]
    fn test_zip_with_and_display() {
        let a = Grid::from_fn(2, 2, |x, _| x as u8 * 100);
        let b = Grid::filled(2, 2, 1u8);
        let sum = a.zip_with(&b, |a, b| a + b).unwrap();
        assert_eq!(sum.to_string(), "[  1,101,]\n[  1,101,]\n");
    }
}
