//! From/to rainflow matrix.

/// Cycle weight type, in units of [`HALF_CYCLE_INCREMENT`].
pub type Counts = u64;

/// Weight of one full closed cycle.
pub const FULL_CYCLE_INCREMENT: Counts = 2;
/// Weight of a half cycle. Reserved; every counted cycle is currently full.
pub const HALF_CYCLE_INCREMENT: Counts = 1;

/// Square matrix of accumulated cycle weights, row = from-class,
/// column = to-class, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RainflowMatrix {
    class_count: u32,
    cells: Vec<Counts>,
}

impl RainflowMatrix {
    /// Wraps a zero-filled buffer of `class_count²` cells.
    pub(crate) fn from_buffer(class_count: u32, cells: Vec<Counts>) -> Self {
        debug_assert_eq!(cells.len(), (class_count as usize).pow(2));
        RainflowMatrix { class_count, cells }
    }

    pub(crate) fn into_buffer(self) -> Vec<Counts> {
        self.cells
    }

    pub fn class_count(&self) -> u32 {
        self.class_count
    }

    fn index(&self, from: u32, to: u32) -> usize {
        self.class_count as usize * from as usize + to as usize
    }

    /// Weight accumulated in cell (`from`, `to`).
    ///
    /// # Panics
    ///
    /// If either class is not below `class_count`.
    pub fn get(&self, from: u32, to: u32) -> Counts {
        assert!(from < self.class_count && to < self.class_count);
        self.cells[self.index(from, to)]
    }

    pub(crate) fn add(&mut self, from: u32, to: u32, increment: Counts) {
        let idx = self.index(from, to);
        self.cells[idx] = self.cells[idx].saturating_add(increment);
    }

    /// Total weight over all cells.
    pub fn total(&self) -> Counts {
        self.cells.iter().sum()
    }

    /// Row-major view of all cells.
    pub fn as_slice(&self) -> &[Counts] {
        &self.cells
    }

    /// Non-empty cells as `(from, to, weight)`, row by row.
    pub fn nonzero(&self) -> impl Iterator<Item = (u32, u32, Counts)> + '_ {
        let n = self.class_count;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, w)| **w > 0)
            .map(move |(i, &w)| ((i / n as usize) as u32, (i % n as usize) as u32, w))
    }

    /// Cells divided by `unit`, in column-major order.
    pub fn to_column_major(&self, unit: Counts) -> Vec<f64> {
        let n = self.class_count;
        let mut out = Vec::with_capacity(self.cells.len());
        for to in 0..n {
            for from in 0..n {
                out.push(self.get(from, to) as f64 / unit as f64);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(n: u32) -> RainflowMatrix {
        RainflowMatrix::from_buffer(n, vec![0; (n * n) as usize])
    }

    #[test]
    fn test_add_keeps_direction() {
        let mut m = matrix(3);
        m.add(2, 1, FULL_CYCLE_INCREMENT);
        m.add(2, 1, FULL_CYCLE_INCREMENT);
        m.add(1, 2, FULL_CYCLE_INCREMENT);
        assert_eq!(m.get(2, 1), 2 * FULL_CYCLE_INCREMENT);
        assert_eq!(m.get(1, 2), FULL_CYCLE_INCREMENT);
        assert_eq!(m.total(), 3 * FULL_CYCLE_INCREMENT);
        assert_eq!(m.as_slice()[7], 2 * FULL_CYCLE_INCREMENT);
    }

    #[test]
    fn test_nonzero_cells() {
        let mut m = matrix(4);
        m.add(0, 3, 2);
        m.add(3, 0, 4);
        let cells: Vec<_> = m.nonzero().collect();
        assert_eq!(cells, vec![(0, 3, 2), (3, 0, 4)]);
    }

    #[test]
    fn test_column_major() {
        let mut m = matrix(2);
        m.add(0, 1, 2);
        assert_eq!(m.to_column_major(2), vec![0.0, 0.0, 1.0, 0.0]);
    }
}
