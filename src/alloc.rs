//! Memory capability used by the counter for its residue and matrix storage.

use serde::Serialize;

use crate::matrix::Counts;
use crate::sample::Sample;

/// What a piece of storage is acquired for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemoryAim {
    Residue,
    Matrix,
}

/// Source of the counter's buffers.
///
/// Every buffer handed out by `acquire_*` is given back exactly once through
/// the matching `release_*` call, when the counter is released or dropped.
/// Returning `None` from an acquisition makes `init` fail with
/// [`Error::AllocationFailure`](crate::Error::AllocationFailure).
pub trait Allocator {
    /// Empty buffer able to hold `capacity` samples without reallocation.
    fn acquire_residue(&self, capacity: usize) -> Option<Vec<Sample>>;

    /// Zero-filled buffer of exactly `cells` counts.
    fn acquire_matrix(&self, cells: usize) -> Option<Vec<Counts>>;

    fn release_residue(&self, buffer: Vec<Sample>) {
        drop(buffer);
    }

    fn release_matrix(&self, buffer: Vec<Counts>) {
        drop(buffer);
    }
}

/// Global-heap allocator; reports failure instead of aborting.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl Allocator for HeapAllocator {
    fn acquire_residue(&self, capacity: usize) -> Option<Vec<Sample>> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(capacity).ok()?;
        Some(buffer)
    }

    fn acquire_matrix(&self, cells: usize) -> Option<Vec<Counts>> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(cells).ok()?;
        buffer.resize(cells, 0);
        Some(buffer)
    }
}

impl<A: Allocator + ?Sized> Allocator for &A {
    fn acquire_residue(&self, capacity: usize) -> Option<Vec<Sample>> {
        (**self).acquire_residue(capacity)
    }

    fn acquire_matrix(&self, cells: usize) -> Option<Vec<Counts>> {
        (**self).acquire_matrix(cells)
    }

    fn release_residue(&self, buffer: Vec<Sample>) {
        (**self).release_residue(buffer)
    }

    fn release_matrix(&self, buffer: Vec<Counts>) {
        (**self).release_matrix(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_allocator() {
        let residue = HeapAllocator.acquire_residue(16).unwrap();
        assert!(residue.is_empty());
        assert!(residue.capacity() >= 16);

        let matrix = HeapAllocator.acquire_matrix(9).unwrap();
        assert_eq!(matrix, vec![0; 9]);
    }
}
