//! Residue: turning points not yet resolved into closed cycles.

use crate::error::{Error, Result};
use crate::sample::Sample;

/// Capacity of the embedded buffer. Two points define a slope, a third one
/// is needed before a four-point test can be set up.
pub const RESIDUE_INLINE_CAPACITY: usize = 3;

/// Residue capacity reserved for `class_count` classes.
///
/// This is not an upper bound on the residue for arbitrary values: the
/// four-point test compares values, not classes, so a converging series can
/// hold more turning points than this and then fails with `ResidueOverflow`.
pub fn residue_capacity(class_count: u32) -> usize {
    (2 * class_count as usize).max(RESIDUE_INLINE_CAPACITY)
}

/// Backing store, chosen once when the counter is initialized.
#[derive(Debug, Clone)]
pub(crate) enum ResidueStorage {
    Inline {
        items: [Sample; RESIDUE_INLINE_CAPACITY],
        len: usize,
    },
    Owned(Vec<Sample>),
}

/// Ordered confirmed turning points plus the trailing interim point.
///
/// The interim point is the most recent extreme; it may still be replaced by
/// a later sample continuing the same slope, so it is kept apart from the
/// confirmed entries and does not count towards [`len`](Residue::len).
#[derive(Debug, Clone)]
pub struct Residue {
    storage: ResidueStorage,
    capacity: usize,
    interim: Option<Sample>,
}

impl Residue {
    pub(crate) fn inline() -> Self {
        Residue {
            storage: ResidueStorage::Inline {
                items: [Sample::default(); RESIDUE_INLINE_CAPACITY],
                len: 0,
            },
            capacity: RESIDUE_INLINE_CAPACITY,
            interim: None,
        }
    }

    /// Residue over an acquired buffer. The buffer is cleared first.
    pub(crate) fn owned(mut buffer: Vec<Sample>, capacity: usize) -> Self {
        buffer.clear();
        Residue {
            storage: ResidueStorage::Owned(buffer),
            capacity,
            interim: None,
        }
    }

    /// Gives the acquired buffer back, `None` for inline storage.
    pub(crate) fn into_buffer(self) -> Option<Vec<Sample>> {
        match self.storage {
            ResidueStorage::Inline { .. } => None,
            ResidueStorage::Owned(buffer) => Some(buffer),
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.storage, ResidueStorage::Inline { .. })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of confirmed turning points.
    pub fn len(&self) -> usize {
        match &self.storage {
            ResidueStorage::Inline { len, .. } => *len,
            ResidueStorage::Owned(buffer) => buffer.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[Sample] {
        match &self.storage {
            ResidueStorage::Inline { items, len } => &items[..*len],
            ResidueStorage::Owned(buffer) => buffer,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.as_slice().iter()
    }

    pub fn interim(&self) -> Option<&Sample> {
        self.interim.as_ref()
    }

    pub(crate) fn set_interim(&mut self, sample: Sample) {
        self.interim = Some(sample);
    }

    /// Appends a confirmed turning point.
    ///
    /// # Errors
    ///
    /// `ResidueOverflow` if the residue already holds `capacity` points.
    pub(crate) fn push(&mut self, sample: Sample) -> Result<()> {
        if self.len() >= self.capacity {
            return Err(Error::ResidueOverflow { capacity: self.capacity });
        }
        match &mut self.storage {
            ResidueStorage::Inline { items, len } => {
                items[*len] = sample;
                *len += 1;
            }
            ResidueStorage::Owned(buffer) => buffer.push(sample),
        }
        Ok(())
    }

    /// Moves the interim point into the confirmed entries.
    /// Returns whether there was one.
    pub(crate) fn promote_interim(&mut self) -> Result<bool> {
        match self.interim {
            Some(sample) => {
                self.push(sample)?;
                self.interim = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes `count` confirmed points starting at `index`; later points
    /// move down.
    pub(crate) fn remove(&mut self, index: usize, count: usize) {
        let end = index + count;
        assert!(end <= self.len(), "residue removal out of range");
        match &mut self.storage {
            ResidueStorage::Inline { items, len } => {
                items.copy_within(end..*len, index);
                *len -= count;
            }
            ResidueStorage::Owned(buffer) => {
                buffer.drain(index..end);
            }
        }
    }

    /// Drops all confirmed points and the interim point.
    pub(crate) fn clear(&mut self) {
        match &mut self.storage {
            ResidueStorage::Inline { len, .. } => *len = 0,
            ResidueStorage::Owned(buffer) => buffer.clear(),
        }
        self.interim = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(value: f64, pos: u64) -> Sample {
        Sample::new(value, 0, pos)
    }

    fn values(residue: &Residue) -> Vec<f64> {
        residue.iter().map(|s| s.value).collect()
    }

    #[test]
    fn test_capacity() {
        assert_eq!(residue_capacity(0), 3);
        assert_eq!(residue_capacity(1), 3);
        assert_eq!(residue_capacity(2), 4);
        assert_eq!(residue_capacity(100), 200);
    }

    #[test]
    fn test_inline_push_and_overflow() {
        let mut residue = Residue::inline();
        assert!(residue.is_inline());
        for i in 1..=3 {
            residue.push(pt(i as f64, i)).unwrap();
        }
        assert_eq!(
            residue.push(pt(4.0, 4)),
            Err(Error::ResidueOverflow { capacity: 3 })
        );
        assert_eq!(values(&residue), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_remove_shifts_tail() {
        for mut residue in [Residue::inline(), Residue::owned(Vec::new(), 3)] {
            residue.push(pt(1.0, 1)).unwrap();
            residue.push(pt(2.0, 2)).unwrap();
            residue.push(pt(3.0, 3)).unwrap();
            residue.remove(0, 1);
            assert_eq!(values(&residue), vec![2.0, 3.0]);
            residue.remove(0, 2);
            assert!(residue.is_empty());
        }
    }

    #[test]
    fn test_promote_interim() {
        let mut residue = Residue::owned(Vec::with_capacity(4), 4);
        assert!(!residue.promote_interim().unwrap());
        residue.push(pt(1.0, 1)).unwrap();
        residue.set_interim(pt(5.0, 2));
        assert_eq!(residue.len(), 1);
        assert!(residue.promote_interim().unwrap());
        assert!(residue.interim().is_none());
        assert_eq!(values(&residue), vec![1.0, 5.0]);
        residue.clear();
        assert!(residue.is_empty());
        assert_eq!(residue.into_buffer().map(|b| b.len()), Some(0));
    }
}
