//! Four-point cycle detection on the tail of the residue.
//!
//! ```text
//!                  * D
//!                 / \       Closed, if min(B,C) >= min(A,D) && max(B,C) <= max(A,D)
//!          B *<--/          Slope B-C is counted and removed from residue
//!           / \ /
//!          /   * C
//!       \ /
//!        * A
//! ```

use crate::residue::Residue;
use crate::sample::Sample;

/// Whether the inner range B-C lies within the outer range A-D.
///
/// Only values are compared; the caller's tuples stay untouched.
pub fn is_closed(a: f64, b: f64, c: f64, d: f64) -> bool {
    let (inner_lo, inner_hi) = if b > c { (c, b) } else { (b, c) };
    let (outer_lo, outer_hi) = if a > d { (d, a) } else { (a, d) };
    outer_lo <= inner_lo && inner_hi <= outer_hi
}

/// Extracts closed cycles from the last four confirmed residue points until
/// the test fails or fewer than four points remain.
///
/// `on_cycle` receives the original `from` (B) and `to` (C) points of every
/// closed cycle before both are removed from the residue. Returns the number
/// of cycles found.
pub fn find_cycles<F>(residue: &mut Residue, mut on_cycle: F) -> usize
where
    F: FnMut(&Sample, &Sample),
{
    let mut found = 0;
    while residue.len() >= 4 {
        let idx = residue.len() - 4;
        let (from, to) = {
            let tail = &residue.as_slice()[idx..];
            if !is_closed(tail[0].value, tail[1].value, tail[2].value, tail[3].value) {
                break;
            }
            (tail[1], tail[2])
        };
        on_cycle(&from, &to);
        residue.remove(idx + 1, 2);
        found += 1;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residue_of(values: &[f64]) -> Residue {
        let mut residue = Residue::owned(Vec::new(), 16);
        for (i, &v) in values.iter().enumerate() {
            residue.push(Sample::new(v, 0, i as u64 + 1)).unwrap();
        }
        residue
    }

    #[test]
    fn test_closure_condition() {
        assert!(is_closed(1.0, 3.0, 2.0, 4.0));
        assert!(is_closed(4.0, 2.0, 3.0, 1.0));
        // Equal extremes still close
        assert!(is_closed(1.0, 4.0, 1.0, 4.0));
        assert!(!is_closed(2.0, 3.0, 1.0, 4.0));
        assert!(!is_closed(1.0, 4.0, 2.0, 3.0));
    }

    #[test]
    fn test_single_cycle_keeps_outer_points() {
        let mut residue = residue_of(&[1.0, 3.0, 2.0, 4.0]);
        let mut cycles = Vec::new();
        let n = find_cycles(&mut residue, |from, to| cycles.push((from.pos, to.pos)));
        assert_eq!(n, 1);
        assert_eq!(cycles, vec![(2, 3)]);
        let kept: Vec<u64> = residue.iter().map(|s| s.pos).collect();
        assert_eq!(kept, vec![1, 4]);
    }

    #[test]
    fn test_cascading_closures() {
        // Converging residue, nothing closes yet
        let mut residue = residue_of(&[0.0, 6.0, 1.0, 5.0, 2.0, 4.0]);
        assert_eq!(find_cycles(&mut residue, |_, _| {}), 0);

        // A deep valley closes 2-4, then 1-5
        residue.push(Sample::new(-1.0, 0, 7)).unwrap();
        let mut cycles = Vec::new();
        let n = find_cycles(&mut residue, |from, to| cycles.push((from.value, to.value)));
        assert_eq!(n, 2);
        assert_eq!(cycles, vec![(2.0, 4.0), (1.0, 5.0)]);
        let values: Vec<f64> = residue.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![0.0, 6.0, -1.0]);
    }

    #[test]
    fn test_no_scan_below_four_points() {
        let mut residue = residue_of(&[1.0, 3.0, 2.0]);
        assert_eq!(find_cycles(&mut residue, |_, _| panic!("no cycle expected")), 0);
        assert_eq!(residue.len(), 3);
    }
}
