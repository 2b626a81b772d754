//! SCIM pagination (RFC 7644 Section 3.4.2.4).
//!
//! `startIndex` is 1-based and `count` is the maximum page size. Out-of-range
//! values are clamped rather than rejected: `startIndex < 1` is treated as 1 and
//! a negative `count` as 0.

use crate::models::LimitOffset;

/// A page of a result set, as a 0-based offset and a length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

impl Window {
    /// 1-based index of the first item in the window.
    pub fn start_index(&self) -> usize {
        self.offset + 1
    }

    /// Slice `items` down to this window.
    ///
    /// `items` must be the full result set the window was computed for.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect()
    }

    /// The same window expressed as store pagination.
    pub fn to_limit_offset(&self) -> LimitOffset {
        LimitOffset {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Compute the window for a result set of `total` items.
///
/// `limit = max(0, min(count, total - offset))`. A missing `count` means
/// "everything from `start_index` on".
pub fn window(total: usize, start_index: Option<i64>, count: Option<i64>) -> Window {
    let start_index = start_index.unwrap_or(1).max(1);
    let offset = usize::try_from(start_index - 1).unwrap_or(usize::MAX);
    let remaining = total.saturating_sub(offset);
    let limit = match count {
        Some(count) => usize::try_from(count.max(0))
            .unwrap_or(usize::MAX)
            .min(remaining),
        None => remaining,
    };
    Window { offset, limit }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::defaults(4, None, None, 0, 4)]
    #[case::count_zero(4, None, Some(0), 0, 0)]
    #[case::count_two(4, None, Some(2), 0, 2)]
    #[case::count_exceeds_total(4, None, Some(999), 0, 4)]
    #[case::start_index_two(4, Some(2), None, 1, 3)]
    #[case::start_index_and_count(4, Some(2), Some(2), 1, 2)]
    #[case::start_index_at_last(4, Some(4), Some(10), 3, 1)]
    #[case::start_index_past_end(4, Some(9), Some(10), 8, 0)]
    #[case::start_index_zero_clamps(4, Some(0), Some(1), 0, 1)]
    #[case::start_index_negative_clamps(4, Some(-5), None, 0, 4)]
    #[case::negative_count(4, Some(1), Some(-1), 0, 0)]
    #[case::empty_set(0, Some(1), Some(10), 0, 0)]
    fn test_window(
        #[case] total: usize,
        #[case] start_index: Option<i64>,
        #[case] count: Option<i64>,
        #[case] offset: usize,
        #[case] limit: usize,
    ) {
        assert_eq!(window(total, start_index, count), Window { offset, limit });
    }

    #[test]
    fn test_window_never_exceeds_total() {
        for total in 0..6usize {
            for start in -1..8i64 {
                for count in -1..8i64 {
                    let w = window(total, Some(start), Some(count));
                    assert!(w.offset + w.limit <= total.max(w.offset));
                    assert!(w.limit <= count.max(0) as usize);
                    assert!(w.start_index() >= 1);
                }
            }
        }
    }

    #[test]
    fn test_apply_and_limit_offset() {
        let w = window(5, Some(2), Some(2));
        assert_eq!(w.apply(vec!['a', 'b', 'c', 'd', 'e']), vec!['b', 'c']);
        assert_eq!(
            w.to_limit_offset(),
            LimitOffset {
                limit: 2,
                offset: 1
            }
        );
        assert_eq!(w.start_index(), 2);
    }
}
