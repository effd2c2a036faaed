use serde::Serialize;
use std::fmt;

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// 1-based, inclusive row range of a page. `first` and `last` are both 0
/// when the page holds no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRange {
    pub first: usize,
    pub last: usize,
    pub total: usize,
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == 0 {
            write!(f, "No rows on this page ({} total)", self.total)
        } else {
            write!(f, "Showing rows {} to {} of {}", self.first, self.last, self.total)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    pub number: usize,
    pub items: &'a [T],
    pub range: PageRange,
}

/// Slice out page `page` (1-based; 0 is read as 1) of `page_size` rows.
/// Pages past the end are empty, not an error.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> Page<'_, T> {
    let number = page.max(1);
    let page_size = page_size.max(1);
    let total = items.len();
    let start = (number - 1).saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);
    let range = if start < end {
        PageRange { first: start + 1, last: end, total }
    } else {
        PageRange { first: 0, last: 0, total }
    };
    Page { number, items: &items[start..end], range }
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_of_small_set_holds_everything() {
        let rows: Vec<u32> = (1..=6).collect();
        let page = paginate(&rows, 1, DEFAULT_PAGE_SIZE);
        assert_eq!(page.items, &rows[..]);
        assert_eq!(page.range, PageRange { first: 1, last: 6, total: 6 });
        assert_eq!(page.range.to_string(), "Showing rows 1 to 6 of 6");
    }

    #[test]
    fn middle_and_last_pages() {
        let rows: Vec<u32> = (0..250).collect();
        let second = paginate(&rows, 2, 100);
        assert_eq!(second.items.len(), 100);
        assert_eq!(second.items[0], 100);
        assert_eq!(second.range, PageRange { first: 101, last: 200, total: 250 });

        let third = paginate(&rows, 3, 100);
        assert_eq!(third.items.len(), 50);
        assert_eq!(third.range, PageRange { first: 201, last: 250, total: 250 });
        assert_eq!(page_count(250, 100), 3);
    }

    #[test]
    fn past_the_end_is_an_empty_page() {
        let rows: Vec<u32> = (1..=6).collect();
        let page = paginate(&rows, 3, 100);
        assert!(page.items.is_empty());
        assert_eq!(page.range, PageRange { first: 0, last: 0, total: 6 });
        assert_eq!(page.range.to_string(), "No rows on this page (6 total)");
    }

    #[test]
    fn page_zero_reads_as_first_page() {
        let rows = vec!["a", "b"];
        let page = paginate(&rows, 0, 100);
        assert_eq!(page.number, 1);
        assert_eq!(page.items.len(), 2);
    }
}
