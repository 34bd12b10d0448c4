//! Page-number pagination helpers.
//!
//! Listings are cut into fixed-size pages addressed by a `?page=N` query
//! parameter. Resolution is forgiving: a missing or malformed number yields
//! the first page and an out-of-range number yields the last one, so a
//! listing always renders something.

use serde::Serialize;

/// How many posts a listing page shows unless configured otherwise.
pub const DEFAULT_POSTS_PER_PAGE: u32 = 10;

/// Offset/limit window for a resolved page, ready to hand to a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
    pub per_page: u64,
}

impl PageWindow {
    /// Resolve the requested page number against the size of the listing.
    pub fn resolve(raw: Option<&str>, total: u64, per_page: u32) -> Self {
        let per_page = u64::from(per_page.max(1));
        let num_pages = total.div_ceil(per_page).max(1);

        let number = match raw.map(str::trim).and_then(|value| value.parse::<i64>().ok()) {
            None => 1,
            Some(value) if value < 1 => num_pages,
            Some(value) => (value as u64).min(num_pages),
        };

        Self {
            number,
            num_pages,
            total,
            per_page,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }

    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
        }
    }
}

/// One page of a listing plus the navigation facts the paginator widget needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_other_pages(&self) -> bool {
        self.has_previous() || self.has_next()
    }

    pub fn previous_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn page_range(&self) -> std::ops::RangeInclusive<u64> {
        1..=self.num_pages
    }
}
