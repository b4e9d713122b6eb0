//! Page window calculation for paginated listings.
//!
//! The shop grid and the admin product list render a bounded set of page
//! links: the first page, the last page, and a window around the current
//! page. Gaps wider than one page are rendered as an ellipsis; a gap of
//! exactly one page is filled with that page instead.
//!
//! ```
//! use marketplace_core::pagination::{visible_pages, PageItem};
//!
//! let sentinels: Vec<i64> = visible_pages(5, 10).iter().map(|p| p.as_sentinel()).collect();
//! assert_eq!(sentinels, vec![1, -1, 3, 4, 5, 6, 7, -1, 10]);
//!
//! assert!(visible_pages(1, 1).is_empty());
//! ```

use serde::{Serialize, Serializer};

/// Number of pages shown on each side of the current page.
pub const WINDOW_DELTA: u32 = 2;

/// A single entry of the rendered page list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageItem {
    /// A clickable page number (1-based).
    Page(u32),
    /// A gap of more than one page.
    Ellipsis,
}

impl PageItem {
    /// Sentinel value used for [`PageItem::Ellipsis`] on the wire.
    pub const ELLIPSIS_SENTINEL: i64 = -1;

    /// Convert to the integer form used by the frontends (`-1` for ellipsis).
    #[must_use]
    pub const fn as_sentinel(self) -> i64 {
        match self {
            Self::Page(page) => page as i64,
            Self::Ellipsis => Self::ELLIPSIS_SENTINEL,
        }
    }

    /// The page number, if this item is a page.
    #[must_use]
    pub const fn page(self) -> Option<u32> {
        match self {
            Self::Page(page) => Some(page),
            Self::Ellipsis => None,
        }
    }
}

impl Serialize for PageItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_sentinel())
    }
}

/// Compute the page items to render for `current_page` out of `total_pages`.
///
/// Returns an empty list when there is nothing to paginate
/// (`total_pages <= 1`). Page numbers in the result are strictly increasing.
#[must_use]
pub fn visible_pages(current_page: u32, total_pages: u32) -> Vec<PageItem> {
    if total_pages <= 1 {
        return Vec::new();
    }

    let window_start = current_page.saturating_sub(WINDOW_DELTA).max(2);
    let window_end = current_page
        .saturating_add(WINDOW_DELTA)
        .min(total_pages - 1);

    let mut kept = Vec::with_capacity(2 * WINDOW_DELTA as usize + 3);
    kept.push(1);
    kept.extend(window_start..=window_end);
    kept.push(total_pages);

    let mut items = Vec::with_capacity(kept.len() + 2);
    let mut previous: Option<u32> = None;
    for page in kept {
        if let Some(prev) = previous {
            match page - prev {
                1 => {}
                2 => items.push(PageItem::Page(prev + 1)),
                _ => items.push(PageItem::Ellipsis),
            }
        }
        items.push(PageItem::Page(page));
        previous = Some(page);
    }

    items
}

/// Pagination state derived from an offset/limit listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// Current page (1-based).
    pub current_page: u32,
    /// Total number of pages (0 when there are no items).
    pub total_pages: u32,
    /// Items per page.
    pub per_page: u32,
}

impl Pagination {
    /// Build pagination state from the total item count and the
    /// `limit`/`offset` of the current request.
    ///
    /// A `limit` of zero is treated as one item per page.
    #[must_use]
    pub fn from_offset(total_items: u64, limit: u32, offset: u64) -> Self {
        let per_page = limit.max(1);
        let total_pages = total_items.div_ceil(u64::from(per_page));
        let current_page = offset / u64::from(per_page) + 1;

        Self {
            current_page: u32::try_from(current_page).unwrap_or(u32::MAX),
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            per_page,
        }
    }

    /// Whether a navigation bar should be rendered at all.
    #[must_use]
    pub const fn is_navigable(&self) -> bool {
        self.total_pages > 1
    }

    /// Whether a "previous" link is active.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    /// Whether a "next" link is active.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Offset to request for `page` (1-based).
    #[must_use]
    pub fn offset_for(&self, page: u32) -> u64 {
        u64::from(page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Page items for this state, or `None` when no navigation is rendered.
    #[must_use]
    pub fn window(&self) -> Option<Vec<PageItem>> {
        self.is_navigable()
            .then(|| visible_pages(self.current_page, self.total_pages))
    }
}
