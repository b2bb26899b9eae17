//! Page navigation over the completed block list

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 2;
pub const DEFAULT_MAX_VISIBLE_PAGES: usize = 5;

/// One entry of the page navigator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageMarker {
    Page(usize),
    /// Elided run of pages
    Gap,
}

/// Tracks the current page; pages are 1-based
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
    max_visible: usize,
    current_page: usize,
}

impl Paginator {
    /// `page_size` and `max_visible` are raised to their minimums (1 and 5)
    pub fn new(page_size: usize, max_visible: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            max_visible: max_visible.max(DEFAULT_MAX_VISIBLE_PAGES),
            current_page: 1,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Never less than 1, so an empty list still has one (empty) page
    pub fn total_pages(&self, len: usize) -> usize {
        len.div_ceil(self.page_size).max(1)
    }

    pub fn needs_pagination(&self, len: usize) -> bool {
        len > self.page_size
    }

    /// Move to `page`, clamped to the valid range. Returns the resulting page.
    pub fn go_to(&mut self, page: usize, len: usize) -> usize {
        self.current_page = page.clamp(1, self.total_pages(len));
        self.current_page
    }

    /// Items on the current page
    pub fn page_slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.current_page - 1) * self.page_size;
        if start >= items.len() {
            return &[];
        }
        let end = (start + self.page_size).min(items.len());
        &items[start..end]
    }

    /// Navigator entries for the current page
    ///
    /// Short lists show every page. Otherwise the first and last pages are
    /// always shown, with a window that follows the current page.
    pub fn page_numbers(&self, len: usize) -> Vec<PageMarker> {
        let total = self.total_pages(len);
        let current = self.current_page.min(total);
        let window = self.max_visible;

        if total <= window {
            return (1..=total).map(PageMarker::Page).collect();
        }

        let mut markers = Vec::with_capacity(window + 3);
        if current <= window - 2 {
            markers.extend((1..=window).map(PageMarker::Page));
            markers.push(PageMarker::Gap);
            markers.push(PageMarker::Page(total));
        } else if current >= total - 2 {
            markers.push(PageMarker::Page(1));
            markers.push(PageMarker::Gap);
            markers.extend((total + 1 - window..=total).map(PageMarker::Page));
        } else {
            markers.push(PageMarker::Page(1));
            markers.push(PageMarker::Gap);
            markers.extend((current - 1..=current + 1).map(PageMarker::Page));
            markers.push(PageMarker::Gap);
            markers.push(PageMarker::Page(total));
        }
        markers
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_MAX_VISIBLE_PAGES)
    }
}
