//! Cached paginated collections.

use super::range::PageCursor;

/// Cursor of the page after the pages whose backend-returned lengths are
/// `fetched`, given the page size they were fetched with.
///
/// A full last page means more rows may follow and the next cursor is the
/// number of pages fetched so far. A short (or empty) last page ends
/// pagination. No pages at all also yields `None`: the first page is
/// fetched by the initial load, not by "next page".
pub fn next_cursor(fetched: &[usize], limit: usize) -> Option<PageCursor> {
    match fetched.last() {
        Some(&last) if last == limit => Some(fetched.len()),
        _ => None,
    }
}

/// The pages fetched so far under one query key, in cursor order.
///
/// Each page remembers how many rows the backend returned for it. Local
/// edits shrink pages but never change that count, so pagination keeps
/// going after an optimistic delete.
#[derive(Debug, Clone, PartialEq)]
pub struct InfiniteData<T> {
    pages: Vec<Vec<T>>,
    fetched: Vec<usize>,
    limit: usize,
}

impl<T> InfiniteData<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            pages: Vec::new(),
            fetched: Vec::new(),
            limit,
        }
    }

    /// Pages exactly as the backend returned them.
    pub fn from_pages(pages: Vec<Vec<T>>, limit: usize) -> Self {
        let fetched = pages.iter().map(Vec::len).collect();
        Self {
            pages,
            fetched,
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn pages(&self) -> &[Vec<T>] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Append a page as the backend returned it.
    pub fn push_page(&mut self, page: Vec<T>) {
        self.fetched.push(page.len());
        self.pages.push(page);
    }

    pub fn next_cursor(&self) -> Option<PageCursor> {
        next_cursor(&self.fetched, self.limit)
    }

    pub fn has_next_page(&self) -> bool {
        self.next_cursor().is_some()
    }

    /// All items, page by page.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop matching items from every page. Page boundaries stay where they
    /// are; pages are never rebalanced. Returns how many items were removed.
    pub fn remove_where<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let before = self.len();
        for page in &mut self.pages {
            page.retain(|item| !pred(item));
        }
        before - self.len()
    }

    /// Apply `update` in place to every matching item. Returns the number of
    /// items touched.
    pub fn update_where<P, U>(&mut self, mut pred: P, mut update: U) -> usize
    where
        P: FnMut(&T) -> bool,
        U: FnMut(&mut T),
    {
        let mut touched = 0;
        for item in self.pages.iter_mut().flatten() {
            if pred(item) {
                update(item);
                touched += 1;
            }
        }
        touched
    }
}

impl<T: Clone> InfiniteData<T> {
    pub fn flatten(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
