use std::fmt;

use super::{PageVisitor, PagerError, Result};

type ResultCallback<M> = Box<dyn Fn(&[M]) + Send + Sync>;

/// Pages over an in-memory collection.
///
/// The pager holds no cursor state beyond the page number the caller sets;
/// which items form a page is decided by the [`PageVisitor`] it accepts.
pub struct DataPager<M> {
    models: Vec<M>,
    current_page: usize,
    page_size: usize,
    on_result: Option<ResultCallback<M>>,
}

impl<M> DataPager<M> {
    /// Pager over `models` with one item per page.
    pub fn new(models: Vec<M>) -> Self {
        Self {
            models,
            current_page: 0,
            page_size: 1,
            on_result: None,
        }
    }

    pub fn with_page_size(models: Vec<M>, page_size: usize) -> Result<Self> {
        let mut pager = Self::new(models);
        pager.set_page_size(page_size)?;
        Ok(pager)
    }

    pub fn models(&self) -> &[M] {
        &self.models
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn set_current_page(&mut self, page: usize) {
        self.current_page = page;
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        if page_size == 0 {
            return Err(PagerError::ZeroPageSize);
        }
        self.page_size = page_size;
        Ok(())
    }

    /// Number of pages needed to cover the collection.
    pub fn page_count(&self) -> usize {
        self.models.len().div_ceil(self.page_size)
    }

    /// The previous page number, never below zero.
    pub fn last_page(&self) -> usize {
        self.current_page.saturating_sub(1)
    }

    pub fn next_page(&self) -> usize {
        self.current_page + 1
    }

    /// Registers a callback invoked with every visited page.
    pub fn on_result<F>(mut self, callback: F) -> Self
    where
        F: Fn(&[M]) + Send + Sync + 'static,
    {
        self.on_result = Some(Box::new(callback));
        self
    }

    /// Lets `visitor` select the current page and reports it.
    pub fn accept<V>(&self, visitor: &V) -> Vec<M>
    where
        V: PageVisitor<M> + ?Sized,
    {
        let page = visitor.visit(self);
        if let Some(callback) = &self.on_result {
            callback(&page);
        }
        page
    }
}

impl<M> fmt::Debug for DataPager<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataPager")
            .field("total", &self.models.len())
            .field("current_page", &self.current_page)
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::page::DefaultPageVisitor;

    #[test]
    fn test_page_count_rounds_up() {
        let pager = DataPager::with_page_size((0..10).collect(), 3).unwrap();
        assert_eq!(pager.page_count(), 4);

        let exact = DataPager::with_page_size((0..9).collect(), 3).unwrap();
        assert_eq!(exact.page_count(), 3);

        let empty = DataPager::<u8>::with_page_size(Vec::new(), 3).unwrap();
        assert_eq!(empty.page_count(), 0);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert_eq!(
            DataPager::<u8>::with_page_size(vec![1], 0).unwrap_err(),
            PagerError::ZeroPageSize
        );

        let mut pager = DataPager::new(vec![1, 2]);
        assert_eq!(pager.set_page_size(0), Err(PagerError::ZeroPageSize));
        assert_eq!(pager.page_size(), 1);
    }

    #[test]
    fn test_neighbour_pages() {
        let mut pager = DataPager::new(vec![1, 2, 3]);
        assert_eq!(pager.last_page(), 0);
        assert_eq!(pager.next_page(), 1);

        pager.set_current_page(2);
        assert_eq!(pager.last_page(), 1);
        assert_eq!(pager.next_page(), 3);
    }

    #[test]
    fn test_on_result_receives_visited_page() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut pager = DataPager::with_page_size(vec!["a", "b", "c"], 2)
            .unwrap()
            .on_result(move |page| sink.lock().unwrap().push(page.to_vec()));
        pager.set_current_page(1);

        let page = pager.accept(&DefaultPageVisitor);

        assert_eq!(page, vec!["c"]);
        assert_eq!(*seen.lock().unwrap(), vec![vec!["c"]]);
    }
}
