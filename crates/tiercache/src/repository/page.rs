use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tiercache_core::condition::Window;
use tiercache_core::page::PagerError;

const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageState {
    page_no: usize,
    page_size: usize,
    total_size: usize,
}

impl PageState {
    fn first(page_size: usize) -> Self {
        Self {
            page_no: 0,
            page_size,
            total_size: 0,
        }
    }

    /// Index of the last page, or `None` while nothing is known to exist.
    fn last_page(&self) -> Option<usize> {
        self.total_size.checked_sub(1).map(|last| last / self.page_size)
    }
}

/// Shared page position of a paged list repository.
///
/// Clones share state, so an upstream holding a clone sees every
/// `set_current_page` made through the repository.
#[derive(Debug, Clone)]
pub struct PageCursor {
    state: Arc<Mutex<PageState>>,
}

impl PageCursor {
    pub fn new(page_size: usize) -> Result<Self, PagerError> {
        if page_size == 0 {
            return Err(PagerError::ZeroPageSize);
        }
        Ok(Self {
            state: Arc::new(Mutex::new(PageState::first(page_size))),
        })
    }

    pub fn set(&self, page_no: usize, page_size: usize) -> Result<(), PagerError> {
        if page_size == 0 {
            return Err(PagerError::ZeroPageSize);
        }
        let mut state = self.lock();
        state.page_no = page_no;
        state.page_size = page_size;
        Ok(())
    }

    pub fn page_no(&self) -> usize {
        self.snapshot().page_no
    }

    pub fn page_size(&self) -> usize {
        self.snapshot().page_size
    }

    /// Number of records across every page, as last reported by the
    /// upstream or counted in the cache. Zero until known.
    pub fn total_size(&self) -> usize {
        self.snapshot().total_size
    }

    pub fn set_total_size(&self, total_size: usize) {
        self.lock().total_size = total_size;
    }

    pub fn last_page(&self) -> Option<usize> {
        self.snapshot().last_page()
    }

    pub fn is_last_page(&self) -> bool {
        let state = self.snapshot();
        state.last_page() == Some(state.page_no)
    }

    /// Whether the current page lies past the last page. Always true while
    /// the total size is zero.
    pub fn is_out_of_range(&self) -> bool {
        let state = self.snapshot();
        state.last_page().is_none_or(|last| state.page_no > last)
    }

    pub fn can_load_more(&self) -> bool {
        !self.is_last_page()
    }

    /// Moves to the next page and returns its number.
    pub fn advance(&self) -> usize {
        let mut state = self.lock();
        state.page_no += 1;
        state.page_no
    }

    /// Moves back to the first page.
    pub fn rewind(&self) {
        self.lock().page_no = 0;
    }

    /// The row window of the current page.
    pub fn window(&self) -> Window {
        let state = self.snapshot();
        Window::page(state.page_no, state.page_size)
    }

    fn snapshot(&self) -> PageState {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(PageState::first(DEFAULT_PAGE_SIZE))),
        }
    }
}
