use rand::Rng;

use super::DataPager;

/// Decides which items of a [`DataPager`] make up its current page.
pub trait PageVisitor<M> {
    fn visit(&self, pager: &DataPager<M>) -> Vec<M>;
}

/// Contiguous slice `[page * size, page * size + size)` clipped to the collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPageVisitor;

impl<M: Clone> PageVisitor<M> for DefaultPageVisitor {
    fn visit(&self, pager: &DataPager<M>) -> Vec<M> {
        let models = pager.models();
        let start = pager
            .current_page()
            .saturating_mul(pager.page_size())
            .min(models.len());
        let end = start.saturating_add(pager.page_size()).min(models.len());
        models[start..end].to_vec()
    }
}

/// `page_size` items drawn uniformly at random, with replacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPageVisitor;

impl<M: Clone> PageVisitor<M> for RandomPageVisitor {
    fn visit(&self, pager: &DataPager<M>) -> Vec<M> {
        let models = pager.models();
        if models.is_empty() {
            return Vec::new();
        }
        let mut rng = rand::rng();
        (0..pager.page_size())
            .map(|_| models[rng.random_range(0..models.len())].clone())
            .collect()
    }
}
