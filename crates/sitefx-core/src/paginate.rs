#![forbid(unsafe_code)]

//! Category filtering and page slicing.
//!
//! Pure functions over a borrowed item list. The filter keeps source order,
//! and every page request is clamped into `[1, total_pages]`, where an empty
//! result still counts as one (empty) page.

use std::num::NonZeroUsize;
use std::ops::RangeInclusive;

use crate::error::ConfigError;

/// Items that belong to exactly one category.
pub trait Categorized {
    type Category: PartialEq;

    fn category(&self) -> &Self::Category;
}

impl<T: Categorized + ?Sized> Categorized for &T {
    type Category = T::Category;

    fn category(&self) -> &Self::Category {
        (**self).category()
    }
}

/// Which items a [`FilterState`] lets through.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter<C> {
    #[default]
    All,
    Only(C),
}

impl<C: PartialEq> CategoryFilter<C> {
    #[must_use]
    pub fn matches(&self, category: &C) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == category,
        }
    }
}

/// One page of a filtered list.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSlice<'a, T> {
    pub items: Vec<&'a T>,
    /// 1-based page actually shown.
    pub page: usize,
    /// Never zero.
    pub total_pages: usize,
    /// Items matching the filter across all pages.
    pub filtered_count: usize,
}

impl<T> PageSlice<'_, T> {
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Every page number, for rendering a pager.
    #[must_use]
    pub fn page_numbers(&self) -> RangeInclusive<usize> {
        1..=self.total_pages
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn page_count(filtered: usize, page_size: NonZeroUsize) -> usize {
    filtered.div_ceil(page_size.get()).max(1)
}

fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages)
}

/// Filter `items` and cut out the requested page.
///
/// `page` is 1-based; 0 and anything past the last page are clamped.
#[must_use]
pub fn paginate<'a, T, C>(
    items: &'a [T],
    filter: &CategoryFilter<C>,
    page: usize,
    page_size: NonZeroUsize,
) -> PageSlice<'a, T>
where
    T: Categorized<Category = C>,
    C: PartialEq,
{
    let filtered: Vec<&T> = items
        .iter()
        .filter(|item| filter.matches(item.category()))
        .collect();
    let filtered_count = filtered.len();
    let total_pages = page_count(filtered_count, page_size);
    let page = clamp_page(page, total_pages);

    let start = (page - 1) * page_size.get();
    let items = filtered
        .into_iter()
        .skip(start)
        .take(page_size.get())
        .collect();

    PageSlice {
        items,
        page,
        total_pages,
        filtered_count,
    }
}

/// The active filter and page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState<C> {
    filter: CategoryFilter<C>,
    page: usize,
    page_size: NonZeroUsize,
}

impl<C: PartialEq> FilterState<C> {
    /// `All`, page 1.
    pub fn new(page_size: usize) -> Result<Self, ConfigError> {
        let page_size = NonZeroUsize::new(page_size).ok_or(ConfigError::ZeroPageSize)?;
        Ok(Self {
            filter: CategoryFilter::All,
            page: 1,
            page_size,
        })
    }

    #[must_use]
    pub fn filter(&self) -> &CategoryFilter<C> {
        &self.filter
    }

    /// Requested page. May exceed the page count until the next clamp.
    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    /// Switch category and go back to page 1.
    pub fn set_filter(&mut self, filter: CategoryFilter<C>) {
        crate::trace!(page = self.page, "filter changed, page reset");
        self.filter = filter;
        self.page = 1;
    }

    /// Jump to `page`, clamped against `items`. Returns the page now shown.
    pub fn set_page<T>(&mut self, page: usize, items: &[T]) -> usize
    where
        T: Categorized<Category = C>,
    {
        self.page = clamp_page(page, self.total_pages(items));
        self.page
    }

    /// Advance one page unless already on the last.
    pub fn next_page<T>(&mut self, items: &[T]) -> usize
    where
        T: Categorized<Category = C>,
    {
        self.set_page(self.page.saturating_add(1), items)
    }

    /// Go back one page unless already on the first.
    pub fn previous_page<T>(&mut self, items: &[T]) -> usize
    where
        T: Categorized<Category = C>,
    {
        self.set_page(self.page.saturating_sub(1), items)
    }

    #[must_use]
    pub fn total_pages<T>(&self, items: &[T]) -> usize
    where
        T: Categorized<Category = C>,
    {
        let filtered = items
            .iter()
            .filter(|item| self.filter.matches(item.category()))
            .count();
        page_count(filtered, self.page_size)
    }

    /// The current page of `items`.
    #[must_use]
    pub fn apply<'a, T>(&self, items: &'a [T]) -> PageSlice<'a, T>
    where
        T: Categorized<Category = C>,
    {
        paginate(items, &self.filter, self.page, self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Road,
        Bridge,
    }

    #[derive(Debug, PartialEq)]
    struct Item {
        id: u32,
        kind: Kind,
    }

    impl Categorized for Item {
        type Category = Kind;

        fn category(&self) -> &Kind {
            &self.kind
        }
    }

    fn items(n: u32) -> Vec<Item> {
        (0..n)
            .map(|id| Item {
                id,
                kind: if id % 2 == 0 { Kind::Road } else { Kind::Bridge },
            })
            .collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn ids(slice: &PageSlice<'_, Item>) -> Vec<u32> {
        slice.items.iter().map(|item| item.id).collect()
    }

    #[test]
    fn empty_list_is_one_empty_page() {
        let slice = paginate::<Item, Kind>(&[], &CategoryFilter::All, 1, size(3));
        assert_eq!(slice.total_pages, 1);
        assert_eq!(slice.page, 1);
        assert!(slice.is_empty());
        assert!(!slice.has_previous());
        assert!(!slice.has_next());
    }

    #[test]
    fn seven_items_three_per_page() {
        let all = items(7);
        let last = paginate(&all, &CategoryFilter::All, 3, size(3));
        assert_eq!(last.total_pages, 3);
        assert_eq!(ids(&last), vec![6]);
        assert_eq!(last.page_numbers(), 1..=3);
    }

    #[test]
    fn out_of_range_pages_clamp() {
        let all = items(7);
        let high = paginate(&all, &CategoryFilter::All, 99, size(3));
        assert_eq!(high.page, 3);
        assert_eq!(ids(&high), vec![6]);

        let zero = paginate(&all, &CategoryFilter::All, 0, size(3));
        assert_eq!(zero.page, 1);
        assert_eq!(ids(&zero), vec![0, 1, 2]);
    }

    #[test]
    fn filter_keeps_source_order() {
        let all = items(7);
        let slice = paginate(&all, &CategoryFilter::Only(Kind::Bridge), 1, size(10));
        assert_eq!(ids(&slice), vec![1, 3, 5]);
        assert_eq!(slice.filtered_count, 3);
    }

    #[test]
    fn state_rejects_zero_page_size() {
        assert_eq!(
            FilterState::<Kind>::new(0).unwrap_err(),
            ConfigError::ZeroPageSize
        );
    }

    #[test]
    fn changing_filter_resets_page() {
        let all = items(7);
        let mut state = FilterState::new(2).unwrap();
        assert_eq!(state.set_page(3, &all), 3);
        state.set_filter(CategoryFilter::Only(Kind::Road));
        assert_eq!(state.page(), 1);
        assert_eq!(ids(&state.apply(&all)), vec![0, 2]);
    }

    #[test]
    fn next_and_previous_stop_at_edges() {
        let all = items(7);
        let mut state = FilterState::new(3).unwrap();
        assert_eq!(state.previous_page(&all), 1);
        assert_eq!(state.next_page(&all), 2);
        assert_eq!(state.next_page(&all), 3);
        assert_eq!(state.next_page(&all), 3);
        let slice = state.apply(&all);
        assert!(slice.has_previous());
        assert!(!slice.has_next());
    }
}
