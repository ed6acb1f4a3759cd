use serde::Serialize;

/// Largest page size a caller may ask for.
pub const MAX_PER_PAGE: u32 = 100;

/// A validated page request: `page >= 1`, `1 <= per_page <= MAX_PER_PAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.per_page as usize)
    }
}

/// One page of an ordered result set. Totals describe the whole set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T> PageResult<T> {
    /// Cut the page described by `request` out of an already filtered and
    /// ordered sequence.
    pub fn paginate(all: Vec<T>, request: PageRequest) -> Self {
        let total_count = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.per_page as usize)
            .collect();

        Self::from_page(items, total_count, request)
    }

    /// Wrap a page the store already cut, given the size of the whole set.
    pub fn from_page(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total_count,
            total_pages: total_count.div_ceil(u64::from(request.per_page)),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}
