//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page", alias = "size")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl Pagination {
    /// Upper bound on page size accepted from callers
    pub const MAX_PER_PAGE: u32 = 100;

    /// Clamp page and page size into the accepted range
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    /// Slice an already filtered and ordered collection into one page
    pub fn from_items(items: Vec<T>, pagination: Pagination) -> Self {
        let pagination = pagination.normalized();
        let total_items = items.len() as u64;
        let per_page = pagination.per_page as u64;
        let total_pages = total_items.div_ceil(per_page) as u32;
        let skip = (pagination.page as u64 - 1).saturating_mul(per_page) as usize;

        let data = items
            .into_iter()
            .skip(skip)
            .take(pagination.per_page as usize)
            .collect();

        Self {
            data,
            pagination: PaginationMeta {
                page: pagination.page,
                per_page: pagination.per_page,
                total_items,
                total_pages,
            },
        }
    }
}
