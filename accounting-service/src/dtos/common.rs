use serde::{Deserialize, Serialize};

use crate::services::database::Paging;

/// `?page=&page_size=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageParams {
    pub fn paging(&self) -> Paging {
        Paging::new(self.page, self.page_size)
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>, total: i64, paging: Paging) -> Self {
        let page_size = u32::try_from(paging.limit).unwrap_or(Paging::DEFAULT_PAGE_SIZE);
        let page = u32::try_from(paging.offset / paging.limit.max(1) + 1).unwrap_or(1);
        Self {
            items,
            total,
            page,
            page_size,
        }
    }
}
