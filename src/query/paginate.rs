use super::exec::Query;
use crate::errors::EngineError;
use crate::view::RecordView;

/// One page of a paginated query: an item snapshot plus navigation metadata.
/// Page indexes are 1-based.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<RecordView>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub prev_page: Option<usize>,
    pub next_page: Option<usize>,
    pub is_first_page: bool,
    pub is_last_page: bool,
}

impl Page {
    pub(crate) fn new(
        items: Vec<RecordView>,
        current_page: usize,
        total_pages: usize,
        total_items: usize,
    ) -> Self {
        Self {
            items,
            current_page,
            total_pages,
            total_items,
            prev_page: (current_page > 1).then(|| current_page - 1),
            next_page: (current_page < total_pages).then(|| current_page + 1),
            is_first_page: current_page == 1,
            is_last_page: current_page == total_pages,
        }
    }
}

impl Query {
    /// Splits the query's results into pages of `per_page` items. A limit
    /// already present on the query caps the total material paginated. An
    /// empty result still yields a single empty page.
    pub fn paginate(&self, per_page: usize) -> Result<Vec<Page>, EngineError> {
        if per_page == 0 {
            return Err(EngineError::InvalidPageSize(per_page));
        }

        let total_items = self.raw_count();
        if total_items == 0 {
            return Ok(vec![Page::new(Vec::new(), 1, 1, 0)]);
        }

        let total_pages = total_items.div_ceil(per_page);
        let mut pages = Vec::with_capacity(total_pages);
        for page_num in 1..=total_pages {
            let offset = (page_num - 1) * per_page;
            let items_this_page = match self.limit_count() {
                Some(limit) if limit < per_page => limit.saturating_sub(offset).min(per_page),
                _ => per_page,
            };
            let items = self.offset(offset as i64).limit(items_this_page).to_vec();
            pages.push(Page::new(items, page_num, total_pages, total_items));
        }
        Ok(pages)
    }
}
