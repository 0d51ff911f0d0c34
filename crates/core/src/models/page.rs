use serde::{Deserialize, Serialize};

/// 默认每页条数
pub const DEFAULT_PER_PAGE: u64 = 50;

/// 分页计算
///
/// 页码从1开始。超出范围的页码夹到最近的有效页，从不报错。
/// 总数为0时总页数为0。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    count: u64,
    per_page: u64,
}

/// 已夹紧的页窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub per_page: u64,
    pub offset: u64,
    pub total_pages: u64,
    pub total_count: u64,
}

impl Paginator {
    pub fn new(count: u64, per_page: u64) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn num_pages(&self) -> u64 {
        self.count.div_ceil(self.per_page)
    }

    /// 把请求页码夹到 [1, num_pages]；没有数据时为1
    pub fn clamp(&self, page: u64) -> u64 {
        page.clamp(1, self.num_pages().max(1))
    }

    pub fn window(&self, page: u64) -> PageWindow {
        let number = self.clamp(page);
        PageWindow {
            number,
            per_page: self.per_page,
            offset: (number - 1) * self.per_page,
            total_pages: self.num_pages(),
            total_count: self.count,
        }
    }
}

impl PageWindow {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    /// 对内存中的完整序列取当前页
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = (self.offset as usize).min(items.len());
        let end = start.saturating_add(self.per_page as usize).min(items.len());
        items[start..end].to_vec()
    }
}

/// 统一的分页查询结果
///
/// 从不以错误形式返回：错误写入 `error`，且可以与部分数据共存。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page: Option<u64>,
    pub next_page: Option<u64>,
    pub error: Option<String>,
}

impl<T> Page<T> {
    pub fn from_window(items: Vec<T>, window: PageWindow) -> Self {
        let has_previous = window.has_previous();
        let has_next = window.has_next();
        Self {
            items,
            total_count: window.total_count,
            page: window.number,
            per_page: window.per_page,
            total_pages: window.total_pages,
            has_previous,
            has_next,
            previous_page: has_previous.then(|| window.number - 1),
            next_page: has_next.then(|| window.number + 1),
            error: None,
        }
    }

    /// 对内存中的完整序列分页
    pub fn paginate(all: &[T], page: u64, per_page: u64) -> Self
    where
        T: Clone,
    {
        let window = Paginator::new(all.len() as u64, per_page).window(page);
        Self::from_window(window.slice(all), window)
    }

    /// 查询整体失败时的空页
    pub fn failed(page: u64, per_page: u64, error: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            page,
            per_page,
            total_pages: 0,
            has_previous: false,
            has_next: false,
            previous_page: None,
            next_page: None,
            error: Some(error.into()),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// 单实体详情结果；未找到是正常的否定结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detail<T> {
    pub item: Option<T>,
    pub error: Option<String>,
}

impl<T> Detail<T> {
    pub fn found(item: T) -> Self {
        Self {
            item: Some(item),
            error: None,
        }
    }

    pub fn missing(message: impl Into<String>) -> Self {
        Self {
            item: None,
            error: Some(message.into()),
        }
    }

    pub fn is_found(&self) -> bool {
        self.item.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_has_no_pages() {
        for per_page in [1, 10, 50] {
            for page in [0, 1, 2, 99] {
                let result: Page<u32> = Page::paginate(&[], page, per_page);
                assert_eq!(result.total_count, 0);
                assert_eq!(result.total_pages, 0);
                assert!(!result.has_previous);
                assert!(!result.has_next);
                assert_eq!(result.previous_page, None);
                assert_eq!(result.next_page, None);
                assert_eq!(result.page, 1);
            }
        }
    }

    #[test]
    fn test_page_beyond_range_clamps_to_last() {
        let items: Vec<u32> = (1..=25).collect();
        let result = Page::paginate(&items, 7, 10);

        assert_eq!(result.page, 3);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.items, vec![21, 22, 23, 24, 25]);
        assert!(result.has_previous);
        assert!(!result.has_next);
        assert_eq!(result.previous_page, Some(2));
        assert_eq!(result.next_page, None);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_page_zero_clamps_to_first() {
        let items: Vec<u32> = (1..=25).collect();
        let result = Page::paginate(&items, 0, 10);

        assert_eq!(result.page, 1);
        assert_eq!(result.items.len(), 10);
        assert!(!result.has_previous);
        assert_eq!(result.next_page, Some(2));
    }

    #[test]
    fn test_middle_page_navigation() {
        let items: Vec<u32> = (1..=30).collect();
        let result = Page::paginate(&items, 2, 10);

        assert_eq!(result.items.first(), Some(&11));
        assert_eq!(result.previous_page, Some(1));
        assert_eq!(result.next_page, Some(3));
    }

    #[test]
    fn test_zero_per_page_is_treated_as_one() {
        let paginator = Paginator::new(3, 0);
        assert_eq!(paginator.num_pages(), 3);
        assert_eq!(paginator.window(2).offset, 1);
    }

    #[test]
    fn test_failed_page_carries_error() {
        let result: Page<u32> = Page::failed(4, 50, "store down");
        assert_eq!(result.page, 4);
        assert_eq!(result.total_pages, 0);
        assert_eq!(result.error.as_deref(), Some("store down"));
    }
}
