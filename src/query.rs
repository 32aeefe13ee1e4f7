// Pagination shared by every listing endpoint

use serde::Deserialize;
use utoipa::IntoParams;

/// Raw `page`/`limit` query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page number (1-indexed, defaults to 1)
    pub page: Option<u32>,
    /// Items per page
    pub limit: Option<u32>,
}

/// One page of results (1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Self {
        Self { number, size }
    }

    /// Validate optional page/limit values, applying `default_size` and
    /// capping the size at `max_size`
    pub fn from_params(
        page: Option<u32>,
        limit: Option<u32>,
        default_size: u32,
        max_size: u32,
    ) -> Result<Self, String> {
        let number = page.unwrap_or(1);
        let size = limit.unwrap_or(default_size);
        if number == 0 {
            return Err("page must be a positive number (greater than 0)".to_string());
        }
        if size == 0 {
            return Err("limit must be a positive number (greater than 0)".to_string());
        }
        Ok(Self::new(number, size.min(max_size)))
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number.saturating_sub(1)) * u64::from(self.size)
    }

    /// Number of pages needed for `total` rows
    pub fn total_pages(&self, total: i64) -> u32 {
        if self.size == 0 || total <= 0 {
            return 0;
        }
        let size = i64::from(self.size);
        u32::try_from((total + size - 1) / size).unwrap_or(u32::MAX)
    }

    /// Slice an in-memory, already ordered result set
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        items
            .iter()
            .skip(start)
            .take(self.size as usize)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_params_defaults() {
        assert_eq!(Page::from_params(None, None, 12, 100).unwrap(), Page::new(1, 12));
    }

    #[test]
    fn test_from_params_caps_size() {
        assert_eq!(Page::from_params(Some(2), Some(1000), 12, 100).unwrap(), Page::new(2, 100));
    }

    #[test]
    fn test_from_params_rejects_zero() {
        assert!(Page::from_params(Some(0), None, 12, 100).is_err());
        assert!(Page::from_params(None, Some(0), 12, 100).is_err());
    }

    #[test]
    fn test_offset_and_total_pages() {
        let page = Page::new(3, 10);
        assert_eq!(page.offset(), 20);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(21), 3);
        assert_eq!(page.total_pages(30), 3);
    }

    #[test]
    fn test_slice() {
        let rows: Vec<i32> = (1..=5).collect();
        assert_eq!(Page::new(2, 2).slice(&rows), vec![3, 4]);
        assert_eq!(Page::new(4, 2).slice(&rows), Vec::<i32>::new());
    }
}
