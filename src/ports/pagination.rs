//! 一覧取得の共通ヘルパー（ソート・ページング）
//!
//! `sort`はフィールド名で指定し、先頭に`-`を付けると降順になる。
//! 指定がなければ各一覧の既定フィールド（日付）の降順。

use serde::Serialize;
use std::cmp::Ordering;
use thiserror::Error;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// ページング指定のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page must be 1 or greater")]
    InvalidPage,
    #[error("limit must be between 1 and {}", MAX_LIMIT)]
    InvalidLimit,
    #[error("cannot sort by '{0}'")]
    UnknownSortField(String),
}

/// ソート可能なフィールド
///
/// 一覧ごとに許可するフィールドを列挙型で定義する。
pub trait SortField: Sized + Copy + std::fmt::Debug {
    /// `sort`未指定時のフィールド
    const DEFAULT: Self;

    fn parse(name: &str) -> Option<Self>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// 昇順の比較結果に方向を適用する
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F: SortField> Sort<F> {
    /// `"due_date"` / `"-due_date"` 形式をパースする
    pub fn parse(raw: &str) -> Result<Self, PaginationError> {
        let raw = raw.trim();
        let (name, direction) = match raw.strip_prefix('-') {
            Some(name) => (name, SortDirection::Descending),
            None => (raw, SortDirection::Ascending),
        };
        let field =
            F::parse(name).ok_or_else(|| PaginationError::UnknownSortField(name.to_string()))?;
        Ok(Self { field, direction })
    }
}

impl<F: SortField> Default for Sort<F> {
    fn default() -> Self {
        Self {
            field: F::DEFAULT,
            direction: SortDirection::Descending,
        }
    }
}

/// 検証済みのページング指定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest<F> {
    pub page: u32,
    pub limit: u32,
    pub sort: Sort<F>,
}

impl<F: SortField> PageRequest<F> {
    /// クエリパラメータ相当の値から組み立てる
    pub fn new(
        page: Option<u32>,
        limit: Option<u32>,
        sort: Option<&str>,
    ) -> Result<Self, PaginationError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        if page == 0 {
            return Err(PaginationError::InvalidPage);
        }
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 || limit > MAX_LIMIT {
            return Err(PaginationError::InvalidLimit);
        }
        let sort = match sort.filter(|s| !s.trim().is_empty()) {
            Some(raw) => Sort::parse(raw)?,
            None => Sort::default(),
        };
        Ok(Self { page, limit, sort })
    }

    /// 読み飛ばす件数（(page - 1) × limit）
    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl<F: SortField> Default for PageRequest<F> {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            sort: Sort::default(),
        }
    }
}

/// 1ページ分の結果とページ情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    pub fn new<F>(items: Vec<T>, total: u64, request: &PageRequest<F>) -> Self {
        let limit = u64::from(request.limit.max(1));
        let total_pages = u32::try_from(total.div_ceil(limit)).unwrap_or(u32::MAX);
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
            total_pages,
            has_next: request.page < total_pages,
            has_prev: request.page > 1,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}

/// メモリ上の一覧をソートしてページに切り出す
///
/// `compare`は昇順の比較関数。方向は`request.sort`に従う。
pub fn paginate<T, F: SortField>(
    mut items: Vec<T>,
    request: &PageRequest<F>,
    compare: impl Fn(&F, &T, &T) -> Ordering,
) -> Page<T> {
    let total = items.len() as u64;
    let sort = request.sort;
    items.sort_by(|a, b| sort.direction.apply(compare(&sort.field, a, b)));

    let skip = usize::try_from(request.skip()).unwrap_or(usize::MAX);
    let items: Vec<T> = items
        .into_iter()
        .skip(skip)
        .take(request.limit as usize)
        .collect();

    Page::new(items, total, request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum NumberField {
        Value,
    }

    impl SortField for NumberField {
        const DEFAULT: Self = NumberField::Value;

        fn parse(name: &str) -> Option<Self> {
            (name == "value").then_some(NumberField::Value)
        }

        fn name(&self) -> &'static str {
            "value"
        }
    }

    fn compare(_: &NumberField, a: &u32, b: &u32) -> Ordering {
        a.cmp(b)
    }

    #[test]
    fn test_defaults_sort_descending() {
        let request = PageRequest::<NumberField>::new(None, None, None).unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 10);
        assert_eq!(request.sort.direction, SortDirection::Descending);

        let page = paginate(vec![1, 3, 2], &request, compare);
        assert_eq!(page.items, vec![3, 2, 1]);
    }

    #[test]
    fn test_ascending_sort_and_second_page() {
        let request = PageRequest::<NumberField>::new(Some(2), Some(2), Some("value")).unwrap();
        let page = paginate((1..=5).rev().collect(), &request, compare);

        assert_eq!(page.items, vec![3, 4]);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_prev);
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let request = PageRequest::<NumberField>::new(Some(4), Some(2), None).unwrap();
        let page = paginate(vec![1, 2, 3], &request, compare);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
        assert!(!page.has_next);
    }

    #[test]
    fn test_rejects_invalid_options() {
        assert_eq!(
            PageRequest::<NumberField>::new(Some(0), None, None),
            Err(PaginationError::InvalidPage)
        );
        assert_eq!(
            PageRequest::<NumberField>::new(None, Some(101), None),
            Err(PaginationError::InvalidLimit)
        );
        assert_eq!(
            PageRequest::<NumberField>::new(None, None, Some("-title")),
            Err(PaginationError::UnknownSortField("title".to_string()))
        );
    }
}
