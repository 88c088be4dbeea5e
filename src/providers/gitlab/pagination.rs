use reqwest::header::HeaderMap;

pub const DEFAULT_PER_PAGE: u32 = 20;

/// Starting point and page size for an offset-paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageOptions {
    pub fn with_per_page(per_page: u32) -> Self {
        Self {
            per_page,
            ..Self::default()
        }
    }
}

/// Pagination state reported by GitLab in `X-Page`, `X-Total-Pages` and
/// `X-Next-Page` response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub current: u32,
    pub total: Option<u32>,
    pub next: Option<u32>,
}

impl PageInfo {
    /// Reads pagination headers, falling back to `requested` for the current
    /// page when the server omits `X-Page`.
    pub fn from_headers(headers: &HeaderMap, requested: u32) -> Self {
        Self {
            current: header_u32(headers, "x-page").unwrap_or(requested),
            total: header_u32(headers, "x-total-pages"),
            next: header_u32(headers, "x-next-page"),
        }
    }

    /// Returns the page to request next, or `None` once `current >= total`.
    ///
    /// GitLab drops `X-Total-Pages` for very large collections, in which case
    /// a non-empty `X-Next-Page` keeps the listing going. A response with no
    /// pagination headers at all is a single page, as is a current page that
    /// has no successor in `u32`.
    pub fn next_page(&self) -> Option<u32> {
        match self.total {
            Some(total) if self.current < total => Some(self.current + 1),
            Some(_) => None,
            None => self.next.and(self.current.checked_add(1)),
        }
    }
}

fn header_u32(headers: &HeaderMap, name: &str) -> Option<u32> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}
