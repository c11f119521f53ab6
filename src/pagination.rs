use serde::Deserialize;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

pub(crate) fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    /// `(limit, offset)` with limit in `1..=MAX_LIMIT` and offset non-negative.
    pub fn clamped(self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_LIMIT), self.offset.max(0))
    }
}
