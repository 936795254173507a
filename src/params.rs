use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Columns a post listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    #[default]
    PublishedAt,
    CreatedAt,
    UpdatedAt,
    Title,
    Views,
}

impl PostSort {
    /// Unknown keys, including fields that only exist through link tables,
    /// fall back to publish time.
    pub fn from_key(key: Option<&str>) -> Self {
        match key.map(str::trim) {
            Some("created_at") => Self::CreatedAt,
            Some("updated_at") => Self::UpdatedAt,
            Some("title") => Self::Title,
            Some("views") => Self::Views,
            _ => Self::PublishedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::PublishedAt => "p.published_at",
            Self::CreatedAt => "p.created_at",
            Self::UpdatedAt => "p.updated_at",
            Self::Title => "p.title",
            Self::Views => "p.views",
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct PostListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub sort: Option<String>,
    pub order: Option<SortDirection>,
}

impl PostListParams {
    pub fn page(&self) -> u64 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    pub fn search(&self) -> Option<&str> {
        non_blank(self.search.as_deref())
    }

    pub fn category(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }

    pub fn tag(&self) -> Option<&str> {
        non_blank(self.tag.as_deref())
    }

    pub fn sort(&self) -> PostSort {
        PostSort::from_key(self.sort.as_deref())
    }

    pub fn order(&self) -> SortDirection {
        self.order.unwrap_or_default()
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
