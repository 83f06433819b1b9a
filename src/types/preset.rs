use serde::{Deserialize, Serialize};

/// Ordering applied to the bookmark list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    LastUpdatedDesc,
    LastUpdatedAsc,
    TitleAsc,
    TitleDesc,
    ChapterDesc,
    ChapterAsc,
    RatingDesc,
    RatingAsc,
    /// Strictly by `manual_order`; pinned/favorite precedence is ignored.
    Manual,
}

/// Grid or list rendering of the bookmark collection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ViewLayout {
    #[default]
    Grid,
    List,
}

/// Filter, sort and layout state of the bookmark list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewSettings {
    pub search_term: String,
    pub sort_order: SortOrder,
    pub selected_tags: Vec<String>,
    pub show_favorites: bool,
    /// `None` shows every status.
    pub status_filter: Option<String>,
    pub layout: ViewLayout,
    pub is_compact: bool,
    /// Minimum rating (inclusive); `None` disables the filter.
    pub rating_filter: Option<u8>,
}

/// A named, replayable snapshot of `ViewSettings`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortPreset {
    pub id: String,
    pub name: String,
    pub settings: ViewSettings,
}
