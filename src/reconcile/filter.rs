use serde::Deserialize;

use super::CombinedPollView;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    Active,
    All,
}

/// Browse page filters, as sent in the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowseFilter {
    #[serde(default)]
    pub search: Option<String>,
    /// `"all"` or absent matches every category.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: StatusFilter,
}

impl BrowseFilter {
    pub fn matches(&self, view: &CombinedPollView) -> bool {
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            let hit = [view.title(), view.description(), view.category()]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.eq_ignore_ascii_case("all")) {
            if !view.category().eq_ignore_ascii_case(category) {
                return false;
            }
        }
        match self.status {
            StatusFilter::All => true,
            StatusFilter::Active => view.is_active(),
        }
    }

    pub fn apply(&self, views: Vec<CombinedPollView>) -> Vec<CombinedPollView> {
        views.into_iter().filter(|v| self.matches(v)).collect()
    }
}
