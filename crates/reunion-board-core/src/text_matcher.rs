use crate::TaskView;

/// Case-insensitive substring matcher for task names.
pub struct TextMatcher {
    needle: String,
}

impl TextMatcher {
    /// Lowercase a query into a matcher. Returns `None` for an empty query.
    ///
    /// Surrounding whitespace is part of the needle.
    #[must_use]
    pub fn new(query: &str) -> Option<Self> {
        if query.is_empty() {
            return None;
        }
        Some(Self {
            needle: query.to_lowercase(),
        })
    }

    /// Determine whether the task name contains the query.
    #[must_use]
    pub fn matches(&self, view: &TaskView) -> bool {
        self.matches_field(&view.task.name)
    }

    fn matches_field(&self, value: &str) -> bool {
        value.to_lowercase().contains(&self.needle)
    }
}
