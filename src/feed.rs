use serde::{Deserialize, Serialize};

/// One item handed in by the external feed provider.
///
/// Any field may be absent; absent fields are skipped during paragraph
/// assembly, never treated as errors.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Item title, when the feed carries one.
    pub title: Option<String>,
    /// Raw publish timestamp, as the feed formatted it.
    pub pub_date: Option<String>,
    /// Body text, split into the feed's own segments.
    pub description: Vec<String>,
}

impl FeedItem {
    /// True when no field carries any text.
    pub fn is_empty(&self) -> bool {
        self.title.as_deref().is_none_or(str::is_empty)
            && self.pub_date.as_deref().is_none_or(str::is_empty)
            && self.description.iter().all(|segment| segment.is_empty())
    }
}

/// Ordered feed items for one generation request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedChannel {
    pub items: Vec<FeedItem>,
}

impl FeedChannel {
    /// Wrap already-parsed feed items.
    pub fn new(items: Vec<FeedItem>) -> Self {
        Self { items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_with_only_empty_fields_is_empty() {
        let item = FeedItem {
            title: Some(String::new()),
            pub_date: None,
            description: vec![String::new()],
        };
        assert!(item.is_empty());
    }

    #[test]
    fn item_with_any_text_is_not_empty() {
        let item = FeedItem {
            title: None,
            pub_date: None,
            description: vec!["breaking".to_string()],
        };
        assert!(!item.is_empty());
    }
}
