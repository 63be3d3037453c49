use serde::{Deserialize, Serialize};

fn is_false(flag: &bool) -> bool {
    !*flag
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
/// One part of a multi-part message body
pub enum ContentItem {
    Text {
        text: String,
        /// Ephemeral prompt-caching hint
        #[serde(default, skip_serializing_if = "is_false")]
        cache: bool,
    },
    Image {
        mime_type: String,
        /// Base64-encoded image bytes
        data: String,
        #[serde(default, skip_serializing_if = "is_false")]
        cache: bool,
    },
}

impl ContentItem {
    pub fn text<S: Into<String>>(text: S) -> Self {
        ContentItem::Text {
            text: text.into(),
            cache: false,
        }
    }

    pub fn image<S: Into<String>, T: Into<String>>(data: S, mime_type: T) -> Self {
        ContentItem::Image {
            mime_type: mime_type.into(),
            data: data.into(),
            cache: false,
        }
    }

    /// Mark this item as a candidate for vendor-side prompt caching
    pub fn cached(mut self) -> Self {
        match &mut self {
            ContentItem::Text { cache, .. } | ContentItem::Image { cache, .. } => *cache = true,
        }
        self
    }

    pub fn cache(&self) -> bool {
        match self {
            ContentItem::Text { cache, .. } | ContentItem::Image { cache, .. } => *cache,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentItem::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentItem::Image { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
/// Message body: a plain string or an ordered list of items
pub enum Content {
    Text(String),
    Items(Vec<ContentItem>),
}

impl Content {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Content::Text(text.into())
    }

    /// Concatenate every text item with `separator`, skipping non-text items
    pub fn joined_text(&self, separator: &str) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Items(items) => items
                .iter()
                .filter_map(ContentItem::as_text)
                .collect::<Vec<_>>()
                .join(separator),
        }
    }

    /// View the body as items; a plain string becomes a single uncached text item
    pub fn to_items(&self) -> Vec<ContentItem> {
        match self {
            Content::Text(text) => vec![ContentItem::text(text.clone())],
            Content::Items(items) => items.clone(),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Vec<ContentItem>> for Content {
    fn from(items: Vec<ContentItem>) -> Self {
        Content::Items(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_item_serialization() {
        let item = ContentItem::text("hello");
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({"type": "text", "text": "hello"})
        );

        let image = ContentItem::image("aGVsbG8=", "image/png").cached();
        assert_eq!(
            serde_json::to_value(&image).unwrap(),
            json!({"type": "image", "mime_type": "image/png", "data": "aGVsbG8=", "cache": true})
        );
    }

    #[test]
    fn test_joined_text_skips_images() {
        let content = Content::Items(vec![
            ContentItem::text("a"),
            ContentItem::image("xx", "image/png"),
            ContentItem::text("b"),
        ]);
        assert_eq!(content.joined_text("\n"), "a\nb");
        assert_eq!(Content::text("plain").joined_text("\n"), "plain");
    }
}
