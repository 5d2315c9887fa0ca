use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    #[serde(alias = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub slug: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BlogPost {
    /// Excerpt, or the first `max_chars` characters of the content.
    pub fn summary(&self, max_chars: usize) -> String {
        if let Some(excerpt) = self.excerpt.as_deref().filter(|e| !e.trim().is_empty()) {
            return excerpt.to_string();
        }
        let mut summary: String = self.content.chars().take(max_chars).collect();
        if self.content.chars().count() > max_chars {
            summary.push('…');
        }
        summary
    }
}

/// URL-safe slug derived from a title.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Dynamic QR codes: 5 tips!  "), "dynamic-qr-codes-5-tips");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn summary_prefers_excerpt() {
        let mut post: BlogPost = serde_json::from_value(serde_json::json!({
            "slug": "hello",
            "title": "Hello",
            "content": "abcdefghij"
        }))
        .unwrap();
        assert_eq!(post.summary(4), "abcd…");
        assert_eq!(post.summary(20), "abcdefghij");
        post.excerpt = Some("Short intro".into());
        assert_eq!(post.summary(4), "Short intro");
    }
}
