use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog video. Immutable from the service's point of view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub thumbnail_url: String,
    pub trailer_url: String,
    pub full_video_url: String,
    pub duration_minutes: i32,
    pub price: f64,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    /// Joined from the categories table
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Video {
    /// Case-insensitive match against title, description and category name
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self
                .category_name
                .as_deref()
                .map(|name| name.to_lowercase().contains(&needle))
                .unwrap_or(false)
    }
}

/// Static grouping of videos
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub display_order: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(title: &str, description: &str, category: Option<&str>) -> Video {
        Video {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            thumbnail_url: String::new(),
            trailer_url: String::new(),
            full_video_url: String::new(),
            duration_minutes: 45,
            price: 19.99,
            category_id: None,
            category_name: category.map(str::to_string),
            is_featured: false,
            is_new: false,
            view_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_matches_query_title_case_insensitive() {
        let v = video("GST Fundamentals", "Overview", None);
        assert!(v.matches_query("gst"));
        assert!(v.matches_query("  FUNDAMENTALS "));
        assert!(!v.matches_query("stamp"));
    }

    #[test]
    fn test_matches_query_description_and_category() {
        let v = video("Overview", "Understanding input tax claims", Some("Income Tax"));
        assert!(v.matches_query("input tax"));
        assert!(v.matches_query("income"));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let v = video("Anything", "", None);
        assert!(v.matches_query(""));
        assert!(v.matches_query("   "));
    }
}
