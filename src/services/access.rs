use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::Video;

/// Videos anyone may stream in full: the first `per_category` videos of each
/// category, in catalog order. Videos without a category form their own group.
#[derive(Debug, Clone, Default)]
pub struct FreePreviewSet {
    ids: HashSet<Uuid>,
}

impl FreePreviewSet {
    /// Computed once per catalog load
    pub fn from_catalog(videos: &[Video], per_category: usize) -> Self {
        let mut seen: HashMap<Option<Uuid>, usize> = HashMap::new();
        let mut ids = HashSet::new();

        for video in videos {
            let count = seen.entry(video.category_id).or_insert(0);
            if *count < per_category {
                ids.insert(video.id);
                *count += 1;
            }
        }

        Self { ids }
    }

    pub fn contains(&self, video_id: &Uuid) -> bool {
        self.ids.contains(video_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Why a viewer may stream the full video
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessGrant {
    Subscription,
    Purchase,
    FreePreview,
    /// Trailer only
    None,
}

impl AccessGrant {
    pub fn has_access(&self) -> bool {
        !matches!(self, AccessGrant::None)
    }
}

/// Full-stream access decision
///
/// access = subscribed OR purchased OR in the free preview set
pub fn access_for(is_subscriber: bool, has_purchased: bool, in_free_preview: bool) -> AccessGrant {
    if is_subscriber {
        AccessGrant::Subscription
    } else if has_purchased {
        AccessGrant::Purchase
    } else if in_free_preview {
        AccessGrant::FreePreview
    } else {
        AccessGrant::None
    }
}

/// URL the player should load for this viewer
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StreamResolution {
    pub video_id: Uuid,
    pub url: String,
    pub is_trailer: bool,
    pub access: AccessGrant,
}

pub fn resolve_stream(video: &Video, access: AccessGrant) -> StreamResolution {
    let (url, is_trailer) = if access.has_access() {
        (video.full_video_url.clone(), false)
    } else {
        (video.trailer_url.clone(), true)
    };

    StreamResolution {
        video_id: video.id,
        url,
        is_trailer,
        access,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn video(category: Option<Uuid>) -> Video {
        Video {
            id: Uuid::new_v4(),
            title: "Video".to_string(),
            description: String::new(),
            thumbnail_url: String::new(),
            trailer_url: "https://cdn/trailer.mp4".to_string(),
            full_video_url: "https://cdn/full.mp4".to_string(),
            duration_minutes: 45,
            price: 19.99,
            category_id: category,
            category_name: None,
            is_featured: false,
            is_new: false,
            view_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_free_preview_first_two_per_category() {
        let gst = Some(Uuid::new_v4());
        let income = Some(Uuid::new_v4());
        let catalog = vec![
            video(gst),
            video(income),
            video(gst),
            video(gst),
            video(income),
            video(income),
            video(None),
        ];

        let preview = FreePreviewSet::from_catalog(&catalog, 2);
        assert_eq!(preview.len(), 5);
        assert!(preview.contains(&catalog[0].id));
        assert!(preview.contains(&catalog[1].id));
        assert!(preview.contains(&catalog[2].id));
        assert!(!preview.contains(&catalog[3].id));
        assert!(preview.contains(&catalog[4].id));
        assert!(!preview.contains(&catalog[5].id));
        assert!(preview.contains(&catalog[6].id));
    }

    #[test]
    fn test_free_preview_disabled_with_zero() {
        let catalog = vec![video(None), video(None)];
        assert!(FreePreviewSet::from_catalog(&catalog, 0).is_empty());
    }

    #[test]
    fn test_preview_video_accessible_regardless_of_state() {
        for subscribed in [false, true] {
            for purchased in [false, true] {
                assert!(access_for(subscribed, purchased, true).has_access());
            }
        }
    }

    #[test]
    fn test_non_preview_video_requires_subscription_or_purchase() {
        assert_eq!(access_for(false, false, false), AccessGrant::None);
        assert_eq!(access_for(true, false, false), AccessGrant::Subscription);
        assert_eq!(access_for(false, true, false), AccessGrant::Purchase);
        assert_eq!(access_for(true, true, false), AccessGrant::Subscription);
    }

    #[test]
    fn test_resolve_stream_picks_trailer_without_access() {
        let v = video(None);
        let locked = resolve_stream(&v, AccessGrant::None);
        assert!(locked.is_trailer);
        assert_eq!(locked.url, "https://cdn/trailer.mp4");

        let open = resolve_stream(&v, AccessGrant::FreePreview);
        assert!(!open.is_trailer);
        assert_eq!(open.url, "https://cdn/full.mp4");
    }
}
