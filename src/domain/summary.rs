use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Content marker carried by every restricted-access sentinel.
pub const RESTRICTED_CONTENT: &str = "Access restricted";
pub const RESTRICTED_TITLE: &str = "Access Restricted";
pub const RESTRICTED_DESCRIPTION: &str = "Deep crawl blocked by target security filters.";
pub const CONNECTION_LIMITED_TITLE: &str = "Connection Limited";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeadingLevel {
    pub const ALL: [HeadingLevel; 6] = [
        HeadingLevel::H1,
        HeadingLevel::H2,
        HeadingLevel::H3,
        HeadingLevel::H4,
        HeadingLevel::H5,
        HeadingLevel::H6,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            HeadingLevel::H1 => "h1",
            HeadingLevel::H2 => "h2",
            HeadingLevel::H3 => "h3",
            HeadingLevel::H4 => "h4",
            HeadingLevel::H5 => "h5",
            HeadingLevel::H6 => "h6",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAlt {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSpeedIndicator {
    pub image_count: usize,
    pub script_count: usize,
    pub css_count: usize,
}

/// Fixed-shape extraction of a single page, or the restricted-access sentinel.
///
/// `is_simulated` is the only reliable way to tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub url: String,
    pub title: String,
    pub description: String,
    pub headings: BTreeMap<HeadingLevel, Vec<String>>,
    pub internal_link_count: usize,
    pub external_link_count: usize,
    pub image_alt_tags: Vec<ImageAlt>,
    pub content: String,
    pub load_speed_indicator: LoadSpeedIndicator,
    pub is_simulated: bool,
}

impl PageSummary {
    pub fn restricted(url: &str) -> Self {
        Self {
            url: url.to_string(),
            title: RESTRICTED_TITLE.to_string(),
            description: RESTRICTED_DESCRIPTION.to_string(),
            headings: BTreeMap::new(),
            internal_link_count: 0,
            external_link_count: 0,
            image_alt_tags: Vec::new(),
            content: RESTRICTED_CONTENT.to_string(),
            load_speed_indicator: LoadSpeedIndicator::default(),
            is_simulated: true,
        }
    }

    pub fn connection_limited(url: &str, status: u16) -> Self {
        Self {
            title: CONNECTION_LIMITED_TITLE.to_string(),
            content: format!("Response status {status}. Analyzing via domain intelligence."),
            ..Self::restricted(url)
        }
    }

    pub fn is_restricted_content(&self) -> bool {
        self.content == RESTRICTED_CONTENT
    }

    pub fn has_usable_data(&self) -> bool {
        !self.title.is_empty() || !self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_limited_keeps_sentinel_counts() {
        let summary = PageSummary::connection_limited("https://example.com", 502);
        assert!(summary.is_simulated);
        assert_eq!(summary.title, CONNECTION_LIMITED_TITLE);
        assert!(summary.content.contains("502"));
        assert_eq!(summary.internal_link_count, 0);
        assert_eq!(summary.external_link_count, 0);
        assert!(summary.image_alt_tags.is_empty());
        assert_eq!(summary.load_speed_indicator, LoadSpeedIndicator::default());
        assert!(!summary.is_restricted_content());
    }

    #[test]
    fn headings_serialize_with_tag_keys() {
        let mut summary = PageSummary::restricted("https://example.com");
        summary
            .headings
            .insert(HeadingLevel::H2, vec!["Pricing".to_string()]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["headings"]["h2"][0], "Pricing");
        assert_eq!(json["loadSpeedIndicator"]["cssCount"], 0);
        assert_eq!(json["isSimulated"], true);
    }
}
