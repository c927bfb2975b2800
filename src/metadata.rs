use serde::{Deserialize, Serialize};

/// Preview metadata resolved for one page
///
/// Every field except `domain` may be absent. `domain` always falls back to
/// the hostname of the requested URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Absolute image URL
    pub image: Option<String>,
    /// Hostname with a leading `www.` stripped
    pub domain: String,
    /// Absolute favicon URL
    pub favicon: Option<String>,
    pub site_name: Option<String>,
}

impl PageMetadata {
    /// True when every field is present
    ///
    /// An incomplete static result escalates to the rendered path.
    pub fn is_complete(&self) -> bool {
        self.title.is_some()
            && self.description.is_some()
            && !self.domain.is_empty()
            && self.image.is_some()
            && self.favicon.is_some()
            && self.site_name.is_some()
    }

    /// Names of the absent fields, for logging escalation decisions
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("title", self.title.is_none()),
            ("description", self.description.is_none()),
            ("domain", self.domain.is_empty()),
            ("image", self.image.is_none()),
            ("favicon", self.favicon.is_none()),
            ("siteName", self.site_name.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> PageMetadata {
        PageMetadata {
            title: Some("Title".into()),
            description: Some("Description".into()),
            image: Some("https://example.com/a.png".into()),
            domain: "example.com".into(),
            favicon: Some("https://example.com/favicon.ico".into()),
            site_name: Some("Example".into()),
        }
    }

    #[test]
    fn completeness_requires_all_six_fields() {
        assert!(complete().is_complete());

        let mut partial = complete();
        partial.favicon = None;
        assert!(!partial.is_complete());
        assert_eq!(partial.missing_fields(), vec!["favicon"]);
    }

    #[test]
    fn serializes_with_camel_case_and_nulls() {
        let meta = PageMetadata {
            domain: "example.com".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["domain"], "example.com");
        assert!(json["siteName"].is_null());
        assert!(json["image"].is_null());
    }
}
