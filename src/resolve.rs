//! Field resolution engine
//!
//! Each output field is an ordered table of [`Rule`]s. A rule reads one
//! [`Probe`] from the document and vets the raw value; the first rule that
//! yields a value wins. The engine is backend-agnostic: it only sees the
//! [`Dom`] capability.

use url::Url;

use crate::dom::{Dom, Probe};
use crate::metadata::PageMetadata;
use crate::url_shape::{NormalizedUrl, is_web_url, strip_www};

/// How a raw, non-empty probe value becomes a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Accept as-is
    Present,
    /// Must pass the URL shape heuristic
    WebUrl,
    /// Rewrite scheme-less values onto the request origin, then shape-check
    OriginRelativeWebUrl,
    /// Resolve against the request URL; the result must be absolute
    AbsoluteHref,
    /// Resolve against the request URL and reduce to the bare hostname
    Hostname,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub probe: Probe,
    pub check: Check,
}

const fn rule(probe: Probe, check: Check) -> Rule {
    Rule { probe, check }
}

pub const TITLE_RULES: &[Rule] = &[
    rule(Probe::attr(r#"meta[property="og:title"]"#, "content"), Check::Present),
    rule(Probe::text("title"), Check::Present),
    rule(Probe::inner_html("h1"), Check::Present),
    rule(Probe::inner_html("h2"), Check::Present),
];

pub const DESCRIPTION_RULES: &[Rule] = &[
    rule(Probe::attr(r#"meta[property="og:description"]"#, "content"), Check::Present),
    rule(
        Probe::attr(
            r#"meta[name="twitter:description"], meta[property="twitter:description"]"#,
            "content",
        ),
        Check::Present,
    ),
    rule(Probe::attr(r#"meta[name="description"]"#, "content"), Check::Present),
    rule(Probe::visible_leaf_text("p"), Check::Present),
];

pub const IMAGE_RULES: &[Rule] = &[
    rule(Probe::attr(r#"meta[property="og:image:secure_url"]"#, "content"), Check::WebUrl),
    rule(Probe::attr(r#"meta[property="og:image"]"#, "content"), Check::WebUrl),
    rule(Probe::attr(r#"link[rel="image_src"]"#, "href"), Check::WebUrl),
    rule(
        Probe::attr(
            r#"meta[name="twitter:image"], meta[property="twitter:image"]"#,
            "content",
        ),
        Check::WebUrl,
    ),
    rule(Probe::attr("img", "src"), Check::OriginRelativeWebUrl),
];

pub const DOMAIN_RULES: &[Rule] = &[
    rule(Probe::attr(r#"link[rel="canonical"]"#, "href"), Check::Hostname),
    rule(Probe::attr(r#"meta[property="og:url"]"#, "content"), Check::Hostname),
];

pub const FAVICON_RULES: &[Rule] = &[
    rule(Probe::attr(r#"link[rel="shortcut icon"]"#, "href"), Check::AbsoluteHref),
    rule(Probe::attr(r#"link[rel="icon"]"#, "href"), Check::AbsoluteHref),
];

pub const SITE_NAME_RULES: &[Rule] = &[rule(
    Probe::attr(r#"meta[property="og:site_name"]"#, "content"),
    Check::Present,
)];

/// Every probe any field may read, in table order
///
/// The rendered backend answers exactly this list in one in-page evaluation.
pub fn all_probes() -> Vec<Probe> {
    [
        TITLE_RULES,
        DESCRIPTION_RULES,
        IMAGE_RULES,
        DOMAIN_RULES,
        FAVICON_RULES,
        SITE_NAME_RULES,
    ]
    .into_iter()
    .flatten()
    .map(|rule| rule.probe)
    .collect()
}

/// Resolve all six fields from a document snapshot
///
/// Pure: reads the document and the request URL, touches nothing else.
pub fn resolve(dom: &dyn Dom, request_url: &NormalizedUrl) -> PageMetadata {
    let field = |rules: &[Rule]| first_match(dom, rules, request_url);

    PageMetadata {
        title: field(TITLE_RULES),
        description: field(DESCRIPTION_RULES),
        image: field(IMAGE_RULES),
        domain: field(DOMAIN_RULES).unwrap_or_else(|| request_url.bare_host()),
        favicon: field(FAVICON_RULES),
        site_name: field(SITE_NAME_RULES),
    }
}

fn first_match(dom: &dyn Dom, rules: &[Rule], request_url: &NormalizedUrl) -> Option<String> {
    rules.iter().find_map(|rule| {
        let raw = dom.read(&rule.probe).filter(|value| !value.is_empty())?;
        apply_check(rule.check, raw, request_url)
    })
}

fn apply_check(check: Check, raw: String, request_url: &NormalizedUrl) -> Option<String> {
    match check {
        Check::Present => Some(raw),
        Check::WebUrl => is_web_url(&raw).then_some(raw),
        Check::OriginRelativeWebUrl => {
            let candidate = absolutize_against_origin(&raw, request_url);
            is_web_url(&candidate).then_some(candidate)
        }
        Check::AbsoluteHref => request_url.url().join(&raw).ok().map(String::from),
        Check::Hostname => request_url
            .url()
            .join(&raw)
            .ok()
            .as_ref()
            .and_then(Url::host_str)
            .filter(|host| !host.is_empty())
            .map(strip_www),
    }
}

/// `{origin}/{src}` for values without a `//` separator, otherwise unchanged
fn absolutize_against_origin(src: &str, request_url: &NormalizedUrl) -> String {
    if src.contains("//") {
        src.to_string()
    } else {
        format!("{}/{}", request_url.origin(), src.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::StaticDom;
    use crate::url_shape::normalize;

    fn resolve_html(html: &str, url: &str) -> PageMetadata {
        let dom = StaticDom::parse(html);
        resolve(&dom, &normalize(url).unwrap())
    }

    #[test]
    fn og_title_wins_over_every_other_title_source() {
        let meta = resolve_html(
            r#"<html><head><meta property="og:title" content="OG Title">
               <title>Doc Title</title></head>
               <body><h1>H1</h1><h2>H2</h2></body></html>"#,
            "https://example.com",
        );
        assert_eq!(meta.title.as_deref(), Some("OG Title"));
    }

    #[test]
    fn title_falls_through_empty_sources_to_headings() {
        let meta = resolve_html(
            r#"<html><head><meta property="og:title" content=""><title></title></head>
               <body><h2>Second</h2><h1>First <b>bold</b></h1></body></html>"#,
            "https://example.com",
        );
        assert_eq!(meta.title.as_deref(), Some("First <b>bold</b>"));
    }

    #[test]
    fn title_is_absent_not_empty_when_no_source_exists() {
        let meta = resolve_html("<html><body><p></p></body></html>", "https://example.com");
        assert_eq!(meta.title, None);
    }

    #[test]
    fn description_priority_order() {
        let both = resolve_html(
            r#"<head><meta name="description" content="meta">
               <meta name="twitter:description" content="twitter"></head>"#,
            "https://example.com",
        );
        assert_eq!(both.description.as_deref(), Some("twitter"));

        let paragraph_only = resolve_html(
            "<body><p><a>link</a></p><p>Leaf paragraph</p></body>",
            "https://example.com",
        );
        assert_eq!(paragraph_only.description.as_deref(), Some("Leaf paragraph"));
    }

    #[test]
    fn og_description_beats_twitter_description() {
        let meta = resolve_html(
            r#"<head><meta name="twitter:description" content="twitter">
               <meta property="og:description" content="og">
               <meta name="description" content="meta"></head>"#,
            "https://example.com",
        );
        assert_eq!(meta.description.as_deref(), Some("og"));
    }

    #[test]
    fn invalid_og_image_falls_through_to_image_src_link() {
        let meta = resolve_html(
            r#"<head><meta property="og:image" content="not-a-url">
               <link rel="image_src" href="https://a.example.com/x.png">
               <meta name="twitter:image" content="https://t.example.com/y.png"></head>
               <body><img src="/z.png"></body>"#,
            "https://example.com",
        );
        assert_eq!(meta.image.as_deref(), Some("https://a.example.com/x.png"));
    }

    #[test]
    fn invalid_image_src_falls_through_to_twitter_image_before_img() {
        let meta = resolve_html(
            r#"<head><link rel="image_src" href="/relative.png">
               <meta property="twitter:image" content="https://t.example.com/y.png"></head>
               <body><img src="/z.png"></body>"#,
            "https://example.com",
        );
        assert_eq!(meta.image.as_deref(), Some("https://t.example.com/y.png"));
    }

    #[test]
    fn invalid_og_image_falls_through_to_next_candidate() {
        let meta = resolve_html(
            r#"<head><meta property="og:image:secure_url" content="//cdn.example.com/a.png">
               <meta property="og:image" content="https://cdn.example.com/b.png"></head>
               <body><img src="/c.png"></body>"#,
            "https://example.com",
        );
        assert_eq!(meta.image.as_deref(), Some("https://cdn.example.com/b.png"));
    }

    #[test]
    fn relative_img_is_rewritten_onto_request_origin() {
        let meta = resolve_html(
            r#"<body><img src="/logo.png"><img src="/other.png"></body>"#,
            "https://example.com/article",
        );
        assert_eq!(meta.image.as_deref(), Some("https://example.com/logo.png"));

        let no_slash = resolve_html(
            r#"<body><img src="images/a.png"></body>"#,
            "https://example.com/blog/post",
        );
        assert_eq!(no_slash.image.as_deref(), Some("https://example.com/images/a.png"));
    }

    #[test]
    fn protocol_relative_img_is_not_rewritten_and_fails_validation() {
        let meta = resolve_html(
            r#"<body><img src="//cdn.example.com/a.png"></body>"#,
            "https://example.com",
        );
        assert_eq!(meta.image, None);
    }

    #[test]
    fn domain_falls_back_to_request_host_without_www() {
        let meta = resolve_html("<html></html>", "https://www.example.com/page");
        assert_eq!(meta.domain, "example.com");
    }

    #[test]
    fn domain_prefers_canonical_then_og_url() {
        let canonical = resolve_html(
            r#"<head><link rel="canonical" href="https://www.canonical.org/x">
               <meta property="og:url" content="https://og.net/y"></head>"#,
            "https://example.com",
        );
        assert_eq!(canonical.domain, "canonical.org");

        let og_url = resolve_html(
            r#"<head><meta property="og:url" content="https://og.net/y"></head>"#,
            "https://example.com",
        );
        assert_eq!(og_url.domain, "og.net");
    }

    #[test]
    fn relative_canonical_resolves_to_request_host() {
        let meta = resolve_html(
            r#"<head><link rel="canonical" href="/story/1"></head>"#,
            "http://www.news.example.com/story/1?ref=x",
        );
        assert_eq!(meta.domain, "news.example.com");
    }

    #[test]
    fn favicon_prefers_shortcut_icon_and_is_absolute() {
        let meta = resolve_html(
            r#"<head><link rel="icon" href="/icon.png">
               <link rel="shortcut icon" href="/favicon.ico"></head>"#,
            "https://example.com/a/b",
        );
        assert_eq!(meta.favicon.as_deref(), Some("https://example.com/favicon.ico"));

        let icon_only = resolve_html(
            r#"<head><link rel="icon" href="https://static.example.com/i.png"></head>"#,
            "https://example.com",
        );
        assert_eq!(
            icon_only.favicon.as_deref(),
            Some("https://static.example.com/i.png")
        );
    }

    #[test]
    fn whitespace_is_returned_untouched() {
        let meta = resolve_html(
            r#"<head><meta property="og:site_name" content="  Example  "></head>"#,
            "https://example.com",
        );
        assert_eq!(meta.site_name.as_deref(), Some("  Example  "));
    }

    #[test]
    fn complete_page_resolves_every_field() {
        let meta = resolve_html(
            r#"<head>
                 <meta property="og:title" content="T">
                 <meta property="og:description" content="D">
                 <meta property="og:image" content="https://example.com/i.png">
                 <meta property="og:site_name" content="S">
                 <link rel="icon" href="/f.ico">
               </head>"#,
            "https://example.com",
        );
        assert!(meta.is_complete());
    }

    #[test]
    fn probe_list_covers_every_rule() {
        let probes = all_probes();
        let rule_count = TITLE_RULES.len()
            + DESCRIPTION_RULES.len()
            + IMAGE_RULES.len()
            + DOMAIN_RULES.len()
            + FAVICON_RULES.len()
            + SITE_NAME_RULES.len();
        assert_eq!(probes.len(), rule_count);
        assert_eq!(probes[0], TITLE_RULES[0].probe);
    }
}
