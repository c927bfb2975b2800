//! Narrow DOM capability shared by both extraction backends
//!
//! The resolution engine only ever asks one kind of question: "what does this
//! [`Probe`] read on this document?". Two backends answer it:
//!
//! - [`StaticDom`] parses raw HTML with `scraper` (no scripts run, so only
//!   attributes literally present in the markup are visible)
//! - [`SnapshotDom`] holds the answers a live browser page gave to the same
//!   probes, collected in one in-page evaluation by [`probe_script`]

use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::{trace, warn};

/// What to read from the first element matching a probe's selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Read {
    /// Attribute value, exactly as written
    Attr(&'static str),
    /// Concatenated text content
    Text,
    /// Serialized inner markup
    InnerHtml,
    /// Text of the first matching element that has no element children,
    /// is not hidden, and contains a non-whitespace character
    VisibleLeafText,
}

/// One query against a document: a CSS selector plus what to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Probe {
    pub selector: &'static str,
    pub read: Read,
}

impl Probe {
    pub const fn attr(selector: &'static str, name: &'static str) -> Self {
        Self {
            selector,
            read: Read::Attr(name),
        }
    }

    pub const fn text(selector: &'static str) -> Self {
        Self {
            selector,
            read: Read::Text,
        }
    }

    pub const fn inner_html(selector: &'static str) -> Self {
        Self {
            selector,
            read: Read::InnerHtml,
        }
    }

    pub const fn visible_leaf_text(selector: &'static str) -> Self {
        Self {
            selector,
            read: Read::VisibleLeafText,
        }
    }
}

/// Read-only document capability
///
/// Returns the raw value (no trimming). `None` means the element or the
/// attribute is missing; empty strings are returned as-is and filtered by
/// the caller.
pub trait Dom {
    fn read(&self, probe: &Probe) -> Option<String>;
}

/// Document parsed from raw HTML without executing scripts
pub struct StaticDom {
    document: Html,
}

impl StaticDom {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }
}

impl Dom for StaticDom {
    fn read(&self, probe: &Probe) -> Option<String> {
        let selector = match Selector::parse(probe.selector) {
            Ok(selector) => selector,
            Err(e) => {
                warn!("Skipping probe with invalid selector '{}': {}", probe.selector, e);
                return None;
            }
        };

        let mut matches = self.document.select(&selector);
        match probe.read {
            Read::Attr(name) => matches.next()?.value().attr(name).map(str::to_string),
            Read::Text => matches.next().map(|el| el.text().collect()),
            Read::InnerHtml => matches.next().map(|el| el.inner_html()),
            Read::VisibleLeafText => matches
                .find(|el| is_leaf(el) && !is_hidden(el) && has_visible_text(el))
                .map(|el| el.text().collect()),
        }
    }
}

fn is_leaf(el: &ElementRef<'_>) -> bool {
    el.children().all(|child| !child.value().is_element())
}

fn has_visible_text(el: &ElementRef<'_>) -> bool {
    el.text().any(|chunk| chunk.chars().any(|c| !c.is_whitespace()))
}

/// Static approximation of visibility: `hidden` attribute or inline
/// `display: none` on the element or any ancestor.
fn is_hidden(el: &ElementRef<'_>) -> bool {
    std::iter::once(*el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .any(|node| {
            let value = node.value();
            value.attr("hidden").is_some()
                || value.attr("style").is_some_and(|style| {
                    style
                        .chars()
                        .filter(|c| !c.is_whitespace())
                        .collect::<String>()
                        .to_ascii_lowercase()
                        .contains("display:none")
                })
        })
}

/// Answers a live page gave to a fixed set of probes
#[derive(Debug, Default, Clone)]
pub struct SnapshotDom {
    values: HashMap<Probe, String>,
}

impl SnapshotDom {
    /// Pair probes with the values returned by [`probe_script`], in order
    ///
    /// Extra or missing values are tolerated: unmatched probes read as absent.
    pub fn from_values(probes: &[Probe], values: Vec<Option<String>>) -> Self {
        if probes.len() != values.len() {
            warn!(
                "Probe snapshot size mismatch: {} probes, {} values",
                probes.len(),
                values.len()
            );
        }

        let values = probes
            .iter()
            .zip(values)
            .filter_map(|(probe, value)| value.map(|v| (*probe, v)))
            .collect::<HashMap<_, _>>();

        trace!("Probe snapshot holds {} values", values.len());
        Self { values }
    }
}

impl Dom for SnapshotDom {
    fn read(&self, probe: &Probe) -> Option<String> {
        self.values.get(probe).cloned()
    }
}

/// Build the in-page expression that answers `probes` against the live DOM
///
/// Evaluates to an array with one `string | null` per probe, in order. The
/// script only reads; it never mutates the document.
pub fn probe_script(probes: &[Probe]) -> Result<String, serde_json::Error> {
    let probes_json = serde_json::to_string(probes)?;
    Ok(format!(
        r#"(() => {{
  const probes = {probes_json};
  const visible = (el) => el.getClientRects().length > 0;
  const readOne = ({{ selector, read }}) => {{
    if (read.kind === 'visible_leaf_text') {{
      for (const el of document.querySelectorAll(selector)) {{
        const text = el.textContent || '';
        if (el.children.length === 0 && visible(el) && /\S/.test(text)) return text;
      }}
      return null;
    }}
    const el = document.querySelector(selector);
    if (!el) return null;
    switch (read.kind) {{
      case 'attr': return el.getAttribute(read.name);
      case 'text': return el.textContent;
      case 'inner_html': return el.innerHTML;
      default: return null;
    }}
  }};
  return probes.map((probe) => {{
    try {{ return readOne(probe); }} catch (_) {{ return null; }}
  }});
}})()"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"<!doctype html>
<html><head>
  <title> Padded Title </title>
  <meta property="og:title" content="">
  <meta name="description" content="plain description">
</head><body>
  <p hidden>hidden paragraph</p>
  <div style="display: none"><p>inside hidden div</p></div>
  <p><span>has child</span></p>
  <p>   </p>
  <p> first visible leaf </p>
  <h1>Heading <em>one</em></h1>
</body></html>"#;

    #[test]
    fn reads_attributes_verbatim_including_empty() {
        let dom = StaticDom::parse(HTML);
        let og = Probe::attr(r#"meta[property="og:title"]"#, "content");
        assert_eq!(dom.read(&og).as_deref(), Some(""));
        let missing = Probe::attr(r#"meta[property="og:image"]"#, "content");
        assert_eq!(dom.read(&missing), None);
    }

    #[test]
    fn text_is_not_trimmed() {
        let dom = StaticDom::parse(HTML);
        assert_eq!(dom.read(&Probe::text("title")).as_deref(), Some(" Padded Title "));
    }

    #[test]
    fn inner_html_keeps_markup() {
        let dom = StaticDom::parse(HTML);
        assert_eq!(
            dom.read(&Probe::inner_html("h1")).as_deref(),
            Some("Heading <em>one</em>")
        );
    }

    #[test]
    fn visible_leaf_text_skips_hidden_nested_and_blank_paragraphs() {
        let dom = StaticDom::parse(HTML);
        assert_eq!(
            dom.read(&Probe::visible_leaf_text("p")).as_deref(),
            Some(" first visible leaf ")
        );
    }

    #[test]
    fn invalid_selector_reads_as_absent() {
        let dom = StaticDom::parse(HTML);
        assert_eq!(dom.read(&Probe::text("[[[")), None);
    }

    #[test]
    fn snapshot_pairs_values_with_probes() {
        let probes = [Probe::text("title"), Probe::inner_html("h1"), Probe::text("h2")];
        let dom = SnapshotDom::from_values(
            &probes,
            vec![Some("T".into()), None, Some(String::new())],
        );
        assert_eq!(dom.read(&probes[0]).as_deref(), Some("T"));
        assert_eq!(dom.read(&probes[1]), None);
        assert_eq!(dom.read(&probes[2]).as_deref(), Some(""));
    }

    #[test]
    fn probe_script_embeds_probe_table() {
        let script = probe_script(&[Probe::attr("link[rel=\"icon\"]", "href")]).unwrap();
        assert!(script.starts_with("(() => {"));
        assert!(script.contains(r#""kind":"attr","name":"href""#));
        assert!(script.contains(r#"link[rel=\"icon\"]"#));
    }
}
