use scraper::{ElementRef, Html, Selector};

use crate::node::{from_dom_node, Node};

/// A guide page reduced to its convertible parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidePage {
    pub title: String,
    pub sections: Vec<GuideSection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideSection {
    pub heading: Option<String>,
    pub body: Vec<Node>,
}

const FALLBACK_TITLE: &str = "Steam_Guide";

/// Pulls the title and content sections out of a fetched guide page.
///
/// Sectioned guides carry one `subSection detailBox` per chapter; older
/// single-body guides expose `#guideContent` or `guide subSections` instead.
/// Returns `None` when neither shape is present.
pub fn extract_guide(html: &str) -> Option<GuidePage> {
    let doc = Html::parse_document(html);
    let title = extract_title(&doc);

    let sections = extract_sections(&doc);
    if !sections.is_empty() {
        return Some(GuidePage { title, sections });
    }

    let body = extract_single_body(&doc)?;
    Some(GuidePage {
        title,
        sections: vec![GuideSection {
            heading: None,
            body,
        }],
    })
}

fn extract_title(doc: &Html) -> String {
    if let Some(sel) = Selector::parse("div.workshopItemTitle").ok().as_ref() {
        if let Some(node) = doc.select(sel).next() {
            let text = element_text(node);
            if !text.is_empty() {
                return text;
            }
        }
    }
    if let Some(sel) = Selector::parse("title").ok().as_ref() {
        if let Some(node) = doc.select(sel).next() {
            let text = strip_steam_suffix(&element_text(node));
            if !text.is_empty() {
                return text;
            }
        }
    }
    FALLBACK_TITLE.to_string()
}

/// Drops the site-appended `:: Steam Community` tail from a `<title>`.
fn strip_steam_suffix(title: &str) -> String {
    let stripped = match title.find("::") {
        Some(idx) if title[idx + 2..].trim_start().starts_with("Steam Community") => &title[..idx],
        _ => title,
    };
    stripped.trim().to_string()
}

fn extract_sections(doc: &Html) -> Vec<GuideSection> {
    let Some(section_sel) = Selector::parse("div.subSection.detailBox").ok() else {
        return Vec::new();
    };
    let title_sel = Selector::parse("div.subSectionTitle").ok();
    let desc_sel = Selector::parse("div.subSectionDesc").ok();

    let mut sections = Vec::new();
    for section in doc.select(&section_sel) {
        let heading = title_sel
            .as_ref()
            .and_then(|sel| section.select(sel).next())
            .map(element_text)
            .filter(|text| !text.is_empty());
        let body = desc_sel
            .as_ref()
            .and_then(|sel| section.select(sel).next())
            .map(child_nodes)
            .unwrap_or_default();
        if heading.is_none() && body.is_empty() {
            continue;
        }
        sections.push(GuideSection { heading, body });
    }
    sections
}

fn extract_single_body(doc: &Html) -> Option<Vec<Node>> {
    for selector in ["div#guideContent", "div.guide.subSections"] {
        if let Some(sel) = Selector::parse(selector).ok().as_ref() {
            if let Some(node) = doc.select(sel).next() {
                return Some(child_nodes(node));
            }
        }
    }
    None
}

fn child_nodes(element: ElementRef<'_>) -> Vec<Node> {
    element.children().filter_map(from_dom_node).collect()
}

/// Text of an element with fragments trimmed and joined by single spaces.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
