//! Typed view of an exported worksheet book page.
//!
//! The page is parsed once with `scraper`; everything later stages need is
//! copied out into plain owned values so the DOM does not outlive this
//! module. Element text is the concatenated text content of the node, which
//! for worksheet text blocks is the BBcode-like markup.

use crate::error::ConvertError;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static AUTHOR_LINE: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"p[class="author"]"#).unwrap());
static AUTHOR_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"p[class="author"] > a"#).unwrap());
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"p[class="description"], p[class="bbcode-text description"]"#).unwrap()
});
static WORKSHEETS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[class="worksheet_tbl"], table[class="worksheet_tbl"]"#).unwrap()
});
static MENU_ENTRIES: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"html > body > div#content > div#menu-container > div#menu > div#sBook-menulist > ul > li[class="menu-opened"] > div[class="menu-wrapper"]"#,
    )
    .unwrap()
});
static MENU_LABEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[class="menu-item"] > p"#).unwrap());
static MENU_ITEMS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[class="submenu-items"] > ol > li"#).unwrap());
static IMAGE_CAPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[class="image-description bbcode-text"]"#).unwrap());

/// Everything the assembler reads from the page.
#[derive(Debug, Clone, PartialEq)]
pub struct BookSource {
    /// `<title>` text, untrimmed of any suffix.
    pub title: String,
    pub author: Author,
    /// Second comma-separated segment of the author paragraph, trimmed.
    /// The page already localises it, so it is copied verbatim.
    pub date: String,
    /// Raw description markup. May be empty, but the node must exist.
    pub description: String,
    /// Worksheet containers in document order.
    pub worksheets: Vec<Worksheet>,
    /// Navigation entries in menu order.
    pub menu: Vec<MenuEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Worksheet {
    pub elements: Vec<ContentElement>,
}

/// One child of a worksheet container, classified by its `class` and
/// `style` attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentElement {
    Text(String),
    /// Subtitle added by the author inside a worksheet.
    Title(String),
    Header(String),
    /// Embedded interactive applet. `script` is the node text, which carries
    /// the preview image call.
    Applet { script: String },
    Image { src: String, caption: Option<String> },
    Video { src: String },
    Unsupported { kind: String },
}

/// A top-level navigation entry and its sub-entry labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub label: String,
    pub items: Vec<String>,
}

impl BookSource {
    /// Parse a worksheet book page.
    ///
    /// Fails when the title, the author link, the date or the description
    /// node is missing. Worksheets and menu entries may be absent.
    pub fn parse(html: &str) -> Result<Self, ConvertError> {
        let doc = Html::parse_document(html);

        let title = doc
            .select(&TITLE)
            .next()
            .map(node_text)
            .ok_or(ConvertError::MissingNode { what: "title" })?;

        let link = doc
            .select(&AUTHOR_LINK)
            .next()
            .ok_or(ConvertError::MissingNode { what: "author link" })?;
        let author = Author {
            name: node_text(link).trim().to_string(),
            link: link.value().attr("href").unwrap_or_default().to_string(),
        };
        let date = doc
            .select(&AUTHOR_LINE)
            .next()
            .and_then(|p| date_segment(&node_text(p)))
            .ok_or(ConvertError::MissingNode { what: "date" })?;

        let description = doc
            .select(&DESCRIPTION)
            .next()
            .map(|p| node_text(p).trim().to_string())
            .ok_or(ConvertError::MissingNode {
                what: "description",
            })?;

        let worksheets = doc.select(&WORKSHEETS).map(read_worksheet).collect();

        let menu = doc
            .select(&MENU_ENTRIES)
            .map(read_menu_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            title,
            author,
            date,
            description,
            worksheets,
            menu,
        })
    }

}

/// "by X, Nov 17, 2016" → "Nov 17".
fn date_segment(author_line: &str) -> Option<String> {
    author_line
        .split(',')
        .nth(1)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

fn node_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// Element children of `el` with the given tag name.
fn children_named<'a>(el: ElementRef<'a>, name: &'a str) -> impl Iterator<Item = ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(move |c| c.value().name() == name)
}

fn read_worksheet(container: ElementRef<'_>) -> Worksheet {
    // `div > div` for block layouts, `tbody > tr > td` for table layouts.
    let blocks = children_named(container, "div").flat_map(|d| children_named(d, "div"));
    let cells = children_named(container, "tbody")
        .flat_map(|b| children_named(b, "tr"))
        .flat_map(|r| children_named(r, "td"));
    Worksheet {
        elements: blocks.chain(cells).map(classify).collect(),
    }
}

fn classify(el: ElementRef<'_>) -> ContentElement {
    let class = el.value().attr("class").unwrap_or_default();
    let style = el.value().attr("style").unwrap_or_default();
    let text = || node_text(el).trim().to_string();

    if class.starts_with("ws-element-text") || class == "bbcode-text" {
        ContentElement::Text(text())
    } else if class == "ws-element-title content-added-title" {
        ContentElement::Title(text())
    } else if class == "ws-element-applet" || class == "ws-element-exercise" || style == "padding: 0"
    {
        ContentElement::Applet { script: text() }
    } else if class == "ws-element-image" {
        let src = children_named(el, "img")
            .next()
            .and_then(|img| img.value().attr("src"));
        match src {
            Some(src) => ContentElement::Image {
                src: src.to_string(),
                caption: el
                    .select(&IMAGE_CAPTION)
                    .next()
                    .map(|d| node_text(d).trim().to_string())
                    .filter(|c| c != "undefined"),
            },
            None => ContentElement::Unsupported {
                kind: format!("{class} without img"),
            },
        }
    } else if class == "ws-element-video" {
        let src = children_named(el, "div")
            .flat_map(|d| children_named(d, "iframe"))
            .find_map(|f| f.value().attr("src"));
        match src {
            Some(src) => ContentElement::Video {
                src: src.to_string(),
            },
            None => ContentElement::Unsupported {
                kind: format!("{class} without iframe"),
            },
        }
    } else if class.starts_with("ws-element-header") {
        ContentElement::Header(text())
    } else {
        ContentElement::Unsupported {
            kind: class.to_string(),
        }
    }
}

fn read_menu_entry(entry: ElementRef<'_>) -> Result<MenuEntry, ConvertError> {
    let label = entry
        .select(&MENU_LABEL)
        .next()
        .map(|p| node_text(p).trim().to_string())
        .ok_or(ConvertError::MissingNode {
            what: "menu entry label",
        })?;
    let items = entry
        .select(&MENU_ITEMS)
        .map(|li| node_text(li).trim().to_string())
        .collect();
    Ok(MenuEntry { label, items })
}
