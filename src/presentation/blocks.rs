//! Rich-text body serializer.
//!
//! Every block is classified into a [`BlockTag`] and handed to the render
//! function [`Serializers`] maps that tag to. Inline marks go through the same
//! table. The composed markup is passed through an `ammonia` sanitizer before
//! it leaves this module.

use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;

use crate::domain::blocks::{
    BlockStyle, ContentBlock, Decorator, HeadingLevel, Inline, ListKind, MarkDef, TextBlock,
};

use super::assets::AssetResolver;

/// Wraps already-rendered inner markup.
pub type BlockFn = fn(&str, &mut String);
/// Receives `(href, inner)`.
pub type LinkFn = fn(&str, &str, &mut String);
/// Receives `(src, alt)`.
pub type ImageFn = fn(&str, &str, &mut String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Paragraph,
    Heading(HeadingLevel),
    Blockquote,
    ListItem,
}

impl BlockTag {
    pub fn of(block: &TextBlock) -> Self {
        if block.list_item.is_some() {
            return Self::ListItem;
        }
        match block.style {
            BlockStyle::Normal => Self::Paragraph,
            BlockStyle::Heading(level) => Self::Heading(level),
            BlockStyle::Blockquote => Self::Blockquote,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Serializers {
    /// Indexed by heading level minus one.
    pub headings: [BlockFn; HeadingLevel::MAX as usize],
    pub paragraph: BlockFn,
    pub blockquote: BlockFn,
    pub list_item: BlockFn,
    pub link: LinkFn,
    pub image: ImageFn,
}

impl Default for Serializers {
    fn default() -> Self {
        Self {
            headings: [h1, h2, h3, h4, h5, h6],
            paragraph,
            blockquote,
            list_item,
            link,
            image,
        }
    }
}

impl Serializers {
    pub fn block(&self, tag: BlockTag) -> BlockFn {
        match tag {
            BlockTag::Paragraph => self.paragraph,
            BlockTag::Heading(level) => self.headings[usize::from(level.get() - 1)],
            BlockTag::Blockquote => self.blockquote,
            BlockTag::ListItem => self.list_item,
        }
    }
}

fn h1(inner: &str, out: &mut String) {
    wrap(out, "<h1 class=\"text-2xl font-bold my-3\">", inner, "</h1>");
}

fn h2(inner: &str, out: &mut String) {
    wrap(out, "<h2 class=\"text-xl font-bold my-5\">", inner, "</h2>");
}

fn h3(inner: &str, out: &mut String) {
    wrap(out, "<h3>", inner, "</h3>");
}

fn h4(inner: &str, out: &mut String) {
    wrap(out, "<h4>", inner, "</h4>");
}

fn h5(inner: &str, out: &mut String) {
    wrap(out, "<h5>", inner, "</h5>");
}

fn h6(inner: &str, out: &mut String) {
    wrap(out, "<h6>", inner, "</h6>");
}

fn paragraph(inner: &str, out: &mut String) {
    wrap(out, "<p>", inner, "</p>");
}

fn blockquote(inner: &str, out: &mut String) {
    wrap(out, "<blockquote>", inner, "</blockquote>");
}

fn list_item(inner: &str, out: &mut String) {
    wrap(out, "<li class=\"xl-4 list-disc\">", inner, "</li>");
}

fn link(href: &str, inner: &str, out: &mut String) {
    out.push_str("<a href=\"");
    out.push_str(&ammonia::clean_text(href));
    out.push_str("\" class=\"text-blue-500 hover:underline\">");
    out.push_str(inner);
    out.push_str("</a>");
}

fn image(src: &str, alt: &str, out: &mut String) {
    out.push_str("<figure><img src=\"");
    out.push_str(&ammonia::clean_text(src));
    out.push_str("\" alt=\"");
    out.push_str(&ammonia::clean_text(alt));
    out.push_str("\"></figure>");
}

fn wrap(out: &mut String, open: &str, inner: &str, close: &str) {
    out.push_str(open);
    out.push_str(inner);
    out.push_str(close);
}

pub struct BodySerializer {
    serializers: Serializers,
    assets: AssetResolver,
    sanitizer: AmmoniaBuilder<'static>,
}

impl BodySerializer {
    pub fn new(serializers: Serializers, assets: AssetResolver) -> Self {
        Self {
            serializers,
            assets,
            sanitizer: build_sanitizer(),
        }
    }

    pub fn assets(&self) -> &AssetResolver {
        &self.assets
    }

    pub fn to_html(&self, blocks: &[ContentBlock]) -> String {
        let mut out = String::new();
        let mut lists = ListStack::default();

        for block in blocks {
            match block {
                ContentBlock::Text(text) => {
                    let inner = self.inline_html(text);
                    let tag = BlockTag::of(text);
                    match (tag, text.list_item) {
                        (BlockTag::ListItem, Some(kind)) => {
                            lists.enter(kind, text.list_level(), &mut out);
                        }
                        _ => lists.close_all(&mut out),
                    }
                    (self.serializers.block(tag))(&inner, &mut out);
                }
                ContentBlock::Image(image_ref) => {
                    lists.close_all(&mut out);
                    if let Some(src) = image_ref
                        .asset_ref()
                        .and_then(|reference| self.assets.image_url(reference))
                    {
                        (self.serializers.image)(&src, &image_ref.alt, &mut out);
                    }
                }
                ContentBlock::Unsupported => {}
            }
        }
        lists.close_all(&mut out);

        self.sanitizer.clean(&out).to_string()
    }

    fn inline_html(&self, block: &TextBlock) -> String {
        let mut out = String::new();
        for child in &block.children {
            let Inline::Span(span) = child else {
                continue;
            };

            let mut html = span_text(&span.text);
            for mark in &span.marks {
                html = match Decorator::parse(mark) {
                    Some(decorator) => decorate(decorator, &html),
                    None => match block.mark_def(mark) {
                        Some(MarkDef::Link { href, .. }) => {
                            let mut linked = String::new();
                            (self.serializers.link)(href, &html, &mut linked);
                            linked
                        }
                        _ => html,
                    },
                };
            }
            out.push_str(&html);
        }
        out
    }
}

fn decorate(decorator: Decorator, inner: &str) -> String {
    let (open, close) = match decorator {
        Decorator::Strong => ("<strong>", "</strong>"),
        Decorator::Emphasis => ("<em>", "</em>"),
        Decorator::Code => ("<code>", "</code>"),
        Decorator::Underline => ("<u>", "</u>"),
        Decorator::StrikeThrough => ("<s>", "</s>"),
    };
    format!("{open}{inner}{close}")
}

/// Open lists, innermost last. A nested list is emitted inside the `<li>` that
/// precedes it, so the parent item's closing tag is deferred.
#[derive(Default)]
struct ListStack {
    open: Vec<OpenList>,
}

struct OpenList {
    kind: ListKind,
    level: u8,
    deferred_item_close: bool,
}

impl ListStack {
    fn enter(&mut self, kind: ListKind, level: u8, out: &mut String) {
        while self.open.last().is_some_and(|list| list.level > level) {
            self.close_one(out);
        }
        if self
            .open
            .last()
            .is_some_and(|list| list.level == level && list.kind != kind)
        {
            self.close_one(out);
        }

        while self.open.last().is_none_or(|list| list.level < level) {
            let next_level = self.open.last().map_or(1, |list| list.level + 1);
            if let Some(parent) = self.open.last_mut() {
                if out.ends_with("</li>") {
                    out.truncate(out.len() - "</li>".len());
                    parent.deferred_item_close = true;
                }
            }
            out.push_str(list_open_tag(kind));
            self.open.push(OpenList {
                kind,
                level: next_level,
                deferred_item_close: false,
            });
        }
    }

    fn close_one(&mut self, out: &mut String) {
        if let Some(list) = self.open.pop() {
            out.push_str(list_close_tag(list.kind));
            if let Some(parent) = self.open.last_mut() {
                if parent.deferred_item_close {
                    out.push_str("</li>");
                    parent.deferred_item_close = false;
                }
            }
        }
    }

    fn close_all(&mut self, out: &mut String) {
        while !self.open.is_empty() {
            self.close_one(out);
        }
    }
}

fn list_open_tag(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Bullet | ListKind::Other => "<ul>",
        ListKind::Number => "<ol>",
    }
}

fn list_close_tag(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Bullet | ListKind::Other => "</ul>",
        ListKind::Number => "</ol>",
    }
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();
    let url_schemes: HashSet<&'static str> = HashSet::from(["http", "https", "mailto"]);
    builder
        .url_schemes(url_schemes)
        .add_generic_attributes(&["class"])
        .link_rel(None);
    builder
}

/// Escape span text, keeping soft line breaks.
fn span_text(value: &str) -> String {
    value
        .split('\n')
        .map(ammonia::clean_text)
        .collect::<Vec<_>>()
        .join("<br>")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn serializer() -> BodySerializer {
        BodySerializer::new(
            Serializers::default(),
            AssetResolver::new("proj", "production"),
        )
    }

    fn blocks(value: serde_json::Value) -> Vec<ContentBlock> {
        serde_json::from_value(value).expect("blocks")
    }

    fn text(style: &str, body: &str) -> serde_json::Value {
        json!({
            "_type": "block",
            "style": style,
            "children": [ { "_type": "span", "text": body, "marks": [] } ],
        })
    }

    fn item(kind: &str, level: u8, body: &str) -> serde_json::Value {
        json!({
            "_type": "block",
            "style": "normal",
            "listItem": kind,
            "level": level,
            "children": [ { "_type": "span", "text": body, "marks": [] } ],
        })
    }

    #[test]
    fn dispatches_headings_and_paragraphs() {
        let html = serializer().to_html(&blocks(json!([
            text("h1", "Title"),
            text("h2", "Sub"),
            text("h4", "Deep"),
            text("normal", "Body"),
            text("blockquote", "Quote"),
        ])));

        assert_eq!(
            html,
            "<h1 class=\"text-2xl font-bold my-3\">Title</h1>\
             <h2 class=\"text-xl font-bold my-5\">Sub</h2>\
             <h4>Deep</h4>\
             <p>Body</p>\
             <blockquote>Quote</blockquote>"
        );
    }

    #[test]
    fn groups_and_nests_list_items() {
        let html = serializer().to_html(&blocks(json!([
            item("bullet", 1, "one"),
            item("bullet", 2, "one-a"),
            item("bullet", 1, "two"),
            item("number", 1, "first"),
            text("normal", "after"),
        ])));

        assert_eq!(
            html,
            "<ul><li class=\"xl-4 list-disc\">one\
             <ul><li class=\"xl-4 list-disc\">one-a</li></ul></li>\
             <li class=\"xl-4 list-disc\">two</li></ul>\
             <ol><li class=\"xl-4 list-disc\">first</li></ol>\
             <p>after</p>"
        );
    }

    #[test]
    fn renders_links_and_decorators() {
        let html = serializer().to_html(&blocks(json!([{
            "_type": "block",
            "style": "normal",
            "children": [
                { "_type": "span", "text": "see ", "marks": [] },
                { "_type": "span", "text": "docs", "marks": ["strong", "k1"] }
            ],
            "markDefs": [ { "_type": "link", "_key": "k1", "href": "https://example.com/docs" } ]
        }])));

        assert_eq!(
            html,
            "<p>see <a href=\"https://example.com/docs\" class=\"text-blue-500 hover:underline\">\
             <strong>docs</strong></a></p>"
        );
    }

    #[test]
    fn escapes_text_and_drops_script_links() {
        let html = serializer().to_html(&blocks(json!([{
            "_type": "block",
            "style": "normal",
            "children": [
                { "_type": "span", "text": "<script>alert(1)</script>", "marks": [] },
                { "_type": "span", "text": "click", "marks": ["bad"] }
            ],
            "markDefs": [ { "_type": "link", "_key": "bad", "href": "javascript:alert(1)" } ]
        }])));

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("javascript:"));
        assert!(html.contains("click"));
    }

    #[test]
    fn quotes_and_line_breaks_survive_escaping() {
        let html = serializer().to_html(&blocks(json!([
            text("normal", "Tom's \"best\" a<b & c\nline two"),
        ])));

        assert_eq!(
            html,
            "<p>Tom's \"best\" a&lt;b &amp; c<br>line two</p>"
        );
    }

    #[test]
    fn unfamiliar_list_style_renders_as_bullets() {
        let html = serializer().to_html(&blocks(json!([
            item("checkbox", 1, "todo"),
            item("checkbox", 1, "done"),
            item("number", 1, "first"),
        ])));

        assert_eq!(
            html,
            "<ul><li class=\"xl-4 list-disc\">todo</li>\
             <li class=\"xl-4 list-disc\">done</li></ul>\
             <ol><li class=\"xl-4 list-disc\">first</li></ol>"
        );
    }

    #[test]
    fn images_resolve_through_assets() {
        let html = serializer().to_html(&blocks(json!([
            { "_type": "image", "asset": { "_ref": "image-abc-10x20-png" }, "alt": "chart" },
            { "_type": "image", "asset": { "_ref": "not-an-image" } },
            { "_type": "code", "code": "fn main() {}" }
        ])));

        assert_eq!(
            html,
            "<figure><img src=\"https://cdn.sanity.io/images/proj/production/abc-10x20.png\" alt=\"chart\"></figure>"
        );
    }
}
