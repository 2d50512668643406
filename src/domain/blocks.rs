//! Typed rich-text blocks.
//!
//! The store ships article bodies as a flat array of portable-text objects.
//! Only the shapes the renderer knows how to draw are modelled; anything else
//! deserializes into [`ContentBlock::Unsupported`] and renders nothing.

use serde::{Deserialize, Deserializer};

use super::entities::{ImageRef, nullable};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "_type")]
pub enum ContentBlock {
    #[serde(rename = "block")]
    Text(TextBlock),
    #[serde(rename = "image")]
    Image(ImageRef),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    #[serde(default)]
    pub style: BlockStyle,
    #[serde(default)]
    pub list_item: Option<ListKind>,
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default, deserialize_with = "nullable")]
    pub children: Vec<Inline>,
    #[serde(default, deserialize_with = "nullable")]
    pub mark_defs: Vec<MarkDef>,
}

impl TextBlock {
    /// Nesting depth of a list item, starting at 1.
    pub fn list_level(&self) -> u8 {
        self.level.unwrap_or(1).max(1)
    }

    /// Look up the annotation a mark key points at, if any.
    pub fn mark_def(&self, key: &str) -> Option<&MarkDef> {
        self.mark_defs.iter().find(|def| def.key() == Some(key))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockStyle {
    #[default]
    Normal,
    Heading(HeadingLevel),
    Blockquote,
}

impl BlockStyle {
    /// Unknown styles degrade to a plain paragraph.
    pub fn parse(value: &str) -> Self {
        match value {
            "blockquote" => Self::Blockquote,
            other => other
                .strip_prefix('h')
                .and_then(|digits| digits.parse::<u8>().ok())
                .and_then(HeadingLevel::new)
                .map_or(Self::Normal, Self::Heading),
        }
    }
}

impl<'de> Deserialize<'de> for BlockStyle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.as_deref().map_or(Self::Normal, Self::parse))
    }
}

/// Heading level in the closed range `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub const MAX: u8 = 6;

    pub fn new(level: u8) -> Option<Self> {
        (1..=Self::MAX).contains(&level).then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Number,
    /// A list style the renderer has no markup for, drawn as bullets.
    Other,
}

impl ListKind {
    pub fn parse(value: &str) -> Self {
        match value {
            "bullet" => Self::Bullet,
            "number" => Self::Number,
            _ => Self::Other,
        }
    }
}

impl<'de> Deserialize<'de> for ListKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "_type")]
pub enum Inline {
    #[serde(rename = "span")]
    Span(Span),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Span {
    #[serde(default, deserialize_with = "nullable")]
    pub text: String,
    #[serde(default, deserialize_with = "nullable")]
    pub marks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "_type")]
pub enum MarkDef {
    #[serde(rename = "link")]
    Link {
        #[serde(rename = "_key")]
        key: String,
        #[serde(default, deserialize_with = "nullable")]
        href: String,
    },
    #[serde(other)]
    Unsupported,
}

impl MarkDef {
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Link { key, .. } => Some(key),
            Self::Unsupported => None,
        }
    }
}

/// Inline formatting a span can carry without a mark definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decorator {
    Strong,
    Emphasis,
    Code,
    Underline,
    StrikeThrough,
}

impl Decorator {
    pub fn parse(mark: &str) -> Option<Self> {
        match mark {
            "strong" => Some(Self::Strong),
            "em" => Some(Self::Emphasis),
            "code" => Some(Self::Code),
            "underline" => Some(Self::Underline),
            "strike-through" => Some(Self::StrikeThrough),
            _ => None,
        }
    }
}
