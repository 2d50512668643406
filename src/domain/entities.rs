//! Documents read from the content store.
//!
//! Wire documents are nullable almost everywhere, so each public entity is
//! deserialized through a private document type that normalises missing
//! fields and enforces the comment visibility rule before an [`Article`] can
//! exist.

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use super::{blocks::ContentBlock, error::DomainError};

/// Reference to an uploaded asset, e.g. `image-Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000-jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    #[serde(rename = "_ref")]
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub asset: Option<AssetRef>,
    #[serde(default, deserialize_with = "nullable")]
    pub alt: String,
}

impl ImageRef {
    pub fn asset_ref(&self) -> Option<&str> {
        self.asset.as_ref().map(|asset| asset.reference.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    #[serde(rename = "_ref")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default)]
    pub image: Option<ImageRef>,
}

/// A reader comment as stored. The email is kept for editorial tooling and is
/// never serialized back out of this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "post", default)]
    pub article: Option<DocumentRef>,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable", skip_serializing)]
    pub email: String,
    #[serde(default, deserialize_with = "nullable")]
    pub comment: String,
    #[serde(default, deserialize_with = "nullable")]
    pub approved: bool,
}

impl Comment {
    /// Whether this comment belongs in the public comment list of `article_id`.
    pub fn is_visible_on(&self, article_id: &str) -> bool {
        self.approved
            && self
                .article
                .as_ref()
                .is_some_and(|reference| reference.id == article_id)
    }
}

/// Identifier and slug pair returned by the enumeration query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArticleSlug {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "slug_current")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ArticleDocument")]
pub struct Article {
    pub id: String,
    pub created_at: OffsetDateTime,
    pub title: String,
    pub description: String,
    pub main_image: Option<ImageRef>,
    pub author: Author,
    pub slug: String,
    pub body: Vec<ContentBlock>,
    pub comments: Vec<Comment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticleDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_createdAt", with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(default, deserialize_with = "nullable")]
    title: String,
    #[serde(default, deserialize_with = "nullable")]
    description: String,
    #[serde(default)]
    main_image: Option<ImageRef>,
    #[serde(default, deserialize_with = "nullable")]
    author: Author,
    #[serde(default, deserialize_with = "slug_current")]
    slug: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    body: Vec<ContentBlock>,
    #[serde(default, deserialize_with = "nullable")]
    comments: Vec<Comment>,
}

impl TryFrom<ArticleDocument> for Article {
    type Error = DomainError;

    fn try_from(doc: ArticleDocument) -> Result<Self, Self::Error> {
        let slug = doc
            .slug
            .filter(|slug| !slug.trim().is_empty())
            .ok_or_else(|| DomainError::validation(format!("article `{}` has no slug", doc.id)))?;

        let comments = doc
            .comments
            .into_iter()
            .filter(|comment| comment.is_visible_on(&doc.id))
            .collect();

        Ok(Self {
            id: doc.id,
            created_at: doc.created_at,
            title: doc.title,
            description: doc.description,
            main_image: doc.main_image,
            author: doc.author,
            slug,
            body: doc.body,
            comments,
        })
    }
}

/// Treat an explicit `null` the same as a missing field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn slug_current<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct SlugField {
        #[serde(default)]
        current: Option<String>,
    }

    Ok(Option::<SlugField>::deserialize(deserializer)?.and_then(|slug| slug.current))
}
