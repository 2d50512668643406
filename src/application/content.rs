//! The content store seam: two read query shapes and one write.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    comments::NewComment,
    entities::{Article, ArticleSlug},
};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content store unreachable: {0}")]
    Transport(String),
    #[error("content store responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("content store returned an unexpected body: {0}")]
    Decode(String),
    #[error("invalid content store url: {0}")]
    Url(#[from] url::ParseError),
}

impl ContentError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Every article identifier with its slug. Unpaginated.
    async fn list_slugs(&self) -> Result<Vec<ArticleSlug>, ContentError>;

    /// One article with its author and approved comments, or `None` when no
    /// document carries the slug.
    async fn article_by_slug(&self, slug: &str) -> Result<Option<Article>, ContentError>;

    /// Insert a comment document, returning the id the store assigned.
    async fn create_comment(&self, comment: NewComment) -> Result<String, ContentError>;
}
