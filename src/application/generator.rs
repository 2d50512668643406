//! Static page generation: enumerate build targets and build one page per slug.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tracing::{debug, warn};

use crate::application::content::{ContentError, ContentStore};
use crate::application::form::CommentForm;
use crate::domain::entities::Article;
use crate::presentation::article::ArticleRenderer;
use crate::presentation::views::TemplateRenderError;

pub const DEFAULT_REVALIDATE: Duration = Duration::from_secs(86_400);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub id: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub enum PageOutcome {
    Found {
        article: Arc<Article>,
        revalidate: Duration,
    },
    NotFound,
}

#[derive(Debug, Clone)]
pub enum RenderedPage {
    Article {
        article: Arc<Article>,
        html: String,
        revalidate: Duration,
    },
    NotFound,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to load article `{slug}`")]
    Content {
        slug: String,
        #[source]
        source: ContentError,
    },
    #[error("failed to render article `{slug}`")]
    Render {
        slug: String,
        #[source]
        source: TemplateRenderError,
    },
}

impl BuildError {
    pub fn slug(&self) -> &str {
        match self {
            Self::Content { slug, .. } | Self::Render { slug, .. } => slug,
        }
    }
}

#[derive(Clone)]
pub struct StaticPageGenerator {
    store: Arc<dyn ContentStore>,
    renderer: Arc<ArticleRenderer>,
    revalidate: Duration,
}

impl StaticPageGenerator {
    pub fn new(
        store: Arc<dyn ContentStore>,
        renderer: Arc<ArticleRenderer>,
        revalidate: Duration,
    ) -> Self {
        Self {
            store,
            renderer,
            revalidate,
        }
    }

    pub fn renderer(&self) -> &ArticleRenderer {
        &self.renderer
    }

    pub fn revalidate(&self) -> Duration {
        self.revalidate
    }

    /// One target per article carrying a non-empty slug.
    pub async fn enumerate(&self) -> Result<Vec<BuildTarget>, ContentError> {
        let slugs = self.store.list_slugs().await?;
        let mut targets = Vec::with_capacity(slugs.len());
        for entry in slugs {
            match entry.slug {
                Some(slug) if !slug.trim().is_empty() => targets.push(BuildTarget {
                    id: entry.id,
                    slug,
                }),
                _ => warn!(
                    target = "lectern::application::generator",
                    article_id = %entry.id,
                    "skipping article without slug"
                ),
            }
        }
        debug!(
            target = "lectern::application::generator",
            count = targets.len(),
            "enumerated build targets"
        );
        Ok(targets)
    }

    pub async fn build(&self, slug: &str) -> Result<PageOutcome, ContentError> {
        match self.store.article_by_slug(slug).await? {
            Some(article) => Ok(PageOutcome::Found {
                article: Arc::new(article),
                revalidate: self.revalidate,
            }),
            None => Ok(PageOutcome::NotFound),
        }
    }

    /// Build and render one page with a fresh comment form.
    pub async fn render(&self, slug: &str) -> Result<RenderedPage, BuildError> {
        let outcome = self.build(slug).await.map_err(|source| BuildError::Content {
            slug: slug.to_string(),
            source,
        })?;

        match outcome {
            PageOutcome::Found {
                article,
                revalidate,
            } => {
                let form = CommentForm::new(article.id.clone());
                let html = self
                    .renderer
                    .render_page(&article, &form)
                    .map_err(|source| BuildError::Render {
                        slug: slug.to_string(),
                        source,
                    })?;
                Ok(RenderedPage::Article {
                    article,
                    html,
                    revalidate,
                })
            }
            PageOutcome::NotFound => Ok(RenderedPage::NotFound),
        }
    }
}
