//! Compose a full article page from an [`Article`] and its comment form.

use chrono_tz::Tz;
use time::format_description::well_known::Rfc3339;

use crate::application::form::CommentForm;
use crate::domain::entities::{Article, ImageRef};
use crate::util::timezone;

use super::blocks::{BodySerializer, Serializers};
use super::views::{
    ArticleView, CommentFormView, CommentView, ImageView, LayoutContext, NotFoundTemplate,
    NotFoundView, PageMetaView, PostTemplate, TemplateRenderError, render_template,
};

pub struct ArticleRenderer {
    body: BodySerializer,
    timezone: Tz,
    site_title: String,
}

impl ArticleRenderer {
    pub fn new(body: BodySerializer, timezone: Tz, site_title: impl Into<String>) -> Self {
        Self {
            body,
            timezone,
            site_title: site_title.into(),
        }
    }

    pub fn with_default_serializers(
        assets: super::assets::AssetResolver,
        timezone: Tz,
        site_title: impl Into<String>,
    ) -> Self {
        Self::new(
            BodySerializer::new(Serializers::default(), assets),
            timezone,
            site_title,
        )
    }

    pub fn site_title(&self) -> &str {
        &self.site_title
    }

    pub fn view(&self, article: &Article, form: &CommentForm) -> ArticleView {
        let iso_date = article
            .created_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| article.created_at.to_string());

        ArticleView {
            title: article.title.clone(),
            description: article.description.clone(),
            hero_image: article
                .main_image
                .as_ref()
                .and_then(|image| self.image_view(image)),
            author_name: article.author.name.clone(),
            author_image: article
                .author
                .image
                .as_ref()
                .and_then(|image| self.image_view(image)),
            published: timezone::display_datetime(article.created_at, self.timezone),
            iso_date,
            body_html: self.body.to_html(&article.body),
            comments: article
                .comments
                .iter()
                .map(|comment| CommentView {
                    id: comment.id.clone(),
                    name: comment.name.clone(),
                    comment: comment.comment.clone(),
                })
                .collect(),
            form: CommentFormView::from_form(form, format!("/post/{}", article.slug)),
        }
    }

    pub fn render_page(
        &self,
        article: &Article,
        form: &CommentForm,
    ) -> Result<String, TemplateRenderError> {
        let meta = PageMetaView {
            title: format!("{} | {}", article.title, self.site_title),
            description: article.description.clone(),
        };
        let view = LayoutContext::new(self.site_title.clone(), meta, self.view(article, form));
        render_template(&PostTemplate { view })
    }

    pub fn render_not_found(&self) -> Result<String, TemplateRenderError> {
        let content = NotFoundView::article();
        let meta = PageMetaView {
            title: format!("{} | {}", content.title, self.site_title),
            description: content.message.clone(),
        };
        let view = LayoutContext::new(self.site_title.clone(), meta, content);
        render_template(&NotFoundTemplate { view })
    }

    fn image_view(&self, image: &ImageRef) -> Option<ImageView> {
        let src = self.body.assets().image_url(image.asset_ref()?)?;
        Some(ImageView {
            src,
            alt: image.alt.clone(),
        })
    }
}
