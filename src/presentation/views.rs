use crate::application::error::{ErrorReport, PageError};
use crate::application::form::{CommentForm, FormView};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

pub fn render_template<T: Template>(template: &T) -> Result<String, TemplateRenderError> {
    template.render().map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
    })
}

pub fn render_html_response(html: Result<String, TemplateRenderError>, status: StatusCode) -> Response {
    match html {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => PageError::from(err).into_response(),
    }
}

/// A rendered not-found page with the 404 report attached for the response log.
pub fn render_not_found_response(
    html: Result<String, TemplateRenderError>,
    slug: &str,
) -> Response {
    let mut response = render_html_response(html, StatusCode::NOT_FOUND);
    ErrorReport::new("presentation::views", "no published article")
        .for_slug(slug)
        .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: String,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(site_title: impl Into<String>, meta: PageMetaView, content: T) -> Self {
        Self {
            site_title: site_title.into(),
            meta,
            content,
        }
    }
}

#[derive(Clone)]
pub struct ImageView {
    pub src: String,
    pub alt: String,
}

#[derive(Clone)]
pub struct CommentView {
    pub id: String,
    pub name: String,
    pub comment: String,
}

#[derive(Clone)]
pub struct CommentFormView {
    pub article_id: String,
    pub action: String,
    pub submitted: bool,
    pub name: String,
    pub email: String,
    pub comment: String,
    pub messages: Vec<&'static str>,
    pub submit_error: Option<&'static str>,
}

impl CommentFormView {
    pub fn from_form(form: &CommentForm, action: impl Into<String>) -> Self {
        let input = form.input();
        Self {
            article_id: form.article_id().to_string(),
            action: action.into(),
            submitted: form.view() == FormView::Submitted,
            name: input.name.clone(),
            email: input.email.clone(),
            comment: input.comment.clone(),
            messages: form.messages(),
            submit_error: form.submit_error(),
        }
    }
}

pub struct ArticleView {
    pub title: String,
    pub description: String,
    pub hero_image: Option<ImageView>,
    pub author_name: String,
    pub author_image: Option<ImageView>,
    pub published: String,
    pub iso_date: String,
    /// Sanitized body markup, emitted without escaping.
    pub body_html: String,
    pub comments: Vec<CommentView>,
    pub form: CommentFormView,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<ArticleView>,
}

pub struct NotFoundView {
    pub title: String,
    pub message: String,
}

impl NotFoundView {
    pub fn article() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The article you requested does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub view: LayoutContext<NotFoundView>,
}
