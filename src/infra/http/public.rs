use axum::{
    Form, Router,
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    application::{
        comments::CommentIngestService,
        error::{ErrorReport, PageError},
        form::{CommentForm, CommentFormInput, SubmitOutcome},
    },
    cache::{CacheStatus, PageCache, PageLookup},
    presentation::views::{render_html_response, render_not_found_response},
};

use super::RouterState;

pub const CACHE_STATUS_HEADER: &str = "x-lectern-cache";

#[derive(Clone)]
pub struct HttpState {
    pub pages: PageCache,
    pub comments: CommentIngestService,
}

pub fn build_router() -> Router<RouterState> {
    Router::new()
        .route("/post/{slug}", get(post_detail).post(post_comment))
        .route("/_health", get(health))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommentFormBody {
    #[serde(rename = "_id")]
    article_id: String,
    name: String,
    email: String,
    comment: String,
}

async fn post_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    match state.pages.get(&slug).await {
        Ok(PageLookup::Page { page, status }) => {
            let mut response =
                render_html_response(Ok(page.html.to_string()), StatusCode::OK);
            mark_served(&mut response, &slug, status);
            response
        }
        Ok(PageLookup::NotFound) => not_found(&state, &slug),
        Err(err) => PageError::from(err).into_response(),
    }
}

/// Progressive form submission. The page is re-rendered around the form in
/// whatever state the submission left it.
async fn post_comment(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    Form(body): Form<CommentFormBody>,
) -> Response {
    let page = match state.pages.get(&slug).await {
        Ok(PageLookup::Page { page, .. }) => page,
        Ok(PageLookup::NotFound) => return not_found(&state, &slug),
        Err(err) => return PageError::from(err).into_response(),
    };

    let article_id = if body.article_id.trim().is_empty() {
        page.article.id.clone()
    } else {
        body.article_id
    };
    let mut form = CommentForm::new(article_id).with_input(CommentFormInput {
        name: body.name,
        email: body.email,
        comment: body.comment,
    });

    let status = match form.submit(&state.comments).await {
        SubmitOutcome::Sent | SubmitOutcome::Ignored => StatusCode::OK,
        SubmitOutcome::Invalid => StatusCode::UNPROCESSABLE_ENTITY,
        SubmitOutcome::Failed => StatusCode::BAD_GATEWAY,
    };

    let renderer = state.pages.generator().renderer();
    let mut response = render_html_response(renderer.render_page(&page.article, &form), status);
    if status == StatusCode::BAD_GATEWAY {
        ErrorReport::new("infra::http::public", "comment could not be stored")
            .for_slug(slug)
            .attach(&mut response);
    }
    response
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn not_found(state: &HttpState, slug: &str) -> Response {
    render_not_found_response(state.pages.generator().renderer().render_not_found(), slug)
}

/// The page a successful response carried, for the response log.
#[derive(Debug, Clone)]
pub(crate) struct ServedPage {
    pub slug: String,
    pub cache: CacheStatus,
}

fn mark_served(response: &mut Response, slug: &str, cache: CacheStatus) {
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(cache.as_str()));
    response.extensions_mut().insert(ServedPage {
        slug: slug.to_string(),
        cache,
    });
}
