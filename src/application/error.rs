//! Errors that end a request, and the diagnostics they leave behind for the
//! response log.

use std::error::Error as StdError;
use std::iter;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::application::content::ContentError;
use crate::application::generator::BuildError;
use crate::infra::error::InfraError;
use crate::presentation::views::TemplateRenderError;

/// Diagnostic stored in response extensions. Clients never see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub origin: &'static str,
    pub slug: Option<String>,
    pub chain: Vec<String>,
}

impl ErrorReport {
    pub fn new(origin: &'static str, message: impl Into<String>) -> Self {
        Self {
            origin,
            slug: None,
            chain: vec![message.into()],
        }
    }

    /// Record `error` and every cause below it, outermost first.
    pub fn from_chain(origin: &'static str, error: &(dyn StdError + 'static)) -> Self {
        let chain = iter::successors(Some(error), |err| (*err).source())
            .map(|err| err.to_string())
            .collect();
        Self {
            origin,
            slug: None,
            chain,
        }
    }

    pub fn for_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn detail(&self) -> &str {
        self.chain
            .first()
            .map_or("no diagnostic available", String::as_str)
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// A page request that could not produce HTML. Rendered as a plain-text 500.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Template(#[from] TemplateRenderError),
}

impl PageError {
    fn public_message(&self) -> &'static str {
        match self {
            Self::Build(_) => "Failed to build article page",
            Self::Template(err) => err.public_message,
        }
    }

    pub fn report(&self) -> ErrorReport {
        match self {
            Self::Build(err) => {
                ErrorReport::from_chain("application::generator", err).for_slug(err.slug())
            }
            Self::Template(err) => ErrorReport::from_chain(err.source, err),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let report = self.report();
        let mut response =
            (StatusCode::INTERNAL_SERVER_ERROR, self.public_message()).into_response();
        report.attach(&mut response);
        response
    }
}

/// Failures that stop the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
