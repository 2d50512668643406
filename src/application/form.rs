//! The reader comment form.
//!
//! A form is a small state machine over [`FormView`]. It starts in
//! [`FormView::Editing`] and moves to [`FormView::Submitted`] only after the
//! transport accepted the submission. Nothing about the state is stored, so
//! every newly rendered page builds a fresh form and shows the editing view
//! again, whether or not an earlier submission went through.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::comments::CommentSubmission;

pub const SUBMIT_FAILED_MESSAGE: &str = "Your comment could not be sent. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormView {
    #[default]
    Editing,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Comment,
    Email,
}

impl FormField {
    pub fn required_message(self) -> &'static str {
        match self {
            Self::Name => "The name field is required",
            Self::Comment => "The comment field is required",
            Self::Email => "The email field is required",
        }
    }
}

/// Field values as typed by the reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommentFormInput {
    pub name: String,
    pub email: String,
    pub comment: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("comment request failed: {0}")]
    Network(String),
    #[error("comment endpoint responded with status {0}")]
    Status(u16),
    #[error("comment was not stored: {0}")]
    Rejected(String),
}

/// Delivers a validated submission to the ingest endpoint.
#[async_trait]
pub trait CommentTransport: Send + Sync {
    async fn send(&self, submission: &CommentSubmission) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Required fields were missing; nothing was sent.
    Invalid,
    /// The transport accepted the submission.
    Sent,
    /// The transport failed; the form stays editable.
    Failed,
    /// The form was already submitted; nothing was sent.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentForm {
    article_id: String,
    input: CommentFormInput,
    errors: Vec<FormField>,
    submit_error: Option<&'static str>,
    view: FormView,
}

impl CommentForm {
    pub fn new(article_id: impl Into<String>) -> Self {
        Self {
            article_id: article_id.into(),
            input: CommentFormInput::default(),
            errors: Vec::new(),
            submit_error: None,
            view: FormView::Editing,
        }
    }

    pub fn with_input(mut self, input: CommentFormInput) -> Self {
        self.input = input;
        self
    }

    pub fn article_id(&self) -> &str {
        &self.article_id
    }

    pub fn input(&self) -> &CommentFormInput {
        &self.input
    }

    pub fn view(&self) -> FormView {
        self.view
    }

    pub fn errors(&self) -> &[FormField] {
        &self.errors
    }

    pub fn submit_error(&self) -> Option<&'static str> {
        self.submit_error
    }

    /// Inline messages for the fields that failed validation.
    pub fn messages(&self) -> Vec<&'static str> {
        self.errors
            .iter()
            .map(|field| field.required_message())
            .collect()
    }

    /// Required-field check only. Whitespace does not count as a value and the
    /// email is not checked for shape.
    pub fn validate(&self) -> Result<CommentSubmission, Vec<FormField>> {
        let missing: Vec<FormField> = [
            (FormField::Name, &self.input.name),
            (FormField::Comment, &self.input.comment),
            (FormField::Email, &self.input.email),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(CommentSubmission {
            article_id: self.article_id.clone(),
            name: self.input.name.clone(),
            email: self.input.email.clone(),
            comment: self.input.comment.clone(),
        })
    }

    pub async fn submit<T>(&mut self, transport: &T) -> SubmitOutcome
    where
        T: CommentTransport + ?Sized,
    {
        if self.view == FormView::Submitted {
            return SubmitOutcome::Ignored;
        }

        self.submit_error = None;
        let submission = match self.validate() {
            Ok(submission) => submission,
            Err(missing) => {
                self.errors = missing;
                return SubmitOutcome::Invalid;
            }
        };
        self.errors.clear();

        match transport.send(&submission).await {
            Ok(()) => {
                info!(
                    target = "lectern::form",
                    article_id = %self.article_id,
                    "comment submitted"
                );
                self.view = FormView::Submitted;
                SubmitOutcome::Sent
            }
            Err(err) => {
                warn!(
                    target = "lectern::form",
                    article_id = %self.article_id,
                    error = %err,
                    "comment submission failed"
                );
                self.view = FormView::Editing;
                self.submit_error = Some(SUBMIT_FAILED_MESSAGE);
                SubmitOutcome::Failed
            }
        }
    }
}
