//! Reader comment submissions.

use serde::{Deserialize, Serialize};

/// The payload a reader submits for an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSubmission {
    #[serde(rename = "_id")]
    pub article_id: String,
    pub name: String,
    pub email: String,
    pub comment: String,
}

/// A comment about to be written to the store. Always starts unapproved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub article_id: String,
    pub name: String,
    pub email: String,
    pub comment: String,
    pub approved: bool,
}

impl From<CommentSubmission> for NewComment {
    fn from(submission: CommentSubmission) -> Self {
        Self {
            article_id: submission.article_id,
            name: submission.name,
            email: submission.email,
            comment: submission.comment,
            approved: false,
        }
    }
}
