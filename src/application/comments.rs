use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::application::content::{ContentError, ContentStore};
use crate::application::form::{CommentTransport, TransportError};
use crate::domain::comments::{CommentSubmission, NewComment};

const SOURCE: &str = "application::comments::CommentIngestService";

/// Writes reader submissions to the content store as unapproved comments.
#[derive(Clone)]
pub struct CommentIngestService {
    store: Arc<dyn ContentStore>,
}

impl CommentIngestService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Each call creates exactly one document. The article id is passed
    /// through without an existence check.
    pub async fn ingest(&self, submission: CommentSubmission) -> Result<String, ContentError> {
        let article_id = submission.article_id.clone();
        let comment = NewComment::from(submission);

        match self.store.create_comment(comment).await {
            Ok(id) => {
                metrics::counter!("lectern_comments_created_total").increment(1);
                info!(
                    target = "lectern::application::comments",
                    source = SOURCE,
                    article_id = %article_id,
                    comment_id = %id,
                    "comment stored for moderation"
                );
                Ok(id)
            }
            Err(err) => {
                metrics::counter!("lectern_comment_failures_total").increment(1);
                warn!(
                    target = "lectern::application::comments",
                    source = SOURCE,
                    article_id = %article_id,
                    error = %err,
                    "comment write failed"
                );
                Err(err)
            }
        }
    }
}

#[async_trait]
impl CommentTransport for CommentIngestService {
    async fn send(&self, submission: &CommentSubmission) -> Result<(), TransportError> {
        self.ingest(submission.clone())
            .await
            .map(|_| ())
            .map_err(|err| TransportError::Rejected(err.to_string()))
    }
}
