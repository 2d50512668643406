use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::application::form::{CommentTransport, TransportError};
use crate::domain::comments::CommentSubmission;

use super::error::InfraError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Posts form submissions as JSON to a running ingest endpoint.
#[derive(Clone, Debug)]
pub struct HttpCommentTransport {
    client: Client,
    endpoint: Url,
}

impl HttpCommentTransport {
    pub fn new(endpoint: Url) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("lectern-comment/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { client, endpoint })
    }

    /// `site` is the server's base URL; the ingest path is appended.
    pub fn for_site(site: &Url) -> Result<Self, InfraError> {
        let endpoint = site
            .join("/api/createComment")
            .map_err(|err| InfraError::configuration(format!("invalid site url: {err}")))?;
        Self::new(endpoint)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CommentTransport for HttpCommentTransport {
    async fn send(&self, submission: &CommentSubmission) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(submission)
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Status(status.as_u16()))
        }
    }
}
