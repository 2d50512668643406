//! HTTP client for the hosted document store.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;

use crate::application::content::{ContentError, ContentStore};
use crate::config::ContentSettings;
use crate::domain::comments::NewComment;
use crate::domain::entities::{Article, ArticleSlug};

use super::error::InfraError;

pub const SLUGS_QUERY: &str = "*[_type == 'post']{ _id, slug }";

pub const ARTICLE_QUERY: &str = "*[_type == 'post' && slug.current == $slug][0]{
  _id,
  _createdAt,
  title,
  author -> { name, image },
  \"comments\": *[_type == 'comment' && post._ref == ^._id && approved == true],
  description,
  mainImage,
  slug,
  body,
}";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const METRIC_REQUEST_MS: &str = "lectern_content_request_ms";

#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct MutateResponse {
    #[serde(default)]
    results: Vec<MutateResult>,
}

#[derive(Debug, Deserialize)]
struct MutateResult {
    id: String,
}

#[derive(Clone, Debug)]
pub struct SanityClient {
    client: Client,
    read_base: Url,
    write_base: Url,
    dataset: String,
    api_version: String,
    token: Option<String>,
}

impl SanityClient {
    pub fn new(settings: &ContentSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        let (read_base, write_base) = match &settings.base_url {
            Some(base) => (base.clone(), base.clone()),
            None => {
                let host = |api: &str| {
                    Url::parse(&format!("https://{}.{api}.sanity.io/", settings.project_id))
                        .map_err(|err| InfraError::configuration(format!("invalid project id: {err}")))
                };
                let api = host("api")?;
                let read = if settings.use_cdn { host("apicdn")? } else { api.clone() };
                (read, api)
            }
        };

        Ok(Self {
            client,
            read_base,
            write_base,
            dataset: settings.dataset.clone(),
            api_version: settings.api_version.clone(),
            token: settings.token.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("lectern/", env!("CARGO_PKG_VERSION"))
    }

    /// Run a query expression with `$name` parameters; values are JSON encoded.
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        params: &[(&str, Value)],
    ) -> Result<T, ContentError> {
        let mut url = self.endpoint(&self.read_base, "query")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            for (name, value) in params {
                pairs.append_pair(&format!("${name}"), &value.to_string());
            }
        }

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(ContentError::transport);
        histogram!(METRIC_REQUEST_MS, "operation" => "query")
            .record(started.elapsed().as_secs_f64() * 1000.0);
        let body: QueryResponse<T> = decode(response?).await?;
        Ok(body.result)
    }

    pub async fn mutate(&self, mutations: Value) -> Result<Vec<String>, ContentError> {
        let mut url = self.endpoint(&self.write_base, "mutate")?;
        url.query_pairs_mut().append_pair("returnIds", "true");

        let mut request = self.client.post(url).json(&mutations);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(ContentError::transport);
        histogram!(METRIC_REQUEST_MS, "operation" => "mutate")
            .record(started.elapsed().as_secs_f64() * 1000.0);
        let body: MutateResponse = decode(response?).await?;
        Ok(body.results.into_iter().map(|result| result.id).collect())
    }

    fn endpoint(&self, base: &Url, operation: &str) -> Result<Url, ContentError> {
        let path = format!("v{}/data/{operation}/{}", self.api_version, self.dataset);
        Ok(base.join(&path)?)
    }
}

/// Document body for a newly submitted, unapproved comment.
pub fn comment_document(comment: &NewComment) -> Value {
    json!({
        "_type": "comment",
        "post": {
            "_type": "reference",
            "_ref": comment.article_id,
        },
        "name": comment.name,
        "email": comment.email,
        "comment": comment.comment,
        "approved": comment.approved,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ContentError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(ContentError::transport)?;
    if !status.is_success() {
        return Err(ContentError::Status {
            status: status.as_u16(),
            message: error_message(&bytes),
        });
    }
    serde_json::from_slice(&bytes).map_err(ContentError::decode)
}

fn error_message(body: &[u8]) -> String {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let described = parsed.as_ref().and_then(|value| {
        value
            .pointer("/error/description")
            .or_else(|| value.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    described.unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

#[async_trait]
impl ContentStore for SanityClient {
    async fn list_slugs(&self) -> Result<Vec<ArticleSlug>, ContentError> {
        let slugs: Option<Vec<ArticleSlug>> = self.query(SLUGS_QUERY, &[]).await?;
        Ok(slugs.unwrap_or_default())
    }

    async fn article_by_slug(&self, slug: &str) -> Result<Option<Article>, ContentError> {
        debug!(target = "lectern::infra::sanity", slug, "fetching article");
        self.query(ARTICLE_QUERY, &[("slug", Value::from(slug))])
            .await
    }

    async fn create_comment(&self, comment: NewComment) -> Result<String, ContentError> {
        let mutations = json!({
            "mutations": [{ "create": comment_document(&comment) }],
        });
        self.mutate(mutations)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ContentError::decode("mutation response listed no created document"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ContentSettings {
        ContentSettings {
            project_id: "abc123".to_string(),
            dataset: "production".to_string(),
            api_version: "2021-10-21".to_string(),
            use_cdn: true,
            token: None,
            base_url: None,
        }
    }

    #[test]
    fn reads_use_cdn_host_and_writes_do_not() {
        let client = SanityClient::new(&settings()).expect("client");
        let read = client.endpoint(&client.read_base, "query").expect("url");
        let write = client.endpoint(&client.write_base, "mutate").expect("url");
        assert_eq!(
            read.as_str(),
            "https://abc123.apicdn.sanity.io/v2021-10-21/data/query/production"
        );
        assert_eq!(
            write.as_str(),
            "https://abc123.api.sanity.io/v2021-10-21/data/mutate/production"
        );
    }

    #[test]
    fn comment_document_is_unapproved_reference() {
        let doc = comment_document(&NewComment {
            article_id: "post-1".to_string(),
            name: "Ann".to_string(),
            email: "a@x.com".to_string(),
            comment: "Nice post".to_string(),
            approved: false,
        });
        assert_eq!(
            doc,
            json!({
                "_type": "comment",
                "post": { "_type": "reference", "_ref": "post-1" },
                "name": "Ann",
                "email": "a@x.com",
                "comment": "Nice post",
                "approved": false,
            })
        );
    }

    #[test]
    fn error_message_prefers_description() {
        let body = br#"{"error":{"description":"Unauthorized - token required"}}"#;
        assert_eq!(error_message(body), "Unauthorized - token required");
        assert_eq!(error_message(b"bad gateway"), "bad gateway");
    }
}
