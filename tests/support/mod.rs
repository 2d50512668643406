#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::Response;
use chrono_tz::Tz;
use http_body_util::BodyExt;
use serde_json::json;

use lectern::application::comments::CommentIngestService;
use lectern::application::content::{ContentError, ContentStore};
use lectern::application::generator::StaticPageGenerator;
use lectern::cache::PageCache;
use lectern::domain::comments::NewComment;
use lectern::domain::entities::{Article, ArticleSlug, Comment};
use lectern::infra::http::{self, ApiState, HttpState, RouterState};
use lectern::presentation::article::ArticleRenderer;
use lectern::presentation::assets::AssetResolver;

/// In-memory content store with switchable failures.
///
/// Created comments stay hidden until [`MemoryContentStore::approve`] flips
/// them, after which the article query returns them like the real store.
#[derive(Default)]
pub struct MemoryContentStore {
    articles: Mutex<Vec<Article>>,
    orphan_slugs: Mutex<Vec<ArticleSlug>>,
    failing_slugs: Mutex<HashSet<String>>,
    comments: Mutex<Vec<NewComment>>,
    approved: Mutex<HashSet<String>>,
    fail_writes: AtomicBool,
    article_calls: AtomicUsize,
    latency: Mutex<Duration>,
}

impl MemoryContentStore {
    pub fn with_articles(articles: Vec<Article>) -> Arc<Self> {
        let store = Self::default();
        *store.articles.lock().expect("articles") = articles;
        Arc::new(store)
    }

    pub fn upsert(&self, article: Article) {
        let mut articles = self.articles.lock().expect("articles");
        articles.retain(|existing| existing.slug != article.slug);
        articles.push(article);
    }

    pub fn remove(&self, slug: &str) {
        self.articles
            .lock()
            .expect("articles")
            .retain(|article| article.slug != slug);
    }

    /// Listed by `list_slugs` without a backing document.
    pub fn add_orphan_slug(&self, id: &str, slug: Option<&str>) {
        self.orphan_slugs.lock().expect("orphans").push(ArticleSlug {
            id: id.to_string(),
            slug: slug.map(str::to_string),
        });
    }

    pub fn fail_slug(&self, slug: &str) {
        self.failing_slugs
            .lock()
            .expect("failing")
            .insert(slug.to_string());
    }

    pub fn heal_slug(&self, slug: &str) {
        self.failing_slugs.lock().expect("failing").remove(slug);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn article_calls(&self) -> usize {
        self.article_calls.load(Ordering::SeqCst)
    }

    pub fn comments(&self) -> Vec<NewComment> {
        self.comments.lock().expect("comments").clone()
    }

    /// Approve a comment by the id `create_comment` returned.
    pub fn approve(&self, id: &str) {
        self.approved.lock().expect("approved").insert(id.to_string());
    }

    /// Delay every article lookup.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().expect("latency") = latency;
    }

    fn approved_comments(&self, article_id: &str) -> Vec<Comment> {
        let approved = self.approved.lock().expect("approved");
        self.comments
            .lock()
            .expect("comments")
            .iter()
            .enumerate()
            .map(|(index, comment)| (format!("comment-{}", index + 1), comment))
            .filter(|(id, comment)| comment.article_id == article_id && approved.contains(id))
            .map(|(id, comment)| {
                serde_json::from_value(json!({
                    "_id": id,
                    "post": { "_type": "reference", "_ref": comment.article_id },
                    "name": comment.name,
                    "email": comment.email,
                    "comment": comment.comment,
                    "approved": true
                }))
                .expect("comment document")
            })
            .collect()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn list_slugs(&self) -> Result<Vec<ArticleSlug>, ContentError> {
        let mut slugs: Vec<ArticleSlug> = self
            .articles
            .lock()
            .expect("articles")
            .iter()
            .map(|article| ArticleSlug {
                id: article.id.clone(),
                slug: Some(article.slug.clone()),
            })
            .collect();
        slugs.extend(self.orphan_slugs.lock().expect("orphans").iter().cloned());
        Ok(slugs)
    }

    async fn article_by_slug(&self, slug: &str) -> Result<Option<Article>, ContentError> {
        self.article_calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().expect("latency");
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.failing_slugs.lock().expect("failing").contains(slug) {
            return Err(ContentError::transport("connection reset by peer"));
        }
        let found = self
            .articles
            .lock()
            .expect("articles")
            .iter()
            .find(|article| article.slug == slug)
            .cloned();
        Ok(found.map(|mut article| {
            let extra = self.approved_comments(&article.id);
            article.comments.extend(extra);
            article
        }))
    }

    async fn create_comment(&self, comment: NewComment) -> Result<String, ContentError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ContentError::Status {
                status: 403,
                message: "Insufficient permissions".to_string(),
            });
        }
        let mut comments = self.comments.lock().expect("comments");
        comments.push(comment);
        Ok(format!("comment-{}", comments.len()))
    }
}

/// An article document as the store returns it.
pub fn article(id: &str, slug: &str, title: &str) -> Article {
    serde_json::from_value(json!({
        "_id": id,
        "_createdAt": "2022-03-01T10:15:00Z",
        "title": title,
        "description": format!("About {title}"),
        "mainImage": {
            "_type": "image",
            "asset": { "_ref": "image-Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000-jpg" }
        },
        "author": { "name": "Jo Writer", "image": null },
        "slug": { "_type": "slug", "current": slug },
        "body": [
            {
                "_type": "block",
                "_key": "b1",
                "style": "h1",
                "markDefs": [],
                "children": [{ "_type": "span", "text": title, "marks": [] }]
            },
            {
                "_type": "block",
                "_key": "b2",
                "style": "normal",
                "markDefs": [],
                "children": [{ "_type": "span", "text": format!("{title} body"), "marks": [] }]
            }
        ],
        "comments": [
            {
                "_id": format!("{id}-c1"),
                "post": { "_type": "reference", "_ref": id },
                "name": "Bea",
                "email": "bea@example.com",
                "comment": "First!",
                "approved": true
            }
        ]
    }))
    .expect("article document")
}

pub fn renderer() -> Arc<ArticleRenderer> {
    Arc::new(ArticleRenderer::with_default_serializers(
        AssetResolver::new("abc123", "production"),
        Tz::UTC,
        "Lectern",
    ))
}

pub fn generator(store: Arc<MemoryContentStore>, revalidate: Duration) -> StaticPageGenerator {
    StaticPageGenerator::new(store, renderer(), revalidate)
}

pub struct TestApp {
    pub router: Router,
    pub pages: PageCache,
    pub store: Arc<MemoryContentStore>,
}

pub fn app(store: Arc<MemoryContentStore>, revalidate: Duration) -> TestApp {
    let pages = PageCache::new(generator(Arc::clone(&store), revalidate));
    let comments = CommentIngestService::new(store.clone());
    let router = http::build_router(RouterState {
        http: HttpState {
            pages: pages.clone(),
            comments: comments.clone(),
        },
        api: ApiState { comments },
    });
    TestApp {
        router,
        pages,
        store,
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
