//! Scripted collaborators shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use memegen::db::{
    format_timestamp, DatabaseError, DbResult, GenerationRecord, GenerationStore, NewGeneration,
};
use memegen::execution::{
    ArchivedImage, Archiver, GenerationPipeline, PipelineDeps, PipelineSettings, ProgressEvent,
    ProgressStream,
};
use memegen::rate::{InMemoryRateBackend, RatePolicy, RateTracker};
use parking_lot::Mutex;
use providers::{
    Article, ImageRenderer, ImageSize, NewsCategory, NewsSource, PromptSynthesizer, ProviderError,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const IMAGE_URL: &str = "https://renderer.example/tmp/1.png";

pub fn article() -> Article {
    Article::new("Local robot wins spelling bee")
        .with_description("The robot spelled 'onomatopoeia' on the first try.")
        .with_link("https://news.example/robot")
        .with_category("technology")
        .with_pub_date("2024-06-01 08:00:00")
}

pub struct StubNews {
    articles: Vec<Article>,
    fail: bool,
    requests: Mutex<Vec<(Option<NewsCategory>, String)>>,
}

impl StubNews {
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Category and language of every fetch, in order
    pub fn requests(&self) -> Vec<(Option<NewsCategory>, String)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl NewsSource for StubNews {
    async fn fetch_latest(
        &self,
        category: Option<NewsCategory>,
        language: &str,
    ) -> providers::Result<Vec<Article>> {
        self.requests.lock().push((category, language.to_string()));
        if self.fail {
            return Err(ProviderError::Status {
                service: "news",
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        Ok(self.articles.clone())
    }
}

pub struct StubSynthesizer {
    prompt: String,
    calls: AtomicUsize,
}

impl StubSynthesizer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PromptSynthesizer for StubSynthesizer {
    async fn synthesize(&self, _headline: &str, _description: &str) -> providers::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.prompt.clone())
    }
}

/// What the renderer does on one call
#[derive(Debug, Clone)]
pub enum RenderStep {
    Urls(Vec<String>),
    Policy,
    Fail,
    Hang,
    Panic,
}

/// Sets its flag when dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct ScriptedRenderer {
    steps: Mutex<VecDeque<RenderStep>>,
    calls: Mutex<Vec<(String, ImageSize)>>,
    abandoned: Arc<AtomicBool>,
}

impl ScriptedRenderer {
    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(prompt, _)| prompt.clone()).collect()
    }

    pub fn sizes(&self) -> Vec<ImageSize> {
        self.calls.lock().iter().map(|(_, size)| *size).collect()
    }

    /// Whether a hanging call was dropped by its caller
    pub fn abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageRenderer for ScriptedRenderer {
    async fn render(&self, prompt: &str, size: ImageSize) -> providers::Result<Vec<String>> {
        self.calls.lock().push((prompt.to_string(), size));
        let step = self
            .steps
            .lock()
            .pop_front()
            .unwrap_or_else(|| RenderStep::Urls(vec![IMAGE_URL.to_string()]));
        match step {
            RenderStep::Urls(urls) => Ok(urls),
            RenderStep::Policy => Err(ProviderError::ContentPolicy(
                "content_policy_violation".to_string(),
            )),
            RenderStep::Fail => Err(ProviderError::Status {
                service: "image generation",
                status: 500,
                body: "internal error".to_string(),
            }),
            RenderStep::Hang => {
                let _flag = DropFlag(Arc::clone(&self.abandoned));
                std::future::pending::<()>().await;
                Ok(Vec::new())
            }
            RenderStep::Panic => panic!("renderer exploded"),
        }
    }
}

pub struct StubArchiver {
    fail: bool,
    calls: AtomicUsize,
}

impl StubArchiver {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Archiver for StubArchiver {
    async fn archive(&self, identity: &str, _source_url: &str) -> providers::Result<ArchivedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::Status {
                service: "storage",
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        let path = format!("{}/1717236000000.png", identity);
        Ok(ArchivedImage {
            public_url: format!("https://cdn.example/meme_images/{}", path),
            path,
        })
    }
}

/// In-memory [`GenerationStore`] with an insert failure switch
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<GenerationRecord>>,
    fail_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn records(&self) -> Vec<GenerationRecord> {
        self.records.lock().clone()
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl GenerationStore for MemoryStore {
    async fn insert(&self, generation: NewGeneration) -> DbResult<GenerationRecord> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable("store offline".to_string()));
        }
        let article = generation.article.as_ref();
        let record = GenerationRecord {
            id: format!("gen-{}", self.records.lock().len() + 1),
            user_id: generation.user_id.clone(),
            created_at: format_timestamp(generation.created_at),
            prompt: generation.prompt.clone(),
            image_url: generation.image_url.clone(),
            used_revised_prompt: generation.used_revised_prompt,
            article_title: article.map(|a| a.title.clone()),
            article_link: article.map(|a| a.link.clone()),
            article_description: article.map(|a| a.description.clone()),
            article_category: serde_json::to_string(
                &article.map(|a| a.category.clone()).unwrap_or_default(),
            )
            .unwrap(),
            article_pub_date: article.map(|a| a.pub_date.clone()),
        };
        self.records.lock().push(record.clone());
        Ok(record)
    }

    async fn count_since(&self, user_id: &str, since: DateTime<Utc>) -> DbResult<u32> {
        let since = format_timestamp(since);
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| r.user_id == user_id && r.created_at >= since)
            .count() as u32)
    }

    async fn list_for_user(&self, user_id: &str, limit: u32) -> DbResult<Vec<GenerationRecord>> {
        let mut records: Vec<_> = self
            .records
            .lock()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.reverse();
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn health_check(&self) -> DbResult<()> {
        Ok(())
    }
}

/// Knobs for [`Harness::build`]
pub struct Stubs {
    pub articles: Vec<Article>,
    pub news_fails: bool,
    pub prompt: String,
    pub render_steps: Vec<RenderStep>,
    pub archive_fails: bool,
    pub limit: u32,
    pub call_timeout: Duration,
}

impl Default for Stubs {
    fn default() -> Self {
        Self {
            articles: vec![article()],
            news_fails: false,
            prompt: "A robot holding a trophy shaped like a dictionary".to_string(),
            render_steps: Vec::new(),
            archive_fails: false,
            limit: 6,
            call_timeout: Duration::from_secs(60),
        }
    }
}

/// A pipeline wired to scripted collaborators
pub struct Harness {
    pub news: Arc<StubNews>,
    pub synthesizer: Arc<StubSynthesizer>,
    pub renderer: Arc<ScriptedRenderer>,
    pub archiver: Arc<StubArchiver>,
    pub store: Arc<MemoryStore>,
    pub tracker: Arc<RateTracker>,
    pub pipeline: Arc<GenerationPipeline>,
}

impl Harness {
    pub fn build(stubs: Stubs) -> Self {
        let news = Arc::new(StubNews {
            articles: stubs.articles,
            fail: stubs.news_fails,
            requests: Mutex::new(Vec::new()),
        });
        let synthesizer = Arc::new(StubSynthesizer {
            prompt: stubs.prompt,
            calls: AtomicUsize::new(0),
        });
        let renderer = Arc::new(ScriptedRenderer {
            steps: Mutex::new(stubs.render_steps.into()),
            calls: Mutex::new(Vec::new()),
            abandoned: Arc::new(AtomicBool::new(false)),
        });
        let archiver = Arc::new(StubArchiver {
            fail: stubs.archive_fails,
            calls: AtomicUsize::new(0),
        });
        let store = Arc::new(MemoryStore::default());
        let tracker = Arc::new(RateTracker::new(
            Arc::new(InMemoryRateBackend::new()),
            RatePolicy::new(stubs.limit, chrono::Duration::hours(24)),
        ));

        let deps = PipelineDeps {
            news: news.clone(),
            synthesizer: synthesizer.clone(),
            renderer: renderer.clone(),
            archiver: archiver.clone(),
            store: store.clone(),
            tracker: Arc::clone(&tracker),
        };
        let settings = PipelineSettings {
            call_timeout: stubs.call_timeout,
            ..PipelineSettings::default()
        };

        Self {
            news,
            synthesizer,
            renderer,
            archiver,
            store,
            tracker,
            pipeline: Arc::new(GenerationPipeline::new(deps, settings)),
        }
    }

    /// Total collaborator calls made so far
    pub fn external_calls(&self) -> usize {
        self.news.calls() + self.synthesizer.calls() + self.renderer.calls() + self.archiver.calls()
    }
}

/// Drain a run's stream
pub async fn collect(stream: ProgressStream) -> Vec<ProgressEvent> {
    stream.collect().await
}

/// Progress values and statuses, in order
pub fn checkpoints(events: &[ProgressEvent]) -> Vec<(u8, String)> {
    events
        .iter()
        .map(|e| (e.progress, e.status.clone()))
        .collect()
}
