//! Generation pipeline
//!
//! Drives one run from admission to the terminal progress event:
//!
//! 1. reserve a rate slot (blocked runs make no external calls)
//! 2. fetch the latest article and synthesize an image prompt
//! 3. render, retrying once with a softened prompt on a content-policy hit
//! 4. archive the first image, persist the record, commit the rate slot
//!
//! Every collaborator call is bounded by the configured timeout and abandoned
//! as soon as the progress receiver goes away.

use super::archive::Archiver;
use super::error::GenerationError;
use super::progress::{self, ProgressEvent, ProgressSender, ProgressStream};
use super::stage::Stage;
use crate::db::{GenerationStore, NewGeneration};
use crate::domain::{GenerationRequest, GenerationResult, RegenerationRequest};
use crate::rate::{RateSlot, RateTracker};
use futures::FutureExt;
use providers::{Article, ImageRenderer, ImageSize, NewsSource, PromptSynthesizer};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Prefix applied to a prompt the image service refused
pub const REVISED_PROMPT_PREFIX: &str =
    "A family-friendly, SFW, non-controversial meme about the following topic: ";

const GALLERY_WARNING: &str = "Your meme was created but could not be added to your gallery.";

/// Soften a prompt after a content-policy rejection
pub fn revise_for_safety(prompt: &str) -> String {
    format!("{}{}", REVISED_PROMPT_PREFIX, prompt)
}

/// Tunables for every run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Upper bound on each collaborator call
    pub call_timeout: Duration,
    /// Language requested from the news source
    pub language: String,
    /// Progress channel capacity
    pub buffer: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
            language: "en".to_string(),
            buffer: progress::DEFAULT_BUFFER,
        }
    }
}

/// Collaborators a pipeline is assembled from
#[derive(Clone)]
pub struct PipelineDeps {
    pub news: Arc<dyn NewsSource>,
    pub synthesizer: Arc<dyn PromptSynthesizer>,
    pub renderer: Arc<dyn ImageRenderer>,
    pub archiver: Arc<dyn Archiver>,
    pub store: Arc<dyn GenerationStore>,
    pub tracker: Arc<RateTracker>,
}

struct Checkpoints {
    rendering: u8,
    revised: u8,
}

const GENERATION_CHECKPOINTS: Checkpoints = Checkpoints {
    rendering: 60,
    revised: 70,
};

const REGENERATION_CHECKPOINTS: Checkpoints = Checkpoints {
    rendering: 30,
    revised: 50,
};

struct Rendered {
    prompt: String,
    urls: Vec<String>,
    used_revised_prompt: bool,
}

struct Completed {
    result: GenerationResult,
    warning: Option<String>,
}

/// Runs generations and regenerations, one task per run
pub struct GenerationPipeline {
    deps: PipelineDeps,
    settings: PipelineSettings,
}

impl GenerationPipeline {
    pub fn new(deps: PipelineDeps, settings: PipelineSettings) -> Self {
        Self { deps, settings }
    }

    pub fn tracker(&self) -> &Arc<RateTracker> {
        &self.deps.tracker
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Spawn a generation run and return its progress stream
    pub fn start(self: &Arc<Self>, request: GenerationRequest) -> ProgressStream {
        let (sender, stream) = progress::channel(self.settings.buffer);
        let span = tracing::info_span!("generation", identity = %request.identity);
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.run(request, sender).await }.instrument(span));
        stream
    }

    /// Spawn a regeneration run and return its progress stream
    pub fn start_regeneration(self: &Arc<Self>, request: RegenerationRequest) -> ProgressStream {
        let (sender, stream) = progress::channel(self.settings.buffer);
        let span = tracing::info_span!("regeneration", identity = %request.identity);
        let pipeline = Arc::clone(self);
        tokio::spawn(
            async move { pipeline.run_regeneration(request, sender).await }.instrument(span),
        );
        stream
    }

    /// Drive a generation run to its terminal event
    pub async fn run(&self, request: GenerationRequest, sender: ProgressSender) {
        tracing::info!(
            category = request.category.map(|c| c.as_str()).unwrap_or("any"),
            size = %request.size,
            "Starting generation"
        );
        let mut run = Run::new(sender, self.settings.call_timeout);
        let outcome = AssertUnwindSafe(self.generate(&request, &mut run))
            .catch_unwind()
            .await;
        run.conclude(outcome).await;
    }

    /// Drive a regeneration run to its terminal event
    pub async fn run_regeneration(&self, request: RegenerationRequest, sender: ProgressSender) {
        tracing::info!(size = %request.size, "Starting regeneration");
        let mut run = Run::new(sender, self.settings.call_timeout);
        let outcome = AssertUnwindSafe(self.regenerate(&request, &mut run))
            .catch_unwind()
            .await;
        run.conclude(outcome).await;
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        run: &mut Run,
    ) -> Result<Completed, GenerationError> {
        let slot = self.admit(&request.identity).await?;

        run.enter(Stage::FetchingNews, 0, "Fetching latest news...").await?;
        let articles = run
            .call(
                self.deps
                    .news
                    .fetch_latest(request.category, &self.settings.language),
            )
            .await?
            .map_err(|e| GenerationError::NewsUnavailable(e.to_string()))?;
        let article = articles
            .into_iter()
            .next()
            .ok_or(GenerationError::NoContentFound)?;
        tracing::info!(title = %article.title, "Selected article");
        run.emit(25, "News article found").await?;

        run.enter(Stage::SynthesizingPrompt, 30, "Analyzing article content...")
            .await?;
        let prompt = run
            .call(
                self.deps
                    .synthesizer
                    .synthesize(&article.title, &article.description),
            )
            .await?
            .map_err(|e| GenerationError::PromptSynthesisFailed(e.to_string()))?;
        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(GenerationError::PromptSynthesisFailed(
                "Empty prompt returned".to_string(),
            ));
        }
        run.emit(50, "Meme concept generated").await?;

        let rendered = self
            .render(run, prompt, request.size, &GENERATION_CHECKPOINTS)
            .await?;
        self.finalize(run, slot, Some(article), rendered).await
    }

    async fn regenerate(
        &self,
        request: &RegenerationRequest,
        run: &mut Run,
    ) -> Result<Completed, GenerationError> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::InvalidRequest(
                "No prompt provided".to_string(),
            ));
        }
        let slot = self.admit(&request.identity).await?;

        run.emit(0, "Starting image generation...").await?;
        let rendered = self
            .render(run, prompt.to_string(), request.size, &REGENERATION_CHECKPOINTS)
            .await?;
        self.finalize(run, slot, request.article.clone(), rendered)
            .await
    }

    async fn admit(&self, identity: &str) -> Result<RateSlot, GenerationError> {
        self.deps.tracker.reserve(identity).await.map_err(|info| {
            tracing::info!(limit = info.limit, "Generation blocked by rate limit");
            GenerationError::AdmissionDenied(info)
        })
    }

    async fn render(
        &self,
        run: &mut Run,
        prompt: String,
        size: ImageSize,
        checkpoints: &Checkpoints,
    ) -> Result<Rendered, GenerationError> {
        run.enter(Stage::RenderingImage, checkpoints.rendering, "Creating meme image...")
            .await?;
        let first = run.call(self.deps.renderer.render(&prompt, size)).await?;

        let rendered = match first {
            Ok(urls) => Rendered {
                prompt,
                urls,
                used_revised_prompt: false,
            },
            Err(err) if err.is_content_policy() => {
                tracing::warn!(error = %err, "Prompt rejected by content filter, retrying revised");
                run.enter(
                    Stage::RenderingImageFallback,
                    checkpoints.revised,
                    "Prompt was revised for safety...",
                )
                .await?;
                let revised = revise_for_safety(&prompt);
                let second = run.call(self.deps.renderer.render(&revised, size)).await?;
                match second {
                    Ok(urls) => Rendered {
                        prompt: revised,
                        urls,
                        used_revised_prompt: true,
                    },
                    Err(err) if err.is_content_policy() => {
                        return Err(GenerationError::ContentPolicyViolation(err.to_string()))
                    }
                    Err(err) => return Err(GenerationError::RenderFailed(err.to_string())),
                }
            }
            Err(err) => return Err(GenerationError::RenderFailed(err.to_string())),
        };

        if rendered.urls.is_empty() {
            return Err(GenerationError::RenderFailed(
                "No image was generated".to_string(),
            ));
        }
        Ok(rendered)
    }

    async fn finalize(
        &self,
        run: &mut Run,
        slot: RateSlot,
        article: Option<Article>,
        rendered: Rendered,
    ) -> Result<Completed, GenerationError> {
        let identity = slot.identity().to_string();
        let source_url = rendered
            .urls
            .first()
            .cloned()
            .ok_or_else(|| GenerationError::RenderFailed("No image was generated".to_string()))?;

        run.enter(Stage::Archiving, 80, "Saving image to gallery...").await?;
        let archived = run
            .call(self.deps.archiver.archive(&identity, &source_url))
            .await?
            .map_err(|e| GenerationError::ArchiveFailed(e.to_string()))?;
        run.emit(90, "Image saved!").await?;

        run.transition(Stage::RecordingUsage)?;
        let mut warnings = Vec::new();
        let record = NewGeneration::new(&identity, &rendered.prompt, &archived.public_url)
            .with_revised_prompt(rendered.used_revised_prompt)
            .with_article(article.clone());
        match run.call(self.deps.store.insert(record)).await {
            Ok(Ok(stored)) => tracing::debug!(id = %stored.id, "Generation recorded"),
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "Failed to store generation record");
                warnings.push(GALLERY_WARNING.to_string());
            }
            Err(GenerationError::Cancelled) => return Err(GenerationError::Cancelled),
            Err(err) => {
                tracing::warn!(error = %err, "Storing generation record timed out");
                warnings.push(GALLERY_WARNING.to_string());
            }
        }

        if let Err(err) = slot.commit().await {
            let err = GenerationError::UsageRecordingFailed(err.to_string());
            tracing::warn!(error = %err, "Generation not counted against the rate limit");
            warnings.push(err.to_string());
        }
        let rate_limit = self.deps.tracker.admit(&identity).await;

        run.transition(Stage::Done)?;
        Ok(Completed {
            result: GenerationResult {
                original_article: article,
                prompt: rendered.prompt,
                image_urls: vec![archived.public_url],
                used_revised_prompt: rendered.used_revised_prompt,
                rate_limit,
            },
            warning: (!warnings.is_empty()).then(|| warnings.join(" ")),
        })
    }
}

/// Per-run bookkeeping: the progress sender and the current stage
struct Run {
    sender: ProgressSender,
    stage: Stage,
    call_timeout: Duration,
}

impl Run {
    fn new(sender: ProgressSender, call_timeout: Duration) -> Self {
        Self {
            sender,
            stage: Stage::Start,
            call_timeout,
        }
    }

    fn transition(&mut self, next: Stage) -> Result<(), GenerationError> {
        if !self.stage.can_transition_to(next) {
            return Err(GenerationError::Unknown(format!(
                "invalid stage transition {} -> {}",
                self.stage, next
            )));
        }
        tracing::debug!(from = %self.stage, to = %next, "Stage transition");
        self.stage = next;
        Ok(())
    }

    async fn emit(&mut self, progress: u8, status: &str) -> Result<(), GenerationError> {
        self.sender
            .emit(progress, status)
            .await
            .map_err(|_| GenerationError::Cancelled)?;
        self.ensure_connected()
    }

    async fn enter(&mut self, stage: Stage, progress: u8, status: &str) -> Result<(), GenerationError> {
        self.transition(stage)?;
        self.emit(progress, status).await
    }

    fn ensure_connected(&self) -> Result<(), GenerationError> {
        if self.sender.is_closed() {
            Err(GenerationError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Await a collaborator call under the timeout, giving up if the client leaves
    async fn call<T, E, F>(&self, call: F) -> Result<Result<T, E>, GenerationError>
    where
        F: Future<Output = Result<T, E>>,
    {
        self.ensure_connected()?;
        tokio::select! {
            biased;
            _ = self.sender.closed() => Err(GenerationError::Cancelled),
            outcome = tokio::time::timeout(self.call_timeout, call) => {
                outcome.map_err(|_| GenerationError::TimedOut {
                    stage: self.stage,
                    after: self.call_timeout,
                })
            }
        }
    }

    async fn conclude(mut self, outcome: Result<Result<Completed, GenerationError>, Box<dyn Any + Send>>) {
        let outcome = outcome.unwrap_or_else(|panic| {
            Err(GenerationError::Unknown(panic_message(panic.as_ref())))
        });

        let event = match outcome {
            Ok(completed) => {
                tracing::info!(
                    used_revised_prompt = completed.result.used_revised_prompt,
                    remaining = completed.result.rate_limit.remaining,
                    "Generation complete"
                );
                ProgressEvent::completed(completed.result, completed.warning)
            }
            Err(GenerationError::Cancelled) => {
                tracing::info!(stage = %self.stage, "Client disconnected, run abandoned");
                return;
            }
            Err(err) => {
                if err.is_client_error() {
                    tracing::info!(stage = %self.stage, code = err.code(), error = %err, "Generation rejected");
                } else {
                    tracing::error!(stage = %self.stage, code = err.code(), error = %err, "Generation failed");
                }
                self.stage = Stage::Failed;
                ProgressEvent::failed(&err)
            }
        };

        if self.sender.finish(event).await.is_err() {
            tracing::debug!("Client disconnected before the final event");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "generation task panicked".to_string())
}
