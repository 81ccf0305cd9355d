//! Run state machine

use std::fmt;

/// Step a generation run is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Start,
    FetchingNews,
    SynthesizingPrompt,
    RenderingImage,
    RenderingImageFallback,
    Archiving,
    RecordingUsage,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "START",
            Stage::FetchingNews => "FETCHING_NEWS",
            Stage::SynthesizingPrompt => "SYNTHESIZING_PROMPT",
            Stage::RenderingImage => "RENDERING_IMAGE",
            Stage::RenderingImageFallback => "RENDERING_IMAGE_FALLBACK",
            Stage::Archiving => "ARCHIVING",
            Stage::RecordingUsage => "RECORDING_USAGE",
            Stage::Done => "DONE",
            Stage::Failed => "FAILED",
        }
    }

    fn ordinal(&self) -> u8 {
        match self {
            Stage::Start => 0,
            Stage::FetchingNews => 1,
            Stage::SynthesizingPrompt => 2,
            Stage::RenderingImage => 3,
            Stage::RenderingImageFallback => 4,
            Stage::Archiving => 5,
            Stage::RecordingUsage => 6,
            Stage::Done => 7,
            Stage::Failed => 8,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    /// Whether a run may move from `self` to `next`
    ///
    /// Runs only move forward, may skip stages, and reach the fallback render
    /// only from the first render. Any live stage may fail; terminal stages
    /// are final.
    pub fn can_transition_to(&self, next: Stage) -> bool {
        match (*self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Stage::Failed) => true,
            (Stage::RenderingImage, Stage::RenderingImageFallback) => true,
            (_, Stage::RenderingImageFallback) => false,
            (from, to) => to.ordinal() > from.ordinal(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
