//! Transform engine capability
//!
//! Local and remote execution both implement [`TransformEngine`]. The engine is
//! selected once per batch; the coordinator only looks at [`Dispatch`] to decide
//! whether items are fed one at a time or as a whole batch.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, AppResult};
use crate::models::{ItemId, TransformConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineMode::Local => write!(f, "local"),
            EngineMode::Remote => write!(f, "remote"),
        }
    }
}

impl FromStr for EngineMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(EngineMode::Local),
            "remote" | "server" => Ok(EngineMode::Remote),
            other => Err(AppError::InvalidInput(format!("Unknown mode: {}", other))),
        }
    }
}

/// How the coordinator hands items to an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// One item per call, strictly sequential
    PerItem,
    /// The whole batch in a single call
    WholeBatch,
}

/// Snapshot of an item handed to an engine
#[derive(Debug, Clone)]
pub struct TransformInput {
    pub id: ItemId,
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub id: ItemId,
    pub content_type: String,
    pub bytes: Bytes,
}

impl TransformOutput {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Progress of the current engine call, in percent (0..=100)
pub trait ItemProgress: Send + Sync {
    fn report(&self, percent: u8);
}

impl<F> ItemProgress for F
where
    F: Fn(u8) + Send + Sync,
{
    fn report(&self, percent: u8) {
        self(percent)
    }
}

/// Progress receiver that ignores every update
pub struct NoProgress;

impl ItemProgress for NoProgress {
    fn report(&self, _percent: u8) {}
}

#[async_trait]
pub trait TransformEngine: Send + Sync {
    fn mode(&self) -> EngineMode;

    fn dispatch(&self) -> Dispatch;

    /// Transform `inputs` and return one output per input, in input order.
    ///
    /// An `Err` fails every input of this call.
    async fn transform(
        &self,
        inputs: &[TransformInput],
        config: &TransformConfig,
        progress: &dyn ItemProgress,
    ) -> AppResult<Vec<TransformOutput>>;
}
