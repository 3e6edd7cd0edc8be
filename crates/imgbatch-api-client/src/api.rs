//! Optimize endpoint contract and the remote transform engine.
//!
//! One request carries the whole batch. Results are matched to inputs by
//! position: the endpoint must answer in request order, and an out-of-order
//! answer is mis-mapped rather than detected since results carry no identity.

use async_trait::async_trait;
use imgbatch_core::{
    AppError, AppResult, DataUrl, Dispatch, EngineMode, ItemProgress, TransformConfig,
    TransformEngine, TransformInput, TransformOutput,
};
use serde::{Deserialize, Serialize};

use crate::ApiClient;

pub const OPTIMIZE_PATH: &str = "/api/optimize";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeImage {
    pub name: String,
    /// `data:` URL of the source bytes
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub images: Vec<OptimizeImage>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: u8,
}

impl OptimizeRequest {
    pub fn new(inputs: &[TransformInput], config: &TransformConfig) -> Self {
        Self {
            images: inputs
                .iter()
                .map(|input| OptimizeImage {
                    name: input.name.clone(),
                    data: DataUrl::encode(&input.content_type, &input.bytes),
                })
                .collect(),
            width: config.target_width,
            height: config.target_height,
            quality: config.quality,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeResult {
    /// `data:` URL of the output bytes
    pub data: String,
    pub new_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeResponse {
    pub results: Vec<OptimizeResult>,
}

/// Remote variant of the transform engine
#[derive(Clone, Debug)]
pub struct RemoteTransformClient {
    api: ApiClient,
    path: String,
}

impl RemoteTransformClient {
    pub fn new(api: ApiClient) -> Self {
        Self::with_path(api, OPTIMIZE_PATH)
    }

    pub fn with_path(api: ApiClient, path: impl Into<String>) -> Self {
        Self {
            api,
            path: path.into(),
        }
    }

    /// Send the batch in one request and decode one output per input
    pub async fn optimize(
        &self,
        inputs: &[TransformInput],
        config: &TransformConfig,
    ) -> AppResult<Vec<TransformOutput>> {
        let request = OptimizeRequest::new(inputs, config);

        tracing::info!(
            images = inputs.len(),
            width = ?config.target_width,
            height = ?config.target_height,
            quality = config.quality,
            url = %self.api.build_url(&self.path),
            "Sending optimize request"
        );

        let response: OptimizeResponse = self.api.post_json(&self.path, &request).await?;

        if response.results.len() != inputs.len() {
            return Err(AppError::MalformedResponse(format!(
                "expected {} results, got {}",
                inputs.len(),
                response.results.len()
            )));
        }

        inputs
            .iter()
            .zip(response.results)
            .map(|(input, result)| {
                let decoded = DataUrl::decode(&result.data)?;
                if decoded.bytes.len() as u64 != result.new_size {
                    return Err(AppError::MalformedResponse(format!(
                        "result for {} declares {} bytes but carries {}",
                        input.name,
                        result.new_size,
                        decoded.bytes.len()
                    )));
                }
                Ok(TransformOutput {
                    id: input.id,
                    content_type: decoded.content_type,
                    bytes: decoded.bytes,
                })
            })
            .collect()
    }
}

#[async_trait]
impl TransformEngine for RemoteTransformClient {
    fn mode(&self) -> EngineMode {
        EngineMode::Remote
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::WholeBatch
    }

    async fn transform(
        &self,
        inputs: &[TransformInput],
        config: &TransformConfig,
        progress: &dyn ItemProgress,
    ) -> AppResult<Vec<TransformOutput>> {
        progress.report(0);
        let outputs = self.optimize(inputs, config).await?;
        progress.report(100);
        Ok(outputs)
    }
}
