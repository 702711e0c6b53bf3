use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use crate::error::{Result, SmartFitError};
use crate::triton_client::client::triton::grpc_inference_service_client::GrpcInferenceServiceClient;
use crate::triton_client::client::triton::{
    ModelInferRequest, ModelInferResponse, ModelMetadataRequest, ModelMetadataResponse,
    ModelReadyRequest, ServerLiveRequest,
};

pub mod triton {
    tonic::include_proto!("inference");
}

/// TritonInferenceClient is a thin wrapper over the generated gRPC stub.
/// Clones share the underlying channel.
#[derive(Debug, Clone)]
pub struct TritonInferenceClient {
    client: GrpcInferenceServiceClient<Channel>,
}

impl TritonInferenceClient {

    /// connect opens a channel to the inference server.
    ///
    /// # Arguments
    /// * `url` - server address, e.g. `http://localhost:8001`
    /// * `timeout` - per-request and connect timeout
    ///
    /// # Returns
    /// * `Result<TritonInferenceClient>`
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Endpoint::from_shared(url.to_string())
            .map_err(|e| SmartFitError::Config(format!("invalid inference server url {url}: {e}")))?
            .timeout(timeout)
            .connect_timeout(timeout);
        let channel = endpoint.connect().await?;
        Ok(TritonInferenceClient::from_channel(channel))
    }

    pub fn from_channel(channel: Channel) -> Self {
        TritonInferenceClient {
            client: GrpcInferenceServiceClient::new(channel),
        }
    }

    pub async fn server_live(&self) -> Result<bool> {
        let response = self.client.clone().server_live(ServerLiveRequest {}).await?;
        Ok(response.into_inner().live)
    }

    pub async fn model_ready(&self, model_name: &str) -> Result<bool> {
        let request = ModelReadyRequest {
            name: model_name.to_string(),
            version: "".to_string(),
        };
        let response = self.client.clone().model_ready(request).await?;
        Ok(response.into_inner().ready)
    }

    pub async fn model_metadata(&self, model_name: &str) -> Result<ModelMetadataResponse> {
        let request = ModelMetadataRequest {
            name: model_name.to_string(),
            version: "".to_string(),
        };
        let response = self.client.clone().model_metadata(request).await?;
        Ok(response.into_inner())
    }

    pub async fn model_infer(&self, request: ModelInferRequest) -> Result<ModelInferResponse> {
        let response = self.client.clone().model_infer(request).await?;
        Ok(response.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let result = TritonInferenceClient::connect("not a url", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(SmartFitError::Config(_))));
    }
}
