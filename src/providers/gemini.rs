use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use log::{debug, trace, error, info, warn};

use crate::config::GeminiConfig;
use crate::error::GenerateError;
use super::TextGenerator;

const GENERATE_METHOD: &str = "generateContent";

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
  , #[serde(default)]
    pub parts: Vec<GeminiPart>
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig
{   #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest
{   pub contents: Vec<GeminiContent>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiResponse
{   #[serde(default)]
    pub candidates: Vec<Candidate>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate
{   #[serde(default)]
    pub content: Option<GeminiContent>
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiModelsResponse
{   #[serde(default)]
    pub models: Vec<ModelData>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelData
{   pub name: String
  , #[serde(default)]
    pub supported_generation_methods: Vec<String>
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorEnvelope
{   error: ApiErrorBody
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorBody
{   message: String
}

/// Concatenated text of the first candidate
pub fn response_text(response: &GeminiResponse)
  -> Result<String, GenerateError>
{   let candidate = response.candidates.first()
      .ok_or(GenerateError::NoCandidates)?;
    if let Some(reason) = &candidate.finish_reason
    {   trace!("Gemini finish reason: {}", reason);
    }
    let text: String = candidate.content.iter()
      .flat_map(|c| c.parts.iter())
      .filter_map(|p| p.text.as_deref())
      .collect();
    if text.is_empty()
    {   return Err(GenerateError::NoCandidates);
    }
    Ok(text)
}

/// Map a non-success HTTP status to the error taxonomy;
/// 429 is the only throttling signal.
pub fn classify_status(status: u16, body: &str) -> GenerateError
{   if status == 429
    {   return GenerateError::RateLimited;
    }
    let message = serde_json::from_str::<ApiErrorEnvelope>(body)
      .map(|e| e.error.message)
      .unwrap_or_else(|_| body.to_string());
    GenerateError::ApiError
    {   status
      , message
    }
}

/// Names of models that support content generation,
/// without the `models/` prefix
pub fn generation_models(response: &GeminiModelsResponse)
  -> Vec<String>
{   response.models.iter()
      .filter(|m| {
        m.supported_generation_methods.iter()
          .any(|s| s == GENERATE_METHOD)
      })
      .map(|m| {
        m.name.strip_prefix("models/")
          .unwrap_or(&m.name)
          .to_string()
      })
      .collect()
}

/// `{base}/models/{model}:generateContent`
pub fn generate_endpoint(api_base: &str, model: &str) -> String
{   let model = model.strip_prefix("models/").unwrap_or(model);
    format!(
      "{}/models/{}:{}"
    , api_base.trim_end_matches('/')
    , model
    , GENERATE_METHOD
    )
}

// ===== Gemini Client Actor =====

/// Commands for GeminiClient actor
pub enum GeminiCommand
{   Generate
    {   prompt: String
      , reply: mpsc::UnboundedSender<Result<String, GenerateError>>
    }
  , ListModels
    {   reply: mpsc::UnboundedSender
        <Result<Vec<String>, GenerateError>>
    }
  , SetApiKey
    {   key: String
      , reply: mpsc::UnboundedSender<Result<(), GenerateError>>
    }
  , Shutdown
}

/// Gemini client state; cheap to clone into request tasks
#[derive(Clone)]
pub struct GeminiClientState
{   config: GeminiConfig
  , http_client: reqwest::Client
}

impl GeminiClientState
{   pub fn new(config: GeminiConfig)
      -> Result<Self, crate::error::Error>
    {   debug!("Creating GeminiClientState for {}", config.model);
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs
        {   builder = builder.timeout(
              std::time::Duration::from_secs(secs)
            );
        }
        let http_client = builder.build().map_err(|e| {
          crate::error::Error::InvalidConfiguration(e.to_string())
        })?;
        Ok(GeminiClientState
        {   config
          , http_client
        })
    }

    fn get_api_key(&self) -> Result<&str, GenerateError>
    {   self.config.api_key.as_deref().ok_or_else(|| {
          error!("No Gemini API key configured");
          GenerateError::MissingApiKey(
            format!("Gemini:{}", self.config.model)
          )
        })
    }

    fn set_api_key(&mut self, key: String)
    {   debug!("Setting Gemini API key");
        self.config.api_key = Some(key);
    }

    async fn handle_generate(&self, prompt: String)
      -> Result<String, GenerateError>
    {   debug!("Handling generate for: {}", self.config.model);
        let api_key = self.get_api_key()?;

        let request = GeminiRequest
        {   contents: vec![
              GeminiContent
              {   role: Some("user".to_string())
                , parts: vec![GeminiPart { text: Some(prompt) }]
              }
            ]
          , generation_config: Some(GenerationConfig
            {   temperature: self.config.temperature
              , max_output_tokens: self.config.max_output_tokens
            })
        };

        trace!("Gemini request: {:?}", request);

        let response = self.http_client
          .post(generate_endpoint(
            &self.config.api_base
          , &self.config.model
          ))
          .query(&[("key", api_key)])
          .json(&request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            GenerateError::HttpError(e.to_string())
          })?;

        let status = response.status();
        trace!("Gemini response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            let err = classify_status(status.as_u16(), &error_text);
            if err.is_throttled()
            {   warn!("Gemini rate limit hit");
            } else
            {   error!("Gemini API error: {}", err);
            }
            return Err(err);
        }

        let body: GeminiResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            GenerateError::ParseError(e.to_string())
          })?;

        response_text(&body)
    }

    async fn handle_list_models(&self)
      -> Result<Vec<String>, GenerateError>
    {   debug!("Handling list_models");
        let api_key = self.get_api_key()?;

        let response = self.http_client
          .get(format!(
            "{}/models"
          , self.config.api_base.trim_end_matches('/')
          ))
          .query(&[("key", api_key)])
          .send()
          .await
          .map_err(|e| {
            error!("Failed to fetch models: {}", e);
            GenerateError::HttpError(e.to_string())
          })?;

        let status = response.status();
        trace!("Models response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Failed to get models: {}", error_text);
            return Err(classify_status(status.as_u16(), &error_text));
        }

        let models_response: GeminiModelsResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            GenerateError::ParseError(e.to_string())
          })?;

        let model_names = generation_models(&models_response);
        debug!("Retrieved {} models", model_names.len());
        Ok(model_names)
    }
}

/// Public Gemini client interface
pub struct GeminiClient
{   tx: mpsc::UnboundedSender<GeminiCommand>
  , _task: tokio::task::JoinHandle<()>
}

impl GeminiClient
{   /// Create and spawn a new Gemini client.
    /// Must be called inside a tokio runtime.
    pub fn new(config: GeminiConfig)
      -> Result<Self, crate::error::Error>
    {   debug!("Creating GeminiClient");
        let state = GeminiClientState::new(config)?;
        let (cmd_tx, cmd_rx)
          = mpsc::unbounded_channel();

        let _task = tokio::spawn(async move {
          run_gemini_loop(cmd_rx, state).await;
        });

        Ok(GeminiClient
        {   tx: cmd_tx
          , _task
        })
    }

    /// Models usable for generation
    pub async fn list_models(&self)
      -> Result<Vec<String>, GenerateError>
    {   debug!("list_models queued");
        let (reply, mut reply_rx) = mpsc::unbounded_channel();
        self.tx.send(GeminiCommand::ListModels { reply })
          .map_err(|_| {
            error!("Gemini client disconnected");
            GenerateError::Disconnected
          })?;
        reply_rx.recv().await
          .unwrap_or(Err(GenerateError::Disconnected))
    }

    /// Replace the API key used for later requests
    pub async fn set_api_key(&self, key: String)
      -> Result<(), GenerateError>
    {   debug!("set_api_key queued");
        let (reply, mut reply_rx) = mpsc::unbounded_channel();
        self.tx.send(GeminiCommand::SetApiKey { key, reply })
          .map_err(|_| {
            error!("Gemini client disconnected");
            GenerateError::Disconnected
          })?;
        reply_rx.recv().await
          .unwrap_or(Err(GenerateError::Disconnected))
    }

    /// Shutdown the client
    pub fn shutdown(self) -> Result<(), GenerateError>
    {   debug!("Shutting down GeminiClient");
        self.tx.send(GeminiCommand::Shutdown)
          .map_err(|_| GenerateError::Disconnected)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient
{   async fn generate(&self, prompt: &str)
      -> Result<String, GenerateError>
    {   trace!("generate queued ({} chars)", prompt.len());
        let (reply, mut reply_rx) = mpsc::unbounded_channel();
        self.tx.send(GeminiCommand::Generate
          {   prompt: prompt.to_string()
            , reply
          })
          .map_err(|_| {
            error!("Gemini client disconnected");
            GenerateError::Disconnected
          })?;
        reply_rx.recv().await
          .unwrap_or(Err(GenerateError::Disconnected))
    }
}

/// Main gemini event loop.
///
/// Network work runs in spawned tasks so one slow request never
/// queues the others behind it.
async fn run_gemini_loop(
  mut cmd_rx: mpsc::UnboundedReceiver<GeminiCommand>
, mut state: GeminiClientState
)
{   debug!("Starting Gemini client loop");

    loop
    { match cmd_rx.recv().await
      {   Some(GeminiCommand::Generate { prompt, reply }) => {
            debug!("Processing Generate");
            let state = state.clone();
            tokio::spawn(async move {
              let result = state.handle_generate(prompt).await;
              let _ = reply.send(result);
            });
          }
        , Some(GeminiCommand::ListModels { reply }) => {
            debug!("Processing ListModels");
            let state = state.clone();
            tokio::spawn(async move {
              let result = state.handle_list_models().await;
              let _ = reply.send(result);
            });
          }
        , Some(GeminiCommand::SetApiKey { key, reply }) => {
            debug!("Processing SetApiKey");
            state.set_api_key(key);
            let _ = reply.send(Ok(()));
          }
        , Some(GeminiCommand::Shutdown) => {
            info!("Gemini client shutting down");
            break;
          }
        , None => {
            debug!("Command channel closed");
            break;
          }
      }
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn endpoint_accepts_prefixed_model()
    {   let base = "https://example.test/v1beta/";
        assert_eq!(
          generate_endpoint(base, "models/gemini-flash-latest")
        , "https://example.test/v1beta/models/gemini-flash-latest:generateContent"
        );
        assert_eq!(
          generate_endpoint(base, "gemini-flash-latest")
        , generate_endpoint(base, "models/gemini-flash-latest")
        );
    }

    #[test]
    fn status_429_is_rate_limited()
    {   assert_eq!(classify_status(429, ""), GenerateError::RateLimited);
        let err = classify_status(
          400
        , r#"{"error": {"code": 400, "message": "API key not valid"}}"#
        );
        assert_eq!(
          err
        , GenerateError::ApiError
          {   status: 400
            , message: "API key not valid".to_string()
          }
        );
        assert!(!classify_status(503, "overloaded").is_throttled());
    }

    #[test]
    fn response_text_joins_parts()
    {   let body: GeminiResponse = serde_json::from_str(r#"{
          "candidates": [{
            "content": {"role": "model", "parts": [
              {"text": "{\"a\":"}, {"text": " 1}"}
            ]},
            "finishReason": "STOP"
          }]
        }"#).unwrap();
        assert_eq!(response_text(&body).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn empty_candidates_is_an_error()
    {   let body: GeminiResponse
          = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(response_text(&body), Err(GenerateError::NoCandidates));
    }

    #[test]
    fn models_filtered_by_generate_support()
    {   let body: GeminiModelsResponse = serde_json::from_str(r#"{
          "models": [
            {"name": "models/gemini-flash-latest",
             "supportedGenerationMethods": ["generateContent", "countTokens"]},
            {"name": "models/text-embedding-004",
             "supportedGenerationMethods": ["embedContent"]}
          ]
        }"#).unwrap();
        assert_eq!(generation_models(&body), vec!["gemini-flash-latest"]);
    }

    #[test]
    fn request_serializes_camel_case()
    {   let request = GeminiRequest
        {   contents: vec![]
          , generation_config: Some(GenerationConfig
            {   temperature: None
              , max_output_tokens: Some(512)
            })
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 512);
    }

    #[tokio::test]
    async fn generate_without_key_fails_fast()
    {   let client = GeminiClient::new(GeminiConfig::default()).unwrap();
        let result = client.generate("hello").await;
        assert!(matches!(result, Err(GenerateError::MissingApiKey(_))));
        let _ = client.shutdown();
    }
}
