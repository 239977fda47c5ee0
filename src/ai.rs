use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::QuizError;
use crate::names;
use crate::scoring::Preferences;

#[derive(Clone, Debug)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub app_id: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            app_id: None,
            base_url: names::DEFAULT_AI_BASE_URL.to_string(),
            model: names::DEFAULT_AI_MODEL.to_string(),
            timeout: Duration::from_secs(names::DEFAULT_AI_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<AiError> for QuizError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::NotConfigured(_) => QuizError::Configuration(err.to_string()),
            other => QuizError::ExternalService(other.to_string()),
        }
    }
}

/// Classifies a serialized question/answer payload into two categories.
#[cfg_attr(test, mockall::automock)]
pub trait FragranceClassifier: Send + Sync {
    fn classify(&self, payload: &str) -> impl Future<Output = Result<Preferences, AiError>> + Send;
}

#[cfg_attr(test, mockall::automock)]
pub trait TextExpander: Send + Sync {
    fn expand(&self, text: &str) -> impl Future<Output = Result<String, AiError>> + Send;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct AppCompletionRequest<'a> {
    input: AppInput<'a>,
}

#[derive(Serialize)]
struct AppInput<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct AppCompletionResponse {
    output: AppOutput,
}

#[derive(Deserialize)]
struct AppOutput {
    text: String,
}

#[derive(Deserialize)]
struct ClassifierVerdict {
    #[serde(rename = "主香调", alias = "main", alias = "main_fragrance")]
    main: String,
    #[serde(rename = "次香调", alias = "secondary", alias = "secondary_fragrance")]
    secondary: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Extracts the JSON object from a model reply, which may be wrapped in
/// prose or a fenced block.
fn parse_verdict(text: &str) -> Result<Preferences, AiError> {
    let start = text.find('{');
    let end = text.rfind('}');
    let object = match (start, end) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return Err(AiError::Malformed(format!("no JSON object in '{text}'"))),
    };

    let verdict: ClassifierVerdict =
        serde_json::from_str(object).map_err(|e| AiError::Malformed(e.to_string()))?;

    let main = verdict.main.trim();
    let secondary = verdict.secondary.trim();
    if main.is_empty() || secondary.is_empty() {
        return Err(AiError::Malformed("empty category in response".to_string()));
    }

    let preferences = Preferences::new(main, secondary);
    preferences.validate().map_err(AiError::Malformed)?;
    Ok(preferences)
}

// ---------------------------------------------------------------------------
// DashScope client
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct DashscopeClient {
    http: reqwest::Client,
    config: Arc<AiConfig>,
}

impl DashscopeClient {
    pub fn new(config: AiConfig) -> color_eyre::Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, AiError> {
        self.config
            .api_key
            .as_deref()
            .ok_or(AiError::NotConfigured("DASHSCOPE_API_KEY"))
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, AiError> {
        let resp = self
            .http
            .post(url)
            .bearer_auth(self.api_key()?)
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!("AI service error: {status} - {body}");
            return Err(AiError::Status { status, body });
        }

        resp.json::<R>()
            .await
            .map_err(|e| AiError::Malformed(e.to_string()))
    }
}

impl FragranceClassifier for DashscopeClient {
    async fn classify(&self, payload: &str) -> Result<Preferences, AiError> {
        self.api_key()?;
        let app_id = self
            .config
            .app_id
            .as_deref()
            .ok_or(AiError::NotConfigured("DASHSCOPE_APP_ID"))?;

        let url = format!("{}/api/v1/apps/{app_id}/completion", self.base_url());
        let body = AppCompletionRequest {
            input: AppInput { prompt: payload },
        };

        let resp: AppCompletionResponse = self.post(&url, &body).await?;
        let preferences = parse_verdict(&resp.output.text)?;

        tracing::info!(
            "classifier picked main={} secondary={}",
            preferences.main,
            preferences.secondary
        );
        Ok(preferences)
    }
}

impl TextExpander for DashscopeClient {
    async fn expand(&self, text: &str) -> Result<String, AiError> {
        self.api_key()?;

        let url = format!("{}/compatible-mode/v1/chat/completions", self.base_url());
        let prompt = format!("请扩写以下文本：{text}");
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: names::EXTEND_TEXT_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let resp: ChatResponse = self.post(&url, &body).await?;
        let extended = resp
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AiError::Malformed("no completion choices".to_string()))?;

        tracing::debug!("expanded {} chars into {}", text.chars().count(), extended.chars().count());
        Ok(extended)
    }
}
