use crate::gemini::config::{GeminiConfig, DEFAULT_BASE_URL};
use crate::gemini::models::parse_model_list;
use chat_core::{CandidateFetch, ChatError, ChatOpts, ModelClient};
use reqwest::{header, Client, StatusCode};
use serde_json::{json, Value};
use tokio::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Reported when the configured key cannot travel in a request header.
pub const UNUSABLE_KEY_ERROR: &str =
    "API key not valid: it contains characters that cannot be sent in a request header";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Credential {
    Missing,
    Unusable,
    Ready,
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    credential: Credential,
}

impl GeminiClient {
    /// Build the client. Bad settings are logged and degraded rather than
    /// refused, so the session still starts and reports them in-line.
    pub fn new(cfg: &GeminiConfig) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        let credential = match &cfg.api_key {
            None => Credential::Missing,
            Some(key) => match header::HeaderValue::from_str(key) {
                Ok(mut v) => {
                    v.set_sensitive(true);
                    headers.insert("x-goog-api-key", v);
                    Credential::Ready
                }
                Err(e) => {
                    warn!(target: "providers::gemini", "API key is unusable: {}", e);
                    Credential::Unusable
                }
            },
        };
        // No request timeout: a hung call keeps the session loading.
        let mut builder = Client::builder()
            .default_headers(headers)
            .use_rustls_tls()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(2);
        if let Some(p) = &cfg.proxy {
            match reqwest::Proxy::all(p) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => warn!(target: "providers::gemini", "ignoring proxy {}: {}", p, e),
            }
        }
        let http = builder.build()?;
        let base_url = match Url::parse(&cfg.base_url) {
            Ok(_) => cfg.base_url.clone(),
            Err(e) => {
                warn!(target: "providers::gemini", "bad base url {:?} ({}), using {}", cfg.base_url, e, DEFAULT_BASE_URL);
                DEFAULT_BASE_URL.to_string()
            }
        };
        Ok(Self {
            http,
            base_url,
            credential,
        })
    }

    fn check_credential(&self) -> Result<(), ChatError> {
        match self.credential {
            Credential::Ready => Ok(()),
            Credential::Missing => Err(ChatError::MissingApiKey),
            Credential::Unusable => Err(ChatError::Auth(UNUSABLE_KEY_ERROR.to_string())),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ChatError> {
        let raw = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| ChatError::Other(format!("bad endpoint {}: {}", raw, e)))
    }

    async fn list_models_raw(&self) -> Result<Value, ChatError> {
        self.check_credential()?;
        let mut url = self.endpoint("v1beta/models")?;
        url.query_pairs_mut().append_pair("pageSize", "1000");
        let resp = self.http.get(url).send().await.map_err(map_reqwest_err)?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(map_status_err(status, resp.text().await.ok()));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))
    }
}

impl ModelClient for GeminiClient {
    async fn send_chat(&self, prompt: &str, opts: &ChatOpts) -> Result<String, ChatError> {
        self.check_credential()?;
        let url = self.endpoint(&format!("v1beta/models/{}:generateContent", opts.model))?;
        info!(target: "providers::gemini", "generateContent model={} prompt_len={}", opts.model, prompt.len());
        let body = build_generate_body(prompt, opts);
        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_err)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.ok();
            error!(target: "providers::gemini", "generateContent non-200 status={} body={:?}", status, text);
            return Err(map_status_err(status, text));
        }
        let v: Value = resp
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))?;
        extract_text(&v)
    }

    async fn fetch_candidates(&self) -> CandidateFetch {
        let payload = match self.list_models_raw().await {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "providers::gemini", "model list unavailable: {}", e);
                return CandidateFetch::failed(e.to_string());
            }
        };
        match parse_model_list(&payload) {
            Ok(models) if models.is_empty() => {
                warn!(target: "providers::gemini", "model list contained no usable models");
                CandidateFetch::failed("provider returned no usable models")
            }
            Ok(models) => {
                debug!(target: "providers::gemini", "fetched {} candidate models", models.len());
                CandidateFetch {
                    models,
                    warning: None,
                }
            }
            Err(e) => {
                warn!(target: "providers::gemini", "malformed model list: {} payload={}", e, payload);
                CandidateFetch::failed(e.to_string())
            }
        }
    }
}

/// Request body for a fresh, history-less `generateContent` call.
pub fn build_generate_body(prompt: &str, opts: &ChatOpts) -> Value {
    json!({
        "systemInstruction": { "parts": [ { "text": opts.system_instruction } ] },
        "contents": [ { "role": "user", "parts": [ { "text": prompt } ] } ],
        "generationConfig": opts.generation,
        "safetySettings": opts.safety,
    })
}

pub fn extract_text(v: &Value) -> Result<String, ChatError> {
    let Some(candidate) = v["candidates"].get(0) else {
        let reason = v["promptFeedback"]["blockReason"]
            .as_str()
            .unwrap_or("no candidates returned");
        return Err(ChatError::Protocol(format!("response blocked: {}", reason)));
    };
    let parts = candidate["content"]["parts"].as_array();
    let text: String = parts
        .map(|ps| ps.iter().filter_map(|p| p["text"].as_str()).collect())
        .unwrap_or_default();
    if text.is_empty() {
        let reason = candidate["finishReason"].as_str().unwrap_or("empty");
        return Err(ChatError::Protocol(format!("no text in response: {}", reason)));
    }
    Ok(text)
}

fn map_reqwest_err(e: reqwest::Error) -> ChatError {
    if e.is_timeout() || e.is_request() || e.is_connect() {
        ChatError::Network(e.to_string())
    } else if e.is_decode() {
        ChatError::Decode(e.to_string())
    } else {
        ChatError::Other(e.to_string())
    }
}

/// Map a failed status into a `ChatError` whose text carries the provider's
/// own message, which later decides the user-facing wording.
pub fn map_status_err(status: StatusCode, body: Option<String>) -> ChatError {
    let body = body.unwrap_or_default();
    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or(body);
    let s = format!("{} {}", status.as_u16(), detail);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ChatError::Auth(s),
        StatusCode::BAD_REQUEST if s.contains("API key") => ChatError::Auth(s),
        StatusCode::TOO_MANY_REQUESTS => ChatError::RateLimit(s),
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => ChatError::Network(s),
        StatusCode::NOT_FOUND => ChatError::Protocol(s),
        _ => ChatError::Other(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::llm::{describe_failure, INVALID_KEY_MESSAGE, QUOTA_MESSAGE};

    #[test]
    fn body_is_single_turn_with_fixed_settings() {
        let opts = ChatOpts::new("gemini-2.0-flash", "be kind");
        let b = build_generate_body("hello", &opts);
        assert_eq!(b["contents"].as_array().unwrap().len(), 1);
        assert_eq!(b["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(b["systemInstruction"]["parts"][0]["text"], "be kind");
        assert_eq!(b["generationConfig"]["temperature"], 1.0);
        assert_eq!(b["generationConfig"]["topK"], 64);
        assert_eq!(b["generationConfig"]["responseMimeType"], "text/plain");
        let safety = b["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 4);
        assert_eq!(safety[0]["category"], "HARM_CATEGORY_HARASSMENT");
        assert_eq!(safety[3]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[test]
    fn text_parts_are_joined() {
        let v = json!({"candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "world"}]}}]});
        assert_eq!(extract_text(&v).unwrap(), "Hello world");
    }

    #[test]
    fn blocked_prompt_is_a_protocol_error() {
        let v = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let e = extract_text(&v).unwrap_err();
        assert!(matches!(e, ChatError::Protocol(ref s) if s.contains("SAFETY")));
    }

    #[test]
    fn invalid_key_body_maps_to_invalid_key_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        let e = map_status_err(StatusCode::BAD_REQUEST, Some(body.into()));
        assert!(matches!(e, ChatError::Auth(_)));
        assert_eq!(describe_failure(&e), INVALID_KEY_MESSAGE);
    }

    #[test]
    fn quota_body_maps_to_quota_message() {
        let body = r#"{"error":{"code":429,"message":"You exceeded your current quota.","status":"RESOURCE_EXHAUSTED"}}"#;
        let e = map_status_err(StatusCode::TOO_MANY_REQUESTS, Some(body.into()));
        assert!(matches!(e, ChatError::RateLimit(_)));
        assert_eq!(describe_failure(&e), QUOTA_MESSAGE);
    }

    #[test]
    fn non_json_bodies_are_kept_verbatim() {
        let e = map_status_err(StatusCode::BAD_GATEWAY, Some("upstream down".into()));
        assert!(matches!(e, ChatError::Network(ref s) if s == "502 upstream down"));
    }

    #[tokio::test]
    async fn missing_key_short_circuits() {
        let client = GeminiClient::new(&GeminiConfig::default()).unwrap();
        let out = client.run("hi", "gemini-2.0-flash", "sys").await;
        assert_eq!(out, chat_core::llm::MISSING_KEY_MESSAGE);
        let fetched = client.fetch_candidates().await;
        assert!(fetched.models.is_empty());
        assert!(fetched.warning.is_some());
    }

    #[tokio::test]
    async fn unencodable_key_still_builds_and_reports_invalid_key() {
        let cfg = GeminiConfig {
            api_key: Some("abc\ndef".into()),
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(&cfg).unwrap();
        let out = client.run("hi", "gemini-2.0-flash", "sys").await;
        assert_eq!(out, INVALID_KEY_MESSAGE);
        let fetched = client.fetch_candidates().await;
        assert!(fetched.models.is_empty());
        assert!(fetched.warning.unwrap().contains("API key not valid"));
    }

    #[test]
    fn malformed_base_url_and_proxy_fall_back() {
        let cfg = GeminiConfig {
            api_key: Some("k".into()),
            base_url: "not a url".into(),
            proxy: Some("::bogus::".into()),
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(&cfg).unwrap();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert!(client.endpoint("v1beta/models").is_ok());
    }
}
