//! AI供应商与HTTP客户端
//!
//! OpenAI兼容chat completion与Gemini generateContent两种协议，
//! 非200响应或空内容一律视为硬失败。请求超时固定30秒，单次尝试。

use async_trait::async_trait;
use meg_core::{MegError, Result};
use serde_json::json;
use std::time::Duration;

/// AI请求超时
pub const AI_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// AI供应商
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiProvider {
    OpenAi,
    Gemini,
    /// 哨兵供应商：永远可用、零成本，代表确定性本地生成路径
    Fallback,
}

impl AiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::Gemini => "gemini",
            AiProvider::Fallback => "fallback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "openai" => Some(AiProvider::OpenAi),
            "gemini" => Some(AiProvider::Gemini),
            "fallback" => Some(AiProvider::Fallback),
            _ => None,
        }
    }

    /// 每1000 token的美元单价
    pub fn rate_per_1k_tokens(&self) -> f64 {
        match self {
            AiProvider::OpenAi => 0.01,
            AiProvider::Gemini => 0.005,
            AiProvider::Fallback => 0.0,
        }
    }
}

/// 一次完成调用的结果
#[derive(Debug, Clone)]
pub struct AiCompletion {
    pub text: String,
    pub tokens_used: i64,
}

/// 聊天补全客户端接口
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<AiCompletion>;

    fn provider(&self) -> AiProvider;
}

/// OpenAI兼容客户端
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(AI_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MegError::Ai(e.to_string()))?;
        Ok(Self { client, base_url, api_key, model })
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<AiCompletion> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
            "temperature": 0.2,
            "max_tokens": 2048,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MegError::Ai(format!("openai request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(MegError::Ai(format!("openai returned status {}", response.status())));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MegError::Ai(format!("openai response decode failed: {}", e)))?;

        let text = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        if text.trim().is_empty() {
            return Err(MegError::Ai("openai returned empty content".to_string()));
        }

        let tokens_used = payload["usage"]["total_tokens"].as_i64().unwrap_or(0);
        Ok(AiCompletion { text, tokens_used })
    }

    fn provider(&self) -> AiProvider {
        AiProvider::OpenAi
    }
}

/// Gemini客户端
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(AI_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MegError::Ai(e.to_string()))?;
        Ok(Self { client, base_url, api_key, model })
    }
}

#[async_trait]
impl ChatCompletion for GeminiClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<AiCompletion> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        );
        let body = json!({
            "contents": [
                {"parts": [{"text": format!("{}\n\n{}", system, prompt)}]}
            ],
            "generationConfig": {
                "temperature": 0.2,
                "maxOutputTokens": 2048,
            },
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| MegError::Ai(format!("gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(MegError::Ai(format!("gemini returned status {}", response.status())));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MegError::Ai(format!("gemini response decode failed: {}", e)))?;

        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        if text.trim().is_empty() {
            return Err(MegError::Ai("gemini returned empty content".to_string()));
        }

        let tokens_used = payload["usageMetadata"]["totalTokenCount"].as_i64().unwrap_or(0);
        Ok(AiCompletion { text, tokens_used })
    }

    fn provider(&self) -> AiProvider {
        AiProvider::Gemini
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_round_trip() {
        for provider in [AiProvider::OpenAi, AiProvider::Gemini, AiProvider::Fallback] {
            assert_eq!(AiProvider::parse(provider.as_str()), Some(provider));
        }
        assert_eq!(AiProvider::parse("unknown"), None);
    }

    #[test]
    fn test_fallback_costs_nothing() {
        assert_eq!(AiProvider::Fallback.rate_per_1k_tokens(), 0.0);
    }
}
