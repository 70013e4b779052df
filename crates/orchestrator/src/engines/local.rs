//! The default engine: a local chat-completions LLM plus a streaming TTS
//! websocket, wired together the way `Orchestrator._process_text` does.

use async_trait::async_trait;
use futures_util::StreamExt;
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use vocalis_foundation::{EngineError, Turn};

use crate::engine::{AudioChunk, Engine, EngineResponse};

fn voice_output_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)\[VOICE OUTPUT\](.*?)\[/VOICE OUTPUT\]").unwrap())
}

const FALLBACK_RESPONSE: &str = "I'm having trouble connecting to my brain right now.";

pub struct LocalEngine {
    http: reqwest::Client,
    llm_url: String,
    system_prompt: String,
    ws_url: String,
    voice: Option<String>,
    cfg_scale: Option<f32>,
    inference_steps: Option<u32>,
}

impl LocalEngine {
    pub fn new(
        llm_url: String,
        system_prompt: String,
        ws_url: String,
        voice: Option<String>,
        cfg_scale: Option<f32>,
        inference_steps: Option<u32>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            llm_url,
            system_prompt,
            ws_url,
            voice,
            cfg_scale,
            inference_steps,
        }
    }

    async fn call_llm(&self, history: &[Turn]) -> String {
        let mut messages = vec![json!({"role": "system", "content": self.system_prompt})];
        messages.extend(history.iter().map(|t| json!({"role": t.role, "content": t.content})));
        let payload = json!({"model": "llama3", "messages": messages, "stream": false});

        tracing::info!(url = %self.llm_url, "calling LLM");
        let result = async {
            let response = self
                .http
                .post(&self.llm_url)
                .json(&payload)
                .timeout(std::time::Duration::from_secs(15))
                .send()
                .await?
                .error_for_status()?;
            response.json::<serde_json::Value>().await
        }
        .await;

        match result {
            Ok(data) => {
                if let Some(text) = data["choices"][0]["message"]["content"].as_str() {
                    text.to_string()
                } else if let Some(text) = data["message"]["content"].as_str() {
                    text.to_string()
                } else {
                    tracing::error!(?data, "unexpected LLM response format");
                    "I'm sorry, I couldn't process that response.".to_string()
                }
            }
            Err(err) => {
                tracing::error!("error calling LLM: {err}");
                FALLBACK_RESPONSE.to_string()
            }
        }
    }

    fn extract_voice_output(response_text: &str) -> Option<String> {
        let segments: Vec<String> = voice_output_pattern()
            .captures_iter(response_text)
            .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            None
        } else {
            Some(segments.join(" "))
        }
    }

    fn build_ws_url(&self, text: &str) -> String {
        let mut url = reqwest::Url::parse(&self.ws_url).unwrap_or_else(|_| {
            reqwest::Url::parse("ws://localhost/stream").expect("static fallback url parses")
        });
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("text", text);
            if let Some(cfg) = self.cfg_scale {
                query.append_pair("cfg", &cfg.to_string());
            }
            if let Some(steps) = self.inference_steps {
                query.append_pair("steps", &steps.to_string());
            }
            if let Some(voice) = &self.voice {
                query.append_pair("voice", voice);
            }
        }
        url.to_string()
    }

    async fn stream_tts(&self, text: &str, on_audio_chunk: &mut (dyn FnMut(AudioChunk<'_>) + Send)) {
        if text.trim().is_empty() {
            tracing::warn!("skipping TTS request because text is empty");
            return;
        }
        let url = self.build_ws_url(text);
        tracing::info!(len = text.len(), "connecting to TTS stream");
        let (ws_stream, _) = match connect_async(&url).await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::error!("TTS stream failed to connect: {err}");
                return;
            }
        };
        let (_, mut read) = ws_stream.split();
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Binary(bytes)) => {
                    on_audio_chunk(AudioChunk {
                        data: &bytes,
                        sample_rate: 22_050,
                        channels: 1,
                        bits_per_sample: 16,
                    });
                }
                Ok(Message::Text(text)) => tracing::debug!(%text, "TTS stream log message"),
                Ok(Message::Close(_)) => {
                    tracing::info!("TTS stream completed");
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!("TTS stream connection error: {err}");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl Engine for LocalEngine {
    async fn process(
        &self,
        _text: &str,
        history: &[Turn],
        on_audio_chunk: &mut (dyn FnMut(AudioChunk<'_>) + Send),
    ) -> Result<EngineResponse, EngineError> {
        let response_text = self.call_llm(history).await;

        if response_text.is_empty() {
            return Ok(EngineResponse {
                text: response_text,
                voice_text: None,
            });
        }

        let voice_text = Self::extract_voice_output(&response_text).unwrap_or_else(|| {
            tracing::warn!("LLM response missing [VOICE OUTPUT]; using raw response");
            response_text.trim().to_string()
        });

        if !voice_text.is_empty() {
            tracing::info!(len = voice_text.len(), "streaming voice output");
            self.stream_tts(&voice_text, on_audio_chunk).await;
        }

        Ok(EngineResponse {
            text: response_text,
            voice_text: Some(voice_text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_voice_output_segment() {
        let response = "Sure thing.\n[VOICE OUTPUT]Hi there![/VOICE OUTPUT]\nextra notes";
        assert_eq!(
            LocalEngine::extract_voice_output(response),
            Some("Hi there!".to_string())
        );
    }

    #[test]
    fn joins_multiple_segments_with_space() {
        let response = "[voice output]one[/voice output] middle [VOICE OUTPUT]two[/VOICE OUTPUT]";
        assert_eq!(
            LocalEngine::extract_voice_output(response),
            Some("one two".to_string())
        );
    }

    #[test]
    fn returns_none_when_markers_absent() {
        assert_eq!(LocalEngine::extract_voice_output("just plain text"), None);
    }

    #[test]
    fn ignores_whitespace_only_segment() {
        let response = "[VOICE OUTPUT]   [/VOICE OUTPUT]";
        assert_eq!(LocalEngine::extract_voice_output(response), None);
    }

    #[test]
    fn build_ws_url_includes_query_params() {
        let engine = LocalEngine::new(
            "http://llm.local/chat".to_string(),
            "system prompt".to_string(),
            "ws://tts.local/stream".to_string(),
            Some("alice".to_string()),
            Some(1.5),
            Some(10),
        );
        let url = engine.build_ws_url("hello world");
        assert!(url.starts_with("ws://tts.local/stream?"));
        assert!(url.contains("text=hello"));
        assert!(url.contains("voice=alice"));
    }
}
