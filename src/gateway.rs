use anyhow::Result;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::ChatError;

/// Events emitted while a completion streams back
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// One fragment of generated text, to be appended in arrival order
    Delta(String),
    /// The gateway closed the stream; the last delta is authoritative
    Done,
    /// Non-success response or mid-stream transport error
    Failed(String),
}

/// Request body the gateway accepts
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    model: &'a str,
}

/// Error body the gateway returns on a non-2xx status
#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    error: String,
}

/// Client for the completion gateway. Stateless per request; the gateway
/// owns any timeout, so none is set here.
#[derive(Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    gateway_url: String,
    api_key: String,
}

impl GatewayClient {
    /// Construct the client, failing fast if no credential is configured.
    /// This is the single explicit credential check at process start.
    pub fn new(config: &Config) -> Result<Self, ChatError> {
        let api_key = config.api_key().ok_or(ChatError::Configuration)?;

        Ok(Self {
            client: reqwest::Client::new(),
            gateway_url: config.gateway_url.clone(),
            api_key,
        })
    }

    /// Issue a streaming completion request and surface incremental output
    /// on the returned channel. The request runs on a spawned task; errors
    /// arrive as `StreamEvent::Failed` rather than tearing anything down.
    pub fn stream_completion(&self, prompt: String, model: String) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(256);

        let client = self.client.clone();
        let url = self.gateway_url.clone();
        let api_key = self.api_key.clone();

        let tx_err = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = Self::run_stream(client, url, api_key, prompt, model, tx).await {
                log::error!("completion stream failed: {e:#}");
                let _ = tx_err.send(StreamEvent::Failed(e.to_string())).await;
            }
        });

        rx
    }

    async fn run_stream(
        client: reqwest::Client,
        url: String,
        api_key: String,
        prompt: String,
        model: String,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        let response = client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&CompletionRequest {
                prompt: &prompt,
                model: &model,
            })
            .send()
            .await
            .map_err(|e| ChatError::RequestFailure(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<GatewayErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("gateway returned {status}"));
            return Err(ChatError::RequestFailure(reason).into());
        }

        let mut stream = response.bytes_stream();
        let mut carry: Vec<u8> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ChatError::RequestFailure(e.to_string()))?;
            let text = take_utf8(&mut carry, &chunk);
            if !text.is_empty() {
                let _ = tx.send(StreamEvent::Delta(text)).await;
            }
        }

        // Anything still in the carry buffer is a truncated sequence;
        // decode it lossily rather than dropping it.
        if !carry.is_empty() {
            let tail = String::from_utf8_lossy(&carry).into_owned();
            let _ = tx.send(StreamEvent::Delta(tail)).await;
        }

        let _ = tx.send(StreamEvent::Done).await;
        Ok(())
    }
}

/// Append `chunk` to the carry buffer and take every complete UTF-8
/// character out of it. A chunk boundary can split a multi-byte sequence,
/// so incomplete trailing bytes stay in the buffer for the next chunk.
fn take_utf8(carry: &mut Vec<u8>, chunk: &[u8]) -> String {
    carry.extend_from_slice(chunk);
    match std::str::from_utf8(carry) {
        Ok(s) => {
            let out = s.to_owned();
            carry.clear();
            out
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let out = String::from_utf8_lossy(&carry[..valid]).into_owned();
            let tail = carry[valid..].to_vec();
            *carry = tail;
            out
        }
        // Invalid bytes in the middle: decode lossily and move on.
        Err(_) => {
            let out = String::from_utf8_lossy(carry).into_owned();
            carry.clear();
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_utf8_passes_ascii_through() {
        let mut carry = Vec::new();
        assert_eq!(take_utf8(&mut carry, b"Hi there"), "Hi there");
        assert!(carry.is_empty());
    }

    #[test]
    fn take_utf8_holds_split_multibyte_char() {
        // "é" is 0xC3 0xA9; split it across two chunks.
        let mut carry = Vec::new();
        assert_eq!(take_utf8(&mut carry, &[b'h', 0xC3]), "h");
        assert_eq!(carry, vec![0xC3]);
        assert_eq!(take_utf8(&mut carry, &[0xA9, b'!']), "é!");
        assert!(carry.is_empty());
    }

    #[test]
    fn take_utf8_single_byte_chunks() {
        let mut carry = Vec::new();
        let mut out = String::new();
        for byte in "héllo".as_bytes() {
            out.push_str(&take_utf8(&mut carry, &[*byte]));
        }
        assert_eq!(out, "héllo");
        assert!(carry.is_empty());
    }

    #[test]
    fn take_utf8_replaces_truly_invalid_bytes() {
        let mut carry = Vec::new();
        let out = take_utf8(&mut carry, &[b'a', 0xFF, b'b']);
        assert_eq!(out, "a\u{FFFD}b");
        assert!(carry.is_empty());
    }
}
