//! Google Translate text-to-speech.
//!
//! The public endpoint accepts short inputs only, so text is split into
//! chunks of at most [`MAX_CHUNK_CHARS`] characters on word boundaries. The
//! MP3 segments returned for each chunk are concatenated in order.

use bytes::{Bytes, BytesMut};
use muse_core::Provider;
use muse_core::adapter::TtsAdapter;

use crate::TRACING_TARGET;
use crate::error::{Error, Result};
use crate::http::{HttpClient, ensure_success};

/// Default endpoint of the Google Translate TTS service.
pub const DEFAULT_BASE_URL: &str = "https://translate.google.com/translate_tts";

/// Longest text accepted per request.
pub const MAX_CHUNK_CHARS: usize = 100;

/// Credential-free speech synthesis.
#[derive(Debug, Clone)]
pub struct GttsTts {
    http: HttpClient,
    base_url: String,
    language: String,
}

impl GttsTts {
    pub fn new(http: HttpClient, language: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_owned(),
            language: language.into(),
        }
    }

    /// Overrides the endpoint URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_chunk(&self, chunk: &str) -> Result<Bytes> {
        let request = self.http.client().get(&self.base_url).query(&[
            ("ie", "UTF-8"),
            ("q", chunk),
            ("tl", self.language.as_str()),
            ("client", "tw-ob"),
        ]);
        let response = ensure_success(Provider::Gtts, request.send().await?).await?;
        Ok(response.bytes().await?)
    }
}

#[async_trait::async_trait]
impl TtsAdapter for GttsTts {
    fn provider(&self) -> Provider {
        Provider::Gtts
    }

    async fn speak(&self, text: &str) -> muse_core::Result<Bytes> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(Error::malformed(Provider::Gtts, "nothing to speak").into());
        }

        tracing::debug!(
            target: TRACING_TARGET,
            language = %self.language,
            chunks = chunks.len(),
            "Sending gTTS requests"
        );

        let mut audio = BytesMut::new();
        for chunk in &chunks {
            audio.extend_from_slice(&self.fetch_chunk(chunk).await?);
        }
        Ok(audio.freeze())
    }
}

/// Splits text into chunks of at most `max_chars` characters.
///
/// Breaks happen between words; a single word longer than the limit is cut
/// at the limit.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word = word;
        let mut word_len = word.chars().count();

        while word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let split_at = word
                .char_indices()
                .nth(max_chars)
                .map_or(word.len(), |(index, _)| index);
            chunks.push(word[..split_at].to_owned());
            word = &word[split_at..];
            word_len -= max_chars;
        }

        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::Router;
    use axum::extract::Query;
    use axum::routing::get;

    use super::*;
    use crate::config::AdapterConfig;
    use crate::http::test_server;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_text("hello  world", 100), vec!["hello world"]);
        assert!(split_text("   ", 100).is_empty());
    }

    #[test]
    fn chunks_respect_limit_and_word_boundaries() {
        let text = "word ".repeat(50);
        let chunks = split_text(&text, 100);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100);
            assert!(!chunk.starts_with(' ') && !chunk.ends_with(' '));
        }
        assert_eq!(chunks.join(" "), text.trim());
    }

    #[test]
    fn long_words_are_cut() {
        let word = "é".repeat(250);
        let chunks = split_text(&word, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].chars().count(), 50);
    }

    #[tokio::test]
    async fn concatenates_chunk_audio() {
        let router = Router::new().route(
            "/translate_tts",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                if params.get("tl").map(String::as_str) == Some("en")
                    && params.get("client").map(String::as_str) == Some("tw-ob")
                {
                    b"mp3".to_vec()
                } else {
                    Vec::new()
                }
            }),
        );
        let base_url = test_server::serve(router).await;
        let http = HttpClient::new(&AdapterConfig::default()).unwrap();
        let tts = GttsTts::new(http, "en").with_base_url(format!("{base_url}/translate_tts"));

        let text = "word ".repeat(50);
        let expected = split_text(&text, MAX_CHUNK_CHARS).len();
        let audio = tts.speak(&text).await.unwrap();
        assert_eq!(audio.len(), 3 * expected);
    }
}
