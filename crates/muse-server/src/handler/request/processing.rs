use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::handler::{ErrorKind, Result};

/// Free text input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextInput {
    pub text: String,
}

impl TextInput {
    /// Returns the text, rejecting blank input.
    pub fn validated(&self) -> Result<&str> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(ErrorKind::BadRequest.with_message("Text must not be empty"));
        }
        Ok(text)
    }
}

/// Base64-encoded audio clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioInput {
    pub audio_base64: String,
}

impl AudioInput {
    /// Decodes the clip.
    pub fn decode(&self) -> Result<Vec<u8>> {
        decode_base64(&self.audio_base64, "audio")
    }
}

/// Base64-encoded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInput {
    pub image_base64: String,
}

impl ImageInput {
    /// Decodes the image.
    pub fn decode(&self) -> Result<Vec<u8>> {
        decode_base64(&self.image_base64, "image")
    }
}

fn decode_base64(encoded: &str, what: &'static str) -> Result<Vec<u8>> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(ErrorKind::BadRequest.with_message(format!("The {what} must not be empty")));
    }
    STANDARD.decode(encoded).map_err(|err| {
        ErrorKind::BadRequest
            .with_message(format!("The {what} is not valid base64"))
            .with_context(err.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        let input = TextInput {
            text: "  \n".into(),
        };
        assert_eq!(input.validated().unwrap_err().kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn decodes_padded_base64() {
        let input = ImageInput {
            image_base64: " aGVsbG8= ".into(),
        };
        assert_eq!(input.decode().unwrap(), b"hello");
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let input = AudioInput {
            audio_base64: "***".into(),
        };
        let error = input.decode().unwrap_err();
        assert_eq!(error.message(), Some("The audio is not valid base64"));
    }
}
