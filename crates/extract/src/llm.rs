use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ingest::{Document, MediaType};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::ExtractError;

/// The external extraction collaborator: document + instruction in, raw text out.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn submit(&self, document: &Document, instruction: &str) -> Result<String, ExtractError>;
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String, // "json_object" for structured output
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    File { file: FileData },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct FileData {
    filename: String,
    file_data: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionsClient {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ExtractError> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    fn document_part(document: &Document) -> ContentPart {
        let data_url = format!(
            "data:{};base64,{}",
            document.media_type.mime(),
            STANDARD.encode(&document.bytes)
        );

        match document.media_type {
            MediaType::Pdf => ContentPart::File {
                file: FileData {
                    filename: format!("{}.pdf", document.doc_id),
                    file_data: data_url,
                },
            },
            _ => ContentPart::ImageUrl {
                image_url: ImageUrl { url: data_url },
            },
        }
    }

    fn build_request(&self, document: &Document, instruction: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    Self::document_part(document),
                    ContentPart::Text {
                        text: instruction.to_string(),
                    },
                ],
            }],
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        }
    }
}

impl Default for ChatCompletionsClient {
    fn default() -> Self {
        Self::new(
            "https://api.openai.com/v1".to_string(),
            "gpt-4o".to_string(),
            None,
        )
    }
}

#[async_trait]
impl ExtractionService for ChatCompletionsClient {
    async fn submit(&self, document: &Document, instruction: &str) -> Result<String, ExtractError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.build_request(document, instruction);

        debug!(
            url = %url,
            model = %self.model,
            bytes = document.bytes.len(),
            media_type = document.media_type.mime(),
            "Submitting document"
        );

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ExtractError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_sent_as_file_part() {
        let client = ChatCompletionsClient::default();
        let doc = Document::new(b"%PDF".to_vec(), MediaType::Pdf);

        let value = serde_json::to_value(client.build_request(&doc, "extract")).unwrap();
        let parts = &value["messages"][0]["content"];

        assert_eq!(parts[0]["type"], "file");
        assert_eq!(parts[0]["file"]["file_data"], "data:application/pdf;base64,JVBERg==");
        assert_eq!(parts[1]["type"], "text");
        assert_eq!(parts[1]["text"], "extract");
        assert_eq!(value["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_image_sent_as_image_url() {
        let client = ChatCompletionsClient::default();
        let doc = Document::new(vec![1, 2, 3], MediaType::Png);

        let value = serde_json::to_value(client.build_request(&doc, "extract")).unwrap();
        let part = &value["messages"][0]["content"][0];

        assert_eq!(part["type"], "image_url");
        assert_eq!(part["image_url"]["url"], "data:image/png;base64,AQID");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ChatCompletionsClient::new("http://localhost:8080/v1/".to_string(), "m".to_string(), None);
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }
}
