use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct ChatRequest {
    question: String,
    conversation_id: String,
}

/// One grounding snippet returned alongside an answer: the path of the
/// document it came from and the excerpt that was retrieved.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub source: String,
    pub content: String,
}

/// Successful answer from the backend. `source_documents` and
/// `conversation_id` are optional; other fields (e.g. the server-side
/// history) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub source_documents: Vec<SourceRef>,
    pub conversation_id: Option<String>,
}

/// Error bodies carry the human-readable message in the same `response`
/// field as successes.
#[derive(Deserialize)]
struct ErrorBody {
    response: Option<String>,
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn ask(&self, question: &str, conversation_id: &str) -> Result<ChatReply> {
        let url = format!("{}/api/chat", self.base_url);

        let request = ChatRequest {
            question: question.to_string(),
            conversation_id: conversation_id.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(extract_error_message(&body, status.as_u16())));
        }

        let reply: ChatReply = response.json().await?;
        Ok(reply)
    }
}

/// Pull the server-supplied message out of a non-success body, falling back
/// to a generic message when the body is not the expected JSON shape.
fn extract_error_message(body: &str, status: u16) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.response)
        .unwrap_or_else(|| format!("The server returned an error (status {})", status))
}
