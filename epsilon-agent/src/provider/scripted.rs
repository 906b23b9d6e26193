//! Scripted provider
//!
//! Replays a fixed queue of responses in order and records every request it
//! receives. Drives the controller tests without a network.

use super::*;
use std::collections::VecDeque;
use std::sync::Mutex;

pub struct ScriptedProvider {
    model: String,
    replies: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn reply(self, response: CompletionResponse) -> Self {
        self.push(Ok(response));
        self
    }

    /// Queue a plain-text reply
    pub fn say(self, content: impl Into<String>, prompt_tokens: usize, completion_tokens: usize) -> Self {
        self.reply(CompletionResponse::text(content, prompt_tokens, completion_tokens))
    }

    /// Queue a failed call
    pub fn fail(self, error: ProviderError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, item: Result<CompletionResponse, ProviderError>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(item);
        }
    }

    /// Replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let next = self
            .replies
            .lock()
            .map_err(|_| ProviderError::Other("script lock poisoned".into()))?
            .pop_front();

        match next {
            Some(Ok(mut response)) => {
                if response.model.is_empty() {
                    response.model = self.model.clone();
                }
                Ok(response)
            }
            Some(Err(e)) => Err(e),
            None => Err(ProviderError::Other("script exhausted".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_and_records_requests() {
        let provider = ScriptedProvider::new("scripted-model")
            .say("look", 10, 2)
            .fail(ProviderError::AuthenticationFailed);

        let first = provider
            .complete(CompletionRequest::new(vec![ChatMessage::user("start")]))
            .await
            .unwrap();
        assert_eq!(first.content.as_deref(), Some("look"));
        assert_eq!(first.model, "scripted-model");
        assert_eq!(first.usage.total_tokens, 12);

        let second = provider.complete(CompletionRequest::default()).await;
        assert!(matches!(second, Err(ProviderError::AuthenticationFailed)));

        let third = provider.complete(CompletionRequest::default()).await;
        assert!(matches!(third, Err(ProviderError::Other(_))));

        assert_eq!(provider.requests().len(), 3);
        assert_eq!(provider.remaining(), 0);
    }
}
