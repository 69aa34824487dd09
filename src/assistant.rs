use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One prior turn of a check-in conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: String,
    pub text: String,
}

impl ChatTurn {
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            text: text.into(),
        }
    }
    #[cfg(test)]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            text: text.into(),
        }
    }
}

#[async_trait]
pub trait AssistantClient: Send + Sync {
    /// Produce the assistant's next reply for `system` + `history` + `user_text`.
    async fn complete(
        &self,
        system: &str,
        history: &[ChatTurn],
        user_text: &str,
    ) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct OpenAiAssistant {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiAssistant {
    pub fn new(api_key: String, base_url: String, model: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

fn build_messages<'a>(
    system: &'a str,
    history: &'a [ChatTurn],
    user_text: &'a str,
) -> Vec<ChatMessage<'a>> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage {
        role: "system",
        content: system,
    });
    for turn in history {
        messages.push(ChatMessage {
            role: turn.role.as_str(),
            content: turn.text.as_str(),
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: user_text,
    });
    messages
}

#[async_trait]
impl AssistantClient for OpenAiAssistant {
    async fn complete(
        &self,
        system: &str,
        history: &[ChatTurn],
        user_text: &str,
    ) -> anyhow::Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: build_messages(system, history, user_text),
            temperature: 0.7,
        };
        let res: ChatResponse = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request")?
            .error_for_status()
            .context("chat completion status")?
            .json()
            .await
            .context("chat completion body")?;

        res.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("chat completion returned no content"))
    }
}

/// Used when no API key is configured; every call fails so callers fall back.
pub struct UnconfiguredAssistant;

#[async_trait]
impl AssistantClient for UnconfiguredAssistant {
    async fn complete(&self, _: &str, _: &[ChatTurn], _: &str) -> anyhow::Result<String> {
        anyhow::bail!("assistant is not configured")
    }
}

#[cfg(test)]
pub struct ScriptedAssistant {
    reply: String,
}

#[cfg(test)]
impl ScriptedAssistant {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl AssistantClient for ScriptedAssistant {
    async fn complete(&self, _: &str, _: &[ChatTurn], _: &str) -> anyhow::Result<String> {
        Ok(self.reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_system_history_then_user() {
        let history = vec![ChatTurn::assistant("Good morning!"), ChatTurn::user("hi")];
        let msgs = build_messages("be kind", &history, "slept well");
        let roles: Vec<&str> = msgs.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "assistant", "user", "user"]);
        assert_eq!(msgs[0].content, "be kind");
        assert_eq!(msgs[3].content, "slept well");
    }

    #[tokio::test]
    async fn unconfigured_assistant_errors() {
        let err = UnconfiguredAssistant.complete("s", &[], "u").await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let a = OpenAiAssistant::new("k".into(), "http://x/v1/".into(), "m".into()).unwrap();
        assert_eq!(a.base_url, "http://x/v1");
    }
}
