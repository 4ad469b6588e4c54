
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PromptConfig;
use crate::document::{Document, Meta};
use crate::{Result, VaultError};

/// User message used when no template is configured
pub const DEFAULT_TEMPLATE: &str = "You are a helpful assistant. Use the following context from my notes to answer the question.

Context:
{% for document in documents %}
{{ document.content }}
{% endfor %}

Question: {{ question }}
Answer:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// What a template sees of each retrieved document
#[derive(Debug, Serialize)]
struct PromptDocument<'a> {
    id: &'a str,
    content: &'a str,
    meta: &'a Meta,
    score: Option<f32>,
}

impl<'a> From<&'a Document> for PromptDocument<'a> {
    fn from(document: &'a Document) -> Self {
        Self {
            id: &document.id,
            content: &document.content,
            meta: &document.meta,
            score: document.score,
        }
    }
}

/// Renders chat messages whose contents are Jinja templates.
///
/// Templates see `documents` (each with `id`, `content`, `meta` and `score`)
/// and `question`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPromptBuilder {
    templates: Vec<ChatMessage>,
}

impl Default for ChatPromptBuilder {
    #[inline]
    fn default() -> Self {
        Self {
            templates: vec![ChatMessage::user(DEFAULT_TEMPLATE)],
        }
    }
}

impl ChatPromptBuilder {
    /// Every message content must parse as a template
    #[inline]
    pub fn new(templates: Vec<ChatMessage>) -> Result<Self> {
        let env = Environment::new();
        for message in &templates {
            env.template_from_str(&message.content)
                .map_err(|e| VaultError::Template(e.to_string()))?;
        }
        Ok(Self { templates })
    }

    /// A single user message rendered from `template`
    #[inline]
    pub fn from_template(template: &str) -> Result<Self> {
        Self::new(vec![ChatMessage::user(template)])
    }

    #[inline]
    pub fn from_config(config: &PromptConfig) -> Result<Self> {
        config
            .template
            .as_deref()
            .map_or_else(|| Ok(Self::default()), Self::from_template)
    }

    #[inline]
    pub fn templates(&self) -> &[ChatMessage] {
        &self.templates
    }

    #[inline]
    pub fn run(&self, question: &str, documents: &[Document]) -> Result<Vec<ChatMessage>> {
        let env = Environment::new();
        let document_count = documents.len();
        let views: Vec<PromptDocument<'_>> = documents.iter().map(PromptDocument::from).collect();
        let ctx = context! {
            documents => views,
            question => question,
        };

        let messages = self
            .templates
            .iter()
            .map(|template| {
                env.render_str(&template.content, &ctx)
                    .map(|content| ChatMessage {
                        role: template.role,
                        content,
                    })
                    .map_err(|e| VaultError::Template(format!("{:#}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Rendered {} prompt messages with {} documents",
            messages.len(),
            document_count
        );
        Ok(messages)
    }
}
