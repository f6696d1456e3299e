use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tripmate_core::{ConversationContext, Intent, NamedTool, ToolPolicy};

#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    pub conversation: &'a ConversationContext,
}

impl<'a> ToolContext<'a> {
    pub fn new(conversation: &'a ConversationContext) -> Self {
        Self { conversation }
    }

    pub fn latest_travel_plan(&self) -> Option<&'a str> {
        self.conversation.latest_travel_plan()
    }
}

/// String in, string out. Input grammars are `;`-separated and documented in
/// each tool's description.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, input: &str, ctx: &ToolContext<'_>) -> Result<String>;
}

#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub async fn invoke(&self, input: &str, ctx: &ToolContext<'_>) -> Result<String> {
        self.handler.invoke(input, ctx).await
    }
}

impl NamedTool for ToolDescriptor {
    fn tool_name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool `{0}` is already registered")]
    Duplicate(String),
}

/// Process-wide tool list, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: ToolDescriptor) -> Result<(), RegistryError> {
        if self.get(tool.name()).is_some() {
            return Err(RegistryError::Duplicate(tool.name().to_string()));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(ToolDescriptor::name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn allowed_for(&self, policy: &ToolPolicy, intent: Intent) -> Vec<ToolDescriptor> {
        policy.filter(intent, &self.tools)
    }
}
