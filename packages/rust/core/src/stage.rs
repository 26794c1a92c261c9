//! Stage definitions: identity, role, dependencies and tool binding.

use std::fmt;

use serde::{Deserialize, Serialize};

use pressroom_tools::CapabilityKind;

/// Identifier of a stage within a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(pub u32);

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which capability a stage invokes, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "capability", rename_all = "snake_case")]
pub enum ToolBinding {
    /// Query the knowledge store with the run topic before generating.
    Retrieval { k: usize },
    /// Turn the generated text into an image after generating.
    ImageGeneration { style: Option<String> },
    /// Publish the text of `content_from` after generating; the generated
    /// text becomes the publication metadata.
    Publishing { content_from: StageId },
}

impl ToolBinding {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::Retrieval { .. } => CapabilityKind::Retrieval,
            Self::ImageGeneration { .. } => CapabilityKind::ImageGeneration,
            Self::Publishing { .. } => CapabilityKind::Publishing,
        }
    }
}

/// One unit of work in the pipeline.
///
/// `instructions` may contain `{topic}`, replaced with the run topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub id: StageId,
    /// Short machine name (`strategy`, `seo`, ...), used in exports.
    pub name: String,
    /// Role label handed to the generator.
    pub role: String,
    pub upstream: Vec<StageId>,
    pub instructions: String,
    pub expected_output: String,
    pub tool: Option<ToolBinding>,
}

impl Stage {
    pub fn new(id: u32, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: StageId(id),
            name: name.into(),
            role: role.into(),
            upstream: Vec::new(),
            instructions: String::new(),
            expected_output: String::new(),
            tool: None,
        }
    }

    pub fn depends_on(mut self, upstream: &[u32]) -> Self {
        self.upstream = upstream.iter().copied().map(StageId).collect();
        self
    }

    pub fn instructions(mut self, text: impl Into<String>) -> Self {
        self.instructions = text.into();
        self
    }

    pub fn expected_output(mut self, text: impl Into<String>) -> Self {
        self.expected_output = text.into();
        self
    }

    pub fn tool(mut self, binding: ToolBinding) -> Self {
        self.tool = Some(binding);
        self
    }

    /// Root stages have no upstream and receive the run topic directly.
    pub fn is_root(&self) -> bool {
        self.upstream.is_empty()
    }

    pub fn instructions_for(&self, topic: &str) -> String {
        self.instructions.replace("{topic}", topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_dependencies_and_tool() {
        let stage = Stage::new(8, "publishing", "Publisher")
            .depends_on(&[5, 2, 7])
            .tool(ToolBinding::Publishing {
                content_from: StageId(5),
            });
        assert_eq!(stage.upstream, vec![StageId(5), StageId(2), StageId(7)]);
        assert!(!stage.is_root());
        assert_eq!(stage.tool.as_ref().map(ToolBinding::kind), Some(CapabilityKind::Publishing));
    }

    #[test]
    fn topic_placeholder_is_substituted() {
        let stage = Stage::new(1, "strategy", "Strategist").instructions("Plan a post on '{topic}'.");
        assert!(stage.is_root());
        assert_eq!(stage.instructions_for("Rust"), "Plan a post on 'Rust'.");
    }
}
