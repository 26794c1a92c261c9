//! Capability kinds and the artifacts tool calls produce.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The external capabilities a stage can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Retrieval,
    ImageGeneration,
    Publishing,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Retrieval => "retrieval",
            Self::ImageGeneration => "image_generation",
            Self::Publishing => "publishing",
        })
    }
}

/// Result of a tool call. Always well-formed: failures are carried as
/// [`Artifact::Degraded`] rather than raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    /// Knowledge-base context retrieved for a query.
    Context { query: String, context: String },
    /// A generated image written to disk.
    Image {
        path: PathBuf,
        title: String,
        prompt: String,
    },
    /// Confirmation of a (possibly simulated) publication.
    Publication {
        status: String,
        reference: String,
        title: String,
        metadata: String,
    },
    /// Human-readable explanation of why a capability could not deliver.
    Degraded {
        capability: CapabilityKind,
        message: String,
    },
}

impl Artifact {
    pub fn degraded(capability: CapabilityKind, message: impl Into<String>) -> Self {
        Self::Degraded {
            capability,
            message: message.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// The capability that produced this artifact.
    pub fn capability(&self) -> CapabilityKind {
        match self {
            Self::Context { .. } => CapabilityKind::Retrieval,
            Self::Image { .. } => CapabilityKind::ImageGeneration,
            Self::Publication { .. } => CapabilityKind::Publishing,
            Self::Degraded { capability, .. } => *capability,
        }
    }

    /// Text handed to the generation capability as part of a stage's input.
    pub fn render(&self) -> String {
        match self {
            Self::Context { query, context } => format!(
                "[KNOWLEDGE BASE CONTEXT]\n\n\
                 Topic: {query}\n\n\
                 Retrieved context:\n{context}\n\n\
                 Instructions: ground the post in the data above, keeping every \
                 technical claim accurate and traceable to the provided documents."
            ),
            Self::Image {
                path,
                title,
                prompt,
            } => format!(
                "[COVER IMAGE GENERATED]\n\n\
                 Title: {title}\n\
                 Path: {}\n\
                 Prompt: {prompt}",
                path.display()
            ),
            Self::Publication {
                status,
                reference,
                title,
                metadata,
            } => format!(
                "[POST PUBLISHED]\n\n\
                 Title: {title}\n\
                 Status: {status}\n\
                 Preview URL: {reference}\n\
                 Metadata: {metadata}\n\n\
                 Awaiting final approval from the web content manager."
            ),
            Self::Degraded { message, .. } => message.clone(),
        }
    }
}
