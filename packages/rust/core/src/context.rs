//! Accumulated stage outputs for a run.
//!
//! The bundle is append-only: each stage writes exactly one entry and
//! entries are never replaced. A stage sees only the entries of its declared
//! upstream stages, through [`ContextBundle::restrict`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pressroom_shared::{PressroomError, Result};
use pressroom_tools::Artifact;

use crate::stage::StageId;

/// What one stage produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    pub stage: StageId,
    pub name: String,
    pub role: String,
    /// Generated text.
    pub text: String,
    /// Tool result attached to this stage, if it has a binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

impl StageOutput {
    /// Generated text followed by the rendered tool artifact.
    pub fn render(&self) -> String {
        match &self.artifact {
            Some(artifact) => format!("{}\n\n{}", self.text.trim_end(), artifact.render()),
            None => self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextBundle {
    entries: BTreeMap<StageId, StageOutput>,
}

impl ContextBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stage's output. A second write for the same stage is rejected.
    pub fn insert(&mut self, output: StageOutput) -> Result<()> {
        if self.entries.contains_key(&output.stage) {
            return Err(PressroomError::validation(format!(
                "stage {} already has an output in this run",
                output.stage
            )));
        }
        self.entries.insert(output.stage, output);
        Ok(())
    }

    pub fn get(&self, id: StageId) -> Option<&StageOutput> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: StageId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Outputs in stage-id order.
    pub fn iter(&self) -> impl Iterator<Item = &StageOutput> {
        self.entries.values()
    }

    /// The sub-mapping visible to a stage with the given upstream set, in
    /// declared order. Ids without an output are left out.
    pub fn restrict(&self, upstream: &[StageId]) -> StageInput<'_> {
        StageInput {
            entries: upstream.iter().filter_map(|id| self.entries.get(id)).collect(),
        }
    }
}

/// Read-only view of the upstream outputs a stage may use.
#[derive(Debug)]
pub struct StageInput<'a> {
    entries: Vec<&'a StageOutput>,
}

impl StageInput<'_> {
    pub fn stage_ids(&self) -> Vec<StageId> {
        self.entries.iter().map(|o| o.stage).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|o| format!("## {} (stage {}, {})\n\n{}", o.name, o.stage, o.role, o.render()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(id: u32, text: &str) -> StageOutput {
        StageOutput {
            stage: StageId(id),
            name: format!("s{id}"),
            role: "Role".into(),
            text: text.into(),
            artifact: None,
        }
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut bundle = ContextBundle::new();
        bundle.insert(output(1, "first")).unwrap();
        assert!(bundle.insert(output(1, "again")).is_err());
        assert_eq!(bundle.get(StageId(1)).unwrap().text, "first");
    }

    #[test]
    fn restrict_exposes_only_declared_upstream() {
        let mut bundle = ContextBundle::new();
        for id in 1..=7 {
            bundle.insert(output(id, &format!("text {id}"))).unwrap();
        }

        let input = bundle.restrict(&[StageId(5), StageId(2), StageId(7)]);
        assert_eq!(input.stage_ids(), vec![StageId(5), StageId(2), StageId(7)]);

        let rendered = input.render();
        assert!(rendered.contains("text 5"));
        assert!(rendered.contains("text 2"));
        assert!(!rendered.contains("text 1"));
        assert!(!rendered.contains("text 6"));
        assert!(rendered.find("text 5").unwrap() < rendered.find("text 2").unwrap());
    }

    #[test]
    fn render_appends_artifact() {
        let mut out = output(6, "An image of agents.");
        out.artifact = Some(Artifact::degraded(
            pressroom_tools::CapabilityKind::ImageGeneration,
            "STABILITY_API_KEY is not configured",
        ));
        assert_eq!(
            out.render(),
            "An image of agents.\n\nSTABILITY_API_KEY is not configured"
        );
    }

    #[test]
    fn bundle_json_is_keyed_by_stage() {
        let mut bundle = ContextBundle::new();
        bundle.insert(output(3, "draft")).unwrap();
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["3"]["text"], "draft");
        let back: ContextBundle = serde_json::from_value(json).unwrap();
        assert_eq!(back, bundle);
    }
}
