//! Stage-graph orchestration.
//!
//! A [`Pipeline`] is an ordered list of stages whose declared order is a
//! topological order of their dependency graph (checked at construction).
//! [`Pipeline::run`] executes the stages one at a time in that order. Each
//! stage sees only its declared upstream outputs. The first failing stage
//! ends the run and everything written so far stays in the bundle.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, info_span, instrument};

use pressroom_llm::{GenerationRequest, TextGenerator};
use pressroom_shared::{PressroomError, Result, RunId};
use pressroom_tools::{
    Artifact, ImageRequest, PublishRequest, RetrievalRequest, ToolInvocationLayer, ToolRequest,
};

use crate::context::{ContextBundle, StageOutput};
use crate::stage::{Stage, StageId, ToolBinding};

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a stage executes. `position` is 1-based.
    fn stage_started(&self, stage: &Stage, position: usize, total: usize);
    /// Called after a stage's output has been recorded.
    fn stage_finished(&self, output: &StageOutput);
    /// Called once the run has completed or failed.
    fn done(&self, run: &PipelineRun);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn stage_started(&self, _stage: &Stage, _position: usize, _total: usize) {}
    fn stage_finished(&self, _output: &StageOutput) {}
    fn done(&self, _run: &PipelineRun) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed { stage: StageId, cause: String },
}

/// State of one pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: RunId,
    pub topic: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Stage whose output is the run's final artifact.
    pub terminal: StageId,
    pub bundle: ContextBundle,
    pub status: RunStatus,
}

impl PipelineRun {
    fn start(topic: &str, terminal: StageId) -> Self {
        Self {
            id: RunId::new(),
            topic: topic.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            terminal,
            bundle: ContextBundle::new(),
            status: RunStatus::Running,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Output of the terminal stage, present only once the run completed.
    pub fn final_output(&self) -> Option<&StageOutput> {
        if self.is_completed() {
            self.bundle.get(self.terminal)
        } else {
            None
        }
    }

    /// Tool artifacts attached to any stage, in stage order.
    pub fn artifacts(&self) -> impl Iterator<Item = (&StageOutput, &Artifact)> {
        self.bundle
            .iter()
            .filter_map(|o| o.artifact.as_ref().map(|a| (o, a)))
    }

    /// `Ok(self)` if completed, otherwise the stage error that ended it.
    pub fn into_result(self) -> Result<Self> {
        match &self.status {
            RunStatus::Completed => Ok(self),
            RunStatus::Failed { stage, cause } => Err(PressroomError::Stage {
                stage: stage.0,
                message: cause.clone(),
            }),
            RunStatus::Running => Err(PressroomError::validation(format!(
                "run {} has not finished",
                self.id
            ))),
        }
    }
}

/// A validated, ordered set of stages.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Validate the stage graph.
    ///
    /// Rejects an empty list, duplicate ids, upstream ids not defined earlier
    /// in the list, and publishing bindings whose `content_from` is not an
    /// upstream of the same stage.
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        if stages.is_empty() {
            return Err(PressroomError::graph("pipeline has no stages"));
        }

        let mut defined: HashSet<StageId> = HashSet::new();
        for stage in &stages {
            for upstream in &stage.upstream {
                if *upstream == stage.id {
                    return Err(PressroomError::graph(format!(
                        "stage {} depends on itself",
                        stage.id
                    )));
                }
                if !defined.contains(upstream) {
                    return Err(PressroomError::graph(format!(
                        "stage {} depends on stage {upstream}, which is not defined before it",
                        stage.id
                    )));
                }
            }
            if let Some(ToolBinding::Publishing { content_from }) = &stage.tool {
                if !stage.upstream.contains(content_from) {
                    return Err(PressroomError::graph(format!(
                        "stage {} publishes content from stage {content_from}, which is not one of its upstream stages",
                        stage.id
                    )));
                }
            }
            if !defined.insert(stage.id) {
                return Err(PressroomError::graph(format!("duplicate stage id {}", stage.id)));
            }
        }

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// The last stage in order; its output is the run's final artifact.
    pub fn terminal(&self) -> &Stage {
        // `new` rejects empty pipelines.
        &self.stages[self.stages.len() - 1]
    }

    /// Execute every stage once, in order.
    ///
    /// Never returns an error: a failing stage is reported in
    /// [`PipelineRun::status`] with its id and cause.
    #[instrument(skip_all, fields(topic = %topic, stages = self.stages.len()))]
    pub async fn run(
        &self,
        topic: &str,
        generator: &dyn TextGenerator,
        tools: &ToolInvocationLayer,
        progress: &dyn ProgressReporter,
    ) -> PipelineRun {
        let mut run = PipelineRun::start(topic, self.terminal().id);
        let total = self.stages.len();
        info!(run_id = %run.id, "pipeline run started");

        for (index, stage) in self.stages.iter().enumerate() {
            progress.stage_started(stage, index + 1, total);
            let span = info_span!("stage", id = stage.id.0, name = %stage.name);

            let result = async {
                let output = execute_stage(stage, topic, &run.bundle, generator, tools).await?;
                run.bundle.insert(output.clone())?;
                Ok::<_, PressroomError>(output)
            }
            .instrument(span)
            .await;

            match result {
                Ok(output) => {
                    info!(stage = stage.id.0, chars = output.text.len(), "stage complete");
                    progress.stage_finished(&output);
                }
                Err(e) => {
                    let cause = match e {
                        PressroomError::Stage { message, .. } => message,
                        other => other.to_string(),
                    };
                    error!(stage = stage.id.0, %cause, "stage failed, aborting run");
                    run.status = RunStatus::Failed {
                        stage: stage.id,
                        cause,
                    };
                    break;
                }
            }
        }

        if run.status == RunStatus::Running {
            run.status = RunStatus::Completed;
        }
        run.finished_at = Some(Utc::now());
        info!(run_id = %run.id, status = ?run.status, outputs = run.bundle.len(), "pipeline run finished");
        progress.done(&run);
        run
    }
}

async fn execute_stage(
    stage: &Stage,
    topic: &str,
    bundle: &ContextBundle,
    generator: &dyn TextGenerator,
    tools: &ToolInvocationLayer,
) -> Result<StageOutput> {
    let retrieved = match &stage.tool {
        Some(ToolBinding::Retrieval { k }) => Some(
            tools
                .invoke(ToolRequest::Retrieval(RetrievalRequest {
                    query: topic.to_string(),
                    k: *k,
                }))
                .await,
        ),
        _ => None,
    };

    let mut sections = Vec::new();
    if stage.is_root() {
        sections.push(format!("## Topic\n\n{topic}"));
    }
    let input = bundle.restrict(&stage.upstream);
    if !input.is_empty() {
        sections.push(input.render());
    }
    if let Some(artifact) = &retrieved {
        sections.push(format!("## Knowledge base\n\n{}", artifact.render()));
    }

    let request = GenerationRequest {
        role: stage.role.clone(),
        instructions: stage.instructions_for(topic),
        context: sections.join("\n\n"),
        expected_output: stage.expected_output.clone(),
    };

    let text = generator
        .generate(&request)
        .await
        .map_err(|e| PressroomError::Stage {
            stage: stage.id.0,
            message: e.to_string(),
        })?;

    let artifact = match &stage.tool {
        Some(ToolBinding::Retrieval { .. }) => retrieved,
        Some(ToolBinding::ImageGeneration { style }) => Some(
            tools
                .invoke(ToolRequest::ImageGeneration(ImageRequest {
                    description: text.clone(),
                    style: style.clone(),
                }))
                .await,
        ),
        Some(ToolBinding::Publishing { content_from }) => {
            let content = bundle
                .get(*content_from)
                .map(|o| o.text.clone())
                .unwrap_or_default();
            Some(
                tools
                    .invoke(ToolRequest::Publishing(PublishRequest {
                        title: topic.to_string(),
                        content,
                        metadata: text.clone(),
                    }))
                    .await,
            )
        }
        None => None,
    };

    Ok(StageOutput {
        stage: stage.id,
        name: stage.name.clone(),
        role: stage.role.clone(),
        text,
        artifact,
    })
}
