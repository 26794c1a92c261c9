//! Process-wide context: one knowledge store, one tool layer, one generator,
//! one scheduler and one pipeline, built once from [`AppConfig`].

use std::sync::Arc;

use rand::Rng;
use tracing::{info, instrument, warn};

use pressroom_knowledge::{IngestReport, KnowledgeStore};
use pressroom_llm::{Embedder, OpenAiClient, TextGenerator};
use pressroom_scheduler::{Selection, TopicScheduler};
use pressroom_shared::{AppConfig, Result, validate_api_key};
use pressroom_tools::{
    ImageProvider, KnowledgeRetriever, SimulatedPublisher, StabilityImageGenerator,
    ToolInvocationLayer,
};

use crate::editorial::{EditorialOptions, editorial_pipeline};
use crate::export::{ExportPaths, export_run};
use crate::pipeline::{Pipeline, PipelineRun, ProgressReporter};

/// Outcome of running the pipeline for one topic.
#[derive(Debug)]
pub struct RunOutcome {
    pub run: PipelineRun,
    pub export: Option<ExportPaths>,
}

/// Outcome of a full scheduling cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub suggested: Vec<String>,
    pub selection: Selection,
    pub run: PipelineRun,
    pub export: Option<ExportPaths>,
}

pub struct Agency {
    config: AppConfig,
    knowledge: Arc<KnowledgeStore>,
    generator: Arc<dyn TextGenerator>,
    tools: ToolInvocationLayer,
    scheduler: TopicScheduler,
    pipeline: Pipeline,
}

impl Agency {
    /// Wire production capabilities: the OpenAI-compatible client for both
    /// generation and embeddings, Stability AI for images, and the simulated
    /// publisher.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        validate_api_key(&config)?;
        let client = Arc::new(OpenAiClient::from_config(&config.llm)?);
        let image = Arc::new(StabilityImageGenerator::from_config(&config.image)?);
        Self::with_capabilities(config, client.clone(), client, image)
    }

    /// Wire explicit capabilities. Used by tests and alternative backends.
    pub fn with_capabilities(
        config: AppConfig,
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn Embedder>,
        image: Arc<dyn ImageProvider>,
    ) -> Result<Self> {
        let knowledge = Arc::new(KnowledgeStore::new(
            config.knowledge.clone(),
            embedder,
            generator.clone(),
        )?);

        let tools = ToolInvocationLayer::new(
            Arc::new(KnowledgeRetriever::new(knowledge.clone())),
            image,
            Arc::new(SimulatedPublisher::new(&config.publishing)),
        );

        let pipeline = editorial_pipeline(&EditorialOptions {
            retrieval_k: config.knowledge.top_k,
            image_style: None,
        })?;

        Ok(Self {
            scheduler: TopicScheduler::from_config(&config.scheduler),
            config,
            knowledge,
            generator,
            tools,
            pipeline,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeStore> {
        &self.knowledge
    }

    pub fn scheduler(&self) -> &TopicScheduler {
        &self.scheduler
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub async fn index(&self) -> Result<IngestReport> {
        self.knowledge.load_and_index().await
    }

    /// Run the pipeline for `topic` and export it when enabled.
    ///
    /// A failed stage does not make this return `Err`; check the run status.
    /// Only export I/O errors are returned.
    #[instrument(skip_all, fields(topic = %topic))]
    pub async fn run_topic(&self, topic: &str, progress: &dyn ProgressReporter) -> Result<RunOutcome> {
        progress.phase("Running editorial pipeline");
        let run = self
            .pipeline
            .run(topic, self.generator.as_ref(), &self.tools, progress)
            .await;

        let export = if self.config.output.export {
            progress.phase("Exporting run");
            Some(export_run(&run, &self.config.output.dir)?)
        } else {
            None
        };

        Ok(RunOutcome { run, export })
    }

    /// Suggest topics, select one, run the pipeline on it and export.
    pub async fn run_cycle<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        progress: &dyn ProgressReporter,
    ) -> Result<CycleReport> {
        progress.phase("Suggesting topics");
        let suggested = self.knowledge.suggest_topics().await;
        if suggested.is_empty() {
            warn!("knowledge store suggested no topics");
        }

        progress.phase("Selecting topic");
        let selection = self.scheduler.next_topic(&suggested, rng);
        info!(topic = %selection.topic, state = ?selection.state, "cycle topic chosen");

        let RunOutcome { run, export } = self.run_topic(&selection.topic, progress).await?;
        Ok(CycleReport {
            suggested,
            selection,
            run,
            export,
        })
    }
}
