//! The default eight-stage editorial pipeline.
//!
//! ```text
//! 1 strategy -> 2 seo -> 3 writing -> 4 editing -> 5 proofreading
//! 5 proofreading -> 6 design
//! 5 proofreading -> 7 social
//! {5 proofreading, 2 seo, 7 social} -> 8 publishing
//! ```
//!
//! Strategy pulls grounding context from the knowledge store, design turns
//! its brief into a cover image, and publishing drafts the proofread article
//! using the SEO plan and social copy as metadata.

use pressroom_shared::Result;

use crate::pipeline::Pipeline;
use crate::stage::{Stage, StageId, ToolBinding};

pub const STRATEGY: StageId = StageId(1);
pub const SEO: StageId = StageId(2);
pub const WRITING: StageId = StageId(3);
pub const EDITING: StageId = StageId(4);
pub const PROOFREADING: StageId = StageId(5);
pub const DESIGN: StageId = StageId(6);
pub const SOCIAL: StageId = StageId(7);
pub const PUBLISHING: StageId = StageId(8);

/// Tunables for the editorial stage set.
#[derive(Debug, Clone, Default)]
pub struct EditorialOptions {
    /// Chunks retrieved for the strategy stage.
    pub retrieval_k: usize,
    /// Image style override; `None` uses the image provider's configured style.
    pub image_style: Option<String>,
}

pub fn editorial_stages(options: &EditorialOptions) -> Vec<Stage> {
    vec![
        Stage::new(STRATEGY.0, "strategy", "Senior Content Strategist")
            .instructions(
                "1. Define the objective, target persona, tone of voice (authoritative and \
                 inspiring) and core message for the topic '{topic}'.\n\
                 2. Use the knowledge base context provided to ground the content.\n\
                 Produce a detailed briefing with: Objective, Persona, Tone of Voice, Core \
                 Message and the extracted knowledge base content.",
            )
            .expected_output(
                "A complete content briefing plus the extracted knowledge base content, \
                 ready for the SEO specialist.",
            )
            .tool(ToolBinding::Retrieval {
                k: options.retrieval_k,
            }),
        Stage::new(SEO.0, "seo", "On-Page SEO Specialist")
            .depends_on(&[STRATEGY.0])
            .instructions(
                "Based on the briefing and knowledge base content, carry out (simulated) keyword \
                 research and define the SEO structure. Produce an SEO plan with: primary \
                 keyword, search intent, heading structure (H1, H2, H3) and drafts of the meta \
                 title and meta description.",
            )
            .expected_output("A detailed SEO plan, ready for the copywriter."),
        Stage::new(WRITING.0, "writing", "Persuasive Copywriter and Technical Writer")
            .depends_on(&[SEO.0])
            .instructions(
                "Write the complete article (at least 800 words) following the SEO plan \
                 strictly. Focus on clarity, persuasion and value for the reader while keeping \
                 the defined tone of voice.",
            )
            .expected_output("The initial article draft in Markdown."),
        Stage::new(EDITING.0, "editing", "Content Editor")
            .depends_on(&[WRITING.0])
            .instructions(
                "Review the article draft. Focus on structure, logic, flow and argumentative \
                 coherence. Produce a refined draft ready for the final grammar review.",
            )
            .expected_output("The refined article draft with editorial and structural improvements."),
        Stage::new(PROOFREADING.0, "proofreading", "Proofreader")
            .depends_on(&[EDITING.0])
            .instructions(
                "Proofread the refined draft. Fix grammar, spelling and punctuation errors. \
                 Produce the final article, ready for publication.",
            )
            .expected_output("The final article, free of errors and ready to publish."),
        Stage::new(DESIGN.0, "design", "Content Designer")
            .depends_on(&[PROOFREADING.0])
            .instructions(
                "Write a detailed image-generation prompt for a featured image or infographic \
                 illustrating the article. Reply with the prompt only; its first sentence \
                 becomes the image title.",
            )
            .expected_output("A single-paragraph image description.")
            .tool(ToolBinding::ImageGeneration {
                style: options.image_style.clone(),
            }),
        Stage::new(SOCIAL.0, "social", "Social Media Engagement Specialist")
            .depends_on(&[PROOFREADING.0])
            .instructions(
                "Based on the final article, write 3 social media copy variations (LinkedIn, \
                 Instagram and X/Twitter), including relevant hashtags and a call to action.",
            )
            .expected_output("A text block with the 3 formatted social media posts."),
        Stage::new(PUBLISHING.0, "publishing", "Web Content Manager and WordPress Publisher")
            .depends_on(&[PROOFREADING.0, SEO.0, SOCIAL.0])
            .instructions(
                "Prepare the publication metadata for the final article: meta title and meta \
                 description from the SEO plan, tags and categories, and the social media copy. \
                 Finish with a short summary of the whole process.",
            )
            .expected_output("The publication metadata and a summary of the process.")
            .tool(ToolBinding::Publishing {
                content_from: PROOFREADING,
            }),
    ]
}

pub fn editorial_pipeline(options: &EditorialOptions) -> Result<Pipeline> {
    Pipeline::new(editorial_stages(options))
}
