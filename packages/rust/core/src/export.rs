//! Run export: a Markdown post and a JSON dump of the full run.
//!
//! Files are written atomically (temp file, then rename) and named after the
//! run's start time to the millisecond: `post_<YYYYmmdd_HHMMSS_mmm>.md` and
//! `run_<YYYYmmdd_HHMMSS_mmm>.json`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use pressroom_shared::{PressroomError, Result};
use pressroom_tools::Artifact;

use crate::pipeline::{PipelineRun, RunStatus};

/// Where a run was exported to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub post: PathBuf,
    pub run: PathBuf,
}

#[instrument(skip_all, fields(run_id = %run.id, dir = %dir.display()))]
pub fn export_run(run: &PipelineRun, dir: &Path) -> Result<ExportPaths> {
    std::fs::create_dir_all(dir).map_err(|e| PressroomError::io(dir, e))?;

    let stamp = run.started_at.format("%Y%m%d_%H%M%S_%3f");
    let post = dir.join(format!("post_{stamp}.md"));
    let run_path = dir.join(format!("run_{stamp}.json"));

    write_atomic(&post, render_post(run).as_bytes())?;

    let json = serde_json::to_string_pretty(run)
        .map_err(|e| PressroomError::validation(format!("JSON serialization failed: {e}")))?;
    write_atomic(&run_path, json.as_bytes())?;

    info!(post = %post.display(), run = %run_path.display(), "run exported");
    Ok(ExportPaths {
        post,
        run: run_path,
    })
}

fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = target.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| PressroomError::io(&temp, e))?;
    std::fs::rename(&temp, target).map_err(|e| PressroomError::io(target, e))?;

    debug!(path = %target.display(), size = content.len(), "wrote export file");
    Ok(())
}

/// Markdown rendering: topic and status, final output, every stage section,
/// then the side artifacts.
pub fn render_post(run: &PipelineRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", run.topic);
    let _ = writeln!(out, "- Run: `{}`", run.id);
    let _ = writeln!(out, "- Started: {}", run.started_at.to_rfc3339());
    if let Some(finished) = run.finished_at {
        let _ = writeln!(out, "- Finished: {}", finished.to_rfc3339());
    }
    match &run.status {
        RunStatus::Completed => out.push_str("- Status: completed\n"),
        RunStatus::Running => out.push_str("- Status: running\n"),
        RunStatus::Failed { stage, cause } => {
            let _ = writeln!(out, "- Status: failed at stage {stage}: {cause}");
        }
    }

    if let Some(final_output) = run.final_output() {
        let _ = write!(out, "\n## Final output\n\n{}\n", final_output.render().trim_end());
    }

    for output in run.bundle.iter() {
        let _ = write!(
            out,
            "\n## Stage {}: {} ({})\n\n{}\n",
            output.stage,
            output.name,
            output.role,
            output.text.trim_end()
        );
    }

    let artifacts: Vec<_> = run.artifacts().collect();
    if !artifacts.is_empty() {
        out.push_str("\n## Artifacts\n\n");
        for (output, artifact) in artifacts {
            let _ = writeln!(out, "- stage {} ({}): {}", output.stage, output.name, summarize(artifact));
        }
    }
    out
}

fn summarize(artifact: &Artifact) -> String {
    match artifact {
        Artifact::Context { context, .. } => {
            format!("knowledge base context, {} chars", context.chars().count())
        }
        Artifact::Image { path, title, .. } => format!("image `{}` ({title})", path.display()),
        Artifact::Publication {
            status, reference, ..
        } => format!("publication {status} at {reference}"),
        Artifact::Degraded {
            capability,
            message,
        } => format!("{capability} degraded: {message}"),
    }
}
