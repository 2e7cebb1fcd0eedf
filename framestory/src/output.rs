use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use framestory_ml::story::{StoryModel, TextGenerator};
use framestory_ml::{GenerateOptions, ModelSpec};
use serde::{Deserialize, Serialize};

use crate::metadata::FrameMetadata;
use crate::story::{generate_story, generate_title};

pub const OUTPUT_FILE: &str = "story_output.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub frame: String,
    pub event: String,
}

/// The final artifact of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryOutput {
    pub title: String,
    pub characters: Vec<String>,
    pub summary: String,
    pub events: Vec<Event>,
}

/// frame_id → scene_description. A repeated frame id keeps its last entry.
pub fn metadata_dict(metadata: &[FrameMetadata]) -> BTreeMap<String, String> {
    metadata
        .iter()
        .map(|frame| (frame.frame_id.clone(), frame.scene_description.clone()))
        .collect()
}

pub fn characters(metadata: &[FrameMetadata]) -> Vec<String> {
    metadata
        .iter()
        .flat_map(|frame| frame.objects_detected.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn events(metadata: &[FrameMetadata]) -> Vec<Event> {
    metadata
        .iter()
        .map(|frame| Event {
            frame: frame.frame_id.clone(),
            event: frame.scene_description.clone(),
        })
        .collect()
}

/// Writes the story, then a title for it, and merges both with the frame
/// metadata.
pub fn assemble_story<G: TextGenerator + ?Sized>(
    metadata: &[FrameMetadata],
    generator: &mut G,
    story_prompt: &str,
) -> Result<StoryOutput> {
    try_assemble(metadata, generator, story_prompt)
        .inspect_err(|err| tracing::error!("Failed to build output format: {err:#}"))
        .context("Output formatting failed")
}

fn try_assemble<G: TextGenerator + ?Sized>(
    metadata: &[FrameMetadata],
    generator: &mut G,
    story_prompt: &str,
) -> Result<StoryOutput> {
    let summary = generate_story(generator, &metadata_dict(metadata), story_prompt)
        .context("story generation failed")?;
    let title = generate_title(generator, &summary).context("title generation failed")?;
    Ok(StoryOutput {
        title,
        characters: characters(metadata),
        summary,
        events: events(metadata),
    })
}

/// Loads the story model and assembles the output with it.
pub async fn build_output_format(
    metadata: &[FrameMetadata],
    story_model: &ModelSpec,
    story_prompt: &str,
    options: GenerateOptions,
    cpu: bool,
) -> Result<StoryOutput> {
    let mut generator = StoryModel::load(story_model, options, cpu)
        .await
        .context("Output formatting failed")?;
    assemble_story(metadata, &mut generator, story_prompt)
}

/// Writes `story_output.json` into `dir`, creating it if needed.
pub fn write_output(dir: &Path, output: &StoryOutput) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output folder {}", dir.display()))?;
    let path = dir.join(OUTPUT_FILE);
    let json = serde_json::to_string_pretty(output)?;
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
