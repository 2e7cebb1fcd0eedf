use std::path::Path;

use framestory_ml::InferenceError;
use framestory_ml::vision::VisionLanguageModel;
use image::DynamicImage;
use tracing::instrument;

use crate::metadata::{FrameMetadata, parse_or_fallback};
use crate::prompt::frame_prompt;

pub const MAX_NEW_TOKENS: usize = 200;
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// What the folder processor does with a failed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Keep an `Error:` record in place of the description.
    Degrade,
    /// Leave the frame out and carry on.
    Skip,
    /// Stop the whole run.
    Abort,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameErrorKind {
    #[error("Failed to load image - {0}")]
    ImageLoad(#[source] image::ImageError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

#[derive(Debug, thiserror::Error)]
#[error("failed to process frame {frame_id}")]
pub struct FrameError {
    pub frame_id: String,
    pub timestamp: String,
    #[source]
    pub kind: FrameErrorKind,
}

impl FrameError {
    pub fn disposition(&self) -> Disposition {
        match &self.kind {
            FrameErrorKind::ImageLoad(_) => Disposition::Degrade,
            FrameErrorKind::Inference(InferenceError::Prepare(_)) => Disposition::Degrade,
            FrameErrorKind::Inference(InferenceError::Generate(_)) => Disposition::Degrade,
            FrameErrorKind::Inference(InferenceError::Decode(_)) => Disposition::Skip,
            FrameErrorKind::Inference(InferenceError::Transfer(_)) => Disposition::Abort,
        }
    }

    /// The record kept for this frame when the disposition is
    /// [`Disposition::Degrade`].
    pub fn degraded(&self) -> FrameMetadata {
        FrameMetadata::degraded(&self.frame_id, &self.timestamp, &self.kind)
    }
}

pub fn frame_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

pub fn utc_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

pub fn load_image(path: &Path) -> image::ImageResult<DynamicImage> {
    let image = image::open(path)?;
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

/// Describes one image. Unparseable model output is not an error: it is
/// folded into the record by [`parse_or_fallback`].
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn extract_frame_metadata<M: VisionLanguageModel>(
    path: &Path,
    model: &mut M,
) -> Result<FrameMetadata, FrameError> {
    let frame_id = frame_id(path);
    let timestamp = utc_timestamp();
    tracing::info!("Processing image: {}", path.display());

    let fail = |kind: FrameErrorKind| FrameError {
        frame_id: frame_id.clone(),
        timestamp: timestamp.clone(),
        kind,
    };

    let image = load_image(path).map_err(|err| {
        tracing::error!("Failed to load image {}: {err}", path.display());
        fail(FrameErrorKind::ImageLoad(err))
    })?;

    let prompt = frame_prompt(&frame_id, &timestamp);
    let raw = model
        .prepare_inputs(&image, &prompt)
        .and_then(|inputs| model.generate(&inputs, MAX_NEW_TOKENS))
        .and_then(|tokens| model.decode(&tokens))
        .map_err(|err| fail(err.into()))?;

    Ok(parse_or_fallback(&raw, &frame_id, &timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_id_is_the_file_name() {
        assert_eq!(frame_id(Path::new("/tmp/frames/0003.JPG")), "0003.JPG");
    }

    #[test]
    fn timestamp_is_utc_iso8601() -> anyhow::Result<()> {
        let ts = utc_timestamp();
        assert!(ts.ends_with('Z'));
        chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT)?;
        Ok(())
    }

    #[test]
    fn disposition_follows_the_failed_stage() {
        let error = |kind| FrameError {
            frame_id: "1.png".to_string(),
            timestamp: "t".to_string(),
            kind,
        };
        let inference = |err: InferenceError| error(FrameErrorKind::Inference(err));

        assert_eq!(
            inference(InferenceError::Transfer(anyhow::anyhow!("cuda"))).disposition(),
            Disposition::Abort
        );
        let prepare = inference(InferenceError::Prepare(anyhow::anyhow!("bad prompt")));
        assert_eq!(prepare.disposition(), Disposition::Degrade);
        assert_eq!(
            prepare.degraded().scene_description,
            "Error: input preparation failed: bad prompt"
        );
        assert_eq!(
            inference(InferenceError::Decode(anyhow::anyhow!("utf8"))).disposition(),
            Disposition::Skip
        );

        let generate = inference(InferenceError::Generate(anyhow::anyhow!("oom")));
        assert_eq!(generate.disposition(), Disposition::Degrade);
        let record = generate.degraded();
        assert_eq!(record.scene_description, "Error: generation failed: oom");
        assert!(record.objects_detected.is_empty());
    }
}
