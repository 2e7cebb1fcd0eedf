use serde::{Deserialize, Serialize};

/// Scene description of a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMetadata {
    pub frame_id: String,
    pub timestamp: String,
    pub objects_detected: Vec<String>,
    pub scene_description: String,
}

impl FrameMetadata {
    /// A record standing in for a frame whose description could not be
    /// produced. `message` is prefixed with `Error: `.
    pub fn degraded(
        frame_id: impl Into<String>,
        timestamp: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self {
            frame_id: frame_id.into(),
            timestamp: timestamp.into(),
            objects_detected: Vec::new(),
            scene_description: format!("Error: {message}"),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.objects_detected.is_empty() && self.scene_description.starts_with("Error:")
    }
}

/// The part of the model's answer we trust. `frame_id` and `timestamp` are
/// always taken from the extractor.
#[derive(Debug, Deserialize)]
struct SceneReply {
    #[serde(default)]
    objects_detected: Vec<String>,
    scene_description: String,
}

/// Removes surrounding whitespace and Markdown code fences.
pub fn strip_code_fences(raw: &str) -> String {
    raw.trim().replace("```json", "").replace("```", "")
}

/// Parses decoded model text into [`FrameMetadata`], falling back to the raw
/// text as the description when it is not the expected JSON object.
pub fn parse_or_fallback(raw: &str, frame_id: &str, timestamp: &str) -> FrameMetadata {
    match serde_json::from_str::<SceneReply>(&strip_code_fences(raw)) {
        Ok(reply) => FrameMetadata {
            frame_id: frame_id.to_string(),
            timestamp: timestamp.to_string(),
            objects_detected: reply.objects_detected,
            scene_description: reply.scene_description,
        },
        Err(err) => {
            tracing::warn!("Failed to parse JSON output for {frame_id}: {err}");
            let raw = raw.trim();
            if raw.is_empty() {
                FrameMetadata::degraded(
                    frame_id,
                    timestamp,
                    format!("Invalid model output - {err}"),
                )
            } else {
                FrameMetadata {
                    frame_id: frame_id.to_string(),
                    timestamp: timestamp.to_string(),
                    objects_detected: Vec::new(),
                    scene_description: raw.to_string(),
                }
            }
        }
    }
}
