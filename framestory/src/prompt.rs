/// Instruction block placed in front of the frame descriptions when writing
/// the story.
pub const DEFAULT_STORY_PROMPT: &str = "You are a creative storyteller AI. You are given a dictionary of frame descriptions \
where keys are frame IDs and values are short event descriptions from a sequence of images.\n\n\
TASK:\n\
1. Write a vivid, engaging story that weaves the frame descriptions into a seamless narrative.\n\
2. Ensure temporal continuity: events must flow logically in the order of the frames.\n\
3. Choose one consistent object type if an object appears in different forms (e.g., use 'cookie' if both 'food' and 'cookie' appear).\n\
4. Do not list events frame-by-frame; create a continuous story with a clear beginning, middle, and end.\n\
5. Add subtle character motivations and interactions to make the story emotionally engaging.\n\
6. Use descriptive yet concise language to bring the scene to life.\n";

/// Calibration outputs appended to every frame prompt.
const FRAME_EXAMPLES: [&str; 3] = [
    "crow drops peanut",
    "ball rolls on ground, child reaches for it",
    "car turns left, pedestrian crosses road",
];

fn quoted(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Prompt asking the vision model for a motion-focused JSON description of a
/// single frame.
pub fn frame_prompt(frame_id: &str, timestamp: &str) -> String {
    let mut prompt = String::from(
        "This is a frame from a continuous story. Focus strictly on: \
         1. All main objects/subjects present \
         2. Their current actions (especially if something is falling, dropping, or in motion) \
         3. Any immediate interactions between objects \
         Describe only what is actively happening in this exact moment. \
         If something is falling or being released, make that the focus. \
         Use simple present tense verbs only. \
         No adjectives, background details, or static descriptions. \
         Format exactly as: ",
    );
    prompt.push_str(&format!(
        r#"{{"frame_id": {}, "timestamp": {}, "objects_detected": ["subject1", "subject2", "object1"], "scene_description": "subject1 verb object1, subject2 verb"}}"#,
        quoted(frame_id),
        quoted(timestamp),
    ));
    prompt.push_str("\nExample outputs:");
    for example in FRAME_EXAMPLES {
        prompt.push_str(&format!(r#"{{"scene_description": {}}}"#, quoted(example)));
    }
    prompt
}
