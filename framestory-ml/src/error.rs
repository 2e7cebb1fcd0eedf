/// Failure of a single inference step, tagged by the stage that failed.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// Tokenization or image preprocessing.
    #[error("input preparation failed: {0:#}")]
    Prepare(anyhow::Error),

    /// Moving a prepared tensor to the model's device or precision.
    #[error("tensor transfer failed: {0:#}")]
    Transfer(anyhow::Error),

    #[error("generation failed: {0:#}")]
    Generate(anyhow::Error),

    /// Turning generated token ids back into text.
    #[error("output decoding failed: {0:#}")]
    Decode(anyhow::Error),
}
