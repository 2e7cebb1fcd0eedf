//! Image + text understanding.
//!
//! [`VisionLanguageModel`] is the seam the frame pipeline talks to: inputs are
//! prepared once per frame, generation returns only the newly produced token
//! ids, and decoding turns those ids into text. [`VisionModel`] implements it
//! with Moondream 2 on top of candle.

mod moondream;
mod processor;

use image::DynamicImage;

use crate::InferenceError;

pub use moondream::{VisionInputs, VisionModel};
pub use processor::Processor;

pub trait VisionLanguageModel {
    type Inputs;

    /// Applies the processor's prompt template and moves every tensor onto
    /// the model's device.
    fn prepare_inputs(
        &self,
        image: &DynamicImage,
        prompt: &str,
    ) -> Result<Self::Inputs, InferenceError>;

    /// Runs generation and returns the generated token ids, excluding the
    /// prompt.
    fn generate(
        &mut self,
        inputs: &Self::Inputs,
        max_new_tokens: usize,
    ) -> Result<Vec<u32>, InferenceError>;

    /// Decodes generated ids, skipping special tokens.
    fn decode(&self, tokens: &[u32]) -> Result<String, InferenceError>;
}
