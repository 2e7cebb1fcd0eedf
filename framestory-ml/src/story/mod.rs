mod t5;

pub use t5::StoryModel;

/// Text-to-text generation, one prompt in, one completion out.
pub trait TextGenerator {
    fn generate(&mut self, prompt: &str) -> anyhow::Result<String>;
}
