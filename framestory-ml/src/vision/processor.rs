use std::path::Path;

use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use image::{DynamicImage, imageops::FilterType};
use tokenizers::Tokenizer;

use crate::loading::load_tokenizer;

const IMAGE_SIZE: usize = 378;
const IMAGE_MEAN: [f32; 3] = [0.5, 0.5, 0.5];
const IMAGE_STD: [f32; 3] = [0.5, 0.5, 0.5];

/// Tokenizer plus image preprocessing for Moondream 2.
pub struct Processor {
    tokenizer: Tokenizer,
}

impl Processor {
    pub fn load(tokenizer_path: &Path) -> Result<Self> {
        Ok(Self {
            tokenizer: load_tokenizer(tokenizer_path)?,
        })
    }

    pub fn apply_template(&self, prompt: &str) -> String {
        format!("\n\nQuestion: {prompt}\n\nAnswer:")
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(anyhow::Error::msg)?;
        Ok(encoding.get_ids().to_vec())
    }

    pub fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(tokens, true)
            .map_err(anyhow::Error::msg)
    }

    pub fn token_id(&self, token: &str) -> Option<u32> {
        self.tokenizer.get_vocab(true).get(token).copied()
    }

    /// Pixel values on the CPU in `f32`, shape `(3, 378, 378)`.
    pub fn pixel_values(&self, image: &DynamicImage) -> candle_core::Result<Tensor> {
        preprocess_image(image, IMAGE_SIZE, &IMAGE_MEAN, &IMAGE_STD)
    }
}

/// Resizes `image` to fill a `size`×`size` square and normalizes each channel.
fn preprocess_image(
    image: &DynamicImage,
    size: usize,
    mean: &[f32; 3],
    std: &[f32; 3],
) -> candle_core::Result<Tensor> {
    let resized = image
        .resize_to_fill(size as u32, size as u32, FilterType::Triangle)
        .to_rgb8();
    let tensor = Tensor::from_vec(resized.into_raw(), (size, size, 3), &Device::Cpu)?
        .permute((2, 0, 1))?
        .to_dtype(DType::F32)?;
    let tensor = (tensor * (1.0 / 255.0))?;

    let mean = Tensor::from_slice(mean, (3, 1, 1), &Device::Cpu)?;
    let std = Tensor::from_slice(std, (3, 1, 1), &Device::Cpu)?;
    tensor.broadcast_sub(&mean)?.broadcast_div(&std)
}
