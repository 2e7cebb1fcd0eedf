use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_transformers::models::moondream;
use framestory_core::hf_hub::hf_download;
use image::DynamicImage;
use tracing::instrument;

use super::{Processor, VisionLanguageModel};
use crate::loading::load_mmaped_safetensors;
use crate::{GenerateOptions, InferenceError, ModelSpec, device, device_name, precision};

const END_OF_TEXT: &str = "<|endoftext|>";
// "<END>" as emitted by early moondream2 revisions
const END_MARKER: [u32; 3] = [27, 10619, 29];

/// Tensors ready for [`VisionModel::generate`], already on the model's device.
pub struct VisionInputs {
    pub input_ids: Tensor,
    pub pixel_values: Tensor,
}

/// Loaded Moondream 2 handle: processor, model, device and precision.
pub struct VisionModel {
    spec: ModelSpec,
    model: moondream::Model,
    processor: Processor,
    device: Device,
    dtype: DType,
    options: GenerateOptions,
    eos_token: u32,
}

impl VisionModel {
    pub async fn load(spec: &ModelSpec, cpu: bool) -> Result<Self> {
        Self::try_load(spec, cpu)
            .await
            .with_context(|| format!("failed to load model {spec}"))
    }

    async fn try_load(spec: &ModelSpec, cpu: bool) -> Result<Self> {
        let device = device(cpu)?;
        let dtype = precision(&device);
        tracing::info!(
            "Loading model {spec} on {} with dtype {dtype:?}",
            device_name(cpu)
        );

        let weights = hf_download(&spec.id, &spec.revision, "model.safetensors").await?;
        let tokenizer = hf_download(&spec.id, &spec.revision, "tokenizer.json").await?;

        let processor = Processor::load(&tokenizer)?;
        let eos_token = processor
            .token_id(END_OF_TEXT)
            .with_context(|| format!("tokenizer has no {END_OF_TEXT} token"))?;

        let vb = load_mmaped_safetensors(&[weights], dtype, &device)?;
        let model = moondream::Model::new(&moondream::Config::v2(), vb)?;

        tracing::info!("Model and processor loaded successfully");
        Ok(Self {
            spec: spec.clone(),
            model,
            processor,
            device,
            dtype,
            options: GenerateOptions::greedy(200),
            eos_token,
        })
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    fn sample(&mut self, inputs: &VisionInputs, max_new_tokens: usize) -> Result<Vec<u32>> {
        self.model.text_model.clear_kv_cache();

        let image_embeds = inputs
            .pixel_values
            .unsqueeze(0)?
            .apply(self.model.vision_encoder())?;
        // moondream uses <|endoftext|> as both bos and eos
        let bos = Tensor::new(&[self.eos_token], &self.device)?.unsqueeze(0)?;

        let mut logits_processor = self.options.logits_processor();
        let mut generated: Vec<u32> = Vec::with_capacity(max_new_tokens);
        for _ in 0..max_new_tokens {
            let logits = match generated.last() {
                Some(&last) => {
                    let input = Tensor::new(&[last], &self.device)?.unsqueeze(0)?;
                    self.model.text_model.forward(&input)?
                }
                None => self.model.text_model.forward_with_img(
                    &bos,
                    &inputs.input_ids,
                    &image_embeds,
                )?,
            };
            let logits = logits.squeeze(0)?.to_dtype(DType::F32)?;
            let logits = self.options.penalize(logits, &generated)?;
            let next_token = logits_processor.sample(&logits)?;
            if next_token == self.eos_token {
                break;
            }
            generated.push(next_token);
            if generated.ends_with(&END_MARKER) {
                generated.truncate(generated.len() - END_MARKER.len());
                break;
            }
        }

        Ok(generated)
    }
}

fn to_device(
    name: &str,
    tensor: Tensor,
    device: &Device,
    dtype: Option<DType>,
) -> Result<Tensor, InferenceError> {
    let moved = tensor.to_device(device).and_then(|t| match dtype {
        Some(dtype) => t.to_dtype(dtype),
        None => Ok(t),
    });
    moved.map_err(|err| {
        tracing::error!("Failed to move tensor {name} to device {device:?}: {err}");
        InferenceError::Transfer(anyhow::Error::new(err).context(format!("tensor {name}")))
    })
}

impl VisionLanguageModel for VisionModel {
    type Inputs = VisionInputs;

    #[instrument(level = "debug", skip_all)]
    fn prepare_inputs(
        &self,
        image: &DynamicImage,
        prompt: &str,
    ) -> Result<VisionInputs, InferenceError> {
        let text = self.processor.apply_template(prompt);
        let ids = self
            .processor
            .encode(&text)
            .map_err(InferenceError::Prepare)?;
        let input_ids = Tensor::new(ids.as_slice(), &Device::Cpu)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|err| InferenceError::Prepare(err.into()))?;
        let pixel_values = self
            .processor
            .pixel_values(image)
            .map_err(|err| InferenceError::Prepare(err.into()))?;

        // ids keep their native u32 index type, everything else follows the
        // model precision
        Ok(VisionInputs {
            input_ids: to_device("input_ids", input_ids, &self.device, None)?,
            pixel_values: to_device("pixel_values", pixel_values, &self.device, Some(self.dtype))?,
        })
    }

    #[instrument(level = "info", skip_all, fields(model = %self.spec))]
    fn generate(
        &mut self,
        inputs: &VisionInputs,
        max_new_tokens: usize,
    ) -> Result<Vec<u32>, InferenceError> {
        self.sample(inputs, max_new_tokens)
            .map_err(InferenceError::Generate)
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, InferenceError> {
        self.processor.decode(tokens).map_err(|err| {
            tracing::error!("Failed to decode model output: {err}");
            InferenceError::Decode(err)
        })
    }
}
