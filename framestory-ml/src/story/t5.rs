use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_transformers::models::t5;
use framestory_core::hf_hub::hf_download;
use tokenizers::Tokenizer;
use tracing::instrument;

use super::TextGenerator;
use crate::loading::{load_mmaped_safetensors, load_tokenizer, read_json};
use crate::{GenerateOptions, ModelSpec, device, device_name};

/// Seq2seq (T5 family) generation handle used for stories and titles.
pub struct StoryModel {
    spec: ModelSpec,
    model: t5::T5ForConditionalGeneration,
    config: t5::Config,
    tokenizer: Tokenizer,
    device: Device,
    options: GenerateOptions,
}

impl StoryModel {
    pub async fn load(spec: &ModelSpec, options: GenerateOptions, cpu: bool) -> Result<Self> {
        Self::try_load(spec, options, cpu)
            .await
            .with_context(|| format!("failed to load story model {spec}"))
    }

    async fn try_load(spec: &ModelSpec, options: GenerateOptions, cpu: bool) -> Result<Self> {
        let device = device(cpu)?;
        // T5 activations overflow in f16
        let dtype = if device.is_cuda() {
            DType::BF16
        } else {
            DType::F32
        };
        tracing::info!(
            "Loading story model {spec} on {} with dtype {dtype:?}",
            device_name(cpu)
        );

        let config_path = hf_download(&spec.id, &spec.revision, "config.json").await?;
        let tokenizer_path = hf_download(&spec.id, &spec.revision, "tokenizer.json").await?;
        let weights = hf_download(&spec.id, &spec.revision, "model.safetensors").await?;

        let mut config: t5::Config = read_json(&config_path)?;
        config.use_cache = true;
        let tokenizer = load_tokenizer(&tokenizer_path)?;
        let vb = load_mmaped_safetensors(&[weights], dtype, &device)?;
        let model = t5::T5ForConditionalGeneration::load(vb, &config)?;

        tracing::info!("Model {spec} loaded successfully");
        Ok(Self {
            spec: spec.clone(),
            model,
            config,
            tokenizer,
            device,
            options,
        })
    }

    fn sample(&mut self, prompt: &str) -> Result<Vec<u32>> {
        let tokens = self
            .tokenizer
            .encode(prompt, true)
            .map_err(anyhow::Error::msg)?
            .get_ids()
            .to_vec();
        let input_ids = Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?;

        self.model.clear_kv_cache();
        let encoder_output = self.model.encode(&input_ids)?;

        let start_token = self
            .config
            .decoder_start_token_id
            .unwrap_or(self.config.pad_token_id) as u32;
        let mut output = vec![start_token];
        let mut logits_processor = self.options.logits_processor();

        for index in 0..self.options.max_new_tokens {
            let decoder_ids = match output.last() {
                Some(&last) if index > 0 && self.config.use_cache => {
                    Tensor::new(&[last], &self.device)?.unsqueeze(0)?
                }
                _ => Tensor::new(output.as_slice(), &self.device)?.unsqueeze(0)?,
            };
            let logits = self
                .model
                .decode(&decoder_ids, &encoder_output)?
                .squeeze(0)?
                .to_dtype(DType::F32)?;
            let logits = self.options.penalize(logits, &output[1..])?;
            let next_token = logits_processor.sample(&logits)?;
            if next_token as usize == self.config.eos_token_id {
                break;
            }
            output.push(next_token);
        }
        self.model.clear_kv_cache();

        tracing::debug!(
            prompt_tokens = tokens.len(),
            generated = output.len() - 1,
            "story generation finished"
        );
        Ok(output.split_off(1))
    }
}

impl TextGenerator for StoryModel {
    #[instrument(level = "info", skip_all, fields(model = %self.spec))]
    fn generate(&mut self, prompt: &str) -> Result<String> {
        let tokens = self.sample(prompt)?;
        self.tokenizer
            .decode(&tokens, true)
            .map_err(anyhow::Error::msg)
    }
}
