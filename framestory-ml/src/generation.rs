use candle_core::Tensor;
use candle_transformers::generation::{LogitsProcessor, Sampling};

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub max_new_tokens: usize,
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub seed: u64,
    pub repeat_penalty: f32,
    pub repeat_last_n: usize,
}

// refer: https://github.com/huggingface/candle/blob/main/candle-examples/examples/t5/main.rs
impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_new_tokens: 512,
            temperature: 0.3,
            top_p: None,
            seed: 299792458,
            repeat_penalty: 1.1,
            repeat_last_n: 64,
        }
    }
}

impl GenerateOptions {
    /// Greedy decoding, used for per-frame descriptions.
    pub fn greedy(max_new_tokens: usize) -> Self {
        Self {
            max_new_tokens,
            temperature: 0.0,
            ..Self::default()
        }
    }

    pub fn logits_processor(&self) -> LogitsProcessor {
        let temperature = self.temperature;
        let sampling = if temperature <= 0.0 {
            Sampling::ArgMax
        } else {
            match self.top_p {
                None => Sampling::All { temperature },
                Some(p) => Sampling::TopP { p, temperature },
            }
        };
        LogitsProcessor::from_sampling(self.seed, sampling)
    }

    pub fn penalize(&self, logits: Tensor, context: &[u32]) -> candle_core::Result<Tensor> {
        if (self.repeat_penalty - 1.0).abs() < f32::EPSILON {
            return Ok(logits);
        }
        let start_at = context.len().saturating_sub(self.repeat_last_n);
        candle_transformers::utils::apply_repeat_penalty(
            &logits,
            self.repeat_penalty,
            &context[start_at..],
        )
    }
}

#[cfg(test)]
mod tests {
    use candle_core::Device;

    use super::*;

    #[test]
    fn zero_temperature_picks_the_largest_logit() -> anyhow::Result<()> {
        let logits = Tensor::new(&[0.1f32, 5.0, 0.2, 4.9], &Device::Cpu)?;
        let mut processor = GenerateOptions::greedy(10).logits_processor();
        assert_eq!(processor.sample(&logits)?, 1);
        Ok(())
    }

    #[test]
    fn repeat_penalty_lowers_seen_tokens() -> anyhow::Result<()> {
        let opts = GenerateOptions {
            repeat_penalty: 2.0,
            ..GenerateOptions::greedy(10)
        };
        let logits = Tensor::new(&[4.0f32, 3.0], &Device::Cpu)?;
        let penalized = opts.penalize(logits, &[0])?.to_vec1::<f32>()?;
        assert_eq!(penalized, vec![2.0, 3.0]);

        let mut processor = opts.logits_processor();
        let logits = Tensor::new(&[4.0f32, 3.0], &Device::Cpu)?;
        assert_eq!(processor.sample(&opts.penalize(logits, &[0])?)?, 1);
        Ok(())
    }

    #[test]
    fn unit_penalty_is_a_no_op() -> anyhow::Result<()> {
        let opts = GenerateOptions {
            repeat_penalty: 1.0,
            ..GenerateOptions::default()
        };
        let logits = Tensor::new(&[4.0f32, 3.0], &Device::Cpu)?;
        assert_eq!(opts.penalize(logits, &[0, 1])?.to_vec1::<f32>()?, vec![4.0, 3.0]);
        Ok(())
    }
}
