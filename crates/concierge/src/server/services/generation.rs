//! Generative text model used by the question-answering fallback
//!
//! The production generator runs a flan-t5-small export (separate encoder and
//! decoder graphs) through ONNX Runtime with top-k sampling.

use anyhow::{anyhow, Result};
use rand::Rng;

use crate::config::GenerationConfig;

/// Decoding options for a single generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
  pub max_new_tokens: usize,
  pub do_sample: bool,
  pub top_k: usize,
  pub temperature: f32,
}

impl Default for GenerationOptions {
  fn default() -> Self {
    Self::from(&GenerationConfig::default())
  }
}

impl From<&GenerationConfig> for GenerationOptions {
  fn from(config: &GenerationConfig) -> Self {
    Self {
      max_new_tokens: config.max_new_tokens,
      do_sample: config.do_sample,
      top_k: config.top_k,
      temperature: config.temperature,
    }
  }
}

/// Produces free text from a prompt
#[cfg_attr(test, mockall::automock)]
pub trait TextGenerator: Send + Sync {
  fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}

/// Stand-in used when the binary is built without `ml-features`
pub struct UnavailableGenerator;

impl TextGenerator for UnavailableGenerator {
  fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String> {
    Err(anyhow!("ML features not available: rebuild with the `ml-features` feature"))
  }
}

/// Index of the largest logit
pub fn argmax(logits: &[f32]) -> Option<usize> {
  logits.iter().enumerate().max_by(|a, b| a.1.total_cmp(b.1)).map(|(index, _)| index)
}

/// Draw a token from the `top_k` most likely logits after temperature scaling
///
/// A `top_k` of zero samples from the whole vocabulary.
pub fn sample_top_k<R: Rng + ?Sized>(
  logits: &[f32],
  top_k: usize,
  temperature: f32,
  rng: &mut R,
) -> Option<usize> {
  if logits.is_empty() {
    return None;
  }

  let mut candidates: Vec<usize> = (0..logits.len()).collect();
  candidates.sort_by(|&a, &b| logits[b].total_cmp(&logits[a]));
  if top_k > 0 {
    candidates.truncate(top_k);
  }

  let temperature = temperature.max(f32::EPSILON);
  let max_logit = logits[candidates[0]] / temperature;
  let weights: Vec<f32> =
    candidates.iter().map(|&index| (logits[index] / temperature - max_logit).exp()).collect();
  let total: f32 = weights.iter().sum();
  if !total.is_finite() || total <= 0.0 {
    return Some(candidates[0]);
  }

  let mut threshold = rng.random::<f32>() * total;
  for (&index, &weight) in candidates.iter().zip(weights.iter()) {
    if threshold < weight {
      return Some(index);
    }
    threshold -= weight;
  }
  candidates.last().copied()
}

#[cfg(feature = "ml-features")]
pub use onnx::OnnxT5Generator;

#[cfg(feature = "ml-features")]
mod onnx {
  use anyhow::{anyhow, Context, Result};
  use ndarray::{Array2, Array3};
  use ort::{session::Session, value::Value};
  use std::collections::HashMap;
  use std::path::Path;
  use std::sync::Mutex;
  use tokenizers::Tokenizer;

  use super::{argmax, sample_top_k, GenerationOptions, TextGenerator};

  const TOKENIZER_FILE: &str = "tokenizer.json";
  const ENCODER_FILE: &str = "encoder_model.onnx";
  const DECODER_FILE: &str = "decoder_model.onnx";

  // T5 starts decoding from the pad token and stops at </s>
  const DECODER_START_TOKEN_ID: u32 = 0;
  const EOS_TOKEN_ID: u32 = 1;

  /// Encoder outputs reused across decoding steps
  struct EncodedPrompt {
    attention_mask: Vec<i64>,
    hidden_states: Vec<f32>,
    seq_len: usize,
    hidden_size: usize,
  }

  /// flan-t5 text-to-text generator backed by ONNX Runtime
  pub struct OnnxT5Generator {
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    tokenizer: Tokenizer,
  }

  #[cfg(not(tarpaulin_include))]
  impl OnnxT5Generator {
    /// Load tokenizer, encoder and decoder graphs from a local model directory
    pub fn load(model_dir: &Path) -> Result<Self> {
      tracing::info!(model_dir = %model_dir.display(), "loading text generator");

      let tokenizer = Tokenizer::from_file(model_dir.join(TOKENIZER_FILE))
        .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
      let encoder = load_session(&model_dir.join(ENCODER_FILE))?;
      let decoder = load_session(&model_dir.join(DECODER_FILE))?;

      Ok(Self { encoder: Mutex::new(encoder), decoder: Mutex::new(decoder), tokenizer })
    }

    fn encode_prompt(&self, prompt: &str) -> Result<EncodedPrompt> {
      let encoding =
        self.tokenizer.encode(prompt, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
      let ids: Vec<i64> = encoding.get_ids().iter().map(|&x| x as i64).collect();
      let attention_mask: Vec<i64> =
        encoding.get_attention_mask().iter().map(|&x| x as i64).collect();
      let seq_len = ids.len();

      let mut inputs: HashMap<String, Value> = HashMap::new();
      inputs.insert("input_ids".to_string(), int_tensor(ids, seq_len)?);
      inputs.insert("attention_mask".to_string(), int_tensor(attention_mask.clone(), seq_len)?);

      let mut encoder = self.encoder.lock().map_err(|_| anyhow!("Failed to lock encoder session"))?;
      let outputs = encoder.run(inputs)?;
      let hidden = outputs
        .get("last_hidden_state")
        .ok_or_else(|| anyhow!("Encoder produced no 'last_hidden_state' output"))?;
      let (shape, data) = hidden.try_extract_tensor::<f32>()?;
      let shape: &[i64] = shape.as_ref();
      if shape.len() != 3 {
        return Err(anyhow!("Unexpected encoder output shape {:?}", shape));
      }

      Ok(EncodedPrompt {
        attention_mask,
        hidden_states: data.to_vec(),
        seq_len,
        hidden_size: shape[2] as usize,
      })
    }

    fn next_token_logits(&self, prompt: &EncodedPrompt, generated: &[u32]) -> Result<Vec<f32>> {
      let decoder_ids: Vec<i64> = generated.iter().map(|&x| x as i64).collect();
      let hidden = Array3::from_shape_vec(
        (1, prompt.seq_len, prompt.hidden_size),
        prompt.hidden_states.clone(),
      )?;

      let mut inputs: HashMap<String, Value> = HashMap::new();
      inputs.insert("input_ids".to_string(), int_tensor(decoder_ids, generated.len())?);
      inputs.insert(
        "encoder_attention_mask".to_string(),
        int_tensor(prompt.attention_mask.clone(), prompt.seq_len)?,
      );
      inputs.insert("encoder_hidden_states".to_string(), Value::from_array(hidden)?.into());

      let mut decoder = self.decoder.lock().map_err(|_| anyhow!("Failed to lock decoder session"))?;
      let outputs = decoder.run(inputs)?;
      let logits =
        outputs.get("logits").ok_or_else(|| anyhow!("Decoder produced no 'logits' output"))?;
      let (shape, data) = logits.try_extract_tensor::<f32>()?;
      let shape: &[i64] = shape.as_ref();
      if shape.len() != 3 {
        return Err(anyhow!("Unexpected decoder output shape {:?}", shape));
      }

      let vocab = shape[2] as usize;
      let last = (shape[1] as usize).saturating_sub(1);
      Ok(data[last * vocab..(last + 1) * vocab].to_vec())
    }
  }

  fn load_session(path: &Path) -> Result<Session> {
    Session::builder()?
      .commit_from_file(path)
      .with_context(|| format!("Failed to load ONNX model {}", path.display()))
  }

  fn int_tensor(values: Vec<i64>, len: usize) -> Result<Value> {
    let array: Array2<i64> = Array2::from_shape_vec((1, len), values)?;
    Ok(Value::from_array(array)?.into())
  }

  impl TextGenerator for OnnxT5Generator {
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
      let encoded = self.encode_prompt(prompt)?;
      let mut rng = rand::rng();
      let mut generated = vec![DECODER_START_TOKEN_ID];

      for _ in 0..options.max_new_tokens {
        let logits = self.next_token_logits(&encoded, &generated)?;
        let next = if options.do_sample {
          sample_top_k(&logits, options.top_k, options.temperature, &mut rng)
        } else {
          argmax(&logits)
        }
        .ok_or_else(|| anyhow!("Decoder returned empty logits"))? as u32;

        if next == EOS_TOKEN_ID {
          break;
        }
        generated.push(next);
      }

      self
        .tokenizer
        .decode(&generated[1..], true)
        .map_err(|e| anyhow!("Failed to decode generated tokens: {}", e))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  #[test]
  fn test_argmax_picks_largest() {
    assert_eq!(argmax(&[0.1, 3.0, -2.0]), Some(1));
    assert_eq!(argmax(&[]), None);
  }

  #[test]
  fn test_top_one_sampling_is_greedy() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
      assert_eq!(sample_top_k(&[0.5, 2.0, 1.0], 1, 1.0, &mut rng), Some(1));
    }
  }

  #[test]
  fn test_sampling_stays_within_top_k() {
    let mut rng = StdRng::seed_from_u64(42);
    let logits = [5.0, 4.9, -10.0, 4.8, -20.0];
    for _ in 0..200 {
      let token = sample_top_k(&logits, 2, 1.0, &mut rng).unwrap();
      assert!(token == 0 || token == 1, "sampled token {token} outside top-2");
    }
  }

  #[test]
  fn test_options_follow_config() {
    let config =
      GenerationConfig { max_new_tokens: 12, do_sample: false, top_k: 3, temperature: 0.7 };
    let options = GenerationOptions::from(&config);
    assert_eq!(options.max_new_tokens, 12);
    assert!(!options.do_sample);
  }

  #[test]
  fn test_unavailable_generator_errors() {
    let result = UnavailableGenerator.generate("prompt", &GenerationOptions::default());
    assert!(result.is_err());
  }
}
