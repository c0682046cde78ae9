//! Sentence embeddings for booking summaries and questions
//!
//! The production encoder runs all-MiniLM-L6-v2 through ONNX Runtime. The
//! pooling and normalisation steps are plain functions so they can be tested
//! without a model on disk.

use anyhow::{anyhow, Result};

/// Maps texts to fixed-length vectors
#[cfg_attr(test, mockall::automock)]
pub trait TextEncoder: Send + Sync {
  /// Encode a batch of texts, one vector per input in the same order
  fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

  /// Output vector dimension
  fn dimension(&self) -> usize;
}

/// Encode a single text
pub fn encode_one(encoder: &dyn TextEncoder, text: &str) -> Result<Vec<f32>> {
  encoder
    .encode(&[text.to_string()])?
    .into_iter()
    .next()
    .ok_or_else(|| anyhow!("Encoder returned no vector for input"))
}

/// Stand-in used when the binary is built without `ml-features`
pub struct UnavailableEncoder;

impl TextEncoder for UnavailableEncoder {
  fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
    Err(anyhow!("ML features not available: rebuild with the `ml-features` feature"))
  }

  fn dimension(&self) -> usize {
    0
  }
}

/// Mean-pool token embeddings over the positions the attention mask keeps
///
/// `hidden` is a `[seq_len * hidden_size]` slice for a single sequence.
pub fn masked_mean_pool(hidden: &[f32], mask: &[i64], hidden_size: usize) -> Vec<f32> {
  let mut pooled = vec![0.0f32; hidden_size];
  let mut kept = 0usize;

  for (token, &keep) in hidden.chunks_exact(hidden_size).zip(mask.iter()) {
    if keep == 0 {
      continue;
    }
    kept += 1;
    for (sum, &value) in pooled.iter_mut().zip(token.iter()) {
      *sum += value;
    }
  }

  if kept > 0 {
    for value in pooled.iter_mut() {
      *value /= kept as f32;
    }
  }
  pooled
}

/// Normalize an embedding to unit length; zero vectors are returned unchanged
pub fn normalize_embedding(mut embedding: Vec<f32>) -> Vec<f32> {
  let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();

  if magnitude < f32::EPSILON {
    tracing::warn!("zero-magnitude embedding detected, returning unchanged");
    return embedding;
  }

  for value in embedding.iter_mut() {
    *value /= magnitude;
  }
  embedding
}

#[cfg(feature = "ml-features")]
pub use onnx::OnnxSentenceEncoder;

#[cfg(feature = "ml-features")]
mod onnx {
  use anyhow::{anyhow, Context, Result};
  use ndarray::Array2;
  use ort::{session::Session, value::Value};
  use std::collections::HashMap;
  use std::path::Path;
  use std::sync::Mutex;
  use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

  use super::{masked_mean_pool, normalize_embedding, TextEncoder};

  const TOKENIZER_FILE: &str = "tokenizer.json";
  const MODEL_FILE: &str = "model.onnx";
  const MINILM_DIMENSION: usize = 384;

  /// all-MiniLM-L6-v2 sentence encoder backed by ONNX Runtime
  pub struct OnnxSentenceEncoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    batch_size: usize,
    dimension: usize,
  }

  #[cfg(not(tarpaulin_include))]
  impl OnnxSentenceEncoder {
    /// Load the tokenizer and ONNX graph from a local model directory
    pub fn load(model_dir: &Path, batch_size: usize, max_sequence_length: usize) -> Result<Self> {
      tracing::info!(model_dir = %model_dir.display(), "loading sentence encoder");

      let mut tokenizer = Tokenizer::from_file(model_dir.join(TOKENIZER_FILE))
        .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
      tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        ..Default::default()
      }));
      tokenizer
        .with_truncation(Some(TruncationParams {
          max_length: max_sequence_length,
          ..Default::default()
        }))
        .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

      let model_path = model_dir.join(MODEL_FILE);
      let session = Session::builder()?
        .commit_from_file(&model_path)
        .with_context(|| format!("Failed to load ONNX model {}", model_path.display()))?;

      Ok(Self {
        session: Mutex::new(session),
        tokenizer,
        batch_size: batch_size.max(1),
        dimension: MINILM_DIMENSION,
      })
    }

    fn encode_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
      let encodings = self
        .tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

      let batch = encodings.len();
      let seq_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
      if seq_len == 0 {
        return Err(anyhow!("Tokenizer produced empty sequences"));
      }

      let mut ids = Vec::with_capacity(batch * seq_len);
      let mut mask = Vec::with_capacity(batch * seq_len);
      let mut type_ids = Vec::with_capacity(batch * seq_len);
      for encoding in &encodings {
        ids.extend(encoding.get_ids().iter().map(|&x| x as i64));
        mask.extend(encoding.get_attention_mask().iter().map(|&x| x as i64));
        type_ids.extend(encoding.get_type_ids().iter().map(|&x| x as i64));
      }

      let mut inputs: HashMap<String, Value> = HashMap::new();
      inputs.insert("input_ids".to_string(), to_tensor(ids, batch, seq_len)?);
      inputs.insert("attention_mask".to_string(), to_tensor(mask.clone(), batch, seq_len)?);
      inputs.insert("token_type_ids".to_string(), to_tensor(type_ids, batch, seq_len)?);

      let mut session = self.session.lock().map_err(|_| anyhow!("Failed to lock encoder session"))?;
      let outputs = session.run(inputs)?;
      let hidden = outputs
        .get("last_hidden_state")
        .or_else(|| outputs.get("0"))
        .ok_or_else(|| anyhow!("No output found from model, expected 'last_hidden_state' or '0'"))?;

      let (shape, data) = hidden.try_extract_tensor::<f32>()?;
      let shape: &[i64] = shape.as_ref();
      if shape.len() != 3 {
        return Err(anyhow!("Unexpected encoder output shape {:?}", shape));
      }
      let hidden_size = shape[2] as usize;
      let stride = seq_len * hidden_size;

      Ok(
        (0..batch)
          .map(|row| {
            let hidden = &data[row * stride..(row + 1) * stride];
            let row_mask = &mask[row * seq_len..(row + 1) * seq_len];
            normalize_embedding(masked_mean_pool(hidden, row_mask, hidden_size))
          })
          .collect(),
      )
    }
  }

  fn to_tensor(values: Vec<i64>, batch: usize, seq_len: usize) -> Result<Value> {
    let array: Array2<i64> = Array2::from_shape_vec((batch, seq_len), values)?;
    let tensor: Value = Value::from_array(array)?.into();
    Ok(tensor)
  }

  impl TextEncoder for OnnxSentenceEncoder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
      let mut vectors = Vec::with_capacity(texts.len());
      for chunk in texts.chunks(self.batch_size) {
        vectors.extend(self.encode_chunk(chunk)?);
      }
      Ok(vectors)
    }

    fn dimension(&self) -> usize {
      self.dimension
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_masked_mean_pool_ignores_padding() {
    // Two tokens of width 2 plus one padded position
    let hidden = vec![1.0, 2.0, 3.0, 4.0, 100.0, 100.0];
    let pooled = masked_mean_pool(&hidden, &[1, 1, 0], 2);
    assert_eq!(pooled, vec![2.0, 3.0]);
  }

  #[test]
  fn test_masked_mean_pool_all_masked_is_zero() {
    let pooled = masked_mean_pool(&[5.0, 5.0], &[0], 2);
    assert_eq!(pooled, vec![0.0, 0.0]);
  }

  #[test]
  fn test_normalize_embedding_unit_length() {
    let normalized = normalize_embedding(vec![3.0, 4.0]);
    assert!((normalized[0] - 0.6).abs() < 1e-6);
    assert!((normalized[1] - 0.8).abs() < 1e-6);

    assert_eq!(normalize_embedding(vec![0.0, 0.0]), vec![0.0, 0.0]);
  }

  #[test]
  fn test_encode_one_uses_first_vector() {
    let mut encoder = MockTextEncoder::new();
    encoder.expect_encode().returning(|texts| Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect()));

    assert_eq!(encode_one(&encoder, "hello").unwrap(), vec![1.0, 0.0]);
  }

  #[test]
  fn test_unavailable_encoder_errors() {
    let err = encode_one(&UnavailableEncoder, "anything").unwrap_err();
    assert!(err.to_string().contains("ML features not available"));
  }
}
