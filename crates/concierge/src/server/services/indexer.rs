//! Builds the booking vector index from the loaded dataset

use anyhow::{anyhow, Context, Result};
use std::path::Path;

use super::embeddings::TextEncoder;
use super::vector_index::FlatIndex;
use crate::server::models::booking::Dataset;

/// Summary of a completed index build
#[derive(Debug, Clone, PartialEq)]
pub struct IndexBuildReport {
  pub records: usize,
  pub dimension: usize,
}

/// Encode every record's text chunk and collect the vectors in row order
///
/// `batch_size` only controls how often progress is reported; the encoder
/// batches model calls internally.
pub fn build_index(
  dataset: &Dataset,
  encoder: &dyn TextEncoder,
  batch_size: usize,
) -> Result<FlatIndex> {
  let mut index = FlatIndex::new(encoder.dimension())
    .context("Encoder reports an unusable embedding dimension")?
    .with_fingerprint(dataset.fingerprint());
  let total = dataset.len();
  let batch_size = batch_size.max(1);

  for (batch_number, records) in dataset.records().chunks(batch_size).enumerate() {
    let chunks: Vec<String> = records.iter().map(|record| record.text_chunk()).collect();
    let vectors = encoder
      .encode(&chunks)
      .with_context(|| format!("Failed to encode batch {}", batch_number + 1))?;

    if vectors.len() != records.len() {
      return Err(anyhow!(
        "Encoder returned {} vectors for {} texts",
        vectors.len(),
        records.len()
      ));
    }

    for (record, vector) in records.iter().zip(vectors.iter()) {
      index
        .add(record.id, vector)
        .with_context(|| format!("Failed to index record {}", record.id))?;
    }

    tracing::info!(indexed = index.len(), total, "encoded batch {}", batch_number + 1);
  }

  Ok(index)
}

/// Build the index and persist it, replacing any previous file
pub fn build_and_save_index(
  dataset: &Dataset,
  encoder: &dyn TextEncoder,
  batch_size: usize,
  path: &Path,
) -> Result<IndexBuildReport> {
  let index = build_index(dataset, encoder, batch_size)?;
  index.save(path).with_context(|| format!("Failed to write index {}", path.display()))?;
  tracing::info!(path = %path.display(), entries = index.len(), "vector index saved");

  Ok(IndexBuildReport { records: index.len(), dimension: index.dimension() })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::server::models::booking::RecordId;
  use crate::server::services::embeddings::MockTextEncoder;
  use tempfile::TempDir;

  const CSV: &str = "\
hotel,is_canceled,adr,country,reservation_status,reservation_status_date
Resort Hotel,0,75.0,PRT,Check-Out,2015-07-02
City Hotel,1,120.5,GBR,Canceled,2015-07-15
City Hotel,0,99,ESP,Check-Out,2015-08-01
";

  fn length_encoder() -> MockTextEncoder {
    let mut encoder = MockTextEncoder::new();
    encoder.expect_dimension().return_const(2usize);
    encoder
      .expect_encode()
      .returning(|texts| Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect()));
    encoder
  }

  #[test]
  fn test_build_index_keys_vectors_by_record() {
    let dataset = Dataset::from_csv_str(CSV).unwrap();
    let index = build_index(&dataset, &length_encoder(), 2).unwrap();

    assert_eq!(index.len(), 3);
    assert_eq!(index.ids(), &[RecordId(0), RecordId(1), RecordId(2)]);

    let expected = dataset.records()[1].text_chunk().len() as f32;
    assert_eq!(index.vector(1), Some(&[expected, 1.0][..]));
  }

  #[test]
  fn test_short_encoder_output_is_an_error() {
    let dataset = Dataset::from_csv_str(CSV).unwrap();
    let mut encoder = MockTextEncoder::new();
    encoder.expect_dimension().return_const(2usize);
    encoder.expect_encode().returning(|_| Ok(vec![vec![0.0, 0.0]]));

    let err = build_index(&dataset, &encoder, 64).unwrap_err();
    assert!(err.to_string().contains("returned 1 vectors for 3 texts"));
  }

  #[test]
  fn test_build_and_save_writes_loadable_index() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bookings.index");
    let dataset = Dataset::from_csv_str(CSV).unwrap();

    let report = build_and_save_index(&dataset, &length_encoder(), 64, &path).unwrap();
    assert_eq!(report, IndexBuildReport { records: 3, dimension: 2 });

    let loaded = FlatIndex::load(&path).unwrap();
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded.fingerprint(), &dataset.fingerprint());
  }
}
