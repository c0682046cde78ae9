//! Flat L2 vector index with binary persistence
//!
//! Search is exhaustive: every stored vector is compared against the query.
//! Each vector carries the [`RecordId`] of the booking it was built from, and
//! the index records the [`DatasetFingerprint`] of the rows it was built over,
//! so an index left over from an edited or reordered dataset is detected.

use std::path::Path;
use thiserror::Error;

use crate::server::models::booking::{DatasetFingerprint, RecordId};

const MAGIC: &[u8; 4] = b"CIDX";
const FORMAT_VERSION: u32 = 2;
const FINGERPRINT_LEN: usize = 32;
const HEADER_LEN: usize = 16 + FINGERPRINT_LEN;

/// Failures while building, searching or persisting an index
#[derive(Debug, Error)]
pub enum IndexError {
  #[error("vector has dimension {actual}, index expects {expected}")]
  DimensionMismatch { expected: usize, actual: usize },
  #[error("index dimension must be greater than zero")]
  ZeroDimension,
  #[error("invalid index file: {0}")]
  Corrupt(String),
  #[error("unsupported index format version {0}")]
  UnsupportedVersion(u32),
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

/// A search hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
  pub record_id: RecordId,
  /// Squared Euclidean distance to the query
  pub distance: f32,
}

/// Exhaustive nearest-neighbour index over fixed-dimension vectors
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
  dimension: usize,
  /// Row-major vector storage, `dimension` floats per entry
  vectors: Vec<f32>,
  ids: Vec<RecordId>,
  /// Dataset the entries were encoded from
  fingerprint: DatasetFingerprint,
}

impl FlatIndex {
  pub fn new(dimension: usize) -> Result<Self, IndexError> {
    if dimension == 0 {
      return Err(IndexError::ZeroDimension);
    }
    Ok(Self {
      dimension,
      vectors: Vec::new(),
      ids: Vec::new(),
      fingerprint: DatasetFingerprint::default(),
    })
  }

  /// Tag the index with the dataset its entries come from
  pub fn with_fingerprint(mut self, fingerprint: DatasetFingerprint) -> Self {
    self.fingerprint = fingerprint;
    self
  }

  pub fn fingerprint(&self) -> &DatasetFingerprint {
    &self.fingerprint
  }

  pub fn dimension(&self) -> usize {
    self.dimension
  }

  pub fn len(&self) -> usize {
    self.ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ids.is_empty()
  }

  pub fn ids(&self) -> &[RecordId] {
    &self.ids
  }

  /// Append one vector
  pub fn add(&mut self, id: RecordId, vector: &[f32]) -> Result<(), IndexError> {
    self.check_dimension(vector)?;
    self.vectors.extend_from_slice(vector);
    self.ids.push(id);
    Ok(())
  }

  /// The stored vector for the entry at `position`
  pub fn vector(&self, position: usize) -> Option<&[f32]> {
    let start = position.checked_mul(self.dimension)?;
    self.vectors.get(start..start + self.dimension)
  }

  /// The `k` closest entries to `query`, nearest first
  pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
    self.check_dimension(query)?;
    if k == 0 {
      return Ok(Vec::new());
    }

    let mut neighbors: Vec<Neighbor> = self
      .vectors
      .chunks_exact(self.dimension)
      .zip(self.ids.iter())
      .map(|(vector, &record_id)| Neighbor { record_id, distance: l2_distance_sq(vector, query) })
      .collect();

    // Stable sort keeps insertion order among equal distances
    neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    neighbors.truncate(k);
    Ok(neighbors)
  }

  fn check_dimension(&self, vector: &[f32]) -> Result<(), IndexError> {
    if vector.len() != self.dimension {
      return Err(IndexError::DimensionMismatch { expected: self.dimension, actual: vector.len() });
    }
    Ok(())
  }

  /// Serialize the index.
  ///
  /// Layout (little-endian):
  /// ```text
  /// [4B]  magic "CIDX"
  /// [4B]  format version
  /// [4B]  dimension
  /// [4B]  entry count
  /// [32B] dataset fingerprint
  /// [count * dimension * 4B] vectors (contiguous)
  /// [count * 8B] record ids
  /// ```
  pub fn to_bytes(&self) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + self.vectors.len() * 4 + self.ids.len() * 8);

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&(self.dimension as u32).to_le_bytes());
    buf.extend_from_slice(&(self.ids.len() as u32).to_le_bytes());
    buf.extend_from_slice(&self.fingerprint.0);

    for value in &self.vectors {
      buf.extend_from_slice(&value.to_le_bytes());
    }
    for id in &self.ids {
      buf.extend_from_slice(&id.0.to_le_bytes());
    }

    buf
  }

  /// Deserialize an index produced by [`FlatIndex::to_bytes`]
  pub fn from_bytes(data: &[u8]) -> Result<Self, IndexError> {
    if data.len() < HEADER_LEN {
      return Err(IndexError::Corrupt("data too short for header".to_string()));
    }
    if &data[0..4] != MAGIC {
      return Err(IndexError::Corrupt("bad magic bytes".to_string()));
    }

    let version = read_u32(data, 4);
    if version != FORMAT_VERSION {
      return Err(IndexError::UnsupportedVersion(version));
    }
    let dimension = read_u32(data, 8) as usize;
    let count = read_u32(data, 12) as usize;
    if dimension == 0 {
      return Err(IndexError::ZeroDimension);
    }

    let mut fingerprint = [0u8; FINGERPRINT_LEN];
    fingerprint.copy_from_slice(&data[16..HEADER_LEN]);

    let sizes = count.checked_mul(dimension).and_then(|floats| floats.checked_mul(4)).and_then(
      |vector_bytes| {
        let id_bytes = count.checked_mul(8)?;
        let expected = HEADER_LEN.checked_add(vector_bytes)?.checked_add(id_bytes)?;
        Some((vector_bytes, expected))
      },
    );
    let Some((vector_bytes, expected)) = sizes else {
      return Err(IndexError::Corrupt(format!(
        "header declares {count} vectors of dimension {dimension}, which cannot fit in memory"
      )));
    };
    if data.len() != expected {
      return Err(IndexError::Corrupt(format!(
        "expected {expected} bytes for {count} vectors of dimension {dimension}, found {}",
        data.len()
      )));
    }

    let vectors = data[HEADER_LEN..HEADER_LEN + vector_bytes]
      .chunks_exact(4)
      .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
      .collect();

    let ids = data[HEADER_LEN + vector_bytes..]
      .chunks_exact(8)
      .map(|bytes| {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        RecordId(u64::from_le_bytes(raw))
      })
      .collect();

    Ok(Self { dimension, vectors, ids, fingerprint: DatasetFingerprint(fingerprint) })
  }

  /// Write the index to disk, replacing any previous file
  pub fn save(&self, path: &Path) -> Result<(), IndexError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)?;
    }
    // Readers never observe a partially written index
    let tmp_path = path.with_extension("index.tmp");
    std::fs::write(&tmp_path, self.to_bytes())?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
  }

  pub fn load(path: &Path) -> Result<Self, IndexError> {
    let data = std::fs::read(path)?;
    Self::from_bytes(&data)
  }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
  u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn l2_distance_sq(a: &[f32], b: &[f32]) -> f32 {
  a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn sample_index() -> FlatIndex {
    let mut index = FlatIndex::new(2).unwrap();
    index.add(RecordId(10), &[0.0, 0.0]).unwrap();
    index.add(RecordId(11), &[1.0, 1.0]).unwrap();
    index.add(RecordId(12), &[5.0, 5.0]).unwrap();
    index
  }

  #[test]
  fn test_search_returns_nearest_first() {
    let index = sample_index();
    let hits = index.search(&[0.9, 1.2], 2).unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].record_id, RecordId(11));
    assert!((hits[0].distance - 0.05).abs() < 1e-6);
    assert_eq!(hits[1].record_id, RecordId(10));
  }

  #[test]
  fn test_search_on_empty_index_is_empty() {
    let index = FlatIndex::new(3).unwrap();
    assert!(index.search(&[1.0, 2.0, 3.0], 1).unwrap().is_empty());
  }

  #[test]
  fn test_dimension_mismatch_is_rejected() {
    let mut index = sample_index();
    assert!(matches!(
      index.add(RecordId(1), &[1.0]),
      Err(IndexError::DimensionMismatch { expected: 2, actual: 1 })
    ));
    assert!(index.search(&[1.0, 2.0, 3.0], 1).is_err());
  }

  #[test]
  fn test_save_and_load_preserves_entries() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bookings.index");
    let index = sample_index();

    index.save(&path).unwrap();
    let loaded = FlatIndex::load(&path).unwrap();

    assert_eq!(loaded, index);
    assert_eq!(loaded.vector(2), Some(&[5.0, 5.0][..]));
  }

  #[test]
  fn test_corrupt_data_is_rejected() {
    let mut bytes = sample_index().to_bytes();
    bytes.truncate(bytes.len() - 1);
    assert!(matches!(FlatIndex::from_bytes(&bytes), Err(IndexError::Corrupt(_))));

    let mut bad_magic = sample_index().to_bytes();
    bad_magic[0] = b'X';
    assert!(matches!(FlatIndex::from_bytes(&bad_magic), Err(IndexError::Corrupt(_))));

    let mut bad_version = sample_index().to_bytes();
    bad_version[4] = 9;
    assert!(matches!(FlatIndex::from_bytes(&bad_version), Err(IndexError::UnsupportedVersion(9))));

    // Sizes in the header that overflow are reported, not trusted
    let mut huge = sample_index().to_bytes();
    huge[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
    huge[12..16].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(FlatIndex::from_bytes(&huge), Err(IndexError::Corrupt(_))));
  }

  #[test]
  fn test_fingerprint_survives_save_and_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bookings.index");
    let index = sample_index().with_fingerprint(DatasetFingerprint([7u8; 32]));

    index.save(&path).unwrap();
    let loaded = FlatIndex::load(&path).unwrap();

    assert_eq!(loaded.fingerprint(), &DatasetFingerprint([7u8; 32]));
    assert_ne!(loaded.fingerprint(), sample_index().fingerprint());
  }
}
