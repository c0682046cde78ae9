//! Booking records and the in-memory dataset they are loaded into

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Columns every bookings file must carry
pub const REQUIRED_COLUMNS: [&str; 6] =
  ["hotel", "country", "adr", "is_canceled", "reservation_status", "reservation_status_date"];

/// Values treated as a missing country
const MISSING_MARKERS: [&str; 5] = ["", "null", "na", "n/a", "nan"];

/// Failures while loading a bookings file
#[derive(Debug, Error)]
pub enum DatasetError {
  #[error("failed to open dataset {path}: {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: csv::Error,
  },
  #[error("dataset is missing required column '{0}'")]
  MissingColumn(&'static str),
  #[error("malformed row {row}: {source}")]
  MalformedRow {
    row: usize,
    #[source]
    source: csv::Error,
  },
  #[error("row {row}, column '{column}': invalid value '{value}' ({expected})")]
  InvalidValue { row: usize, column: &'static str, value: String, expected: &'static str },
}

/// Stable identifier of a record within the dataset it was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// SHA-256 over the text chunks of every record, in row order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DatasetFingerprint(pub [u8; 32]);

impl fmt::Display for DatasetFingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0[..8].iter().try_for_each(|byte| write!(f, "{byte:02x}"))
  }
}

/// One booking row
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRecord {
  pub id: RecordId,
  pub hotel: String,
  pub country: Option<String>,
  pub adr: f64,
  pub is_canceled: bool,
  pub reservation_status: String,
  pub reservation_status_date: NaiveDate,
  /// Every column value in file order, as read
  pub raw: Vec<String>,
}

impl BookingRecord {
  /// Short natural-language summary used as encoder input
  pub fn text_chunk(&self) -> String {
    format!(
      "Hotel {} has an ADR of {:?} on {}",
      self.hotel,
      self.adr,
      self.reservation_status_date.format("%Y-%m-%d")
    )
  }

  /// Calendar month key (`YYYY-MM`) of the reservation status date
  pub fn month_key(&self) -> String {
    month_key(self.reservation_status_date)
  }
}

pub fn month_key(date: NaiveDate) -> String {
  format!("{:04}-{:02}", date.year(), date.month())
}

fn parse_country(value: &str) -> Option<String> {
  let trimmed = value.trim();
  if MISSING_MARKERS.contains(&trimmed.to_ascii_lowercase().as_str()) {
    None
  } else {
    Some(trimmed.to_string())
  }
}

fn parse_flag(value: &str) -> Option<bool> {
  match value.trim().to_ascii_lowercase().as_str() {
    "1" | "1.0" | "true" | "yes" => Some(true),
    "0" | "0.0" | "false" | "no" => Some(false),
    _ => None,
  }
}

// Indices into `REQUIRED_COLUMNS`
const HOTEL: usize = 0;
const COUNTRY: usize = 1;
const ADR: usize = 2;
const IS_CANCELED: usize = 3;
const STATUS: usize = 4;
const STATUS_DATE: usize = 5;

/// Header positions of the required columns, in `REQUIRED_COLUMNS` order
struct ColumnPositions([usize; 6]);

impl ColumnPositions {
  fn resolve(headers: &csv::StringRecord) -> Result<Self, DatasetError> {
    let mut positions = [0; 6];
    for (slot, column) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
      *slot = headers
        .iter()
        .position(|header| header == column)
        .ok_or(DatasetError::MissingColumn(column))?;
    }
    Ok(Self(positions))
  }

  fn field<'r>(&self, row: &'r csv::StringRecord, column: usize) -> &'r str {
    row.get(self.0[column]).unwrap_or("")
  }
}

/// Parse the date formats found in exported bookings files
pub fn parse_status_date(value: &str) -> Option<NaiveDate> {
  let value = value.trim();
  if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
    return Some(date);
  }
  if let Ok(datetime) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
    return Some(datetime.date());
  }
  if let Ok(date) = NaiveDate::parse_from_str(value, "%m/%d/%Y") {
    return Some(date);
  }
  // Any other timestamp that starts with an ISO date
  value.get(..10).and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// The full bookings dataset, immutable once loaded
#[derive(Debug, Clone, Default)]
pub struct Dataset {
  columns: Vec<String>,
  records: Vec<BookingRecord>,
}

impl Dataset {
  /// Load every row of a bookings CSV into memory
  pub fn load(path: &Path) -> Result<Self, DatasetError> {
    let reader = csv::ReaderBuilder::new()
      .has_headers(true)
      .trim(csv::Trim::Headers)
      .from_path(path)
      .map_err(|source| DatasetError::Open { path: path.to_path_buf(), source })?;
    Self::from_reader(reader)
  }

  /// Load from CSV text already in memory
  pub fn from_csv_str(content: &str) -> Result<Self, DatasetError> {
    let reader = csv::ReaderBuilder::new()
      .has_headers(true)
      .trim(csv::Trim::Headers)
      .from_reader(content.as_bytes());
    Self::from_reader(reader)
  }

  fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self, DatasetError> {
    let headers =
      reader.headers().map_err(|source| DatasetError::MalformedRow { row: 0, source })?.clone();
    let positions = ColumnPositions::resolve(&headers)?;

    let mut records = Vec::new();
    for (position, row) in reader.records().enumerate() {
      // Row numbers are 1-based and count the header line
      let row_number = position + 2;
      let row = row.map_err(|source| DatasetError::MalformedRow { row: row_number, source })?;
      let invalid = |column: usize, expected: &'static str| DatasetError::InvalidValue {
        row: row_number,
        column: REQUIRED_COLUMNS[column],
        value: positions.field(&row, column).to_string(),
        expected,
      };

      let adr =
        positions.field(&row, ADR).trim().parse::<f64>().map_err(|_| invalid(ADR, "a number"))?;
      let is_canceled = parse_flag(positions.field(&row, IS_CANCELED))
        .ok_or_else(|| invalid(IS_CANCELED, "0 or 1"))?;
      let reservation_status_date = parse_status_date(positions.field(&row, STATUS_DATE))
        .ok_or_else(|| invalid(STATUS_DATE, "a date such as 2017-03-09"))?;

      records.push(BookingRecord {
        id: RecordId(position as u64),
        hotel: positions.field(&row, HOTEL).to_string(),
        country: parse_country(positions.field(&row, COUNTRY)),
        adr,
        is_canceled,
        reservation_status: positions.field(&row, STATUS).to_string(),
        reservation_status_date,
        raw: row.iter().map(str::to_string).collect(),
      });
    }

    Ok(Self { columns: headers.iter().map(str::to_string).collect(), records })
  }

  pub fn records(&self) -> &[BookingRecord] {
    &self.records
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  /// Identity of the row contents the vector index is built from
  ///
  /// Editing, adding, removing or reordering rows changes the fingerprint.
  pub fn fingerprint(&self) -> DatasetFingerprint {
    let mut hasher = Sha256::new();
    for record in &self.records {
      let chunk = record.text_chunk();
      hasher.update((chunk.len() as u64).to_le_bytes());
      hasher.update(chunk.as_bytes());
    }
    DatasetFingerprint(hasher.finalize().into())
  }

  /// Look up a record by identifier
  pub fn get(&self, id: RecordId) -> Option<&BookingRecord> {
    let position = usize::try_from(id.0).ok()?;
    self.records.get(position).filter(|record| record.id == id)
  }

  /// Render every field of a record as `{'column': 'value', ...}`
  pub fn describe(&self, record: &BookingRecord) -> String {
    let fields: Vec<String> = self
      .columns
      .iter()
      .zip(record.raw.iter())
      .map(|(column, value)| format!("'{column}': '{value}'"))
      .collect();
    format!("{{{}}}", fields.join(", "))
  }

  /// Sum of daily rates per calendar month, ascending by month
  pub fn monthly_revenue(&self) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for record in &self.records {
      *totals.entry(record.month_key()).or_insert(0.0) += record.adr;
    }
    totals
  }

  /// Cancelled-booking counts per country, highest first
  ///
  /// Ties keep the order in which countries first appear among cancelled
  /// bookings. Records without a country are not counted.
  pub fn cancellations_by_country(&self, limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for record in self.records.iter().filter(|record| record.is_canceled) {
      if let Some(country) = record.country.as_deref() {
        let first_seen = counts.len();
        counts.entry(country).or_insert((0, first_seen)).0 += 1;
      }
    }

    let mut ranked: Vec<(&str, usize, usize)> =
      counts.into_iter().map(|(country, (count, first))| (country, count, first)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked.into_iter().take(limit).map(|(country, count, _)| (country.to_string(), count)).collect()
  }

  /// Mean daily rate across all records, `None` when empty
  pub fn average_adr(&self) -> Option<f64> {
    if self.records.is_empty() {
      return None;
    }
    let total: f64 = self.records.iter().map(|record| record.adr).sum();
    Some(total / self.records.len() as f64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = "\
hotel,is_canceled,adr,country,reservation_status,reservation_status_date
Resort Hotel,0,75.0,PRT,Check-Out,2015-07-02
City Hotel,1,120.5,GBR,Canceled,2015-07-15
City Hotel,1,99,PRT,Canceled,2015-08-01
Resort Hotel,1,60,NULL,No-Show,08/03/2015
";

  #[test]
  fn test_load_parses_typed_fields() {
    let dataset = Dataset::from_csv_str(SAMPLE).unwrap();
    assert_eq!(dataset.len(), 4);

    let first = &dataset.records()[0];
    assert_eq!(first.hotel, "Resort Hotel");
    assert!(!first.is_canceled);
    assert_eq!(first.country.as_deref(), Some("PRT"));
    assert_eq!(first.reservation_status_date, NaiveDate::from_ymd_opt(2015, 7, 2).unwrap());

    let last = &dataset.records()[3];
    assert_eq!(last.country, None);
    assert_eq!(last.reservation_status_date, NaiveDate::from_ymd_opt(2015, 8, 3).unwrap());
  }

  #[test]
  fn test_text_chunk_keeps_decimal_point() {
    let dataset = Dataset::from_csv_str(SAMPLE).unwrap();
    assert_eq!(
      dataset.records()[2].text_chunk(),
      "Hotel City Hotel has an ADR of 99.0 on 2015-08-01"
    );
  }

  #[test]
  fn test_monthly_revenue_groups_by_month() {
    let dataset = Dataset::from_csv_str(SAMPLE).unwrap();
    let revenue = dataset.monthly_revenue();

    let keys: Vec<&String> = revenue.keys().collect();
    assert_eq!(keys, vec!["2015-07", "2015-08"]);
    assert!((revenue["2015-07"] - 195.5).abs() < 1e-9);
    assert!((revenue["2015-08"] - 159.0).abs() < 1e-9);
  }

  #[test]
  fn test_cancellations_skip_missing_country() {
    let dataset = Dataset::from_csv_str(SAMPLE).unwrap();
    let top = dataset.cancellations_by_country(3);
    assert_eq!(top, vec![("GBR".to_string(), 1), ("PRT".to_string(), 1)]);
  }

  #[test]
  fn test_missing_column_is_rejected() {
    let err = Dataset::from_csv_str("hotel,adr\nA,1.0\n").unwrap_err();
    assert!(matches!(err, DatasetError::MissingColumn("country")));
  }

  #[test]
  fn test_parse_status_date_formats() {
    let expected = NaiveDate::from_ymd_opt(2017, 3, 9);
    assert_eq!(parse_status_date("2017-03-09"), expected);
    assert_eq!(parse_status_date("2017-03-09 00:00:00"), expected);
    assert_eq!(parse_status_date("2017-03-09T12:30:00.000Z"), expected);
    assert_eq!(parse_status_date("03/09/2017"), expected);
    assert_eq!(parse_status_date("March 9th"), None);
  }

  #[test]
  fn test_bad_date_reports_row() {
    let csv = "hotel,is_canceled,adr,country,reservation_status,reservation_status_date\n\
               A,0,1.0,PRT,Check-Out,yesterday\n";
    let err = Dataset::from_csv_str(csv).unwrap_err();
    assert!(err.to_string().contains("row 2"));
    assert!(err.to_string().contains("column 'reservation_status_date'"));
  }

  #[test]
  fn test_bad_value_names_row_and_column() {
    let csv = "hotel,is_canceled,adr,country,reservation_status,reservation_status_date\n\
               A,0,1.0,PRT,Check-Out,2017-03-09\n\
               B,0,cheap,PRT,Check-Out,2017-03-09\n";
    let err = Dataset::from_csv_str(csv).unwrap_err();
    match &err {
      DatasetError::InvalidValue { row, column, value, .. } => {
        assert_eq!(*row, 3);
        assert_eq!(*column, "adr");
        assert_eq!(value, "cheap");
      }
      other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("row 3, column 'adr'"));

    let csv = "hotel,is_canceled,adr,country,reservation_status,reservation_status_date\n\
               A,maybe,1.0,PRT,Check-Out,2017-03-09\n";
    let err = Dataset::from_csv_str(csv).unwrap_err();
    assert!(err.to_string().contains("column 'is_canceled'"));
  }

  #[test]
  fn test_fingerprint_tracks_row_contents_and_order() {
    let dataset = Dataset::from_csv_str(SAMPLE).unwrap();
    assert_eq!(dataset.fingerprint(), Dataset::from_csv_str(SAMPLE).unwrap().fingerprint());

    let mut lines: Vec<&str> = SAMPLE.lines().collect();
    lines.swap(1, 2);
    let reordered = Dataset::from_csv_str(&lines.join("\n")).unwrap();
    assert_eq!(reordered.len(), dataset.len());
    assert_ne!(reordered.fingerprint(), dataset.fingerprint());

    let edited = Dataset::from_csv_str(&SAMPLE.replace("75.0", "76.0")).unwrap();
    assert_ne!(edited.fingerprint(), dataset.fingerprint());

    assert_eq!(Dataset::default().fingerprint().to_string().len(), 16);
  }

  #[test]
  fn test_describe_lists_all_columns() {
    let dataset = Dataset::from_csv_str(SAMPLE).unwrap();
    let description = dataset.describe(&dataset.records()[0]);
    assert!(description.starts_with("{'hotel': 'Resort Hotel', 'is_canceled': '0'"));
    assert!(description.ends_with("'reservation_status_date': '2015-07-02'}"));
  }
}
