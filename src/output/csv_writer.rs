use std::path::{Path, PathBuf};

use crate::error::OutputError;
use crate::logging::LogContext;
use crate::models::TransactionRecord;

/// CSV sink: one file per run with a fixed header.
pub struct CsvWriter {
    path: PathBuf,
}

impl CsvWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize the full record collection.
    ///
    /// An empty collection still produces the header row, so downstream
    /// consumers always see the schema.
    pub fn write(&self, records: &[TransactionRecord]) -> Result<(), OutputError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)?;

        writer.write_record(TransactionRecord::CSV_HEADER)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        LogContext::new("csv_writer", "write")
            .with_metadata("path", serde_json::json!(self.path.display().to_string()))
            .with_metadata("records", serde_json::json!(records.len()))
            .info(&format!(
                "Wrote {} records to {}",
                records.len(),
                self.path.display()
            ));

        Ok(())
    }

    /// Read a previously written file back, mostly for output verification
    pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<TransactionRecord>, OutputError> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let mut records = Vec::new();
        for result in reader.deserialize() {
            records.push(result?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use tempfile::tempdir;

    fn sample_record() -> TransactionRecord {
        TransactionRecord {
            chain: "ethereum".to_string(),
            hash: "0xhash1".to_string(),
            from_address: "0xABC".to_string(),
            to_address: "0xDEF".to_string(),
            value: 1.5,
            gas_price_gwei: 20.0,
            block_number: 100,
            nonce: 3,
            timestamp: 1700000000,
            direction: Direction::Outgoing,
        }
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transactions_test.csv");

        let records = vec![
            sample_record(),
            TransactionRecord {
                hash: "0xhash2".to_string(),
                direction: Direction::Incoming,
                ..sample_record()
            },
        ];

        CsvWriter::new(&path).write(&records).unwrap();

        let read_back = CsvWriter::read_records(&path).unwrap();
        assert_eq!(read_back, records);
    }

    #[test]
    fn test_header_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transactions_test.csv");

        CsvWriter::new(&path).write(&[sample_record()]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let first_line = content.lines().next().unwrap();
        assert_eq!(
            first_line,
            "chain,hash,from,to,value,gas_price_gwei,block_number,nonce,timestamp,direction"
        );
        assert!(content.lines().nth(1).unwrap().ends_with("outgoing"));
    }

    #[test]
    fn test_empty_collection_writes_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transactions_empty.csv");

        CsvWriter::new(&path).write(&[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("chain,hash,from,to"));

        let read_back = CsvWriter::read_records(&path).unwrap();
        assert!(read_back.is_empty());
    }

    #[test]
    fn test_unwritable_path_fails() {
        let result = CsvWriter::new("/nonexistent-dir/out.csv").write(&[]);
        assert!(matches!(result, Err(OutputError::Csv(_))));
    }
}
