use std::path::{Path, PathBuf};
use std::str::FromStr;

use rusqlite::{params, Connection};

use crate::error::StorageError;
use crate::logging::LogContext;
use crate::models::{Direction, TransactionRecord};

/// SQLite sink: one database file per run with a single transactions table.
pub struct SqliteWriter {
    path: PathBuf,
}

impl SqliteWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the schema if absent and bulk-insert all records in one
    /// transaction. An empty collection still creates the table.
    pub fn write(&self, records: &[TransactionRecord]) -> Result<(), StorageError> {
        let mut conn = Connection::open(&self.path)?;
        initialize_schema(&conn)?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO transactions (chain, hash, from_address, to_address, value, gas_price_gwei, block_number, nonce, timestamp, direction)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            for record in records {
                stmt.execute(params![
                    record.chain,
                    record.hash,
                    record.from_address,
                    record.to_address,
                    record.value,
                    record.gas_price_gwei,
                    record.block_number,
                    record.nonce,
                    record.timestamp,
                    record.direction.as_str(),
                ])?;
            }
        }
        tx.commit()?;

        LogContext::new("sqlite_writer", "write")
            .with_metadata("path", serde_json::json!(self.path.display().to_string()))
            .with_metadata("records", serde_json::json!(records.len()))
            .info(&format!(
                "Wrote {} records to {}",
                records.len(),
                self.path.display()
            ));

        Ok(())
    }

    /// Read all rows back in insertion order, mostly for output verification
    pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<TransactionRecord>, StorageError> {
        let conn = Connection::open(path.as_ref())?;

        let mut stmt = conn.prepare(
            "SELECT chain, hash, from_address, to_address, value, gas_price_gwei, block_number, nonce, timestamp, direction
             FROM transactions ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            let direction: String = row.get(9)?;
            let direction = Direction::from_str(&direction).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, e.into())
            })?;
            Ok(TransactionRecord {
                chain: row.get(0)?,
                hash: row.get(1)?,
                from_address: row.get(2)?,
                to_address: row.get(3)?,
                value: row.get(4)?,
                gas_price_gwei: row.get(5)?,
                block_number: row.get(6)?,
                nonce: row.get(7)?,
                timestamp: row.get(8)?,
                direction,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        Ok(records)
    }

    /// Number of stored rows
    pub fn count(path: impl AsRef<Path>) -> Result<u64, StorageError> {
        let conn = Connection::open(path.as_ref())?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Initialize the database schema, mirroring the CSV column set
fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chain TEXT NOT NULL,
            hash TEXT NOT NULL,
            from_address TEXT NOT NULL,
            to_address TEXT NOT NULL,
            value REAL NOT NULL,
            gas_price_gwei REAL NOT NULL,
            block_number INTEGER NOT NULL,
            nonce INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            direction TEXT NOT NULL CHECK (direction IN ('incoming', 'outgoing'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_chain ON transactions(chain)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_block ON transactions(block_number)",
        [],
    )?;

    Ok(())
}
