pub mod csv_writer;
pub mod sqlite_writer;

pub use csv_writer::CsvWriter;
pub use sqlite_writer::SqliteWriter;

/// Run timestamp used in output filenames, e.g. `transactions_20260806_142500.csv`
pub fn run_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
