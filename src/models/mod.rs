pub mod normalizer;
pub mod transaction;

pub use normalizer::normalize_transaction;
pub use transaction::{is_valid_address, Direction, RawTransaction, TransactionRecord};
