pub mod rpc_client;
pub mod scanner;

pub use rpc_client::{Block, RpcClient};
pub use scanner::ChainScanner;
