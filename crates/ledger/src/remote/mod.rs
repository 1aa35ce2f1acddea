pub mod rpc_client;

pub use rpc_client::{LedgerRpc, RpcLedger};

#[cfg(test)]
pub use rpc_client::MockLedgerRpc;
