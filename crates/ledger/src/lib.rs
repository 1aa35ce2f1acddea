//! Signal program client: instruction codec, RPC seam and the
//! submission service that turns a signed signal into a confirmed
//! transaction.

pub mod error;
pub mod instruction;
pub mod remote;
pub mod services;

pub use error::SubmitError;
pub use instruction::{EncodingError, SignalInstruction};
pub use remote::{LedgerRpc, RpcLedger};
pub use services::submitter::{LedgerSubmitter, SignalSubmitter};
