pub mod signal_ticker;
pub mod supervisor;
