pub mod signal;

pub use signal::{
    SIGNATURE_LEN, SignalStatus, SignedTradingSignal, StatusUpdate, TrackedTradingSignal,
    TradingSignal, TransitionError, ValidationError,
};
