pub mod services;

pub use services::generator_service::SignalGenerator;
