pub mod execution_service;
pub mod http_service;
