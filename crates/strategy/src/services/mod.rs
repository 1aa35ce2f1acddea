pub mod generator_service;
