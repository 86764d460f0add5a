pub mod eviction_service;
pub mod sweep_service;
