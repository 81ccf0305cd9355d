//! Repository implementations for database access

pub mod generation_repo;

pub use generation_repo::GenerationRepository;
