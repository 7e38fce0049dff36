//! Infrastructure layer: wire formats and collaborator implementations.

pub mod dto;
pub mod repository;
