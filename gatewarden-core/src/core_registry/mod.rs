//! Group Registry
//!
//! Maps an external chat identifier to a managed-group record holding the
//! group's admission limit and content-filter flag. Mutations are single-row,
//! last-writer-wins; no group-level locking is required here.

pub mod group;
pub mod registry;

pub use group::{
    clamp_admission_limit, ManagedGroup, DEFAULT_ADMISSION_LIMIT, MAX_ADMISSION_LIMIT,
};
pub use registry::{GroupRegistry, RegistryError};
