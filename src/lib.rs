#![allow(non_camel_case_types)]

pub mod barrier;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod core;
pub mod fixed;
pub mod mem;
pub mod sync;
pub mod tex;

pub use cluster::Cluster;
pub use config::Arch;
pub use mem::{MemoryPort, Ram};
pub use tex::TexUnit;

pub type address = u64;

/// Fatal configuration errors.
///
/// These indicate a broken instruction stream or simulator
/// misconfiguration, not a runtime condition to model: the simulation
/// must stop, no value is ever fabricated in their place. They are
/// surfaced as typed errors so an embedding host can recover.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid texture state register {index}")]
    InvalidStateRegister { index: u32 },

    #[error("unsupported filter mode {mode:?}")]
    UnsupportedFilter { mode: tex::FilterMode },

    #[error("invalid {what} value {value}")]
    InvalidEnum { what: &'static str, value: u32 },

    #[error("invalid barrier id {bar_id}")]
    InvalidBarrier { bar_id: u32 },

    #[error("invalid core id {core_id}")]
    InvalidCoreId { core_id: usize },

    #[error("invalid texture unit {unit}")]
    InvalidTexUnit { unit: usize },
}
