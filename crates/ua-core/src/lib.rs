//! Device capability engine.
//!
//! This library provides:
//! - The device model and fallback-resolving repository
//! - The repository builder for XML definitions and ordered patches
//! - The ordered handler chain that maps user agents to devices
//! - Request construction from headers and the [`manager::Manager`] facade
//! - Exit codes and structured logging for the `ua-core` binary

pub mod builder;
pub mod capability;
pub mod device;
pub mod exit_codes;
pub mod handlers;
pub mod index;
pub mod logging;
pub mod manager;
pub mod matchers;
pub mod repository;
pub mod request;

pub use builder::{BuiltRepository, CapabilityFilter, RepositoryBuilder};
pub use device::Device;
pub use manager::Manager;
pub use repository::{DatabaseInfo, Repository};
pub use request::{Request, RequestFactory};
