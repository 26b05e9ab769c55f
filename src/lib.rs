//! armgen - generic Azure Resource Manager resources
//!
//! Manages arbitrary ARM resources without a per-type schema: identifiers
//! are built from `name`, `parent_id` and `type@api-version`, and responses
//! are projected through user-chosen export paths.

pub mod azure;
pub mod config;
pub mod resource;

/// Version injected at compile time via ARMGEN_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("ARMGEN_VERSION") {
    Some(v) => v,
    None => "dev",
};
