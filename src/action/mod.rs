//! Action safety layer: per-kind action registry, read-only policy, variable substitution, confirmation and execution

use crate::using;

pub mod policy;
pub mod substitute;

using! {
    pub confirm,
    pub executor,
    pub model,
    pub registry,
}
