//! Browsing pipeline of a single surface: filters, stable sort, pagination and the cursor/mark state built on top

use crate::using;

pub mod filter;

using! {
    pub pagination,
    pub sort,
    pub state,
}

pub use filter::{FieldFilter, FilterState};
