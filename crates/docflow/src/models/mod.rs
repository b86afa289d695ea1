//! Catalog models

mod assignment;
pub(crate) mod common;
mod document;
mod employee;
mod metadata;

pub use assignment::*;
pub use common::ETag;
pub use document::*;
pub use employee::*;
pub use metadata::*;
