//! Callable-function surface and its in-process backend.

pub mod api;
pub mod error;
pub mod local;

pub use api::FirebaseFunctions;
pub use error::{FunctionsError, FunctionsErrorCode, FunctionsResult};
pub use local::LocalFunctions;
