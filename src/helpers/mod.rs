//! Helper functions for templates and generated paths

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
