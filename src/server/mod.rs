//! Local HTTP endpoint answering "where does this element come from?"

mod endpoint;
mod protocol;

pub use endpoint::{run, Endpoint};
