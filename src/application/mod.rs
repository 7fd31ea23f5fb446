mod application;
pub mod data;
mod listing;
mod runtime_config;

pub use application::{Application, ApplicationError, execute};
pub use listing::{render_children, render_entry, render_tree};
pub use runtime_config::RuntimeConfig;
