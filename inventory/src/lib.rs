mod clock;
mod errors;
mod filter;
mod kind;
mod service;

pub mod cascade;
pub mod fixtures;
pub mod locator;
pub mod model;
pub mod position;
pub mod projector;
pub mod tree;

pub use clock::CascadeClock;
pub use errors::{Error, ValidationError};
pub use filter::{DeletionFilter, ScopeLevel};
pub use kind::NodeKind;
pub use locator::{locate, Located};
pub use position::{device_path, Indices};
pub use projector::{Project, Projected};
pub use service::InventoryService;
pub use tree::{Node, NodeRef};

#[cfg(test)]
mod tests;

#[cfg(test)]
use rstest_reuse;
