//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The raw 4KB data container
//! - [`NodeHeader`] - Metadata at the start of every node page
//! - [`NodeKind`] - Leaf / internal discriminator

#[allow(clippy::module_inception)]
mod page;
mod node_header;

pub use node_header::{NodeHeader, NodeKind};
pub use page::Page;
