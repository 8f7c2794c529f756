pub mod node;
pub mod path;
pub mod resolver;

pub use node::{ResourceDescriptor, ResourceKind, UserId};
pub use path::VirtualPath;
