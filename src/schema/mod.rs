pub mod builder;
pub mod errors;
pub mod relationship;
pub mod resolver;

pub use builder::{EdgeHandle, Schema};
pub use errors::SchemaError;
pub use relationship::{path_to_rel, rel_name, JoinStep, RelEdge, RelPoint, RelType, Relationship};
pub use resolver::RelatedNode;
