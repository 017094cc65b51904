pub mod context;
pub mod error;
pub mod explain;
pub mod infer;
pub mod lower;
pub mod query;
pub mod req;

pub use crate::context::{ElmRequirementsContext, RequirementsContext};
pub use crate::lower::LowerEffect;
pub use crate::query::query_requirements;
pub use crate::req::*;
