pub mod arena;
pub mod controlflow;
pub mod error;
pub mod expr;
pub mod library;
pub mod pred;
pub mod retrieve;

pub use crate::arena::*;
pub use crate::expr::*;
pub use crate::library::{Library, ValueSetDef};
pub use crate::pred::*;
pub use crate::retrieve::*;
