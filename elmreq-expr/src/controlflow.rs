pub use std::ops::ControlFlow;

use crate::error::{Error, Result};

/// Convert node access result to ControlFlow, so visitors can
/// stop the walk on first error.
pub trait Branch<C> {
    fn branch(self) -> ControlFlow<Error, C>;
}

impl<C> Branch<C> for Result<C> {
    #[inline]
    fn branch(self) -> ControlFlow<Error, C> {
        match self {
            Ok(c) => ControlFlow::Continue(c),
            Err(e) => ControlFlow::Break(e),
        }
    }
}

/// Convert ControlFlow of a finished walk back to Result.
pub trait Unbranch {
    type R;
    fn unbranch(self) -> Self::R;
}

impl<C> Unbranch for ControlFlow<Error, C> {
    type R = Result<C>;
    #[inline]
    fn unbranch(self) -> Self::R {
        match self {
            ControlFlow::Continue(c) => Ok(c),
            ControlFlow::Break(e) => Err(e),
        }
    }
}
