use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub trait ToResult {
    type Output;

    fn must_ok(self) -> Result<Self::Output>;
}

impl<T> ToResult for Option<T> {
    type Output = T;

    fn must_ok(self) -> Result<Self::Output> {
        self.ok_or(Error::MustOK)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    ParseDatetimeError(#[from] elmreq_datatype::DatetimeParseError),
    #[error("Internal error MustOK")]
    MustOK,
    #[error(transparent)]
    ExprError(#[from] elmreq_expr::error::Error),
    #[error(transparent)]
    CatalogError(#[from] elmreq_catalog::error::Error),
}
