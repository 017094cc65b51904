use crate::expr::ExprID;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Expression {0} not found")]
    ExprNotFound(ExprID),
    #[error("Expression {0} is not a retrieve")]
    NotRetrieve(ExprID),
    #[error("Expression {0} is not a query")]
    NotQuery(ExprID),
    #[error("Expression {0} has invalid number of arguments")]
    InvalidArgCount(ExprID),
    #[error("Duplicated statement '{0}'")]
    DuplicatedStatement(String),
    #[error("Duplicated value set '{0}'")]
    DuplicatedValueSet(String),
}
