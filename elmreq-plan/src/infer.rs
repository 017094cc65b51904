use crate::error::Result;
use crate::req::{DataRequirement, ExpressionRequirement, QueryRequirement};
use elmreq_expr::{Expr, ExprArena, ExprKind, Retrieve};
use log::debug;

impl DataRequirement {
    /// Infer a data requirement from requirement of arbitrary expression,
    /// so an enclosing query can treat the expression as a retrieve.
    ///
    /// Nodes referred by the input are never modified: a retrieve is copied
    /// before it is referred by the new requirement.
    pub fn infer_from(req: &ExpressionRequirement, arena: &mut ExprArena) -> Result<Self> {
        match req {
            ExpressionRequirement::Data(dr) => infer_from_data(dr, arena),
            ExpressionRequirement::Query(qr) => infer_from_query(qr, arena),
            _ => synthesize(req, arena),
        }
    }
}

#[inline]
fn infer_from_data(dr: &DataRequirement, arena: &mut ExprArena) -> Result<DataRequirement> {
    let retrieve = arena.copy_expr(dr.retrieve)?;
    let mut res = DataRequirement::new(dr.scope.clone(), retrieve);
    res.inferred_from = Some(dr.retrieve);
    // conditions belong to the original scope and are not copied.
    res.observed_properties = dr.observed_properties.clone();
    Ok(res)
}

#[inline]
fn infer_from_query(qr: &QueryRequirement, arena: &mut ExprArena) -> Result<DataRequirement> {
    match qr.single_source() {
        Some(dr) => infer_from_data(dr, arena),
        None => {
            debug!(
                "query {} has {} sources, no unique origin",
                qr.expr,
                qr.sources.len()
            );
            synthesize(&ExpressionRequirement::Query(qr.clone()), arena)
        }
    }
}

/// Synthesize an unfiltered retrieve carrying the type and
/// position of the expression.
#[inline]
fn synthesize(req: &ExpressionRequirement, arena: &mut ExprArena) -> Result<DataRequirement> {
    let (ty, meta) = match req.expr() {
        Some(id) => {
            let e = arena.must_get(id)?;
            (e.ty.clone(), e.meta.clone())
        }
        None => Default::default(),
    };
    let retrieve = arena.insert(Expr {
        kind: ExprKind::Retrieve(Box::new(Retrieve::unfiltered())),
        ty,
        meta,
    });
    debug!(
        "synthesized retrieve {} for expression {:?}",
        retrieve,
        req.expr()
    );
    Ok(DataRequirement::new(req.scope().clone(), retrieve))
}
