use crate::context::RequirementsContext;
use crate::error::Result;
use crate::req::{
    ConditionRequirement, DataRequirement, ExprRequirement, ExpressionRequirement,
    PropertyRef, PropertyRequirement, QueryRequirement,
};
use elmreq_catalog::LibraryIdentifier;
use elmreq_expr::controlflow::{Branch, ControlFlow, Unbranch};
use elmreq_expr::error::Error as ExprError;
use elmreq_expr::{Expr, ExprArena, ExprID, ExprKind, ExprVisitor, Pred, Property};
use log::debug;
use smol_str::SmolStr;

/// Collect requirements of all sources of given query, and lower
/// conditions of its where clause into filters of each source.
///
/// A source that is a retrieve is filtered in place. A nested query
/// is collected first and then inferred, any other expression is
/// inferred as an unfiltered retrieve.
/// Only comparisons in top level conjunction of the where clause,
/// between one alias-scoped property and an alias-free comparand,
/// become conditions.
pub fn query_requirements<C: RequirementsContext>(
    arena: &mut ExprArena,
    query: ExprID,
    ctx: &C,
) -> Result<QueryRequirement> {
    let q = arena.must_query(query)?.clone();
    let scope = ctx.current_scope().clone();
    let mut qr = QueryRequirement::new(scope.clone(), query);
    for src in &q.sources {
        let dr = source_requirement(arena, src.expr, ctx)?;
        qr.add_source(dr.with_alias(&src.alias));
    }
    if let Some(pred) = q.where_clause {
        let mut conjuncts = vec![];
        flatten_conj(arena, pred, &mut conjuncts)?;
        for c in conjuncts {
            match condition_of(arena, c, &scope)? {
                Some((alias, cond)) => match qr.source_mut(&alias) {
                    Some(dr) => {
                        dr.report_property(&cond.property);
                        dr.add_condition(cond);
                    }
                    None => debug!("condition {} refers to outer alias {}", c, alias),
                },
                None => debug!("predicate {} is not a condition", c),
            }
        }
    }
    let mut collector = PropertyCollector {
        arena,
        props: vec![],
        shadowed: vec![],
        scopes: vec![],
    };
    for root in q.where_clause.into_iter().chain(q.ret) {
        arena.walk(root, &mut collector).unbranch()?;
    }
    for (alias, prop) in collector.props {
        if let Some(dr) = qr.source_mut(&alias) {
            dr.observed_properties.insert(prop);
        }
    }
    for dr in &qr.sources {
        dr.apply_data_requirements(arena, ctx)?;
    }
    Ok(qr)
}

fn source_requirement<C: RequirementsContext>(
    arena: &mut ExprArena,
    expr: ExprID,
    ctx: &C,
) -> Result<DataRequirement> {
    let scope = ctx.current_scope().clone();
    let (is_retrieve, is_query) = {
        let e = arena.must_get(expr)?;
        (e.is_retrieve(), e.is_query())
    };
    if is_retrieve {
        return Ok(DataRequirement::new(scope, expr));
    }
    let req = if is_query {
        ExpressionRequirement::Query(query_requirements(arena, expr, ctx)?)
    } else {
        ExpressionRequirement::Expr(ExprRequirement::new(scope, expr))
    };
    DataRequirement::infer_from(&req, arena)
}

fn flatten_conj(arena: &ExprArena, id: ExprID, out: &mut Vec<ExprID>) -> Result<()> {
    match &arena.must_get(id)?.kind {
        ExprKind::Pred(Pred::Conj(es)) => {
            for e in es {
                flatten_conj(arena, *e, out)?
            }
        }
        _ => out.push(id),
    }
    Ok(())
}

/// Try to make condition of a comparison.
/// Property on the right side is swapped to left with flipped operator.
fn condition_of(
    arena: &ExprArena,
    id: ExprID,
    scope: &LibraryIdentifier,
) -> Result<Option<(SmolStr, ConditionRequirement)>> {
    let f = match &arena.must_get(id)?.kind {
        ExprKind::Pred(Pred::Func(f)) => f,
        _ => return Ok(None),
    };
    let (lhs, rhs) = f.binary().ok_or(ExprError::InvalidArgCount(id))?;
    let make = |op, prop_id, prop: PropertyRef, comparand| ConditionRequirement {
        scope: scope.clone(),
        expr: id,
        op,
        property: PropertyRequirement::new(scope.clone(), prop_id, prop),
        comparand: Box::new(ExprRequirement::new(scope.clone(), comparand).into()),
    };
    if let Some((alias, prop)) = property_of(arena, lhs)? {
        if !arena.refers_alias(rhs) {
            return Ok(Some((alias, make(f.kind, lhs, prop, rhs))));
        }
    }
    if let Some(op) = f.kind.flip() {
        if let Some((alias, prop)) = property_of(arena, rhs)? {
            if !arena.refers_alias(lhs) {
                return Ok(Some((alias, make(op, rhs, prop, lhs))));
            }
        }
    }
    Ok(None)
}

/// Resolve alias-scoped property, looking through casts.
fn property_of(arena: &ExprArena, id: ExprID) -> Result<Option<(SmolStr, PropertyRef)>> {
    let e = arena.must_get(id)?;
    match &e.kind {
        ExprKind::Cast { arg, .. } => property_of(arena, *arg),
        ExprKind::Property(_) | ExprKind::Search(_) => Ok(property_ref(arena, e)),
        _ => Ok(None),
    }
}

#[inline]
fn property_ref(arena: &ExprArena, e: &Expr) -> Option<(SmolStr, PropertyRef)> {
    let (p, search) = match &e.kind {
        ExprKind::Property(p) => (p, false),
        ExprKind::Search(p) => (p, true),
        _ => return None,
    };
    let alias = alias_of(arena, p)?;
    let prop = PropertyRef {
        scope: Some(alias.clone()),
        path: p.path.clone(),
        search,
    };
    Some((alias, prop))
}

#[inline]
fn alias_of(arena: &ExprArena, p: &Property) -> Option<SmolStr> {
    if let Some(scope) = &p.scope {
        return Some(scope.clone());
    }
    match &arena.get(p.source?)?.kind {
        ExprKind::AliasRef(alias) => Some(alias.clone()),
        _ => None,
    }
}

/// Collects alias-scoped properties of the outer query.
/// Aliases rebound by a nested query are shadowed inside it.
struct PropertyCollector<'a> {
    arena: &'a ExprArena,
    props: Vec<(SmolStr, PropertyRef)>,
    shadowed: Vec<SmolStr>,
    // length of shadowed before entering each nested query
    scopes: Vec<usize>,
}

impl<'a> ExprVisitor<'a> for PropertyCollector<'a> {
    type Cont = ();
    type Break = ExprError;
    #[inline]
    fn enter(&mut self, _id: ExprID, e: &'a Expr) -> ControlFlow<ExprError> {
        if let ExprKind::Query(q) = &e.kind {
            self.scopes.push(self.shadowed.len());
            self.shadowed.extend(q.sources.iter().map(|s| s.alias.clone()));
            return ControlFlow::Continue(());
        }
        if let ExprKind::Property(p) | ExprKind::Search(p) = &e.kind {
            // unscoped property must have its source in arena
            if let (None, Some(src)) = (&p.scope, p.source) {
                self.arena.must_get(src).branch()?;
            }
        }
        if let Some((alias, prop)) = property_ref(self.arena, e) {
            if !self.shadowed.contains(&alias) {
                self.props.push((alias, prop))
            }
        }
        ControlFlow::Continue(())
    }

    #[inline]
    fn leave(&mut self, _id: ExprID, e: &'a Expr) -> ControlFlow<ExprError> {
        if let ExprKind::Query(_) = &e.kind {
            if let Some(len) = self.scopes.pop() {
                self.shadowed.truncate(len)
            }
        }
        ControlFlow::Continue(())
    }
}
