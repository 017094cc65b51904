use crate::controlflow::ControlFlow;
use crate::error::{Error, Result};
use crate::expr::{Effect, Expr, ExprID, ExprKind, ExprVisitor, IntervalExpr, Query};
use crate::retrieve::Retrieve;
use elmreq_datatype::ElmType;
use slab::Slab;

/// ExprArena owns all expression nodes of a compiled library
/// and provides lookup and update methods.
/// Ids are stable: nodes are only added, never removed.
#[derive(Debug, Default, Clone)]
pub struct ExprArena(Slab<Expr>);

impl ExprArena {
    #[inline]
    pub fn new() -> Self {
        ExprArena::default()
    }

    #[inline]
    pub fn insert(&mut self, e: Expr) -> ExprID {
        let id = self.0.insert(e);
        ExprID::from(id as u32)
    }

    #[inline]
    pub fn get(&self, id: ExprID) -> Option<&Expr> {
        self.0.get(id.value() as usize)
    }

    #[inline]
    pub fn get_mut(&mut self, id: ExprID) -> Option<&mut Expr> {
        self.0.get_mut(id.value() as usize)
    }

    #[inline]
    pub fn must_get(&self, id: ExprID) -> Result<&Expr> {
        self.get(id).ok_or(Error::ExprNotFound(id))
    }

    #[inline]
    pub fn must_get_mut(&mut self, id: ExprID) -> Result<&mut Expr> {
        self.get_mut(id).ok_or(Error::ExprNotFound(id))
    }

    #[inline]
    pub fn must_retrieve(&self, id: ExprID) -> Result<&Retrieve> {
        match &self.must_get(id)?.kind {
            ExprKind::Retrieve(r) => Ok(r),
            _ => Err(Error::NotRetrieve(id)),
        }
    }

    #[inline]
    pub fn must_retrieve_mut(&mut self, id: ExprID) -> Result<&mut Retrieve> {
        match &mut self.must_get_mut(id)?.kind {
            ExprKind::Retrieve(r) => Ok(r),
            _ => Err(Error::NotRetrieve(id)),
        }
    }

    #[inline]
    pub fn must_query(&self, id: ExprID) -> Result<&Query> {
        match &self.must_get(id)?.kind {
            ExprKind::Query(q) => Ok(q),
            _ => Err(Error::NotQuery(id)),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow copy an expression given its id.
    /// The new node shares all children with the original,
    /// so later changes on the copy won't be visible through
    /// the original id.
    #[inline]
    pub fn copy_expr(&mut self, id: ExprID) -> Result<ExprID> {
        let e = self.must_get(id)?.clone();
        Ok(self.insert(e))
    }

    /// Add interval expression, deriving its type from bounds.
    /// If both bounds are absent, point type is Any.
    #[inline]
    pub fn add_interval(
        &mut self,
        low: Option<ExprID>,
        low_closed: bool,
        high: Option<ExprID>,
        high_closed: bool,
    ) -> Result<ExprID> {
        let point = match low.or(high) {
            Some(id) => self.must_get(id)?.ty.clone(),
            None => ElmType::Any,
        };
        let e = Expr::typed(
            ExprKind::Interval(IntervalExpr {
                low,
                low_closed,
                high,
                high_closed,
            }),
            ElmType::interval(point),
        );
        Ok(self.insert(e))
    }

    /// Add start of given interval.
    #[inline]
    pub fn add_start(&mut self, interval: ExprID) -> Result<ExprID> {
        let ty = self.point_type_of(interval)?;
        Ok(self.insert(Expr::typed(ExprKind::Start(interval), ty)))
    }

    /// Add end of given interval.
    #[inline]
    pub fn add_end(&mut self, interval: ExprID) -> Result<ExprID> {
        let ty = self.point_type_of(interval)?;
        Ok(self.insert(Expr::typed(ExprKind::End(interval), ty)))
    }

    #[inline]
    fn point_type_of(&self, interval: ExprID) -> Result<ElmType> {
        let e = self.must_get(interval)?;
        Ok(e.ty.point_type().cloned().unwrap_or_default())
    }

    /// Walk expression tree from given root.
    /// Children that are not present in arena are skipped.
    pub fn walk<'a, V: ExprVisitor<'a>>(
        &'a self,
        root: ExprID,
        visitor: &mut V,
    ) -> ControlFlow<V::Break, V::Cont> {
        let e = match self.get(root) {
            Some(e) => e,
            None => return ControlFlow::Continue(V::Cont::default()),
        };
        let mut eff = visitor.enter(root, e)?;
        for c in e.args() {
            eff.merge(self.walk(c, visitor)?)
        }
        eff.merge(visitor.leave(root, e)?);
        ControlFlow::Continue(eff)
    }

    /// Returns whether the tree of given root contains a reference
    /// to any alias.
    #[inline]
    pub fn refers_alias(&self, root: ExprID) -> bool {
        struct FindAlias;
        impl<'a> ExprVisitor<'a> for FindAlias {
            type Cont = ();
            type Break = ();
            #[inline]
            fn enter(&mut self, _id: ExprID, e: &'a Expr) -> ControlFlow<()> {
                match &e.kind {
                    ExprKind::AliasRef(_) => ControlFlow::Break(()),
                    ExprKind::Property(p) | ExprKind::Search(p) if p.scope.is_some() => {
                        ControlFlow::Break(())
                    }
                    _ => ControlFlow::Continue(()),
                }
            }
        }
        self.walk(root, &mut FindAlias).is_break()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pred::PredFuncKind;
    use elmreq_datatype::{ClassName, Const};

    #[test]
    fn test_arena_insert_and_get() {
        let mut arena = ExprArena::new();
        assert!(arena.is_empty());
        let id = arena.insert(Expr::literal(Const::Integer(1)));
        assert_eq!(1, arena.len());
        assert_eq!(ElmType::Integer, arena.must_get(id).unwrap().ty);
        let missing = ExprID::from(42);
        assert!(arena.get(missing).is_none());
        assert!(matches!(
            arena.must_get(missing),
            Err(Error::ExprNotFound(e)) if e == missing
        ));
        assert!(matches!(arena.must_retrieve(id), Err(Error::NotRetrieve(_))));
        assert!(matches!(arena.must_query(id), Err(Error::NotQuery(_))));
    }

    #[test]
    fn test_copy_expr_is_detached() {
        let mut arena = ExprArena::new();
        let r = Retrieve::new(ClassName::new("FHIR", "Observation"));
        let orig = arena.insert(Expr::retrieve(r).with_locator("3:1-3:20"));
        let copy = arena.copy_expr(orig).unwrap();
        assert_ne!(orig, copy);
        assert_eq!(arena.must_get(orig).unwrap(), arena.must_get(copy).unwrap());
        arena.must_retrieve_mut(copy).unwrap().template_id = Some("obs".into());
        assert!(arena.must_retrieve(orig).unwrap().template_id.is_none());
        assert_eq!(
            Some("3:1-3:20"),
            arena.must_get(copy).unwrap().meta.locator.as_deref()
        );
    }

    #[test]
    fn test_add_interval_derives_type() {
        let mut arena = ExprArena::new();
        let d = arena.insert(Expr::literal(Const::parse_date("2020-01-01").unwrap()));
        let itv = arena.add_interval(None, true, Some(d), false).unwrap();
        assert_eq!(
            ElmType::interval(ElmType::Date),
            arena.must_get(itv).unwrap().ty
        );
        let start = arena.add_start(itv).unwrap();
        let end = arena.add_end(itv).unwrap();
        assert_eq!(ElmType::Date, arena.must_get(start).unwrap().ty);
        assert_eq!(ElmType::Date, arena.must_get(end).unwrap().ty);
        let empty = arena.add_interval(None, true, None, true).unwrap();
        assert_eq!(
            ElmType::interval(ElmType::Any),
            arena.must_get(empty).unwrap().ty
        );
        assert!(arena.add_start(ExprID::from(99)).is_err());
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    struct NodeCount(usize);

    impl Effect for NodeCount {
        fn merge(&mut self, other: Self) {
            self.0 += other.0
        }
    }

    #[test]
    fn test_walk_counts_nodes() {
        struct Count;
        impl<'a> ExprVisitor<'a> for Count {
            type Cont = NodeCount;
            type Break = ();
            fn enter(&mut self, _id: ExprID, _e: &'a Expr) -> ControlFlow<(), NodeCount> {
                ControlFlow::Continue(NodeCount(1))
            }
        }
        let mut arena = ExprArena::new();
        let p = arena.insert(Expr::property("O", "status", ElmType::String));
        let v = arena.insert(Expr::literal(Const::string("final")));
        let eq = arena.insert(Expr::pred_func(PredFuncKind::Equal, &[p, v]));
        let dangling = ExprID::from(100);
        let conj = arena.insert(Expr::pred_conj(vec![eq, dangling]));
        assert_eq!(ControlFlow::Continue(NodeCount(4)), arena.walk(conj, &mut Count));
        assert!(arena.refers_alias(conj));
        assert!(!arena.refers_alias(v));
    }
}
