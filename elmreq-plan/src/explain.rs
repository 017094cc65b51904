use crate::req::{
    ConditionRequirement, ConjunctiveRequirement, DataRequirement, ExpressionRequirement,
    QueryRequirement,
};
use elmreq_expr::{
    CodeFilter, DateFilter, Expr, ExprArena, ExprID, ExprKind, Pred, Property, Retrieve,
};
use std::fmt::{self, Write};

#[derive(Debug, Clone, Default)]
pub struct ExplainConf {
    show_locator: bool,
    show_scope: bool,
}

impl ExplainConf {
    #[inline]
    pub fn show_locator(mut self, show_locator: bool) -> Self {
        self.show_locator = show_locator;
        self
    }

    #[inline]
    pub fn show_scope(mut self, show_scope: bool) -> Self {
        self.show_scope = show_scope;
        self
    }
}

/// Explain defines how to explain an expression, a filter
/// or a requirement.
/// Expressions are resolved through the arena.
pub trait Explain {
    fn explain<F: Write>(&self, arena: &ExprArena, f: &mut F, conf: &ExplainConf) -> fmt::Result;

    #[inline]
    fn explain_to_string(&self, arena: &ExprArena, conf: &ExplainConf) -> String {
        let mut s = String::new();
        let _ = self.explain(arena, &mut s, conf);
        s
    }
}

/* Implements Explain for all expressions */

impl Explain for ExprID {
    fn explain<F: Write>(&self, arena: &ExprArena, f: &mut F, conf: &ExplainConf) -> fmt::Result {
        match arena.get(*self) {
            Some(e) => e.explain(arena, f, conf),
            None => write!(f, "(missing {})", self),
        }
    }
}

impl Explain for Expr {
    fn explain<F: Write>(&self, arena: &ExprArena, f: &mut F, conf: &ExplainConf) -> fmt::Result {
        match &self.kind {
            ExprKind::Null => f.write_str("null")?,
            ExprKind::Literal(c) => write!(f, "{}", c)?,
            ExprKind::ValueSetRef(r) => write!(f, "valueset {}", r)?,
            ExprKind::CodeSystemRef(r) => write!(f, "codesystem {}", r)?,
            ExprKind::ExpressionRef(r) => write!(f, "expr {}", r)?,
            ExprKind::ParameterRef(r) => write!(f, "param {}", r)?,
            ExprKind::AliasRef(alias) => f.write_str(alias)?,
            ExprKind::Property(p) => write_property(f, p, arena, conf)?,
            ExprKind::Search(p) => {
                write_property(f, p, arena, conf)?;
                f.write_str("(search)")?
            }
            ExprKind::Pred(p) => p.explain(arena, f, conf)?,
            ExprKind::Interval(itv) => {
                f.write_str(if itv.low_closed { "Interval[" } else { "Interval(" })?;
                match itv.low {
                    Some(low) => low.explain(arena, f, conf)?,
                    None => f.write_str("null")?,
                }
                f.write_str(", ")?;
                match itv.high {
                    Some(high) => high.explain(arena, f, conf)?,
                    None => f.write_str("null")?,
                }
                f.write_char(if itv.high_closed { ']' } else { ')' })?
            }
            ExprKind::Start(e) => {
                f.write_str("start(")?;
                e.explain(arena, f, conf)?;
                f.write_char(')')?
            }
            ExprKind::End(e) => {
                f.write_str("end(")?;
                e.explain(arena, f, conf)?;
                f.write_char(')')?
            }
            ExprKind::Cast { arg, .. } => {
                f.write_str("cast(")?;
                arg.explain(arena, f, conf)?;
                write!(f, " as {})", self.ty.qualified_name())?
            }
            ExprKind::FunctionRef { name, args } => {
                write!(f, "{}(", name)?;
                write_refs(f, args, ", ", arena, conf)?;
                f.write_char(')')?
            }
            ExprKind::List(es) => {
                f.write_char('{')?;
                write_refs(f, es, ", ", arena, conf)?;
                f.write_char('}')?
            }
            ExprKind::Retrieve(r) => r.explain(arena, f, conf)?,
            ExprKind::Query(q) => {
                f.write_str("Query{sources=[")?;
                for (i, src) in q.sources.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?
                    }
                    write!(f, "{}: ", src.alias)?;
                    src.expr.explain(arena, f, conf)?
                }
                f.write_char(']')?;
                if let Some(pred) = q.where_clause {
                    f.write_str(", where=")?;
                    pred.explain(arena, f, conf)?
                }
                if let Some(ret) = q.ret {
                    f.write_str(", return=")?;
                    ret.explain(arena, f, conf)?
                }
                f.write_char('}')?
            }
        }
        if conf.show_locator {
            if let Some(locator) = &self.meta.locator {
                write!(f, "@{}", locator)?
            }
        }
        Ok(())
    }
}

fn write_property<F: Write>(
    f: &mut F,
    p: &Property,
    arena: &ExprArena,
    conf: &ExplainConf,
) -> fmt::Result {
    if let Some(scope) = &p.scope {
        write!(f, "{}.", scope)?
    } else if let Some(source) = p.source {
        source.explain(arena, f, conf)?;
        f.write_char('.')?
    }
    f.write_str(&p.path)
}

impl Explain for Pred {
    fn explain<F: Write>(&self, arena: &ExprArena, f: &mut F, conf: &ExplainConf) -> fmt::Result {
        match self {
            Pred::Conj(es) => write_refs(f, es, " and ", arena, conf),
            Pred::Disj(es) => {
                f.write_char('(')?;
                write_refs(f, es, " or ", arena, conf)?;
                f.write_char(')')
            }
            Pred::Not(e) => {
                f.write_str("not(")?;
                e.explain(arena, f, conf)?;
                f.write_char(')')
            }
            Pred::Func(func) => {
                f.write_str(func.kind.to_lower())?;
                f.write_char('(')?;
                write_refs(f, &func.args, ", ", arena, conf)?;
                f.write_char(')')
            }
        }
    }
}

impl Explain for Retrieve {
    fn explain<F: Write>(&self, arena: &ExprArena, f: &mut F, conf: &ExplainConf) -> fmt::Result {
        f.write_str("Retrieve{")?;
        match &self.data_type {
            Some(dt) => write!(f, "type={}", dt)?,
            None => f.write_str("type=?")?,
        }
        if let Some(codes) = self.codes {
            f.write_str(", codes=")?;
            codes.explain(arena, f, conf)?
        }
        if let Some(date_range) = self.date_range {
            f.write_str(", dateRange=")?;
            date_range.explain(arena, f, conf)?
        }
        if !self.code_filters.is_empty() {
            f.write_str(", codeFilter=[")?;
            write_refs(f, &self.code_filters, ", ", arena, conf)?;
            f.write_char(']')?
        }
        if !self.date_filters.is_empty() {
            f.write_str(", dateFilter=[")?;
            write_refs(f, &self.date_filters, ", ", arena, conf)?;
            f.write_char(']')?
        }
        f.write_char('}')
    }
}

impl Explain for CodeFilter {
    fn explain<F: Write>(&self, arena: &ExprArena, f: &mut F, conf: &ExplainConf) -> fmt::Result {
        write!(f, "{} {} ", self.path.path(), self.comparator)?;
        self.value.explain(arena, f, conf)
    }
}

impl Explain for DateFilter {
    fn explain<F: Write>(&self, arena: &ExprArena, f: &mut F, conf: &ExplainConf) -> fmt::Result {
        write!(f, "{} during ", self.path.path())?;
        self.value.explain(arena, f, conf)
    }
}

/* Implements Explain for all requirements */

impl Explain for ExpressionRequirement {
    fn explain<F: Write>(&self, arena: &ExprArena, f: &mut F, conf: &ExplainConf) -> fmt::Result {
        match self {
            ExpressionRequirement::Expr(r) => {
                write_scope(f, self, conf)?;
                r.expr.explain(arena, f, conf)
            }
            ExpressionRequirement::Data(r) => r.explain(arena, f, conf),
            ExpressionRequirement::Query(r) => r.explain(arena, f, conf),
            ExpressionRequirement::Condition(r) => r.explain(arena, f, conf),
            ExpressionRequirement::Conjunctive(r) => r.explain(arena, f, conf),
        }
    }
}

impl Explain for ConditionRequirement {
    fn explain<F: Write>(&self, arena: &ExprArena, f: &mut F, conf: &ExplainConf) -> fmt::Result {
        write!(f, "{}({}, ", self.op.to_lower(), self.property.property)?;
        match self.comparand.expr() {
            Some(e) => e.explain(arena, f, conf)?,
            None => f.write_str("true")?,
        }
        f.write_char(')')
    }
}

impl Explain for ConjunctiveRequirement {
    fn explain<F: Write>(&self, arena: &ExprArena, f: &mut F, conf: &ExplainConf) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("true");
        }
        write_refs(f, self.arguments(), " and ", arena, conf)
    }
}

impl Explain for DataRequirement {
    fn explain<F: Write>(&self, arena: &ExprArena, f: &mut F, conf: &ExplainConf) -> fmt::Result {
        if conf.show_scope {
            write!(f, "{}:", self.scope)?
        }
        f.write_str("Data{")?;
        if let Some(alias) = &self.alias {
            write!(f, "alias={}, ", alias)?
        }
        self.retrieve.explain(arena, f, conf)?;
        if let Some(orig) = self.inferred_from {
            write!(f, ", inferredFrom={}", orig)?
        }
        if !self.observed_properties.is_empty() {
            f.write_str(", properties=[")?;
            for (i, p) in self.observed_properties.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?
                }
                write!(f, "{}", p)?
            }
            f.write_char(']')?
        }
        if !self.conditions.is_empty() {
            f.write_str(", conditions=")?;
            self.conditions.explain(arena, f, conf)?
        }
        f.write_char('}')
    }
}

impl Explain for QueryRequirement {
    fn explain<F: Write>(&self, arena: &ExprArena, f: &mut F, conf: &ExplainConf) -> fmt::Result {
        if conf.show_scope {
            write!(f, "{}:", self.scope)?
        }
        f.write_str("Query{")?;
        write_refs(f, &self.sources, ", ", arena, conf)?;
        f.write_char('}')
    }
}

#[inline]
fn write_scope<F: Write>(f: &mut F, req: &ExpressionRequirement, conf: &ExplainConf) -> fmt::Result {
    if conf.show_scope {
        write!(f, "{}:", req.scope())?
    }
    Ok(())
}

fn write_refs<'i, F, E, I>(
    f: &mut F,
    exprs: I,
    delimiter: &str,
    arena: &ExprArena,
    conf: &ExplainConf,
) -> fmt::Result
where
    F: Write,
    E: Explain + 'i,
    I: IntoIterator<Item = &'i E>,
{
    let mut exprs = exprs.into_iter();
    if let Some(head) = exprs.next() {
        head.explain(arena, f, conf)?
    }
    for e in exprs {
        f.write_str(delimiter)?;
        e.explain(arena, f, conf)?
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::req::PropertyRef;
    use elmreq_catalog::LibraryIdentifier;
    use elmreq_datatype::{ClassName, Const, ElmType};
    use elmreq_expr::{CodeComparator, FilterClause, FilterPath, PredFuncKind};

    #[test]
    fn test_explain_retrieve_with_filters() {
        let mut arena = ExprArena::new();
        let vs = arena.insert(Expr::value_set_ref("DiabetesCodes"));
        let low = arena.insert(Expr::literal(Const::parse_date("2020-01-01").unwrap()));
        let high = arena.insert(Expr::literal(Const::parse_date("2020-12-31").unwrap()));
        let itv = arena.add_interval(Some(low), true, Some(high), false).unwrap();
        let mut r = Retrieve::new(ClassName::new("FHIR", "Observation"));
        r.push_filter(FilterClause::Code(CodeFilter {
            path: FilterPath::Property("code".into()),
            comparator: CodeComparator::In,
            value: vs,
        }));
        r.push_filter(FilterClause::Date(DateFilter {
            path: FilterPath::Search("date".into()),
            value: itv,
        }));
        let id = arena.insert(Expr::retrieve(r).with_locator("1:1-1:10"));
        let s = id.explain_to_string(&arena, &ExplainConf::default());
        assert_eq!(
            "Retrieve{type=FHIR.Observation, codeFilter=[code in valueset \"DiabetesCodes\"], dateFilter=[date during Interval[@2020-01-01, @2020-12-31)]}",
            s
        );
        let s = id.explain_to_string(&arena, &ExplainConf::default().show_locator(true));
        assert!(s.ends_with("}@1:1-1:10"));
    }

    #[test]
    fn test_explain_requirement() {
        let mut arena = ExprArena::new();
        let r = arena.insert(Expr::retrieve(Retrieve::new(ClassName::new(
            "FHIR",
            "Observation",
        ))));
        let p = arena.insert(Expr::property("O", "status", ElmType::String));
        let v = arena.insert(Expr::literal(Const::string("final")));
        let cmp = arena.insert(Expr::pred_func(PredFuncKind::Equal, &[p, v]));
        let scope = LibraryIdentifier::new("Test", Some("1.0.0"));
        let mut dr = DataRequirement::new(scope.clone(), r).with_alias("O");
        let cond = ConditionRequirement::new(
            scope.clone(),
            cmp,
            PredFuncKind::Equal,
            crate::req::PropertyRequirement::new(
                scope.clone(),
                p,
                PropertyRef::property("O", "status"),
            ),
            crate::req::ExprRequirement::new(scope, v).into(),
        );
        dr.report_property(&cond.property);
        dr.add_condition(cond);
        let s = dr.explain_to_string(&arena, &ExplainConf::default());
        assert_eq!(
            "Data{alias=O, Retrieve{type=FHIR.Observation}, properties=[O.status], conditions=equal(O.status, 'final')}",
            s
        );
        let s = dr.explain_to_string(&arena, &ExplainConf::default().show_scope(true));
        assert!(s.starts_with("Test|1.0.0:Data{"));
        let s = cmp.explain_to_string(&arena, &ExplainConf::default());
        assert_eq!("equal(O.status, 'final')", s);
        let missing = ExprID::from(99).explain_to_string(&arena, &ExplainConf::default());
        assert_eq!("(missing e99)", missing);
    }
}
