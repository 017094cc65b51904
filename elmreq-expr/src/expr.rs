use crate::controlflow::ControlFlow;
use crate::pred::{Pred, PredFunc, PredFuncKind};
use crate::retrieve::Retrieve;
use elmreq_datatype::{Const, ElmType, Typed};
use smallvec::{smallvec, SmallVec};
use smol_str::SmolStr;
use std::fmt;

/// ExprID wraps u32 to be the index of expression in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprID(u32);

impl ExprID {
    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ExprID {
    fn from(src: u32) -> Self {
        ExprID(src)
    }
}

impl fmt::Display for ExprID {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Expr is a node of compiled expression tree.
/// Its children are referred by id, and owned by the arena.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: ElmType,
    pub meta: ExprMeta,
}

/// Positional and declared-type information from the compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExprMeta {
    pub local_id: Option<SmolStr>,
    /// Source location, e.g. "12:5-14:30".
    pub locator: Option<SmolStr>,
    /// Declared result type name, e.g. "{http://hl7.org/fhir}Observation".
    pub result_type_name: Option<SmolStr>,
}

impl Expr {
    #[inline]
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            kind,
            ty: ElmType::Unknown,
            meta: ExprMeta::default(),
        }
    }

    #[inline]
    pub fn typed(kind: ExprKind, ty: ElmType) -> Self {
        Expr {
            kind,
            ty,
            meta: ExprMeta::default(),
        }
    }

    #[inline]
    pub fn null() -> Self {
        Expr::typed(ExprKind::Null, ElmType::Any)
    }

    #[inline]
    pub fn literal(c: Const) -> Self {
        let ty = c.ty();
        Expr::typed(ExprKind::Literal(c), ty)
    }

    #[inline]
    pub fn value_set_ref(name: &str) -> Self {
        Expr::typed(ExprKind::ValueSetRef(RefName::new(name)), ElmType::ValueSet)
    }

    #[inline]
    pub fn code_system_ref(name: &str) -> Self {
        Expr::typed(
            ExprKind::CodeSystemRef(RefName::new(name)),
            ElmType::CodeSystem,
        )
    }

    #[inline]
    pub fn expression_ref(name: &str, ty: ElmType) -> Self {
        Expr::typed(ExprKind::ExpressionRef(RefName::new(name)), ty)
    }

    #[inline]
    pub fn parameter_ref(name: &str, ty: ElmType) -> Self {
        Expr::typed(ExprKind::ParameterRef(RefName::new(name)), ty)
    }

    #[inline]
    pub fn alias_ref(alias: &str, ty: ElmType) -> Self {
        Expr::typed(ExprKind::AliasRef(SmolStr::new(alias)), ty)
    }

    /// Property of an alias, e.g. "O.code".
    #[inline]
    pub fn property(scope: &str, path: &str, ty: ElmType) -> Self {
        Expr::typed(ExprKind::Property(Property::scoped(scope, path)), ty)
    }

    /// Search parameter of an alias, e.g. "O.code" resolved as search "code".
    #[inline]
    pub fn search(scope: &str, path: &str, ty: ElmType) -> Self {
        Expr::typed(ExprKind::Search(Property::scoped(scope, path)), ty)
    }

    #[inline]
    pub fn pred_func(kind: PredFuncKind, args: &[ExprID]) -> Self {
        Expr::typed(
            ExprKind::Pred(Pred::Func(PredFunc {
                kind,
                args: SmallVec::from_slice(args),
            })),
            ElmType::Boolean,
        )
    }

    #[inline]
    pub fn pred_conj(args: Vec<ExprID>) -> Self {
        Expr::typed(ExprKind::Pred(Pred::Conj(args)), ElmType::Boolean)
    }

    #[inline]
    pub fn pred_disj(args: Vec<ExprID>) -> Self {
        Expr::typed(ExprKind::Pred(Pred::Disj(args)), ElmType::Boolean)
    }

    #[inline]
    pub fn pred_not(arg: ExprID) -> Self {
        Expr::typed(ExprKind::Pred(Pred::Not(arg)), ElmType::Boolean)
    }

    /// Cast given expression to specific type.
    #[inline]
    pub fn cast(arg: ExprID, ty: ElmType, implicit: bool) -> Self {
        Expr::typed(ExprKind::Cast { arg, implicit }, ty)
    }

    #[inline]
    pub fn function_ref(name: &str, args: Vec<ExprID>, ty: ElmType) -> Self {
        Expr::typed(
            ExprKind::FunctionRef {
                name: RefName::new(name),
                args,
            },
            ty,
        )
    }

    /// Retrieve returns list of its data type.
    #[inline]
    pub fn retrieve(retrieve: Retrieve) -> Self {
        let ty = retrieve
            .data_type
            .clone()
            .map(|cn| ElmType::list(ElmType::Class(cn)))
            .unwrap_or_default();
        Expr::typed(ExprKind::Retrieve(Box::new(retrieve)), ty)
    }

    #[inline]
    pub fn query(query: Query, ty: ElmType) -> Self {
        Expr::typed(ExprKind::Query(Box::new(query)), ty)
    }

    #[inline]
    pub fn with_locator(mut self, locator: &str) -> Self {
        self.meta.locator = Some(SmolStr::new(locator));
        self
    }

    #[inline]
    pub fn with_local_id(mut self, local_id: &str) -> Self {
        self.meta.local_id = Some(SmolStr::new(local_id));
        self
    }

    #[inline]
    pub fn with_result_type_name(mut self, name: &str) -> Self {
        self.meta.result_type_name = Some(SmolStr::new(name));
        self
    }

    #[inline]
    pub fn is_retrieve(&self) -> bool {
        matches!(self.kind, ExprKind::Retrieve(_))
    }

    #[inline]
    pub fn is_query(&self) -> bool {
        matches!(self.kind, ExprKind::Query(_))
    }

    /// Returns ids of child expressions.
    /// Many expressions have at most two children so we use SmallVec<[ExprID; 2]>.
    #[inline]
    pub fn args(&self) -> SmallVec<[ExprID; 2]> {
        match &self.kind {
            ExprKind::Null
            | ExprKind::Literal(_)
            | ExprKind::ValueSetRef(_)
            | ExprKind::CodeSystemRef(_)
            | ExprKind::ExpressionRef(_)
            | ExprKind::ParameterRef(_)
            | ExprKind::AliasRef(_) => smallvec![],
            ExprKind::Property(p) | ExprKind::Search(p) => p.source.into_iter().collect(),
            ExprKind::Pred(p) => match p {
                Pred::Conj(es) | Pred::Disj(es) => SmallVec::from_slice(es),
                Pred::Not(e) => smallvec![*e],
                Pred::Func(f) => f.args.clone(),
            },
            ExprKind::Interval(itv) => itv.low.into_iter().chain(itv.high).collect(),
            ExprKind::Start(e) | ExprKind::End(e) => smallvec![*e],
            ExprKind::Cast { arg, .. } => smallvec![*arg],
            ExprKind::FunctionRef { args, .. } | ExprKind::List(args) => {
                SmallVec::from_slice(args)
            }
            ExprKind::Retrieve(r) => r.args(),
            ExprKind::Query(q) => q
                .sources
                .iter()
                .map(|s| s.expr)
                .chain(q.where_clause)
                .chain(q.ret)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Null,
    Literal(Const),
    ValueSetRef(RefName),
    CodeSystemRef(RefName),
    ExpressionRef(RefName),
    ParameterRef(RefName),
    AliasRef(SmolStr),
    Property(Property),
    /// Property resolved to a search parameter of the data source.
    Search(Property),
    Pred(Pred),
    Interval(IntervalExpr),
    /// Start of interval.
    Start(ExprID),
    /// End of interval.
    End(ExprID),
    /// Target type is the type of the cast expression.
    Cast {
        arg: ExprID,
        implicit: bool,
    },
    FunctionRef {
        name: RefName,
        args: Vec<ExprID>,
    },
    List(Vec<ExprID>),
    Retrieve(Box<Retrieve>),
    Query(Box<Query>),
}

impl Default for ExprKind {
    fn default() -> Self {
        ExprKind::Null
    }
}

/// Reference to a named definition, optionally in another library.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefName {
    pub name: SmolStr,
    pub library_name: Option<SmolStr>,
}

impl RefName {
    #[inline]
    pub fn new(name: &str) -> Self {
        RefName {
            name: SmolStr::new(name),
            library_name: None,
        }
    }
}

impl fmt::Display for RefName {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(lib) = &self.library_name {
            write!(f, "{}.", lib)?;
        }
        write!(f, "\"{}\"", self.name)
    }
}

/// Property reference.
/// The property belongs to an alias if scope is set, or if the
/// source is an alias reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Property {
    pub path: SmolStr,
    pub scope: Option<SmolStr>,
    pub source: Option<ExprID>,
}

impl Property {
    #[inline]
    pub fn scoped(scope: &str, path: &str) -> Self {
        Property {
            path: SmolStr::new(path),
            scope: Some(SmolStr::new(scope)),
            source: None,
        }
    }

    #[inline]
    pub fn of_source(source: ExprID, path: &str) -> Self {
        Property {
            path: SmolStr::new(path),
            scope: None,
            source: Some(source),
        }
    }
}

/// Interval construction.
/// Absent bound means the interval is unbounded on that side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntervalExpr {
    pub low: Option<ExprID>,
    pub low_closed: bool,
    pub high: Option<ExprID>,
    pub high_closed: bool,
}

/// Query with aliased sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub sources: Vec<AliasedSource>,
    pub where_clause: Option<ExprID>,
    pub ret: Option<ExprID>,
}

impl Query {
    #[inline]
    pub fn new(sources: Vec<AliasedSource>) -> Self {
        Query {
            sources,
            where_clause: None,
            ret: None,
        }
    }

    #[inline]
    pub fn with_where(mut self, pred: ExprID) -> Self {
        self.where_clause = Some(pred);
        self
    }

    #[inline]
    pub fn with_return(mut self, ret: ExprID) -> Self {
        self.ret = Some(ret);
        self
    }

    #[inline]
    pub fn find_source(&self, alias: &str) -> Option<&AliasedSource> {
        self.sources.iter().find(|s| s.alias == alias)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasedSource {
    pub alias: SmolStr,
    pub expr: ExprID,
}

impl AliasedSource {
    #[inline]
    pub fn new(alias: &str, expr: ExprID) -> Self {
        AliasedSource {
            alias: SmolStr::new(alias),
            expr,
        }
    }
}

pub trait Effect: Default {
    fn merge(&mut self, other: Self);
}

impl Effect for () {
    #[inline]
    fn merge(&mut self, _other: Self) {}
}

pub trait ExprVisitor<'a>: Sized {
    type Cont: Effect;
    type Break;
    #[inline]
    fn enter(&mut self, _id: ExprID, _e: &'a Expr) -> ControlFlow<Self::Break, Self::Cont> {
        ControlFlow::Continue(Self::Cont::default())
    }

    #[inline]
    fn leave(&mut self, _id: ExprID, _e: &'a Expr) -> ControlFlow<Self::Break, Self::Cont> {
        ControlFlow::Continue(Self::Cont::default())
    }
}
