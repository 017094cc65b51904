use elmreq_catalog::{ElementPath, LibraryIdentifier};
use elmreq_expr::{ExprArena, ExprID, FilterPath, PredFuncKind};
use indexmap::IndexSet;
use smol_str::SmolStr;
use std::fmt;

use crate::error::Result;

/// ExpressionRequirement describes what is needed from the data
/// source to evaluate an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionRequirement {
    /// Plain expression, nothing known beyond the expression itself.
    Expr(ExprRequirement),
    Data(DataRequirement),
    Query(QueryRequirement),
    Condition(ConditionRequirement),
    Conjunctive(ConjunctiveRequirement),
}

impl ExpressionRequirement {
    #[inline]
    pub fn scope(&self) -> &LibraryIdentifier {
        match self {
            ExpressionRequirement::Expr(r) => &r.scope,
            ExpressionRequirement::Data(r) => &r.scope,
            ExpressionRequirement::Query(r) => &r.scope,
            ExpressionRequirement::Condition(r) => &r.scope,
            ExpressionRequirement::Conjunctive(r) => &r.scope,
        }
    }

    /// Returns the node this requirement describes.
    /// Only a conjunction created without anchor has none.
    #[inline]
    pub fn expr(&self) -> Option<ExprID> {
        match self {
            ExpressionRequirement::Expr(r) => Some(r.expr),
            ExpressionRequirement::Data(r) => Some(r.retrieve),
            ExpressionRequirement::Query(r) => Some(r.expr),
            ExpressionRequirement::Condition(r) => Some(r.expr),
            ExpressionRequirement::Conjunctive(r) => r.expr,
        }
    }
}

impl From<ExprRequirement> for ExpressionRequirement {
    #[inline]
    fn from(src: ExprRequirement) -> Self {
        ExpressionRequirement::Expr(src)
    }
}

impl From<DataRequirement> for ExpressionRequirement {
    #[inline]
    fn from(src: DataRequirement) -> Self {
        ExpressionRequirement::Data(src)
    }
}

impl From<QueryRequirement> for ExpressionRequirement {
    #[inline]
    fn from(src: QueryRequirement) -> Self {
        ExpressionRequirement::Query(src)
    }
}

impl From<ConditionRequirement> for ExpressionRequirement {
    #[inline]
    fn from(src: ConditionRequirement) -> Self {
        ExpressionRequirement::Condition(src)
    }
}

impl From<ConjunctiveRequirement> for ExpressionRequirement {
    #[inline]
    fn from(src: ConjunctiveRequirement) -> Self {
        ExpressionRequirement::Conjunctive(src)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprRequirement {
    pub scope: LibraryIdentifier,
    pub expr: ExprID,
}

impl ExprRequirement {
    #[inline]
    pub fn new(scope: LibraryIdentifier, expr: ExprID) -> Self {
        ExprRequirement { scope, expr }
    }
}

/// Identity of a referenced column: which alias, which path,
/// and whether it is a search parameter instead of a model property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyRef {
    pub scope: Option<SmolStr>,
    pub path: SmolStr,
    pub search: bool,
}

impl PropertyRef {
    #[inline]
    pub fn property(scope: &str, path: &str) -> Self {
        PropertyRef {
            scope: Some(SmolStr::new(scope)),
            path: SmolStr::new(path),
            search: false,
        }
    }

    #[inline]
    pub fn search(scope: &str, path: &str) -> Self {
        PropertyRef {
            scope: Some(SmolStr::new(scope)),
            path: SmolStr::new(path),
            search: true,
        }
    }

    #[inline]
    pub fn filter_path(&self) -> FilterPath {
        if self.search {
            FilterPath::Search(self.path.clone())
        } else {
            FilterPath::Property(self.path.clone())
        }
    }
}

impl fmt::Display for PropertyRef {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = &self.scope {
            write!(f, "{}.", scope)?;
        }
        f.write_str(&self.path)?;
        if self.search {
            f.write_str("(search)")?;
        }
        Ok(())
    }
}

/// Reference to a property or search parameter node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRequirement {
    pub scope: LibraryIdentifier,
    pub expr: ExprID,
    pub property: PropertyRef,
}

impl PropertyRequirement {
    #[inline]
    pub fn new(scope: LibraryIdentifier, expr: ExprID, property: PropertyRef) -> Self {
        PropertyRequirement {
            scope,
            expr,
            property,
        }
    }
}

/// A single comparison of a property against a comparand,
/// with the property always on the left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionRequirement {
    pub scope: LibraryIdentifier,
    /// The comparison node.
    pub expr: ExprID,
    pub op: PredFuncKind,
    pub property: PropertyRequirement,
    pub comparand: Box<ExpressionRequirement>,
}

impl ConditionRequirement {
    #[inline]
    pub fn new(
        scope: LibraryIdentifier,
        expr: ExprID,
        op: PredFuncKind,
        property: PropertyRequirement,
        comparand: ExpressionRequirement,
    ) -> Self {
        ConditionRequirement {
            scope,
            expr,
            op,
            property,
            comparand: Box::new(comparand),
        }
    }
}

/// AND-combination of requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConjunctiveRequirement {
    pub scope: LibraryIdentifier,
    pub expr: Option<ExprID>,
    operands: Vec<ExpressionRequirement>,
}

impl ConjunctiveRequirement {
    #[inline]
    pub fn new(scope: LibraryIdentifier, expr: ExprID) -> Self {
        ConjunctiveRequirement {
            scope,
            expr: Some(expr),
            operands: vec![],
        }
    }

    /// Empty conjunction without anchoring node, which is always true.
    #[inline]
    pub fn empty(scope: LibraryIdentifier) -> Self {
        ConjunctiveRequirement {
            scope,
            expr: None,
            operands: vec![],
        }
    }

    /// Add requirement to the conjunction.
    /// Operands of nested conjunction are spliced in.
    #[inline]
    pub fn combine(&mut self, req: ExpressionRequirement) {
        match req {
            ExpressionRequirement::Conjunctive(conj) => self.operands.extend(conj.operands),
            other => self.operands.push(other),
        }
    }

    #[inline]
    pub fn arguments(&self) -> &[ExpressionRequirement] {
        &self.operands
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.operands.len()
    }
}

/// DataRequirement wraps a retrieve and accumulates conditions
/// observed against the alias it is bound to.
///
/// Lowering methods live in `lower.rs`, inference in `infer.rs`.
#[derive(Debug, Clone)]
pub struct DataRequirement {
    pub scope: LibraryIdentifier,
    pub alias: Option<SmolStr>,
    pub retrieve: ExprID,
    /// Original retrieve this one is cloned from.
    /// Provenance only, not part of equality.
    pub inferred_from: Option<ExprID>,
    pub observed_properties: IndexSet<PropertyRef>,
    pub conditions: ConjunctiveRequirement,
}

impl PartialEq for DataRequirement {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.scope == other.scope
            && self.alias == other.alias
            && self.retrieve == other.retrieve
            && self.observed_properties == other.observed_properties
            && self.conditions == other.conditions
    }
}

impl Eq for DataRequirement {}

impl DataRequirement {
    #[inline]
    pub fn new(scope: LibraryIdentifier, retrieve: ExprID) -> Self {
        let conditions = ConjunctiveRequirement::empty(scope.clone());
        DataRequirement {
            scope,
            alias: None,
            retrieve,
            inferred_from: None,
            observed_properties: IndexSet::new(),
            conditions,
        }
    }

    #[inline]
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(SmolStr::new(alias));
        self
    }

    #[inline]
    pub fn is_inferred(&self) -> bool {
        self.inferred_from.is_some()
    }

    /// Record the column referred by given property.
    /// Returns false if it was already recorded.
    #[inline]
    pub fn report_property(&mut self, prop: &PropertyRequirement) -> bool {
        self.observed_properties.insert(prop.property.clone())
    }

    #[inline]
    pub fn add_condition(&mut self, cond: ConditionRequirement) {
        self.conditions.combine(ExpressionRequirement::Condition(cond))
    }

    /// Element paths of observed properties, resolved against the
    /// data type of the retrieve.
    /// Synthesized retrieves have no data type and thus no paths.
    #[inline]
    pub fn observed_element_paths(&self, arena: &ExprArena) -> Result<Vec<ElementPath>> {
        let retrieve = arena.must_retrieve(self.retrieve)?;
        let res = match &retrieve.data_type {
            Some(cn) => self
                .observed_properties
                .iter()
                .map(|p| ElementPath::of_class(cn, &p.path))
                .collect(),
            None => vec![],
        };
        Ok(res)
    }
}

/// Requirements of all sources of a single query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequirement {
    pub scope: LibraryIdentifier,
    /// The query node.
    pub expr: ExprID,
    pub sources: Vec<DataRequirement>,
}

impl QueryRequirement {
    #[inline]
    pub fn new(scope: LibraryIdentifier, expr: ExprID) -> Self {
        QueryRequirement {
            scope,
            expr,
            sources: vec![],
        }
    }

    #[inline]
    pub fn add_source(&mut self, req: DataRequirement) {
        self.sources.push(req)
    }

    #[inline]
    pub fn source(&self, alias: &str) -> Option<&DataRequirement> {
        self.sources
            .iter()
            .find(|s| s.alias.as_deref() == Some(alias))
    }

    #[inline]
    pub fn source_mut(&mut self, alias: &str) -> Option<&mut DataRequirement> {
        self.sources
            .iter_mut()
            .find(|s| s.alias.as_deref() == Some(alias))
    }

    /// Returns the only source, None if there are zero or more than one.
    #[inline]
    pub fn single_source(&self) -> Option<&DataRequirement> {
        match self.sources.as_slice() {
            [single] => Some(single),
            _ => None,
        }
    }
}
