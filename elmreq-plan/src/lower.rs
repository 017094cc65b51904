use crate::context::RequirementsContext;
use crate::error::Result;
use crate::req::{ConditionRequirement, DataRequirement, ExpressionRequirement};
use bitflags::bitflags;
use elmreq_expr::{
    CodeComparator, CodeFilter, DateFilter, ExprArena, ExprID, FilterClause, PredFuncKind,
    StatedFilter,
};
use log::{debug, trace};

bitflags! {
    /// Kinds of filter clauses appended by lowering.
    pub struct LowerEffect: u8 {
        const CODE_FILTER = 0x01;
        const DATE_FILTER = 0x02;
    }
}

impl Default for LowerEffect {
    #[inline]
    fn default() -> Self {
        LowerEffect::empty()
    }
}

impl DataRequirement {
    /// Lower accumulated conditions into filter clauses on the retrieve.
    pub fn apply_data_requirements<C: RequirementsContext>(
        &self,
        arena: &mut ExprArena,
        ctx: &C,
    ) -> Result<LowerEffect> {
        self.extract_stated_requirements(arena)?;
        self.apply_to(self.retrieve, arena, ctx)
    }

    /// Literal filters on the retrieve are recognized but not merged
    /// with inferred ones. They are left untouched.
    fn extract_stated_requirements(&self, arena: &ExprArena) -> Result<()> {
        let stated = arena.must_retrieve(self.retrieve)?.stated_filters();
        if stated.contains(StatedFilter::ID) {
            debug!("retrieve {} has stated id filter, not merged", self.retrieve);
        }
        if stated.contains(StatedFilter::CODE) {
            debug!("retrieve {} has stated code filter, not merged", self.retrieve);
        }
        if stated.contains(StatedFilter::DATE) {
            debug!("retrieve {} has stated date filter, not merged", self.retrieve);
        }
        Ok(())
    }

    /// Apply every condition of this requirement to given retrieve.
    /// Operands other than conditions are skipped.
    pub fn apply_to<C: RequirementsContext>(
        &self,
        retrieve: ExprID,
        arena: &mut ExprArena,
        ctx: &C,
    ) -> Result<LowerEffect> {
        let mut eff = LowerEffect::empty();
        for req in self.conditions.arguments() {
            match req {
                ExpressionRequirement::Condition(cond) => {
                    eff |= self.apply_condition_requirement_to(cond, retrieve, arena, ctx)?
                }
                other => trace!("skip non-condition requirement {:?}", other.expr()),
            }
        }
        Ok(eff)
    }

    /// Classify comparand type of the condition and lower it to a
    /// code filter or a date filter.
    pub fn apply_condition_requirement_to<C: RequirementsContext>(
        &self,
        cond: &ConditionRequirement,
        retrieve: ExprID,
        arena: &mut ExprArena,
        ctx: &C,
    ) -> Result<LowerEffect> {
        // retrieve must exist even if nothing is lowered.
        arena.must_retrieve(retrieve)?;
        let comparand = match cond.comparand.expr() {
            Some(id) => id,
            None => {
                debug!("condition {} has no comparand node, not lowered", cond.expr);
                return Ok(LowerEffect::empty());
            }
        };
        // comparison type is preferred over property type, as the
        // property may be converted before comparison.
        let comparison_type = arena.must_get(comparand)?.ty.clone();
        if comparison_type.is_unknown() {
            debug!("condition {} has unresolved comparand type, not lowered", cond.expr);
            return Ok(LowerEffect::empty());
        }
        let path = cond.property.property.filter_path();
        if ctx.is_terminology_type(&comparison_type) {
            let comparator = match cond.op {
                PredFuncKind::Equal => CodeComparator::Equal,
                PredFuncKind::Equivalent => CodeComparator::Equivalent,
                PredFuncKind::In | PredFuncKind::InValueSet | PredFuncKind::AnyInValueSet => {
                    CodeComparator::In
                }
                op => {
                    debug!(
                        "condition {} with operator {} on terminology not lowered",
                        cond.expr,
                        op.to_lower()
                    );
                    return Ok(LowerEffect::empty());
                }
            };
            trace!(
                "append code filter {} {} {} to retrieve {}",
                path,
                comparator,
                comparand,
                retrieve
            );
            arena
                .must_retrieve_mut(retrieve)?
                .push_filter(FilterClause::Code(CodeFilter {
                    path,
                    comparator,
                    value: comparand,
                }));
            return Ok(LowerEffect::CODE_FILTER);
        }
        if ctx.is_date_type(&comparison_type) {
            let value = if ctx.is_interval_type(&comparison_type) {
                lower_interval_comparand(cond.op, comparand, arena)?
            } else {
                lower_scalar_comparand(cond.op, comparand, arena)?
            };
            return match value {
                Some(value) => {
                    trace!(
                        "append date filter {} {} to retrieve {}",
                        path,
                        value,
                        retrieve
                    );
                    arena
                        .must_retrieve_mut(retrieve)?
                        .push_filter(FilterClause::Date(DateFilter { path, value }));
                    Ok(LowerEffect::DATE_FILTER)
                }
                None => {
                    debug!(
                        "condition {} with operator {} on {} not lowered",
                        cond.expr,
                        cond.op.to_lower(),
                        comparison_type
                    );
                    Ok(LowerEffect::empty())
                }
            };
        }
        debug!(
            "condition {} on unclassified type {} not lowered",
            cond.expr, comparison_type
        );
        Ok(LowerEffect::empty())
    }
}

/// Build date range of an interval-valued comparand.
/// Returns None if the operator can not be expressed as a range.
#[inline]
fn lower_interval_comparand(
    op: PredFuncKind,
    comparand: ExprID,
    arena: &mut ExprArena,
) -> Result<Option<ExprID>> {
    let res = match op {
        PredFuncKind::Equal
        | PredFuncKind::Equivalent
        | PredFuncKind::SameAs
        | PredFuncKind::In
        | PredFuncKind::IncludedIn => comparand,
        PredFuncKind::Before | PredFuncKind::SameOrBefore => {
            let start = arena.add_start(comparand)?;
            let high_closed = op == PredFuncKind::SameOrBefore;
            arena.add_interval(None, true, Some(start), high_closed)?
        }
        PredFuncKind::After | PredFuncKind::SameOrAfter => {
            let end = arena.add_end(comparand)?;
            let low_closed = op == PredFuncKind::SameOrAfter;
            arena.add_interval(Some(end), low_closed, None, true)?
        }
        PredFuncKind::Includes
        | PredFuncKind::Meets
        | PredFuncKind::MeetsBefore
        | PredFuncKind::MeetsAfter
        | PredFuncKind::Overlaps
        | PredFuncKind::OverlapsBefore
        | PredFuncKind::OverlapsAfter
        | PredFuncKind::Starts
        | PredFuncKind::Ends => return Ok(None),
        PredFuncKind::NotEqual
        | PredFuncKind::Less
        | PredFuncKind::LessOrEqual
        | PredFuncKind::Greater
        | PredFuncKind::GreaterOrEqual
        | PredFuncKind::InValueSet
        | PredFuncKind::AnyInValueSet => return Ok(None),
    };
    Ok(Some(res))
}

/// Build date range of a single point comparand.
#[inline]
fn lower_scalar_comparand(
    op: PredFuncKind,
    comparand: ExprID,
    arena: &mut ExprArena,
) -> Result<Option<ExprID>> {
    let (low, low_closed, high, high_closed) = match op {
        PredFuncKind::Equal | PredFuncKind::Equivalent | PredFuncKind::SameAs => {
            (Some(comparand), true, Some(comparand), true)
        }
        PredFuncKind::Less | PredFuncKind::Before => (None, true, Some(comparand), false),
        PredFuncKind::LessOrEqual | PredFuncKind::SameOrBefore => {
            (None, true, Some(comparand), true)
        }
        PredFuncKind::Greater | PredFuncKind::After => (Some(comparand), false, None, true),
        PredFuncKind::GreaterOrEqual | PredFuncKind::SameOrAfter => {
            (Some(comparand), true, None, true)
        }
        _ => return Ok(None),
    };
    let itv = arena.add_interval(low, low_closed, high, high_closed)?;
    Ok(Some(itv))
}
