use crate::expr::ExprID;
use smallvec::SmallVec;

/// Predicate represents boolean expressions.
/// Only conjunctions can be decomposed into conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pred {
    Conj(Vec<ExprID>),
    Disj(Vec<ExprID>),
    Not(ExprID),
    Func(PredFunc),
}

/// Predicate function is a comparison between two operands.
/// Operator is fixed at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PredFunc {
    pub kind: PredFuncKind,
    pub args: SmallVec<[ExprID; 2]>,
}

impl PredFunc {
    /// Returns left and right operands of binary comparison.
    #[inline]
    pub fn binary(&self) -> Option<(ExprID, ExprID)> {
        match self.args.as_slice() {
            [lhs, rhs] => Some((*lhs, *rhs)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredFuncKind {
    // comparison
    Equal,
    Equivalent,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    // membership
    In,
    InValueSet,
    AnyInValueSet,
    // temporal
    SameAs,
    SameOrBefore,
    SameOrAfter,
    Before,
    After,
    // interval
    Includes,
    IncludedIn,
    Meets,
    MeetsBefore,
    MeetsAfter,
    Overlaps,
    OverlapsBefore,
    OverlapsAfter,
    Starts,
    Ends,
}

impl PredFuncKind {
    #[inline]
    pub fn to_lower(&self) -> &'static str {
        match self {
            PredFuncKind::Equal => "equal",
            PredFuncKind::Equivalent => "equivalent",
            PredFuncKind::NotEqual => "notequal",
            PredFuncKind::Less => "less",
            PredFuncKind::LessOrEqual => "lessorequal",
            PredFuncKind::Greater => "greater",
            PredFuncKind::GreaterOrEqual => "greaterorequal",
            PredFuncKind::In => "in",
            PredFuncKind::InValueSet => "invalueset",
            PredFuncKind::AnyInValueSet => "anyinvalueset",
            PredFuncKind::SameAs => "sameas",
            PredFuncKind::SameOrBefore => "sameorbefore",
            PredFuncKind::SameOrAfter => "sameorafter",
            PredFuncKind::Before => "before",
            PredFuncKind::After => "after",
            PredFuncKind::Includes => "includes",
            PredFuncKind::IncludedIn => "includedin",
            PredFuncKind::Meets => "meets",
            PredFuncKind::MeetsBefore => "meetsbefore",
            PredFuncKind::MeetsAfter => "meetsafter",
            PredFuncKind::Overlaps => "overlaps",
            PredFuncKind::OverlapsBefore => "overlapsbefore",
            PredFuncKind::OverlapsAfter => "overlapsafter",
            PredFuncKind::Starts => "starts",
            PredFuncKind::Ends => "ends",
        }
    }

    /// Returns the operator that gives same result with operands swapped.
    /// Membership and Starts/Ends have no such counterpart.
    #[inline]
    pub fn flip(&self) -> Option<Self> {
        let res = match self {
            PredFuncKind::Equal => PredFuncKind::Equal,
            PredFuncKind::Equivalent => PredFuncKind::Equivalent,
            PredFuncKind::NotEqual => PredFuncKind::NotEqual,
            PredFuncKind::Less => PredFuncKind::Greater,
            PredFuncKind::LessOrEqual => PredFuncKind::GreaterOrEqual,
            PredFuncKind::Greater => PredFuncKind::Less,
            PredFuncKind::GreaterOrEqual => PredFuncKind::LessOrEqual,
            PredFuncKind::SameAs => PredFuncKind::SameAs,
            PredFuncKind::SameOrBefore => PredFuncKind::SameOrAfter,
            PredFuncKind::SameOrAfter => PredFuncKind::SameOrBefore,
            PredFuncKind::Before => PredFuncKind::After,
            PredFuncKind::After => PredFuncKind::Before,
            PredFuncKind::Includes => PredFuncKind::IncludedIn,
            PredFuncKind::IncludedIn => PredFuncKind::Includes,
            PredFuncKind::Meets => PredFuncKind::Meets,
            PredFuncKind::MeetsBefore => PredFuncKind::MeetsAfter,
            PredFuncKind::MeetsAfter => PredFuncKind::MeetsBefore,
            PredFuncKind::Overlaps => PredFuncKind::Overlaps,
            PredFuncKind::OverlapsBefore => PredFuncKind::OverlapsAfter,
            PredFuncKind::OverlapsAfter => PredFuncKind::OverlapsBefore,
            PredFuncKind::In
            | PredFuncKind::InValueSet
            | PredFuncKind::AnyInValueSet
            | PredFuncKind::Starts
            | PredFuncKind::Ends => return None,
        };
        Some(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pred_func_flip() {
        for kind in [
            PredFuncKind::Less,
            PredFuncKind::LessOrEqual,
            PredFuncKind::Before,
            PredFuncKind::SameOrAfter,
            PredFuncKind::Includes,
            PredFuncKind::MeetsBefore,
            PredFuncKind::OverlapsAfter,
            PredFuncKind::Equal,
        ] {
            let flipped = kind.flip().unwrap();
            assert_eq!(Some(kind), flipped.flip());
        }
        assert_eq!(Some(PredFuncKind::After), PredFuncKind::Before.flip());
        assert!(PredFuncKind::InValueSet.flip().is_none());
        assert!(PredFuncKind::Starts.flip().is_none());
    }

    #[test]
    fn test_pred_func_binary() {
        let f = PredFunc {
            kind: PredFuncKind::Equal,
            args: SmallVec::from_slice(&[ExprID::from(1), ExprID::from(2)]),
        };
        assert_eq!(Some((ExprID::from(1), ExprID::from(2))), f.binary());
        let f = PredFunc {
            kind: PredFuncKind::Equal,
            args: SmallVec::from_slice(&[ExprID::from(1)]),
        };
        assert!(f.binary().is_none());
    }
}
