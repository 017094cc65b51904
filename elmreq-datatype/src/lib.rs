pub mod konst;

pub use konst::*;

pub use time::format_description::{self, BorrowedFormatItem};
pub use time::PrimitiveDateTime as Datetime;
pub use time::{error::Parse as DatetimeParseError, Date};

use smol_str::SmolStr;
use static_init::dynamic;
use std::borrow::Cow;
use std::fmt;

/// ElmType is the result type attached to every node of the
/// compiled expression tree.
///
/// The upstream compiler resolves types of all expressions.
/// `Unknown` remains only when a type could not be resolved,
/// and every classification treats it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElmType {
    Unknown,
    Any,
    Boolean,
    Integer,
    Long,
    Decimal,
    String,
    Date,
    DateTime,
    Time,
    Quantity,
    // terminology types
    Code,
    Concept,
    ValueSet,
    CodeSystem,
    Vocabulary,
    /// Interval of given point type.
    Interval(Box<ElmType>),
    /// List of given element type.
    List(Box<ElmType>),
    Tuple(Vec<(SmolStr, ElmType)>),
    Choice(Vec<ElmType>),
    /// Class type declared by a data model, e.g. FHIR.Observation.
    Class(ClassName),
}

impl Default for ElmType {
    fn default() -> Self {
        ElmType::Unknown
    }
}

impl ElmType {
    #[inline]
    pub fn interval(point: ElmType) -> Self {
        ElmType::Interval(Box::new(point))
    }

    #[inline]
    pub fn list(elem: ElmType) -> Self {
        ElmType::List(Box::new(elem))
    }

    #[inline]
    pub fn class(model: &str, name: &str) -> Self {
        ElmType::Class(ClassName::new(model, name))
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, ElmType::Unknown)
    }

    #[inline]
    pub fn is_interval(&self) -> bool {
        matches!(self, ElmType::Interval(_))
    }

    #[inline]
    pub fn is_list(&self) -> bool {
        matches!(self, ElmType::List(_))
    }

    /// Returns point type if this is an interval type.
    #[inline]
    pub fn point_type(&self) -> Option<&ElmType> {
        match self {
            ElmType::Interval(p) => Some(p),
            _ => None,
        }
    }

    /// Returns element type if this is a list type.
    #[inline]
    pub fn element_type(&self) -> Option<&ElmType> {
        match self {
            ElmType::List(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn qualified_name(&self) -> Cow<'_, str> {
        match self {
            ElmType::Unknown => Cow::Borrowed("Unknown"),
            ElmType::Any => Cow::Borrowed("System.Any"),
            ElmType::Boolean => Cow::Borrowed("System.Boolean"),
            ElmType::Integer => Cow::Borrowed("System.Integer"),
            ElmType::Long => Cow::Borrowed("System.Long"),
            ElmType::Decimal => Cow::Borrowed("System.Decimal"),
            ElmType::String => Cow::Borrowed("System.String"),
            ElmType::Date => Cow::Borrowed("System.Date"),
            ElmType::DateTime => Cow::Borrowed("System.DateTime"),
            ElmType::Time => Cow::Borrowed("System.Time"),
            ElmType::Quantity => Cow::Borrowed("System.Quantity"),
            ElmType::Code => Cow::Borrowed("System.Code"),
            ElmType::Concept => Cow::Borrowed("System.Concept"),
            ElmType::ValueSet => Cow::Borrowed("System.ValueSet"),
            ElmType::CodeSystem => Cow::Borrowed("System.CodeSystem"),
            ElmType::Vocabulary => Cow::Borrowed("System.Vocabulary"),
            ElmType::Interval(p) => Cow::Owned(format!("Interval<{}>", p.qualified_name())),
            ElmType::List(e) => Cow::Owned(format!("List<{}>", e.qualified_name())),
            ElmType::Tuple(elems) => {
                let elems: Vec<String> = elems
                    .iter()
                    .map(|(name, ty)| format!("{} {}", name, ty.qualified_name()))
                    .collect();
                Cow::Owned(format!("Tuple{{{}}}", elems.join(", ")))
            }
            ElmType::Choice(tys) => {
                let tys: Vec<Cow<'_, str>> = tys.iter().map(|t| t.qualified_name()).collect();
                Cow::Owned(format!("Choice<{}>", tys.join(", ")))
            }
            ElmType::Class(cn) => Cow::Owned(cn.to_string()),
        }
    }
}

impl fmt::Display for ElmType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// Model-qualified class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassName {
    pub model: SmolStr,
    pub name: SmolStr,
}

impl ClassName {
    #[inline]
    pub fn new(model: &str, name: &str) -> Self {
        ClassName {
            model: SmolStr::new(model),
            name: SmolStr::new(name),
        }
    }
}

impl fmt::Display for ClassName {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.model, self.name)
    }
}

pub trait Typed {
    /// Returns result type
    fn ty(&self) -> ElmType;
}

#[dynamic]
pub static DEFAULT_DATE_FORMAT: Vec<BorrowedFormatItem<'static>> =
    format_description::parse("[year]-[month]-[day]").unwrap();

#[dynamic]
pub static DEFAULT_DATETIME_FORMAT: Vec<BorrowedFormatItem<'static>> =
    format_description::parse("[year]-[month]-[day]T[hour]:[minute]:[second]").unwrap();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name() {
        assert_eq!("System.DateTime", ElmType::DateTime.qualified_name());
        assert_eq!(
            "Interval<System.Date>",
            ElmType::interval(ElmType::Date).qualified_name()
        );
        assert_eq!(
            "List<FHIR.Observation>",
            ElmType::list(ElmType::class("FHIR", "Observation")).to_string()
        );
        assert_eq!(
            "Choice<System.Date, System.DateTime>",
            ElmType::Choice(vec![ElmType::Date, ElmType::DateTime]).to_string()
        );
    }

    #[test]
    fn test_point_and_element_type() {
        let ty = ElmType::interval(ElmType::DateTime);
        assert_eq!(Some(&ElmType::DateTime), ty.point_type());
        assert!(ty.element_type().is_none());
        let ty = ElmType::list(ElmType::Code);
        assert_eq!(Some(&ElmType::Code), ty.element_type());
        assert!(ElmType::default().is_unknown());
    }
}
