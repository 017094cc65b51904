use crate::expr::ExprID;
use bitflags::bitflags;
use elmreq_datatype::ClassName;
use smallvec::SmallVec;
use smol_str::SmolStr;
use std::fmt;

/// Retrieve fetches data of one class from the data source.
///
/// Literal filters come from the compiler (`codes`, `date_range` and their
/// property/search paths). Clauses in `code_filters` and `date_filters` are
/// appended by requirement lowering and never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retrieve {
    /// Absent only on retrieves synthesized for non-retrieve expressions.
    pub data_type: Option<ClassName>,
    pub template_id: Option<SmolStr>,
    pub codes: Option<ExprID>,
    pub code_property: Option<SmolStr>,
    pub code_search: Option<SmolStr>,
    pub code_comparator: Option<CodeComparator>,
    pub id_property: Option<SmolStr>,
    pub id_search: Option<SmolStr>,
    pub date_range: Option<ExprID>,
    pub date_property: Option<SmolStr>,
    pub date_search: Option<SmolStr>,
    pub date_low_property: Option<SmolStr>,
    pub date_high_property: Option<SmolStr>,
    pub code_filters: Vec<CodeFilter>,
    pub date_filters: Vec<DateFilter>,
}

impl Retrieve {
    #[inline]
    pub fn new(data_type: ClassName) -> Self {
        Retrieve {
            data_type: Some(data_type),
            ..Default::default()
        }
    }

    /// Retrieve without data type and filters.
    #[inline]
    pub fn unfiltered() -> Self {
        Retrieve::default()
    }

    #[inline]
    pub fn with_template_id(mut self, template_id: &str) -> Self {
        self.template_id = Some(SmolStr::new(template_id));
        self
    }

    /// Set literal code filter, e.g. `[Observation: code in "DiabetesCodes"]`.
    #[inline]
    pub fn with_codes(mut self, codes: ExprID, path: FilterPath, cmp: CodeComparator) -> Self {
        self.codes = Some(codes);
        match path {
            FilterPath::Property(p) => self.code_property = Some(p),
            FilterPath::Search(p) => self.code_search = Some(p),
        }
        self.code_comparator = Some(cmp);
        self
    }

    #[inline]
    pub fn with_date_range(mut self, date_range: ExprID, path: FilterPath) -> Self {
        self.date_range = Some(date_range);
        match path {
            FilterPath::Property(p) => self.date_property = Some(p),
            FilterPath::Search(p) => self.date_search = Some(p),
        }
        self
    }

    #[inline]
    pub fn with_id(mut self, path: FilterPath) -> Self {
        match path {
            FilterPath::Property(p) => self.id_property = Some(p),
            FilterPath::Search(p) => self.id_search = Some(p),
        }
        self
    }

    #[inline]
    pub fn push_filter(&mut self, filter: FilterClause) {
        match filter {
            FilterClause::Code(f) => self.code_filters.push(f),
            FilterClause::Date(f) => self.date_filters.push(f),
        }
    }

    #[inline]
    pub fn has_filters(&self) -> bool {
        !self.code_filters.is_empty() || !self.date_filters.is_empty()
    }

    /// Iterate all appended filter clauses, code filters first.
    #[inline]
    pub fn filters(&self) -> impl Iterator<Item = FilterRef<'_>> {
        self.code_filters
            .iter()
            .map(FilterRef::Code)
            .chain(self.date_filters.iter().map(FilterRef::Date))
    }

    /// Classify which literal filters the compiler already put on this retrieve.
    #[inline]
    pub fn stated_filters(&self) -> StatedFilter {
        let mut res = StatedFilter::empty();
        if self.id_property.is_some() || self.id_search.is_some() {
            res |= StatedFilter::ID;
        }
        if self.code_property.is_some() || self.code_search.is_some() {
            res |= StatedFilter::CODE;
        }
        if self.date_property.is_some()
            || self.date_search.is_some()
            || self.date_low_property.is_some()
            || self.date_high_property.is_some()
        {
            res |= StatedFilter::DATE;
        }
        res
    }

    /// Child expressions referred by this retrieve.
    #[inline]
    pub fn args(&self) -> SmallVec<[ExprID; 2]> {
        let mut res: SmallVec<[ExprID; 2]> = self.codes.into_iter().chain(self.date_range).collect();
        for f in &self.code_filters {
            res.push(f.value);
        }
        for f in &self.date_filters {
            res.push(f.value);
        }
        res
    }
}

bitflags! {
    pub struct StatedFilter: u8 {
        const ID = 0x01;
        const CODE = 0x02;
        const DATE = 0x04;
    }
}

/// Path of a filter, either a model property or a search parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterPath {
    Property(SmolStr),
    Search(SmolStr),
}

impl FilterPath {
    #[inline]
    pub fn path(&self) -> &str {
        match self {
            FilterPath::Property(p) | FilterPath::Search(p) => p.as_str(),
        }
    }

    #[inline]
    pub fn is_search(&self) -> bool {
        matches!(self, FilterPath::Search(_))
    }
}

impl fmt::Display for FilterPath {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterPath::Property(p) => write!(f, "property={}", p),
            FilterPath::Search(p) => write!(f, "search={}", p),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeComparator {
    Equal,
    Equivalent,
    In,
}

impl CodeComparator {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeComparator::Equal => "=",
            CodeComparator::Equivalent => "~",
            CodeComparator::In => "in",
        }
    }
}

impl fmt::Display for CodeComparator {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodeFilter {
    pub path: FilterPath,
    pub comparator: CodeComparator,
    pub value: ExprID,
}

/// Value of date filter is always an interval expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateFilter {
    pub path: FilterPath,
    pub value: ExprID,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterClause {
    Code(CodeFilter),
    Date(DateFilter),
}

impl FilterClause {
    #[inline]
    pub fn path(&self) -> &FilterPath {
        match self {
            FilterClause::Code(f) => &f.path,
            FilterClause::Date(f) => &f.path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRef<'a> {
    Code(&'a CodeFilter),
    Date(&'a DateFilter),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation() -> ClassName {
        ClassName::new("FHIR", "Observation")
    }

    #[test]
    fn test_stated_filters() {
        let r = Retrieve::new(observation());
        assert!(r.stated_filters().is_empty());
        let r = Retrieve::new(observation()).with_codes(
            ExprID::from(0),
            FilterPath::Property(SmolStr::new("code")),
            CodeComparator::In,
        );
        assert_eq!(StatedFilter::CODE, r.stated_filters());
        let mut r = r.with_id(FilterPath::Search(SmolStr::new("_id")));
        r.date_low_property = Some(SmolStr::new("effective.start"));
        assert_eq!(StatedFilter::all(), r.stated_filters());
    }

    #[test]
    fn test_push_filter() {
        let mut r = Retrieve::new(observation());
        assert!(!r.has_filters());
        r.push_filter(FilterClause::Code(CodeFilter {
            path: FilterPath::Property(SmolStr::new("code")),
            comparator: CodeComparator::Equivalent,
            value: ExprID::from(3),
        }));
        r.push_filter(FilterClause::Date(DateFilter {
            path: FilterPath::Search(SmolStr::new("date")),
            value: ExprID::from(4),
        }));
        assert!(r.has_filters());
        assert_eq!(1, r.code_filters.len());
        assert_eq!(1, r.date_filters.len());
        assert_eq!("~", r.code_filters[0].comparator.as_str());
        assert!(r.date_filters[0].path.is_search());
        assert_eq!(2, r.filters().count());
        assert_eq!(&[ExprID::from(3), ExprID::from(4)][..], &r.args()[..]);
    }
}
