use crate::{Date, Datetime, DatetimeParseError, ElmType, Typed};
use crate::{DEFAULT_DATETIME_FORMAT, DEFAULT_DATE_FORMAT};
use smol_str::SmolStr;
use std::fmt;
use std::sync::Arc;

/// Literal values of the expression language.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Const {
    Null,
    Bool(bool),
    Integer(i32),
    Long(i64),
    /// Decimal is kept in its textual form, no arithmetic is
    /// performed on literals.
    Decimal(Arc<str>),
    String(Arc<str>),
    Date(Date),
    DateTime(Datetime),
    Code(Code),
}

impl Default for Const {
    fn default() -> Self {
        Const::Null
    }
}

impl Const {
    /// Parse date literal in format of "yyyy-MM-dd".
    #[inline]
    pub fn parse_date(s: &str) -> Result<Self, DatetimeParseError> {
        let dt = Date::parse(s, &DEFAULT_DATE_FORMAT[..])?;
        Ok(Const::Date(dt))
    }

    /// Parse datetime literal in format of "yyyy-MM-ddTHH:mm:ss".
    #[inline]
    pub fn parse_datetime(s: &str) -> Result<Self, DatetimeParseError> {
        let ts = Datetime::parse(s, &DEFAULT_DATETIME_FORMAT[..])?;
        Ok(Const::DateTime(ts))
    }

    #[inline]
    pub fn string(s: &str) -> Self {
        Const::String(Arc::from(s))
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Const::Null)
    }
}

impl Typed for Const {
    #[inline]
    fn ty(&self) -> ElmType {
        match self {
            Const::Null => ElmType::Any,
            Const::Bool(_) => ElmType::Boolean,
            Const::Integer(_) => ElmType::Integer,
            Const::Long(_) => ElmType::Long,
            Const::Decimal(_) => ElmType::Decimal,
            Const::String(_) => ElmType::String,
            Const::Date(_) => ElmType::Date,
            Const::DateTime(_) => ElmType::DateTime,
            Const::Code(_) => ElmType::Code,
        }
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Null => f.write_str("null"),
            Const::Bool(b) => write!(f, "{}", b),
            Const::Integer(i) => write!(f, "{}", i),
            Const::Long(l) => write!(f, "{}L", l),
            Const::Decimal(d) => f.write_str(d),
            Const::String(s) => write!(f, "'{}'", s),
            Const::Date(dt) => write_date(f, dt),
            Const::DateTime(ts) => {
                write_date(f, &ts.date())?;
                write!(
                    f,
                    "T{:02}:{:02}:{:02}",
                    ts.hour(),
                    ts.minute(),
                    ts.second()
                )
            }
            Const::Code(code) => fmt::Display::fmt(code, f),
        }
    }
}

#[inline]
fn write_date(f: &mut fmt::Formatter<'_>, dt: &Date) -> fmt::Result {
    write!(
        f,
        "@{:04}-{:02}-{:02}",
        dt.year(),
        dt.month() as u8,
        dt.day()
    )
}

/// Code literal, identified by code and code system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Code {
    pub code: SmolStr,
    pub system: Option<SmolStr>,
    pub display: Option<SmolStr>,
}

impl Code {
    #[inline]
    pub fn new(code: &str, system: &str) -> Self {
        Code {
            code: SmolStr::new(code),
            system: Some(SmolStr::new(system)),
            display: None,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code '{}'", self.code)?;
        if let Some(system) = &self.system {
            write!(f, " from \"{}\"", system)?;
        }
        if let Some(display) = &self.display {
            write!(f, " display '{}'", display)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_literal() {
        let c = Const::parse_date("2020-01-01").unwrap();
        assert_eq!(ElmType::Date, c.ty());
        assert_eq!("@2020-01-01", c.to_string());
        assert!(Const::parse_date("2020-13-01").is_err());
        assert!(Const::parse_date("01/01/2020").is_err());
    }

    #[test]
    fn test_parse_datetime_literal() {
        let c = Const::parse_datetime("2020-12-31T23:59:59").unwrap();
        assert_eq!(ElmType::DateTime, c.ty());
        assert_eq!("@2020-12-31T23:59:59", c.to_string());
        assert!(Const::parse_datetime("2020-12-31").is_err());
    }

    #[test]
    fn test_const_display() {
        assert_eq!("'abc'", Const::string("abc").to_string());
        assert_eq!("null", Const::Null.to_string());
        assert_eq!(ElmType::Any, Const::Null.ty());
        let code = Const::Code(Code::new("44054006", "http://snomed.info/sct"));
        assert_eq!(ElmType::Code, code.ty());
        assert_eq!(
            "Code '44054006' from \"http://snomed.info/sct\"",
            code.to_string()
        );
    }
}
