use crate::arena::ExprArena;
use crate::error::{Error, Result};
use crate::expr::{Expr, ExprID};
use elmreq_catalog::LibraryIdentifier;
use indexmap::IndexMap;
use smol_str::SmolStr;

/// Library is a compiled unit: named expression definitions
/// and value set declarations, all nodes owned by one arena.
#[derive(Debug, Clone)]
pub struct Library {
    pub identifier: LibraryIdentifier,
    pub arena: ExprArena,
    pub statements: IndexMap<SmolStr, ExprID>,
    pub value_sets: IndexMap<SmolStr, ValueSetDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueSetDef {
    pub name: SmolStr,
    /// Canonical url of the value set.
    pub id: SmolStr,
    pub version: Option<SmolStr>,
}

impl Library {
    #[inline]
    pub fn new(identifier: LibraryIdentifier) -> Self {
        Library {
            identifier,
            arena: ExprArena::new(),
            statements: IndexMap::new(),
            value_sets: IndexMap::new(),
        }
    }

    /// Add expression definition by name.
    /// The expression must already be inserted into arena.
    #[inline]
    pub fn add_statement(&mut self, name: &str, expr: ExprID) -> Result<()> {
        self.arena.must_get(expr)?;
        if self.statements.contains_key(name) {
            return Err(Error::DuplicatedStatement(name.to_string()));
        }
        self.statements.insert(SmolStr::new(name), expr);
        Ok(())
    }

    #[inline]
    pub fn find_statement(&self, name: &str) -> Option<(ExprID, &Expr)> {
        let id = *self.statements.get(name)?;
        self.arena.get(id).map(|e| (id, e))
    }

    #[inline]
    pub fn add_value_set(&mut self, name: &str, id: &str, version: Option<&str>) -> Result<()> {
        if self.value_sets.contains_key(name) {
            return Err(Error::DuplicatedValueSet(name.to_string()));
        }
        self.value_sets.insert(
            SmolStr::new(name),
            ValueSetDef {
                name: SmolStr::new(name),
                id: SmolStr::new(id),
                version: version.map(SmolStr::new),
            },
        );
        Ok(())
    }

    #[inline]
    pub fn find_value_set(&self, name: &str) -> Option<&ValueSetDef> {
        self.value_sets.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elmreq_datatype::{Const, ElmType};

    #[test]
    fn test_library_statements() {
        let mut lib = Library::new(LibraryIdentifier::new("DiabetesScreening", Some("1.0.0")));
        let e = lib.arena.insert(Expr::literal(Const::Bool(true)));
        lib.add_statement("Always", e).unwrap();
        assert!(matches!(
            lib.add_statement("Always", e),
            Err(Error::DuplicatedStatement(_))
        ));
        assert!(matches!(
            lib.add_statement("Missing", ExprID::from(7)),
            Err(Error::ExprNotFound(_))
        ));
        let (id, expr) = lib.find_statement("Always").unwrap();
        assert_eq!(e, id);
        assert_eq!(ElmType::Boolean, expr.ty);
        assert!(lib.find_statement("Never").is_none());
    }

    #[test]
    fn test_library_value_sets() {
        let mut lib = Library::new(LibraryIdentifier::new("DiabetesScreening", None));
        lib.add_value_set("DiabetesCodes", "http://example.org/fhir/ValueSet/diabetes", None)
            .unwrap();
        assert!(lib
            .add_value_set("DiabetesCodes", "http://example.org/other", None)
            .is_err());
        let vs = lib.find_value_set("DiabetesCodes").unwrap();
        assert_eq!("http://example.org/fhir/ValueSet/diabetes", vs.id.as_str());
        assert!(vs.version.is_none());
    }
}
