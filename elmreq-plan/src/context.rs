use elmreq_catalog::{ClassAttr, LibraryIdentifier, ModelCatalog};
use elmreq_datatype::ElmType;

/// RequirementsContext classifies types of comparands and provides
/// the scope stamped on requirements.
/// Unknown types are never classified.
pub trait RequirementsContext {
    fn is_terminology_type(&self, ty: &ElmType) -> bool;

    fn is_date_type(&self, ty: &ElmType) -> bool;

    fn is_interval_type(&self, ty: &ElmType) -> bool;

    fn current_scope(&self) -> &LibraryIdentifier;
}

/// Context backed by a model catalog, which classifies
/// model classes by their attributes.
pub struct ElmRequirementsContext<'a, C: ?Sized> {
    scope: LibraryIdentifier,
    catalog: &'a C,
}

impl<'a, C: ModelCatalog + ?Sized> ElmRequirementsContext<'a, C> {
    #[inline]
    pub fn new(scope: LibraryIdentifier, catalog: &'a C) -> Self {
        ElmRequirementsContext { scope, catalog }
    }

    #[inline]
    pub fn catalog(&self) -> &C {
        self.catalog
    }

    #[inline]
    fn class_has(&self, ty: &ElmType, attr: ClassAttr) -> bool {
        match ty {
            ElmType::Class(cn) => self.catalog.class_attr(cn).contains(attr),
            _ => false,
        }
    }

    /// Choice is classified only if all alternatives are.
    #[inline]
    fn all_choices<F: Fn(&ElmType) -> bool>(tys: &[ElmType], f: F) -> bool {
        !tys.is_empty() && tys.iter().all(f)
    }
}

impl<'a, C: ModelCatalog + ?Sized> RequirementsContext for ElmRequirementsContext<'a, C> {
    fn is_terminology_type(&self, ty: &ElmType) -> bool {
        match ty {
            ElmType::Code
            | ElmType::Concept
            | ElmType::ValueSet
            | ElmType::CodeSystem
            | ElmType::Vocabulary => true,
            ElmType::List(elem) => self.is_terminology_type(elem),
            ElmType::Choice(tys) => Self::all_choices(tys, |t| self.is_terminology_type(t)),
            ElmType::Class(_) => self.class_has(ty, ClassAttr::TERMINOLOGY),
            _ => false,
        }
    }

    fn is_date_type(&self, ty: &ElmType) -> bool {
        match ty {
            ElmType::Date | ElmType::DateTime => true,
            ElmType::Interval(point) => self.is_date_type(point),
            ElmType::Choice(tys) => Self::all_choices(tys, |t| self.is_date_type(t)),
            ElmType::Class(_) => self.class_has(ty, ClassAttr::TEMPORAL),
            _ => false,
        }
    }

    fn is_interval_type(&self, ty: &ElmType) -> bool {
        match ty {
            ElmType::Interval(_) => true,
            ElmType::Choice(tys) => Self::all_choices(tys, |t| self.is_interval_type(t)),
            ElmType::Class(_) => self.class_has(ty, ClassAttr::INTERVAL),
            _ => false,
        }
    }

    #[inline]
    fn current_scope(&self) -> &LibraryIdentifier {
        &self.scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elmreq_catalog::mem_impl::MemCatalogBuilder;
    use elmreq_catalog::ClassSpec;

    fn catalog() -> elmreq_catalog::mem_impl::MemCatalog {
        let mut builder = MemCatalogBuilder::default();
        builder.add_model("FHIR", "http://hl7.org/fhir").unwrap();
        builder
            .add_class(ClassSpec::new("FHIR", "CodeableConcept", ClassAttr::TERMINOLOGY))
            .unwrap();
        builder
            .add_class(ClassSpec::new(
                "FHIR",
                "Period",
                ClassAttr::TEMPORAL | ClassAttr::INTERVAL,
            ))
            .unwrap();
        builder
            .add_class(ClassSpec::new("FHIR", "dateTime", ClassAttr::TEMPORAL))
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_classify_system_types() {
        let catalog = catalog();
        let ctx = ElmRequirementsContext::new(LibraryIdentifier::new("Test", None), &catalog);
        assert!(ctx.is_terminology_type(&ElmType::ValueSet));
        assert!(ctx.is_terminology_type(&ElmType::list(ElmType::Code)));
        assert!(!ctx.is_terminology_type(&ElmType::String));
        assert!(ctx.is_date_type(&ElmType::DateTime));
        assert!(ctx.is_date_type(&ElmType::interval(ElmType::Date)));
        assert!(!ctx.is_date_type(&ElmType::interval(ElmType::Integer)));
        assert!(ctx.is_interval_type(&ElmType::interval(ElmType::Integer)));
        assert!(!ctx.is_interval_type(&ElmType::Date));
        assert_eq!("Test", ctx.current_scope().id.as_str());
    }

    #[test]
    fn test_classify_unknown_is_false() {
        let catalog = catalog();
        let ctx = ElmRequirementsContext::new(LibraryIdentifier::new("Test", None), &catalog);
        for ty in [
            ElmType::Unknown,
            ElmType::Any,
            ElmType::class("FHIR", "Nothing"),
            ElmType::class("QDM", "Period"),
            ElmType::Choice(vec![]),
        ] {
            assert!(!ctx.is_terminology_type(&ty));
            assert!(!ctx.is_date_type(&ty));
            assert!(!ctx.is_interval_type(&ty));
        }
    }

    #[test]
    fn test_classify_catalog_classes() {
        let catalog = catalog();
        let ctx = ElmRequirementsContext::new(LibraryIdentifier::new("Test", None), &catalog);
        let cc = ElmType::class("FHIR", "CodeableConcept");
        let period = ElmType::class("FHIR", "Period");
        let dt = ElmType::class("FHIR", "dateTime");
        assert!(ctx.is_terminology_type(&cc));
        assert!(ctx.is_terminology_type(&ElmType::list(cc.clone())));
        assert!(ctx.is_date_type(&period));
        assert!(ctx.is_interval_type(&period));
        assert!(ctx.is_date_type(&ElmType::Choice(vec![dt.clone(), period.clone()])));
        assert!(!ctx.is_interval_type(&ElmType::Choice(vec![dt, period])));
        assert!(!ctx.is_date_type(&ElmType::Choice(vec![cc, ElmType::Date])));
    }
}
