use elmreq_catalog::mem_impl::MemCatalogBuilder;
use elmreq_catalog::{
    ClassAttr, ClassSpec, ElementSpec, FhirVersion, LibraryCache, LibraryIdentifier, ModelCatalog,
};
use elmreq_datatype::{Const, ElmType};
use elmreq_expr::{AliasedSource, Expr, Library, PredFuncKind, Query, Retrieve};
use elmreq_plan::error::{Result, ToResult};
use std::sync::Arc;

pub const DIABETES_LIBRARY_PATH: &str = "input/cql/DiabetesScreening.cql";
pub const DIABETES_VALUE_SET: &str = "http://example.org/fhir/ValueSet/diabetes";

#[inline]
fn fhir(name: &str) -> ElmType {
    ElmType::class("FHIR", name)
}

#[inline]
pub fn fhir_catalog(version: FhirVersion) -> Arc<dyn ModelCatalog> {
    let mut builder = MemCatalogBuilder::default();
    builder
        .add_model("FHIR", &format!("http://hl7.org/fhir/{}", version.to_lower()))
        .unwrap();
    for (name, attr) in [
        ("CodeableConcept", ClassAttr::TERMINOLOGY),
        ("Coding", ClassAttr::TERMINOLOGY),
        ("code", ClassAttr::TERMINOLOGY),
        ("date", ClassAttr::TEMPORAL),
        ("dateTime", ClassAttr::TEMPORAL),
        ("instant", ClassAttr::TEMPORAL),
        ("Period", ClassAttr::TEMPORAL | ClassAttr::INTERVAL),
        ("Quantity", ClassAttr::empty()),
        ("string", ClassAttr::empty()),
    ] {
        builder.add_class(ClassSpec::new("FHIR", name, attr)).unwrap();
    }
    builder
        .add_class(
            ClassSpec::new("FHIR", "Observation", ClassAttr::RETRIEVABLE)
                .primary_code_path("code")
                .elements(&[
                    ElementSpec::new("status", fhir("code")),
                    ElementSpec::new("category", ElmType::list(fhir("CodeableConcept"))),
                    ElementSpec::new("code", fhir("CodeableConcept")),
                    ElementSpec::new(
                        "effective",
                        ElmType::Choice(vec![fhir("dateTime"), fhir("Period")]),
                    ),
                    ElementSpec::new("issued", fhir("instant")),
                    ElementSpec::new(
                        "value",
                        ElmType::Choice(vec![fhir("Quantity"), fhir("CodeableConcept")]),
                    ),
                ]),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::new("FHIR", "Encounter", ClassAttr::RETRIEVABLE)
                .primary_code_path("type")
                .elements(&[
                    ElementSpec::new("status", fhir("code")),
                    ElementSpec::new("type", ElmType::list(fhir("CodeableConcept"))),
                    ElementSpec::new("period", fhir("Period")),
                ]),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::new("FHIR", "Condition", ClassAttr::RETRIEVABLE)
                .primary_code_path("code")
                .elements(&[
                    ElementSpec::new("code", fhir("CodeableConcept")),
                    ElementSpec::new(
                        "onset",
                        ElmType::Choice(vec![fhir("dateTime"), fhir("Period")]),
                    ),
                ]),
        )
        .unwrap();
    Arc::new(builder.build())
}

/// Typed alias property, as the compiler resolves it.
#[inline]
pub fn property(
    catalog: &dyn ModelCatalog,
    alias: &str,
    class: &str,
    path: &str,
) -> Expr {
    let ty = catalog
        .find_element_by_name("FHIR", class, path)
        .map(|e| e.ty)
        .unwrap_or_default();
    Expr::property(alias, path, ty)
}

/// Build library equivalent to:
///
/// ```cql
/// library DiabetesScreening version '1.0.0'
/// valueset "DiabetesCodes": 'http://example.org/fhir/ValueSet/diabetes'
/// define "Diabetes Observations":
///   [Observation] O
///     where O.code in "DiabetesCodes"
///       and O.effective during Interval[@2020-01-01, @2020-12-31]
/// define "Diabetes Observation Values":
///   "Diabetes Observations" D return D.value
/// ```
pub fn diabetes_library(catalog: &dyn ModelCatalog) -> Result<Library> {
    let mut lib = Library::new(
        LibraryIdentifier::new("DiabetesScreening", Some("1.0.0"))
            .with_system("http://example.org/fhir"),
    );
    lib.add_value_set("DiabetesCodes", DIABETES_VALUE_SET, None)?;
    let observation = catalog.find_class_by_name("FHIR", "Observation").must_ok()?;
    let arena = &mut lib.arena;
    let retrieve = arena.insert(
        Expr::retrieve(Retrieve::new(observation.name.clone())).with_locator("6:3-6:15"),
    );
    let code = arena.insert(property(catalog, "O", "Observation", "code"));
    let vs = arena.insert(Expr::value_set_ref("DiabetesCodes"));
    let in_vs = arena.insert(Expr::pred_func(PredFuncKind::InValueSet, &[code, vs]));
    let effective = arena.insert(property(catalog, "O", "Observation", "effective"));
    let low = arena.insert(Expr::literal(Const::parse_date("2020-01-01")?));
    let high = arena.insert(Expr::literal(Const::parse_date("2020-12-31")?));
    let itv = arena.add_interval(Some(low), true, Some(high), true)?;
    let during = arena.insert(Expr::pred_func(PredFuncKind::IncludedIn, &[effective, itv]));
    let pred = arena.insert(Expr::pred_conj(vec![in_vs, during]));
    let list_ty = ElmType::list(ElmType::Class(observation.name.clone()));
    let query = arena.insert(
        Expr::query(
            Query::new(vec![AliasedSource::new("O", retrieve)]).with_where(pred),
            list_ty.clone(),
        )
        .with_locator("6:3-8:62"),
    );
    lib.add_statement("Diabetes Observations", query)?;

    let arena = &mut lib.arena;
    let obs_ref = arena.insert(
        Expr::expression_ref("Diabetes Observations", list_ty).with_locator("10:3-10:25"),
    );
    let value = arena.insert(property(catalog, "D", "Observation", "value"));
    let values = arena.insert(Expr::query(
        Query::new(vec![AliasedSource::new("D", obs_ref)]).with_return(value),
        ElmType::list(ElmType::Any),
    ));
    lib.add_statement("Diabetes Observation Values", values)?;
    Ok(lib)
}

type BuildLibrary = fn(&dyn ModelCatalog) -> Result<Library>;

#[inline]
fn fixture(path: &str) -> Option<BuildLibrary> {
    match path {
        DIABETES_LIBRARY_PATH => Some(diabetes_library),
        _ => None,
    }
}

/// Compile library at given path once, and share it afterwards.
pub fn compile_cached(
    cache: &LibraryCache<Library>,
    catalog: &dyn ModelCatalog,
    path: &str,
) -> Result<Arc<Library>> {
    cache.get_or_try_insert_with(path, || {
        let build = fixture(path).must_ok()?;
        build(catalog)
    })
}
