use elmreq_catalog::{FhirVersion, LibraryCache, ModelCatalog};
use elmreq_datatype::{Const, ElmType};
use elmreq_expr::{CodeComparator, ExprKind, FilterPath, Library};
use elmreq_plan::explain::{Explain, ExplainConf};
use elmreq_plan::{query_requirements, ElmRequirementsContext, LowerEffect};
use elmreq_tests::{
    compile_cached, diabetes_library, fhir_catalog, DIABETES_LIBRARY_PATH, DIABETES_VALUE_SET,
};
use std::sync::Arc;
use std::thread;

fn statement(lib: &Library, name: &str) -> elmreq_expr::ExprID {
    lib.find_statement(name).unwrap().0
}

#[test]
fn test_diabetes_observations_filters() {
    let catalog = fhir_catalog(FhirVersion::R4);
    let mut lib = diabetes_library(catalog.as_ref()).unwrap();
    let query = statement(&lib, "Diabetes Observations");
    let ctx = ElmRequirementsContext::new(lib.identifier.clone(), catalog.as_ref());
    let qr = query_requirements(&mut lib.arena, query, &ctx).unwrap();
    let dr = qr.source("O").unwrap();
    assert_eq!(&lib.identifier, &dr.scope);
    let r = lib.arena.must_retrieve(dr.retrieve).unwrap();

    assert_eq!(1, r.code_filters.len());
    let cf = &r.code_filters[0];
    assert_eq!(FilterPath::Property("code".into()), cf.path);
    assert_eq!(CodeComparator::In, cf.comparator);
    match &lib.arena.must_get(cf.value).unwrap().kind {
        ExprKind::ValueSetRef(vs) => {
            assert_eq!("DiabetesCodes", vs.name.as_str());
            assert_eq!(
                DIABETES_VALUE_SET,
                lib.find_value_set(&vs.name).unwrap().id.as_str()
            );
        }
        other => panic!("unexpected code filter value {:?}", other),
    }

    assert_eq!(1, r.date_filters.len());
    let df = &r.date_filters[0];
    assert_eq!(FilterPath::Property("effective".into()), df.path);
    match &lib.arena.must_get(df.value).unwrap().kind {
        ExprKind::Interval(itv) => {
            assert!(itv.low_closed);
            assert!(itv.high_closed);
            let low = &lib.arena.must_get(itv.low.unwrap()).unwrap().kind;
            let high = &lib.arena.must_get(itv.high.unwrap()).unwrap().kind;
            assert_eq!(
                &ExprKind::Literal(Const::parse_date("2020-01-01").unwrap()),
                low
            );
            assert_eq!(
                &ExprKind::Literal(Const::parse_date("2020-12-31").unwrap()),
                high
            );
        }
        other => panic!("unexpected date filter value {:?}", other),
    }

    let paths: Vec<_> = dr
        .observed_element_paths(&lib.arena)
        .unwrap()
        .into_iter()
        .map(|p| p.resource_type_and_path().to_string())
        .collect();
    assert_eq!(vec!["Observation.code", "Observation.effective"], paths);

    let s = dr.explain_to_string(&lib.arena, &ExplainConf::default());
    println!("{}", s);
    assert!(s.contains("codeFilter=[code in valueset \"DiabetesCodes\"]"));
    assert!(s.contains("dateFilter=[effective during Interval[@2020-01-01, @2020-12-31]]"));
}

#[test]
fn test_lowering_twice_only_appends() {
    let catalog = fhir_catalog(FhirVersion::R4);
    let mut lib = diabetes_library(catalog.as_ref()).unwrap();
    let query = statement(&lib, "Diabetes Observations");
    let ctx = ElmRequirementsContext::new(lib.identifier.clone(), catalog.as_ref());
    let qr = query_requirements(&mut lib.arena, query, &ctx).unwrap();
    let dr = qr.single_source().unwrap();
    let eff = dr.apply_data_requirements(&mut lib.arena, &ctx).unwrap();
    assert_eq!(LowerEffect::CODE_FILTER | LowerEffect::DATE_FILTER, eff);
    let r = lib.arena.must_retrieve(dr.retrieve).unwrap();
    assert_eq!(2, r.code_filters.len());
    assert_eq!(r.code_filters[0], r.code_filters[1]);
    assert_eq!(2, r.date_filters.len());
}

#[test]
fn test_expression_ref_source_over_query() {
    let catalog = fhir_catalog(FhirVersion::Dstu3);
    let mut lib = diabetes_library(catalog.as_ref()).unwrap();
    let values = statement(&lib, "Diabetes Observation Values");
    let ctx = ElmRequirementsContext::new(lib.identifier.clone(), catalog.as_ref());
    let qr = query_requirements(&mut lib.arena, values, &ctx).unwrap();
    let dr = qr.source("D").unwrap();
    // expression references are not resolved, the source is synthesized
    assert!(dr.inferred_from.is_none());
    let e = lib.arena.must_get(dr.retrieve).unwrap();
    assert_eq!(Some("10:3-10:25"), e.meta.locator.as_deref());
    assert_eq!(
        ElmType::list(ElmType::class("FHIR", "Observation")),
        e.ty
    );
    assert!(!lib.arena.must_retrieve(dr.retrieve).unwrap().has_filters());
    assert_eq!(1, dr.observed_properties.len());
    assert!(dr.observed_element_paths(&lib.arena).unwrap().is_empty());
}

#[test]
fn test_cached_library_is_shared_and_untouched() {
    let catalog = fhir_catalog(FhirVersion::R4);
    let cache: LibraryCache<Library> = LibraryCache::new();
    let libs: Vec<Arc<Library>> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| compile_cached(&cache, catalog.as_ref(), DIABETES_LIBRARY_PATH)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    });
    assert_eq!(1, cache.len());
    assert!(libs.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));

    // mutate a private copy, the cached tree stays as compiled
    let cached = compile_cached(&cache, catalog.as_ref(), DIABETES_LIBRARY_PATH).unwrap();
    let mut lib = Library::clone(&cached);
    let query = statement(&lib, "Diabetes Observations");
    let ctx = ElmRequirementsContext::new(lib.identifier.clone(), catalog.as_ref());
    let qr = query_requirements(&mut lib.arena, query, &ctx).unwrap();
    let retrieve = qr.single_source().unwrap().retrieve;
    assert!(lib.arena.must_retrieve(retrieve).unwrap().has_filters());
    assert!(!cached.arena.must_retrieve(retrieve).unwrap().has_filters());

    assert!(compile_cached(&cache, catalog.as_ref(), "input/cql/Missing.cql").is_err());
    assert!(!cache.contains("input/cql/Missing.cql"));
}

#[test]
fn test_library_identity() {
    let catalog: Arc<dyn ModelCatalog> = fhir_catalog("r4".parse().unwrap());
    assert!(catalog.exists_model("FHIR"));
    assert!("r5".parse::<FhirVersion>().is_err());
    let lib = diabetes_library(catalog.as_ref()).unwrap();
    assert_eq!("DiabetesScreening-1.0.0", lib.identifier.resource_id(true));
    assert_eq!("DiabetesScreening", lib.identifier.resource_id(false));
    assert_eq!(
        "http://example.org/fhir/DiabetesScreening|1.0.0",
        lib.identifier.to_string()
    );
}
