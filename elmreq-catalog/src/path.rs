use elmreq_datatype::ClassName;
use smol_str::SmolStr;

const DEFAULT_RESOURCE_TYPE: &str = "Observation";
const DEFAULT_RESOURCE_PATH: &str = "value[x]";
const DEFAULT_VERSION: &str = "4.0.1";
const BASE_PROFILE_PREFIX: &str = "http://hl7.org/fhir/StructureDefinition/";

/// ElementPath locates an element of a FHIR resource, written as
/// "Resource.path.to.element".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementPath {
    resource_type: SmolStr,
    resource_path: SmolStr,
    resource_type_and_path: SmolStr,
    base_profile: Option<SmolStr>,
    version: Option<SmolStr>,
}

impl Default for ElementPath {
    fn default() -> Self {
        ElementPath {
            resource_type: SmolStr::new(DEFAULT_RESOURCE_TYPE),
            resource_path: SmolStr::new(DEFAULT_RESOURCE_PATH),
            resource_type_and_path: SmolStr::new(format!(
                "{}.{}",
                DEFAULT_RESOURCE_TYPE, DEFAULT_RESOURCE_PATH
            )),
            base_profile: None,
            version: None,
        }
    }
}

impl ElementPath {
    /// Parse the element path.
    /// Resource type and path are only replaced if input has at
    /// least two segments, otherwise the defaults remain.
    /// Trailing empty segments are not counted.
    pub fn parse(resource: &str) -> Self {
        let mut ep = ElementPath {
            resource_type_and_path: SmolStr::new(resource),
            ..Default::default()
        };
        let trimmed = resource.trim_end_matches('.');
        let mut segments = trimmed.split('.');
        if let (Some(head), Some(_)) = (segments.next(), segments.next()) {
            ep.resource_type = normalize_resource_type(head);
            // skip the head and keep the rest
            ep.resource_path = SmolStr::new(&trimmed[head.len() + 1..]);
        }
        ep
    }

    /// Build element path of given element in a model class.
    #[inline]
    pub fn of_class(class: &ClassName, path: &str) -> Self {
        ElementPath::parse(&format!("{}.{}", class.name, path))
    }

    #[inline]
    pub fn with_base_profile(mut self, base_profile: &str) -> Self {
        self.base_profile = Some(SmolStr::new(base_profile));
        self
    }

    #[inline]
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(SmolStr::new(version));
        self
    }

    #[inline]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    #[inline]
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    #[inline]
    pub fn resource_type_and_path(&self) -> &str {
        &self.resource_type_and_path
    }

    /// Returns explicit base profile, or the core profile of the
    /// resource type if base profile is absent or is "fhir".
    #[inline]
    pub fn base_profile(&self) -> String {
        match &self.base_profile {
            Some(bp) if !bp.is_empty() && !bp.eq_ignore_ascii_case("fhir") => bp.to_string(),
            _ => format!("{}{}", BASE_PROFILE_PREFIX, self.resource_type),
        }
    }

    #[inline]
    pub fn version(&self) -> &str {
        match &self.version {
            Some(v) if !v.is_empty() => v.as_str(),
            _ => DEFAULT_VERSION,
        }
    }
}

#[inline]
fn normalize_resource_type(head: &str) -> SmolStr {
    let known = [
        "Observation",
        "Encounter",
        "Patient",
        "Coverage",
        "MedicationStatement",
    ];
    known
        .iter()
        .find(|k| k.eq_ignore_ascii_case(head))
        .map(|k| SmolStr::new(k))
        .unwrap_or_else(|| SmolStr::new(head))
}
