use crate::error::{Error, Result};
use crate::{ClassID, ClassInfo, ClassSpec, ElementInfo, Model, ModelCatalog, ModelID};
use elmreq_datatype::ClassName;
use indexmap::IndexMap;
use parking_lot::RwLock;
use smol_str::SmolStr;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct MemCatalog {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    models: IndexMap<SmolStr, Model>,
    classes: IndexMap<ModelID, Vec<ClassInfo>>,
    model_id_gen: u32,
    class_id_gen: u32,
}

impl Inner {
    #[inline]
    fn find_class(&self, model_name: &str, class_name: &str) -> Option<&ClassInfo> {
        self.models.get(model_name).and_then(|m| {
            self.classes
                .get(&m.id)
                .and_then(|cs| cs.iter().find(|c| c.name.name == class_name))
        })
    }
}

impl ModelCatalog for MemCatalog {
    #[inline]
    fn all_models(&self) -> Vec<Model> {
        let inner = self.inner.read();
        inner.models.values().cloned().collect()
    }

    #[inline]
    fn exists_model(&self, model_name: &str) -> bool {
        let inner = self.inner.read();
        inner.models.contains_key(model_name)
    }

    #[inline]
    fn find_model_by_name(&self, model_name: &str) -> Option<Model> {
        let inner = self.inner.read();
        inner.models.get(model_name).cloned()
    }

    #[inline]
    fn all_classes_in_model(&self, model_id: &ModelID) -> Vec<ClassInfo> {
        let inner = self.inner.read();
        inner.classes.get(model_id).cloned().unwrap_or_default()
    }

    #[inline]
    fn find_class_by_name(&self, model_name: &str, class_name: &str) -> Option<ClassInfo> {
        let inner = self.inner.read();
        inner.find_class(model_name, class_name).cloned()
    }

    #[inline]
    fn find_class(&self, class_id: &ClassID) -> Option<ClassInfo> {
        let inner = self.inner.read();
        inner
            .classes
            .values()
            .flat_map(|cs| cs.iter())
            .find(|c| &c.id == class_id)
            .cloned()
    }

    #[inline]
    fn find_element_by_name(
        &self,
        model_name: &str,
        class_name: &str,
        element_name: &str,
    ) -> Option<ElementInfo> {
        let inner = self.inner.read();
        inner
            .find_class(model_name, class_name)
            .and_then(|c| c.element(element_name).cloned())
    }

    #[inline]
    fn create_model(&self, model_name: &str, url: &str) -> Result<ModelID> {
        let mut inner = self.inner.write();
        if inner.models.contains_key(model_name) {
            return Err(Error::ModelAlreadyExists(model_name.to_string()));
        }
        inner.model_id_gen += 1;
        let id = ModelID::new(inner.model_id_gen);
        let name = SmolStr::new(model_name);
        let model = Model {
            id,
            name: name.clone(),
            url: SmolStr::new(url),
        };
        inner.models.insert(name, model);
        inner.classes.insert(id, vec![]);
        Ok(id)
    }

    #[inline]
    fn create_class(&self, class_spec: ClassSpec) -> Result<ClassID> {
        let mut inner = self.inner.write();
        let Inner {
            models,
            classes,
            class_id_gen,
            ..
        } = &mut *inner;
        match models.get(&class_spec.model_name) {
            None => Err(Error::ModelNotExists(class_spec.model_name.to_string())),
            Some(model) => {
                let classes_in_model = classes.entry(model.id).or_default();
                if classes_in_model
                    .iter()
                    .any(|c| c.name.name == class_spec.class_name)
                {
                    return Err(Error::ClassAlreadyExists(format!(
                        "{}.{}",
                        class_spec.model_name, class_spec.class_name
                    )));
                }
                let mut names = HashSet::with_capacity(class_spec.elements.len());
                let mut elements = Vec::with_capacity(class_spec.elements.len());
                for e in class_spec.elements {
                    if !names.insert(e.name.clone()) {
                        return Err(Error::ElementNameNotUnique(e.name.to_string()));
                    }
                    elements.push(ElementInfo {
                        name: e.name,
                        ty: e.ty,
                    });
                }
                *class_id_gen += 1;
                let id = ClassID::new(*class_id_gen);
                classes_in_model.push(ClassInfo {
                    id,
                    model_id: model.id,
                    name: ClassName::new(&class_spec.model_name, &class_spec.class_name),
                    attr: class_spec.attr,
                    primary_code_path: class_spec.primary_code_path,
                    elements,
                });
                Ok(id)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemCatalogBuilder(MemCatalog);

impl MemCatalogBuilder {
    #[inline]
    pub fn add_model(&mut self, model_name: &str, url: &str) -> Result<()> {
        self.0.create_model(model_name, url).map(|_| ())
    }

    #[inline]
    pub fn add_class(&mut self, class_spec: ClassSpec) -> Result<()> {
        self.0.create_class(class_spec).map(|_| ())
    }

    #[inline]
    pub fn build(self) -> MemCatalog {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassAttr, ElementSpec};
    use elmreq_datatype::ElmType;

    fn fhir_catalog() -> MemCatalog {
        let mut builder = MemCatalogBuilder::default();
        builder.add_model("FHIR", "http://hl7.org/fhir").unwrap();
        builder
            .add_class(
                ClassSpec::new("FHIR", "Observation", ClassAttr::RETRIEVABLE)
                    .primary_code_path("code")
                    .elements(&[
                        ElementSpec::new("code", ElmType::class("FHIR", "CodeableConcept")),
                        ElementSpec::new("effective", ElmType::class("FHIR", "dateTime")),
                    ]),
            )
            .unwrap();
        builder
            .add_class(ClassSpec::new(
                "FHIR",
                "CodeableConcept",
                ClassAttr::TERMINOLOGY,
            ))
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_mem_catalog_lookup() {
        let cat = fhir_catalog();
        assert!(cat.exists_model("FHIR"));
        assert!(!cat.exists_model("QDM"));
        let obs = cat.find_class_by_name("FHIR", "Observation").unwrap();
        assert_eq!(Some(SmolStr::new("code")), obs.primary_code_path);
        assert_eq!(Some(obs.clone()), cat.find_class(&obs.id));
        let model = cat.find_model_by_name("FHIR").unwrap();
        assert_eq!(2, cat.all_classes_in_model(&model.id).len());
        let elem = cat
            .find_element_by_name("FHIR", "Observation", "effective")
            .unwrap();
        assert_eq!(ElmType::class("FHIR", "dateTime"), elem.ty);
        assert!(cat
            .find_element_by_name("FHIR", "Observation", "status")
            .is_none());
    }

    #[test]
    fn test_mem_catalog_class_attr() {
        let cat = fhir_catalog();
        assert_eq!(
            ClassAttr::TERMINOLOGY,
            cat.class_attr(&ClassName::new("FHIR", "CodeableConcept"))
        );
        assert!(cat
            .class_attr(&ClassName::new("FHIR", "Unknown"))
            .is_empty());
    }

    #[test]
    fn test_mem_catalog_duplicates() {
        let cat = fhir_catalog();
        assert!(matches!(
            cat.create_model("FHIR", "http://hl7.org/fhir"),
            Err(Error::ModelAlreadyExists(_))
        ));
        assert!(matches!(
            cat.create_class(ClassSpec::new("FHIR", "Observation", ClassAttr::empty())),
            Err(Error::ClassAlreadyExists(_))
        ));
        assert!(matches!(
            cat.create_class(ClassSpec::new("QDM", "Encounter", ClassAttr::empty())),
            Err(Error::ModelNotExists(_))
        ));
        let spec = ClassSpec::new("FHIR", "Encounter", ClassAttr::RETRIEVABLE).elements(&[
            ElementSpec::new("period", ElmType::class("FHIR", "Period")),
            ElementSpec::new("period", ElmType::class("FHIR", "Period")),
        ]);
        assert!(matches!(
            cat.create_class(spec),
            Err(Error::ElementNameNotUnique(_))
        ));
    }
}
