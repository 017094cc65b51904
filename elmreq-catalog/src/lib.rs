pub mod cache;
pub mod error;
pub mod ident;
pub mod mem_impl;
pub mod path;

pub use cache::LibraryCache;
pub use ident::{FhirVersion, LibraryIdentifier};
pub use path::ElementPath;

use bitflags::bitflags;
use elmreq_datatype::{ClassName, ElmType};
use error::Result;
use smol_str::SmolStr;
use std::marker::PhantomData;

/// ModelCatalog provides metadata of data models, e.g. which
/// classes can be retrieved and how their values are classified.
pub trait ModelCatalog: Send + Sync {
    fn all_models(&self) -> Vec<Model>;

    fn exists_model(&self, model_name: &str) -> bool;

    fn find_model_by_name(&self, model_name: &str) -> Option<Model>;

    fn all_classes_in_model(&self, model_id: &ModelID) -> Vec<ClassInfo>;

    fn find_class_by_name(&self, model_name: &str, class_name: &str) -> Option<ClassInfo>;

    fn find_class(&self, class_id: &ClassID) -> Option<ClassInfo>;

    fn find_element_by_name(
        &self,
        model_name: &str,
        class_name: &str,
        element_name: &str,
    ) -> Option<ElementInfo>;

    fn create_model(&self, model_name: &str, url: &str) -> Result<ModelID>;

    fn create_class(&self, class_spec: ClassSpec) -> Result<ClassID>;

    /// Returns attributes of given class, empty if class not found.
    #[inline]
    fn class_attr(&self, class_name: &ClassName) -> ClassAttr {
        self.find_class_by_name(&class_name.model, &class_name.name)
            .map(|c| c.attr)
            .unwrap_or_else(ClassAttr::empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectID<T> {
    id: u32,
    _marker: PhantomData<T>,
}

impl<T> ObjectID<T> {
    /// Object id can only be allocated by the catalog.
    pub(crate) fn new(id: u32) -> Self {
        ObjectID {
            id,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct M;
pub type ModelID = ObjectID<M>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct K;
pub type ClassID = ObjectID<K>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub id: ModelID,
    pub name: SmolStr,
    pub url: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub id: ClassID,
    pub model_id: ModelID,
    pub name: ClassName,
    pub attr: ClassAttr,
    /// Path of the element used as default code filter of a retrieve.
    pub primary_code_path: Option<SmolStr>,
    pub elements: Vec<ElementInfo>,
}

impl ClassInfo {
    #[inline]
    pub fn element(&self, name: &str) -> Option<&ElementInfo> {
        self.elements.iter().find(|e| e.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    pub name: SmolStr,
    pub ty: ElmType,
}

bitflags! {
    pub struct ClassAttr: u8 {
        const RETRIEVABLE = 0x01; // can be retrieved from data source
        const TERMINOLOGY = 0x02; // coded value
        const TEMPORAL = 0x04; // date or datetime value
        const INTERVAL = 0x08; // interval value
    }
}

#[derive(Debug, Clone)]
pub struct ClassSpec {
    pub model_name: SmolStr,
    pub class_name: SmolStr,
    pub attr: ClassAttr,
    pub primary_code_path: Option<SmolStr>,
    pub elements: Vec<ElementSpec>,
}

impl ClassSpec {
    #[inline]
    pub fn new(model_name: &str, class_name: &str, attr: ClassAttr) -> Self {
        ClassSpec {
            model_name: SmolStr::new(model_name),
            class_name: SmolStr::new(class_name),
            attr,
            primary_code_path: None,
            elements: vec![],
        }
    }

    #[inline]
    pub fn primary_code_path(mut self, path: &str) -> Self {
        self.primary_code_path = Some(SmolStr::new(path));
        self
    }

    #[inline]
    pub fn elements(mut self, elements: &[ElementSpec]) -> Self {
        self.elements.extend_from_slice(elements);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ElementSpec {
    pub name: SmolStr,
    pub ty: ElmType,
}

impl ElementSpec {
    #[inline]
    pub fn new(name: &str, ty: ElmType) -> Self {
        ElementSpec {
            name: SmolStr::new(name),
            ty,
        }
    }
}
