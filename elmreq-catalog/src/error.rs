use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Model '{0}' already exists")]
    ModelAlreadyExists(String),
    #[error("Model '{0}' not exists")]
    ModelNotExists(String),
    #[error("Class '{0}' already exists")]
    ClassAlreadyExists(String),
    #[error("Element name '{0}' is not unique")]
    ElementNameNotUnique(String),
    #[error("Unable to parse FHIR version value: {0}")]
    InvalidFhirVersion(String),
}
