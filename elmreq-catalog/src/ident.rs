use crate::error::{Error, Result};
use smol_str::SmolStr;
use std::fmt;
use std::str::FromStr;

/// LibraryIdentifier identifies the library an expression is
/// compiled from. Every requirement is stamped with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryIdentifier {
    pub id: SmolStr,
    pub system: Option<SmolStr>,
    pub version: Option<SmolStr>,
}

impl LibraryIdentifier {
    #[inline]
    pub fn new(id: &str, version: Option<&str>) -> Self {
        LibraryIdentifier {
            id: SmolStr::new(id),
            system: None,
            version: version.map(SmolStr::new),
        }
    }

    #[inline]
    pub fn with_system(mut self, system: &str) -> Self {
        self.system = Some(SmolStr::new(system));
        self
    }

    /// Returns id of the published artifact of this library.
    /// Underscores are not allowed in resource ids, so they are
    /// replaced by dash in name, and by dot in version.
    #[inline]
    pub fn resource_id(&self, versioned: bool) -> String {
        let mut res = self.id.replace('_', "-");
        if versioned {
            if let Some(version) = &self.version {
                res.push('-');
                res.push_str(&version.replace('_', "."));
            }
        }
        res
    }
}

impl fmt::Display for LibraryIdentifier {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(system) = &self.system {
            write!(f, "{}/", system)?;
        }
        f.write_str(&self.id)?;
        if let Some(version) = &self.version {
            write!(f, "|{}", version)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FhirVersion {
    Dstu3,
    R4,
}

impl FhirVersion {
    #[inline]
    pub fn to_lower(&self) -> &'static str {
        match self {
            FhirVersion::Dstu3 => "dstu3",
            FhirVersion::R4 => "r4",
        }
    }
}

impl FromStr for FhirVersion {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dstu3" => Ok(FhirVersion::Dstu3),
            "r4" => Ok(FhirVersion::R4),
            _ => Err(Error::InvalidFhirVersion(s.to_string())),
        }
    }
}

impl fmt::Display for FhirVersion {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_lower())
    }
}
