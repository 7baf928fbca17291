use oci_distribution::Reference;

use crate::{Error, Result};

/// Format an image name by replacing placeholders the caller understands.
///
/// The pipeline never interprets placeholder syntax itself; it only applies
/// the formatter right before validating the final name.
pub trait NameFormatter {
    fn format(&self, name: &str) -> Result<String>;
}

/// Formatter that leaves names untouched.
pub struct Identity;

impl NameFormatter for Identity {
    fn format(&self, name: &str) -> Result<String> {
        Ok(name.to_string())
    }
}

impl<F> NameFormatter for F
where
    F: Fn(&str) -> Result<String>,
{
    fn format(&self, name: &str) -> Result<String> {
        self(name)
    }
}

/// Check that a resolved image name parses as an OCI reference.
pub fn validate_name(name: &str) -> Result<()> {
    name.parse::<Reference>()
        .map(|_| ())
        .map_err(|source| Error::InvalidImageName {
            name: name.to_string(),
            source,
        })
}
