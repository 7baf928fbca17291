use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::config::ImageConfiguration;
use crate::name::NameFormatter;
use crate::{Error, Result};

/// A platform API version made of dotted numeric components, e.g. `1.24`.
///
/// Ordering compares components pairwise as numbers; when one version is a
/// prefix of the other, the longer one is the larger (`1.2 < 1.2.1`). This
/// is the total order the version negotiation below folds with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiVersion(Vec<u32>);

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.split('.')
            .map(|component| {
                component
                    .parse::<u32>()
                    .map_err(|_| Error::InvalidApiVersion(s.to_string()))
            })
            .collect::<Result<Vec<_>>>()
            .map(ApiVersion)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("."))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(&other.0) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Initialize and validate every image in order, reducing the per-image
/// minimum API versions to the single floor that satisfies them all.
///
/// When no image demands anything the requested version comes back
/// unchanged. Any per-image validation failure aborts the whole call.
pub fn init_and_validate(
    images: &mut [ImageConfiguration],
    api_version: Option<ApiVersion>,
    name_formatter: &dyn NameFormatter,
) -> Result<Option<ApiVersion>> {
    let mut effective = api_version;
    for image in images.iter_mut() {
        let min = image.init_and_validate(name_formatter)?;
        effective = effective.max(min);
    }
    Ok(effective)
}
