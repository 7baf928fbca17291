use std::collections::HashSet;

use itertools::Itertools;
use tracing::warn;

use crate::config::ImageConfiguration;
use crate::{Error, Result};

/// Expands one authored image configuration into zero or more concrete
/// configurations, e.g. by fanning out over a set of properties.
pub trait Resolver {
    fn resolve(&self, image: &ImageConfiguration) -> Vec<ImageConfiguration>;
}

impl<F> Resolver for F
where
    F: Fn(&ImageConfiguration) -> Vec<ImageConfiguration>,
{
    fn resolve(&self, image: &ImageConfiguration) -> Vec<ImageConfiguration> {
        self(image)
    }
}

/// Final hook for mangling the whole resolved list before filtering.
///
/// The customizer owns its result: whatever it returns is taken as-is, with
/// no further invariant checks. Use with responsibility.
pub trait Customizer {
    fn customize(&self, images: Vec<ImageConfiguration>) -> Vec<ImageConfiguration>;
}

impl<F> Customizer for F
where
    F: Fn(Vec<ImageConfiguration>) -> Vec<ImageConfiguration>,
{
    fn customize(&self, images: Vec<ImageConfiguration>) -> Vec<ImageConfiguration> {
        self(images)
    }
}

/// Resolve, customize and filter the authored image configurations.
///
/// Each input entry is expanded through the resolver and the results are
/// concatenated in input order, so the output is deterministic. The whole
/// list then passes once through the customizer and finally through the
/// name filter. A filter that matches nothing is not an error: a warning is
/// emitted and the empty list is returned for the caller to judge.
pub fn resolve_images(
    images: Option<Vec<ImageConfiguration>>,
    resolver: &dyn Resolver,
    name_filter: Option<&str>,
    customizer: &dyn Customizer,
) -> Result<Vec<ImageConfiguration>> {
    let resolved = resolve_configuration(resolver, images)?;
    let customized = customizer.customize(resolved);
    let filtered = filter_images(name_filter, &customized);
    if let Some(filter) = name_filter {
        if !customized.is_empty() && filtered.is_empty() {
            warn!(
                "None of the resolved images [{}] match the configured filter '{}'",
                customized.iter().map(|image| image.name.as_str()).join(","),
                filter
            );
        }
    }
    Ok(filtered)
}

/// Filter image configurations on name. The filter is either `None` (keep
/// everything) or a comma separated list of names and aliases to keep.
/// Filtering never reorders, it only drops entries.
pub fn filter_images(
    name_filter: Option<&str>,
    images: &[ImageConfiguration],
) -> Vec<ImageConfiguration> {
    images
        .iter()
        .filter(|image| matches_configured_images(name_filter, image))
        .cloned()
        .collect()
}

/// Check whether a single image passes the comma separated name filter.
/// A missing filter matches everything.
pub fn matches_configured_images(name_filter: Option<&str>, image: &ImageConfiguration) -> bool {
    let Some(filter) = name_filter else {
        return true;
    };
    let allowed: HashSet<&str> = filter.split(',').map(str::trim).collect();
    allowed.contains(image.name.as_str())
        || image
            .alias
            .as_deref()
            .is_some_and(|alias| allowed.contains(alias))
}

fn resolve_configuration(
    resolver: &dyn Resolver,
    unresolved: Option<Vec<ImageConfiguration>>,
) -> Result<Vec<ImageConfiguration>> {
    let mut resolved = Vec::new();
    for image in unresolved.unwrap_or_default() {
        resolved.extend(resolver.resolve(&image));
    }
    verify_image_names(&resolved)?;
    Ok(resolved)
}

fn verify_image_names(images: &[ImageConfiguration]) -> Result<()> {
    for image in images {
        if image.name.is_empty() {
            return Err(Error::MissingImageName);
        }
    }
    Ok(())
}
