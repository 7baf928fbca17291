use std::collections::{BTreeMap, HashMap};

use crate::config::ImageConfiguration;
use crate::{Error, Result, EXTERNAL_CONFIG_ACTIVATION_PROPERTY};

/// Sentinel value disabling a globally set activation property in a more
/// local context.
const SKIP: &str = "skip";

const EXTERNAL_TYPE_KEY: &str = "type";
const EXTERNAL_PREFIX_KEY: &str = "prefix";
const PROPERTIES_TYPE: &str = "properties";

/// Merged view over project declared properties and process level
/// overrides. Lookups consult the overrides first.
#[derive(Clone, Debug, Default)]
pub struct ProjectProperties {
    project: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ProjectProperties {
    pub fn new(project: HashMap<String, String>, overrides: HashMap<String, String>) -> Self {
        Self { project, overrides }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.overrides
            .get(key)
            .or_else(|| self.project.get(key))
            .map(String::as_str)
    }

    /// The value of the external-config activation property, with the
    /// `skip` sentinel mapped back to "not set".
    pub fn external_config_activation_property(&self) -> Option<&str> {
        let value = self.get(EXTERNAL_CONFIG_ACTIVATION_PROPERTY)?;
        if value.eq_ignore_ascii_case(SKIP) {
            return None;
        }
        Some(value)
    }
}

/// Fail when more than one image would be implicitly reconfigured by a
/// globally set activation property.
///
/// With a single image there is no ambiguity and any property value goes.
/// With several, every image except at most one must carry its own
/// explicitly scoped external configuration, otherwise the same process
/// wide switch would silently control unrelated image definitions.
pub fn validate_external_property_activation(
    properties: &ProjectProperties,
    images: &[ImageConfiguration],
) -> Result<()> {
    if properties.external_config_activation_property().is_none() {
        return Ok(());
    }

    if images.len() == 1 {
        return Ok(());
    }

    let affected = images
        .iter()
        .filter(|image| {
            !can_coexist_with_other_property_configured_images(image.external.as_ref())
        })
        .count();
    if affected > 1 {
        return Err(Error::AmbiguousPropertyActivation(
            EXTERNAL_CONFIG_ACTIVATION_PROPERTY.to_string(),
        ));
    }
    Ok(())
}

/// Whether an image with this external config can live next to other images
/// while the activation property is set.
///
/// An image without any external config would be captured by the bare
/// global switch. Config loaded through a non-property handler is
/// unaffected by the switch entirely, and property based config with an
/// explicit prefix is scoped away from it.
pub fn can_coexist_with_other_property_configured_images(
    external: Option<&BTreeMap<String, String>>,
) -> bool {
    let Some(external) = external else {
        return false;
    };
    if external.is_empty() {
        return false;
    }
    match external.get(EXTERNAL_TYPE_KEY) {
        Some(handler) if handler == PROPERTIES_TYPE => {
            external.contains_key(EXTERNAL_PREFIX_KEY)
        }
        _ => true,
    }
}
