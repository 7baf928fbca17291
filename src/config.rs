use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::name::{self, NameFormatter};
use crate::version::ApiVersion;
use crate::{Error, Result};

/// One build target: the image to produce, how to build it and how it is
/// meant to be run.
///
/// Authored configuration deserializes directly into this struct. A
/// [`Resolver`](crate::resolve::Resolver) may later expand a single authored
/// entry into several concrete ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfiguration {
    /// Full image name, e.g. `registry.example.com/acme/frontend:1.2.3`.
    /// May be empty while authored; must be non-empty once resolved.
    #[serde(default)]
    pub name: String,

    /// Shorthand accepted by name filters in place of the full name.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Opaque reference to an external configuration source. Only the
    /// activation validator looks inside, and only at the `type` and
    /// `prefix` keys.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<BTreeMap<String, String>>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfiguration>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunConfiguration>,
}

impl ImageConfiguration {
    /// Format the image name, validate both sections and return the minimum
    /// API version this image needs, if any section demands one.
    pub fn init_and_validate(
        &mut self,
        name_formatter: &dyn NameFormatter,
    ) -> Result<Option<ApiVersion>> {
        self.name = name_formatter.format(&self.name)?;
        name::validate_name(&self.name)?;

        let build_min = match &mut self.build {
            Some(build) => build.init_and_validate(&self.name)?,
            None => None,
        };
        let run_min = match &self.run {
            Some(run) => run.init_and_validate(&self.name)?,
            None => None,
        };
        Ok(build_min.max(run_min))
    }
}

/// How the image is built.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfiguration {
    /// Base image of the build.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Path to the Dockerfile to build from.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,

    /// Directory used as the build context.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_dir: Option<String>,

    /// Pre-built image archive to load instead of running a build.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthCheckConfiguration>,
}

impl BuildConfiguration {
    fn init_and_validate(&mut self, image: &str) -> Result<Option<ApiVersion>> {
        if self.dockerfile.is_some() && self.archive.is_some() {
            return Err(Error::DockerfileAndArchive(image.to_string()));
        }

        let mut min: Option<ApiVersion> = None;
        if !self.args.is_empty() {
            min = min.max(Some("1.21".parse()?));
        }
        if let Some(healthcheck) = &mut self.healthcheck {
            healthcheck.init_and_validate(image)?;
            min = min.max(Some("1.24".parse()?));
        }
        Ok(min)
    }
}

/// How a container created from the image is supposed to run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfiguration {
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Port bindings in `host:container` or plain `container` form.
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,

    /// Signal sent to the container on stop instead of SIGKILL.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_signal: Option<String>,

    /// Remove the container when it exits.
    #[serde(default)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub auto_remove: bool,
}

impl RunConfiguration {
    fn init_and_validate(&self, image: &str) -> Result<Option<ApiVersion>> {
        for mapping in &self.ports {
            validate_port_mapping(image, mapping)?;
        }

        let mut min: Option<ApiVersion> = None;
        if self.stop_signal.is_some() {
            min = min.max(Some("1.21".parse()?));
        }
        if self.auto_remove {
            min = min.max(Some("1.25".parse()?));
        }
        Ok(min)
    }
}

fn validate_port_mapping(image: &str, mapping: &str) -> Result<()> {
    let parts: Vec<&str> = mapping.split(':').collect();
    let valid = match parts.as_slice() {
        [container] => container.parse::<u16>().is_ok(),
        [host, container] => host.parse::<u16>().is_ok() && container.parse::<u16>().is_ok(),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidPortMapping {
            image: image.to_string(),
            mapping: mapping.to_string(),
        })
    }
}

/// Container healthcheck settings, mirroring the Dockerfile `HEALTHCHECK`
/// instruction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckConfiguration {
    /// Defaults to `cmd` when a command is given.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<HealthCheckMode>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_period: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckMode {
    /// Run a command inside the container to probe its health.
    #[default]
    Cmd,
    /// Disable any healthcheck inherited from the base image.
    None,
}

impl HealthCheckConfiguration {
    fn init_and_validate(&mut self, image: &str) -> Result<()> {
        if self.mode.is_none() && self.cmd.is_some() {
            self.mode = Some(HealthCheckMode::Cmd);
        }
        match self.mode.unwrap_or_default() {
            HealthCheckMode::Cmd => {
                if self.cmd.is_none() {
                    return Err(Error::HealthCheckMissingCmd(image.to_string()));
                }
            }
            HealthCheckMode::None => {
                if self.cmd.is_some()
                    || self.interval.is_some()
                    || self.timeout.is_some()
                    || self.start_period.is_some()
                    || self.retries.is_some()
                {
                    return Err(Error::HealthCheckOptionsInNoneMode(image.to_string()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name;
    use assert_matches::assert_matches;

    fn image(yaml: &str) -> ImageConfiguration {
        serde_yaml::from_str(yaml).expect("fixture must deserialize")
    }

    #[test]
    fn minimal_image_requires_nothing() {
        let mut img = image("name: docker.io/library/busybox:stable");
        let min = img.init_and_validate(&name::Identity).expect("valid");
        assert_eq!(min, None);
    }

    #[test]
    fn name_formatter_is_applied_before_validation() {
        let mut img = image("name: busybox:%v");
        let formatter =
            |name: &str| -> crate::Result<String> { Ok(name.replace("%v", "1.36.0")) };
        img.init_and_validate(&formatter).expect("valid");
        assert_eq!(img.name, "busybox:1.36.0");
    }

    #[test]
    fn invalid_name_is_fatal() {
        let mut img = image("name: BUSYBOX:stable");
        assert_matches!(
            img.init_and_validate(&name::Identity),
            Err(Error::InvalidImageName { name, .. }) if name == "BUSYBOX:stable"
        );
    }

    #[test]
    fn dockerfile_and_archive_conflict() {
        let mut img = image(
            r#"
            name: acme/app
            build:
              dockerfile: Dockerfile
              archive: app.tar.gz
            "#,
        );
        assert_matches!(
            img.init_and_validate(&name::Identity),
            Err(Error::DockerfileAndArchive(image)) if image == "acme/app"
        );
    }

    #[test]
    fn build_args_need_1_21() {
        let mut img = image(
            r#"
            name: acme/app
            build:
              args:
                HTTP_PROXY: http://proxy.example.com
            "#,
        );
        let min = img.init_and_validate(&name::Identity).expect("valid");
        assert_eq!(min, Some("1.21".parse().unwrap()));
    }

    #[test]
    fn healthcheck_needs_1_24_and_defaults_to_cmd_mode() {
        let mut img = image(
            r#"
            name: acme/app
            build:
              healthcheck:
                cmd: curl -f http://localhost:8080/healthz
            "#,
        );
        let min = img.init_and_validate(&name::Identity).expect("valid");
        assert_eq!(min, Some("1.24".parse().unwrap()));
        let healthcheck = img.build.unwrap().healthcheck.unwrap();
        assert_eq!(healthcheck.mode, Some(HealthCheckMode::Cmd));
    }

    #[test]
    fn healthcheck_cmd_mode_requires_a_command() {
        let mut img = image(
            r#"
            name: acme/app
            build:
              healthcheck:
                retries: 3
            "#,
        );
        assert_matches!(
            img.init_and_validate(&name::Identity),
            Err(Error::HealthCheckMissingCmd(_))
        );
    }

    #[test]
    fn healthcheck_none_mode_forbids_options() {
        let mut img = image(
            r#"
            name: acme/app
            build:
              healthcheck:
                mode: none
                retries: 3
            "#,
        );
        assert_matches!(
            img.init_and_validate(&name::Identity),
            Err(Error::HealthCheckOptionsInNoneMode(_))
        );
    }

    #[test]
    fn auto_remove_wins_over_healthcheck() {
        let mut img = image(
            r#"
            name: acme/app
            build:
              healthcheck:
                cmd: curl -f http://localhost:8080/healthz
            run:
              autoRemove: true
            "#,
        );
        let min = img.init_and_validate(&name::Identity).expect("valid");
        assert_eq!(min, Some("1.25".parse().unwrap()));
    }

    #[test]
    fn stop_signal_needs_1_21() {
        let mut img = image(
            r#"
            name: acme/app
            run:
              stopSignal: SIGTERM
            "#,
        );
        let min = img.init_and_validate(&name::Identity).expect("valid");
        assert_eq!(min, Some("1.21".parse().unwrap()));
    }

    #[test]
    fn port_mappings_are_checked() {
        let mut img = image(
            r#"
            name: acme/app
            run:
              ports:
                - "8080:80"
                - "9090"
            "#,
        );
        img.init_and_validate(&name::Identity).expect("valid");

        let mut img = image(
            r#"
            name: acme/app
            run:
              ports:
                - "http:80"
            "#,
        );
        assert_matches!(
            img.init_and_validate(&name::Identity),
            Err(Error::InvalidPortMapping { mapping, .. }) if mapping == "http:80"
        );
    }

    #[test]
    fn serialization_skips_absent_sections() {
        let img = image("name: acme/app");
        let json = serde_json::to_value(&img).expect("serializable");
        assert_eq!(json, serde_json::json!({"name": "acme/app"}));
    }

    #[test]
    fn serde_field_names_are_camel_case() {
        let img = image(
            r#"
            name: acme/app
            build:
              contextDir: ./app
              healthcheck:
                startPeriod: 5s
                cmd: /bin/probe
            run:
              stopSignal: SIGINT
              autoRemove: true
            "#,
        );
        assert_eq!(img.build.as_ref().unwrap().context_dir.as_deref(), Some("./app"));
        assert!(img.run.as_ref().unwrap().auto_remove);
    }
}
