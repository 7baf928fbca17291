#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Configuration error: every image configuration must have a non-empty name")]
    MissingImageName,

    #[error("Configuration error: cannot use property {0} on projects with multiple images without explicit image external configuration")]
    AmbiguousPropertyActivation(String),

    #[error("Error parsing image name '{name}': {source}")]
    InvalidImageName {
        name: String,
        source: oci_distribution::ParseError,
    },

    #[error("Invalid API version '{0}': expected dotted numeric components")]
    InvalidApiVersion(String),

    #[error("Image '{0}': dockerfile and archive mode cannot be combined")]
    DockerfileAndArchive(String),

    #[error("Image '{0}': healthcheck in command mode requires a command")]
    HealthCheckMissingCmd(String),

    #[error("Image '{0}': healthcheck with mode 'none' must not set any other option")]
    HealthCheckOptionsInNoneMode(String),

    #[error("Image '{image}': invalid port mapping '{mapping}'")]
    InvalidPortMapping { image: String, mapping: String },

    #[error("Error formatting image name '{name}': {reason}")]
    NameFormat { name: String, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Property which activates external configuration through properties for
/// every image at once. Only safe on single image projects.
pub const EXTERNAL_CONFIG_ACTIVATION_PROPERTY: &str = "imageset.imagePropertyConfiguration";

/// The resolution pipeline turning authored configurations into the final,
/// filtered image list.
pub mod resolve;

/// Image configuration model.
pub mod config;

pub mod activation;
pub mod name;
pub mod version;
