pub mod context;
pub mod from_env;
pub mod source;

pub use context::ConfigContext;
use thiserror::Error;

/// Error that would be returned from [`GenerateConfig::generate_config`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("value for {1:?} not provided in {0:?} (env override {2:?})")]
    ValueNotProvided(&'static str, &'static str, Option<&'static str>),

    #[error("value {0:?} for {1:?} is invalid.")]
    InvalidValue(String, &'static str),

    #[error("conflicting values in {0:?}: {1}")]
    Conflict(&'static str, String),

    #[error("cubeproxy-config: IO operation failed with `{0}`")]
    Io(#[from] std::io::Error),

    #[error("cubeproxy-config: `{0}`!")]
    SerdeJson(#[from] serde_json::Error),

    #[error("cubeproxy-config: `{0}`!")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("cubeproxy-config: unsupported configuration file format `{0:?}`!")]
    UnsupportedFormat(Option<String>),
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Turns a file-level (partial) config into the resolved config the rest of the code uses.
pub trait GenerateConfig {
    /// The resulting struct you plan on using in the rest of your code
    type Generated;

    /// Load configuration from all sources and output as [`Self::Generated`]
    fn generate_config(self, context: &mut ConfigContext) -> Result<Self::Generated>;
}

impl<T> GenerateConfig for Option<T>
where
    T: GenerateConfig + Default,
{
    type Generated = T::Generated;

    fn generate_config(self, context: &mut ConfigContext) -> Result<Self::Generated> {
        self.unwrap_or_default().generate_config(context)
    }
}
