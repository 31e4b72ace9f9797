//! Configuration loading for the CLI.
//!
//! The parsed command line is restated as long flags by
//! `GlobalOptions::config_arguments` and handed to `ortho_config`, which
//! layers them over any configuration file, the `QTH_*` environment and the
//! compiled-in defaults.

use std::ffi::OsString;

use ortho_config::OrthoConfig;
use qth_config::Config;

use crate::AppError;

pub(crate) trait ConfigLoader {
    /// Loads configuration from the configuration arguments of one
    /// invocation.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}
