//! Resample pipeline configuration

use crate::config::env_var;
use crate::data::Timeframe;
use crate::error::KlineError;
use crate::resample::ResampleTarget;
use crate::Result;
use std::path::PathBuf;
use std::str::FromStr;

/// Resample configuration
#[derive(Debug, Clone)]
pub struct ResampleConfig {
    /// Base-granularity CSV to read
    pub input: PathBuf,
    /// Output directory, defaults to the input's directory
    pub output_dir: Option<PathBuf>,
    /// Granularity of the input file
    pub base: Timeframe,
    pub targets: Vec<ResampleTarget>,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("BTCUSDT_1min_20231201_to_20241201.csv"),
            output_dir: Some(PathBuf::from("timeframes")),
            base: Timeframe::Min1,
            targets: ResampleTarget::defaults(),
        }
    }
}

impl ResampleConfig {
    /// Load from `RESAMPLE_*` environment variables (and `.env`)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let targets = match env_var("RESAMPLE_TARGETS") {
            Some(list) => list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(ResampleTarget::from_str)
                .collect::<Result<Vec<_>>>()?,
            None => defaults.targets,
        };
        let base = match env_var("RESAMPLE_BASE") {
            Some(raw) => raw.parse()?,
            None => defaults.base,
        };

        let config = Self {
            input: env_var("RESAMPLE_INPUT")
                .map(PathBuf::from)
                .unwrap_or(defaults.input),
            output_dir: env_var("RESAMPLE_OUTPUT_DIR")
                .map(PathBuf::from)
                .or(defaults.output_dir),
            base,
            targets,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration
    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(KlineError::config("no resample targets configured"));
        }
        let base = self.base.minutes().ok_or_else(|| {
            KlineError::config(format!("base timeframe {} has no fixed length", self.base))
        })?;
        for target in &self.targets {
            // calendar targets accept any base up to a day
            let coarser = match target.timeframe.minutes() {
                Some(minutes) => minutes >= base && minutes % base == 0,
                None => base <= 1440,
            };
            if !coarser {
                return Err(KlineError::config(format!(
                    "target {} is not a multiple of base {}",
                    target, self.base
                )));
            }
        }
        Ok(())
    }

    /// Directory the outputs are written to
    pub fn resolved_output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => self
                .input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}
