use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::Parser;
use serde::Deserialize;

use crate::grading::{Grader, GradingLimits, ProcessRunner};

#[derive(Parser)]
#[command(name = "grader", version = "1.0", about, long_about = None)]
pub struct CliArgs {
    /// Path to the configuration file
    #[arg(long = "config", short = 'c')]
    pub config_path: String,

    /// Number of grading sessions that may run at the same time
    #[arg(long = "workers", short = 'w', default_value_t = 4)]
    pub workers: u8,
}

impl CliArgs {
    /// Load the configuration from the specified file
    pub fn to_config(&self) -> anyhow::Result<Config> {
        let file = std::fs::File::open(&self.config_path)
            .with_context(|| format!("Failed to open config file {}", self.config_path))?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).context("Failed to parse config file")
    }
}

#[derive(Deserialize, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub grading: GradingConfig,
}

#[derive(Deserialize, Debug)]
pub struct ServerConfig {
    pub bind_address: Option<String>,
    pub bind_port: Option<u16>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GradingConfig {
    /// Program that runs submissions, invoked as `<interpreter> <artifact> <fixture>`
    pub interpreter: String,
    /// Root of the per-exercise fixture directories
    pub fixtures_dir: Option<PathBuf>,
    /// Where submissions are staged while being graded
    pub staging_dir: Option<PathBuf>,
    pub case_timeout: MilliSecond,
    pub session_timeout: MilliSecond,
}

impl GradingConfig {
    pub fn fixtures_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.fixtures_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_fixtures_dir(),
        }
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn limits(&self) -> GradingLimits {
        GradingLimits {
            case_timeout: self.case_timeout.into(),
            session_timeout: self.session_timeout.into(),
        }
    }

    /// Builds the grader described by this section
    pub fn build_grader(&self) -> anyhow::Result<Grader> {
        Ok(Grader::new(
            ProcessRunner::new(&self.interpreter),
            self.fixtures_dir()?,
            self.staging_dir(),
            self.limits(),
        ))
    }
}

fn default_fixtures_dir() -> anyhow::Result<PathBuf> {
    use directories::ProjectDirs;

    let proj_dirs = ProjectDirs::from("", "", "grader")
        .ok_or_else(|| anyhow!("Unable to find user directory"))?;

    Ok(proj_dirs.data_local_dir().join("exercises"))
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MilliSecond(pub u64);

impl From<MilliSecond> for Duration {
    fn from(value: MilliSecond) -> Self {
        Duration::from_millis(value.0)
    }
}
