use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// The configuration artifact is missing or not writable. Fatal for the whole run.
	#[error("configuration artifact not found or not writable: {}", path.display())]
	ConfigNotFound { path: PathBuf },
	#[error("constant `{name}` is not declared in {}", path.display())]
	MissingConstant { name: &'static str, path: PathBuf },
	/// A build/run step failed. Recorded per sweep point, never fatal.
	#[error("external runner: {0}")]
	Runner(String),
	#[error("config: {0}")]
	Config(String),
	#[error("toml: {0}")]
	Toml(#[from] toml::de::Error),
	#[error("pattern: {0}")]
	Pattern(#[from] regex::Error),
	#[error("chart: {0}")]
	Chart(String),
}

impl Error {
	pub fn config(msg: impl Into<String>) -> Self { Self::Config(msg.into()) }
	pub fn runner(msg: impl Into<String>) -> Self { Self::Runner(msg.into()) }
	pub fn chart(msg: impl Into<String>) -> Self { Self::Chart(msg.into()) }
}
