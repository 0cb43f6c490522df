//! Handle on the protocol's build-time constants header.
//!
//! The header declares `constexpr uint32_t M = <int>;` (and `N`, `K`, `Q`). Applying a
//! [`SweepParams`] replaces only the integer literals; every other byte is left alone.

use crate::error::{Error, Result};
use crate::types::SweepParams;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::{fs, path::{Path, PathBuf}};
use tracing::{debug, info};

pub const CONSTANT_NAMES: [&str; 4] = ["M", "N", "K", "Q"];

static DECLARATIONS: Lazy<[Regex; 4]> = Lazy::new(|| {
	CONSTANT_NAMES.map(|name| {
		Regex::new(&format!(r"(constexpr\s+uint32_t\s+{name}\s*=\s*)(\d+)(\s*;)")).expect("static declaration pattern")
	})
});

fn values(p: &SweepParams) -> [u32; 4] { [p.m, p.n, p.k, p.q] }

/// Rewrite every declaration of the four constants in `text` with the values of `params`.
pub fn rewrite(text: &str, params: &SweepParams) -> String {
	let mut out = text.to_string();
	for (re, value) in DECLARATIONS.iter().zip(values(params)) {
		out = re.replace_all(&out, |caps: &Captures| format!("{}{}{}", &caps[1], value, &caps[3])).into_owned();
	}
	out
}

/// Read the four constants back. `None` when any declaration is absent or out of range.
pub fn parse(text: &str) -> Option<SweepParams> {
	let mut v = [0u32; 4];
	for (slot, re) in v.iter_mut().zip(DECLARATIONS.iter()) {
		*slot = re.captures(text)?.get(2)?.as_str().parse().ok()?;
	}
	Some(SweepParams::new(v[0], v[1], v[2], v[3]))
}

fn check_declared(text: &str, path: &Path) -> Result<()> {
	for (&name, re) in CONSTANT_NAMES.iter().zip(DECLARATIONS.iter()) {
		if !re.is_match(text) {
			return Err(Error::MissingConstant { name, path: path.to_path_buf() });
		}
	}
	Ok(())
}

/// Explicit handle on the configuration artifact, passed by reference to whoever mutates it.
#[derive(Debug, Clone)]
pub struct ConstantsFile {
	path: PathBuf,
}

impl ConstantsFile {
	/// Open the artifact. It must exist, be writable and declare all four constants.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
		let path = path.into();
		let not_found = || Error::ConfigNotFound { path: path.clone() };
		let meta = fs::metadata(&path).map_err(|_| not_found())?;
		if !meta.is_file() || meta.permissions().readonly() { return Err(not_found()); }
		let text = fs::read_to_string(&path).map_err(|_| not_found())?;
		check_declared(&text, &path)?;
		debug!(path = %path.display(), "opened constants header");
		Ok(Self { path })
	}

	pub fn path(&self) -> &Path { &self.path }

	/// Write `params` into the artifact. Re-applying the same params is byte-identical.
	pub fn apply(&self, params: &SweepParams) -> Result<()> {
		let not_found = || Error::ConfigNotFound { path: self.path.clone() };
		let text = fs::read_to_string(&self.path).map_err(|_| not_found())?;
		fs::write(&self.path, rewrite(&text, params)).map_err(|_| not_found())?;
		info!("updated {}: {params}", self.path.display());
		Ok(())
	}

	/// Current values in the artifact.
	pub fn read(&self) -> Result<SweepParams> {
		let text = fs::read_to_string(&self.path).map_err(|_| Error::ConfigNotFound { path: self.path.clone() })?;
		check_declared(&text, &self.path)?;
		parse(&text).ok_or_else(|| Error::config(format!("constant out of range in {}", self.path.display())))
	}
}
