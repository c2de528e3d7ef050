// build identification shown by `--version`

/// Version information baked in at compile time
///
/// The semantic version always comes from Cargo.toml. Git details are filled in by build.rs
/// and are absent when the crate was built outside of a git checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildVersion {
    /// Semantic version from Cargo.toml (e.g., "0.4.0")
    pub semantic: &'static str,
    /// Git describe output (e.g., "v0.3.1-7-g644da27")
    pub git_describe: Option<&'static str>,
    /// Full git commit hash
    pub git_hash: Option<&'static str>,
}

impl BuildVersion {
    pub fn current() -> Self {
        Self {
            semantic: env!("CARGO_PKG_VERSION"),
            git_describe: option_env!("LOGSYNC_GIT_DESCRIBE"),
            git_hash: option_env!("LOGSYNC_GIT_HASH"),
        }
    }
}

impl std::fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.semantic)?;
        if let Some(describe) = self.git_describe {
            write!(f, " (git: {describe})")?;
        }
        if let Some(hash) = self.git_hash {
            write!(f, "\ncommit: {hash}")?;
        }
        Ok(())
    }
}

static LONG_VERSION: std::sync::LazyLock<String> =
    std::sync::LazyLock::new(|| BuildVersion::current().to_string());

/// Version string suitable for clap's `long_version`
pub fn long_version() -> &'static str {
    LONG_VERSION.as_str()
}
