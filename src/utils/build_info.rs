/// Compile-time build metadata produced by `build.rs`.
#[derive(Debug, Clone, Copy)]
pub struct BuildMetadata {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_status: &'static str,
    pub timestamp: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc: &'static str,
}

macro_rules! baked {
    ($key:literal) => {
        match option_env!(concat!("CLUB_CORE_BUILD_", $key)) {
            Some(value) => value,
            None => "unknown",
        }
    };
}

impl BuildMetadata {
    pub fn is_dirty(&self) -> bool {
        self.git_status == "dirty"
    }

    /// Label/value pairs for the `version` command.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let hash = if self.is_dirty() {
            format!("{}+dirty", self.git_hash)
        } else {
            self.git_hash.to_string()
        };
        vec![
            ("Build hash", hash),
            ("Built at", self.timestamp.to_string()),
            ("Target", format!("{} [{}]", self.target, self.profile)),
            ("Rustc", self.rustc.to_string()),
        ]
    }
}

pub fn current() -> BuildMetadata {
    BuildMetadata {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: baked!("HASH"),
        git_status: baked!("STATUS"),
        timestamp: baked!("TIMESTAMP"),
        target: baked!("TARGET"),
        profile: baked!("PROFILE"),
        rustc: baked!("RUSTC"),
    }
}
