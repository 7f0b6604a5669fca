mod raw {
    // See https://docs.rs/built/latest/built/index.html for the full list of constants in built.rs.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// tracetag crate version such as 0.1.0
pub const TRACETAG_PKG_VERSION: &str = raw::PKG_VERSION;

/// Comma separated features enabled for this build
pub const TRACETAG_FEATURES: &str = raw::FEATURES_STR;

/// Endianness of the build target. The flag word's byte offsets are selected by it.
pub const TRACETAG_TARGET_ENDIAN: &str = raw::CFG_ENDIAN;

lazy_static! {
    /// Git version such as a96e8f991c91a81df51e7975849441f52fdbcdcc, or a96e8f991c91a81df51e7975849441f52fdbcdcc-dirty,
    /// or unknown-git-version if tracetag is not built from a git repo.
    pub static ref TRACETAG_GIT_VERSION: &'static str = &TRACETAG_GIT_VERSION_STRING;

    // Owned string
    static ref TRACETAG_GIT_VERSION_STRING: String = match (raw::GIT_COMMIT_HASH, raw::GIT_DIRTY) {
        (Some(hash), dirty) => format!("{}{}", hash, if dirty == Some(true) { "-dirty" } else { "" }),
        (None, _) => "unknown-git-version".to_string(),
    };

    /// Full build info, including tracetag's name, version, git, features and target endianness.
    pub static ref TRACETAG_FULL_BUILD_INFO: String = format!(
        "tracetag {} ({}, [{}], {}-endian)",
        TRACETAG_PKG_VERSION,
        *TRACETAG_GIT_VERSION,
        TRACETAG_FEATURES,
        TRACETAG_TARGET_ENDIAN,
    );
}
