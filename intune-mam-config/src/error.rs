// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use {std::path::PathBuf, thiserror::Error, xcode_project::XcodeProjectError};

/// Unified error type for Intune MAM configuration.
#[derive(Debug, Error)]
pub enum MamConfigError {
    #[error("unknown command")]
    CliUnknownCommand,

    #[error("bad argument: {0}")]
    CliBadArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("plist error: {0}")]
    Plist(#[from] plist::Error),

    #[error("Xcode project error: {0}")]
    Xcode(#[from] XcodeProjectError),

    #[error("undefined argument {0}")]
    MissingArgument(&'static str),

    #[error("invalid argument {0}")]
    InvalidArgument(String),

    #[error("{key} is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("{0} does not contain a dictionary")]
    NotADictionary(PathBuf),

    #[error("build configuration {0} does not define INFOPLIST_FILE")]
    MissingInfoPlist(String),

    #[error("{0} was not loaded")]
    FileNotLoaded(String),

    #[error("{0} is used as both a plist and an entitlements file")]
    SameFile(String),

    #[error("no .xcodeproj found in {0}")]
    ProjectNotFound(PathBuf),

    #[error("configurator exited with {status} for {plist}")]
    ConfiguratorFailed { plist: PathBuf, status: String },
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, MamConfigError>;
