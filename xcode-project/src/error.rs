// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use {std::path::PathBuf, thiserror::Error};

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum XcodeProjectError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("project.pbxproj parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("project.pbxproj root is not a dictionary")]
    RootNotDictionary,

    #[error("project does not define {0}")]
    MissingObject(String),

    #[error("object {id} is not a {expected}")]
    ObjectType { id: String, expected: &'static str },

    #[error("invalid build configuration {config:?} for {operation}")]
    InvalidConfiguration {
        operation: &'static str,
        config: String,
    },

    #[error("invalid argument {0}")]
    InvalidArgument(&'static str),

    #[error("project does not contain a PBXNativeTarget")]
    NoNativeTarget,

    #[error("bad xcodeproj path: {0}")]
    BadProjectPath(PathBuf),
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, XcodeProjectError>;
