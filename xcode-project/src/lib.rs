// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Read and modify Xcode projects.

Xcode projects (`*.xcodeproj` directories) store their definition in a
`project.pbxproj` file using the legacy ASCII property list syntax. The
[format] module implements a parser and serializer for this syntax and
[XcodeProject] offers typed access to the build configurations, build
settings, groups, and build phases build tooling commonly needs to tweak.
*/

mod error;
pub use error::*;
pub mod format;
mod project;
pub use project::*;
