// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Configure iOS application projects for Intune mobile application management.

An app using the Intune App SDK needs its Xcode project, `Info.plist`, and
entitlements patched before it is built: keychain groups shared with the
Microsoft authentication stack, `-intunemam` URL scheme variants, query
schemes, relocated launch storyboards, and the `IntuneMAMSettings`
dictionary. This crate performs those changes on the output of a Cordova
iOS platform build (or any similarly laid out project).

[configure_intune_mam] performs a complete run. The individual steps in
[configure] and the primitives in [modification] can be used on their own.
Every change is idempotent, so running against an already configured
project is harmless.
*/

pub mod configure;
pub use configure::*;
pub mod configurator;
mod error;
pub use error::*;
pub mod modification;
mod plist_file;
pub use plist_file::*;
mod settings;
pub use settings::*;

#[cfg(test)]
mod testutil;
