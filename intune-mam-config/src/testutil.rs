// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{error::Result, settings::MamSettings},
    std::path::Path,
};

pub const HELLO_CORDOVA_PBXPROJ: &str = include_str!("testdata/HelloCordova.pbxproj");
pub const HELLO_CORDOVA_INFO_PLIST: &str = include_str!("testdata/HelloCordova-Info.plist");
pub const ENTITLEMENTS_RELEASE: &str = include_str!("testdata/Entitlements-Release.plist");

pub const INFO_PLIST_PATH: &str = "HelloCordova/HelloCordova-Info.plist";
pub const RELEASE_ENTITLEMENTS_PATH: &str = "HelloCordova/Entitlements-Release.plist";
pub const CREATED_ENTITLEMENTS_PATH: &str = "HelloCordova/Resources/HelloCordova.entitlements";

pub fn temp_dir() -> Result<tempfile::TempDir> {
    Ok(tempfile::Builder::new()
        .prefix("intune-mam-config-test")
        .tempdir()?)
}

/// Write a Cordova iOS platform directory into `dir`.
pub fn stage_hello_cordova(dir: &Path) -> Result<MamSettings> {
    std::fs::create_dir_all(dir.join("HelloCordova.xcodeproj"))?;
    std::fs::create_dir_all(dir.join("HelloCordova"))?;

    std::fs::write(
        dir.join("HelloCordova.xcodeproj").join("project.pbxproj"),
        HELLO_CORDOVA_PBXPROJ,
    )?;
    std::fs::write(dir.join(INFO_PLIST_PATH), HELLO_CORDOVA_INFO_PLIST)?;
    std::fs::write(dir.join(RELEASE_ENTITLEMENTS_PATH), ENTITLEMENTS_RELEASE)?;

    let mut settings = MamSettings::default();
    settings.set_platform_dir(dir);

    Ok(settings)
}
