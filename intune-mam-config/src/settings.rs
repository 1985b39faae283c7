// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Settings controlling a configuration run.

use {
    crate::error::{MamConfigError, Result},
    log::info,
    std::path::{Path, PathBuf},
    xcode_project::XcodeProject,
};

/// Default location of the iOS platform output relative to the app root.
pub const DEFAULT_PLATFORM_DIR: &str = "platforms/ios";

/// Settings for configuring an iOS project for Intune MAM.
///
/// Plist and entitlements paths found in the Xcode project are resolved
/// relative to [Self::platform_dir].
#[derive(Clone, Debug)]
pub struct MamSettings {
    platform_dir: PathBuf,
    project_path: Option<PathBuf>,
    configurator: Option<PathBuf>,
    header_search_paths: Vec<String>,
    library_search_paths: Vec<String>,
    force_load_libraries: Vec<String>,
    linker_flags: Vec<String>,
    disable_bitcode: bool,
    enable_keychain_sharing: bool,
}

impl Default for MamSettings {
    fn default() -> Self {
        Self {
            platform_dir: PathBuf::from(DEFAULT_PLATFORM_DIR),
            project_path: None,
            configurator: None,
            header_search_paths: vec![],
            library_search_paths: vec![],
            force_load_libraries: vec![],
            linker_flags: vec![],
            disable_bitcode: false,
            enable_keychain_sharing: false,
        }
    }
}

impl MamSettings {
    pub fn platform_dir(&self) -> &Path {
        &self.platform_dir
    }

    pub fn set_platform_dir(&mut self, path: impl Into<PathBuf>) {
        self.platform_dir = path.into();
    }

    /// Explicit path to a `project.pbxproj` or `.xcodeproj` directory.
    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    pub fn set_project_path(&mut self, path: impl Into<PathBuf>) {
        self.project_path = Some(path.into());
    }

    /// Path to the `IntuneMAMConfigurator` executable.
    pub fn configurator(&self) -> Option<&Path> {
        self.configurator.as_deref()
    }

    pub fn set_configurator(&mut self, path: impl Into<PathBuf>) {
        self.configurator = Some(path.into());
    }

    pub fn header_search_paths(&self) -> &[String] {
        &self.header_search_paths
    }

    pub fn add_header_search_path(&mut self, path: impl ToString) {
        self.header_search_paths.push(path.to_string());
    }

    pub fn library_search_paths(&self) -> &[String] {
        &self.library_search_paths
    }

    pub fn add_library_search_path(&mut self, path: impl ToString) {
        self.library_search_paths.push(path.to_string());
    }

    pub fn force_load_libraries(&self) -> &[String] {
        &self.force_load_libraries
    }

    pub fn add_force_load_library(&mut self, library: impl ToString) {
        self.force_load_libraries.push(library.to_string());
    }

    pub fn linker_flags(&self) -> &[String] {
        &self.linker_flags
    }

    pub fn add_linker_flag(&mut self, flag: impl ToString) {
        self.linker_flags.push(flag.to_string());
    }

    pub fn disable_bitcode(&self) -> bool {
        self.disable_bitcode
    }

    pub fn set_disable_bitcode(&mut self, value: bool) {
        self.disable_bitcode = value;
    }

    pub fn enable_keychain_sharing(&self) -> bool {
        self.enable_keychain_sharing
    }

    pub fn set_enable_keychain_sharing(&mut self, value: bool) {
        self.enable_keychain_sharing = value;
    }

    /// Resolve the path to the `project.pbxproj` to operate on.
    ///
    /// An explicit project path wins. It may name the `.xcodeproj` directory
    /// or the `project.pbxproj` inside it. Otherwise the first `.xcodeproj`
    /// directory (sorted by name) in the platform directory is used.
    pub fn resolve_project_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.project_path {
            return Ok(if path.is_dir() {
                path.join("project.pbxproj")
            } else {
                path.clone()
            });
        }

        let mut candidates = std::fs::read_dir(&self.platform_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_dir() && path.extension().and_then(|e| e.to_str()) == Some("xcodeproj")
            })
            .collect::<Vec<_>>();
        candidates.sort();

        candidates
            .into_iter()
            .next()
            .map(|path| path.join("project.pbxproj"))
            .ok_or_else(|| MamConfigError::ProjectNotFound(self.platform_dir.clone()))
    }

    /// Load the Xcode project these settings refer to.
    pub fn load_project(&self) -> Result<XcodeProject> {
        let path = self.resolve_project_path()?;
        info!("loading Xcode project {}", path.display());

        Ok(XcodeProject::from_path(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = MamSettings::default();

        assert_eq!(settings.platform_dir(), Path::new("platforms/ios"));
        assert!(settings.project_path().is_none());
        assert!(settings.configurator().is_none());
        assert!(!settings.disable_bitcode());
        assert!(!settings.enable_keychain_sharing());
    }

    #[test]
    fn resolve_project_path() -> Result<()> {
        let td = tempfile::Builder::new()
            .prefix("intune-mam-config-test")
            .tempdir()?;

        let mut settings = MamSettings::default();
        settings.set_platform_dir(td.path());

        assert!(matches!(
            settings.resolve_project_path(),
            Err(MamConfigError::ProjectNotFound(_))
        ));

        std::fs::create_dir(td.path().join("Zeta.xcodeproj"))?;
        std::fs::create_dir(td.path().join("HelloCordova.xcodeproj"))?;
        std::fs::write(td.path().join("Other.xcodeproj"), b"not a directory")?;

        assert_eq!(
            settings.resolve_project_path()?,
            td.path().join("HelloCordova.xcodeproj").join("project.pbxproj")
        );

        settings.set_project_path(td.path().join("Zeta.xcodeproj"));
        assert_eq!(
            settings.resolve_project_path()?,
            td.path().join("Zeta.xcodeproj").join("project.pbxproj")
        );

        Ok(())
    }
}
