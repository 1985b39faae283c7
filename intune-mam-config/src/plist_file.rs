// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `Info.plist` and entitlements files.

use {
    crate::{
        error::{MamConfigError, Result},
        modification::{
            add_to_unique_keyed_array, add_unique_keyed_map, add_unique_keyed_value, string_array,
        },
    },
    log::debug,
    plist::{Dictionary, Value},
    std::path::{Path, PathBuf},
};

/// Prefix Xcode substitutes with the team's app identifier prefix.
pub const APP_IDENTIFIER_PREFIX: &str = "$(AppIdentifierPrefix)";

/// Dictionary in `Info.plist` holding MAM settings.
pub const INTUNE_MAM_SETTINGS: &str = "IntuneMAMSettings";

pub const KEYCHAIN_ACCESS_GROUPS: &str = "keychain-access-groups";
pub const APPLICATION_GROUPS: &str = "com.apple.security.application-groups";
pub const BUNDLE_IDENTIFIER: &str = "CFBundleIdentifier";
pub const BUNDLE_URL_TYPES: &str = "CFBundleURLTypes";
pub const BUNDLE_URL_SCHEMES: &str = "CFBundleURLSchemes";
pub const APPLICATION_QUERIES_SCHEMES: &str = "LSApplicationQueriesSchemes";
pub const MAIN_STORYBOARD: &str = "UIMainStoryboardFile";
pub const MAIN_STORYBOARD_IPAD: &str = "UIMainStoryboardFile~ipad";
pub const MAIN_NIB: &str = "NSMainNibFile";
pub const MAIN_NIB_IPAD: &str = "NSMainNibFile~ipad";

/// A property list file under the platform directory.
///
/// Instances are identified by their path relative to the platform
/// directory, which is how Xcode build settings refer to them.
#[derive(Clone, Debug)]
pub struct PlistFile {
    relative_path: String,
    path: PathBuf,
    data: Dictionary,
}

impl PlistFile {
    /// Construct an instance from already parsed data.
    pub fn new(platform_dir: &Path, relative_path: impl ToString, data: Dictionary) -> Self {
        let relative_path = relative_path.to_string();
        let path = platform_dir.join(&relative_path);

        Self {
            relative_path,
            path,
            data,
        }
    }

    /// Construct an instance holding an empty dictionary.
    pub fn empty(platform_dir: &Path, relative_path: impl ToString) -> Self {
        Self::new(platform_dir, relative_path, Dictionary::new())
    }

    /// Load a property list file relative to a platform directory.
    pub fn load(platform_dir: &Path, relative_path: &str) -> Result<Self> {
        let path = platform_dir.join(relative_path);
        debug!("reading file from path: {}", path.display());

        let data = Value::from_file(&path)?
            .into_dictionary()
            .ok_or_else(|| MamConfigError::NotADictionary(path.clone()))?;

        Ok(Self::new(platform_dir, relative_path, data))
    }

    /// Write the data back to the file it came from, as XML.
    pub fn save(&self) -> Result<()> {
        debug!("writing {}", self.path.display());
        Value::Dictionary(self.data.clone()).to_file_xml(&self.path)?;

        Ok(())
    }

    /// Path relative to the platform directory.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Filesystem path of this file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The parsed content.
    pub fn data(&self) -> &Dictionary {
        &self.data
    }

    fn string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_string)
    }

    /// Add a keychain access group, prefixed with `$(AppIdentifierPrefix)`.
    pub fn add_keychain_access_group(&mut self, group: &str) -> Result<()> {
        if group.is_empty() {
            return Err(MamConfigError::MissingArgument("group"));
        }

        add_to_unique_keyed_array(
            &mut self.data,
            KEYCHAIN_ACCESS_GROUPS,
            Value::from(format!("{}{}", APP_IDENTIFIER_PREFIX, group)),
        )
    }

    /// Entries of `keychain-access-groups`.
    pub fn keychain_access_groups(&self) -> Result<Vec<String>> {
        string_array(&self.data, KEYCHAIN_ACCESS_GROUPS)
    }

    pub fn bundle_identifier(&self) -> Option<&str> {
        self.string(BUNDLE_IDENTIFIER)
    }

    /// The entries of `CFBundleURLTypes`, if defined.
    pub fn url_types(&self) -> Option<&Vec<Value>> {
        self.data.get(BUNDLE_URL_TYPES).and_then(Value::as_array)
    }

    fn url_type_mut(&mut self, index: usize, operation: &str) -> Result<&mut Dictionary> {
        self.data
            .get_mut(BUNDLE_URL_TYPES)
            .and_then(Value::as_array_mut)
            .and_then(|types| types.get_mut(index))
            .and_then(Value::as_dictionary_mut)
            .filter(|url_type| {
                matches!(url_type.get(BUNDLE_URL_SCHEMES), Some(Value::Array(_)))
            })
            .ok_or_else(|| {
                MamConfigError::InvalidArgument(format!("url type {} for {}", index, operation))
            })
    }

    /// The `CFBundleURLSchemes` of the URL type at `index`.
    ///
    /// URL types lacking a `CFBundleURLSchemes` array are an error.
    pub fn url_schemes(&self, index: usize) -> Result<Vec<String>> {
        let url_type = self
            .url_types()
            .and_then(|types| types.get(index))
            .and_then(Value::as_dictionary)
            .filter(|url_type| {
                matches!(url_type.get(BUNDLE_URL_SCHEMES), Some(Value::Array(_)))
            })
            .ok_or_else(|| {
                MamConfigError::InvalidArgument(format!("url type {} for url_schemes", index))
            })?;

        string_array(url_type, BUNDLE_URL_SCHEMES)
    }

    /// Add a scheme to the URL type at `index`.
    pub fn add_url_scheme(&mut self, index: usize, scheme: &str) -> Result<()> {
        let url_type = self.url_type_mut(index, "add_url_scheme")?;

        if scheme.is_empty() {
            return Err(MamConfigError::MissingArgument("scheme"));
        }

        add_to_unique_keyed_array(url_type, BUNDLE_URL_SCHEMES, Value::from(scheme))
    }

    pub fn application_queries_schemes(&self) -> Result<Vec<String>> {
        string_array(&self.data, APPLICATION_QUERIES_SCHEMES)
    }

    pub fn add_application_queries_scheme(&mut self, scheme: &str) -> Result<()> {
        if scheme.is_empty() {
            return Err(MamConfigError::MissingArgument("scheme"));
        }

        add_to_unique_keyed_array(
            &mut self.data,
            APPLICATION_QUERIES_SCHEMES,
            Value::from(scheme),
        )
    }

    pub fn main_storyboard(&self) -> Option<&str> {
        self.string(MAIN_STORYBOARD)
    }

    pub fn main_storyboard_ipad(&self) -> Option<&str> {
        self.string(MAIN_STORYBOARD_IPAD)
    }

    pub fn main_nib(&self) -> Option<&str> {
        self.string(MAIN_NIB)
    }

    pub fn main_nib_ipad(&self) -> Option<&str> {
        self.string(MAIN_NIB_IPAD)
    }

    pub fn delete_main_storyboard(&mut self) {
        self.data.remove(MAIN_STORYBOARD);
    }

    pub fn delete_main_storyboard_ipad(&mut self) {
        self.data.remove(MAIN_STORYBOARD_IPAD);
    }

    pub fn delete_main_nib(&mut self) {
        self.data.remove(MAIN_NIB);
    }

    pub fn delete_main_nib_ipad(&mut self) {
        self.data.remove(MAIN_NIB_IPAD);
    }

    /// The value of `com.apple.security.application-groups`.
    pub fn application_groups(&self) -> Option<&Value> {
        self.data.get(APPLICATION_GROUPS)
    }

    /// The `IntuneMAMSettings` dictionary, if present.
    pub fn intune_mam_settings(&self) -> Option<&Dictionary> {
        self.data
            .get(INTUNE_MAM_SETTINGS)
            .and_then(Value::as_dictionary)
    }

    /// Set a key in `IntuneMAMSettings`, creating the dictionary if needed.
    fn add_to_intune_mam_settings(&mut self, key: &str, value: Value) -> Result<()> {
        let settings = add_unique_keyed_map(&mut self.data, INTUNE_MAM_SETTINGS)?;
        add_unique_keyed_value(settings, key, value);

        Ok(())
    }

    /// Record a storyboard or nib under `intune_key` in `IntuneMAMSettings`.
    pub fn add_storyboard_or_nib_to_intune(&mut self, value: &str, intune_key: &str) -> Result<()> {
        if intune_key.is_empty() {
            return Err(MamConfigError::MissingArgument("intune_key"));
        }
        if value.is_empty() {
            return Err(MamConfigError::MissingArgument("value"));
        }

        self.add_to_intune_mam_settings(intune_key, Value::from(value))
    }

    /// Set `IntuneMAMSettings.AppGroupIdentifiers`.
    pub fn add_app_group_settings(&mut self, groups: Value) -> Result<()> {
        let empty = match &groups {
            Value::Array(values) => values.is_empty(),
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        if empty {
            return Err(MamConfigError::MissingArgument("groups"));
        }

        self.add_to_intune_mam_settings("AppGroupIdentifiers", groups)
    }

    pub fn set_mam_policy_required(&mut self, value: bool) -> Result<()> {
        self.add_to_intune_mam_settings("MAMPolicyRequired", Value::Boolean(value))
    }

    pub fn set_auto_enroll_on_launch(&mut self, value: bool) -> Result<()> {
        self.add_to_intune_mam_settings("AutoEnrollOnLaunch", Value::Boolean(value))
    }
}

#[cfg(test)]
mod tests {
    use {super::*, indoc::indoc};

    fn parse_plist(xml: &str) -> Dictionary {
        Value::from_reader_xml(std::io::Cursor::new(xml.as_bytes()))
            .unwrap()
            .into_dictionary()
            .unwrap()
    }

    fn info_plist() -> PlistFile {
        let data = parse_plist(indoc! {r#"
            <?xml version="1.0" encoding="UTF-8"?>
            <!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
            <plist version="1.0">
            <dict>
                <key>CFBundleIdentifier</key>
                <string>io.cordova.hellocordova</string>
                <key>CFBundleURLTypes</key>
                <array>
                    <dict>
                        <key>CFBundleURLSchemes</key>
                        <array>
                            <string>hellocordova</string>
                        </array>
                    </dict>
                    <dict>
                        <key>CFBundleURLName</key>
                        <string>no-schemes</string>
                    </dict>
                </array>
                <key>UIMainStoryboardFile</key>
                <string>Main</string>
            </dict>
            </plist>
        "#});

        PlistFile::new(
            Path::new("platforms/ios"),
            "HelloCordova/HelloCordova-Info.plist",
            data,
        )
    }

    #[test]
    fn paths() {
        let plist = info_plist();

        assert_eq!(plist.relative_path(), "HelloCordova/HelloCordova-Info.plist");
        assert_eq!(
            plist.path(),
            Path::new("platforms/ios/HelloCordova/HelloCordova-Info.plist")
        );
    }

    #[test]
    fn keychain_access_groups_are_prefixed() -> Result<()> {
        let mut entitlements = PlistFile::empty(Path::new("."), "x.entitlements");

        entitlements.add_keychain_access_group("com.microsoft.adalcache")?;
        entitlements.add_keychain_access_group("com.microsoft.adalcache")?;

        assert_eq!(
            entitlements.keychain_access_groups()?,
            vec!["$(AppIdentifierPrefix)com.microsoft.adalcache"]
        );
        assert!(matches!(
            entitlements.add_keychain_access_group(""),
            Err(MamConfigError::MissingArgument("group"))
        ));

        Ok(())
    }

    #[test]
    fn url_schemes() -> Result<()> {
        let mut plist = info_plist();

        assert_eq!(plist.bundle_identifier(), Some("io.cordova.hellocordova"));
        assert_eq!(plist.url_types().map(|t| t.len()), Some(2));
        assert_eq!(plist.url_schemes(0)?, vec!["hellocordova"]);

        plist.add_url_scheme(0, "hellocordova-intunemam")?;
        plist.add_url_scheme(0, "hellocordova-intunemam")?;
        assert_eq!(
            plist.url_schemes(0)?,
            vec!["hellocordova", "hellocordova-intunemam"]
        );

        assert!(matches!(
            plist.url_schemes(1),
            Err(MamConfigError::InvalidArgument(_))
        ));
        assert!(matches!(
            plist.add_url_scheme(1, "x"),
            Err(MamConfigError::InvalidArgument(_))
        ));
        assert!(matches!(
            plist.add_url_scheme(5, "x"),
            Err(MamConfigError::InvalidArgument(_))
        ));
        assert!(matches!(
            plist.add_url_scheme(0, ""),
            Err(MamConfigError::MissingArgument("scheme"))
        ));

        Ok(())
    }

    #[test]
    fn storyboards_move_into_settings() -> Result<()> {
        let mut plist = info_plist();

        assert_eq!(plist.main_storyboard(), Some("Main"));
        assert_eq!(plist.main_storyboard_ipad(), None);

        plist.add_storyboard_or_nib_to_intune("Main", MAIN_STORYBOARD)?;
        plist.delete_main_storyboard();

        assert_eq!(plist.main_storyboard(), None);
        assert_eq!(
            plist
                .intune_mam_settings()
                .and_then(|s| s.get(MAIN_STORYBOARD))
                .and_then(Value::as_string),
            Some("Main")
        );

        assert!(matches!(
            plist.add_storyboard_or_nib_to_intune("", MAIN_NIB),
            Err(MamConfigError::MissingArgument("value"))
        ));
        assert!(matches!(
            plist.add_storyboard_or_nib_to_intune("Main", ""),
            Err(MamConfigError::MissingArgument("intune_key"))
        ));

        Ok(())
    }

    #[test]
    fn mam_settings() -> Result<()> {
        let mut plist = info_plist();

        plist.set_mam_policy_required(true)?;
        plist.set_auto_enroll_on_launch(true)?;
        plist.add_app_group_settings(Value::Array(vec![Value::from("group.io.cordova")]))?;

        let settings = plist.intune_mam_settings().unwrap();
        assert_eq!(settings.get("MAMPolicyRequired"), Some(&Value::Boolean(true)));
        assert_eq!(settings.get("AutoEnrollOnLaunch"), Some(&Value::Boolean(true)));
        assert_eq!(
            settings.get("AppGroupIdentifiers"),
            Some(&Value::Array(vec![Value::from("group.io.cordova")]))
        );

        assert!(matches!(
            plist.add_app_group_settings(Value::Array(vec![])),
            Err(MamConfigError::MissingArgument("groups"))
        ));

        Ok(())
    }

    #[test]
    fn load_and_save() -> Result<()> {
        let td = tempfile::Builder::new()
            .prefix("intune-mam-config-test")
            .tempdir()?;
        std::fs::create_dir(td.path().join("HelloCordova"))?;

        let template = info_plist();
        let mut plist = PlistFile::new(
            td.path(),
            template.relative_path(),
            template.data().clone(),
        );
        plist.set_mam_policy_required(true)?;
        plist.save()?;

        let loaded = PlistFile::load(td.path(), "HelloCordova/HelloCordova-Info.plist")?;
        assert_eq!(loaded.data(), plist.data());

        std::fs::write(td.path().join("array.plist"), indoc! {r#"
            <?xml version="1.0" encoding="UTF-8"?>
            <plist version="1.0">
            <array/>
            </plist>
        "#})?;
        assert!(matches!(
            PlistFile::load(td.path(), "array.plist"),
            Err(MamConfigError::NotADictionary(_))
        ));

        Ok(())
    }
}
