// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! High-level interface to Xcode projects.

[XcodeProject] wraps a parsed `project.pbxproj` and exposes queries and
mutations keyed by build configuration object ID. Unless documented
otherwise, mutations will not overwrite existing values or add
duplicate array entries, so applying them repeatedly is harmless.
*/

use {
    crate::{
        error::{Result, XcodeProjectError},
        format,
    },
    log::debug,
    plist::{Dictionary, Value},
    std::{
        io::{BufWriter, Write},
        path::{Path, PathBuf},
    },
};

/// Value seeded into linker flag lists created from scratch.
pub const INHERITED: &str = "$(inherited)";

/// Number of hex characters in an Xcode object ID.
const OBJECT_ID_LENGTH: usize = 24;

fn invalid_configuration(operation: &'static str, config: &str) -> XcodeProjectError {
    XcodeProjectError::InvalidConfiguration {
        operation,
        config: config.to_string(),
    }
}

fn string_field<'a>(object: &'a Dictionary, id: &str, key: &str) -> Result<&'a str> {
    object
        .get(key)
        .and_then(Value::as_string)
        .ok_or_else(|| XcodeProjectError::MissingObject(format!("{}.{}", id, key)))
}

/// Resolve the string values of a build setting that may be a scalar or an array.
fn setting_values<'a>(settings: &'a Dictionary, key: &str) -> Vec<&'a str> {
    match settings.get(key) {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(values)) => values.iter().filter_map(Value::as_string).collect(),
        _ => vec![],
    }
}

/// Obtain a build setting as a mutable array.
///
/// Scalar string values are promoted to a single element array. Missing
/// settings are created with `initial` as their content.
fn setting_array_mut<'a>(
    settings: &'a mut Dictionary,
    key: &str,
    initial: &[&str],
) -> Result<&'a mut Vec<Value>> {
    let promoted = match settings.get(key) {
        Some(Value::Array(_)) => None,
        Some(Value::String(s)) => Some(vec![Value::String(s.clone())]),
        Some(_) => {
            return Err(XcodeProjectError::ObjectType {
                id: key.to_string(),
                expected: "string or array",
            })
        }
        None => Some(initial.iter().map(|s| Value::from(*s)).collect()),
    };

    if let Some(values) = promoted {
        settings.insert(key.to_string(), Value::Array(values));
    }

    settings
        .get_mut(key)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| XcodeProjectError::MissingObject(key.to_string()))
}

fn array_contains(values: &[Value], value: &str) -> bool {
    values.iter().any(|v| v.as_string() == Some(value))
}

fn ensure_map<'a>(dict: &'a mut Dictionary, key: &str) -> Result<&'a mut Dictionary> {
    if !dict.contains_key(key) {
        dict.insert(key.to_string(), Value::Dictionary(Dictionary::new()));
    }

    dict.get_mut(key)
        .and_then(Value::as_dictionary_mut)
        .ok_or_else(|| XcodeProjectError::ObjectType {
            id: key.to_string(),
            expected: "dictionary",
        })
}

/// Resolve the `lastKnownFileType` Xcode assigns to a file name.
pub fn last_known_file_type(name: &str) -> &'static str {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some("entitlements") => "text.plist.entitlements",
        Some("plist") => "text.plist.xml",
        Some("storyboard") => "file.storyboard",
        Some("xib") => "file.xib",
        Some("xml") => "text.xml",
        Some("json") => "text.json",
        Some("png") => "image.png",
        _ => "file",
    }
}

/// A parsed Xcode project.
#[derive(Clone, Debug)]
pub struct XcodeProject {
    /// Path to the `project.pbxproj` file.
    path: PathBuf,

    /// Root dictionary of the document.
    root: Dictionary,
}

impl XcodeProject {
    /// Read a `project.pbxproj` file from the filesystem.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;

        Self::parse(path, &text)
    }

    /// Parse `project.pbxproj` content.
    ///
    /// `path` records where the content came from. It is used to derive the
    /// project name and as the default destination of [Self::save].
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self> {
        let root = format::parse(text)?
            .into_dictionary()
            .ok_or(XcodeProjectError::RootNotDictionary)?;

        Ok(Self {
            path: path.into(),
            root,
        })
    }

    /// Path of the `project.pbxproj` this instance was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The root dictionary of the document.
    pub fn root(&self) -> &Dictionary {
        &self.root
    }

    /// Serialize the project to `project.pbxproj` content.
    pub fn to_pbxproj_string(&self) -> Result<String> {
        let mut buffer = vec![];
        format::write_dictionary(&self.root, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| {
            XcodeProjectError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    /// Write the project to a filesystem path.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(std::fs::File::create(path.as_ref())?);
        format::write_dictionary(&self.root, &mut writer)?;
        writer.flush()?;

        Ok(())
    }

    /// Write the project back to the path it was loaded from.
    pub fn save(&self) -> Result<()> {
        debug!("writing {}", self.path.display());
        self.write_to_path(&self.path)
    }

    /// The name of the project.
    ///
    /// This is the name of the `.xcodeproj` directory containing the
    /// `project.pbxproj` file, without its extension.
    pub fn project_name(&self) -> Result<String> {
        let bad_path = || XcodeProjectError::BadProjectPath(self.path.clone());

        let subpath = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(bad_path)?;

        subpath
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(bad_path)
    }

    fn objects(&self) -> Result<&Dictionary> {
        self.root
            .get("objects")
            .and_then(Value::as_dictionary)
            .ok_or_else(|| XcodeProjectError::MissingObject("objects".into()))
    }

    fn objects_mut(&mut self) -> Result<&mut Dictionary> {
        self.root
            .get_mut("objects")
            .and_then(Value::as_dictionary_mut)
            .ok_or_else(|| XcodeProjectError::MissingObject("objects".into()))
    }

    /// Obtain the object with the given ID.
    pub fn object(&self, id: &str) -> Result<&Dictionary> {
        self.objects()?
            .get(id)
            .ok_or_else(|| XcodeProjectError::MissingObject(id.to_string()))?
            .as_dictionary()
            .ok_or_else(|| XcodeProjectError::ObjectType {
                id: id.to_string(),
                expected: "dictionary",
            })
    }

    fn object_mut(&mut self, id: &str) -> Result<&mut Dictionary> {
        self.objects_mut()?
            .get_mut(id)
            .ok_or_else(|| XcodeProjectError::MissingObject(id.to_string()))?
            .as_dictionary_mut()
            .ok_or_else(|| XcodeProjectError::ObjectType {
                id: id.to_string(),
                expected: "dictionary",
            })
    }

    /// Obtain all objects having the given `isa`, in document order.
    pub fn objects_of_isa(&self, isa: &str) -> Result<Vec<(&str, &Dictionary)>> {
        Ok(self
            .objects()?
            .iter()
            .filter_map(|(id, value)| {
                let object = value.as_dictionary()?;

                if object.get("isa").and_then(Value::as_string) == Some(isa) {
                    Some((id.as_str(), object))
                } else {
                    None
                }
            })
            .collect())
    }

    /// The ID of the `PBXProject` root object.
    pub fn root_object_id(&self) -> Result<&str> {
        self.root
            .get("rootObject")
            .and_then(Value::as_string)
            .ok_or_else(|| XcodeProjectError::MissingObject("rootObject".into()))
    }

    /// The ID of the primary native target.
    ///
    /// This is the first `PBXNativeTarget` in the document.
    pub fn primary_native_target_id(&self) -> Result<String> {
        self.objects_of_isa("PBXNativeTarget")?
            .first()
            .map(|(id, _)| id.to_string())
            .ok_or(XcodeProjectError::NoNativeTarget)
    }

    /// IDs of the build configurations of the primary native target.
    pub fn native_target_config_list(&self) -> Result<Vec<String>> {
        let target_id = self.primary_native_target_id()?;
        let target = self.object(&target_id)?;
        let list_id = string_field(target, &target_id, "buildConfigurationList")?;

        let configs = self
            .object(list_id)?
            .get("buildConfigurations")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                XcodeProjectError::MissingObject(format!("{}.buildConfigurations", list_id))
            })?;

        Ok(configs
            .iter()
            .filter_map(Value::as_string)
            .map(|s| s.to_string())
            .collect())
    }

    fn build_configuration(&self, operation: &'static str, config: &str) -> Result<&Dictionary> {
        let object = self
            .objects()?
            .get(config)
            .and_then(Value::as_dictionary)
            .ok_or_else(|| invalid_configuration(operation, config))?;

        if object.get("isa").and_then(Value::as_string) == Some("XCBuildConfiguration") {
            Ok(object)
        } else {
            Err(invalid_configuration(operation, config))
        }
    }

    fn settings(&self, operation: &'static str, config: &str) -> Result<&Dictionary> {
        self.build_configuration(operation, config)?
            .get("buildSettings")
            .and_then(Value::as_dictionary)
            .ok_or_else(|| invalid_configuration(operation, config))
    }

    fn settings_mut(&mut self, operation: &'static str, config: &str) -> Result<&mut Dictionary> {
        let object = self
            .objects_mut()?
            .get_mut(config)
            .and_then(Value::as_dictionary_mut)
            .ok_or_else(|| invalid_configuration(operation, config))?;

        if object.get("isa").and_then(Value::as_string) != Some("XCBuildConfiguration") {
            return Err(invalid_configuration(operation, config));
        }

        object
            .get_mut("buildSettings")
            .and_then(Value::as_dictionary_mut)
            .ok_or_else(|| invalid_configuration(operation, config))
    }

    /// The `name` of a build configuration (e.g. `Debug`).
    pub fn configuration_name(&self, config: &str) -> Result<Option<&str>> {
        Ok(self
            .build_configuration("configuration_name", config)?
            .get("name")
            .and_then(Value::as_string))
    }

    /// The build settings of a build configuration.
    pub fn build_settings(&self, config: &str) -> Result<&Dictionary> {
        self.settings("build_settings", config)
    }

    /// The build settings of a build configuration, mutably.
    pub fn build_settings_mut(&mut self, config: &str) -> Result<&mut Dictionary> {
        self.settings_mut("build_settings_mut", config)
    }

    /// A string build setting holding a path, with literal `"` removed.
    ///
    /// Values that are not strings or are empty once unquoted count as unset.
    fn path_setting(
        &self,
        operation: &'static str,
        config: &str,
        key: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .settings(operation, config)?
            .get(key)
            .and_then(Value::as_string)
            .map(|s| s.replace('"', ""))
            .filter(|s| !s.is_empty()))
    }

    /// Relative path of the `Info.plist` associated with a configuration.
    ///
    /// Literal `"` characters are removed from the value.
    pub fn plist_file_name(&self, config: &str) -> Result<Option<String>> {
        self.path_setting("plist_file_name", config, "INFOPLIST_FILE")
    }

    /// Whether a configuration declares a code signing entitlements file.
    ///
    /// An empty `CODE_SIGN_ENTITLEMENTS` does not count.
    pub fn has_entitlements(&self, config: &str) -> Result<bool> {
        Ok(self.entitlements_file_name(config)?.is_some())
    }

    /// Relative path of the entitlements file associated with a configuration.
    ///
    /// Literal `"` characters are removed from the value.
    pub fn entitlements_file_name(&self, config: &str) -> Result<Option<String>> {
        self.path_setting("entitlements_file_name", config, "CODE_SIGN_ENTITLEMENTS")
    }

    /// Set the entitlements file of a configuration if it doesn't have one.
    ///
    /// An existing value that is empty or not a string is replaced.
    pub fn set_entitlements_file_name(&mut self, config: &str, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(XcodeProjectError::InvalidArgument("name"));
        }

        if self
            .path_setting("set_entitlements_file_name", config, "CODE_SIGN_ENTITLEMENTS")?
            .is_none()
        {
            self.settings_mut("set_entitlements_file_name", config)?
                .insert("CODE_SIGN_ENTITLEMENTS".into(), Value::from(name));
        }

        Ok(())
    }

    fn add_search_path(
        &mut self,
        operation: &'static str,
        key: &str,
        config: &str,
        path: &str,
    ) -> Result<()> {
        if path.is_empty() {
            return Err(XcodeProjectError::InvalidArgument("path"));
        }

        let values = setting_array_mut(self.settings_mut(operation, config)?, key, &[])?;
        if !array_contains(values, path) {
            values.push(Value::from(path));
        }

        Ok(())
    }

    /// Add a path to a configuration's `HEADER_SEARCH_PATHS`.
    pub fn add_header_search_path(&mut self, config: &str, path: &str) -> Result<()> {
        self.add_search_path("add_header_search_path", "HEADER_SEARCH_PATHS", config, path)
    }

    /// Add a path to a configuration's `LIBRARY_SEARCH_PATHS`.
    pub fn add_library_search_path(&mut self, config: &str, path: &str) -> Result<()> {
        self.add_search_path(
            "add_library_search_path",
            "LIBRARY_SEARCH_PATHS",
            config,
            path,
        )
    }

    /// Disable bitcode for a configuration.
    ///
    /// Unlike most mutations, this overwrites any existing `ENABLE_BITCODE`.
    pub fn disable_bitcode(&mut self, config: &str) -> Result<()> {
        self.settings_mut("disable_bitcode", config)?
            .insert("ENABLE_BITCODE".into(), Value::from("NO"));

        Ok(())
    }

    /// Force load a static library in a configuration.
    ///
    /// Appends `-force_load <library>` to `OTHER_LDFLAGS` unless the library
    /// is already referenced.
    pub fn add_force_load_library(&mut self, config: &str, library: &str) -> Result<()> {
        if library.is_empty() {
            return Err(XcodeProjectError::InvalidArgument("library"));
        }

        let flags = setting_array_mut(
            self.settings_mut("add_force_load_library", config)?,
            "OTHER_LDFLAGS",
            &[INHERITED],
        )?;

        if !array_contains(flags, library) {
            flags.push(Value::from("-force_load"));
            flags.push(Value::from(library));
        }

        Ok(())
    }

    /// Add a linker flag to the primary target's configurations.
    ///
    /// Nothing happens if every configuration already has the flag. Otherwise
    /// the flag is added to each configuration lacking it. Returns whether
    /// anything was added.
    pub fn add_new_to_other_linker_flags(&mut self, flag: &str) -> Result<bool> {
        if flag.is_empty() {
            return Err(XcodeProjectError::InvalidArgument("flag"));
        }

        let configs = self.native_target_config_list()?;

        let mut missing = vec![];
        for config in &configs {
            let settings = self.settings("add_new_to_other_linker_flags", config)?;
            if !setting_values(settings, "OTHER_LDFLAGS").contains(&flag) {
                missing.push(config);
            }
        }

        for config in &missing {
            let flags = setting_array_mut(
                self.settings_mut("add_new_to_other_linker_flags", config)?,
                "OTHER_LDFLAGS",
                &[INHERITED],
            )?;
            flags.push(Value::from(flag));
        }

        Ok(!missing.is_empty())
    }

    /// Set a value under the root project object's `attributes`.
    ///
    /// `path` is traversed from `attributes`, creating dictionaries as needed.
    /// `key` is set on the final dictionary, overwriting any existing value.
    pub fn add_deep_project_attribute(
        &mut self,
        path: &[&str],
        key: &str,
        value: Value,
    ) -> Result<()> {
        let root_id = self.root_object_id()?.to_string();

        let mut cursor = ensure_map(self.object_mut(&root_id)?, "attributes")?;
        for component in path {
            cursor = ensure_map(cursor, component)?;
        }

        cursor.insert(key.to_string(), value);

        Ok(())
    }

    /// Enable the keychain sharing capability on the primary target.
    pub fn enable_keychain_sharing(&mut self) -> Result<()> {
        let target_id = self.primary_native_target_id()?;

        self.add_deep_project_attribute(
            &[
                "TargetAttributes",
                target_id.as_str(),
                "SystemCapabilities",
                "com.apple.Keychain",
            ],
            "enabled",
            Value::from("1"),
        )
    }

    /// Generate an object ID not used by any existing object.
    fn generate_object_id(&self) -> Result<String> {
        let objects = self.objects()?;

        loop {
            let id = uuid::Uuid::new_v4().simple().to_string().to_uppercase()
                [..OBJECT_ID_LENGTH]
                .to_string();

            if !objects.contains_key(&id) {
                return Ok(id);
            }
        }
    }

    fn insert_object(&mut self, object: Dictionary) -> Result<String> {
        let id = self.generate_object_id()?;
        self.objects_mut()?
            .insert(id.clone(), Value::Dictionary(object));

        Ok(id)
    }

    fn push_to_object_array(&mut self, id: &str, key: &str, value: &str) -> Result<()> {
        let object = self.object_mut(id)?;
        if !object.contains_key(key) {
            object.insert(key.to_string(), Value::Array(vec![]));
        }

        object
            .get_mut(key)
            .and_then(Value::as_array_mut)
            .ok_or_else(|| XcodeProjectError::ObjectType {
                id: format!("{}.{}", id, key),
                expected: "array",
            })?
            .push(Value::from(value));

        Ok(())
    }

    /// The group resources are added to.
    ///
    /// This is the `PBXGroup` named `Resources`, falling back to the
    /// project's main group.
    fn resources_group_id(&self) -> Result<String> {
        let group = self
            .objects_of_isa("PBXGroup")?
            .into_iter()
            .find(|(_, group)| {
                group.get("name").and_then(Value::as_string) == Some("Resources")
                    || (!group.contains_key("name")
                        && group.get("path").and_then(Value::as_string) == Some("Resources"))
            })
            .map(|(id, _)| id.to_string());

        match group {
            Some(id) => Ok(id),
            None => {
                let root_id = self.root_object_id()?;
                Ok(string_field(self.object(root_id)?, root_id, "mainGroup")?.to_string())
            }
        }
    }

    /// The `PBXResourcesBuildPhase` of the primary native target.
    fn resources_build_phase_id(&self) -> Result<String> {
        let target_id = self.primary_native_target_id()?;
        let phases = self
            .object(&target_id)?
            .get("buildPhases")
            .and_then(Value::as_array)
            .ok_or_else(|| XcodeProjectError::MissingObject(format!("{}.buildPhases", target_id)))?;

        phases
            .iter()
            .filter_map(Value::as_string)
            .find(|id| {
                self.object(id)
                    .map(|o| o.get("isa").and_then(Value::as_string) == Some("PBXResourcesBuildPhase"))
                    .unwrap_or(false)
            })
            .map(|id| id.to_string())
            .ok_or_else(|| XcodeProjectError::MissingObject("PBXResourcesBuildPhase".into()))
    }

    /// Register a file as a resource of the primary native target.
    ///
    /// A `PBXFileReference` is added to the resources group and a
    /// `PBXBuildFile` pointing at it is added to the target's resources build
    /// phase. Returns `false` without changes if a file reference with the
    /// same path already exists.
    pub fn add_resource_file(&mut self, name: &str) -> Result<bool> {
        if name.is_empty() {
            return Err(XcodeProjectError::InvalidArgument("name"));
        }

        let exists = self
            .objects_of_isa("PBXFileReference")?
            .iter()
            .any(|(_, file)| file.get("path").and_then(Value::as_string) == Some(name));
        if exists {
            debug!("{} is already a project file; not adding resource", name);
            return Ok(false);
        }

        let group_id = self.resources_group_id()?;
        let phase_id = self.resources_build_phase_id()?;

        let file_name = Path::new(name)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| name.to_string());

        let mut file_ref = Dictionary::new();
        file_ref.insert("isa".into(), Value::from("PBXFileReference"));
        file_ref.insert(
            "lastKnownFileType".into(),
            Value::from(last_known_file_type(name)),
        );
        file_ref.insert("name".into(), Value::from(file_name));
        file_ref.insert("path".into(), Value::from(name));
        file_ref.insert("sourceTree".into(), Value::from("<group>"));
        let file_ref_id = self.insert_object(file_ref)?;

        let mut build_file = Dictionary::new();
        build_file.insert("isa".into(), Value::from("PBXBuildFile"));
        build_file.insert("fileRef".into(), Value::from(file_ref_id.as_str()));
        let build_file_id = self.insert_object(build_file)?;

        self.push_to_object_array(&group_id, "children", &file_ref_id)?;
        self.push_to_object_array(&phase_id, "files", &build_file_id)?;

        debug!(
            "added resource {} (file {}, build file {})",
            name, file_ref_id, build_file_id
        );

        Ok(true)
    }
}
