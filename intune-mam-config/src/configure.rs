// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Configuring an iOS project for Intune MAM.

Each build configuration of the primary native target references an
`Info.plist` and, optionally, an entitlements file. Every such pair goes
through a fixed sequence of steps:

1. [configure_keychain_access]
2. [move_storyboards_nibs]
3. [add_intune_url_schemes]
4. [add_intune_app_queries_schemes]
5. [configure_app_group_key]
6. [set_mdmless_settings]

All steps are idempotent. [configure_intune_mam] drives the whole run:
files are loaded, mutated in memory, saved, and then the configurator is
invoked.
*/

use {
    crate::{
        configurator::add_intune_utis,
        error::{MamConfigError, Result},
        plist_file::{
            PlistFile, MAIN_NIB, MAIN_NIB_IPAD, MAIN_STORYBOARD, MAIN_STORYBOARD_IPAD,
        },
        settings::MamSettings,
    },
    log::{debug, info, warn},
    plist::Value,
    std::path::{Path, PathBuf},
    xcode_project::XcodeProject,
};

/// Suffix marking a URL scheme handled by the MAM SDK.
pub const INTUNE_MAM_SUFFIX: &str = "-intunemam";

/// Query schemes every managed app declares.
pub const CORE_APP_QUERIES_SCHEMES: [&str; 3] =
    ["http-intunemam", "https-intunemam", "ms-outlook-intunemam"];

/// Keychain groups the MAM SDK and its authentication libraries use.
pub const INTUNE_KEYCHAIN_GROUPS: [&str; 3] = [
    "com.microsoft.intune.mam",
    "com.microsoft.adalcache",
    "com.microsoft.workplacejoin",
];

/// Whether a URL scheme is already a MAM variant.
pub fn is_intune_mam_scheme(scheme: &str) -> bool {
    scheme.contains(INTUNE_MAM_SUFFIX)
}

fn intune_mam_variant(scheme: &str) -> String {
    format!("{}{}", scheme, INTUNE_MAM_SUFFIX)
}

/// Add the app's bundle identifier and the MAM keychain groups to the entitlements.
pub fn configure_keychain_access(entitlements: &mut PlistFile, plist: &PlistFile) -> Result<()> {
    info!("Starting Step: Configuring Keychain Access");

    let bundle_identifier = plist
        .bundle_identifier()
        .filter(|s| !s.is_empty())
        .ok_or(MamConfigError::MissingArgument("CFBundleIdentifier"))?;

    entitlements.add_keychain_access_group(bundle_identifier)?;
    for group in INTUNE_KEYCHAIN_GROUPS {
        entitlements.add_keychain_access_group(group)?;
    }

    Ok(())
}

/// Relocate the main storyboards and nibs into `IntuneMAMSettings`.
///
/// The SDK loads them itself once enrollment completes.
pub fn move_storyboards_nibs(plist: &mut PlistFile) -> Result<()> {
    info!("Starting Step: Moving Storyboards and Nibs");

    if let Some(value) = plist.main_storyboard().map(String::from) {
        plist.add_storyboard_or_nib_to_intune(&value, MAIN_STORYBOARD)?;
        plist.delete_main_storyboard();
    }
    if let Some(value) = plist.main_storyboard_ipad().map(String::from) {
        plist.add_storyboard_or_nib_to_intune(&value, MAIN_STORYBOARD_IPAD)?;
        plist.delete_main_storyboard_ipad();
    }
    if let Some(value) = plist.main_nib().map(String::from) {
        plist.add_storyboard_or_nib_to_intune(&value, MAIN_NIB)?;
        plist.delete_main_nib();
    }
    if let Some(value) = plist.main_nib_ipad().map(String::from) {
        plist.add_storyboard_or_nib_to_intune(&value, MAIN_NIB_IPAD)?;
        plist.delete_main_nib_ipad();
    }

    Ok(())
}

/// Register a `-intunemam` variant of every URL scheme the app handles.
pub fn add_intune_url_schemes(plist: &mut PlistFile) -> Result<()> {
    info!("Starting Step: Adding Intune URL Schemes");

    let count = plist.url_types().map(Vec::len).unwrap_or(0);
    for index in 0..count {
        for scheme in plist.url_schemes(index)? {
            if !is_intune_mam_scheme(&scheme) {
                plist.add_url_scheme(index, &intune_mam_variant(&scheme))?;
            }
        }
    }

    Ok(())
}

/// Declare the MAM query schemes.
///
/// `mailto` is never given a variant.
pub fn add_intune_app_queries_schemes(plist: &mut PlistFile) -> Result<()> {
    info!("Starting Step: Adding Intune App Queries Schemes");

    for scheme in CORE_APP_QUERIES_SCHEMES {
        plist.add_application_queries_scheme(scheme)?;
    }

    for scheme in plist.application_queries_schemes()? {
        if !is_intune_mam_scheme(&scheme) && scheme != "mailto" {
            plist.add_application_queries_scheme(&intune_mam_variant(&scheme))?;
        }
    }

    Ok(())
}

/// Mirror the entitlements' application groups into `IntuneMAMSettings`.
pub fn configure_app_group_key(entitlements: &PlistFile, plist: &mut PlistFile) -> Result<()> {
    info!("Starting Step: Configuring App Group Key");

    match entitlements.application_groups() {
        Some(Value::Array(groups)) if groups.is_empty() => {
            debug!("{} declares no application groups", entitlements.relative_path());
            Ok(())
        }
        Some(groups) => plist.add_app_group_settings(groups.clone()),
        None => Ok(()),
    }
}

/// Require MAM policy and enroll on launch.
pub fn set_mdmless_settings(plist: &mut PlistFile) -> Result<()> {
    info!("Starting Step: Setting MDMless Settings");

    plist.set_mam_policy_required(true)?;
    plist.set_auto_enroll_on_launch(true)
}

/// The files a build configuration refers to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigurationFiles {
    /// Object ID of the `XCBuildConfiguration`.
    pub config: String,
    /// Configuration name, e.g. `Debug`.
    pub name: Option<String>,
    /// `INFOPLIST_FILE`, relative to the platform directory.
    pub plist: String,
    /// `CODE_SIGN_ENTITLEMENTS`, relative to the platform directory.
    pub entitlements: Option<String>,
}

/// Resolve the files referenced by each configuration of the primary target.
///
/// This does not modify anything.
pub fn configuration_files(project: &XcodeProject) -> Result<Vec<ConfigurationFiles>> {
    project
        .native_target_config_list()?
        .into_iter()
        .map(|config| {
            let plist = project
                .plist_file_name(&config)?
                .ok_or_else(|| MamConfigError::MissingInfoPlist(config.clone()))?;

            Ok(ConfigurationFiles {
                name: project.configuration_name(&config)?.map(String::from),
                entitlements: project.entitlements_file_name(&config)?,
                plist,
                config,
            })
        })
        .collect()
}

/// Where an entitlements file is created for a project lacking one.
pub fn default_entitlements_path(project: &XcodeProject) -> Result<String> {
    let name = project.project_name()?;

    Ok(format!("{0}/Resources/{0}.entitlements", name))
}

/// Give a configuration an entitlements file if it has none.
///
/// The file is created at [default_entitlements_path] as an empty
/// dictionary unless it already exists. It is then set as the
/// configuration's `CODE_SIGN_ENTITLEMENTS` and registered as a project
/// resource. Returns the entitlements path of the configuration and whether
/// the project was changed.
pub fn create_entitlements_if_none(
    project: &mut XcodeProject,
    config: &str,
    platform_dir: &Path,
) -> Result<(String, bool)> {
    if let Some(existing) = project.entitlements_file_name(config)? {
        return Ok((existing, false));
    }

    let name = project.project_name()?;
    let relative_path = default_entitlements_path(project)?;
    let path = platform_dir.join(&relative_path);

    if path.exists() {
        debug!("{} already exists; reusing it", path.display());
    } else {
        info!("creating entitlements file {}", path.display());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        PlistFile::empty(platform_dir, &relative_path).save()?;
    }

    project.set_entitlements_file_name(config, &relative_path)?;
    project.add_resource_file(&format!("{}.entitlements", name))?;

    Ok((relative_path, true))
}

/// The plists and entitlements taking part in a run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FileInfo {
    /// Every distinct file, in the order first referenced.
    pub files: Vec<String>,
    /// Entitlements paths and the plists referencing each, in the order first referenced.
    pub entitlements_plist_mapping: Vec<(String, Vec<String>)>,
}

impl FileInfo {
    fn add_pair(&mut self, entitlements: &str, plist: &str) -> Result<()> {
        if entitlements == plist {
            return Err(MamConfigError::SameFile(plist.to_string()));
        }

        for path in [entitlements, plist] {
            if !self.files.iter().any(|f| f == path) {
                self.files.push(path.to_string());
            }
        }

        match self
            .entitlements_plist_mapping
            .iter_mut()
            .find(|(e, _)| e == entitlements)
        {
            Some((_, plists)) => {
                if !plists.iter().any(|p| p == plist) {
                    plists.push(plist.to_string());
                }
            }
            None => self
                .entitlements_plist_mapping
                .push((entitlements.to_string(), vec![plist.to_string()])),
        }

        Ok(())
    }
}

/// Resolve the files of a run, creating missing entitlements files.
pub fn entitlements_and_plist_info(
    project: &mut XcodeProject,
    platform_dir: &Path,
) -> Result<FileInfo> {
    let mut info = FileInfo::default();

    for files in configuration_files(project)? {
        let (entitlements, created) =
            create_entitlements_if_none(project, &files.config, platform_dir)?;
        if created {
            info!(
                "registered {} for configuration {}",
                entitlements,
                files.name.as_deref().unwrap_or(&files.config)
            );
        }

        info.add_pair(&entitlements, &files.plist)?;
    }

    Ok(info)
}

/// Resolve the files a run would touch without changing anything.
///
/// Configurations without entitlements are mapped to
/// [default_entitlements_path].
pub fn plan_file_mapping(project: &XcodeProject) -> Result<FileInfo> {
    let mut info = FileInfo::default();

    for files in configuration_files(project)? {
        let entitlements = match files.entitlements {
            Some(path) => path,
            None => default_entitlements_path(project)?,
        };

        info.add_pair(&entitlements, &files.plist)?;
    }

    Ok(info)
}

/// A collection of loaded plist files addressed by relative path.
#[derive(Clone, Debug, Default)]
pub struct PlistFileSet {
    files: Vec<PlistFile>,
}

impl PlistFileSet {
    /// Load each of `relative_paths` from `platform_dir`.
    pub fn load_all(platform_dir: &Path, relative_paths: &[String]) -> Result<Self> {
        let files = relative_paths
            .iter()
            .map(|path| PlistFile::load(platform_dir, path))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { files })
    }

    pub fn files(&self) -> &[PlistFile] {
        &self.files
    }

    pub fn get(&self, relative_path: &str) -> Option<&PlistFile> {
        self.files
            .iter()
            .find(|f| f.relative_path() == relative_path)
    }

    fn index_of(&self, relative_path: &str) -> Result<usize> {
        self.files
            .iter()
            .position(|f| f.relative_path() == relative_path)
            .ok_or_else(|| MamConfigError::FileNotLoaded(relative_path.to_string()))
    }

    /// Obtain two distinct files mutably.
    pub fn pair_mut(&mut self, first: &str, second: &str) -> Result<(&mut PlistFile, &mut PlistFile)> {
        let a = self.index_of(first)?;
        let b = self.index_of(second)?;

        if a == b {
            return Err(MamConfigError::SameFile(first.to_string()));
        }

        if a < b {
            let (head, tail) = self.files.split_at_mut(b);
            Ok((&mut head[a], &mut tail[0]))
        } else {
            let (head, tail) = self.files.split_at_mut(a);
            Ok((&mut tail[0], &mut head[b]))
        }
    }

    /// Write every file back to disk.
    pub fn save_all(&self) -> Result<()> {
        for file in &self.files {
            file.save()?;
        }

        Ok(())
    }
}

/// Apply every step to every (entitlements, plist) pair of a mapping.
pub fn configure_entitlements_and_plists(
    files: &mut PlistFileSet,
    mapping: &[(String, Vec<String>)],
) -> Result<()> {
    for (entitlements_path, plists) in mapping {
        for plist_path in plists {
            info!("configuring {} with {}", plist_path, entitlements_path);
            let (entitlements, plist) = files.pair_mut(entitlements_path, plist_path)?;

            configure_keychain_access(entitlements, plist)?;
            move_storyboards_nibs(plist)?;
            add_intune_url_schemes(plist)?;
            add_intune_app_queries_schemes(plist)?;
            configure_app_group_key(entitlements, plist)?;
            set_mdmless_settings(plist)?;
        }
    }

    Ok(())
}

/// Apply the build setting options of [MamSettings] to the project.
pub fn apply_project_settings(project: &mut XcodeProject, settings: &MamSettings) -> Result<()> {
    for config in project.native_target_config_list()? {
        for path in settings.header_search_paths() {
            project.add_header_search_path(&config, path)?;
        }
        for path in settings.library_search_paths() {
            project.add_library_search_path(&config, path)?;
        }
        for library in settings.force_load_libraries() {
            project.add_force_load_library(&config, library)?;
        }
        if settings.disable_bitcode() {
            project.disable_bitcode(&config)?;
        }
    }

    for flag in settings.linker_flags() {
        if !project.add_new_to_other_linker_flags(flag)? {
            debug!("{} already in OTHER_LDFLAGS", flag);
        }
    }

    if settings.enable_keychain_sharing() {
        project.enable_keychain_sharing()?;
    }

    Ok(())
}

/// Outcome of [configure_intune_mam].
#[derive(Clone, Debug)]
pub struct ConfigureReport {
    pub file_info: FileInfo,
    /// Absolute paths of the files written.
    pub written: Vec<PathBuf>,
    /// Number of times the configurator ran.
    pub configurator_runs: usize,
}

/// Configure a project and its plists for Intune MAM.
///
/// Plists and entitlements are written to disk. The project is only
/// modified in memory; persisting it is up to the caller.
pub fn configure_intune_mam(
    project: &mut XcodeProject,
    settings: &MamSettings,
) -> Result<ConfigureReport> {
    let platform_dir = settings.platform_dir();

    apply_project_settings(project, settings)?;

    let file_info = entitlements_and_plist_info(project, platform_dir)?;
    if file_info.files.is_empty() {
        warn!("primary target has no build configurations; nothing to configure");
    }

    let mut files = PlistFileSet::load_all(platform_dir, &file_info.files)?;
    configure_entitlements_and_plists(&mut files, &file_info.entitlements_plist_mapping)?;
    files.save_all()?;

    let written = files.files().iter().map(|f| f.path().to_path_buf()).collect();
    let configurator_runs = add_intune_utis(project, settings)?;

    Ok(ConfigureReport {
        file_info,
        written,
        configurator_runs,
    })
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            modification::string_array,
            plist_file::{APPLICATION_QUERIES_SCHEMES, INTUNE_MAM_SETTINGS},
            testutil::*,
        },
        plist::Dictionary,
    };

    const DEBUG: &str = "1D6058940D05DD3E006BFB54";
    const RELEASE: &str = "1D6058950D05DD3E006BFB54";

    fn info_plist() -> Result<PlistFile> {
        let data = Value::from_reader_xml(std::io::Cursor::new(HELLO_CORDOVA_INFO_PLIST))?
            .into_dictionary()
            .ok_or_else(|| MamConfigError::NotADictionary(INFO_PLIST_PATH.into()))?;

        Ok(PlistFile::new(Path::new("."), INFO_PLIST_PATH, data))
    }

    fn release_entitlements() -> Result<PlistFile> {
        let data = Value::from_reader_xml(std::io::Cursor::new(ENTITLEMENTS_RELEASE))?
            .into_dictionary()
            .ok_or_else(|| MamConfigError::NotADictionary(RELEASE_ENTITLEMENTS_PATH.into()))?;

        Ok(PlistFile::new(Path::new("."), RELEASE_ENTITLEMENTS_PATH, data))
    }

    fn hello_cordova() -> Result<XcodeProject> {
        Ok(XcodeProject::parse(
            "HelloCordova.xcodeproj/project.pbxproj",
            HELLO_CORDOVA_PBXPROJ,
        )?)
    }

    #[test]
    fn intune_mam_scheme_detection() {
        assert!(is_intune_mam_scheme("https-intunemam"));
        assert!(is_intune_mam_scheme("foo-intunemam-bar"));
        assert!(!is_intune_mam_scheme("https"));
        assert!(!is_intune_mam_scheme("intunemam"));
    }

    #[test]
    fn keychain_access() -> Result<()> {
        let plist = info_plist()?;
        let mut entitlements = release_entitlements()?;

        configure_keychain_access(&mut entitlements, &plist)?;
        configure_keychain_access(&mut entitlements, &plist)?;

        assert_eq!(
            entitlements.keychain_access_groups()?,
            vec![
                "$(AppIdentifierPrefix)io.cordova.hellocordova",
                "$(AppIdentifierPrefix)com.microsoft.intune.mam",
                "$(AppIdentifierPrefix)com.microsoft.adalcache",
                "$(AppIdentifierPrefix)com.microsoft.workplacejoin",
            ]
        );

        let no_bundle = PlistFile::new(Path::new("."), "Info.plist", Dictionary::new());
        assert!(matches!(
            configure_keychain_access(&mut entitlements, &no_bundle),
            Err(MamConfigError::MissingArgument("CFBundleIdentifier"))
        ));

        Ok(())
    }

    #[test]
    fn storyboards_and_nibs() -> Result<()> {
        let mut plist = info_plist()?;

        move_storyboards_nibs(&mut plist)?;
        move_storyboards_nibs(&mut plist)?;

        assert_eq!(plist.main_storyboard(), None);
        assert_eq!(plist.main_nib_ipad(), None);

        let settings = plist.intune_mam_settings().unwrap();
        assert_eq!(
            settings.get(MAIN_STORYBOARD).and_then(Value::as_string),
            Some("CDVLaunchScreen")
        );
        assert_eq!(
            settings.get(MAIN_NIB_IPAD).and_then(Value::as_string),
            Some("MainWindow-iPad")
        );
        assert!(!settings.contains_key(MAIN_NIB));
        assert!(!settings.contains_key(MAIN_STORYBOARD_IPAD));

        Ok(())
    }

    #[test]
    fn url_schemes_get_variants_once() -> Result<()> {
        let mut plist = info_plist()?;

        add_intune_url_schemes(&mut plist)?;
        add_intune_url_schemes(&mut plist)?;

        assert_eq!(
            plist.url_schemes(0)?,
            vec![
                "hellocordova",
                "msauth-hellocordova-intunemam",
                "hellocordova-intunemam",
            ]
        );

        Ok(())
    }

    #[test]
    fn app_queries_schemes() -> Result<()> {
        let mut plist = info_plist()?;

        add_intune_app_queries_schemes(&mut plist)?;
        add_intune_app_queries_schemes(&mut plist)?;

        let schemes = plist.application_queries_schemes()?;
        assert_eq!(
            schemes,
            vec![
                "mailto",
                "comgooglemaps",
                "http-intunemam",
                "https-intunemam",
                "ms-outlook-intunemam",
                "comgooglemaps-intunemam",
            ]
        );
        assert!(!schemes.iter().any(|s| s == "mailto-intunemam"));

        let mut empty = PlistFile::new(Path::new("."), "Info.plist", Dictionary::new());
        add_intune_app_queries_schemes(&mut empty)?;
        assert_eq!(
            string_array(empty.data(), APPLICATION_QUERIES_SCHEMES)?,
            CORE_APP_QUERIES_SCHEMES.to_vec()
        );

        Ok(())
    }

    #[test]
    fn app_group_key() -> Result<()> {
        let mut plist = info_plist()?;

        configure_app_group_key(&release_entitlements()?, &mut plist)?;
        assert_eq!(
            plist
                .intune_mam_settings()
                .and_then(|s| s.get("AppGroupIdentifiers")),
            Some(&Value::Array(vec![Value::from("group.io.cordova.hellocordova")]))
        );

        let mut untouched = info_plist()?;
        let no_groups = PlistFile::new(Path::new("."), "x.entitlements", Dictionary::new());
        configure_app_group_key(&no_groups, &mut untouched)?;
        assert!(untouched.intune_mam_settings().is_none());

        Ok(())
    }

    #[test]
    fn mdmless_settings() -> Result<()> {
        let mut plist = info_plist()?;

        set_mdmless_settings(&mut plist)?;

        let settings = plist.intune_mam_settings().unwrap();
        assert_eq!(settings.get("MAMPolicyRequired"), Some(&Value::Boolean(true)));
        assert_eq!(settings.get("AutoEnrollOnLaunch"), Some(&Value::Boolean(true)));

        Ok(())
    }

    #[test]
    fn configuration_files_are_read_only() -> Result<()> {
        let project = hello_cordova()?;
        let before = project.to_pbxproj_string()?;

        assert_eq!(
            configuration_files(&project)?,
            vec![
                ConfigurationFiles {
                    config: DEBUG.to_string(),
                    name: Some("Debug".to_string()),
                    plist: INFO_PLIST_PATH.to_string(),
                    entitlements: None,
                },
                ConfigurationFiles {
                    config: RELEASE.to_string(),
                    name: Some("Release".to_string()),
                    plist: INFO_PLIST_PATH.to_string(),
                    entitlements: Some(RELEASE_ENTITLEMENTS_PATH.to_string()),
                },
            ]
        );

        let plan = plan_file_mapping(&project)?;
        assert_eq!(
            plan.entitlements_plist_mapping,
            vec![
                (
                    CREATED_ENTITLEMENTS_PATH.to_string(),
                    vec![INFO_PLIST_PATH.to_string()]
                ),
                (
                    RELEASE_ENTITLEMENTS_PATH.to_string(),
                    vec![INFO_PLIST_PATH.to_string()]
                ),
            ]
        );
        assert_eq!(
            plan.files,
            vec![
                CREATED_ENTITLEMENTS_PATH,
                INFO_PLIST_PATH,
                RELEASE_ENTITLEMENTS_PATH
            ]
        );
        assert_eq!(project.to_pbxproj_string()?, before);

        Ok(())
    }

    #[test]
    fn missing_entitlements_are_created_and_registered() -> Result<()> {
        let td = temp_dir()?;
        let mut project = hello_cordova()?;

        let (path, created) = create_entitlements_if_none(&mut project, DEBUG, td.path())?;
        assert_eq!(path, CREATED_ENTITLEMENTS_PATH);
        assert!(created);
        assert_eq!(
            project.entitlements_file_name(DEBUG)?.as_deref(),
            Some(CREATED_ENTITLEMENTS_PATH)
        );

        let data = Value::from_file(td.path().join(CREATED_ENTITLEMENTS_PATH))?;
        assert_eq!(data, Value::Dictionary(Dictionary::new()));

        assert!(project
            .objects_of_isa("PBXFileReference")?
            .iter()
            .any(|(_, file)| file.get("path").and_then(Value::as_string)
                == Some("HelloCordova.entitlements")));

        let (path, created) = create_entitlements_if_none(&mut project, RELEASE, td.path())?;
        assert_eq!(path, RELEASE_ENTITLEMENTS_PATH);
        assert!(!created);

        Ok(())
    }

    #[test]
    fn empty_entitlements_setting_gets_registered() -> Result<()> {
        let td = temp_dir()?;
        let settings = stage_hello_cordova(td.path())?;

        let mut project = settings.load_project()?;
        project
            .build_settings_mut(DEBUG)?
            .insert("CODE_SIGN_ENTITLEMENTS".into(), Value::from(""));

        let report = configure_intune_mam(&mut project, &settings)?;

        assert_eq!(
            project.entitlements_file_name(DEBUG)?.as_deref(),
            Some(CREATED_ENTITLEMENTS_PATH)
        );
        assert_eq!(
            project.entitlements_file_name(RELEASE)?.as_deref(),
            Some(RELEASE_ENTITLEMENTS_PATH)
        );
        assert_eq!(
            report.file_info.entitlements_plist_mapping[0].0,
            CREATED_ENTITLEMENTS_PATH
        );
        assert!(td.path().join(CREATED_ENTITLEMENTS_PATH).exists());

        Ok(())
    }

    #[test]
    fn existing_default_entitlements_are_not_overwritten() -> Result<()> {
        let td = temp_dir()?;
        let mut project = hello_cordova()?;

        let path = td.path().join(CREATED_ENTITLEMENTS_PATH);
        std::fs::create_dir_all(path.parent().unwrap())?;
        std::fs::write(&path, ENTITLEMENTS_RELEASE)?;

        create_entitlements_if_none(&mut project, DEBUG, td.path())?;
        assert_eq!(std::fs::read_to_string(&path)?, ENTITLEMENTS_RELEASE);

        Ok(())
    }

    #[test]
    fn missing_info_plist_is_an_error() -> Result<()> {
        let mut project = hello_cordova()?;
        project.build_settings_mut(DEBUG)?.remove("INFOPLIST_FILE");

        assert!(matches!(
            configuration_files(&project),
            Err(MamConfigError::MissingInfoPlist(config)) if config == DEBUG
        ));

        Ok(())
    }

    #[test]
    fn plist_and_entitlements_must_differ() -> Result<()> {
        let mut project = hello_cordova()?;
        project
            .build_settings_mut(RELEASE)?
            .insert("CODE_SIGN_ENTITLEMENTS".into(), Value::from(INFO_PLIST_PATH));

        assert!(matches!(
            plan_file_mapping(&project),
            Err(MamConfigError::SameFile(_))
        ));

        Ok(())
    }

    #[test]
    fn file_set_pairs() -> Result<()> {
        let td = temp_dir()?;
        stage_hello_cordova(td.path())?;

        let mut files = PlistFileSet::load_all(
            td.path(),
            &[INFO_PLIST_PATH.to_string(), RELEASE_ENTITLEMENTS_PATH.to_string()],
        )?;

        let (entitlements, plist) = files.pair_mut(RELEASE_ENTITLEMENTS_PATH, INFO_PLIST_PATH)?;
        assert_eq!(entitlements.relative_path(), RELEASE_ENTITLEMENTS_PATH);
        assert_eq!(plist.relative_path(), INFO_PLIST_PATH);

        let (plist, entitlements) = files.pair_mut(INFO_PLIST_PATH, RELEASE_ENTITLEMENTS_PATH)?;
        assert_eq!(entitlements.relative_path(), RELEASE_ENTITLEMENTS_PATH);
        assert_eq!(plist.relative_path(), INFO_PLIST_PATH);

        assert!(matches!(
            files.pair_mut(INFO_PLIST_PATH, INFO_PLIST_PATH),
            Err(MamConfigError::SameFile(_))
        ));
        assert!(matches!(
            files.pair_mut(INFO_PLIST_PATH, "missing.plist"),
            Err(MamConfigError::FileNotLoaded(_))
        ));
        assert!(files.get(INFO_PLIST_PATH).is_some());

        Ok(())
    }

    #[test]
    fn project_settings() -> Result<()> {
        let mut project = hello_cordova()?;

        let mut settings = MamSettings::default();
        settings.add_header_search_path("$(PROJECT_DIR)/IntuneMAM/Headers");
        settings.add_library_search_path("$(PROJECT_DIR)/IntuneMAM");
        settings.add_force_load_library("$(PROJECT_DIR)/IntuneMAM/libIntuneMAM.a");
        settings.add_linker_flag("-ObjC");
        settings.add_linker_flag("-lsqlite3");
        settings.set_disable_bitcode(true);
        settings.set_enable_keychain_sharing(true);

        apply_project_settings(&mut project, &settings)?;
        let once = project.to_pbxproj_string()?;
        apply_project_settings(&mut project, &settings)?;
        assert_eq!(project.to_pbxproj_string()?, once);

        for config in [DEBUG, RELEASE] {
            let build = project.build_settings(config)?;
            assert_eq!(
                build.get("ENABLE_BITCODE").and_then(Value::as_string),
                Some("NO")
            );
            assert_eq!(
                build.get("HEADER_SEARCH_PATHS"),
                Some(&Value::Array(vec![Value::from(
                    "$(PROJECT_DIR)/IntuneMAM/Headers"
                )]))
            );

            let flags = build
                .get("OTHER_LDFLAGS")
                .and_then(Value::as_array)
                .unwrap()
                .iter()
                .filter_map(Value::as_string)
                .collect::<Vec<_>>();
            assert_eq!(flags.iter().filter(|f| **f == "-ObjC").count(), 1);
            assert!(flags.contains(&"-lsqlite3"));
            assert!(flags.contains(&"-force_load"));
        }

        Ok(())
    }

    #[test]
    fn full_run_is_idempotent() -> Result<()> {
        let td = temp_dir()?;
        let settings = stage_hello_cordova(td.path())?;

        let mut project = settings.load_project()?;
        let report = configure_intune_mam(&mut project, &settings)?;
        project.save()?;

        assert_eq!(report.configurator_runs, 0);
        assert_eq!(report.written.len(), 3);
        assert_eq!(
            report.file_info.files,
            vec![
                CREATED_ENTITLEMENTS_PATH,
                INFO_PLIST_PATH,
                RELEASE_ENTITLEMENTS_PATH
            ]
        );

        let snapshot = |path: &str| std::fs::read(td.path().join(path));
        let info_once = snapshot(INFO_PLIST_PATH)?;
        let created_once = snapshot(CREATED_ENTITLEMENTS_PATH)?;
        let release_once = snapshot(RELEASE_ENTITLEMENTS_PATH)?;
        let project_once = std::fs::read_to_string(project.path())?;

        let mut project = settings.load_project()?;
        configure_intune_mam(&mut project, &settings)?;
        project.save()?;

        assert_eq!(snapshot(INFO_PLIST_PATH)?, info_once);
        assert_eq!(snapshot(CREATED_ENTITLEMENTS_PATH)?, created_once);
        assert_eq!(snapshot(RELEASE_ENTITLEMENTS_PATH)?, release_once);
        assert_eq!(std::fs::read_to_string(project.path())?, project_once);

        let plist = PlistFile::load(td.path(), INFO_PLIST_PATH)?;
        let mam = plist
            .data()
            .get(INTUNE_MAM_SETTINGS)
            .and_then(Value::as_dictionary)
            .unwrap();
        assert_eq!(mam.get("MAMPolicyRequired"), Some(&Value::Boolean(true)));
        assert_eq!(mam.get("AutoEnrollOnLaunch"), Some(&Value::Boolean(true)));

        for path in [CREATED_ENTITLEMENTS_PATH, RELEASE_ENTITLEMENTS_PATH] {
            let entitlements = PlistFile::load(td.path(), path)?;
            let groups = entitlements.keychain_access_groups()?;
            assert_eq!(groups.len(), 4);
            assert!(groups.contains(&"$(AppIdentifierPrefix)com.microsoft.intune.mam".to_string()));
        }

        let reloaded = settings.load_project()?;
        assert_eq!(
            reloaded.entitlements_file_name(DEBUG)?.as_deref(),
            Some(CREATED_ENTITLEMENTS_PATH)
        );

        Ok(())
    }
}
