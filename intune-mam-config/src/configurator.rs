// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Invocation of the `IntuneMAMConfigurator` executable.

The configurator ships with the Intune App SDK. Given an `Info.plist`, it
adds the document type and UTI declarations the SDK requires.
*/

use {
    crate::{
        error::{MamConfigError, Result},
        settings::MamSettings,
    },
    log::{info, warn},
    std::{
        io::{BufRead, BufReader},
        path::{Path, PathBuf},
    },
    xcode_project::XcodeProject,
};

/// Grant execute permission on a file.
#[cfg(unix)]
pub fn ensure_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    std::fs::set_permissions(path, permissions)?;

    Ok(())
}

/// Grant execute permission on a file.
#[cfg(not(unix))]
pub fn ensure_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Run the configurator against a single plist.
///
/// Output of the process is logged line by line. A non-zero exit is an
/// error.
pub fn run_configurator(configurator: &Path, plist: &Path) -> Result<()> {
    info!("running {} {}", configurator.display(), plist.display());

    let command = duct::cmd(configurator, &[plist])
        .stderr_to_stdout()
        .unchecked()
        .reader()?;
    {
        let reader = BufReader::new(&command);
        for line in reader.lines() {
            info!("{}", line?);
        }
    }

    let output = command.try_wait()?.ok_or_else(|| {
        MamConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "unable to wait on configurator",
        ))
    })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(MamConfigError::ConfiguratorFailed {
            plist: plist.to_path_buf(),
            status: output.status.to_string(),
        })
    }
}

/// Absolute paths of the distinct plists of the primary target's configurations.
pub fn distinct_plist_paths(project: &XcodeProject, platform_dir: &Path) -> Result<Vec<PathBuf>> {
    let platform_dir = if platform_dir.is_absolute() {
        platform_dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(platform_dir)
    };

    let mut paths = vec![];
    for config in project.native_target_config_list()? {
        let name = project
            .plist_file_name(&config)?
            .ok_or_else(|| MamConfigError::MissingInfoPlist(config.clone()))?;

        let path = platform_dir.join(name);
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    Ok(paths)
}

/// Add the Intune UTI declarations to every plist of the project.
///
/// Returns the number of configurator invocations. If no configurator is
/// configured, the step is skipped.
pub fn add_intune_utis(project: &XcodeProject, settings: &MamSettings) -> Result<usize> {
    let configurator = match settings.configurator() {
        Some(path) => path,
        None => {
            warn!("no IntuneMAMConfigurator defined; not adding Intune UTIs to plists");
            return Ok(0);
        }
    };

    info!("Starting Step: Adding Intune UTIs to plists");

    ensure_executable(configurator)?;

    let plists = distinct_plist_paths(project, settings.platform_dir())?;
    for plist in &plists {
        run_configurator(configurator, plist)?;
    }

    Ok(plists.len())
}
