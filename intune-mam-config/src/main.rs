// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    clap::{Arg, ArgMatches, Command},
    intune_mam_config::{
        configure_intune_mam, plan_file_mapping, MamConfigError, MamSettings,
        DEFAULT_PLATFORM_DIR,
    },
    log::{info, LevelFilter},
};

const CONFIGURE_ABOUT: &str = "\
Configure an iOS project for Intune MAM.

The Xcode project of the platform directory is located and the Info.plist
and entitlements files of its primary target are updated in place. Build
configurations without an entitlements file get one. The project itself is
then saved and, if a configurator is given, IntuneMAMConfigurator is run
against every Info.plist.

Running this command multiple times is harmless.
";

fn add_project_args(app: Command) -> Command {
    app.arg(
        Arg::new("platform_dir")
            .long("platform-dir")
            .takes_value(true)
            .env("INTUNE_MAM_PLATFORM_DIR")
            .default_value(DEFAULT_PLATFORM_DIR)
            .help("Directory containing the generated iOS project"),
    )
    .arg(
        Arg::new("project")
            .long("project")
            .takes_value(true)
            .help("Path to the .xcodeproj directory or project.pbxproj file to operate on"),
    )
}

fn settings_from_args(args: &ArgMatches) -> Result<MamSettings, MamConfigError> {
    let mut settings = MamSettings::default();

    settings.set_platform_dir(
        args.value_of("platform_dir")
            .ok_or_else(|| MamConfigError::CliBadArgument("--platform-dir".into()))?,
    );

    if let Some(path) = args.value_of("project") {
        settings.set_project_path(path);
    }

    Ok(settings)
}

fn command_configure(args: &ArgMatches) -> Result<(), MamConfigError> {
    let mut settings = settings_from_args(args)?;

    if let Some(path) = args.value_of("configurator") {
        settings.set_configurator(path);
    }
    if let Some(values) = args.values_of("header_search_path") {
        for value in values {
            settings.add_header_search_path(value);
        }
    }
    if let Some(values) = args.values_of("library_search_path") {
        for value in values {
            settings.add_library_search_path(value);
        }
    }
    if let Some(values) = args.values_of("force_load") {
        for value in values {
            settings.add_force_load_library(value);
        }
    }
    if let Some(values) = args.values_of("linker_flag") {
        for value in values {
            settings.add_linker_flag(value);
        }
    }
    settings.set_disable_bitcode(args.is_present("disable_bitcode"));
    settings.set_enable_keychain_sharing(args.is_present("enable_keychain_sharing"));

    let mut project = settings.load_project()?;
    let report = configure_intune_mam(&mut project, &settings)?;

    info!("writing {}", project.path().display());
    project.save()?;

    for path in &report.written {
        info!("updated {}", path.display());
    }
    info!(
        "configured {} file(s); configurator ran {} time(s)",
        report.file_info.files.len(),
        report.configurator_runs
    );

    Ok(())
}

fn command_print_file_mapping(args: &ArgMatches) -> Result<(), MamConfigError> {
    let settings = settings_from_args(args)?;
    let project = settings.load_project()?;

    let platform_dir = settings.platform_dir();
    for (entitlements, plists) in plan_file_mapping(&project)?.entitlements_plist_mapping {
        if platform_dir.join(&entitlements).exists() {
            println!("{}", entitlements);
        } else {
            println!("{} (will be created)", entitlements);
        }

        for plist in plists {
            println!("  {}", plist);
        }
    }

    Ok(())
}

fn main_impl() -> Result<(), MamConfigError> {
    let app = Command::new("Configure iOS projects for Intune MAM")
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Prepare iOS apps for the Intune App SDK")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .multiple_occurrences(true)
                .help("Increase logging verbosity. Can be specified multiple times."),
        );

    let app = app.subcommand(add_project_args(
        Command::new("configure")
            .about("Configure an iOS project for Intune MAM")
            .long_about(CONFIGURE_ABOUT)
            .arg(
                Arg::new("configurator")
                    .long("configurator")
                    .takes_value(true)
                    .env("INTUNE_MAM_CONFIGURATOR")
                    .help("Path to the IntuneMAMConfigurator executable"),
            )
            .arg(
                Arg::new("header_search_path")
                    .long("header-search-path")
                    .takes_value(true)
                    .multiple_occurrences(true)
                    .help("Path to add to HEADER_SEARCH_PATHS"),
            )
            .arg(
                Arg::new("library_search_path")
                    .long("library-search-path")
                    .takes_value(true)
                    .multiple_occurrences(true)
                    .help("Path to add to LIBRARY_SEARCH_PATHS"),
            )
            .arg(
                Arg::new("force_load")
                    .long("force-load")
                    .takes_value(true)
                    .multiple_occurrences(true)
                    .help("Static library to link with -force_load"),
            )
            .arg(
                Arg::new("linker_flag")
                    .long("linker-flag")
                    .takes_value(true)
                    .multiple_occurrences(true)
                    .allow_hyphen_values(true)
                    .help("Flag to add to OTHER_LDFLAGS"),
            )
            .arg(
                Arg::new("disable_bitcode")
                    .long("disable-bitcode")
                    .help("Set ENABLE_BITCODE to NO"),
            )
            .arg(
                Arg::new("enable_keychain_sharing")
                    .long("enable-keychain-sharing")
                    .help("Enable the keychain sharing capability of the app target"),
            ),
    ));

    let app = app.subcommand(add_project_args(
        Command::new("print-file-mapping")
            .about("Print the entitlements files and the Info.plist files paired with each"),
    ));

    let matches = app.get_matches();

    let log_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();

    match matches.subcommand() {
        Some(("configure", args)) => command_configure(args),
        Some(("print-file-mapping", args)) => command_print_file_mapping(args),
        _ => Err(MamConfigError::CliUnknownCommand),
    }
}

fn main() {
    let exit_code = match main_impl() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {}", err);
            1
        }
    };

    std::process::exit(exit_code)
}
