mod args;
mod refmap;

use std::env;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, info, warn};
use snafu::{prelude::*, ErrorCompat};

use crate::args::Args;
use crate::refmap::config_reader::*;
use crate::refmap::{run_referendum, MissingParentDirSnafu, RefmapResult};

fn absolute(path: &str) -> RefmapResult<String> {
    let p = Path::new(path);
    if p.is_absolute() {
        return Ok(path.to_string());
    }
    let cwd = env::current_dir().context(refmap::OpeningFileSnafu { path: "." })?;
    Ok(cwd.join(p).display().to_string())
}

/// Builds the configuration from the command line, starting from the
/// configuration file if one is given.
///
/// Returns the configuration and the directory its paths are relative to.
fn config_from_args(args: &Args) -> RefmapResult<(RefmapConfig, PathBuf)> {
    let (mut config, root) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root = Path::new(config_path)
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root)
        }
        None => {
            let provider = args.input_type.as_deref().unwrap_or("csv");
            let (regions, departments, referendum, geometry) = match (
                &args.regions,
                &args.departments,
                &args.referendum,
                &args.geometry,
            ) {
                (Some(r), Some(d), Some(v), Some(g)) => (r, d, v, g),
                _ => whatever!(
                    "Without --config, all of --regions, --departments, --referendum and --geometry are required"
                ),
            };
            let config = RefmapConfig::from_paths(regions, departments, referendum, geometry, provider);
            let root = env::current_dir().context(refmap::OpeningFileSnafu { path: "." })?;
            (config, root)
        }
    };

    // Paths given on the command line are relative to the working directory.
    let sources = &mut config.sources;
    let overrides = [
        (&args.regions, &mut sources.regions),
        (&args.departments, &mut sources.departments),
        (&args.referendum, &mut sources.referendum),
        (&args.geometry, &mut sources.geometry),
    ];
    for (arg, source) in overrides {
        if let Some(p) = arg {
            source.file_path = absolute(p)?;
        }
    }
    if let Some(input_type) = &args.input_type {
        for source in [
            &mut config.sources.regions,
            &mut config.sources.departments,
            &mut config.sources.referendum,
        ] {
            source.provider = input_type.clone();
        }
    }

    let settings = &mut config.output_settings;
    if let Some(out) = &args.out {
        settings.summary_file = Some(match out.as_str() {
            "stdout" | "" => out.clone(),
            x => absolute(x)?,
        });
    }
    if let Some(map) = &args.map {
        settings.map_file = match map.as_str() {
            "" => None,
            x => Some(absolute(x)?),
        };
    }
    if let Some(title) = &args.title {
        settings.title = Some(title.clone());
    }
    if let Some(marker) = &args.overseas_marker {
        config.rules.overseas_marker = Some(marker.clone());
    }
    debug!("config_from_args: config: {:?} root: {:?}", config, root);
    Ok((config, root))
}

fn run(args: &Args) -> RefmapResult<()> {
    let (config, root) = config_from_args(args)?;
    run_referendum(&config, &root, args.reference.as_deref())?;
    Ok(())
}

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    debug!("args: {:?}", args);

    if let Err(e) = run(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        for cause in ErrorCompat::iter_chain(&e).skip(1) {
            eprintln!("  caused by: {}", cause);
        }
        std::process::exit(1);
    }
    info!("Done");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Args {
        let mut all = vec!["refmap"];
        all.extend_from_slice(v);
        Args::parse_from(all)
    }

    #[test]
    fn paths_without_config() {
        let a = args(&[
            "--regions",
            "/d/regions.csv",
            "--departments",
            "/d/departments.csv",
            "--referendum",
            "/d/referendum.csv",
            "--geometry",
            "/d/regions.geojson",
            "--map",
            "/tmp/map.svg",
            "--overseas-marker",
            "Z",
        ]);
        let (config, _) = config_from_args(&a).unwrap();
        assert_eq!(config.sources.regions.file_path, "/d/regions.csv");
        assert_eq!(config.sources.referendum.delimiter.as_deref(), Some(";"));
        assert_eq!(config.output_settings.map_file.as_deref(), Some("/tmp/map.svg"));
        assert_eq!(config.output_settings.summary_file, None);
        assert_eq!(config.rules.overseas_marker.as_deref(), Some("Z"));
    }

    #[test]
    fn missing_paths_without_config() {
        let a = args(&["--regions", "/d/regions.csv"]);
        assert!(config_from_args(&a).is_err());
    }

    #[test]
    fn overrides_of_a_config_file() {
        let dir = crate::refmap::tests::scratch_dir("main_overrides");
        let config_path = dir.join("config.json");
        std::fs::write(
            &config_path,
            r#"{
            "outputSettings": {"title": "From file", "summaryFile": "summary.json"},
            "sources": {
                "regions": {"provider": "csv", "filePath": "regions.csv"},
                "departments": {"provider": "csv", "filePath": "departments.csv"},
                "referendum": {"provider": "csv", "filePath": "referendum.csv"},
                "geometry": {"provider": "geojson", "filePath": "regions.geojson"}
            }
        }"#,
        )
        .unwrap();
        let config_s = config_path.display().to_string();
        let a = args(&[
            "--config",
            &config_s,
            "--out",
            "stdout",
            "--title",
            "From the command line",
            "--input-type",
            "xlsx",
            "--departments",
            "/elsewhere/departments.xlsx",
        ]);
        let (config, root) = config_from_args(&a).unwrap();
        assert_eq!(root, dir);
        assert_eq!(config.output_settings.summary_file.as_deref(), Some("stdout"));
        assert_eq!(config.output_settings.title(), "From the command line");
        assert_eq!(config.sources.regions.file_path, "regions.csv");
        assert_eq!(config.sources.regions.provider, "xlsx");
        assert_eq!(config.sources.departments.file_path, "/elsewhere/departments.xlsx");
        assert_eq!(config.sources.geometry.provider, "geojson");
    }
}
