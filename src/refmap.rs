use log::{debug, info, warn};

use regional_results::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;
mod io_geojson;
mod render_svg;

use crate::refmap::config_reader::*;
use crate::refmap::io_common::*;
use crate::refmap::io_csv::read_csv_table;
use crate::refmap::io_excel::read_excel_table;
use crate::refmap::io_geojson::read_geojson;
use crate::refmap::render_svg::write_map_file;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RefmapError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a line of CSV file {path}"))]
    CsvLineParse { source: csv::Error, path: String },
    #[snafu(display("Column {column:?} not found in {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Line {lineno} of {path} is too short"))]
    LineTooShort { lineno: usize, path: String },
    #[snafu(display("Line {lineno} of {path}: column {column:?}: expected a vote count, found {content:?}"))]
    ParsingCount {
        lineno: usize,
        path: String,
        column: String,
        content: String,
    },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet or no header in Excel file {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Excel file {path} has several worksheets, set excelWorksheetName"))]
    AmbiguousWorksheet { path: String },
    #[snafu(display("Line {lineno}: unexpected cell {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },
    #[snafu(display("Invalid GeoJSON in {path}: {message}"))]
    InvalidGeoJson { path: String, message: String },
    #[snafu(display("Provider {provider:?} cannot read {path}"))]
    UnknownProvider { provider: String, path: String },
    #[snafu(display("Invalid delimiter {delimiter:?}: expected a single character"))]
    InvalidDelimiter { delimiter: String },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The pipeline could not run"))]
    Pipeline { source: PipelineErrors },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RefmapResult<T> = Result<T, RefmapError>;

fn read_table(cfs: &FileSource, root: &Path, default_delimiter: u8) -> RefmapResult<RawTable> {
    let path = cfs.resolve_path(root);
    info!("Attempting to read table {:?}", path);
    match cfs.provider.as_str() {
        "csv" => read_csv_table(&path, cfs.delimiter_byte(default_delimiter)?),
        "xlsx" | "excel" => read_excel_table(&path, cfs),
        x => UnknownProviderSnafu { provider: x, path }.fail(),
    }
}

fn read_geometries(
    cfs: &FileSource,
    root: &Path,
) -> RefmapResult<std::collections::BTreeMap<String, RegionGeometry>> {
    let path = cfs.resolve_path(root);
    info!("Attempting to read boundaries {:?}", path);
    match cfs.provider.as_str() {
        "geojson" => read_geojson(&path, cfs),
        x => UnknownProviderSnafu { provider: x, path }.fail(),
    }
}

/// Loads all the tables described by the configuration.
/// The file paths are relative to `root`.
pub fn read_inputs(config: &RefmapConfig, root: &Path) -> RefmapResult<PipelineInputs> {
    let sources = &config.sources;
    let regions = regions_from_table(&read_table(&sources.regions, root, b',')?, &sources.regions)?;
    let departments = departments_from_table(
        &read_table(&sources.departments, root, b',')?,
        &sources.departments,
    )?;
    let ballots = ballots_from_table(
        &read_table(&sources.referendum, root, b';')?,
        &sources.referendum,
    )?;
    let geometries = read_geometries(&sources.geometry, root)?;
    info!(
        "Read {} regions, {} departments, {} ballot rows, {} boundaries",
        regions.len(),
        departments.len(),
        ballots.len(),
        geometries.len()
    );
    Ok(PipelineInputs {
        regions,
        departments,
        ballots,
        geometries,
    })
}

fn overseas_filter_to_json(f: &OverseasFilter) -> JSValue {
    match f {
        OverseasFilter::NonDigit => json!("nonDigit"),
        OverseasFilter::Marker(m) => json!({ "marker": m }),
    }
}

fn build_summary_js(config: &RefmapConfig, rules: &PipelineRules, result: &PipelineResult) -> JSValue {
    let results: Vec<JSValue> = result
        .ratios
        .iter()
        .map(|rr| {
            json!({
                "code": rr.code_reg,
                "name": rr.name_reg,
                "registered": rr.counts.registered,
                "abstentions": rr.counts.abstentions,
                "null": rr.counts.null_votes,
                "choiceA": rr.counts.choice_a,
                "choiceB": rr.counts.choice_b,
                "ratio": rr.ratio.value(),
                "ratioDefined": rr.ratio.is_defined(),
            })
        })
        .collect();
    let warnings: Vec<String> = result.warnings.iter().map(|w| w.to_string()).collect();
    json!({
        "config": {
            "title": config.output_settings.title(),
            "rules": {
                "departmentCodeWidth": rules.department_code_width,
                "regionCodeWidth": rules.region_code_width,
                "overseasFilter": overseas_filter_to_json(&rules.overseas_filter),
            },
        },
        "stats": {
            "received": result.stats.received,
            "joined": result.stats.joined,
            "outOfScope": result.stats.out_of_scope,
            "unresolved": result.stats.unresolved,
            "regions": result.region_results.len(),
            "rendered": result.ratios.len(),
        },
        "results": results,
        "warnings": warnings,
        "digest": result.digest(),
    })
}

fn write_summary(config: &RefmapConfig, root: &Path, pretty_js: &str) -> RefmapResult<()> {
    match config.output_settings.summary_file.as_deref() {
        None | Some("stdout") => {
            println!("{}", pretty_js);
        }
        Some("") => {
            debug!("write_summary: no summary output");
        }
        Some(file) => {
            let path = config.output_path(root, file);
            if let Some(parent) = Path::new(&path).parent() {
                fs::create_dir_all(parent).context(WritingOutputSnafu { path: path.clone() })?;
            }
            fs::write(&path, pretty_js).context(WritingOutputSnafu { path: path.clone() })?;
            info!("Wrote summary to {}", path);
        }
    }
    Ok(())
}

/// Runs the whole referendum processing: loads the tables, runs the pipeline,
/// writes the summary and the map.
///
/// If a reference summary is given, the computed summary must match it.
/// Returns the computed summary.
pub fn run_referendum(
    config: &RefmapConfig,
    root: &Path,
    check_summary_path: Option<&str>,
) -> RefmapResult<JSValue> {
    debug!("run_referendum: config: {:?}", config);
    let rules = config.rules.pipeline_rules()?;

    let inputs = read_inputs(config, root)?;
    let result = run_pipeline(&inputs, &rules).context(PipelineSnafu {})?;
    if !result.warnings.is_empty() {
        warn!("{} data warnings, see the summary", result.warnings.len());
    }

    // Assemble the final json
    let result_js = build_summary_js(config, &rules, &result);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    write_summary(config, root, &pretty_js_stats)?;

    if let Some(map_file) = config.output_settings.map_file.as_deref() {
        let path = config.output_path(root, map_file);
        write_map_file(&path, &result.ratios, &config.output_settings)?;
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
        info!("The summary matches the reference {}", summary_p);
    }

    Ok(result_js)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::path::PathBuf;

    /// A fresh directory for the files of one test.
    pub fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("refmap_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    const REGIONS: &str = "id,code,name,slug\n1,11,Île-de-France,ile-de-france\n2,84,Auvergne-Rhône-Alpes,auvergne-rhone-alpes\n3,94,Corse,corse\n";

    const DEPARTMENTS: &str =
        "id,region_code,code,name,slug\n1,84,01,Ain,ain\n2,11,75,Paris,paris\n3,94,2A,Corse-du-Sud,corse-du-sud\n";

    const REFERENDUM: &str = "Department code;Department name;Town code;Town name;Registered;Abstentions;Null;Choice A;Choice B\n\
        1;AIN;1;L'Abergement-Clémenciat;60;10;5;30;15\n\
        1;AIN;2;L'Abergement-de-Varey;40;10;0;15;15\n\
        75;PARIS;56;Paris;200;180;20;0;0\n\
        2A;CORSE DU SUD;4;Ajaccio;100;20;10;40;30\n\
        ZA;GUADELOUPE;101;Les Abymes;100;60;2;20;18\n\
        99;NOWHERE;1;Nowhere;10;0;0;5;5\n";

    const GEOMETRY: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"code": "11"},
         "geometry": {"type": "Polygon", "coordinates": [[[2.0, 48.0], [3.0, 48.0], [3.0, 49.0], [2.0, 48.0]]]}},
        {"type": "Feature", "properties": {"code": "84"},
         "geometry": {"type": "Polygon", "coordinates": [[[4.0, 45.0], [6.0, 45.0], [6.0, 46.0], [4.0, 45.0]]]}},
        {"type": "Feature", "properties": {"code": "94"},
         "geometry": {"type": "Polygon", "coordinates": [[[8.5, 41.5], [9.5, 41.5], [9.5, 43.0], [8.5, 41.5]]]}}
    ]}"#;

    fn write_dataset(name: &str, rules: &str) -> PathBuf {
        let dir = scratch_dir(name);
        fs::write(dir.join("regions.csv"), REGIONS).unwrap();
        fs::write(dir.join("departments.csv"), DEPARTMENTS).unwrap();
        fs::write(dir.join("referendum.csv"), REFERENDUM).unwrap();
        fs::write(dir.join("regions.geojson"), GEOMETRY).unwrap();
        let config = format!(
            r#"{{
            "outputSettings": {{"title": "Test vote", "outputDirectory": "out", "summaryFile": "summary.json", "mapFile": "map.svg"}},
            "sources": {{
                "regions": {{"provider": "csv", "filePath": "regions.csv"}},
                "departments": {{"provider": "csv", "filePath": "departments.csv"}},
                "referendum": {{"provider": "csv", "filePath": "referendum.csv"}},
                "geometry": {{"provider": "geojson", "filePath": "regions.geojson"}}
            }},
            "rules": {}
        }}"#,
            rules
        );
        fs::write(dir.join("config.json"), config).unwrap();
        dir
    }

    fn load_config(dir: &Path) -> RefmapConfig {
        read_config(&dir.join("config.json").display().to_string()).unwrap()
    }

    #[test]
    fn end_to_end_default_rules() {
        let dir = write_dataset("e2e_default", "{}");
        let config = load_config(&dir);
        let js = run_referendum(&config, &dir, None).unwrap();

        let results = js["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["code"], "11");
        assert_eq!(results[0]["ratio"], JSValue::Null);
        assert_eq!(results[0]["ratioDefined"], false);
        assert_eq!(results[1]["code"], "84");
        assert_eq!(results[1]["registered"], 100);
        assert_eq!(results[1]["choiceA"], 45);
        assert_eq!(results[1]["ratio"], 0.6);

        // 2A and ZA are out of scope, 99 matches nothing.
        assert_eq!(js["stats"]["received"], 6);
        assert_eq!(js["stats"]["joined"], 3);
        assert_eq!(js["stats"]["outOfScope"], 2);
        assert_eq!(js["stats"]["unresolved"], 1);
        assert_eq!(js["warnings"].as_array().unwrap().len(), 1);

        let summary = read_summary(&dir.join("out/summary.json").display().to_string()).unwrap();
        assert_eq!(summary, js);
        let svg = fs::read_to_string(dir.join("out/map.svg")).unwrap();
        assert!(svg.contains(">Test vote</text>"));
        assert!(svg.contains(r#"class="reg undef" data-code="11""#));
        assert!(svg.contains(r#"data-code="84""#));
        assert!(!svg.contains(r#"data-code="94""#));
    }

    #[test]
    fn end_to_end_marker_rule_keeps_corsica() {
        let dir = write_dataset("e2e_marker", r#"{"overseasMarker": "Z"}"#);
        let config = load_config(&dir);
        let js = run_referendum(&config, &dir, None).unwrap();
        let codes: Vec<&str> = js["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["11", "84", "94"]);
        assert_eq!(js["stats"]["outOfScope"], 1);
        assert_eq!(js["config"]["rules"]["overseasFilter"]["marker"], "Z");
    }

    #[test]
    fn reference_comparison() {
        let dir = write_dataset("e2e_reference", "{}");
        let config = load_config(&dir);
        run_referendum(&config, &dir, None).unwrap();
        let reference = dir.join("out/summary.json").display().to_string();

        // Same inputs, same summary.
        assert!(run_referendum(&config, &dir, Some(&reference)).is_ok());

        let tampered = dir.join("tampered.json");
        let mut js = read_summary(&reference).unwrap();
        js["results"][1]["choiceA"] = json!(46);
        fs::write(&tampered, serde_json::to_string_pretty(&js).unwrap()).unwrap();
        let res = run_referendum(&config, &dir, Some(&tampered.display().to_string()));
        assert!(matches!(res, Err(RefmapError::Whatever { .. })));
    }

    #[test]
    fn missing_table_is_fatal() {
        let dir = write_dataset("e2e_missing", "{}");
        fs::write(dir.join("regions.csv"), "id,code,name,slug\n").unwrap();
        let config = load_config(&dir);
        let res = run_referendum(&config, &dir, None);
        assert!(matches!(
            res,
            Err(RefmapError::Pipeline {
                source: PipelineErrors::MissingTable(TableKind::Regions)
            })
        ));
    }

    #[test]
    fn unknown_provider() {
        let dir = write_dataset("e2e_provider", "{}");
        let mut config = load_config(&dir);
        config.sources.geometry.provider = "shapefile".to_string();
        let res = run_referendum(&config, &dir, None);
        assert!(matches!(res, Err(RefmapError::UnknownProvider { .. })));
    }
}
