use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::refmap::*;

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "title")]
    pub title: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    /// A file path, or `stdout`.
    #[serde(rename = "summaryFile")]
    pub summary_file: Option<String>,
    #[serde(rename = "mapFile")]
    pub map_file: Option<String>,
    #[serde(rename = "mapWidth")]
    pub map_width: Option<u32>,
}

impl OutputSettings {
    pub const DEFAULT_TITLE: &'static str = "Referendum results: Choice A ratio";
    pub const DEFAULT_MAP_WIDTH: u32 = 800;

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(Self::DEFAULT_TITLE)
    }

    pub fn map_width(&self) -> u32 {
        self.map_width.unwrap_or(Self::DEFAULT_MAP_WIDTH)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// A single character. Each table has its own default.
    #[serde(rename = "delimiter")]
    pub delimiter: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "codeColumn")]
    pub code_column: Option<String>,
    #[serde(rename = "nameColumn")]
    pub name_column: Option<String>,
    #[serde(rename = "regionCodeColumn")]
    pub region_code_column: Option<String>,
    #[serde(rename = "departmentCodeColumn")]
    pub department_code_column: Option<String>,
    #[serde(rename = "registeredColumn")]
    pub registered_column: Option<String>,
    #[serde(rename = "abstentionsColumn")]
    pub abstentions_column: Option<String>,
    #[serde(rename = "nullColumn")]
    pub null_column: Option<String>,
    #[serde(rename = "choiceAColumn")]
    pub choice_a_column: Option<String>,
    #[serde(rename = "choiceBColumn")]
    pub choice_b_column: Option<String>,
    /// The feature property holding the region code, for GeoJSON sources.
    #[serde(rename = "codeProperty")]
    pub code_property: Option<String>,
}

impl FileSource {
    pub fn new(provider: &str, file_path: &str) -> FileSource {
        FileSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            delimiter: None,
            excel_worksheet_name: None,
            code_column: None,
            name_column: None,
            region_code_column: None,
            department_code_column: None,
            registered_column: None,
            abstentions_column: None,
            null_column: None,
            choice_a_column: None,
            choice_b_column: None,
            code_property: None,
        }
    }

    /// The path of the source, relative to `root` unless it is absolute.
    pub fn resolve_path(&self, root: &Path) -> String {
        let p: PathBuf = root.join(&self.file_path);
        p.as_path().display().to_string()
    }

    pub fn delimiter_byte(&self, default: u8) -> RefmapResult<u8> {
        match self.delimiter.as_deref() {
            None => Ok(default),
            Some("\\t") => Ok(b'\t'),
            Some(d) if d.len() == 1 && d.is_ascii() => Ok(d.as_bytes()[0]),
            Some(d) => InvalidDelimiterSnafu { delimiter: d }.fail(),
        }
    }

    pub fn code_column(&self) -> &str {
        self.code_column.as_deref().unwrap_or("code")
    }

    pub fn name_column(&self) -> &str {
        self.name_column.as_deref().unwrap_or("name")
    }

    pub fn region_code_column(&self) -> &str {
        self.region_code_column.as_deref().unwrap_or("region_code")
    }

    pub fn department_code_column(&self) -> &str {
        self.department_code_column
            .as_deref()
            .unwrap_or("Department code")
    }

    pub fn registered_column(&self) -> &str {
        self.registered_column.as_deref().unwrap_or("Registered")
    }

    pub fn abstentions_column(&self) -> &str {
        self.abstentions_column.as_deref().unwrap_or("Abstentions")
    }

    pub fn null_column(&self) -> &str {
        self.null_column.as_deref().unwrap_or("Null")
    }

    pub fn choice_a_column(&self) -> &str {
        self.choice_a_column.as_deref().unwrap_or("Choice A")
    }

    pub fn choice_b_column(&self) -> &str {
        self.choice_b_column.as_deref().unwrap_or("Choice B")
    }

    pub fn code_property(&self) -> &str {
        self.code_property.as_deref().unwrap_or("code")
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Sources {
    pub regions: FileSource,
    pub departments: FileSource,
    pub referendum: FileSource,
    pub geometry: FileSource,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesSettings {
    #[serde(rename = "departmentCodeWidth")]
    pub department_code_width: Option<usize>,
    #[serde(rename = "regionCodeWidth")]
    pub region_code_width: Option<usize>,
    #[serde(rename = "overseasMarker")]
    pub overseas_marker: Option<String>,
}

impl RulesSettings {
    pub fn pipeline_rules(&self) -> RefmapResult<PipelineRules> {
        let defaults = PipelineRules::DEFAULT_RULES;
        let department_code_width = match self.department_code_width {
            None => defaults.department_code_width,
            Some(x) if x > 0 => x,
            Some(x) => whatever!("departmentCodeWidth must be at least 1, got {}", x),
        };
        let region_code_width = match self.region_code_width {
            None => defaults.region_code_width,
            Some(x) if x > 0 => x,
            Some(x) => whatever!("regionCodeWidth must be at least 1, got {}", x),
        };
        let overseas_filter = match self.overseas_marker.as_deref() {
            None => OverseasFilter::NonDigit,
            Some("") => whatever!("overseasMarker may not be empty"),
            Some(m) => OverseasFilter::Marker(m.to_string()),
        };
        Ok(PipelineRules {
            department_code_width,
            region_code_width,
            overseas_filter,
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RefmapConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    pub sources: Sources,
    #[serde(default)]
    pub rules: RulesSettings,
}

impl RefmapConfig {
    /// A configuration for the usual layout of the files: CSV tables, the
    /// referendum table separated by `;`, and GeoJSON boundaries.
    pub fn from_paths(
        regions: &str,
        departments: &str,
        referendum: &str,
        geometry: &str,
        provider: &str,
    ) -> RefmapConfig {
        let mut referendum_source = FileSource::new(provider, referendum);
        if provider == "csv" {
            referendum_source.delimiter = Some(";".to_string());
        }
        RefmapConfig {
            output_settings: OutputSettings::default(),
            sources: Sources {
                regions: FileSource::new(provider, regions),
                departments: FileSource::new(provider, departments),
                referendum: referendum_source,
                geometry: FileSource::new("geojson", geometry),
            },
            rules: RulesSettings::default(),
        }
    }

    /// Where an output file lands: under the output directory if one is set,
    /// otherwise next to the configuration.
    pub fn output_path(&self, root: &Path, file: &str) -> String {
        let dir: PathBuf = match &self.output_settings.output_directory {
            Some(d) => root.join(d),
            None => root.to_path_buf(),
        };
        dir.join(file).as_path().display().to_string()
    }
}

pub fn read_config(path: &str) -> RefmapResult<RefmapConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let config: RefmapConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: &str) -> RefmapResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}
