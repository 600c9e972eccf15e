use clap::Parser;

/// Regional referendum results and choropleth ratio maps.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the sources, the rules and the outputs.
    /// The file paths inside are relative to the directory of this file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, refmap will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the results will be written in JSON format
    /// to the given location. Setting this option overrides the summary file of the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the choropleth map will be written in SVG format to the given
    /// location. Setting this option overrides the map file of the --config option.
    #[clap(short, long, value_parser)]
    pub map: Option<String>,

    /// (file path) The region table. Overrides the source of the --config option.
    #[clap(long, value_parser)]
    pub regions: Option<String>,

    /// (file path) The department table. Overrides the source of the --config option.
    #[clap(long, value_parser)]
    pub departments: Option<String>,

    /// (file path) The referendum results per department. Overrides the source of the --config option.
    #[clap(long, value_parser)]
    pub referendum: Option<String>,

    /// (file path) The region boundaries in GeoJSON. Overrides the source of the --config option.
    #[clap(long, value_parser)]
    pub geometry: Option<String>,

    /// (default csv) The type of the tables given on the command line: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (string or not specified) Only the department codes containing this marker are treated as
    /// overseas or foreign-resident. By default, any code containing a letter is.
    #[clap(long, value_parser)]
    pub overseas_marker: Option<String>,

    /// The title drawn on the map.
    #[clap(long, value_parser)]
    pub title: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
