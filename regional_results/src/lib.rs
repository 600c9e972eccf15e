mod aggregate;
mod areas;
mod ballots;
pub mod builder;
mod codes;
mod config;
pub mod manual;
mod ratio;

use log::{debug, info};

use std::collections::BTreeMap;
use std::fmt::Write;

pub use crate::aggregate::{aggregate_regions, total_counts};
pub use crate::areas::{resolve_areas, AreaTable};
pub use crate::ballots::{join_ballots, JoinedBallot, JoinedBallots};
pub use crate::codes::{is_out_of_scope, normalize_code};
pub use crate::config::*;
pub use crate::ratio::compute_ratios;
pub use geo::MultiPolygon;

/// All the tables the pipeline consumes.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct PipelineInputs {
    pub regions: Vec<Region>,
    pub departments: Vec<Department>,
    pub ballots: Vec<BallotRecord>,
    /// Region boundaries, keyed by region code.
    pub geometries: BTreeMap<String, RegionGeometry>,
}

/// Everything produced by one run of the pipeline.
#[derive(PartialEq, Debug, Clone)]
pub struct PipelineResult {
    pub areas: AreaTable,
    /// Sums per region, keyed by normalized region code.
    pub region_results: BTreeMap<String, RegionResult>,
    /// The rendered regions, sorted by region code.
    pub ratios: Vec<RegionRatio>,
    /// The data problems, in the order of the stages that found them.
    pub warnings: Vec<DataWarning>,
    pub stats: JoinStats,
}

impl PipelineResult {
    /// The canonical text form of the ratio table, one line per region.
    pub fn canonical_table(&self) -> String {
        let mut out = String::new();
        for r in self.ratios.iter() {
            // Writing into a String cannot fail.
            let _ = writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                r.code_reg,
                r.name_reg,
                r.counts.registered,
                r.counts.abstentions,
                r.counts.null_votes,
                r.counts.choice_a,
                r.counts.choice_b,
                r.ratio
            );
        }
        out
    }

    /// SHA-256 of [PipelineResult::canonical_table], in hex.
    ///
    /// Two runs over the same inputs give the same digest.
    pub fn digest(&self) -> String {
        sha256::digest(self.canonical_table().as_str())
    }
}

/// Runs the whole pipeline: areas, ballots join, regional sums and ratios.
///
/// Arguments:
/// * `inputs` the tables to process. None of them may be empty.
/// * `rules` the normalization and filtering rules
///
/// Row-level problems do not stop the run. They are returned in
/// [PipelineResult::warnings].
pub fn run_pipeline(
    inputs: &PipelineInputs,
    rules: &PipelineRules,
) -> Result<PipelineResult, PipelineErrors> {
    info!(
        "Processing {} ballots, {} departments, {} regions, {} geometries, rules: {:?}",
        inputs.ballots.len(),
        inputs.departments.len(),
        inputs.regions.len(),
        inputs.geometries.len(),
        rules
    );
    rules.check()?;
    check_tables(inputs)?;

    let mut warnings: Vec<DataWarning> = Vec::new();

    let areas = resolve_areas(&inputs.regions, &inputs.departments, rules);
    warnings.extend(areas.warnings);
    let areas = areas.value;

    let (region_results, stats) = {
        let joined = join_ballots(&inputs.ballots, &areas, rules);
        warnings.extend(joined.warnings);
        let aggregated = aggregate_regions(&joined.value.rows)?;
        warnings.extend(aggregated.warnings);
        (aggregated.value, joined.value.stats)
    };

    let ratios = compute_ratios(&region_results, &inputs.geometries, rules);
    warnings.extend(ratios.warnings);

    for r in ratios.value.iter() {
        info!(
            "{:>4} {:<32} {:>10} {:>10} -> {}",
            r.code_reg, r.name_reg, r.counts.choice_a, r.counts.choice_b, r.ratio
        );
    }
    debug!("run_pipeline: warnings: {:?}", warnings);

    Ok(PipelineResult {
        areas,
        region_results,
        ratios: ratios.value,
        warnings,
        stats,
    })
}

fn check_tables(inputs: &PipelineInputs) -> Result<(), PipelineErrors> {
    let tables = [
        (TableKind::Regions, inputs.regions.is_empty()),
        (TableKind::Departments, inputs.departments.is_empty()),
        (TableKind::Ballots, inputs.ballots.is_empty()),
        (TableKind::Geometries, inputs.geometries.is_empty()),
    ];
    match tables.iter().find(|(_, empty)| *empty) {
        Some((kind, _)) => Err(PipelineErrors::MissingTable(*kind)),
        None => Ok(()),
    }
}
