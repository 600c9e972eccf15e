use log::{debug, info, warn};

use std::collections::BTreeMap;

use crate::ballots::JoinedBallot;
use crate::config::*;

// The running state of one region group.
struct RegionGroup {
    // Distinct names seen in the group, in order of appearance.
    names: Vec<String>,
    counts: VoteCounts,
}

/// Sums the vote categories of the joined ballots, per region code.
///
/// A group whose members do not agree on the region name cannot be given a
/// single identity: it is left out and reported as
/// [DataWarning::InconsistentGrouping].
///
/// Fails with [PipelineErrors::CountOverflow] if the sums of a region do not
/// fit in the counters.
pub fn aggregate_regions(
    joined: &[JoinedBallot],
) -> Result<StageOutput<BTreeMap<String, RegionResult>>, PipelineErrors> {
    let mut groups: BTreeMap<&str, RegionGroup> = BTreeMap::new();
    for row in joined.iter() {
        let group = groups
            .entry(row.area.code_reg.as_str())
            .or_insert_with(|| RegionGroup {
                names: Vec::new(),
                counts: VoteCounts::EMPTY,
            });
        if !group.names.contains(&row.area.name_reg) {
            group.names.push(row.area.name_reg.clone());
        }
        group.counts = group
            .counts
            .checked_add(&row.ballot.counts())
            .ok_or_else(|| PipelineErrors::CountOverflow {
                region_code: row.area.code_reg.clone(),
            })?;
    }

    let mut warnings: Vec<DataWarning> = Vec::new();
    let mut results: BTreeMap<String, RegionResult> = BTreeMap::new();
    for (code_reg, group) in groups {
        match group.names.as_slice() {
            [name_reg] => {
                debug!(
                    "aggregate_regions: region {} ({}): {:?}",
                    code_reg, name_reg, group.counts
                );
                results.insert(
                    code_reg.to_string(),
                    RegionResult {
                        code_reg: code_reg.to_string(),
                        name_reg: name_reg.clone(),
                        counts: group.counts,
                    },
                );
            }
            names => {
                warn!(
                    "aggregate_regions: region {} has inconsistent names {:?}",
                    code_reg, names
                );
                warnings.push(DataWarning::InconsistentGrouping {
                    region_code: code_reg.to_string(),
                    names: names.to_vec(),
                });
            }
        }
    }

    info!("Aggregated {} ballots into {} regions", joined.len(), results.len());
    Ok(StageOutput {
        value: results,
        warnings,
    })
}

/// The sums over all the given ballots, regardless of their region, or
/// `None` if they overflow.
pub fn total_counts(joined: &[JoinedBallot]) -> Option<VoteCounts> {
    joined
        .iter()
        .try_fold(VoteCounts::EMPTY, |acc, row| acc.checked_add(&row.ballot.counts()))
}
