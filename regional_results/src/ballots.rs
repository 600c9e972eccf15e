use log::{debug, info, warn};

use crate::areas::AreaTable;
use crate::codes::{is_out_of_scope, normalize_code};
use crate::config::*;

/// A ballot record attached to its area.
///
/// Both sides are borrowed from the tables given to [join_ballots].
/// `area.code_dep` is the normalized department code of the ballot.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct JoinedBallot<'a> {
    pub ballot: &'a BallotRecord,
    pub area: &'a AreaLookup,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct JoinedBallots<'a> {
    pub rows: Vec<JoinedBallot<'a>>,
    pub stats: JoinStats,
}

/// Attaches each ballot to its area.
///
/// The overseas filter runs first: these ballots are counted and skipped
/// without any warning. The remaining ballots are joined on the normalized
/// department code. Those that match no area are reported as
/// [DataWarning::UnresolvedKey] and left out.
pub fn join_ballots<'a>(
    ballots: &'a [BallotRecord],
    areas: &'a AreaTable,
    rules: &PipelineRules,
) -> StageOutput<JoinedBallots<'a>> {
    let mut warnings: Vec<DataWarning> = Vec::new();
    let mut rows: Vec<JoinedBallot<'a>> = Vec::new();
    let mut stats = JoinStats {
        received: ballots.len(),
        ..JoinStats::default()
    };

    for ballot in ballots.iter() {
        let code = normalize_code(&ballot.department_code, rules.department_code_width);
        if is_out_of_scope(&code, &rules.overseas_filter) {
            debug!("join_ballots: out of scope code {:?}", code);
            stats.out_of_scope += 1;
            continue;
        }
        match areas.get(&code) {
            Some(area) => {
                rows.push(JoinedBallot { ballot, area });
                stats.joined += 1;
            }
            None => {
                warn!("join_ballots: unresolved department code {:?}", code);
                warnings.push(DataWarning::UnresolvedKey { code });
                stats.unresolved += 1;
            }
        }
    }

    info!(
        "Joined {} ballots out of {} ({} overseas or foreign, {} unresolved)",
        stats.joined, stats.received, stats.out_of_scope, stats.unresolved
    );
    StageOutput {
        value: JoinedBallots { rows, stats },
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::areas::resolve_areas;

    fn areas() -> AreaTable {
        let regions = vec![
            Region {
                code: "84".to_string(),
                name: "ARA".to_string(),
            },
            Region {
                code: "94".to_string(),
                name: "Corse".to_string(),
            },
        ];
        let departments = vec![
            Department {
                code: "1".to_string(),
                region_code: "84".to_string(),
                name: "Ain".to_string(),
            },
            Department {
                code: "2A".to_string(),
                region_code: "94".to_string(),
                name: "Corse-du-Sud".to_string(),
            },
        ];
        resolve_areas(&regions, &departments, &PipelineRules::DEFAULT_RULES).value
    }

    fn ballot(code: &str, a: u64, b: u64) -> BallotRecord {
        BallotRecord {
            department_code: code.to_string(),
            registered: a + b + 10,
            abstentions: 8,
            null_votes: 2,
            choice_a: a,
            choice_b: b,
        }
    }

    #[test]
    fn joins_on_padded_code() {
        let areas = areas();
        let ballots = vec![ballot("1", 10, 5), ballot("01", 3, 3), ballot(" 1", 1, 1)];
        let res = join_ballots(&ballots, &areas, &PipelineRules::DEFAULT_RULES);
        assert!(res.warnings.is_empty());
        assert_eq!(res.value.rows.len(), 3);
        assert!(res.value.rows.iter().all(|r| r.area.code_dep == "01"));
        assert_eq!(res.value.stats.joined, 3);
    }

    #[test]
    fn overseas_ballots_are_not_errors() {
        let areas = areas();
        let ballots = vec![ballot("01", 10, 5), ballot("ZA", 3, 3), ballot("ZZ", 1, 1)];
        let res = join_ballots(&ballots, &areas, &PipelineRules::DEFAULT_RULES);
        assert!(res.warnings.is_empty());
        assert_eq!(
            res.value.stats,
            JoinStats {
                received: 3,
                joined: 1,
                out_of_scope: 2,
                unresolved: 0
            }
        );
        for r in res.value.rows.iter() {
            assert!(r.area.code_dep.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn unknown_digit_code_is_reported() {
        let areas = areas();
        let ballots = vec![ballot("01", 10, 5), ballot("99", 3, 3)];
        let res = join_ballots(&ballots, &areas, &PipelineRules::DEFAULT_RULES);
        assert_eq!(res.value.rows.len(), 1);
        assert_eq!(res.value.stats.unresolved, 1);
        assert_eq!(
            res.warnings,
            vec![DataWarning::UnresolvedKey {
                code: "99".to_string()
            }]
        );
    }

    #[test]
    fn marker_filter_keeps_corsica() {
        let areas = areas();
        let rules = PipelineRules {
            overseas_filter: OverseasFilter::Marker("Z".to_string()),
            ..PipelineRules::DEFAULT_RULES
        };
        let ballots = vec![ballot("2A", 10, 5), ballot("ZA", 3, 3), ballot("2B", 1, 1)];
        let res = join_ballots(&ballots, &areas, &rules);
        assert_eq!(res.value.rows.len(), 1);
        assert_eq!(res.value.rows[0].area.name_dep, "Corse-du-Sud");
        assert_eq!(res.value.stats.out_of_scope, 1);
        // 2B is not a marker code and no department knows it.
        assert_eq!(
            res.warnings,
            vec![DataWarning::UnresolvedKey {
                code: "2B".to_string()
            }]
        );
    }

    #[test]
    fn default_filter_drops_corsica() {
        let areas = areas();
        let ballots = vec![ballot("2A", 10, 5)];
        let res = join_ballots(&ballots, &areas, &PipelineRules::DEFAULT_RULES);
        assert!(res.value.rows.is_empty());
        assert!(res.warnings.is_empty());
        assert_eq!(res.value.stats.out_of_scope, 1);
    }
}
