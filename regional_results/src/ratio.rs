use log::{debug, info, warn};

use std::collections::BTreeMap;

use crate::codes::normalize_code;
use crate::config::*;

/// Joins the region results to their boundary and computes the ratio of
/// `choice_a` among the expressed ballots.
///
/// Regions without a boundary cannot be drawn: they are left out with a
/// [DataWarning::MissingGeometry]. The output is sorted by region code.
pub fn compute_ratios(
    results: &BTreeMap<String, RegionResult>,
    geometries: &BTreeMap<String, RegionGeometry>,
    rules: &PipelineRules,
) -> StageOutput<Vec<RegionRatio>> {
    // The geometry keys come from another provider: bring them to the same form.
    let mut by_code: BTreeMap<String, &RegionGeometry> = BTreeMap::new();
    for (code, geometry) in geometries.iter() {
        let code = normalize_code(code, rules.region_code_width);
        if by_code.contains_key(&code) {
            warn!("compute_ratios: duplicate geometry for region {:?}", code);
        } else {
            by_code.insert(code, geometry);
        }
    }

    let mut warnings: Vec<DataWarning> = Vec::new();
    let mut ratios: Vec<RegionRatio> = Vec::new();
    for (code_reg, result) in results.iter() {
        let geometry = match by_code.get(code_reg) {
            Some(g) => *g,
            None => {
                warn!("compute_ratios: no geometry for region {:?}", code_reg);
                warnings.push(DataWarning::MissingGeometry {
                    region_code: code_reg.clone(),
                });
                continue;
            }
        };
        let ratio = Ratio::from_counts(&result.counts);
        debug!(
            "compute_ratios: region {} ({}): ratio {}",
            code_reg, result.name_reg, ratio
        );
        ratios.push(RegionRatio {
            code_reg: code_reg.clone(),
            name_reg: result.name_reg.clone(),
            counts: result.counts,
            boundary: geometry.boundary.clone(),
            ratio,
        });
    }
    // Iterating a BTreeMap already yields ascending codes.
    debug_assert!(ratios.windows(2).all(|w| w[0].code_reg < w[1].code_reg));

    let unused = by_code
        .keys()
        .filter(|code| !results.contains_key(code.as_str()))
        .count();
    if unused > 0 {
        info!("{} geometries have no results attached", unused);
    }
    info!(
        "Computed ratios for {} regions ({} undefined)",
        ratios.len(),
        ratios.iter().filter(|r| !r.ratio.is_defined()).count()
    );
    StageOutput {
        value: ratios,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn square(x: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x, y: 0.0),
            (x: x + 1.0, y: 0.0),
            (x: x + 1.0, y: 1.0),
            (x: x, y: 1.0),
        ]])
    }

    fn result(code: &str, a: u64, b: u64) -> (String, RegionResult) {
        (
            code.to_string(),
            RegionResult {
                code_reg: code.to_string(),
                name_reg: format!("Region {}", code),
                counts: VoteCounts {
                    registered: 2 * (a + b) + 10,
                    abstentions: a + b,
                    null_votes: 10,
                    choice_a: a,
                    choice_b: b,
                },
            },
        )
    }

    fn geometries(codes: &[&str]) -> BTreeMap<String, RegionGeometry> {
        codes
            .iter()
            .enumerate()
            .map(|(i, code)| {
                (
                    code.to_string(),
                    RegionGeometry {
                        code: code.to_string(),
                        boundary: square(i as f64),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn ratio_of_expressed_ballots() {
        let results: BTreeMap<String, RegionResult> =
            vec![result("24", 150, 100), result("11", 0, 40), result("32", 40, 0)]
                .into_iter()
                .collect();
        let res = compute_ratios(
            &results,
            &geometries(&["11", "24", "32"]),
            &PipelineRules::DEFAULT_RULES,
        );
        assert!(res.warnings.is_empty());
        let codes: Vec<&str> = res.value.iter().map(|r| r.code_reg.as_str()).collect();
        assert_eq!(codes, vec!["11", "24", "32"]);
        assert_eq!(res.value[0].ratio, Ratio::Defined(0.0));
        assert_eq!(res.value[1].ratio, Ratio::Defined(0.6));
        assert_eq!(res.value[2].ratio, Ratio::Defined(1.0));
        assert_eq!(res.value[1].boundary, square(1.0));
    }

    #[test]
    fn no_expressed_ballots_is_undefined() {
        let results: BTreeMap<String, RegionResult> =
            vec![result("11", 0, 0), result("24", 0, 1)].into_iter().collect();
        let res = compute_ratios(
            &results,
            &geometries(&["11", "24"]),
            &PipelineRules::DEFAULT_RULES,
        );
        assert_eq!(res.value[0].ratio, Ratio::Undefined);
        assert_eq!(res.value[0].ratio.value(), None);
        assert_ne!(res.value[0].ratio, Ratio::Defined(0.0));
        assert_eq!(res.value[1].ratio.value(), Some(0.0));
    }

    #[test]
    fn missing_geometry_is_skipped() {
        let results: BTreeMap<String, RegionResult> =
            vec![result("11", 5, 5), result("24", 1, 3)].into_iter().collect();
        let res = compute_ratios(&results, &geometries(&["24", "93"]), &PipelineRules::DEFAULT_RULES);
        assert_eq!(res.value.len(), 1);
        assert_eq!(res.value[0].code_reg, "24");
        assert_eq!(res.value[0].ratio, Ratio::Defined(0.25));
        assert_eq!(
            res.warnings,
            vec![DataWarning::MissingGeometry {
                region_code: "11".to_string()
            }]
        );
    }

    #[test]
    fn geometry_codes_are_normalized() {
        let results: BTreeMap<String, RegionResult> = vec![result("01", 1, 1)].into_iter().collect();
        let res = compute_ratios(&results, &geometries(&["1"]), &PipelineRules::DEFAULT_RULES);
        assert!(res.warnings.is_empty());
        assert_eq!(res.value.len(), 1);
        assert_eq!(res.value[0].ratio, Ratio::Defined(0.5));
    }
}
