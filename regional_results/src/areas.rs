use log::{debug, info, warn};

use std::collections::{hash_map, HashMap, HashSet};

use crate::codes::normalize_code;
use crate::config::*;

/// The department to region lookup, keyed by normalized department code.
///
/// Built once by [resolve_areas] and then only read.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct AreaTable {
    entries: HashMap<String, AreaLookup>,
}

impl AreaTable {
    /// Looks up an already normalized department code.
    pub fn get(&self, code_dep: &str) -> Option<&AreaLookup> {
        self.entries.get(code_dep)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> hash_map::Values<'_, String, AreaLookup> {
        self.entries.values()
    }

    /// The department codes, in ascending order.
    pub fn sorted_codes(&self) -> Vec<&String> {
        let mut codes: Vec<&String> = self.entries.keys().collect();
        codes.sort();
        codes
    }
}

/// Joins departments to their region.
///
/// This is an inner join on `Department.region_code == Region.code`, after
/// normalization of both sides. A department with no region is dropped. When a
/// code is duplicated, the first occurrence wins.
pub fn resolve_areas(
    regions: &[Region],
    departments: &[Department],
    rules: &PipelineRules,
) -> StageOutput<AreaTable> {
    let mut warnings: Vec<DataWarning> = Vec::new();

    let mut region_names: HashMap<String, String> = HashMap::new();
    for r in regions.iter() {
        let code = normalize_code(&r.code, rules.region_code_width);
        if region_names.contains_key(&code) {
            warn!("resolve_areas: duplicate region code {:?}", code);
            warnings.push(DataWarning::DuplicateRegion { code });
        } else {
            region_names.insert(code, r.name.clone());
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut entries: HashMap<String, AreaLookup> = HashMap::new();
    for d in departments.iter() {
        let code_dep = normalize_code(&d.code, rules.department_code_width);
        if !seen.insert(code_dep.clone()) {
            warn!("resolve_areas: duplicate department code {:?}", code_dep);
            warnings.push(DataWarning::DuplicateDepartment { code: code_dep });
            continue;
        }
        let code_reg = normalize_code(&d.region_code, rules.region_code_width);
        match region_names.get(&code_reg) {
            Some(name_reg) => {
                debug!(
                    "resolve_areas: department {} -> region {}",
                    code_dep, code_reg
                );
                entries.insert(
                    code_dep.clone(),
                    AreaLookup {
                        code_dep,
                        name_dep: d.name.clone(),
                        code_reg,
                        name_reg: name_reg.clone(),
                    },
                );
            }
            None => {
                warn!(
                    "resolve_areas: department {:?} refers to unknown region {:?}",
                    code_dep, code_reg
                );
                warnings.push(DataWarning::UnknownRegion {
                    department_code: code_dep,
                    region_code: code_reg,
                });
            }
        }
    }

    info!(
        "Resolved {} departments into {} regions ({} warnings)",
        entries.len(),
        region_names.len(),
        warnings.len()
    );
    StageOutput {
        value: AreaTable { entries },
        warnings,
    }
}
