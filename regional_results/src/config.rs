// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use geo::MultiPolygon;

/// A region, as provided by the region table.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Region {
    pub code: String,
    pub name: String,
}

/// A department, as provided by the department table.
///
/// Each department belongs to exactly one region through `region_code`.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Department {
    pub code: String,
    pub region_code: String,
    pub name: String,
}

/// One row of the referendum table.
///
/// The department code is kept as a string: codes such as `01` or `2A` are not numbers.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct BallotRecord {
    pub department_code: String,
    pub registered: u64,
    pub abstentions: u64,
    pub null_votes: u64,
    pub choice_a: u64,
    pub choice_b: u64,
}

impl BallotRecord {
    pub fn counts(&self) -> VoteCounts {
        VoteCounts {
            registered: self.registered,
            abstentions: self.abstentions,
            null_votes: self.null_votes,
            choice_a: self.choice_a,
            choice_b: self.choice_b,
        }
    }
}

/// The boundary of a region, supplied by the geometry provider.
#[derive(PartialEq, Debug, Clone)]
pub struct RegionGeometry {
    pub code: String,
    pub boundary: MultiPolygon<f64>,
}

// ******** Derived data structures *********

/// The vote categories that are summed per region.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, Hash)]
pub struct VoteCounts {
    pub registered: u64,
    pub abstentions: u64,
    pub null_votes: u64,
    pub choice_a: u64,
    pub choice_b: u64,
}

impl VoteCounts {
    pub const EMPTY: VoteCounts = VoteCounts {
        registered: 0,
        abstentions: 0,
        null_votes: 0,
        choice_a: 0,
        choice_b: 0,
    };

    /// Expressed ballots: the denominator of the ratio. Saturates at `u64::MAX`.
    pub fn expressed(&self) -> u64 {
        self.choice_a.saturating_add(self.choice_b)
    }

    /// The sum of both counts, or `None` if any category overflows.
    pub fn checked_add(&self, rhs: &VoteCounts) -> Option<VoteCounts> {
        Some(VoteCounts {
            registered: self.registered.checked_add(rhs.registered)?,
            abstentions: self.abstentions.checked_add(rhs.abstentions)?,
            null_votes: self.null_votes.checked_add(rhs.null_votes)?,
            choice_a: self.choice_a.checked_add(rhs.choice_a)?,
            choice_b: self.choice_b.checked_add(rhs.choice_b)?,
        })
    }
}

impl AddAssign for VoteCounts {
    fn add_assign(&mut self, rhs: VoteCounts) {
        self.registered += rhs.registered;
        self.abstentions += rhs.abstentions;
        self.null_votes += rhs.null_votes;
        self.choice_a += rhs.choice_a;
        self.choice_b += rhs.choice_b;
    }
}

impl Add for VoteCounts {
    type Output = VoteCounts;
    fn add(self: VoteCounts, rhs: VoteCounts) -> VoteCounts {
        let mut res = self;
        res += rhs;
        res
    }
}

impl Sum for VoteCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(VoteCounts::EMPTY, |acc, vc| acc + vc)
    }
}

/// The resolved area of a department: the department and the region it belongs to.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct AreaLookup {
    pub code_dep: String,
    pub name_dep: String,
    pub code_reg: String,
    pub name_reg: String,
}

/// The sums of all the ballots attached to one region.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct RegionResult {
    pub code_reg: String,
    pub name_reg: String,
    pub counts: VoteCounts,
}

/// The share of `choice_a` among the expressed ballots.
///
/// A region without any expressed ballot has no ratio. It is kept apart from a
/// genuine `0.0` so that renderers can tell both cases apart.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Ratio {
    Defined(f64),
    Undefined,
}

impl Ratio {
    pub fn from_counts(counts: &VoteCounts) -> Ratio {
        if counts.expressed() == 0 {
            Ratio::Undefined
        } else {
            let expressed = counts.choice_a as f64 + counts.choice_b as f64;
            Ratio::Defined(counts.choice_a as f64 / expressed)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Ratio::Defined(x) => Some(*x),
            Ratio::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Ratio::Defined(_))
    }
}

impl Display for Ratio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ratio::Defined(x) => write!(f, "{:.6}", x),
            Ratio::Undefined => write!(f, "undefined"),
        }
    }
}

/// Final output row: the result of a region, its boundary and its ratio.
#[derive(PartialEq, Debug, Clone)]
pub struct RegionRatio {
    pub code_reg: String,
    pub name_reg: String,
    pub counts: VoteCounts,
    pub boundary: MultiPolygon<f64>,
    pub ratio: Ratio,
}

/// Counters describing what happened to the ballots during the join.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct JoinStats {
    /// Number of ballot records received.
    pub received: usize,
    /// Ballots attached to an area.
    pub joined: usize,
    /// Overseas and foreign-resident ballots, excluded on purpose.
    pub out_of_scope: usize,
    /// Ballots with a mainland code that no department knows about.
    pub unresolved: usize,
}

// ******** Warnings and errors *********

/// Row-level data problems. The offending row is dropped and the run continues.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum DataWarning {
    /// Two regions share the same code. The first one is kept.
    DuplicateRegion { code: String },
    /// Two departments share the same code. The first one is kept.
    DuplicateDepartment { code: String },
    /// A department points to a region that does not exist. The department is dropped.
    UnknownRegion {
        department_code: String,
        region_code: String,
    },
    /// A ballot with an in-scope department code that matches no area.
    UnresolvedKey { code: String },
    /// The members of a region group disagree on the region name. The region is dropped.
    InconsistentGrouping {
        region_code: String,
        names: Vec<String>,
    },
    /// A region has results but no boundary to draw. The region is dropped.
    MissingGeometry { region_code: String },
}

impl Display for DataWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataWarning::DuplicateRegion { code } => {
                write!(f, "duplicate region code {}: keeping the first one", code)
            }
            DataWarning::DuplicateDepartment { code } => {
                write!(f, "duplicate department code {}: keeping the first one", code)
            }
            DataWarning::UnknownRegion {
                department_code,
                region_code,
            } => write!(
                f,
                "department {} refers to unknown region {}",
                department_code, region_code
            ),
            DataWarning::UnresolvedKey { code } => {
                write!(f, "unresolved department code {}", code)
            }
            DataWarning::InconsistentGrouping { region_code, names } => write!(
                f,
                "region {} has inconsistent names: {}",
                region_code,
                names.join(", ")
            ),
            DataWarning::MissingGeometry { region_code } => {
                write!(f, "no geometry for region {}", region_code)
            }
        }
    }
}

/// The input tables of the pipeline.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum TableKind {
    Regions,
    Departments,
    Ballots,
    Geometries,
}

impl Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TableKind::Regions => "regions",
            TableKind::Departments => "departments",
            TableKind::Ballots => "ballots",
            TableKind::Geometries => "geometries",
        };
        write!(f, "{}", name)
    }
}

/// Structural errors that prevent the pipeline from running at all.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PipelineErrors {
    MissingTable(TableKind),
    InvalidCodeWidth,
    /// The sums of a region do not fit in the counters.
    CountOverflow { region_code: String },
}

impl Error for PipelineErrors {}

impl Display for PipelineErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineErrors::MissingTable(t) => write!(f, "input table {} is missing or empty", t),
            PipelineErrors::InvalidCodeWidth => write!(f, "code width must be at least 1"),
            PipelineErrors::CountOverflow { region_code } => {
                write!(f, "vote counts of region {} overflow", region_code)
            }
        }
    }
}

// ********* Configuration **********

/// Which department codes are considered overseas or foreign-resident.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum OverseasFilter {
    /// Any code containing a character that is not an ASCII digit.
    NonDigit,
    /// Only the codes containing this marker (conventionally `Z`).
    /// Other codes with letters, such as `2A`, still go through the join.
    Marker(String),
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PipelineRules {
    /// Width to which department codes are zero-padded before any comparison.
    pub department_code_width: usize,
    /// Width to which region codes are zero-padded before any comparison.
    pub region_code_width: usize,
    pub overseas_filter: OverseasFilter,
}

impl PipelineRules {
    pub const DEFAULT_RULES: PipelineRules = PipelineRules {
        department_code_width: 2,
        region_code_width: 2,
        overseas_filter: OverseasFilter::NonDigit,
    };

    pub(crate) fn check(&self) -> Result<(), PipelineErrors> {
        if self.department_code_width == 0 || self.region_code_width == 0 {
            return Err(PipelineErrors::InvalidCodeWidth);
        }
        Ok(())
    }
}

/// The output of a stage, together with the data problems found along the way.
#[derive(PartialEq, Debug, Clone)]
pub struct StageOutput<T> {
    pub value: T,
    pub warnings: Vec<DataWarning>,
}
