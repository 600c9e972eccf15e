use geo::MultiPolygon;

use crate::config::*;
use crate::{run_pipeline, PipelineInputs, PipelineResult};

/// A builder for assembling the input tables.
///
/// It is the simplest way to feed the pipeline from code that does not
/// read files.
///
/// ```
/// use regional_results::builder::Builder;
/// use regional_results::{MultiPolygon, PipelineRules, Ratio, VoteCounts};
/// # use regional_results::PipelineErrors;
///
/// let mut builder = Builder::new(&PipelineRules::DEFAULT_RULES)?
///     .regions(&[("84".to_string(), "Auvergne-Rhône-Alpes".to_string())])?
///     .departments(&[("01".to_string(), "84".to_string(), "Ain".to_string())])?;
///
/// builder.add_ballot("1", VoteCounts { registered: 10, abstentions: 2, null_votes: 0, choice_a: 6, choice_b: 2 })?;
/// builder.add_ballot("ZA", VoteCounts { registered: 5, abstentions: 0, null_votes: 0, choice_a: 5, choice_b: 0 })?;
/// builder.add_geometry("84", MultiPolygon::new(vec![]))?;
///
/// let result = builder.run()?;
/// assert_eq!(result.ratios[0].ratio, Ratio::Defined(0.75));
///
/// # Ok::<(), PipelineErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: PipelineRules,
    pub(crate) _inputs: PipelineInputs,
}

impl Builder {
    pub fn new(rules: &PipelineRules) -> Result<Builder, PipelineErrors> {
        rules.check()?;
        Ok(Builder {
            _rules: rules.clone(),
            _inputs: PipelineInputs::default(),
        })
    }

    /// Sets the regions, as `(code, name)` pairs.
    pub fn regions(self, regions: &[(String, String)]) -> Result<Builder, PipelineErrors> {
        let mut inputs = self._inputs;
        inputs.regions = regions
            .iter()
            .map(|(code, name)| Region {
                code: code.clone(),
                name: name.clone(),
            })
            .collect();
        Ok(Builder {
            _rules: self._rules,
            _inputs: inputs,
        })
    }

    /// Sets the departments, as `(code, region_code, name)` triples.
    pub fn departments(self, departments: &[(String, String, String)]) -> Result<Builder, PipelineErrors> {
        let mut inputs = self._inputs;
        inputs.departments = departments
            .iter()
            .map(|(code, region_code, name)| Department {
                code: code.clone(),
                region_code: region_code.clone(),
                name: name.clone(),
            })
            .collect();
        Ok(Builder {
            _rules: self._rules,
            _inputs: inputs,
        })
    }

    /// Adds the counts of one department.
    ///
    /// The code is kept as given. It is normalized when the pipeline runs.
    pub fn add_ballot(&mut self, department_code: &str, counts: VoteCounts) -> Result<(), PipelineErrors> {
        self.add_ballot_record(&BallotRecord {
            department_code: department_code.to_string(),
            registered: counts.registered,
            abstentions: counts.abstentions,
            null_votes: counts.null_votes,
            choice_a: counts.choice_a,
            choice_b: counts.choice_b,
        })
    }

    pub fn add_ballot_record(&mut self, ballot: &BallotRecord) -> Result<(), PipelineErrors> {
        self._inputs.ballots.push(ballot.clone());
        Ok(())
    }

    /// Adds the boundary of a region. A second boundary for the same code replaces the first one.
    pub fn add_geometry(&mut self, code: &str, boundary: MultiPolygon<f64>) -> Result<(), PipelineErrors> {
        self._inputs.geometries.insert(
            code.to_string(),
            RegionGeometry {
                code: code.to_string(),
                boundary,
            },
        );
        Ok(())
    }

    pub fn inputs(&self) -> &PipelineInputs {
        &self._inputs
    }

    pub fn run(&self) -> Result<PipelineResult, PipelineErrors> {
        run_pipeline(&self._inputs, &self._rules)
    }
}

impl From<Builder> for PipelineInputs {
    fn from(builder: Builder) -> PipelineInputs {
        builder._inputs
    }
}
