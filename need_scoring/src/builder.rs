pub use crate::config::*;

use chrono::NaiveDate;

/// A builder for collecting the records of the three categories.
///
/// ```
/// use chrono::NaiveDate;
/// use need_scoring::builder::Builder;
/// use need_scoring::{Category, ScoringRules};
/// # use need_scoring::PipelineErrors;
///
/// let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
/// let mut builder = Builder::new(&ScoringRules::DEFAULT_RULES)?;
///
/// builder.add_simple(Category::Enrolment, "Karnataka", "Bangalore", "560001", date, &[40, 50, 10])?;
/// builder.add_simple(Category::Biometric, "Karnataka", "Bengaluru", "560001", date, &[30, 20])?;
///
/// let result = builder.run()?;
/// assert_eq!(result.ranked.len(), 1);
/// assert_eq!(result.ranked[0].summary.total_demand, 150);
///
/// # Ok::<(), PipelineErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: ScoringRules,
    pub(crate) _records: [Vec<RawRecord>; 3],
}

impl Builder {
    pub fn new(rules: &ScoringRules) -> Result<Builder, PipelineErrors> {
        rules.validate()?;
        Ok(Builder {
            _rules: rules.clone(),
            _records: [Vec::new(), Vec::new(), Vec::new()],
        })
    }

    /// Adds a record from its raw labels.
    ///
    /// The metric values must follow the order of [Category::metric_columns].
    pub fn add_simple(
        &mut self,
        category: Category,
        state: &str,
        district: &str,
        pincode: &str,
        date: NaiveDate,
        metrics: &[u64],
    ) -> Result<(), PipelineErrors> {
        self.add_record(
            category,
            RawRecord {
                state: Some(state.to_string()),
                district: Some(district.to_string()),
                pincode: pincode.to_string(),
                date,
                metrics: metrics.to_vec(),
            },
        )
    }

    pub fn add_record(&mut self, category: Category, record: RawRecord) -> Result<(), PipelineErrors> {
        let expected = category.metric_columns().len();
        if record.metrics.len() != expected {
            return Err(PipelineErrors::MetricArity {
                category,
                pincode: record.pincode,
                expected,
                found: record.metrics.len(),
            });
        }
        self._records[category.index()].push(record);
        Ok(())
    }

    pub fn add_records(
        &mut self,
        category: Category,
        records: Vec<RawRecord>,
    ) -> Result<(), PipelineErrors> {
        for r in records {
            self.add_record(category, r)?;
        }
        Ok(())
    }

    pub fn records(&self, category: Category) -> &[RawRecord] {
        &self._records[category.index()]
    }

    /// Runs the full pipeline with signals drawn from the seed of the rules.
    pub fn run(&self) -> Result<GapAnalysisResult, PipelineErrors> {
        let mut signals = crate::score::SeededSignals::new(self._rules.random_seed);
        crate::run_gap_analysis(
            self.records(Category::Enrolment),
            self.records(Category::Biometric),
            self.records(Category::Demographic),
            &self._rules,
            &mut signals,
        )
    }
}
