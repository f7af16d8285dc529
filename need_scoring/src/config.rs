// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

use chrono::{Datelike, NaiveDate};

/// The three independently collected metric streams.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Category {
    Enrolment,
    Biometric,
    Demographic,
}

impl Category {
    /// All the categories, in the order in which they are merged.
    pub const ALL: [Category; 3] = [
        Category::Enrolment,
        Category::Biometric,
        Category::Demographic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Enrolment => "enrolment",
            Category::Biometric => "biometric",
            Category::Demographic => "demographic",
        }
    }

    /// The age-bucket columns carried by the source files of this category.
    pub fn metric_columns(&self) -> &'static [&'static str] {
        match self {
            Category::Enrolment => &["age_0_5", "age_5_17", "age_18_greater"],
            Category::Biometric => &["bio_age_5_17", "bio_age_17_"],
            Category::Demographic => &["demo_age_5_17", "demo_age_17_"],
        }
    }

    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL.iter().find(|c| c.name() == name).cloned()
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Category::Enrolment => 0,
            Category::Biometric => 1,
            Category::Demographic => 2,
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One row of a source file, as read by the collaborators.
///
/// The metric values are aligned with [Category::metric_columns] for the category
/// the record belongs to.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawRecord {
    pub state: Option<String>,
    pub district: Option<String>,
    pub pincode: String,
    pub date: NaiveDate,
    pub metrics: Vec<u64>,
}

/// A calendar month, the time granularity of all the aggregates.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn from_date(date: &NaiveDate) -> Month {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ******** Intermediate data structures *********

#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct CanonicalLocation {
    pub state: String,
    pub district: Option<String>,
}

/// The outcome of canonicalizing a raw location.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Resolution {
    Resolved(CanonicalLocation),
    /// The state could not be resolved. The record is excluded from every aggregate.
    Unknown,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MonthlyAggregate {
    pub pincode: String,
    pub location: CanonicalLocation,
    pub month: Month,
    /// Sums of each metric column, aligned with [Category::metric_columns].
    pub metrics: Vec<u64>,
    /// The sum of all the metric columns.
    pub total: u64,
}

/// The aggregates of one category, with the bookkeeping of the records that were dropped.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CategoryAggregate {
    pub category: Category,
    pub rows: Vec<MonthlyAggregate>,
    pub records_read: usize,
    pub records_dropped: usize,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MergedDemand {
    pub pincode: String,
    pub month: Month,
    pub state: String,
    pub district: Option<String>,
    pub total_enrolment: u64,
    pub total_biometric: u64,
    pub total_demographic: u64,
    pub total_demand: u64,
}

// ******** Output data structures *********

#[derive(PartialEq, Debug, Clone)]
pub struct PincodeSummary {
    pub pincode: String,
    pub state: String,
    pub district: Option<String>,
    pub total_demand: u64,
    /// Mean month-over-month relative change, as a fraction.
    pub growth: f64,
    pub supply_capacity: f64,
    pub pop_density: f64,
    pub access_difficulty: f64,
    pub demand_supply_ratio: f64,
    /// Between 0 and 100, rounded to one decimal.
    pub need_score: f64,
}

/// A scored location with its position in the final ordering.
///
/// The `growth_percent` and `demand_supply_ratio` fields are the values meant for presentation
/// (rounded to one decimal). The unrounded values stay available in `summary`.
#[derive(PartialEq, Debug, Clone)]
pub struct RankedLocation {
    pub rank: u32,
    pub growth_percent: f64,
    pub demand_supply_ratio: f64,
    pub summary: PincodeSummary,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CategoryStats {
    pub category: Category,
    pub records_read: usize,
    pub records_dropped: usize,
    pub aggregate_rows: usize,
}

#[derive(PartialEq, Debug, Clone)]
pub struct GapAnalysisResult {
    pub ranked: Vec<RankedLocation>,
    pub category_stats: Vec<CategoryStats>,
    pub merged_rows: usize,
    pub scored_pincodes: usize,
}

/// Errors that prevent the pipeline from completing successfully.
#[derive(PartialEq, Debug, Clone)]
pub enum PipelineErrors {
    InvalidRules(String),
    MetricArity {
        category: Category,
        pincode: String,
        expected: usize,
        found: usize,
    },
    MergeKeyConflict {
        category: Category,
        pincode: String,
        month: Month,
    },
    EmptyInput,
    /// A demand total does not fit in 64 bits. The category is absent for totals that
    /// already combine the three categories.
    DemandOverflow {
        category: Option<Category>,
        pincode: String,
    },
    /// An aggregate was passed where another category was expected.
    CategoryMismatch {
        expected: Category,
        found: Category,
    },
}

impl Error for PipelineErrors {}

impl Display for PipelineErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineErrors::InvalidRules(msg) => write!(f, "invalid scoring rules: {}", msg),
            PipelineErrors::MetricArity {
                category,
                pincode,
                expected,
                found,
            } => write!(
                f,
                "{} record for pincode {} has {} metric values, expected {}",
                category, pincode, found, expected
            ),
            PipelineErrors::MergeKeyConflict {
                category,
                pincode,
                month,
            } => write!(
                f,
                "{} aggregate contains pincode {} for month {} more than once",
                category, pincode, month
            ),
            PipelineErrors::EmptyInput => write!(f, "no record survived canonicalization"),
            PipelineErrors::DemandOverflow {
                category: Some(category),
                pincode,
            } => write!(f, "{} total for pincode {} overflows", category, pincode),
            PipelineErrors::DemandOverflow {
                category: None,
                pincode,
            } => write!(f, "total demand for pincode {} overflows", pincode),
            PipelineErrors::CategoryMismatch { expected, found } => write!(
                f,
                "expected the {} aggregate, found the {} aggregate",
                expected, found
            ),
        }
    }
}

// ********* Configuration **********

/// The weights of the four signals in the need score. They must sum to 1.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub demand_supply_ratio: f64,
    pub pop_density: f64,
    pub growth: f64,
    pub access_difficulty: f64,
}

impl ScoreWeights {
    pub const DEFAULT_WEIGHTS: ScoreWeights = ScoreWeights {
        demand_supply_ratio: 0.35,
        pop_density: 0.25,
        growth: 0.20,
        access_difficulty: 0.20,
    };

    pub fn sum(&self) -> f64 {
        self.demand_supply_ratio + self.pop_density + self.growth + self.access_difficulty
    }
}

/// A half-open range `[low, high)` from which a simulated value is drawn.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct UniformRange {
    pub low: f64,
    pub high: f64,
}

/// The rules for synthesizing, scoring and ranking.
///
/// The simulated signals stand in for capacity and accessibility data that is not available.
#[derive(PartialEq, Debug, Clone)]
pub struct ScoringRules {
    pub weights: ScoreWeights,
    /// Multiplicative jitter applied to the total demand to simulate the supply capacity.
    pub supply_jitter: UniformRange,
    /// Lower bound of the simulated supply capacity. Must be strictly positive.
    pub supply_floor: f64,
    pub pop_density: UniformRange,
    pub access_difficulty: UniformRange,
    /// Growth is clipped to this interval before normalization.
    pub growth_clip: (f64, f64),
    pub random_seed: u64,
    pub top_n: usize,
}

impl ScoringRules {
    pub const DEFAULT_RULES: ScoringRules = ScoringRules {
        weights: ScoreWeights::DEFAULT_WEIGHTS,
        supply_jitter: UniformRange {
            low: 0.6,
            high: 1.3,
        },
        supply_floor: 10.0,
        pop_density: UniformRange {
            low: 0.1,
            high: 1.0,
        },
        access_difficulty: UniformRange {
            low: 0.1,
            high: 1.0,
        },
        growth_clip: (0.0, 1.0),
        random_seed: 42,
        top_n: 500,
    };

    pub fn validate(&self) -> Result<(), PipelineErrors> {
        let w = &self.weights;
        let all_weights = [
            w.demand_supply_ratio,
            w.pop_density,
            w.growth,
            w.access_difficulty,
        ];
        if all_weights.iter().any(|x| !x.is_finite() || *x < 0.0) {
            return Err(PipelineErrors::InvalidRules(format!(
                "weights must be non-negative: {:?}",
                w
            )));
        }
        if (w.sum() - 1.0).abs() > 1e-9 {
            return Err(PipelineErrors::InvalidRules(format!(
                "weights must sum to 1, got {}",
                w.sum()
            )));
        }
        for (name, r) in [
            ("supply_jitter", self.supply_jitter),
            ("pop_density", self.pop_density),
            ("access_difficulty", self.access_difficulty),
        ] {
            if !(r.low.is_finite() && r.high.is_finite() && r.low < r.high) {
                return Err(PipelineErrors::InvalidRules(format!(
                    "range {} is empty: {:?}",
                    name, r
                )));
            }
        }
        if self.supply_jitter.low < 0.0 {
            return Err(PipelineErrors::InvalidRules(
                "supply jitter must be non-negative".to_string(),
            ));
        }
        if !(self.supply_floor > 0.0) {
            return Err(PipelineErrors::InvalidRules(format!(
                "supply floor must be positive, got {}",
                self.supply_floor
            )));
        }
        if !(self.growth_clip.0 <= self.growth_clip.1) {
            return Err(PipelineErrors::InvalidRules(format!(
                "growth clip range is inverted: {:?}",
                self.growth_clip
            )));
        }
        if self.top_n == 0 {
            return Err(PipelineErrors::InvalidRules(
                "top_n must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ScoringRules {
    fn default() -> Self {
        ScoringRules::DEFAULT_RULES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        assert!((ScoreWeights::DEFAULT_WEIGHTS.sum() - 1.0).abs() < 1e-12);
        assert_eq!(ScoringRules::DEFAULT_RULES.validate(), Ok(()));
    }

    #[test]
    fn rejects_unbalanced_weights() {
        let mut rules = ScoringRules::DEFAULT_RULES;
        rules.weights.growth = 0.3;
        assert!(matches!(
            rules.validate(),
            Err(PipelineErrors::InvalidRules(_))
        ));
    }

    #[test]
    fn rejects_empty_ranges_and_floor() {
        let mut rules = ScoringRules::DEFAULT_RULES;
        rules.pop_density = UniformRange {
            low: 0.5,
            high: 0.5,
        };
        assert!(rules.validate().is_err());

        let mut rules = ScoringRules::DEFAULT_RULES;
        rules.supply_floor = 0.0;
        assert!(rules.validate().is_err());

        let mut rules = ScoringRules::DEFAULT_RULES;
        rules.top_n = 0;
        assert!(rules.validate().is_err());
    }

    #[test]
    fn month_from_date() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        let m = Month::from_date(&d);
        assert_eq!(m, Month { year: 2025, month: 3 });
        assert_eq!(m.to_string(), "2025-03");
    }

    #[test]
    fn category_names() {
        assert_eq!(Category::from_name("biometric"), Some(Category::Biometric));
        assert_eq!(Category::from_name("other"), None);
        assert_eq!(Category::Enrolment.metric_columns().len(), 3);
    }
}
