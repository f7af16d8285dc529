pub mod aggregate;
pub mod builder;
mod config;
pub mod geography;
pub mod manual;
pub mod score;

use log::info;

pub use crate::config::*;
pub use crate::score::{SeededSignals, SignalSource};

/// Runs the pipeline over the raw records of the three categories.
///
/// Stages run in order: canonicalization and aggregation per category, outer merge on
/// (pincode, month), growth estimation, scoring and ranking. The run either returns the
/// complete ranking or the first error encountered.
///
/// Arguments:
/// * `enrolment`, `biometric`, `demographic` the records of each category, with metric values
/// aligned with [Category::metric_columns]
/// * `rules` the scoring rules, validated before anything else runs
/// * `signals` the source of the simulated capacity and accessibility signals
pub fn run_gap_analysis<S: SignalSource>(
    enrolment: &[RawRecord],
    biometric: &[RawRecord],
    demographic: &[RawRecord],
    rules: &ScoringRules,
    signals: &mut S,
) -> Result<GapAnalysisResult, PipelineErrors> {
    rules.validate()?;
    info!(
        "run_gap_analysis: Processing {} enrolment, {} biometric, {} demographic records",
        enrolment.len(),
        biometric.len(),
        demographic.len()
    );

    let enrol_agg = aggregate::aggregate(Category::Enrolment, enrolment)?;
    let bio_agg = aggregate::aggregate(Category::Biometric, biometric)?;
    let demo_agg = aggregate::aggregate(Category::Demographic, demographic)?;

    let category_stats: Vec<CategoryStats> = [&enrol_agg, &bio_agg, &demo_agg]
        .iter()
        .map(|a| CategoryStats {
            category: a.category,
            records_read: a.records_read,
            records_dropped: a.records_dropped,
            aggregate_rows: a.rows.len(),
        })
        .collect();

    let merged = aggregate::merge(&enrol_agg, &bio_agg, &demo_agg)?;
    if merged.is_empty() {
        return Err(PipelineErrors::EmptyInput);
    }

    let growth = score::estimate_growth(&merged);
    let summaries = score::summarize(&merged, &growth)?;
    let scored = score::score(&summaries, rules, signals);
    let ranked = score::rank(&scored, rules.top_n);

    info!(
        "run_gap_analysis: {} merged rows, {} pincodes scored, {} ranked",
        merged.len(),
        scored.len(),
        ranked.len()
    );
    if let Some(top) = ranked.first() {
        info!(
            "run_gap_analysis: top location: {} ({}) score {}",
            top.summary.pincode, top.summary.state, top.summary.need_score
        );
    }

    Ok(GapAnalysisResult {
        ranked,
        category_stats,
        merged_rows: merged.len(),
        scored_pincodes: scored.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn rec(state: &str, pincode: &str, month: u32, metrics: &[u64]) -> RawRecord {
        RawRecord {
            state: Some(state.to_string()),
            district: Some("Bengaluru".to_string()),
            pincode: pincode.to_string(),
            date: NaiveDate::from_ymd_opt(2025, month, 10).unwrap(),
            metrics: metrics.to_vec(),
        }
    }

    #[test]
    fn single_pincode_scenario() {
        init();
        let enrol = vec![
            rec("Karnataka", "560001", 1, &[100, 0, 0]),
            rec("Karnataka", "560001", 2, &[150, 0, 0]),
        ];
        let bio = vec![rec("Karnataka", "560001", 1, &[50, 0])];
        let demo = vec![rec("Karnataka", "560001", 1, &[0, 0])];
        let res = run_gap_analysis(
            &enrol,
            &bio,
            &demo,
            &ScoringRules::DEFAULT_RULES,
            &mut SeededSignals::new(42),
        )
        .unwrap();
        assert_eq!(res.merged_rows, 2);
        assert_eq!(res.ranked.len(), 1);
        let top = &res.ranked[0];
        assert_eq!(top.summary.total_demand, 300);
        assert_eq!(top.summary.growth, 0.0);
        assert_eq!(top.growth_percent, 0.0);
        // A single pincode: every signal is constant.
        assert_eq!(top.summary.need_score, 0.0);
    }

    #[test]
    fn unknown_states_contribute_nothing() {
        init();
        let enrol = vec![
            rec("12345", "111111", 1, &[1000, 0, 0]),
            rec("Kerala", "682001", 1, &[5, 0, 0]),
        ];
        let res = run_gap_analysis(
            &enrol,
            &[],
            &[],
            &ScoringRules::DEFAULT_RULES,
            &mut SeededSignals::new(42),
        )
        .unwrap();
        assert_eq!(res.scored_pincodes, 1);
        assert_eq!(res.ranked[0].summary.pincode, "682001");
        assert_eq!(res.category_stats[0].records_dropped, 1);
    }

    #[test]
    fn all_unknown_is_an_error() {
        let enrol = vec![rec("999", "111111", 1, &[1, 0, 0])];
        let res = run_gap_analysis(
            &enrol,
            &[],
            &[],
            &ScoringRules::DEFAULT_RULES,
            &mut SeededSignals::new(42),
        );
        assert_eq!(res, Err(PipelineErrors::EmptyInput));
    }

    #[test]
    fn invalid_rules_fail_first() {
        let mut rules = ScoringRules::DEFAULT_RULES;
        rules.weights.pop_density = 0.5;
        let res = run_gap_analysis(&[], &[], &[], &rules, &mut SeededSignals::new(42));
        assert!(matches!(res, Err(PipelineErrors::InvalidRules(_))));
    }

    #[test]
    fn ranking_is_bounded_sorted_and_reproducible() {
        init();
        let mut enrol: Vec<RawRecord> = Vec::new();
        for i in 0..700u64 {
            let pincode = format!("{}", 100000 + i);
            enrol.push(rec("Bihar", &pincode, 1, &[i % 13, 1, 2]));
            enrol.push(rec("Bihar", &pincode, 2, &[i % 7, 3, i % 5]));
        }
        let mut rules = ScoringRules::DEFAULT_RULES;
        rules.random_seed = 7;
        let r1 = run_gap_analysis(&enrol, &[], &[], &rules, &mut SeededSignals::new(7)).unwrap();
        let r2 = run_gap_analysis(&enrol, &[], &[], &rules, &mut SeededSignals::new(7)).unwrap();
        assert_eq!(r1, r2);
        assert_eq!(r1.scored_pincodes, 700);
        assert_eq!(r1.ranked.len(), 500);
        for pair in r1.ranked.windows(2) {
            assert!(pair[0].summary.need_score >= pair[1].summary.need_score);
        }
        for r in r1.ranked.iter() {
            assert!(r.summary.need_score >= 0.0 && r.summary.need_score <= 100.0);
        }
    }
}
