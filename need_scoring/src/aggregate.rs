use log::{debug, info};

use std::collections::{BTreeMap, BTreeSet};

use crate::config::*;
use crate::geography::canonicalize;

type AggregateKey = (String, CanonicalLocation, Month);

/// Groups the records of one category by (pincode, canonical location, month) and sums the
/// metric columns.
///
/// Records with an unresolved state are dropped and counted. The result is ordered by key
/// and does not depend on the order of the input records.
pub fn aggregate(
    category: Category,
    records: &[RawRecord],
) -> Result<CategoryAggregate, PipelineErrors> {
    let num_metrics = category.metric_columns().len();
    let mut groups: BTreeMap<AggregateKey, Vec<u64>> = BTreeMap::new();
    let mut dropped: usize = 0;

    for r in records.iter() {
        if r.metrics.len() != num_metrics {
            return Err(PipelineErrors::MetricArity {
                category,
                pincode: r.pincode.clone(),
                expected: num_metrics,
                found: r.metrics.len(),
            });
        }
        let location = match canonicalize(r.state.as_deref(), r.district.as_deref()) {
            Resolution::Resolved(loc) => loc,
            Resolution::Unknown => {
                debug!(
                    "aggregate: {}: dropping record for pincode {} with state {:?}",
                    category, r.pincode, r.state
                );
                dropped += 1;
                continue;
            }
        };
        let key = (r.pincode.clone(), location, Month::from_date(&r.date));
        let sums = groups.entry(key).or_insert_with(|| vec![0; num_metrics]);
        for (s, m) in sums.iter_mut().zip(r.metrics.iter()) {
            *s = s
                .checked_add(*m)
                .ok_or_else(|| overflow(Some(category), &r.pincode))?;
        }
    }

    let mut rows: Vec<MonthlyAggregate> = Vec::with_capacity(groups.len());
    for ((pincode, location, month), metrics) in groups.into_iter() {
        let total = metrics
            .iter()
            .try_fold(0u64, |acc, m| acc.checked_add(*m))
            .ok_or_else(|| overflow(Some(category), &pincode))?;
        rows.push(MonthlyAggregate {
            pincode,
            location,
            month,
            metrics,
            total,
        });
    }

    info!(
        "aggregate: {}: {} records read, {} dropped, {} aggregate rows",
        category,
        records.len(),
        dropped,
        rows.len()
    );

    Ok(CategoryAggregate {
        category,
        rows,
        records_read: records.len(),
        records_dropped: dropped,
    })
}

pub(crate) fn overflow(category: Option<Category>, pincode: &str) -> PipelineErrors {
    PipelineErrors::DemandOverflow {
        category,
        pincode: pincode.to_string(),
    }
}

// The totals of one (pincode, month) key, with the candidate locations seen for it.
#[derive(Default)]
struct MergeEntry {
    totals: [u64; 3],
    // Per category: the location contributing the largest total.
    locations: [Option<(u64, CanonicalLocation)>; 3],
}

/// Full outer join of the three category aggregates on (pincode, month).
///
/// The district is carried as an attribute and is not part of the key. Missing category
/// totals are zero. The location attribute of a merged row is taken from the enrolment
/// stream when present, then biometric, then demographic. Within one stream, the location
/// with the largest total wins, the smallest location in case of a tie.
pub fn merge(
    enrolment: &CategoryAggregate,
    biometric: &CategoryAggregate,
    demographic: &CategoryAggregate,
) -> Result<Vec<MergedDemand>, PipelineErrors> {
    let mut entries: BTreeMap<(String, Month), MergeEntry> = BTreeMap::new();

    for (expected, agg) in Category::ALL.iter().zip([enrolment, biometric, demographic]) {
        if agg.category != *expected {
            return Err(PipelineErrors::CategoryMismatch {
                expected: *expected,
                found: agg.category,
            });
        }
        let idx = agg.category.index();
        let mut seen: BTreeSet<(&str, &CanonicalLocation, Month)> = BTreeSet::new();
        for row in agg.rows.iter() {
            if !seen.insert((row.pincode.as_str(), &row.location, row.month)) {
                return Err(PipelineErrors::MergeKeyConflict {
                    category: agg.category,
                    pincode: row.pincode.clone(),
                    month: row.month,
                });
            }
            let e = entries
                .entry((row.pincode.clone(), row.month))
                .or_default();
            e.totals[idx] = e.totals[idx]
                .checked_add(row.total)
                .ok_or_else(|| overflow(Some(agg.category), &row.pincode))?;
            let replace = match &e.locations[idx] {
                None => true,
                Some((total, loc)) => {
                    row.total > *total || (row.total == *total && row.location < *loc)
                }
            };
            if replace {
                e.locations[idx] = Some((row.total, row.location.clone()));
            }
        }
    }

    let mut res: Vec<MergedDemand> = Vec::with_capacity(entries.len());
    for ((pincode, month), e) in entries.into_iter() {
        let location = e
            .locations
            .iter()
            .flatten()
            .map(|(_, loc)| loc.clone())
            .next()
            // Every entry was created by at least one aggregate row.
            .unwrap_or(CanonicalLocation {
                state: String::new(),
                district: None,
            });
        let [total_enrolment, total_biometric, total_demographic] = e.totals;
        let total_demand = total_enrolment
            .checked_add(total_biometric)
            .and_then(|t| t.checked_add(total_demographic))
            .ok_or_else(|| overflow(None, &pincode))?;
        res.push(MergedDemand {
            pincode,
            month,
            state: location.state,
            district: location.district,
            total_enrolment,
            total_biometric,
            total_demographic,
            total_demand,
        });
    }
    info!("merge: {} merged (pincode, month) rows", res.len());
    Ok(res)
}

/// The canonical districts observed for each canonical state, across all the given aggregates.
pub fn district_audit(aggregates: &[&CategoryAggregate]) -> BTreeMap<String, BTreeSet<String>> {
    let mut res: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for agg in aggregates.iter() {
        for row in agg.rows.iter() {
            let districts = res.entry(row.location.state.clone()).or_default();
            if let Some(d) = &row.location.district {
                districts.insert(d.clone());
            }
        }
    }
    res
}

/// A district whose total volume is unusually high for its category.
#[derive(PartialEq, Debug, Clone)]
pub struct DistrictAnomaly {
    pub category: Category,
    pub state: String,
    pub district: Option<String>,
    pub total: u64,
    pub threshold: f64,
}

/// Flags the districts whose total exceeds `mean + sigmas * std` of all the district totals
/// of the category (sample standard deviation).
pub fn detect_anomalies(agg: &CategoryAggregate, sigmas: f64) -> Vec<DistrictAnomaly> {
    let mut totals: BTreeMap<&CanonicalLocation, u64> = BTreeMap::new();
    for row in agg.rows.iter() {
        let t = totals.entry(&row.location).or_insert(0);
        *t = t.saturating_add(row.total);
    }
    if totals.len() < 2 {
        return vec![];
    }
    let n = totals.len() as f64;
    let mean = totals.values().map(|t| *t as f64).sum::<f64>() / n;
    let var = totals
        .values()
        .map(|t| (*t as f64 - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    let threshold = mean + sigmas * var.sqrt();
    debug!(
        "detect_anomalies: {}: mean {} threshold {}",
        agg.category, mean, threshold
    );

    let mut res: Vec<DistrictAnomaly> = totals
        .into_iter()
        .filter(|(_, t)| *t as f64 > threshold)
        .map(|(loc, total)| DistrictAnomaly {
            category: agg.category,
            state: loc.state.clone(),
            district: loc.district.clone(),
            total,
            threshold,
        })
        .collect();
    res.sort_by(|a, b| b.total.cmp(&a.total));
    res
}
