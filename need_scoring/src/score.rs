use log::{debug, info};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use std::collections::BTreeMap;

use crate::config::*;

/// The source of the simulated capacity and accessibility signals.
///
/// Implementations must be deterministic for a given construction, so that repeated runs
/// over the same data produce the same scores.
pub trait SignalSource {
    /// Draws a value in `[range.low, range.high)`.
    fn uniform(&mut self, range: UniformRange) -> f64;
}

/// Signals drawn from a seeded pseudo-random generator.
pub struct SeededSignals {
    rng: StdRng,
}

impl SeededSignals {
    pub fn new(seed: u64) -> SeededSignals {
        SeededSignals {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl SignalSource for SeededSignals {
    fn uniform(&mut self, range: UniformRange) -> f64 {
        self.rng.gen_range(range.low..range.high)
    }
}

/// Mean month-over-month relative change of the total demand, per pincode.
///
/// The change between two consecutive observed months is `(d[t] - d[t-1]) / (d[t-1] + 1)`.
/// The offset keeps the ratio defined when the previous month had no demand.
/// A pincode observed in a single month has a growth of 0.
pub fn estimate_growth(merged: &[MergedDemand]) -> BTreeMap<String, f64> {
    let mut series: BTreeMap<&str, Vec<(Month, u64)>> = BTreeMap::new();
    for m in merged.iter() {
        series
            .entry(m.pincode.as_str())
            .or_default()
            .push((m.month, m.total_demand));
    }

    let mut res: BTreeMap<String, f64> = BTreeMap::new();
    for (pincode, mut points) in series.into_iter() {
        points.sort_by_key(|(month, _)| *month);
        let changes: Vec<f64> = points
            .windows(2)
            .map(|w| {
                let prev = w[0].1 as f64;
                let cur = w[1].1 as f64;
                (cur - prev) / (prev + 1.0)
            })
            .collect();
        let growth = if changes.is_empty() {
            0.0
        } else {
            changes.iter().sum::<f64>() / changes.len() as f64
        };
        debug!("estimate_growth: {}: {:?} -> {}", pincode, points, growth);
        res.insert(pincode.to_string(), growth);
    }
    res
}

/// One summary per pincode, in ascending pincode order, with the demand summed over all the
/// months. The location attributes are those of the most recent month.
///
/// The simulated signals and the score are left at zero.
pub fn summarize(
    merged: &[MergedDemand],
    growth: &BTreeMap<String, f64>,
) -> Result<Vec<PincodeSummary>, PipelineErrors> {
    let mut by_pincode: BTreeMap<&str, (u64, &MergedDemand)> = BTreeMap::new();
    for m in merged.iter() {
        let e = by_pincode.entry(m.pincode.as_str()).or_insert((0, m));
        e.0 = e.0.checked_add(m.total_demand).ok_or_else(|| {
            PipelineErrors::DemandOverflow {
                category: None,
                pincode: m.pincode.clone(),
            }
        })?;
        if m.month > e.1.month {
            e.1 = m;
        }
    }
    let res = by_pincode
        .into_iter()
        .map(|(pincode, (total_demand, latest))| PincodeSummary {
            pincode: pincode.to_string(),
            state: latest.state.clone(),
            district: latest.district.clone(),
            total_demand,
            growth: growth.get(pincode).cloned().unwrap_or(0.0),
            supply_capacity: 0.0,
            pop_density: 0.0,
            access_difficulty: 0.0,
            demand_supply_ratio: 0.0,
            need_score: 0.0,
        })
        .collect();
    Ok(res)
}

/// Min-max normalization to `[0, 1]`. A constant input normalizes to all zeros.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if values.is_empty() || max == min {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / (max - min)).collect()
}

/// Rounds to one decimal, halves going to the even neighbour (12.25 gives 12.2).
pub fn round1(x: f64) -> f64 {
    let y = x * 10.0;
    let floor = y.floor();
    let r = if y - floor == 0.5 {
        if floor % 2.0 == 0.0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        y.round()
    };
    r / 10.0
}

/// Synthesizes the auxiliary signals and computes the need score of every summary.
///
/// The signal source is consumed in blocks, in the order of the summaries: all the supply
/// jitters, then all the densities, then all the access difficulties.
pub fn score<S: SignalSource>(
    summaries: &[PincodeSummary],
    rules: &ScoringRules,
    signals: &mut S,
) -> Vec<PincodeSummary> {
    let mut res: Vec<PincodeSummary> = summaries.to_vec();

    for s in res.iter_mut() {
        let jitter = signals.uniform(rules.supply_jitter);
        s.supply_capacity = (s.total_demand as f64 * jitter).max(rules.supply_floor);
    }
    for s in res.iter_mut() {
        s.pop_density = signals.uniform(rules.pop_density);
    }
    for s in res.iter_mut() {
        s.access_difficulty = signals.uniform(rules.access_difficulty);
    }
    for s in res.iter_mut() {
        s.demand_supply_ratio = s.total_demand as f64 / s.supply_capacity;
    }

    let (clip_low, clip_high) = rules.growth_clip;
    let col = |f: &dyn Fn(&PincodeSummary) -> f64| -> Vec<f64> {
        min_max_normalize(&res.iter().map(f).collect::<Vec<f64>>())
    };
    let n_ds = col(&|s| s.demand_supply_ratio);
    let n_pd = col(&|s| s.pop_density);
    let n_gr = col(&|s| s.growth.clamp(clip_low, clip_high));
    let n_ad = col(&|s| s.access_difficulty);

    let w = &rules.weights;
    for (idx, s) in res.iter_mut().enumerate() {
        let raw = w.demand_supply_ratio * n_ds[idx]
            + w.pop_density * n_pd[idx]
            + w.growth * n_gr[idx]
            + w.access_difficulty * n_ad[idx];
        s.need_score = round1((100.0 * raw).clamp(0.0, 100.0));
    }
    info!("score: scored {} pincodes", res.len());
    res
}

/// Sorts by descending need score, then ascending pincode, and keeps the first `top_n`.
pub fn rank(summaries: &[PincodeSummary], top_n: usize) -> Vec<RankedLocation> {
    let mut sorted: Vec<&PincodeSummary> = summaries.iter().collect();
    sorted.sort_by(|a, b| {
        b.need_score
            .total_cmp(&a.need_score)
            .then_with(|| a.pincode.cmp(&b.pincode))
    });
    sorted
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(idx, s)| RankedLocation {
            rank: (idx + 1) as u32,
            growth_percent: round1(s.growth * 100.0),
            demand_supply_ratio: round1(s.demand_supply_ratio),
            summary: s.clone(),
        })
        .collect()
}
