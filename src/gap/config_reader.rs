use crate::gap::*;

use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SourceDirectory {
    pub category: String,
    pub directory: String,
}

/// Overrides of the default scoring rules. Every field is optional.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct GapRules {
    #[serde(rename = "demandSupplyWeight")]
    pub demand_supply_weight: Option<f64>,
    #[serde(rename = "popDensityWeight")]
    pub pop_density_weight: Option<f64>,
    #[serde(rename = "growthWeight")]
    pub growth_weight: Option<f64>,
    #[serde(rename = "accessDifficultyWeight")]
    pub access_difficulty_weight: Option<f64>,
    #[serde(rename = "supplyJitterRange")]
    pub supply_jitter_range: Option<(f64, f64)>,
    #[serde(rename = "supplyFloor")]
    pub supply_floor: Option<f64>,
    #[serde(rename = "popDensityRange")]
    pub pop_density_range: Option<(f64, f64)>,
    #[serde(rename = "accessDifficultyRange")]
    pub access_difficulty_range: Option<(f64, f64)>,
    #[serde(rename = "growthClip")]
    pub growth_clip: Option<(f64, f64)>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<u64>,
    #[serde(rename = "topN")]
    pub top_n: Option<usize>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GapConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
    pub sources: Vec<SourceDirectory>,
    pub rules: Option<GapRules>,
}

pub fn read_config(path: &str) -> GapResult<GapConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: GapConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_reference(path: &str) -> GapResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_reference: {} bytes from {:?}", contents.len(), path);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn to_range(r: (f64, f64)) -> UniformRange {
    UniformRange {
        low: r.0,
        high: r.1,
    }
}

/// Applies the overrides on top of the default rules and checks the result.
pub fn validate_rules(gap_rules: &Option<GapRules>) -> GapResult<ScoringRules> {
    let mut res = ScoringRules::DEFAULT_RULES;
    if let Some(r) = gap_rules {
        let w = &mut res.weights;
        w.demand_supply_ratio = r.demand_supply_weight.unwrap_or(w.demand_supply_ratio);
        w.pop_density = r.pop_density_weight.unwrap_or(w.pop_density);
        w.growth = r.growth_weight.unwrap_or(w.growth);
        w.access_difficulty = r.access_difficulty_weight.unwrap_or(w.access_difficulty);
        if let Some(x) = r.supply_jitter_range {
            res.supply_jitter = to_range(x);
        }
        if let Some(x) = r.pop_density_range {
            res.pop_density = to_range(x);
        }
        if let Some(x) = r.access_difficulty_range {
            res.access_difficulty = to_range(x);
        }
        res.supply_floor = r.supply_floor.unwrap_or(res.supply_floor);
        res.growth_clip = r.growth_clip.unwrap_or(res.growth_clip);
        res.random_seed = r.random_seed.unwrap_or(res.random_seed);
        res.top_n = r.top_n.unwrap_or(res.top_n);
    }
    if let Err(e) = res.validate() {
        whatever!("Invalid scoring rules: {}", e);
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config() {
        let js = r#"{
            "outputSettings": {"outputPath": "out.json"},
            "sources": [
                {"category": "enrolment", "directory": "enrol"},
                {"category": "biometric", "directory": "bio"}
            ],
            "rules": {"randomSeed": 7, "topN": 20, "supplyJitterRange": [0.5, 1.5]}
        }"#;
        let config: GapConfig = serde_json::from_str(js).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(
            config.output_settings.and_then(|o| o.output_path),
            Some("out.json".to_string())
        );

        let rules = validate_rules(&config.rules).unwrap();
        assert_eq!(rules.random_seed, 7);
        assert_eq!(rules.top_n, 20);
        assert_eq!(rules.supply_jitter, UniformRange { low: 0.5, high: 1.5 });
        assert_eq!(rules.weights, ScoreWeights::DEFAULT_WEIGHTS);
        assert_eq!(rules.supply_floor, 10.0);
    }

    #[test]
    fn no_rules_gives_defaults() {
        assert_eq!(validate_rules(&None).unwrap(), ScoringRules::DEFAULT_RULES);
        assert_eq!(
            validate_rules(&Some(GapRules::default())).unwrap(),
            ScoringRules::DEFAULT_RULES
        );
    }

    #[test]
    fn rebalanced_weights() {
        let r = GapRules {
            demand_supply_weight: Some(0.5),
            pop_density_weight: Some(0.1),
            ..Default::default()
        };
        let rules = validate_rules(&Some(r)).unwrap();
        assert_eq!(rules.weights.demand_supply_ratio, 0.5);
        assert_eq!(rules.weights.pop_density, 0.1);
    }

    #[test]
    fn unbalanced_weights_rejected() {
        let r = GapRules {
            growth_weight: Some(0.9),
            ..Default::default()
        };
        assert!(validate_rules(&Some(r)).is_err());
    }

    #[test]
    fn zero_top_n_rejected() {
        let r = GapRules {
            top_n: Some(0),
            ..Default::default()
        };
        assert!(validate_rules(&Some(r)).is_err());
    }
}
