use log::{debug, info, warn};

use need_scoring::aggregate::{aggregate, detect_anomalies, district_audit};
use need_scoring::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;

use crate::gap::config_reader::*;
use crate::gap::io_common::{conventional_directory, discover_csv_files, simplify_file_name};
use crate::gap::io_csv::read_category_csv;

#[derive(Debug, Snafu)]
pub enum GapError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Configuration file {path} has no parent directory"))]
    MissingParentDir { path: String },

    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Missing column {column:?} in CSV file {path}"))]
    CsvMissingColumn { column: String, path: String },
    #[snafu(display("Cannot read line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Cannot parse date {value:?} on line {lineno} of {path}"))]
    DateParse {
        value: String,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Cannot parse {value:?} in column {column:?} on line {lineno} of {path}"))]
    MetricParse {
        source: std::num::ParseIntError,
        value: String,
        column: String,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Missing pincode on line {lineno} of {path}"))]
    MissingPincode { path: String, lineno: usize },

    #[snafu(display("Source directory {path} does not exist"))]
    MissingSourceDir { path: String },
    #[snafu(display("Cannot list the content of {path}"))]
    ListingDir {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("No CSV file found in {path}"))]
    NoCsvFiles { path: String },

    #[snafu(display("Error writing output to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Gap analysis failed: {source}"))]
    Pipeline { source: PipelineErrors },
    #[snafu(display("Difference detected between the output and the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type GapResult<T> = Result<T, GapError>;

/// The records read for each category.
#[derive(Debug, Default)]
struct CategoryData {
    enrolment: Vec<RawRecord>,
    biometric: Vec<RawRecord>,
    demographic: Vec<RawRecord>,
}

impl CategoryData {
    fn get_mut(&mut self, category: Category) -> &mut Vec<RawRecord> {
        match category {
            Category::Enrolment => &mut self.enrolment,
            Category::Biometric => &mut self.biometric,
            Category::Demographic => &mut self.demographic,
        }
    }

    fn get(&self, category: Category) -> &[RawRecord] {
        match category {
            Category::Enrolment => &self.enrolment,
            Category::Biometric => &self.biometric,
            Category::Demographic => &self.demographic,
        }
    }
}

fn ranked_to_json(ranked: &[RankedLocation]) -> Vec<JSValue> {
    ranked
        .iter()
        .map(|r| {
            json!({
                "rank": r.rank,
                "pincode": r.summary.pincode,
                "state": r.summary.state,
                "district": r.summary.district,
                "total_demand": r.summary.total_demand,
                "growth": r.growth_percent,
                "supply_capacity": r.summary.supply_capacity,
                "pop_density": r.summary.pop_density,
                "access_difficulty": r.summary.access_difficulty,
                "demand_supply_ratio": r.demand_supply_ratio,
                "need_score": r.summary.need_score,
            })
        })
        .collect()
}

fn build_output_js(result: &GapAnalysisResult, last_updated: &str) -> JSValue {
    json!({
        "last_updated": last_updated,
        "top_priority_locations": ranked_to_json(&result.ranked),
    })
}

/// Resolves the sources, the rules and the configured output.
fn resolve_sources(
    config_path: &Option<String>,
    input_dir: &Option<String>,
) -> GapResult<(Vec<(Category, PathBuf)>, ScoringRules, Option<String>)> {
    if let Some(config_path) = config_path {
        let config = read_config(config_path)?;
        info!("config: {:?}", config);
        let config_p = Path::new(config_path.as_str());
        let root_p = config_p
            .parent()
            .context(MissingParentDirSnafu { path: config_path })?;

        let rules = validate_rules(&config.rules)?;
        if config.sources.is_empty() {
            whatever!("No source directory declared in {}", config_path);
        }
        let mut sources: Vec<(Category, PathBuf)> = Vec::new();
        for s in config.sources.iter() {
            let category = match Category::from_name(s.category.as_str()) {
                Some(c) => c,
                None => {
                    whatever!("Unknown category {:?} in {}", s.category, config_path)
                }
            };
            sources.push((category, root_p.join(s.directory.as_str())));
        }
        let out = config
            .output_settings
            .and_then(|os| os.output_path)
            .map(|p| {
                if p == "stdout" {
                    p
                } else {
                    root_p.join(p.as_str()).display().to_string()
                }
            });
        Ok((sources, rules, out))
    } else if let Some(input_dir) = input_dir {
        let root_p = Path::new(input_dir.as_str());
        let sources = Category::ALL
            .iter()
            .map(|c| (*c, root_p.join(conventional_directory(*c))))
            .collect();
        Ok((sources, ScoringRules::DEFAULT_RULES, None))
    } else {
        whatever!("Either a configuration file or an input directory must be provided")
    }
}

fn read_sources(sources: &[(Category, PathBuf)]) -> GapResult<CategoryData> {
    let mut data = CategoryData::default();
    for (category, dir) in sources.iter() {
        let files = discover_csv_files(dir)?;
        info!(
            "read_sources: {}: {} files in {:?}",
            category,
            files.len(),
            dir.display().to_string()
        );
        for path in files.iter() {
            let mut records = read_category_csv(path, *category)?;
            debug!(
                "read_sources: {}: {} records",
                simplify_file_name(path),
                records.len()
            );
            data.get_mut(*category).append(&mut records);
        }
    }
    for category in Category::ALL.iter() {
        if data.get(*category).is_empty() {
            warn!("read_sources: no record found for category {}", category);
        }
    }
    Ok(data)
}

fn log_audit(data: &CategoryData) -> GapResult<()> {
    let mut aggregates: Vec<CategoryAggregate> = Vec::new();
    for category in Category::ALL.iter() {
        aggregates.push(aggregate(*category, data.get(*category)).context(PipelineSnafu {})?);
    }
    let refs: Vec<&CategoryAggregate> = aggregates.iter().collect();
    for (state, districts) in district_audit(&refs).iter() {
        let names: Vec<&str> = districts.iter().map(|d| d.as_str()).collect();
        info!("audit: {} ({} districts): {}", state, names.len(), names.join(", "));
    }
    for agg in aggregates.iter() {
        let anomalies = detect_anomalies(agg, 3.0);
        if anomalies.is_empty() {
            info!("audit: {}: no volume anomaly", agg.category);
        }
        for a in anomalies.iter() {
            warn!(
                "audit: {}: unusually high volume in {} / {}: {} (threshold {:.1})",
                a.category,
                a.state,
                a.district.as_deref().unwrap_or("-"),
                a.total,
                a.threshold
            );
        }
    }
    Ok(())
}

fn check_reference(reference_path: &str, output_js: &JSValue) -> GapResult<()> {
    let reference = read_reference(reference_path)?;
    let mut produced = output_js.clone();
    // The timestamp is the only field expected to differ.
    if let (Some(ts), Some(obj)) = (reference.get("last_updated"), produced.as_object_mut()) {
        obj.insert("last_updated".to_string(), ts.clone());
    }
    let pretty_ref = serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
    let pretty_out = serde_json::to_string_pretty(&produced).context(ParsingJsonSnafu {})?;
    if pretty_ref != pretty_out {
        warn!("Found differences with the reference {}", reference_path);
        print_diff(pretty_ref.as_str(), pretty_out.as_str(), "\n");
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    info!("check_reference: output matches {}", reference_path);
    Ok(())
}

/// Runs a complete gap analysis and returns the output document.
///
/// `out_path` overrides the output declared in the configuration. Without either, the
/// document is printed on the standard output.
pub fn run_analysis(
    config_path: Option<String>,
    input_dir: Option<String>,
    out_path: Option<String>,
    reference_path: Option<String>,
    audit: bool,
) -> GapResult<JSValue> {
    let (sources, rules, config_out) = resolve_sources(&config_path, &input_dir)?;
    debug!("run_analysis: rules: {:?}", rules);

    let data = read_sources(&sources)?;
    if audit {
        log_audit(&data)?;
    }

    let mut signals = SeededSignals::new(rules.random_seed);
    let result = run_gap_analysis(
        &data.enrolment,
        &data.biometric,
        &data.demographic,
        &rules,
        &mut signals,
    )
    .context(PipelineSnafu {})?;

    for stats in result.category_stats.iter() {
        info!(
            "run_analysis: {}: {} records read, {} dropped, {} aggregate rows",
            stats.category, stats.records_read, stats.records_dropped, stats.aggregate_rows
        );
    }

    let last_updated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let output_js = build_output_js(&result, &last_updated);
    let pretty_js = serde_json::to_string_pretty(&output_js).context(ParsingJsonSnafu {})?;

    match out_path.or(config_out) {
        Some(p) if p != "stdout" => {
            info!("run_analysis: writing {} locations to {:?}", result.ranked.len(), p);
            fs::write(p.as_str(), pretty_js.as_str()).context(WritingOutputSnafu { path: p })?;
        }
        _ => {
            println!("{}", pretty_js);
        }
    }

    if let Some(reference_p) = reference_path {
        check_reference(reference_p.as_str(), &output_js)?;
    }

    Ok(output_js)
}
