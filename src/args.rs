use clap::Parser;

/// This program ranks postal areas (pincodes) by their need for additional service capacity.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON configuration file declaring the source directories of each
    /// category, the output path and the scoring rules. Relative directories are resolved from the
    /// directory of the configuration file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory path, optional) A root directory containing the api_data_aadhar_enrolment,
    /// api_data_aadhar_biometric and api_data_aadhar_demographic directories. It is only used
    /// when no configuration file is given, and the default scoring rules apply.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the ranking will be written in JSON format to the given
    /// location. Setting this option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing an expected ranking in JSON format. If provided, gapscore will
    /// check that the output matches the reference, except for the last_updated timestamp.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// If passed as an argument, logs the canonical districts of each state and the districts with an
    /// unusually high volume.
    #[clap(long, takes_value = false)]
    pub audit: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
