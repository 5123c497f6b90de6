use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "geokey-cli",
    version,
    about = "Geohash encoding, decoding and range-query planning",
    long_about = "geokey-cli encodes coordinates into geohash keys, decodes keys back into cells,\nand builds the prefix ranges used for nearby queries and change-feed subscriptions."
)]
pub struct CliArgs {
    /// 配置文件路径
    #[arg(short, long, default_value = "geokey.toml")]
    pub config: String,

    /// 生成默认配置文件并退出
    #[arg(long)]
    pub generate_config: bool,

    /// Log level (overrides config file)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Encode a coordinate into a geohash
    Encode {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
        /// Key length (defaults to index.entity_precision)
        #[arg(short, long)]
        precision: Option<usize>,
    },

    /// Decode a geohash into its cell
    Decode {
        geohash: String,
        /// Print the cell as a GeoJSON polygon
        #[arg(long)]
        geojson: bool,
    },

    /// Great-circle distance between two coordinates, in km
    Distance {
        #[arg(allow_negative_numbers = true)]
        lat1: f64,
        #[arg(allow_negative_numbers = true)]
        lon1: f64,
        #[arg(allow_negative_numbers = true)]
        lat2: f64,
        #[arg(allow_negative_numbers = true)]
        lon2: f64,
    },

    /// Prefix length for a search radius
    Precision {
        #[arg(allow_negative_numbers = true)]
        radius_km: f64,
    },

    /// Prefix ranges covering a search radius
    Range {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
        #[arg(allow_negative_numbers = true)]
        radius_km: f64,
    },

    /// Adjacent cells of a geohash
    Neighbors { geohash: String },

    /// Run a nearby query against entities loaded from a JSON file
    Nearby {
        /// JSON array of {"id", "latitude", "longitude", "data"} objects
        #[arg(long)]
        entities: PathBuf,
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
        #[arg(allow_negative_numbers = true)]
        radius_km: f64,
    },
}

impl CliArgs {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.generate_config && self.command.is_none() {
            return Err(
                "No command specified. Use --help to list commands or --generate-config."
                    .to_string(),
            );
        }

        if let Some(CliCommand::Encode {
            precision: Some(0), ..
        }) = &self.command
        {
            return Err("Precision must be greater than 0".to_string());
        }

        if let Some(CliCommand::Range { radius_km, .. } | CliCommand::Nearby { radius_km, .. }) =
            &self.command
        {
            if !radius_km.is_finite() || *radius_km < 0.0 {
                return Err(format!(
                    "Invalid radius {}: must be a finite, non-negative value",
                    radius_km
                ));
            }
        }

        Ok(())
    }
}
