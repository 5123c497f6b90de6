use geokey::client::{CliArgs, CliCommand, OutputFormatter};
use geokey::geohash::cell_size;
use geokey::{
    decode_bbox, distance, encode, neighbors, precision_for_radius, query_bounds, Coordinate,
    Entity, GeoKeyConfig, MemoryIndex, NearbyRequest, NearbyService, Result,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn, Level};

/// nearby 命令的输入实体
#[derive(Debug, Deserialize)]
struct EntityInput {
    id: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    data: serde_json::Value,
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse_args();

    // 验证参数
    if let Err(e) = args.validate() {
        eprintln!("{}", OutputFormatter::format_error(&e));
        std::process::exit(1);
    }

    if let Err(e) = run(args).await {
        eprintln!("{}", OutputFormatter::format_error(&e.to_string()));
        std::process::exit(1);
    }
}

async fn run(args: CliArgs) -> Result<()> {
    // 生成默认配置文件
    if args.generate_config {
        let config = GeoKeyConfig::default();
        config.save_to_file(&args.config)?;
        println!("✅ Generated default configuration: {}", args.config);
        return Ok(());
    }

    // 加载配置，命令行参数覆盖配置文件
    let mut config = GeoKeyConfig::from_file(&args.config)?;
    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }
    config.validate()?;

    init_logging(&config.logging);
    debug!("geokey-cli {}", env!("CARGO_PKG_VERSION"));

    let Some(command) = args.command else {
        return Ok(());
    };

    match command {
        CliCommand::Encode {
            latitude,
            longitude,
            precision,
        } => {
            let precision = precision.unwrap_or(config.index.entity_precision);
            let coord = Coordinate::new(latitude, longitude);
            if let Err(e) = coord.validate() {
                warn!("{}, encoding anyway", e);
            }
            let geohash = encode(latitude, longitude, precision);
            if args.json {
                println!("{}", json!({ "coordinate": coord, "geohash": geohash }));
            } else {
                println!("{}", OutputFormatter::format_geohash(&coord, &geohash));
            }
        }
        CliCommand::Decode { geohash, geojson } => {
            let bbox = decode_bbox(&geohash);
            if geojson {
                let geometry = geojson::Geometry::new(geojson::Value::from(&bbox.to_polygon()));
                println!("{}", geometry);
            } else if args.json {
                println!(
                    "{}",
                    json!({
                        "geohash": geohash,
                        "center": bbox.center(),
                        "bbox": bbox,
                        "error": { "latitude": bbox.lat_error(), "longitude": bbox.lon_error() },
                    })
                );
            } else {
                println!("{}", OutputFormatter::format_cell(&geohash, &bbox));
            }
        }
        CliCommand::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
        } => {
            let km = distance(Coordinate::new(lat1, lon1), Coordinate::new(lat2, lon2));
            if args.json {
                println!("{}", json!({ "distance": km }));
            } else {
                println!("{}", OutputFormatter::format_distance(km));
            }
        }
        CliCommand::Precision { radius_km } => {
            let precision = precision_for_radius(radius_km);
            let cell = cell_size(precision);
            if args.json {
                println!(
                    "{}",
                    json!({ "radiusKm": radius_km, "precision": precision, "cellDegrees": [cell.0, cell.1] })
                );
            } else {
                println!("{}", OutputFormatter::format_precision(radius_km, precision, cell));
            }
        }
        CliCommand::Range {
            latitude,
            longitude,
            radius_km,
        } => {
            let request = NearbyRequest::new(Coordinate::new(latitude, longitude), radius_km);
            request.validate()?;
            let queries = query_bounds(request.center(), radius_km);
            if args.json {
                println!("{}", serde_json::to_string(&queries)?);
            } else {
                println!("{}", OutputFormatter::format_queries(&queries));
            }
        }
        CliCommand::Neighbors { geohash } => {
            let found = neighbors(&geohash);
            if args.json {
                println!("{}", serde_json::to_string(&found)?);
            } else {
                println!("{}", OutputFormatter::format_neighbors(&found));
            }
        }
        CliCommand::Nearby {
            entities,
            latitude,
            longitude,
            radius_km,
        } => {
            let index = MemoryIndex::with_channel_capacity(config.feed.channel_capacity);
            let loaded = load_entities(&index, &entities, config.index.entity_precision).await?;
            info!("📖 Loaded {} entities from {}", loaded, entities.display());

            let request = NearbyRequest::new(Coordinate::new(latitude, longitude), radius_km);
            let results = index.nearby(&request).await?;
            if args.json {
                println!("{}", serde_json::to_string(&results)?);
            } else {
                println!("{}", OutputFormatter::format_nearby(&results));
            }
        }
    }

    Ok(())
}

async fn load_entities(
    index: &MemoryIndex,
    path: &std::path::Path,
    precision: usize,
) -> Result<usize> {
    let content = std::fs::read_to_string(path)?;
    let inputs: Vec<EntityInput> = serde_json::from_str(&content)?;

    let mut loaded = 0;
    for input in inputs {
        let coord = Coordinate::new(input.latitude, input.longitude);
        if let Err(e) = coord.validate() {
            warn!("⚠️  Skipping entity {}: {}", input.id, e);
            continue;
        }
        index
            .upsert(Entity::new(input.id, coord, precision).with_data(input.data))
            .await;
        loaded += 1;
    }
    Ok(loaded)
}

/// 初始化日志系统
fn init_logging(config: &geokey::config::LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = match config.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    match config.output.as_str() {
        "stdout" => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_target(false))
                .with(tracing_subscriber::filter::LevelFilter::from_level(filter))
                .init();
        }
        "file" => {
            if let Some(log_file) = &config.log_file {
                // 确保日志目录存在
                if let Some(parent) = log_file.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }

                match std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(log_file)
                {
                    Ok(file) => {
                        tracing_subscriber::registry()
                            .with(
                                tracing_subscriber::fmt::layer()
                                    .with_writer(file)
                                    .with_ansi(false)
                                    .with_target(false),
                            )
                            .with(tracing_subscriber::filter::LevelFilter::from_level(filter))
                            .init();
                    }
                    Err(e) => {
                        eprintln!("Failed to open log file {}: {}", log_file.display(), e);
                    }
                }
            }
        }
        _ => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false),
                )
                .with(tracing_subscriber::filter::LevelFilter::from_level(filter))
                .init();
        }
    }
}
