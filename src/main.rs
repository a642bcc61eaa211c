use anyhow::{Context, Result};
use astroatmos::bodies::{self, LunarPhase};
use astroatmos::config::{ForecastConfig, LoggingConfig};
use astroatmos::models::{Parameter, TimeWindow};
use astroatmos::sources::kp::{KpSource, StormSummary, merge_observed_and_predicted};
use astroatmos::sources::build_client;
use astroatmos::{Forecast, ForecastError, ForecastService, PersistentCache, logging, plot};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "astroatmos", version, about = "Stargazing forecast for an observing site")]
struct Cli {
    /// Forecast location file (INI)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Bypass the response cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build and render the forecast (default)
    Forecast {
        /// Length of the forecast window in hours
        #[arg(long)]
        hours: Option<u32>,
        /// PNG image to write
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Do not open the chart in the system viewer
        #[arg(long)]
        no_show: bool,
    },
    /// Geomagnetic storm summary and Kp chart
    Kp {
        /// PNG image to write
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Current lunar phase and the next date of a phase
    Moon {
        /// Phase to look for, e.g. "full" or "first-quarter"
        #[arg(long, default_value = "full")]
        phase: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ForecastError>() {
                Some(forecast_error) => eprintln!("Error: {}", forecast_error.user_message()),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Command::Forecast {
        hours: None,
        output: None,
        no_show: false,
    });

    if let Command::Moon { phase } = &command {
        // the moon needs no site, only a timezone for dates
        let config = ForecastConfig::load_from_path(cli.config.clone()).ok();
        let logging_config = config.as_ref().map(|c| c.logging.clone()).unwrap_or_default();
        logging::init(&logging_config, cli.verbose)?;
        let timezone = config
            .and_then(|c| c.to_location().ok())
            .map_or(chrono_tz::UTC, |l| l.timezone);
        return moon(phase, timezone);
    }

    let mut config = match ForecastConfig::load_from_path(cli.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&LoggingConfig::default(), cli.verbose)?;
            return Err(e);
        }
    };
    logging::init(&config.logging, cli.verbose)?;
    debug!(?config, "Configuration loaded");

    match command {
        Command::Forecast {
            hours,
            output,
            no_show,
        } => {
            if let Some(hours) = hours {
                config.forecast.hours = hours;
            }
            if let Some(output) = output {
                config.output.image = output.display().to_string();
            }
            if no_show {
                config.output.show = false;
            }
            config.validate()?;
            forecast(&config, !cli.no_cache).await
        }
        Command::Kp { output } => {
            if let Some(output) = output {
                config.output.kp_image = output.display().to_string();
            }
            kp(&config, !cli.no_cache).await
        }
        Command::Moon { .. } => Ok(()),
    }
}

async fn forecast(config: &ForecastConfig, use_cache: bool) -> Result<()> {
    let location = config.to_location()?;
    let now = Utc::now();
    let window = TimeWindow::starting_at(now, config.forecast.hours);
    let service = ForecastService::from_config(config, use_cache)?;
    let forecast = service.build(&location, window, now).await?;

    print_summary(&forecast, now);

    let size = (config.output.width, config.output.height);
    let image = PathBuf::from(&config.output.image);
    let svg = PathBuf::from(&config.output.svg);
    plot::render_png(&forecast, &image, size)?;
    plot::render_svg(&forecast, &svg, size)?;
    println!("Forecast image saved to `{}`", image.display());

    if config.output.show {
        if let Err(e) = plot::show(&svg) {
            warn!(error = %e, "Could not open the forecast view");
        }
    }
    Ok(())
}

fn print_summary(forecast: &Forecast, now: DateTime<Utc>) {
    let location = &forecast.location;
    println!("{}", plot::timeline::title(location));
    println!("{}", plot::timeline::local_date(now, location.timezone));

    let sources: Vec<String> = forecast.sources().iter().map(ToString::to_string).collect();
    println!("Sources: {}", sources.join(", "));
    for line in forecast.failure_summary() {
        println!("  unavailable: {line}");
    }

    let moon = &forecast.moon;
    println!("Moon: {} ({:.0}% illuminated)", moon.phase, moon.illumination_percent());

    let today = now.with_timezone(&location.timezone).date_naive();
    match bodies::sun_events(location, today) {
        Ok(events) => {
            let local = |t: Option<DateTime<Utc>>| {
                t.map_or_else(
                    || "none".to_string(),
                    |t| t.with_timezone(&location.timezone).format("%H:%M").to_string(),
                )
            };
            println!(
                "Sunset {}, astronomical dusk {}",
                local(events.sunset),
                local(events.astronomical_dusk)
            );
        }
        Err(e) => warn!(error = %e, "Sun events unavailable"),
    }

    if let Some(cloud) = forecast.get(Parameter::CloudCover) {
        info!(source = %cloud.source, samples = cloud.len(), "Cloud cover");
    }
}

async fn kp(config: &ForecastConfig, use_cache: bool) -> Result<()> {
    let settings = &config.sources;
    let client = build_client(settings)?;
    let mut source = KpSource::new(client, &settings.kp_observed_url, &settings.kp_forecast_url);
    if use_cache && config.cache.enabled {
        let cache = PersistentCache::open(config.cache_dir().join("responses"))?;
        let ttl = std::time::Duration::from_secs(u64::from(config.cache.ttl_minutes) * 60);
        source = source.with_cache(cache, ttl);
    }

    let observed = source.observed().await?;
    let summary = StormSummary::from_observed(&observed)
        .ok_or_else(|| ForecastError::parse("no Kp observations in the SWPC product"))?;
    println!("{}", summary.report());

    let series = match source.predicted().await {
        Ok(predicted) => merge_observed_and_predicted(&observed, &predicted),
        Err(e) => {
            warn!(error = %e, "Kp forecast unavailable, charting observations only");
            observed
        }
    };
    let path = PathBuf::from(&config.output.kp_image);
    plot::render_kp_chart(&series, &path, (1000, 500))?;
    println!("Kp chart saved to `{}`", path.display());
    Ok(())
}

fn moon(phase: &str, timezone: Tz) -> Result<()> {
    let target: LunarPhase = phase.parse()?;
    let now = Utc::now();
    let current = bodies::moon_phase(now);
    println!(
        "Current phase: {} ({:.1}% illuminated)",
        current.phase,
        current.illumination_percent()
    );
    let next = bodies::next_phase_date(target, now, timezone)
        .with_context(|| format!("no {target} within the next 28 days"))?;
    println!("Next {target}: {}", next.format("%A, %B %-d, %Y"));
    Ok(())
}
