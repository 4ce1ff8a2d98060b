use clap::Parser;
use climazin::{
    ClimateConfig, ClimateError, Climazin, Dashboard, Measure, Panel, Selection, View, CITIES,
    YEARS,
};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Yearly climate charts and maps of Brazilian state capitals.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[arg(long, value_enum, required_unless_present = "list_cities")]
    measure: Option<Measure>,

    #[arg(long, value_enum, required_unless_present = "list_cities")]
    view: Option<View>,

    #[arg(long, required_unless_present = "list_cities")]
    city: Option<String>,

    #[arg(long, required_unless_present = "list_cities")]
    year: Option<i32>,

    /// Where to write the SVG. Defaults to `<measure>_<view>_<city>_<year>.svg`.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Cache directory. Defaults to the platform cache directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// GeoJSON file with coastlines or borders drawn over maps.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Grid points fetched concurrently.
    #[arg(long, default_value_t = 2)]
    workers: usize,

    /// Print the supported cities and years, then exit.
    #[arg(long)]
    list_cities: bool,
}

fn default_output(selection: &Selection) -> PathBuf {
    let city = selection.city.replace(' ', "_");
    PathBuf::from(format!(
        "{}_{}_{}_{}.svg",
        selection.measure, selection.view, city, selection.year
    ))
}

async fn write_figure(path: &Path, svg: &str) -> std::io::Result<()> {
    tokio::fs::write(path, svg).await
}

async fn run(args: Args) -> Result<ExitCode, ClimateError> {
    if args.list_cities {
        for city in CITIES {
            println!("{}", city);
        }
        println!("Years: {}-{}", YEARS.start(), YEARS.end());
        return Ok(ExitCode::SUCCESS);
    }

    let (Some(measure), Some(view), Some(city), Some(year)) =
        (args.measure, args.view, args.city, args.year)
    else {
        return Err(ClimateError::InvalidSelection(
            "--measure, --view, --city and --year are required".to_string(),
        ));
    };
    let selection = Selection::new(measure, view, &city, year)?;

    let config = ClimateConfig::builder()
        .maybe_cache_dir(args.cache_dir)
        .maybe_overlay_path(args.overlay)
        .workers(args.workers)
        .build();
    let dashboard = Dashboard::new(Climazin::with_config(config).await?);

    match dashboard.render(&selection).await {
        Panel::Figure(figure) => {
            let output = args.output.unwrap_or_else(|| default_output(&selection));
            if let Err(e) = write_figure(&output, &figure.svg).await {
                eprintln!("Failed to write {}: {}", output.display(), e);
                return Ok(ExitCode::FAILURE);
            }
            info!("Wrote '{}' to {}", figure.title, output.display());
            println!("{}", output.display());
            Ok(ExitCode::SUCCESS)
        }
        Panel::Notice(notice) => {
            println!("{}", notice);
            Ok(ExitCode::SUCCESS)
        }
        Panel::Error(message) => {
            eprintln!("Error: {}", message);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    match run(Args::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
