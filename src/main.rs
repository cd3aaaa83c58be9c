mod ui;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use egui::Vec2;
use log::{info, warn};

use fleetview::{
    DashboardAction, DashboardController, DashboardError, HttpBackend, UploadFile,
    UploadObserver, VehicleDataApi,
    config::AppConfig,
    dashboard::SortColumn,
    upload::{dataset_name_for, upload_file_in_chunks},
};
use ui::DashboardApp;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Backend base URL, e.g. http://localhost:8000
    #[arg(long, global = true, env = "FLEETVIEW_API_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the telemetry dashboard
    Dashboard {
        /// IANA timezone used for range filters and labels, defaults to the local zone
        #[arg(short, long)]
        timezone: Option<String>,

        #[arg(short, long)]
        page_size: Option<u32>,
    },
    /// Upload a CSV dataset in chunks
    Upload {
        #[arg(short, long)]
        file: PathBuf,

        /// Dataset name, defaults to the file name without `.csv`
        #[arg(short, long)]
        vehicle_id: Option<String>,
    },
    /// Print one page of records as JSON lines
    List {
        #[arg(short, long, default_value = "")]
        vehicle_id: String,

        #[arg(short, long, default_value_t = 1)]
        page: u32,

        #[arg(short = 's', long)]
        page_size: Option<u32>,

        /// Column to sort by
        #[arg(short, long, default_value = "timestamp")]
        ordering: String,

        #[arg(short, long)]
        descending: bool,

        #[arg(short, long)]
        timezone: Option<String>,
    },
}

/// Logs upload progress for the command line.
struct LogObserver;

impl UploadObserver for LogObserver {
    fn on_progress(&mut self, progress: Option<u8>) {
        if let Some(progress) = progress {
            info!("Upload progress: {}%", progress);
        }
    }

    fn on_message(&mut self, message: &str) {
        info!("{}", message);
    }

    fn on_complete(&mut self) {
        info!("Dataset finalized by backend");
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, DashboardError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| DashboardError::RuntimeError { source: e })
}

fn dashboard(app_config: AppConfig) -> Result<(), DashboardError> {
    // fail on a bad timezone before a window opens
    app_config.tz()?;

    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_inner_size(Vec2::new(app_config.window_width, app_config.window_height))
        .with_title("Fleetview");

    eframe::run_native(
        "Fleetview",
        native_options,
        Box::new(|cc| Ok(Box::new(DashboardApp::new(app_config, cc)?))),
    )
    .expect("could not start app");
    Ok(())
}

fn upload(
    app_config: &AppConfig,
    file: &Path,
    vehicle_id: Option<String>,
) -> Result<(), DashboardError> {
    let upload_file = UploadFile::open(file)?;
    let vehicle_id = vehicle_id
        .or_else(|| dataset_name_for(upload_file.name()))
        .ok_or(DashboardError::EmptyDatasetName)?;
    let backend = HttpBackend::new(&app_config.api_base_url)?;

    let summary = runtime()?.block_on(upload_file_in_chunks(
        &backend,
        upload_file,
        &vehicle_id,
        &mut LogObserver,
    ))?;
    info!(
        "Uploaded {} bytes of {} as {} in {} chunks",
        summary.bytes_sent, summary.file_name, summary.vehicle_id, summary.total_chunks
    );
    Ok(())
}

fn list(
    app_config: &AppConfig,
    vehicle_id: String,
    page: u32,
    ordering: &str,
    descending: bool,
) -> Result<(), DashboardError> {
    let column =
        SortColumn::from_field(ordering).ok_or_else(|| DashboardError::InvalidUserInput {
            field: "ordering".to_string(),
            reason: format!("unknown column {}", ordering),
        })?;
    let mut controller = DashboardController::new(app_config.page_size, app_config.tz()?);
    controller.apply(DashboardAction::SelectVehicle(vehicle_id));
    // the first toggle always lands on ascending, a second one flips it
    controller.apply(DashboardAction::Sort(column));
    if descending {
        controller.apply(DashboardAction::Sort(column));
    }
    let pending = controller.apply(DashboardAction::GoToPage(page));

    let backend = HttpBackend::new(&app_config.api_base_url)?;
    let result = runtime()?.block_on(backend.list(&pending.query))?;
    info!(
        "{} records in total, vehicles: {:?}",
        result.count, result.vehicle_ids
    );
    for record in &result.results {
        match serde_json::to_string(record) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Could not serialize record {}: {}", record.id, e),
        }
    }
    Ok(())
}

/// The GUI only logs in debug builds, command line runs always report progress.
fn logs_to_terminal(command: &Commands) -> bool {
    cfg!(debug_assertions) || !matches!(command, Commands::Dashboard { .. })
}

fn main() {
    let cli = Args::parse();
    if logs_to_terminal(&cli.command) {
        colog::init();
    }

    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    let file_config = AppConfig::from_local_file().unwrap_or_else(|e| {
        warn!("Ignoring config file: {}", e);
        None
    });
    let base_config = file_config.unwrap_or_default();

    let result = match cli.command {
        Commands::Dashboard {
            timezone,
            page_size,
        } => dashboard(base_config.with_overrides(cli.base_url, timezone, page_size)),
        Commands::Upload { file, vehicle_id } => upload(
            &base_config.with_overrides(cli.base_url, None, None),
            &file,
            vehicle_id,
        ),
        Commands::List {
            vehicle_id,
            page,
            page_size,
            ordering,
            descending,
            timezone,
        } => list(
            &base_config.with_overrides(cli.base_url, timezone, page_size),
            vehicle_id,
            page,
            &ordering,
            descending,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
