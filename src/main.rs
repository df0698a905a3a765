// Entry point and high-level CLI flow.
//
// - Option [1] loads the CSV and prints what was found.
// - Options [2] and [3] change the date range and the year selection.
// - Option [4] renders the dashboard for the current controls and exports
//   every table. After that the user can go back to the menu or exit.
//
// `--once` skips the menu and renders a single cycle with the defaults.
use chrono::NaiveDate;
use clap::Parser;
use energy_dashboard::config::DashboardConfig;
use energy_dashboard::filter::DateRange;
use energy_dashboard::{loader, output, util, Dashboard, DashboardError, DashboardRequest};
use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_DATA_PATH: &str = "data/time_series_15min_singleindex.csv";

#[derive(Parser)]
#[command(name = "energy-dashboard")]
#[command(about = "Germany energy dashboard over the OPSD 15-minute time series", long_about = None)]
struct Cli {
    /// Path to the singleindex CSV file
    #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
    data: PathBuf,

    /// Optional JSON configuration (default years, date range, output dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for exported tables; overrides the configuration
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Render one cycle with the default controls and exit
    #[arg(long)]
    once: bool,

    /// Rows shown in each table preview
    #[arg(long, default_value_t = 5)]
    preview_rows: usize,
}

// Everything the menu needs between interactions. The controls are plain
// values handed to each render; nothing is shared globally.
struct Session {
    data_path: PathBuf,
    config: DashboardConfig,
    preview_rows: usize,
    dashboard: Option<Dashboard>,
    request: Option<DashboardRequest>,
}

/// Prints `label` and reads one trimmed line. `None` once input is closed.
fn prompt<R: BufRead>(input: &mut R, label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) => None,
        Ok(_) => Some(buf.trim().to_string()),
        Err(e) => {
            warn!(error = %e, "failed to read input");
            None
        }
    }
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice<R: BufRead>(input: &mut R) -> Option<String> {
    prompt(input, "Enter choice: ")
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N` or
/// input ended.
fn prompt_back_to_menu<R: BufRead>(input: &mut R) -> bool {
    loop {
        let Some(answer) = prompt(input, "Back to Dashboard Controls (Y/N): ") else {
            return false;
        };
        match answer.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Logs a failed step. Only fatal errors are reported as failures.
fn report_error(context: &str, e: &DashboardError) {
    if e.is_fatal() {
        error!(error = %e, "{}", context);
        eprintln!("{}: {}\n", context, e);
    } else {
        warn!(error = %e, "{} (continuing)", context);
    }
}

fn describe_request(request: &DashboardRequest) -> String {
    let range = match request.date_range {
        Some(r) => format!("{} to {}", r.start, r.end),
        None => "all dates".to_string(),
    };
    let years = if request.selected_years.is_empty() {
        "all years".to_string()
    } else {
        request
            .selected_years
            .iter()
            .map(|y| y.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("Date range: {} | Years: {}", range, years)
}

/// Handle option [1]: load the CSV and reset the controls to their defaults.
fn handle_load(session: &mut Session) -> Result<(), DashboardError> {
    let (table, report) = loader::load_table(&session.data_path)?;
    println!(
        "Processing dataset... ({} rows loaded)",
        util::format_int(report.total_rows)
    );
    if let (Some(first), Some(last)) = (report.first_date, report.last_date) {
        println!("Covering {} to {}.", first, last);
    }
    if !report.missing_columns.is_empty() {
        let names: Vec<&str> = report
            .missing_columns
            .iter()
            .map(|f| f.column_name())
            .collect();
        println!("Note: columns not present: {}", names.join(", "));
    }
    let dashboard = Dashboard::new(table, session.config.clone());
    let request = dashboard.default_request();
    println!("{}\n", describe_request(&request));
    session.request = Some(request);
    session.dashboard = Some(dashboard);
    Ok(())
}

fn parse_date_input(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Handle option [2]: edit the date range. Blank input restores the full span.
fn handle_date_range<R: BufRead>(session: &mut Session, input: &mut R) {
    let (Some(dashboard), Some(request)) = (&session.dashboard, &mut session.request) else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };
    let Some(full) = dashboard.full_range() else {
        println!("The loaded file has no rows.\n");
        return;
    };
    println!("Available: {} to {}", full.start, full.end);
    let Some(start) = prompt(input, "Start date (YYYY-MM-DD, blank for full range): ") else {
        return;
    };
    if start.is_empty() {
        request.date_range = Some(full);
        println!("{}\n", describe_request(request));
        return;
    }
    let Some(end) = prompt(input, "End date (YYYY-MM-DD): ") else {
        return;
    };
    match (parse_date_input(&start), parse_date_input(&end)) {
        (Some(s), Some(e)) => {
            request.date_range = Some(DateRange::new(s, e).clamp(full));
            println!("{}\n", describe_request(request));
        }
        _ => println!("Invalid date. Please use YYYY-MM-DD.\n"),
    }
}

/// Handle option [3]: edit the year selection. Blank input selects all years.
fn handle_years<R: BufRead>(session: &mut Session, input: &mut R) {
    let (Some(dashboard), Some(request)) = (&session.dashboard, &mut session.request) else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };
    let available = dashboard.available_years();
    let listed: Vec<String> = available.iter().map(|y| y.to_string()).collect();
    println!("Available years: {}", listed.join(", "));
    let label = "Years for comparison (comma-separated, blank for all): ";
    let Some(line) = prompt(input, label) else {
        return;
    };
    let mut selected = BTreeSet::new();
    for part in line.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<i32>() {
            Ok(y) if available.contains(&y) => {
                selected.insert(y);
            }
            _ => println!("Ignoring '{}': not an available year.", part),
        }
    }
    request.selected_years = selected;
    println!("{}\n", describe_request(request));
}

/// Handle option [4]: render the dashboard and export its tables.
fn handle_generate(session: &Session) -> Result<(), DashboardError> {
    let (Some(dashboard), Some(request)) = (&session.dashboard, &session.request) else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return Ok(());
    };
    println!("GERMANY ENERGY INTELLIGENCE DASHBOARD");
    println!("{}\n", describe_request(request));

    let snapshot = dashboard.render(request);
    output::print_snapshot(&snapshot, session.preview_rows);

    let dir = &session.config.output_dir;
    let written = output::export_snapshot(&snapshot, dir)?;
    println!(
        "(Full tables exported to {}: {} files)\n",
        dir.display(),
        written.len()
    );
    Ok(())
}

fn run_menu<R: BufRead>(session: &mut Session, input: &mut R) {
    loop {
        println!("Dashboard Controls:");
        println!("[1] Load the file");
        println!("[2] Set date range");
        println!("[3] Select years");
        println!("[4] Generate dashboard\n");
        let Some(choice) = read_choice(input) else {
            println!("\nExiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => {
                if let Err(e) = handle_load(session) {
                    report_error("Failed to load file", &e);
                }
            }
            "2" => handle_date_range(session, input),
            "3" => handle_years(session, input),
            "4" => {
                println!();
                if let Err(e) = handle_generate(session) {
                    report_error("An error occurred", &e);
                }
                if !prompt_back_to_menu(input) {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1, 2, 3 or 4.\n"),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match DashboardConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                error!(path = %path.display(), error = %e, "invalid configuration");
                return ExitCode::FAILURE;
            }
        },
        None => DashboardConfig::default(),
    };
    if let Some(dir) = cli.out_dir {
        config.output_dir = dir;
    }

    let mut session = Session {
        data_path: cli.data,
        config,
        preview_rows: cli.preview_rows,
        dashboard: None,
        request: None,
    };

    if cli.once {
        let result = handle_load(&mut session).and_then(|_| handle_generate(&session));
        return match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                report_error("An error occurred", &e);
                if e.is_fatal() {
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                }
            }
        };
    }

    let stdin = io::stdin();
    run_menu(&mut session, &mut stdin.lock());
    ExitCode::SUCCESS
}
