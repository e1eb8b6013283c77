use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use imaging_catalog::app::{App, ProgressSinkKind};
use imaging_catalog::charts::{ChartKind, ChartSelection};
use imaging_catalog::config::{ConfigLoader, FilterConfig};
use imaging_catalog::domain::DimensionChoice;
use imaging_catalog::error::CatalogError;
use imaging_catalog::output::{JsonOutput, OutputMode, TextOutput};
use imaging_catalog::pipeline::PipelineStage;
use imaging_catalog::quick::QuickFilter;
use imaging_catalog::source::{HttpRecordSource, SourceList, SourceLocation};

#[derive(Parser)]
#[command(name = "imcat")]
#[command(about = "Browse, filter and summarize imaging dataset catalogs")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(
        long = "source",
        global = true,
        help = "Record source (path or http(s) URL), repeat for a fallback chain"
    )]
    sources: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Quick-filter the catalog and show one page of rows")]
    Browse(BrowseArgs),
    #[command(about = "Run the criteria/selection pipeline from a JSON config")]
    Pipeline(PipelineArgs),
    #[command(about = "Show overview charts, optionally applying a chart click")]
    Charts(ChartsArgs),
    #[command(about = "List modality and task values")]
    Options,
    #[command(about = "Show record count and the source used")]
    Health,
}

#[derive(Args)]
struct BrowseArgs {
    #[arg(long, default_value = "")]
    search: String,

    #[arg(long)]
    dimension: Option<DimensionChoice>,

    #[arg(long, help = "Only keep single-dimension datasets when --dimension is set")]
    exclude_mixed: bool,

    #[arg(long)]
    modality: Option<String>,

    #[arg(long)]
    task: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: usize,
}

#[derive(Args)]
struct PipelineArgs {
    #[arg(long, value_enum, default_value_t = PipelineStage::Criteria)]
    stage: PipelineStage,

    #[arg(long, conflicts_with = "config_json")]
    config: Option<Utf8PathBuf>,

    #[arg(long)]
    config_json: Option<String>,
}

#[derive(Args)]
struct ChartsArgs {
    #[arg(long, help = "Chart click as <dimension|modality|task>=<label|clear>")]
    click: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(catalog) = report.downcast_ref::<CatalogError>() {
            return ExitCode::from(map_exit_code(catalog));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CatalogError) -> u8 {
    match error {
        CatalogError::Retrieval { .. }
        | CatalogError::SourceHttp(_)
        | CatalogError::SourceStatus { .. }
        | CatalogError::SourceRead(_)
        | CatalogError::SourceShape(_) => 3,
        CatalogError::ConfigRead(_) | CatalogError::ConfigParse(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let sources = if cli.sources.is_empty() {
        SourceList::default_chain()
    } else {
        SourceList::new(
            cli.sources
                .iter()
                .map(|value| value.parse::<SourceLocation>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(miette::Report::new)?,
        )
    };
    let app = App::new(
        HttpRecordSource::new().map_err(miette::Report::new)?,
        sources,
    );

    let result = match cli.command {
        Commands::Browse(args) => run_browse(&app, args, output_mode),
        Commands::Pipeline(args) => run_pipeline(&app, args, output_mode),
        Commands::Charts(args) => run_charts(&app, args, output_mode),
        Commands::Options => run_options(&app, output_mode),
        Commands::Health => run_health(&app, output_mode),
    };
    if let Err(CatalogError::Retrieval { tried }) = &result {
        let message = format!("tried {}", tried.join(", "));
        match output_mode {
            OutputMode::NonInteractive => JsonOutput::print_failure(&message).into_diagnostic()?,
            OutputMode::Interactive => TextOutput::print_failure(&message),
        }
    }
    result.map_err(miette::Report::new)
}

fn run_browse(
    app: &App<HttpRecordSource>,
    args: BrowseArgs,
    output_mode: OutputMode,
) -> Result<(), CatalogError> {
    let filter = QuickFilter {
        search: args.search,
        dimension: args.dimension,
        include_mixed: !args.exclude_mixed,
        modality: args.modality.filter(|value| !value.is_empty()),
        task: args.task.filter(|value| !value.is_empty()),
    };
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.browse(filter, args.page, &JsonOutput)?;
            JsonOutput::print_browse(&result).map_err(io_error)
        }
        OutputMode::Interactive => {
            let sink = TextOutput::new(ProgressSinkKind::Browse);
            let result = app.browse(filter, args.page, &sink)?;
            TextOutput::print_browse(&result);
            Ok(())
        }
    }
}

fn run_pipeline(
    app: &App<HttpRecordSource>,
    args: PipelineArgs,
    output_mode: OutputMode,
) -> Result<(), CatalogError> {
    let stage = args.stage;
    let config = match (&args.config, &args.config_json) {
        (Some(path), _) => ConfigLoader::from_path(path)?,
        (None, Some(text)) => ConfigLoader::from_text(text)?,
        (None, None) => FilterConfig::default(),
    };
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.pipeline(&config, stage, &JsonOutput)?;
            JsonOutput::print_pipeline(&result).map_err(io_error)
        }
        OutputMode::Interactive => {
            let sink = TextOutput::new(ProgressSinkKind::Pipeline);
            let result = app.pipeline(&config, stage, &sink)?;
            TextOutput::print_pipeline(&result);
            Ok(())
        }
    }
}

fn run_charts(
    app: &App<HttpRecordSource>,
    args: ChartsArgs,
    output_mode: OutputMode,
) -> Result<(), CatalogError> {
    let click = args.click.as_deref().map(parse_click).transpose()?;
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.charts(click, &JsonOutput)?;
            JsonOutput::print_charts(&result).map_err(io_error)
        }
        OutputMode::Interactive => {
            let sink = TextOutput::new(ProgressSinkKind::Browse);
            let result = app.charts(click, &sink)?;
            TextOutput::print_charts(&result);
            Ok(())
        }
    }
}

fn run_options(app: &App<HttpRecordSource>, output_mode: OutputMode) -> Result<(), CatalogError> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.options(&JsonOutput)?;
            JsonOutput::print_options(&result).map_err(io_error)
        }
        OutputMode::Interactive => {
            let result = app.options(&TextOutput::new(ProgressSinkKind::Load))?;
            TextOutput::print_options(&result);
            Ok(())
        }
    }
}

fn run_health(app: &App<HttpRecordSource>, output_mode: OutputMode) -> Result<(), CatalogError> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.health(&JsonOutput)?;
            JsonOutput::print_health(&result).map_err(io_error)
        }
        OutputMode::Interactive => {
            let result = app.health(&TextOutput::new(ProgressSinkKind::Load))?;
            TextOutput::print_health(&result);
            Ok(())
        }
    }
}

fn parse_click(value: &str) -> Result<(ChartKind, ChartSelection), CatalogError> {
    let (chart, label) = value
        .split_once('=')
        .ok_or_else(|| CatalogError::InvalidChartSelection(value.to_string()))?;
    let chart = chart.parse::<ChartKind>()?;
    let selection = match label.trim() {
        "" | "clear" => ChartSelection::Clear,
        label => ChartSelection::Label(label.to_string()),
    };
    Ok((chart, selection))
}

fn io_error(err: std::io::Error) -> CatalogError {
    CatalogError::Output(err.to_string())
}
