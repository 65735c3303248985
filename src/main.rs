use clap::Parser;
use console::Term;
use std::path::Path;
use std::process;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use xlsx_pdf_combine::{
    AssumeYes, Cli, CombineError, Combiner, ConfirmationGate, Mode, OutputFormatter, OutputMode,
    Result, RunOutcome, TerminalGate, UserFriendlyError,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(log_level(&cli));

    let exit_code = run(&cli).await;

    let interactive =
        OutputFormatter::new(cli.output_format.clone().into(), cli.verbose, cli.quiet).is_interactive();
    if cli.should_wait(interactive) {
        wait_for_enter();
    }

    process::exit(exit_code);
}

async fn run(cli: &Cli) -> i32 {
    if cli.generate_config {
        return handle_generate_config(cli);
    }

    let mut combiner = match Combiner::from_cli(cli) {
        Ok(combiner) => combiner,
        Err(e) => {
            print_startup_error(&e);
            return exit_code(&e);
        }
    };

    combiner
        .output_formatter()
        .debug(&xlsx_pdf_combine::build_info().to_string());

    let mut gate: Box<dyn ConfirmationGate> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalGate::new())
    };

    match run_batch(cli, &mut combiner, gate.as_mut()).await {
        Ok(_) => 0,
        Err(e) => {
            combiner.handle_error(&e);
            exit_code(&e)
        }
    }
}

async fn run_batch(
    cli: &Cli,
    combiner: &mut Combiner,
    gate: &mut dyn ConfirmationGate,
) -> Result<Option<RunOutcome>> {
    let working_dir = cli.resolve_working_dir()?;
    let output_dir = cli.resolve_output_dir(&working_dir, combiner.config())?;

    let mode = match cli.mode {
        Some(mode) => mode,
        None if cli.dry_run => Mode::default(),
        None => gate.select_mode()?,
    };

    let plan = combiner.plan(mode, &working_dir, &output_dir)?;

    if cli.dry_run {
        handle_dry_run(combiner.output_formatter(), &output_dir);
        return Ok(None);
    }

    combiner.execute(&plan, gate).await.map(Some)
}

fn exit_code(error: &CombineError) -> i32 {
    match error {
        CombineError::Interrupted => 130,
        CombineError::NothingToMerge { .. } => 2,
        CombineError::DuplicateFiles { .. } => 3,
        CombineError::Access { .. } => 4,
        CombineError::Conversion { .. } | CombineError::Timeout { .. } | CombineError::Pdf { .. } => 5,
        CombineError::HostUnavailable { .. } => 6,
        CombineError::Config { .. }
        | CombineError::PageRange { .. }
        | CombineError::OutputIsWorkingDir { .. } => 7,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "xlsx-pdf-combine.toml".to_string());

    match Combiner::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  xlsx-pdf-combine <working-dir> --config {}", config_path);
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(formatter: &OutputFormatter, output_dir: &Path) {
    formatter.success("Dry run completed successfully");
    formatter.info(&format!(
        "Nothing was converted or written; outputs would go to {}",
        output_dir.display()
    ));
}

fn print_startup_error(error: &CombineError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

fn log_level(cli: &Cli) -> LevelFilter {
    if cli.quiet {
        return LevelFilter::ERROR;
    }

    match cli.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// `RUST_LOG` wins over the `-v` level.
fn init_tracing(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already set; skipping re-initialization.");
    }
}

fn wait_for_enter() {
    let term = Term::stdout();
    if term.write_line("Press Enter to exit...").is_ok() {
        // A read error only means there is nobody to wait for.
        let _ = term.read_line();
    }
}
