use crate::error::{CombineError, UserFriendlyError};
use crate::pipeline::{Gate, Mode, OutputDirState, RunPlan, RunReport};
use crate::ui::progress::format_duration;
use console::{style, Emoji, Term};
use serde_json;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

pub struct OutputFormatter {
    term: Term,
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let term = Term::stdout();
        let use_colors = match mode {
            OutputMode::Human => term.features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            term,
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Whether prompts and the exit pause make sense on this output.
    pub fn is_interactive(&self) -> bool {
        self.mode == OutputMode::Human && self.term.is_term()
    }

    // Core messaging methods
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(2) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("  {}", style(message).dim());
                    } else {
                        println!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => println!("DEBUG: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    // User-friendly error handling
    pub fn print_user_friendly_error(&self, error: &CombineError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    eprintln!();
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    /// Everything the operator is asked to confirm at the first gate.
    pub fn print_plan(&self, plan: &RunPlan) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => self.print_human_plan(plan),
            OutputMode::Json => {
                let mut value = serde_json::to_value(plan).unwrap_or_else(|_| serde_json::json!({}));
                if let Some(object) = value.as_object_mut() {
                    object.insert("type".to_string(), serde_json::json!("plan"));
                }
                self.print_json_object(&value);
            }
            OutputMode::Plain => self.print_plain_plan(plan),
        }
    }

    pub fn print_run_report(&self, report: &RunReport) {
        match self.mode {
            OutputMode::Human => {
                if !self.quiet {
                    self.print_human_report(report);
                }
            }
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            OutputMode::Plain => self.print_plain_report(report),
        }
    }

    pub fn print_cancelled(&self, gate: Gate) {
        match self.mode {
            OutputMode::Json => self.print_json_object(&serde_json::json!({
                "type": "cancelled",
                "gate": gate,
            })),
            _ => self.warning(&format!("Cancelled at the {} prompt; nothing was written.", gate)),
        }
    }

    // Specialized output methods
    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {}
        }
    }

    // Private helper methods
    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn highlight<T: std::fmt::Display>(&self, value: T) -> String {
        if self.use_colors {
            style(value).cyan().bold().to_string()
        } else {
            value.to_string()
        }
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_human_plan(&self, plan: &RunPlan) {
        self.print_header("Run plan");

        println!("  Mode:              {}", self.highlight(plan.mode));
        println!("  Working directory: {}", plan.working_dir.display());
        println!(
            "  Output directory:  {}{}",
            plan.output_dir.display(),
            describe_output_state(plan.output_state)
        );
        println!("  Temp directory:    {}", plan.temp_root.display());
        println!();

        match plan.mode {
            Mode::XlsxPdf => {
                println!("  Matched pairs:     {}", self.highlight(plan.pairing.pair_count()));
                println!("  Lone files:        {}", self.highlight(plan.pairing.lone_count()));
                for lone in &plan.pairing.lone_files {
                    let entry = lone.entry();
                    if self.use_colors {
                        println!("    {} {}", style("-").yellow(), entry.path.display());
                    } else {
                        println!("    - {}", entry.path.display());
                    }
                }
            }
            Mode::PdfFirstPage => {
                println!("  PDF files:         {}", self.highlight(plan.documents.len()));
                for document in &plan.documents {
                    self.debug(&document.path.display().to_string());
                }
            }
        }

        println!();
        self.print_separator();
    }

    fn print_plain_plan(&self, plan: &RunPlan) {
        println!("PLAN: {}", plan.mode);
        println!("Working directory: {}", plan.working_dir.display());
        println!(
            "Output directory: {}{}",
            plan.output_dir.display(),
            describe_output_state(plan.output_state)
        );
        println!("Temp directory: {}", plan.temp_root.display());

        match plan.mode {
            Mode::XlsxPdf => {
                println!("Matched pairs: {}", plan.pairing.pair_count());
                println!("Lone files: {}", plan.pairing.lone_count());
                for lone in &plan.pairing.lone_files {
                    println!("LONE: {}", lone.entry().path.display());
                }
            }
            Mode::PdfFirstPage => {
                println!("PDF files: {}", plan.documents.len());
            }
        }
    }

    fn print_human_report(&self, report: &RunReport) {
        println!();
        self.print_separator();

        if self.use_colors {
            println!("{} {}", style("Done!").green().bold(), CHECKMARK);
        } else {
            println!("✓ Done!");
        }

        println!();
        for output in &report.batch.outputs {
            println!("  {} ({} pages)", output.path.display(), output.pages);
        }
        if let Some(ref combined) = report.combined {
            println!(
                "  {} ({} pages)",
                self.highlight(combined.path.display()),
                combined.pages
            );
        }

        println!();
        println!("  Outputs written: {}", self.highlight(report.batch.outputs.len() + usize::from(report.combined.is_some())));
        println!("  Time taken:      {}", self.highlight(format_duration(report.elapsed())));

        if report.batch.has_errors() {
            println!("  Skipped:         {}", report.batch.errors.len());
            for error in &report.batch.errors {
                println!("    - {}: {}", error.root_name, error.message);
            }
        }

        self.print_separator();
    }

    fn print_plain_report(&self, report: &RunReport) {
        println!("COMPLETED: {}", report.mode);
        for output in &report.batch.outputs {
            println!("OUTPUT: {} ({} pages)", output.path.display(), output.pages);
        }
        if let Some(ref combined) = report.combined {
            println!("COMBINED: {} ({} pages)", combined.path.display(), combined.pages);
        }
        println!("Duration: {}", format_duration(report.elapsed()));

        for error in &report.batch.errors {
            println!("SKIPPED: {}: {}", error.root_name, error.message);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn describe_output_state(state: OutputDirState) -> &'static str {
    match state {
        OutputDirState::Missing => " (will be created)",
        OutputDirState::Empty => " (exists, empty)",
        OutputDirState::NotEmpty => " (exists, NOT empty)",
    }
}
