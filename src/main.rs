use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use flowpatch::config::{
    apply_rules, discover_documents, load_from_path, ApplicationError, DocumentResult,
};
use flowpatch::rules::CATALOGUE;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flowpatch")]
#[command(
    about = "Rule-based rewriting of CI workflow and dependabot documents",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Log engine decisions (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a rule set to documents
    Apply {
        /// Rule-set TOML file
        #[arg(short, long)]
        rules: PathBuf,

        /// Documents or directories containing *.json documents
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Report documents a rule set would change; exits 1 if any
    Check {
        /// Rule-set TOML file
        #[arg(short, long)]
        rules: PathBuf,

        /// Documents or directories containing *.json documents
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List the built-in rules
    ListRules,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Apply {
            rules,
            paths,
            dry_run,
            diff,
        } => cmd_apply(&rules, &paths, dry_run, diff),

        Commands::Check { rules, paths } => cmd_check(&rules, &paths),

        Commands::ListRules => cmd_list_rules(),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Helper: Show unified diff between original and rewritten content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (rewritten)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn report_error(file: &Path, error: &ApplicationError) {
    eprintln!("{} {}: Error - {}", "✗".red(), file.display(), error);
    match error {
        ApplicationError::Pipeline(e) => {
            eprintln!("  Rule: {}", e.step);
            eprintln!("  Document left unchanged");
        }
        ApplicationError::Render { .. } => eprintln!("  Document left unchanged"),
        _ => {}
    }
}

fn cmd_apply(rules: &Path, paths: &[PathBuf], dry_run: bool, show_diff: bool) -> Result<()> {
    let rule_set = load_from_path(rules)?;
    let pipeline = &rule_set.pipeline;
    let files = discover_documents(paths)?;

    println!(
        "Loaded {} rules from {} ({})",
        pipeline.len(),
        rules.display(),
        rule_set.name()
    );
    if dry_run {
        println!("{}", "  [DRY RUN - showing what would be rewritten]".cyan());
    }
    println!();

    let mut total_rewritten = 0;
    let mut total_unchanged = 0;
    let mut total_failed = 0;

    for (file, result) in apply_rules(pipeline, &files, dry_run) {
        match result {
            Ok(DocumentResult::Rewritten {
                rules,
                before,
                after,
                ..
            }) => {
                let verb = if dry_run { "Would rewrite" } else { "Rewrote" };
                println!(
                    "{} {}: {} ({})",
                    "✓".green(),
                    file.display(),
                    verb,
                    rules.join(", ")
                );
                total_rewritten += 1;
                if show_diff {
                    display_diff(&file, &before, &after);
                }
            }
            Ok(DocumentResult::Unchanged { .. }) => {
                println!("{} {}: No changes", "⊙".yellow(), file.display());
                total_unchanged += 1;
            }
            Err(e) => {
                report_error(&file, &e);
                total_failed += 1;
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} rewritten", format!("{}", total_rewritten).green());
    println!("  {} unchanged", format!("{}", total_unchanged).yellow());
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_check(rules: &Path, paths: &[PathBuf]) -> Result<()> {
    let rule_set = load_from_path(rules)?;
    let pipeline = &rule_set.pipeline;
    let files = discover_documents(paths)?;

    println!("{}", "Rule Set Check".bold());
    println!("Rules: {}", rules.display());
    println!();

    let mut pending = Vec::new();
    let mut clean = 0;
    let mut failed = 0;

    for (file, result) in apply_rules(pipeline, &files, true) {
        match result {
            Ok(DocumentResult::Rewritten { rules, .. }) => pending.push((file, rules)),
            Ok(DocumentResult::Unchanged { .. }) => clean += 1,
            Err(e) => {
                report_error(&file, &e);
                failed += 1;
            }
        }
    }

    if !pending.is_empty() {
        println!(
            "{} {} ({} documents)",
            "⊙".yellow(),
            "WOULD CHANGE".yellow().bold(),
            pending.len()
        );
        for (file, rules) in &pending {
            println!("  - {} ({})", file.display(), rules.join(", ").dimmed());
        }
        println!();
    }

    println!(
        "{} {} ({} documents)",
        "✓".green(),
        "UP TO DATE".green().bold(),
        clean
    );

    if !pending.is_empty() || failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list_rules() -> Result<()> {
    println!("{}", "Built-in rules:".bold());
    println!();
    for info in CATALOGUE {
        println!("  {}", info.id.cyan());
        println!("    {}", info.summary);
    }
    Ok(())
}
