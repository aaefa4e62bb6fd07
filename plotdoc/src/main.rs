#![warn(clippy::pedantic)]

pub mod global;

use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Result as AnyResult;
use clap::Parser;
use plotdoc_core::commands::batch::{LoadCustom, LoadStyleSheet};
use plotdoc_core::state::dataset::Values;
use plotdoc_core::state::tree::Widget;
use plotdoc_core::Document;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use global::preferences::Source;

/// Run plotdoc scripts and summarise the documents they build.
#[derive(Debug, clap::Parser)]
#[command(version)]
struct Args {
    /// Stylesheet scripts, each run against its own document.
    #[arg(required_unless_present = "save_preferences")]
    stylesheets: Vec<PathBuf>,
    /// Custom definition file, loaded into every document first. May be repeated.
    #[arg(long = "custom", value_name = "FILE")]
    customs: Vec<PathBuf>,
    /// Write the preferences in use to the preferences file.
    #[arg(long)]
    save_preferences: bool,
}

fn write_tree(out: &mut String, widget: &Widget, depth: usize) {
    let _ = writeln!(
        out,
        "{:indent$}{} ({})",
        "",
        widget.name(),
        widget.typename(),
        indent = depth * 2
    );
    for child in widget.children() {
        write_tree(out, child, depth + 1);
    }
}

fn write_data(out: &mut String, document: &Document) {
    for (name, dataset) in document.data() {
        let shape = match dataset.values() {
            Values::OneD(columns) => format!("{} values", columns.len()),
            Values::TwoD(grid) => {
                let (rows, cols) = grid.shape();
                format!("{rows}x{cols} grid")
            }
        };
        let _ = writeln!(out, "{name}: {shape}");
    }
}

/// Run the scripts against a fresh document and describe the result.
fn process(
    stylesheet: &std::path::Path,
    customs: &[PathBuf],
    preferences: &global::preferences::PreferenceValues,
) -> AnyResult<String> {
    let mut document = Document::with_history_limit(preferences.history_limit());
    for custom in customs {
        document
            .apply(LoadCustom::file(custom))
            .map_err(|e| anyhow::anyhow!("{}: {e}", custom.display()))?;
    }
    if let Err(e) = document.apply(LoadStyleSheet::file(stylesheet)) {
        // Whatever ran before the failure stays applied.
        log::warn!("{}: {e}", stylesheet.display());
        if !document.can_undo() {
            anyhow::bail!("{}: {e}", stylesheet.display());
        }
    }
    log::info!(
        "{}: {} undo steps",
        stylesheet.display(),
        document.history().undo_len()
    );

    let mut out = format!("== {}\n", stylesheet.display());
    if preferences.print_tree {
        write_tree(&mut out, document.root(), 0);
    }
    write_data(&mut out, &document);
    Ok(out)
}

fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Debug);
    }

    let args = Args::parse();
    let preferences = global::preferences::Preferences::global();
    match &preferences.source {
        Source::File(path) => log::debug!("Preferences from {}", path.display()),
        Source::Defaults | Source::Unreadable(_) => log::info!("Using default preferences"),
    }
    if args.save_preferences {
        let path = preferences.save()?;
        log::info!("Saved preferences to {}", path.display());
    }

    let reports: Vec<_> = args
        .stylesheets
        .par_iter()
        .map(|stylesheet| process(stylesheet, &args.customs, &preferences.values))
        .collect();

    let mut failures = 0;
    for report in &reports {
        match report {
            Ok(text) => print!("{text}"),
            Err(e) => {
                failures += 1;
                log::error!("{e:#}");
            }
        }
    }
    if failures > 0 && failures == reports.len() {
        anyhow::bail!("no stylesheet could be loaded");
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("plotdoc").chain(list.iter().copied()))
    }
    #[test]
    fn parse_args() {
        let parsed = args(&["a.vsz", "--custom", "c.vsz", "b.vsz"]).unwrap();
        assert_eq!(parsed.stylesheets, [PathBuf::from("a.vsz"), PathBuf::from("b.vsz")]);
        assert_eq!(parsed.customs, [PathBuf::from("c.vsz")]);
        assert!(!parsed.save_preferences);
        assert!(args(&["a.vsz", "--custom"]).is_err());
        assert!(args(&["--frobnicate"]).is_err());
        // Stylesheets are only optional when saving preferences.
        assert!(args(&[]).is_err());
        assert!(args(&["--save-preferences"]).unwrap().stylesheets.is_empty());
    }
    #[test]
    fn args_are_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
    #[test]
    fn tree_is_indented() {
        let mut document = Document::new();
        document
            .apply(plotdoc_core::commands::widget::WidgetAdd::new(
                "/",
                plotdoc_core::state::tree::WidgetKind::Page,
            ))
            .unwrap();
        let mut out = String::new();
        write_tree(&mut out, document.root(), 0);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[1], "  page1 (page)");
    }
}
