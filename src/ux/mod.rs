use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::config::Config;
use crate::errors::CodeGenError;
use crate::package::PackagedResult;
use crate::pipeline::Stage;

/// Spinner that follows pipeline stages.
pub struct StageSpinner {
    bar: ProgressBar,
}

impl StageSpinner {
    pub fn start() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    pub fn on_stage(&self, stage: Stage) {
        match stage {
            Stage::Done | Stage::Failed => self.bar.finish_and_clear(),
            other => self.bar.set_message(stage_label(other)),
        }
    }
}

pub fn stage_label(stage: Stage) -> String {
    match stage {
        Stage::Enhancing | Stage::Generating | Stage::ScaffoldingBackend => {
            format!("{} (waiting on model)", stage)
        }
        other => other.to_string(),
    }
}

pub fn print_result(res: &PackagedResult) {
    println!(
        "\n{}",
        "┏━━━━━━━━━━━━━━━━━━━━━━━━ Archive ━━━━━━━━━━━━━━━━━━━━━━━━┓".bold()
    );
    println!("  {}: {}", "File".green().bold(), res.archive_id);
    println!("  {}: {}", "Path".cyan().bold(), res.archive_path);
    println!(
        "  {}: {}",
        "Size".bold(),
        humansize::format_size(res.bytes, humansize::DECIMAL)
    );
    println!("{}", "┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛".bold());
}

pub fn print_failure(err: &CodeGenError) {
    eprintln!("{} [{}] {}", "error".red().bold(), err.kind(), err);
}

pub fn print_banner(cfg: &Config, addr: &str) {
    println!("{} on http://{}", "vibe_pagegen listening".bold(), addr);
    println!("  POST /app/code            generate a page archive");
    println!("  GET  /app/file/{{file}}     download an archive");
    println!("  provider: {:?}  model: {}  timeout: {}s", cfg.provider, cfg.model, cfg.timeout_secs);
    println!("  archives: {}", cfg.artifacts_dir);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_bound_stages_say_so() {
        assert_eq!(stage_label(Stage::Generating), "generating frontend (waiting on model)");
        assert_eq!(stage_label(Stage::Packaging), "packaging");
    }
}
