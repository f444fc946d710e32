use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::config::Config;

/// Creates the parent directory of `raw_path` if it doesn't already exist.
pub fn create_out_directory(raw_path: impl AsRef<Path>) -> anyhow::Result<()> {
    if let Some(p) = raw_path.as_ref().parent() {
        if !p.exists() && p != Path::new("") {
            info!("creating directory at {p:?}");
            std::fs::create_dir_all(p)?;
        }
    }
    Ok(())
}

pub fn get_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.blue} [{elapsed_precise}] {pos} {msg}")
            .unwrap()
            .tick_strings(&[
                "▹▹▹▹▹", "▸▹▹▹▹", "▹▸▹▹▹", "▹▹▸▹▹", "▹▹▹▸▹", "▹▹▹▹▸", "▪▪▪▪▪",
            ]),
    );
    spinner
}

/// Resolves the number of dedup chains / worker threads for the
/// split-then-mark topology: `min(12, half the configured thread count)`
/// collapsing to 1 under `--single-threaded`.
pub fn resolve_worker_count(config: &Config) -> usize {
    if config.single_threaded {
        return 1;
    }
    std::cmp::min(12, std::cmp::max(1, config.threads / 2))
}

pub fn format_int_with_commas(val: u64) -> String {
    let digits = val.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out.chars().rev().collect()
}
