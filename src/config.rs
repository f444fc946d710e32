use std::path::PathBuf;

/// Process-wide knobs shared by every stage.
#[derive(Debug, Clone)]
pub struct Config {
    pub threads: usize,
    pub single_threaded: bool,
    pub verbose: bool,
    pub tmp_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            single_threaded: false,
            verbose: false,
            tmp_dir: std::env::temp_dir(),
        }
    }
}
