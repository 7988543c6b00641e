use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use env_logger::{Builder, Env, Target};

use crate::error::Result;

/// Installs the global logger. With a `log_file` every record is appended to
/// it as the bare message; otherwise records go to stderr in env_logger's
/// usual format. `RUST_LOG` overrides `default_level`.
pub fn init(log_file: Option<&Path>, default_level: &str) -> Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));
    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder
            .format(|buf, record| writeln!(buf, "{}", record.args()))
            .target(Target::Pipe(Box::new(file)));
    }
    // a second init (tests, embedding) keeps the first logger
    let _ = builder.try_init();
    Ok(())
}
