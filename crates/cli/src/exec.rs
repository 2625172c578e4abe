//! Run a resolved argument vector as an external process.

use anyhow::{anyhow, Context, Result};
use tokio::process::Command;
use tracing::info;

/// Spawn `argv[0]` with the remaining arguments, print captured stdout and
/// stderr, and return the exit code. Failures are reported, never retried.
pub async fn run(argv: &[String]) -> Result<i32> {
    let (program, args) = argv.split_first().ok_or_else(|| anyhow!("empty argument vector"))?;
    info!(program = %program, args = args.len(), "executing");
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("spawning {program:?}"))?;
    print!("{}", String::from_utf8_lossy(&output.stdout));
    eprint!("{}", String::from_utf8_lossy(&output.stderr));
    Ok(output.status.code().unwrap_or(-1))
}
