//! Build automation for the graph client workspace.
//!
//! Run with `cargo xtask <command>`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

#[derive(Parser)]
#[command(name = "xtask", about = "Build automation for the graph client workspace")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Formatting, lints and tests, as run in CI
    Ci,
    /// Check formatting
    Fmt,
    /// Lint every target with warnings denied
    Clippy,
    /// Run the workspace tests, mock-server integration tests included
    Test {
        /// Only test this package
        #[arg(short, long)]
        package: Option<String>,
    },
    /// Build the API documentation
    Doc,
    /// Run a fuzz target for a while (requires cargo-fuzz and nightly)
    Fuzz {
        /// Target name under fuzz/fuzz_targets
        #[arg(default_value = "decode_frame")]
        target: String,
        /// Seconds to run
        #[arg(long, default_value_t = 60)]
        seconds: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;
    sh.change_dir(workspace_root()?);

    match cli.command {
        Command::Ci => {
            fmt(&sh)?;
            clippy(&sh)?;
            test(&sh, None)?;
            println!("CI checks passed.");
        }
        Command::Fmt => fmt(&sh)?,
        Command::Clippy => clippy(&sh)?,
        Command::Test { package } => test(&sh, package.as_deref())?,
        Command::Doc => cmd!(sh, "cargo doc --workspace --no-deps").run()?,
        Command::Fuzz { target, seconds } => fuzz(&sh, &target, seconds)?,
    }
    Ok(())
}

fn workspace_root() -> Result<PathBuf> {
    let output = std::process::Command::new("cargo")
        .args(["locate-project", "--workspace", "--message-format=plain"])
        .output()
        .context("failed to run cargo locate-project")?;
    let manifest = String::from_utf8(output.stdout).context("invalid UTF-8 in cargo output")?;
    PathBuf::from(manifest.trim())
        .parent()
        .map(PathBuf::from)
        .context("workspace manifest has no parent directory")
}

fn fmt(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo fmt --all -- --check").run()?;
    Ok(())
}

fn clippy(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo clippy --workspace --all-targets -- -D warnings").run()?;
    Ok(())
}

fn test(sh: &Shell, package: Option<&str>) -> Result<()> {
    match package {
        Some(package) => cmd!(sh, "cargo test -p {package}").run()?,
        None => cmd!(sh, "cargo test --workspace").run()?,
    }
    Ok(())
}

fn fuzz(sh: &Shell, target: &str, seconds: u64) -> Result<()> {
    let _dir = sh.push_dir("fuzz");
    let max_time = format!("-max_total_time={seconds}");
    cmd!(sh, "cargo +nightly fuzz run {target} -- {max_time}").run()?;
    Ok(())
}
