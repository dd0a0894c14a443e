//! A thin trampoline: parses a module path, mount specifications, and
//! guest environment/argv off the command line, builds a `WasiCtx`, and
//! prints what it would hand to a WebAssembly engine. This binary does
//! not itself execute WebAssembly — no compiler or JIT is in scope here
//! — it exists only so the crate is exercisable by pointing it at a
//! directory tree.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use wasi_host::{PreopenDir, WasiCtx};

fn parse_env_var(s: &str) -> Result<(String, String)> {
    let mut parts = s.splitn(2, '=');
    let key = parts.next().context("missing key")?;
    let value = parts.next().context("must be of the form `key=value`")?;
    Ok((key.to_owned(), value.to_owned()))
}

fn parse_dir(s: &str) -> Result<PreopenDir> {
    let mut parts = s.splitn(3, ':');
    let host = parts.next().context("missing host path")?;
    let guest = parts.next().unwrap_or(host);
    let read_only = match parts.next() {
        None => false,
        Some("ro") => true,
        Some(other) => bail!("unknown directory mount qualifier `{other}`, expected `ro`"),
    };
    Ok(PreopenDir {
        host_path: PathBuf::from(host),
        guest_path: guest.to_string(),
        read_only,
    })
}

/// Builds a WASI context for a WebAssembly module and reports what it
/// would be run with.
#[derive(Parser)]
#[clap(name = "wasi-run")]
struct Args {
    /// Path to the WebAssembly module (not executed by this binary).
    module: PathBuf,

    /// Mount a host directory, optionally under a different guest path
    /// and/or read-only: `host[:guest[:ro]]`. May be repeated.
    #[clap(long = "dir", value_parser = parse_dir)]
    dirs: Vec<PreopenDir>,

    /// Pass an environment variable through to the guest: `KEY=VALUE`.
    /// May be repeated.
    #[clap(long = "env", value_parser = parse_env_var)]
    env: Vec<(String, String)>,

    /// Arguments passed to the guest module's own argv.
    #[clap(trailing_var_arg = true)]
    guest_args: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber_init();
    }

    let mut builder = WasiCtx::builder().inherit_stdio().arg(
        args.module
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.module.to_string_lossy().into_owned()),
    );
    for arg in &args.guest_args {
        builder = builder.arg(arg.clone());
    }
    for (key, value) in &args.env {
        builder = builder.env(key, value);
    }
    for dir in args.dirs {
        builder = builder.preopen_dir(dir);
    }

    let ctx = builder.build().context("failed to build WASI context")?;
    println!(
        "built WASI context for {:?}: {} arg(s), {} env var(s)",
        args.module,
        ctx.args().len(),
        ctx.env().len()
    );
    Ok(())
}

#[cfg(feature = "trace_log")]
fn tracing_subscriber_init() {
    let _ = env_logger::try_init();
}

#[cfg(not(feature = "trace_log"))]
fn tracing_subscriber_init() {}
