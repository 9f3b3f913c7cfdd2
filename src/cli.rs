// Command-line front end for Rollsync.
//
// One subcommand per session step: `signature` on the receiver, `delta` on
// the sender, `patch` back on the receiver.  All three must agree on the
// block size.

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use log::LevelFilter;

use crate::config::{DEFAULT_BLOCK_SIZE, DEFAULT_READ_BUFFER, SyncOptions};
use crate::error::SyncError;
use crate::io;

// ---------------------------------------------------------------------------
// Byte size parsing (supports K, M, G suffixes)
// ---------------------------------------------------------------------------

fn parse_byte_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".into());
    }
    let (num_part, shift) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 10),
        Some(b'm' | b'M') => (&s[..s.len() - 1], 20),
        Some(b'g' | b'G') => (&s[..s.len() - 1], 30),
        _ => (s, 0),
    };
    let num: usize = num_part
        .trim()
        .parse()
        .map_err(|e| format!("invalid size '{s}': {e}"))?;
    let size = num
        .checked_mul(1usize << shift)
        .ok_or_else(|| format!("size overflow: '{s}'"))?;
    if size == 0 {
        return Err("size must be positive".into());
    }
    Ok(size)
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// rsync-style delta transfer between two copies of a file.
#[derive(Parser, Debug)]
#[command(
    name = "rollsync",
    version,
    about = "rsync-style block signatures, deltas and patches",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,

    /// Block size shared by all three steps (supports K/M/G suffix).
    #[arg(
        long = "block-size",
        short = 'b',
        global = true,
        value_parser = parse_byte_size,
        default_value_t = DEFAULT_BLOCK_SIZE
    )]
    block_size: usize,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Build the block signature of a basis file.
    Signature(SignatureArgs),
    /// Diff a new file against a signature.
    Delta(DeltaArgs),
    /// Rebuild the new file from the basis and a delta.
    Patch(PatchArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct SignatureArgs {
    /// Basis file.
    #[arg(value_hint = ValueHint::FilePath)]
    basis: PathBuf,

    /// Signature output file.
    #[arg(value_hint = ValueHint::FilePath)]
    signature: PathBuf,
}

#[derive(Args, Debug)]
struct DeltaArgs {
    /// Signature of the basis file.
    #[arg(value_hint = ValueHint::FilePath)]
    signature: PathBuf,

    /// New version of the file.
    #[arg(value_hint = ValueHint::FilePath)]
    new: PathBuf,

    /// Delta output file.
    #[arg(value_hint = ValueHint::FilePath)]
    delta: PathBuf,
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// Basis file the signature was built from.
    #[arg(value_hint = ValueHint::FilePath)]
    basis: PathBuf,

    /// Delta produced by the `delta` step.
    #[arg(value_hint = ValueHint::FilePath)]
    delta: PathBuf,

    /// Reconstructed output file.
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Fail unless the output has this SHA-256 (hex).
    #[arg(long = "expect-sha256", value_name = "HEX")]
    expect_sha256: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Signature,
    Delta,
    Patch,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    sync: SyncOptions,
    /// Positional paths in command order.
    paths: Vec<PathBuf>,
    expect_sha256: Option<String>,
}

fn resolve_options(cli: Cli) -> Options {
    let (command, paths, expect_sha256) = match cli.command {
        Cmd::Signature(a) => (Command::Signature, vec![a.basis, a.signature], None),
        Cmd::Delta(a) => (Command::Delta, vec![a.signature, a.new, a.delta], None),
        Cmd::Patch(a) => (
            Command::Patch,
            vec![a.basis, a.delta, a.output],
            a.expect_sha256,
        ),
        Cmd::Config => (Command::Config, Vec::new(), None),
    };
    Options {
        command,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        sync: SyncOptions::with_block_size(cli.block_size),
        paths,
        expect_sha256,
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("rollsync".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_output(path: &Path, force: bool) -> Result<(), String> {
    if path.exists() && !force {
        return Err(format!(
            "output file exists, use -f to overwrite: {}",
            path.display()
        ));
    }
    Ok(())
}

fn hex_or_null(digest: Option<[u8; 32]>) -> serde_json::Value {
    match digest {
        Some(d) => serde_json::Value::String(hex::encode(d)),
        None => serde_json::Value::Null,
    }
}

fn print_json(json: &serde_json::Value) {
    match serde_json::to_string_pretty(json) {
        Ok(s) => eprintln!("{s}"),
        Err(e) => eprintln!("rollsync: json error: {e}"),
    }
}

fn report(step: &str, err: &SyncError) -> i32 {
    eprintln!("rollsync: {step}: {err}");
    1
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("rollsync version {version} (Rust)");

    let file_io = cfg!(feature = "file-io") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();

    eprintln!("FILE_IO={file_io}");
    eprintln!("DEFAULT_BLOCK_SIZE={DEFAULT_BLOCK_SIZE}");
    eprintln!("DEFAULT_READ_BUFFER={DEFAULT_READ_BUFFER}");
    eprintln!("STRONG_HASH=sha256/128");
    eprintln!("sizeof(usize)={ptr_size}");

    0
}

/// The `N` positional paths of `cmd`, or a message on stderr if the count
/// is wrong.
fn expect_paths<'a, const N: usize>(opts: &'a Options, cmd: &str) -> Option<&'a [PathBuf; N]> {
    let paths = <&[PathBuf; N]>::try_from(&opts.paths[..]).ok();
    if paths.is_none() {
        eprintln!("rollsync: {cmd}: expected {N} paths, got {}", opts.paths.len());
    }
    paths
}

// ---------------------------------------------------------------------------
// Signature command
// ---------------------------------------------------------------------------

fn cmd_signature(opts: &Options) -> i32 {
    let Some([basis, signature]) = expect_paths(opts, "signature") else {
        return 1;
    };
    if let Err(msg) = check_output(signature, opts.force) {
        eprintln!("rollsync: {msg}");
        return 1;
    }

    let stats = match io::signature_file(basis, signature, &opts.sync) {
        Ok(s) => s,
        Err(e) => return report("signature", &e),
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "rollsync: signature: basis size: {}, blocks: {}, signature size: {}",
            stats.basis_size, stats.blocks, stats.signature_size
        );
    }

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "signature",
            "block_size": opts.sync.block_size,
            "basis_size": stats.basis_size,
            "blocks": stats.blocks,
            "signature_size": stats.signature_size,
            "basis_sha256": hex_or_null(stats.basis_sha256),
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Delta command
// ---------------------------------------------------------------------------

fn cmd_delta(opts: &Options) -> i32 {
    let Some([signature, new, delta]) = expect_paths(opts, "delta") else {
        return 1;
    };
    if let Err(msg) = check_output(delta, opts.force) {
        eprintln!("rollsync: {msg}");
        return 1;
    }

    let stats = match io::delta_file(signature, new, delta, &opts.sync) {
        Ok(s) => s,
        Err(e) => return report("delta", &e),
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "rollsync: delta: new size: {}, delta size: {}, matched blocks: {}, \
             literal bytes: {}",
            stats.new_size, stats.delta_size, stats.matched_blocks, stats.literal_bytes
        );
    }
    if opts.verbose > 1
        && !opts.quiet
        && let Some(d) = stats.new_sha256
    {
        eprintln!("rollsync: delta: new sha256: {}", hex::encode(d));
    }

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "delta",
            "block_size": opts.sync.block_size,
            "new_size": stats.new_size,
            "delta_size": stats.delta_size,
            "matched_blocks": stats.matched_blocks,
            "literal_runs": stats.literal_runs,
            "literal_bytes": stats.literal_bytes,
            "new_sha256": hex_or_null(stats.new_sha256),
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Patch command
// ---------------------------------------------------------------------------

fn cmd_patch(opts: &Options) -> i32 {
    let Some([basis, delta, output]) = expect_paths(opts, "patch") else {
        return 1;
    };
    if let Err(msg) = check_output(output, opts.force) {
        eprintln!("rollsync: {msg}");
        return 1;
    }

    let stats = match io::patch_file(basis, delta, output, &opts.sync) {
        Ok(s) => s,
        Err(e) => return report("patch", &e),
    };

    if let Some(expected) = &opts.expect_sha256 {
        let Some(actual) = stats.output_sha256 else {
            eprintln!("rollsync: patch: --expect-sha256 needs the file-io feature");
            return 1;
        };
        if let Err(e) = io::check_sha256(expected, &actual) {
            return report("patch", &e);
        }
    }

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "rollsync: patch: records: {}, output size: {}",
            stats.records, stats.output_size
        );
    }

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "patch",
            "block_size": opts.sync.block_size,
            "records": stats.records,
            "output_size": stats.output_size,
            "output_sha256": hex_or_null(stats.output_sha256),
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    logger.format_timestamp(None).format_target(false);
    if opts.quiet {
        logger.filter_level(LevelFilter::Error);
    } else if opts.verbose > 1 {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let exit_code = match opts.command {
        Command::Signature => cmd_signature(&opts),
        Command::Delta => cmd_delta(&opts),
        Command::Patch => cmd_patch(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_opts(args: &[&str]) -> Options {
        let argv: Vec<String> = std::iter::once("rollsync".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        let cli = Cli::try_parse_from(argv).expect("cli parse failed");
        resolve_options(cli)
    }

    #[test]
    fn parse_byte_size_suffixes() {
        assert_eq!(parse_byte_size("1").unwrap(), 1);
        assert_eq!(parse_byte_size("2K").unwrap(), 2 * 1024);
        assert_eq!(parse_byte_size("3m").unwrap(), 3 * 1024 * 1024);
        assert_eq!(parse_byte_size(" 700 ").unwrap(), 700);
        assert!(parse_byte_size("").is_err());
        assert!(parse_byte_size("0").is_err());
        assert!(parse_byte_size("12x").is_err());
    }

    #[test]
    fn signature_subcommand_maps_correctly() {
        let opts = parse_opts(&["signature", "--block-size", "2K", "basis.bin", "basis.sig"]);
        assert_eq!(opts.command, Command::Signature);
        assert_eq!(opts.sync.block_size, 2048);
        assert_eq!(
            opts.paths,
            vec![PathBuf::from("basis.bin"), PathBuf::from("basis.sig")]
        );
    }

    #[test]
    fn delta_subcommand_maps_correctly() {
        let opts = parse_opts(&["--quiet", "delta", "basis.sig", "new.bin", "new.delta"]);
        assert_eq!(opts.command, Command::Delta);
        assert!(opts.quiet);
        assert_eq!(opts.sync.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(opts.paths.len(), 3);
        assert_eq!(opts.paths[2], PathBuf::from("new.delta"));
    }

    #[test]
    fn patch_expect_sha256() {
        let opts = parse_opts(&["patch", "--expect-sha256", "abcd", "b", "d", "o"]);
        assert_eq!(opts.command, Command::Patch);
        assert_eq!(opts.expect_sha256.as_deref(), Some("abcd"));
        assert_eq!(
            opts.paths,
            vec![PathBuf::from("b"), PathBuf::from("d"), PathBuf::from("o")]
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let opts = parse_opts(&["delta", "s", "n", "d", "-f", "--json", "-b", "64"]);
        assert!(opts.force);
        assert!(opts.json_output);
        assert_eq!(opts.sync.block_size, 64);
    }

    #[test]
    fn verbose_is_capped() {
        let verbose = parse_opts(&["-v", "-v", "-v", "signature", "in", "out"]);
        assert_eq!(verbose.verbose, 2);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let argv = ["rollsync", "-q", "-v", "config"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn zero_block_size_rejected() {
        let argv = ["rollsync", "--block-size", "0", "signature", "a", "b"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn missing_paths_rejected() {
        assert!(Cli::try_parse_from(["rollsync", "delta", "sig", "new"]).is_err());
    }

    #[test]
    fn config_command_maps() {
        assert_eq!(parse_opts(&["config"]).command, Command::Config);
    }

    #[test]
    fn existing_output_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out");
        assert!(check_output(&path, false).is_ok());
        std::fs::write(&path, b"x").unwrap();
        assert!(check_output(&path, false).is_err());
        assert!(check_output(&path, true).is_ok());
    }

    #[test]
    fn wrong_path_count_fails_the_command() {
        let mut opts = parse_opts(&["patch", "basis", "delta", "out"]);
        assert!(expect_paths::<3>(&opts, "patch").is_some());
        assert!(expect_paths::<2>(&opts, "signature").is_none());

        opts.paths.pop();
        assert_eq!(cmd_delta(&opts), 1);
        assert_eq!(cmd_patch(&opts), 1);
        opts.paths.clear();
        assert_eq!(cmd_signature(&opts), 1);
    }
}
