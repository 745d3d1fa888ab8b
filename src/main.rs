use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{ArgAction, Parser};
use decomment::{Config, run_with_config};
use decomment::remove::Policy;

/// decomment - remove comments.
///
/// Recursively rewrite source files in place with their comments removed.
/// By default it:
///
///   - respects .gitignore / .ignore / git exclude files
///   - skips common infra directories (node_modules, dist, build, etc.)
///   - targets JavaScript/TypeScript-family files (js, jsx, ts, tsx)
///   - allows adding extra exclude globs
///   - only touches files that actually change
#[derive(Parser, Debug)]
#[command(
    name = "decomment",
    author,
    version,
    about = "Remove comments from source files in place, respecting .gitignore",
    long_about = r#"Recursively rewrite source files in place with their comments removed.

By default it:
  • respects .gitignore / .ignore / git exclude files
  • skips common infra directories (node_modules, dist, build, etc.)
  • targets JavaScript/TypeScript-family files (js, jsx, ts, tsx)
  • allows adding extra exclude globs
  • only touches files that actually change

Whole-line comments take their line with them, trailing comments leave the
code on their line intact, and runs of blank lines are capped at one.

Typical usage:
  decomment
  decomment src tests
  decomment -n --json
"#
)]
struct Args {
    /// Paths to scan (files or directories). Defaults to current directory.
    ///
    /// A path that is a regular file is rewritten directly, skipping the
    /// extension filter:
    ///   decomment src/app.ts
    #[arg(value_name = "PATH", default_value = ".")]
    paths: Vec<PathBuf>,

    /// File extensions / types to include (e.g. ts, tsx).
    ///
    /// Can be repeated or comma-separated:
    ///   decomment -t ts
    ///   decomment -t ts,tsx
    ///   decomment -t js -t jsx
    #[arg(
        short = 't',
        long = "type",
        alias = "ext",
        value_name = "EXT",
        action = ArgAction::Append,
        value_delimiter = ',',
        default_value = "js,jsx,ts,tsx"
    )]
    exts: Vec<String>,

    /// Follow symbolic links during traversal.
    #[arg(long = "follow-symlinks")]
    follow_symlinks: bool,

    /// Disable reading .gitignore / .ignore / git exclude files.
    ///
    /// By default, decomment honours:
    ///   - .gitignore files in the tree
    ///   - .ignore files
    ///   - global Git exclude config
    #[arg(long = "no-gitignore")]
    no_gitignore: bool,

    /// Disable the built-in excludes for infra directories.
    ///
    /// By default, directories like node_modules, dist, build, coverage and
    /// vendor are never rewritten, even when they are not gitignored.
    #[arg(long = "no-default-excludes")]
    no_default_excludes: bool,

    /// Additional glob patterns to exclude (files or directories).
    ///
    /// Patterns are evaluated relative to each PATH root and use glob-style
    /// matching (via globset), e.g.:
    ///
    ///   decomment --exclude 'vendor/**'
    ///   decomment --exclude 'dist/**,*.gen.ts'
    ///
    /// Multiple flags and comma-separated values are both allowed.
    #[arg(
        long = "exclude",
        short = 'E',
        value_name = "GLOB",
        action = ArgAction::Append,
        value_delimiter = ','
    )]
    excludes: Vec<String>,

    /// Maximum file size to rewrite, in bytes (skip larger files).
    ///
    /// Useful when a tree contains big generated artifacts.
    #[arg(long = "max-bytes", value_name = "N")]
    max_bytes: Option<u64>,

    /// Report what would change without writing anything.
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,

    /// Use the minimal cleanup policy.
    ///
    /// Whole-line comments still take their line, but lines left behind by
    /// multi-line block comments are only capped by the blank-run pass, not
    /// removed. The default policy classifies every line's code/comment
    /// occupancy first and drops comment-only lines entirely.
    #[arg(long = "simple-trim")]
    simple_trim: bool,

    /// Output a JSON array of changed files: { "path": "...", "removed": N }.
    #[arg(long = "json")]
    json: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    // Normalise extensions to lowercase, no leading dot.
    let mut ext_set = HashSet::new();
    for e in &args.exts {
        let norm = e.trim().trim_start_matches('.').to_ascii_lowercase();
        if !norm.is_empty() {
            ext_set.insert(norm);
        }
    }

    if ext_set.is_empty() {
        bail!("No valid extensions provided (after normalisation).");
    }

    let policy = if args.simple_trim {
        Policy::SimpleTrim
    } else {
        Policy::LineContext
    };

    let cfg = Config {
        exts: ext_set,
        paths: args.paths,
        follow_symlinks: args.follow_symlinks,

        no_gitignore: args.no_gitignore,
        no_default_excludes: args.no_default_excludes,
        json: args.json,
        excludes: args.excludes,
        max_bytes: args.max_bytes,
        dry_run: args.dry_run,
        policy,
    };

    run_with_config(cfg)
}
