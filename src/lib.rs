use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};

pub mod remove;
pub mod scan;

use crate::remove::{Policy, remove_comments};
use crate::scan::scan_comments;

/// Infra directories that are never worth rewriting. Applied on top of the
/// user's excludes unless explicitly disabled.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/bower_components/**",
    "**/dist/**",
    "**/build/**",
    "**/coverage/**",
    "**/.next/**",
    "**/out/**",
    "**/vendor/**",
];

/// Configuration passed from the CLI layer (main.rs) into the core logic.
#[derive(Debug)]
pub struct Config {
    pub exts: HashSet<String>,
    pub paths: Vec<PathBuf>,
    pub follow_symlinks: bool,
    pub no_gitignore: bool,
    pub no_default_excludes: bool,
    pub json: bool,
    pub excludes: Vec<String>,
    pub max_bytes: Option<u64>,
    pub dry_run: bool,
    pub policy: Policy,
}

/// One changed file, for the summary / `--json` report.
#[derive(Debug, serde::Serialize)]
pub struct FileReport {
    pub path: String,
    pub removed: usize,
}

pub fn run_with_config(cfg: Config) -> Result<()> {
    let mut patterns: Vec<String> = Vec::new();
    if !cfg.no_default_excludes {
        patterns.extend(DEFAULT_EXCLUDES.iter().map(|p| p.to_string()));
    }
    patterns.extend(cfg.excludes.iter().cloned());

    let exclude_globset = build_exclude_globset(&patterns)?;

    let mut had_error = false;
    let mut changed: Vec<FileReport> = Vec::new();

    for raw_root in &cfg.paths {
        // Canonicalise roots so running from arbitrary working dirs is reliable.
        let canon_root = match raw_root.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Skipping root {:?}: {}", raw_root, e);
                had_error = true;
                continue;
            }
        };

        // A file root is a single-document run: the extension filter is
        // bypassed and any failure is fatal, leaving the file unmodified.
        if canon_root.is_file() {
            let display_path = make_display_path(&canon_root, &canon_root);
            if let Some(report) = rewrite_file(&canon_root, &display_path, &cfg)? {
                changed.push(report);
            }
            continue;
        }

        let mut builder = WalkBuilder::new(&canon_root);
        builder.follow_links(cfg.follow_symlinks);

        // Helps avoid edge cases where process CWD is invalid and global ignores need a base.
        builder.current_dir(canon_root.clone());

        if cfg.no_gitignore {
            builder
                .git_ignore(false)
                .git_exclude(false)
                .git_global(false)
                .ignore(false);
        } else {
            builder
                .git_ignore(true)
                .git_exclude(true)
                .git_global(true)
                .ignore(true)
                .require_git(false);
        }

        // Values moved into the 'static filter closure must be owned separately.
        let root_for_filter = canon_root.clone();
        let exclude_globset = exclude_globset.clone();

        builder.filter_entry(move |entry: &DirEntry| {
            // Always keep the root.
            if entry.depth() == 0 {
                return true;
            }

            // Apply user exclude globs, relative to the current root.
            if let Some(ref gs) = exclude_globset {
                let path = entry.path();
                let rel = path.strip_prefix(&root_for_filter).unwrap_or(path);
                let rel_norm = normalize_for_matching(rel);

                if gs.is_match(&rel_norm) {
                    return false;
                }

                // If this is a directory, also try a trailing slash to make patterns
                // like `tests/**` able to prune the whole subtree early.
                if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false)
                    && !rel_norm.ends_with('/')
                {
                    let rel_dir = format!("{rel_norm}/");
                    if gs.is_match(&rel_dir) {
                        return false;
                    }
                }
            }

            true
        });

        let walker = builder.build();

        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    eprintln!("Walk error: {err}");
                    had_error = true;
                    continue;
                }
            };

            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }

            let path = entry.path();
            if !matches_ext(path, &cfg.exts) {
                continue;
            }

            let display_path = make_display_path(&canon_root, path);

            if let Some(limit) = cfg.max_bytes
                && let Ok(meta) = fs::metadata(path)
                && meta.len() > limit
            {
                eprintln!(
                    "Skipping {} (size {} bytes > max {} bytes)",
                    display_path,
                    meta.len(),
                    limit
                );
                continue;
            }

            // A file that cannot be read, scanned or rewritten is skipped;
            // the rest of the batch still runs.
            match rewrite_file(path, &display_path, &cfg) {
                Ok(Some(report)) => changed.push(report),
                Ok(None) => {}
                Err(err) => {
                    eprintln!("Skipping {}: {:#}", display_path, err);
                    had_error = true;
                }
            }
        }
    }

    if cfg.json {
        println!("{}", serde_json::to_string_pretty(&changed)?);
    } else if cfg.dry_run {
        println!("Would remove comments from {} files", changed.len());
    } else {
        println!("Removed comments from {} files", changed.len());
    }

    if had_error {
        anyhow::bail!("One or more files could not be processed. See stderr for details.");
    }

    Ok(())
}

/// Remove comments from one file, rewriting it in place when anything
/// changed. Returns `Ok(None)` when the file is already comment-free.
pub fn rewrite_file(path: &Path, display_path: &str, cfg: &Config) -> Result<Option<FileReport>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", display_path))?;

    // A lossy decode would corrupt the file on write-back, so require UTF-8.
    let text = String::from_utf8(bytes)
        .map_err(|_| anyhow!("{} is not valid UTF-8", display_path))?;

    let comments =
        scan_comments(&text).with_context(|| format!("Failed to scan {}", display_path))?;
    if comments.is_empty() {
        return Ok(None);
    }

    let result = remove_comments(&text, &comments, cfg.policy)
        .with_context(|| format!("Failed to rewrite {}", display_path))?;
    if result == text {
        return Ok(None);
    }

    if !cfg.dry_run {
        fs::write(path, &result).with_context(|| format!("Failed to write {}", display_path))?;
    }

    Ok(Some(FileReport {
        path: display_path.to_string(),
        removed: comments.len(),
    }))
}

/// Build a GlobSet from the combined default and `--exclude` patterns.
/// Returns `Ok(None)` if there are no patterns.
fn build_exclude_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();

    for pat in patterns {
        let pat = pat.trim();
        if pat.is_empty() {
            continue;
        }

        let glob =
            Glob::new(pat).with_context(|| format!("Invalid --exclude glob pattern: {pat}"))?;
        builder.add(glob);
    }

    let set = builder
        .build()
        .context("Failed to build exclude glob set")?;

    Ok(Some(set))
}

/// Case-insensitive extension match, using the provided extension set.
pub fn matches_ext(path: &Path, exts: &HashSet<String>) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => exts.contains(&ext.to_ascii_lowercase()),
        None => false,
    }
}

/// Produce a display path relative to `root` (stable regardless of current working directory).
pub fn make_display_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);

    // If root is a file and path == root, rel is empty.
    if rel.as_os_str().is_empty() {
        return path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
    }

    normalize_for_matching(rel)
}

/// Convert paths to a stable, slash-separated form for matching/printing.
fn normalize_for_matching(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::Path;

    #[test]
    fn matches_ext_is_case_insensitive_and_requires_extension() {
        let mut exts = HashSet::new();
        exts.insert("ts".to_string());

        assert!(matches_ext(Path::new("foo.TS"), &exts));
        assert!(matches_ext(Path::new("dir/bar.ts"), &exts));
        assert!(!matches_ext(Path::new("README"), &exts));
        assert!(!matches_ext(Path::new("script.rs"), &exts));
    }

    #[test]
    fn scan_and_remove_compose_over_typescript_source() {
        let src = "// header\nconst url = \"http://x\"; // keep the string\n/*\n * doc\n */\nconst n = 1;\n";
        let comments = scan_comments(src).unwrap();
        let out = remove_comments(src, &comments, Policy::LineContext).unwrap();
        assert_eq!(out, "const url = \"http://x\"; \nconst n = 1;\n");
    }
}
