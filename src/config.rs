//! Configuration surface: CLI flags (via `clap`), environment-variable
//! fallbacks, and the validated `ReducerConfig` the rest of the pipeline
//! actually runs against. Parsing and validation are kept separate so that
//! `ReducerConfig::from_cli` can be exercised in tests without touching
//! `std::env::args`.

use crate::error::ReduceError;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Maximum number of namespaces the reducer will track per owner.
pub const MAX_NAMESPACES: usize = 6;
/// Maximum byte length of a single namespace name.
pub const MAX_NAMESPACE_LEN: usize = 15;
/// Minimum accounted size of an object, regardless of its logical length.
pub const MIN_SIZE: u64 = 131_072;
/// Length in bytes of a UUID string as used in manifest keys.
pub const UUID_STR_LEN: usize = 36;
/// Byte offset at which the namespace component of a key begins:
/// a leading '/', the 36-byte uuid, and the separating '/'.
pub const NAMESPACE_OFFSET: usize = UUID_STR_LEN + 2;

const DEFAULT_NAMESPACES: &str = "stor public jobs reports";
const DEFAULT_SCRATCH_DIR: &str = "/var/tmp";
const DEFAULT_WORKERS: usize = 16;
const DEFAULT_ARENA_MB: usize = 128;

/// Parallel map-reduce aggregator for a storage-service manifest stream.
#[derive(Parser, Debug)]
#[command(name = "storage-reduce", version, about, long_about = None)]
pub struct CliArgs {
    /// Number of worker aggregator threads; must be a power of two.
    #[arg(short = 't', long = "workers", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Space-separated list of namespaces to track (at most 6).
    #[arg(short = 'n', long = "namespaces", env = "NAMESPACES", default_value = DEFAULT_NAMESPACES)]
    pub namespaces: String,

    /// Scratch directory for per-worker arena-backed mapped files.
    #[arg(short = 'd', long = "scratch-dir", default_value = DEFAULT_SCRATCH_DIR)]
    pub scratch_dir: PathBuf,

    /// Per-worker arena size, in megabytes.
    #[arg(short = 'm', long = "arena-mb", default_value_t = DEFAULT_ARENA_MB)]
    pub arena_mb: usize,

    /// Suppress the standard-error progress indicator.
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

/// Validated, immutable configuration the driver runs against.
#[derive(Clone, Debug)]
pub struct ReducerConfig {
    pub worker_count: usize,
    pub namespaces: Vec<String>,
    pub scratch_dir: PathBuf,
    pub arena_bytes: usize,
    pub progress: bool,
}

impl ReducerConfig {
    pub fn from_cli(args: CliArgs) -> Result<Self, ReduceError> {
        let worker_count = args.workers;
        if worker_count == 0 || !worker_count.is_power_of_two() {
            return Err(ReduceError::Configuration(format!(
                "worker count must be a power of two >= 1, got {worker_count}"
            )));
        }

        let namespaces = parse_namespace_list(&args.namespaces)?;

        if !args.scratch_dir.is_dir() {
            return Err(ReduceError::Configuration(format!(
                "scratch directory `{}` does not exist or is not a directory",
                args.scratch_dir.display()
            )));
        }

        if args.arena_mb == 0 {
            return Err(ReduceError::Configuration(
                "per-worker arena size must be positive".to_string(),
            ));
        }
        let arena_bytes = args
            .arena_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| ReduceError::Configuration("arena size overflows usize".to_string()))?;

        Ok(Self {
            worker_count,
            namespaces,
            scratch_dir: args.scratch_dir,
            arena_bytes,
            progress: !args.quiet,
        })
    }

    /// Index of `ns` in the configured namespace list, in configuration order.
    pub fn namespace_index(&self, ns: &str) -> Option<usize> {
        self.namespaces.iter().position(|n| n == ns)
    }

    /// Path to the scratch file for worker `idx`.
    pub fn scratch_path(&self, idx: usize) -> PathBuf {
        scratch_path_for(&self.scratch_dir, idx)
    }
}

pub fn scratch_path_for(dir: &Path, idx: usize) -> PathBuf {
    dir.join(format!("reducer_thread_{idx}"))
}

fn parse_namespace_list(raw: &str) -> Result<Vec<String>, ReduceError> {
    let namespaces: Vec<String> = raw
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();

    if namespaces.is_empty() {
        return Err(ReduceError::Configuration(
            "namespace list must contain at least one entry".to_string(),
        ));
    }
    if namespaces.len() > MAX_NAMESPACES {
        return Err(ReduceError::Configuration(format!(
            "namespace list has {} entries, at most {MAX_NAMESPACES} allowed",
            namespaces.len()
        )));
    }
    for ns in &namespaces {
        if ns.len() > MAX_NAMESPACE_LEN {
            return Err(ReduceError::Configuration(format!(
                "namespace `{ns}` exceeds {MAX_NAMESPACE_LEN} bytes"
            )));
        }
    }

    let mut dedup = namespaces.clone();
    dedup.sort_unstable();
    dedup.dedup();
    if dedup.len() != namespaces.len() {
        return Err(ReduceError::Configuration(
            "namespace list contains duplicates".to_string(),
        ));
    }

    Ok(namespaces)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(workers: usize, namespaces: &str, arena_mb: usize) -> CliArgs {
        CliArgs {
            workers,
            namespaces: namespaces.to_string(),
            scratch_dir: std::env::temp_dir(),
            arena_mb,
            quiet: true,
        }
    }

    #[test]
    fn rejects_non_power_of_two_workers() {
        let err = ReducerConfig::from_cli(args(3, "public", 8)).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn rejects_too_many_namespaces() {
        let err = ReducerConfig::from_cli(args(4, "a b c d e f g", 8)).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn rejects_overlong_namespace() {
        let err = ReducerConfig::from_cli(args(4, "this-namespace-is-too-long", 8)).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn rejects_zero_arena() {
        let err = ReducerConfig::from_cli(args(4, "public", 0)).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn accepts_defaults() {
        let cfg = ReducerConfig::from_cli(args(16, DEFAULT_NAMESPACES, DEFAULT_ARENA_MB)).unwrap();
        assert_eq!(cfg.worker_count, 16);
        assert_eq!(cfg.namespaces, vec!["stor", "public", "jobs", "reports"]);
        assert_eq!(cfg.namespace_index("jobs"), Some(2));
        assert_eq!(cfg.namespace_index("nope"), None);
    }
}
