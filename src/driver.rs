//! Pipeline orchestration: wires the buffer pool, worker threads, the
//! reader, the tournament merger, and the report writer into one run.
//! Generic over `Read`/`Write` so the whole pipeline can be exercised against
//! in-memory buffers in tests, not just real stdio.

use crate::arena::Arena;
use crate::buffer_pool::{BufferPool, Slot};
use crate::config::ReducerConfig;
use crate::error::{fatal, ReduceError};
use crate::merge::tournament_merge;
use crate::output::write_report;
use crate::worker::run_worker;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, Write};

/// Run the full aggregation pipeline: spawn workers, stream `input` line by
/// line into the buffer pool, join workers, merge their results, and write
/// the report to `output`. Returns the merged owner count for the caller's
/// summary log line.
pub fn run<R: BufRead, W: Write>(input: R, output: W, config: &ReducerConfig) -> Result<usize, ReduceError> {
    let pool = BufferPool::new(config.worker_count);
    let progress = config.progress.then(|| new_progress_bar());

    let merged = std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(config.worker_count);
        for idx in 0..config.worker_count {
            let arena = spawn_arena(config, idx)?;
            let pool = &pool;
            let handle = scope
                .spawn(move || run_worker(idx, arena, pool, config));
            handles.push(handle);
        }

        feed_lines(input, &pool, config.worker_count, progress.as_ref())?;

        let worker_states: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| fatal(ReduceError::ThreadCreate(std::io::Error::other("worker thread panicked")))))
            .collect();

        tournament_merge(worker_states)
    })?;

    if let Some(bar) = &progress {
        bar.finish_with_message("merged");
    }

    let owner_count = merged.len();
    write_report(output, &merged, config).map_err(|source| ReduceError::ScratchSetup {
        path: config.scratch_dir.clone(),
        source,
    })?;

    tracing::info!(owners = owner_count, workers = config.worker_count, "reduce complete");
    Ok(owner_count)
}

fn spawn_arena(config: &ReducerConfig, idx: usize) -> Result<&'static mut Arena, ReduceError> {
    let path = config.scratch_path(idx);
    Arena::create(&path, config.arena_bytes, idx)
}

/// Read `input` line by line, handing each to the buffer pool, then push one
/// sentinel per worker so every worker thread can observe end-of-stream. An
/// empty line is treated as an early end-of-stream marker, matching the
/// reference tool's manifest-stream convention.
fn feed_lines<R: BufRead>(
    mut input: R,
    pool: &BufferPool,
    worker_count: usize,
    progress: Option<&ProgressBar>,
) -> Result<(), ReduceError> {
    let mut seen = 0u64;
    loop {
        let mut buf = pool.get_free();
        let n = input.read_line(&mut buf).map_err(|source| ReduceError::ScratchSetup {
            path: std::path::PathBuf::from("<stdin>"),
            source,
        })?;

        if n == 0 {
            pool.put_free(buf);
            break;
        }

        let trimmed_len = buf.trim_end_matches(['\n', '\r']).len();
        buf.truncate(trimmed_len);

        if buf.is_empty() {
            pool.put_free(buf);
            break;
        }

        seen += 1;
        if let Some(bar) = progress {
            bar.inc(1);
        }
        pool.put_active(Slot::Line(buf));
    }

    tracing::debug!(lines = seen, "input exhausted");
    for _ in 0..worker_count {
        pool.put_active(Slot::Sentinel);
    }
    Ok(())
}

fn new_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg} {pos} lines  elapsed: {elapsed_precise}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.set_message("reducing");
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliArgs;
    use std::io::Cursor;

    fn config(dir: &std::path::Path, workers: usize) -> ReducerConfig {
        ReducerConfig::from_cli(CliArgs {
            workers,
            namespaces: "public stor".to_string(),
            scratch_dir: dir.to_path_buf(),
            arena_mb: 8,
            quiet: true,
        })
        .unwrap()
    }

    #[test]
    fn end_to_end_single_worker() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 1);
        let input = Cursor::new(
            "{\"key\":\"/639e843a-6519-479e-b8d8-147ebf8f5c1a/public/x\",\"type\":\"directory\",\"owner\":\"u1\"}\n\
             {\"key\":\"/639e843a-6519-479e-b8d8-147ebf8f5c1a/public/x/a\",\"type\":\"object\",\"owner\":\"u1\",\"objectId\":\"o1\",\"sharks\":[1,2],\"contentLength\":100000}\n",
        );
        let mut out = Vec::new();

        let count = run(input, &mut out, &config).unwrap();
        assert_eq!(count, 1);

        let report = String::from_utf8(out).unwrap();
        assert!(report.contains(r#""owner":"u1""#));
        assert!(report.contains(r#""bytes":"262144""#));
    }

    #[test]
    fn end_to_end_four_workers_agree_with_one() {
        let dir1 = tempfile::tempdir().unwrap();
        let dir4 = tempfile::tempdir().unwrap();
        let mut lines = String::new();
        for i in 0..40 {
            lines.push_str(&format!(
                "{{\"key\":\"/639e843a-6519-479e-b8d8-147ebf8f5c1a/public/x/a{i}\",\"type\":\"object\",\"owner\":\"u{}\",\"objectId\":\"o{i}\",\"sharks\":[1],\"contentLength\":1}}\n",
                i % 3
            ));
        }

        let out1 = {
            let config = config(dir1.path(), 1);
            let mut out = Vec::new();
            run(Cursor::new(lines.clone()), &mut out, &config).unwrap();
            out
        };
        let out4 = {
            let config = config(dir4.path(), 4);
            let mut out = Vec::new();
            run(Cursor::new(lines.clone()), &mut out, &config).unwrap();
            out
        };

        let mut lines1: Vec<&str> = std::str::from_utf8(&out1).unwrap().lines().collect();
        let mut lines4: Vec<&str> = std::str::from_utf8(&out4).unwrap().lines().collect();
        lines1.sort_unstable();
        lines4.sort_unstable();
        assert_eq!(lines1, lines4);
    }

    #[test]
    fn empty_line_ends_stream_early() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 1);
        let input = Cursor::new(
            "\n{\"key\":\"/639e843a-6519-479e-b8d8-147ebf8f5c1a/public/x\",\"type\":\"directory\",\"owner\":\"u1\"}\n",
        );
        let mut out = Vec::new();
        let count = run(input, &mut out, &config).unwrap();
        assert_eq!(count, 0);
    }
}
