//! Output formatting: one minified JSON line per (owner, namespace) pair,
//! in configuration order, written through a single buffered writer flushed
//! once at the end.

use crate::config::ReducerConfig;
use crate::owner::FinalOwner;
use std::io::{self, Write};

/// Write the final merged owners as NDJSON to `out`, one line per owner per
/// configured namespace, in configuration order, whether or not that
/// namespace has any activity for the owner. `bytes` is emitted as a quoted
/// decimal string to survive round-tripping through JSON parsers that
/// coerce large integers to floats; the other counters are bare integers.
pub fn write_report<W: Write>(out: W, owners: &[FinalOwner], config: &ReducerConfig) -> io::Result<()> {
    let mut writer = io::BufWriter::new(out);

    for owner in owners {
        for (nsid, ns) in config.namespaces.iter().enumerate() {
            let dirs = owner.dirs[nsid];
            let objs = owner.objs[nsid];
            let keys = owner.keys[nsid];
            let bytes = owner.bytes[nsid];

            writeln!(
                writer,
                r#"{{"owner":"{owner}","namespace":"{ns}","directories":{dirs},"keys":{keys},"objects":{objs},"bytes":"{bytes}"}}"#,
                owner = owner.uuid,
            )?;
        }
    }

    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CliArgs, MAX_NAMESPACES};

    fn config(namespaces: &str) -> ReducerConfig {
        ReducerConfig::from_cli(CliArgs {
            workers: 1,
            namespaces: namespaces.to_string(),
            scratch_dir: std::env::temp_dir(),
            arena_mb: 8,
            quiet: true,
        })
        .unwrap()
    }

    #[test]
    fn emits_one_line_per_configured_namespace_in_order() {
        let config = config("public stor");
        let mut dirs = [0u64; MAX_NAMESPACES];
        let mut objs = [0u64; MAX_NAMESPACES];
        let mut keys = [0u64; MAX_NAMESPACES];
        let mut bytes = [0u64; MAX_NAMESPACES];
        dirs[0] = 1;
        objs[1] = 2;
        keys[1] = 3;
        bytes[1] = 9_999_999_999;

        let owner = FinalOwner { uuid: "u1", objects: Vec::new(), dirs, objs, keys, bytes };

        let mut buf = Vec::new();
        write_report(&mut buf, &[owner], &config).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""namespace":"public""#));
        assert!(lines[0].contains(r#""directories":1"#));
        assert!(lines[1].contains(r#""namespace":"stor""#));
        assert!(lines[1].contains(r#""bytes":"9999999999""#));
    }

    #[test]
    fn inactive_namespaces_still_emit_a_zeroed_line() {
        let config = config("public stor");
        let owner = FinalOwner {
            uuid: "u1",
            objects: Vec::new(),
            dirs: [0; MAX_NAMESPACES],
            objs: [0; MAX_NAMESPACES],
            keys: [0; MAX_NAMESPACES],
            bytes: [0; MAX_NAMESPACES],
        };

        let mut buf = Vec::new();
        write_report(&mut buf, &[owner], &config).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""namespace":"public""#));
        assert!(lines[0].contains(r#""directories":0"#));
        assert!(lines[0].contains(r#""bytes":"0""#));
        assert!(lines[1].contains(r#""namespace":"stor""#));
    }
}
