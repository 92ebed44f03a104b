//! Compiles hwdb-style text records (glob match patterns plus key/value
//! property lines) into a compact, offset-addressed binary index for
//! fast longest-prefix lookup by an external query engine.
//!
//! The public surface is [`build`]: point it at a set of input files and
//! an output path, and it drives the [`parser`], [`trie::Trie`] and
//! [`string_pool::StringPool`] to produce the on-disk format described in
//! [`serializer`].

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub mod config;
pub mod error;
pub mod parser;
pub mod serializer;
pub mod stats;
pub mod string_pool;
pub mod trie;

pub use config::{BuildConfig, MatchPolicy};
pub use error::BuildError;
pub use stats::{OnDisk, SizeStatistics};
pub use string_pool::{StringOffset, StringPool};
pub use trie::{Trie, TrieNode};

/// Builds a binary index from `input_files` and writes it atomically to
/// `output_path`.
///
/// Per-file I/O errors are logged and the file is skipped rather than
/// aborting the whole build; a failure writing or renaming the output is
/// always fatal and is returned as [`BuildError::Io`].
pub fn build(
    input_files: &[impl AsRef<Path>],
    output_path: impl AsRef<Path>,
    config: &BuildConfig,
) -> Result<SizeStatistics, BuildError> {
    let output_path = output_path.as_ref();
    let mut trie = Trie::new();

    for input_file in input_files {
        let input_file = input_file.as_ref();
        log::debug!("reading file '{}'", input_file.display());
        match File::open(input_file) {
            Ok(file) => {
                if let Err(e) =
                    parser::parse_records(BufReader::new(file), &mut trie, config.match_policy)
                {
                    log::warn!("failed to read hwdb input '{}': {e}", input_file.display());
                }
            }
            Err(e) => {
                log::warn!("failed to open hwdb input '{}': {e}", input_file.display());
            }
        }
    }

    trie.pool_mut().freeze();

    let mut stats = SizeStatistics {
        nodes_count: trie.nodes_count(),
        children_count: trie.children_count(),
        values_count: trie.values_count(),
        strings_incoming_count: trie.pool().incoming_count(),
        strings_incoming_bytes: trie.pool().incoming_bytes(),
        strings_dedup_count: trie.pool().dedup_count(),
        strings_dedup_bytes: trie.pool().dedup_bytes(),
        file_size: 0,
    };
    log::debug!("{stats}");

    let file_size = serializer::write_trie(&trie, output_path, config.tool_version)?;
    stats.file_size = file_size;

    log::debug!("{}", stats::OnDisk(&stats));
    Ok(stats)
}
