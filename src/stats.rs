//------------ Types for Statistics -----------------------------------------

use std::fmt;

/// Size and dedup statistics for a completed build.
///
/// Not part of the on-disk contract; a structured sink for diagnostics,
/// in the same vein as `udevadm-hwdb.c`'s final `log_debug` summary block.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeStatistics {
    pub nodes_count: u64,
    pub children_count: u64,
    pub values_count: u64,
    pub strings_incoming_count: u64,
    pub strings_incoming_bytes: u64,
    pub strings_dedup_count: u64,
    pub strings_dedup_bytes: u64,
    pub file_size: u64,
}

impl SizeStatistics {
    /// Bytes saved by string-pool deduplication, or 0 if dedup made no
    /// difference (e.g. an empty build).
    pub fn dedup_savings_bytes(&self) -> u64 {
        self.strings_incoming_bytes
            .saturating_sub(self.strings_dedup_bytes)
    }
}

impl SizeStatistics {
    fn write_block(&self, f: &mut fmt::Formatter, header: &str) -> fmt::Result {
        writeln!(f, "{header}")?;
        writeln!(f, "nodes:             {:8}", self.nodes_count)?;
        writeln!(f, "children arrays:   {:8}", self.children_count)?;
        writeln!(f, "values arrays:     {:8}", self.values_count)?;
        writeln!(f, "strings:           {:8} bytes", self.strings_dedup_bytes)?;
        writeln!(
            f,
            "strings incoming:  {:8} bytes ({} strings)",
            self.strings_incoming_bytes, self.strings_incoming_count
        )?;
        writeln!(
            f,
            "strings dedup'ed:  {:8} bytes saved ({} strings)",
            self.dedup_savings_bytes(),
            self.strings_incoming_count - self.strings_dedup_count
        )?;
        write!(f, "file size:         {:8} bytes", self.file_size)
    }
}

/// Renders the pre-write snapshot of `stats`: counts and string-pool dedup
/// savings as they stand before the trie has been serialized.
impl fmt::Display for SizeStatistics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_block(f, "=== trie in-memory ===")
    }
}

/// Renders the post-write snapshot of the same `stats` value, once
/// `file_size` has been filled in by the serializer.
pub struct OnDisk<'a>(pub &'a SizeStatistics);

impl fmt::Display for OnDisk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.write_block(f, "=== trie on-disk ===")
    }
}
