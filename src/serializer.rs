use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use zerocopy::{Immutable, IntoBytes, KnownLayout, LittleEndian, Unaligned, U64};

use crate::error::BuildError;
use crate::trie::{Trie, TrieNode};

const SIGNATURE: &[u8; 8] = b"HWDBCOMP";

/// Fixed-size file header, backfilled once the rest of the layout is known.
///
/// All multi-byte integers are stored little-endian via `zerocopy`'s
/// byte-order wrapper types.
#[derive(KnownLayout, Immutable, Unaligned, IntoBytes)]
#[repr(C, packed)]
struct HeaderRecord {
    signature: [u8; 8],
    tool_version: U64<LittleEndian>,
    file_size: U64<LittleEndian>,
    header_size: U64<LittleEndian>,
    node_size: U64<LittleEndian>,
    child_entry_size: U64<LittleEndian>,
    value_entry_size: U64<LittleEndian>,
    nodes_len: U64<LittleEndian>,
    strings_len: U64<LittleEndian>,
    nodes_root_off: U64<LittleEndian>,
}

/// Fixed part of an on-disk node record.
///
/// 7 bytes of zero padding sit between `children_count` and
/// `values_count` to align the latter to an 8-byte boundary (see
/// DESIGN.md). `node_size` in [`HeaderRecord`] is
/// `std::mem::size_of::<NodeRecord>()`.
#[derive(KnownLayout, Immutable, Unaligned, IntoBytes)]
#[repr(C, packed)]
struct NodeRecord {
    prefix_off: U64<LittleEndian>,
    children_count: u8,
    _padding: [u8; 7],
    values_count: U64<LittleEndian>,
}

#[derive(KnownLayout, Immutable, Unaligned, IntoBytes)]
#[repr(C, packed)]
struct ChildEntry {
    c: u8,
    _padding: [u8; 7],
    child_off: U64<LittleEndian>,
}

#[derive(KnownLayout, Immutable, Unaligned, IntoBytes)]
#[repr(C, packed)]
struct ValueEntry {
    key_off: U64<LittleEndian>,
    value_off: U64<LittleEndian>,
}

const HEADER_SIZE: u64 = std::mem::size_of::<HeaderRecord>() as u64;
const NODE_SIZE: u64 = std::mem::size_of::<NodeRecord>() as u64;
const CHILD_ENTRY_SIZE: u64 = std::mem::size_of::<ChildEntry>() as u64;
const VALUE_ENTRY_SIZE: u64 = std::mem::size_of::<ValueEntry>() as u64;

/// Writes `trie` to `output_path` atomically: the file is built up in a
/// temporary file adjacent to `output_path`, then renamed into place. On
/// any failure the temporary is removed and the error surfaced.
pub fn write_trie(trie: &Trie, output_path: &Path, tool_version: u64) -> Result<u64, BuildError> {
    let parent = output_path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".hwdb-compile-")
        .tempfile_in(parent)
        .map_err(|e| BuildError::io(parent, e))?;

    let result = write_trie_to(trie, tmp.as_file_mut(), tool_version);
    let file_size = match result {
        Ok(size) => size,
        Err(e) => {
            // NamedTempFile's Drop removes the file automatically.
            return Err(e);
        }
    };

    set_readonly(tmp.path()).map_err(|e| BuildError::io(output_path, e))?;

    tmp.persist(output_path)
        .map_err(|e| BuildError::io(output_path, e.error))?;

    Ok(file_size)
}

fn write_trie_to<W: Write + Seek>(
    trie: &Trie,
    writer: &mut W,
    tool_version: u64,
) -> Result<u64, BuildError> {
    let nodes_len = node_subtree_size(trie.root());
    let strings_base = HEADER_SIZE + nodes_len;

    writer.seek(SeekFrom::Start(HEADER_SIZE))?;
    let root_off = write_node(trie.root(), trie.pool(), strings_base, writer)?;

    let pos_after_nodes = writer.stream_position()?;
    debug_assert_eq!(pos_after_nodes, strings_base);

    writer.write_all(trie.pool().bytes())?;
    let strings_len = trie.pool().bytes().len() as u64;

    let file_size = strings_base + strings_len;

    let header = HeaderRecord {
        signature: *SIGNATURE,
        tool_version: U64::new(tool_version),
        file_size: U64::new(file_size),
        header_size: U64::new(HEADER_SIZE),
        node_size: U64::new(NODE_SIZE),
        child_entry_size: U64::new(CHILD_ENTRY_SIZE),
        value_entry_size: U64::new(VALUE_ENTRY_SIZE),
        nodes_len: U64::new(nodes_len),
        strings_len: U64::new(strings_len),
        nodes_root_off: U64::new(root_off),
    };
    writer.seek(SeekFrom::Start(0))?;
    writer.write_all(header.as_bytes())?;

    log::debug!(
        "=== trie on-disk ===\nsize: {file_size} bytes\nheader: {HEADER_SIZE} bytes\nnodes: {nodes_len} bytes\nstrings: {strings_len} bytes\nstrings start: {strings_base}",
    );

    Ok(file_size)
}

fn node_subtree_size(node: &TrieNode) -> u64 {
    let own = NODE_SIZE
        + node.children.len() as u64 * CHILD_ENTRY_SIZE
        + node.values.len() as u64 * VALUE_ENTRY_SIZE;
    node.children
        .iter()
        .fold(own, |acc, (_, child)| acc + node_subtree_size(child))
}

/// Writes `node`'s full subtree post-order (children before the node that
/// references them) and returns the node's own file offset.
fn write_node<W: Write + Seek>(
    node: &TrieNode,
    pool: &crate::string_pool::StringPool,
    strings_base: u64,
    writer: &mut W,
) -> io::Result<u64> {
    let mut child_offsets = Vec::with_capacity(node.children.len());
    for (c, child) in &node.children {
        let off = write_node(child, pool, strings_base, writer)?;
        child_offsets.push((*c, off));
    }

    let node_off = writer.stream_position()?;
    let record = NodeRecord {
        prefix_off: U64::new(strings_base + node.prefix),
        children_count: node.children.len() as u8,
        _padding: [0; 7],
        values_count: U64::new(node.values.len() as u64),
    };
    writer.write_all(record.as_bytes())?;

    for (c, child_off) in child_offsets {
        let entry = ChildEntry {
            c,
            _padding: [0; 7],
            child_off: U64::new(child_off),
        };
        writer.write_all(entry.as_bytes())?;
    }

    for (key_off, value_off) in &node.values {
        let entry = ValueEntry {
            key_off: U64::new(strings_base + key_off),
            value_off: U64::new(strings_base + value_off),
        };
        writer.write_all(entry.as_bytes())?;
    }

    Ok(node_off)
}

#[cfg(unix)]
fn set_readonly(path: &Path) -> io::Result<()> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, Permissions::from_mode(0o444))
}

#[cfg(not(unix))]
fn set_readonly(path: &Path) -> io::Result<()> {
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_readonly(true);
    std::fs::set_permissions(path, perms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sizes_match_documented_layout() {
        assert_eq!(HEADER_SIZE, 80);
        assert_eq!(NODE_SIZE, 24);
        assert_eq!(CHILD_ENTRY_SIZE, 16);
        assert_eq!(VALUE_ENTRY_SIZE, 16);
    }

    #[test]
    fn empty_trie_produces_minimal_valid_layout() {
        let trie = Trie::new();
        let mut buf = io::Cursor::new(Vec::new());
        let file_size = write_trie_to(&trie, &mut buf, 1).unwrap();

        assert_eq!(file_size, HEADER_SIZE + NODE_SIZE + 1 /* sentinel byte */);

        let bytes = buf.into_inner();
        assert_eq!(&bytes[0..8], SIGNATURE);
    }
}
