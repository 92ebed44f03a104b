use crate::error::BuildError;
use crate::string_pool::{StringOffset, StringPool};

/// A single edge-labeled, prefix-compressed node.
///
/// Invariants (enforced by [`Trie::insert`], never by construction alone):
/// children are sorted ascending by discriminator byte with unique
/// discriminators; values are sorted ascending by the lexicographic bytes
/// of the referenced key, with unique keys; no child's discriminator
/// equals the first byte of `prefix`.
#[derive(Debug)]
pub struct TrieNode {
    pub prefix: StringOffset,
    pub children: Vec<(u8, Box<TrieNode>)>,
    pub values: Vec<(StringOffset, StringOffset)>,
}

impl TrieNode {
    fn new(prefix: StringOffset) -> Self {
        TrieNode {
            prefix,
            children: Vec::new(),
            values: Vec::new(),
        }
    }

    fn find_child_mut(&mut self, c: u8) -> Option<&mut TrieNode> {
        match self.children.binary_search_by_key(&c, |(disc, _)| *disc) {
            Ok(idx) => Some(&mut self.children[idx].1),
            Err(_) => None,
        }
    }

    fn add_child(&mut self, c: u8, child: TrieNode) {
        let idx = self
            .children
            .binary_search_by_key(&c, |(disc, _)| *disc)
            .expect_err("discriminator must be unique per node");
        self.children.insert(idx, (c, Box::new(child)));
    }

    /// Interns `key`/`value` and records them on this node, overwriting
    /// any existing entry for the same key. Returns `true` if a new entry
    /// was added (as opposed to an overwrite), for counter bookkeeping.
    fn add_value(&mut self, pool: &mut StringPool, key: &[u8], value: &[u8]) -> bool {
        let key_off = pool.add(key);
        let value_off = pool.add(value);

        match self
            .values
            .binary_search_by(|(k, _)| pool.get(*k).to_bytes().cmp(key))
        {
            Ok(idx) => {
                self.values[idx].1 = value_off;
                false
            }
            Err(idx) => {
                self.values.insert(idx, (key_off, value_off));
                true
            }
        }
    }
}

/// In-memory Patricia trie over byte patterns, with a sorted key/value
/// property set attached to each pattern's terminal node.
///
/// Owns its [`StringPool`] exclusively; all prefixes, keys and values
/// referenced by any node live in that one pool.
pub struct Trie {
    root: TrieNode,
    pool: StringPool,
    nodes_count: u64,
    children_count: u64,
    values_count: u64,
}

impl Trie {
    pub fn new() -> Self {
        let mut pool = StringPool::new();
        let root = TrieNode::new(pool.add(b""));
        Trie {
            root,
            pool,
            nodes_count: 1,
            children_count: 0,
            values_count: 0,
        }
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    pub fn pool(&self) -> &StringPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut StringPool {
        &mut self.pool
    }

    pub fn nodes_count(&self) -> u64 {
        self.nodes_count
    }

    pub fn children_count(&self) -> u64 {
        self.children_count
    }

    pub fn values_count(&self) -> u64 {
        self.values_count
    }

    /// Locates or creates the node whose path from the root spells exactly
    /// `pattern`, then records `key -> value` there, overwriting any
    /// value previously stored for `key` at that node.
    pub fn insert(&mut self, pattern: &[u8], key: &[u8], value: &[u8]) -> Result<(), BuildError> {
        if self.pool.is_frozen() {
            return Err(BuildError::Memory);
        }
        Self::insert_at(&mut self.root, &mut self.pool, pattern, 0, key, value, &mut self.nodes_count, &mut self.children_count, &mut self.values_count);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_at(
        node: &mut TrieNode,
        pool: &mut StringPool,
        pattern: &[u8],
        i: usize,
        key: &[u8],
        value: &[u8],
        nodes_count: &mut u64,
        children_count: &mut u64,
        values_count: &mut u64,
    ) {
        let prefix_bytes = pool.get(node.prefix).to_bytes().to_vec();

        let mut p = 0;
        while p < prefix_bytes.len() {
            let c = prefix_bytes[p];
            if c == byte_at(pattern, i + p) {
                p += 1;
                continue;
            }
            break;
        }

        let i = if p == prefix_bytes.len() {
            i + p
        } else {
            // Mismatch at position p: split this node. The tail of the
            // old prefix (skipping the discriminator byte at p) and all
            // existing children/values move to a new child node.
            let discriminator = prefix_bytes[p];
            let tail = &prefix_bytes[p + 1..];
            let tail_off = pool.add(tail);

            let mut new_child = TrieNode::new(tail_off);
            new_child.children = std::mem::take(&mut node.children);
            new_child.values = std::mem::take(&mut node.values);

            let head_off = pool.add(&prefix_bytes[..p]);
            node.prefix = head_off;
            node.add_child(discriminator, new_child);
            *nodes_count += 1;
            *children_count += 1;

            i + p
        };

        if i == pattern.len() {
            if node.add_value(pool, key, value) {
                *values_count += 1;
            }
            return;
        }

        let c = byte_at(pattern, i);
        if let Some(child) = node.find_child_mut(c) {
            Self::insert_at(child, pool, pattern, i + 1, key, value, nodes_count, children_count, values_count);
            return;
        }

        let remainder = &pattern[i + 1..];
        let leaf_off = pool.add(remainder);
        let mut leaf = TrieNode::new(leaf_off);
        if leaf.add_value(pool, key, value) {
            *values_count += 1;
        }
        node.add_child(c, leaf);
        *nodes_count += 1;
        *children_count += 1;
    }
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte at `idx` in `pattern`, treating the position one past the end as
/// the pattern's implicit NUL terminator.
fn byte_at(pattern: &[u8], idx: usize) -> u8 {
    pattern.get(idx).copied().unwrap_or(0)
}
