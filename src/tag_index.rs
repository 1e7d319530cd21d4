//! Prefix tree mapping `(port, protocol)` pairs to tags.
//!
//! Ports are keyed one decimal digit per level, starting from the least
//! significant digit. Ports of different lengths therefore diverge without
//! padding every port out to five digits: `3`, `13` and `30` all end on
//! distinct nodes. The node reached after the last digit holds one child per
//! protocol name, and that child (the combination node) carries the tag and
//! the match counters for the pair.
//!
//! Insertion happens on a [`TagIndexBuilder`]. Calling
//! [`TagIndexBuilder::build`] freezes the structure into a [`TagIndex`], which
//! only advances counters, so a partially built index can never be queried.

use std::{collections::BTreeMap, fmt};

use indexmap::IndexMap;

/// A `(port, protocol)` pair as seen in the lookup table or the flow log.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Combination {
    /// Destination port.
    pub port: u16,
    /// Case-normalized protocol name.
    pub protocol: String,
}

impl Combination {
    /// Creates a new combination.
    pub fn new(port: u16, protocol: impl Into<String>) -> Self {
        Self {
            port,
            protocol: protocol.into(),
        }
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.port, self.protocol)
    }
}

/// Decimal digits of `port`, least significant first. `0` yields a single `0`.
fn port_digits(port: u16) -> impl Iterator<Item = u8> {
    let mut remaining = Some(port);
    std::iter::from_fn(move || {
        let value = remaining?;
        remaining = (value >= 10).then_some(value / 10);
        Some((value % 10) as u8)
    })
}

#[derive(Debug, Default)]
struct DigitNode {
    digits: BTreeMap<u8, DigitNode>,
    protocols: BTreeMap<String, CombinationNode>,
}

#[derive(Debug, Default)]
struct CombinationNode {
    tag: Option<String>,
    tag_matches: usize,
    end_of_combination: bool,
    matches: usize,
}

impl CombinationNode {
    fn tag(&self) -> Option<&str> {
        self.end_of_combination
            .then_some(self.tag.as_deref())
            .flatten()
    }
}

impl DigitNode {
    fn find(&self, port: u16) -> Option<&DigitNode> {
        port_digits(port).try_fold(self, |node, digit| node.digits.get(&digit))
    }

    fn find_mut(&mut self, port: u16) -> Option<&mut DigitNode> {
        port_digits(port).try_fold(self, |node, digit| node.digits.get_mut(&digit))
    }

    fn find_or_insert(&mut self, port: u16) -> &mut DigitNode {
        port_digits(port).fold(self, |node, digit| node.digits.entry(digit).or_default())
    }

    fn combination(&self, port: u16, protocol: &str) -> Option<&CombinationNode> {
        self.find(port)
            .and_then(|node| node.protocols.get(protocol))
    }

    /// Depth-first walk calling `visit` for every combination node.
    ///
    /// `port` accumulates the digits seen so far and `place` is the decimal
    /// place of the next digit down the tree.
    fn walk<'a, F>(&'a self, port: u32, place: u32, visit: &mut F)
    where
        F: FnMut(u16, &'a str, &'a CombinationNode),
    {
        for (protocol, combination) in &self.protocols {
            // Every digit path was built from a `u16`.
            visit(port as u16, protocol, combination);
        }
        for (digit, child) in &self.digits {
            child.walk(port + u32::from(*digit) * place, place * 10, visit);
        }
    }
}

/// Insert-only half of the index, populated from the lookup table.
#[derive(Debug, Default)]
pub struct TagIndexBuilder {
    root: DigitNode,
    len: usize,
}

impl TagIndexBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `tag` for the `(port, protocol)` pair.
    ///
    /// The first tag recorded for a pair is kept. Later tags for the same pair
    /// are ignored.
    pub fn insert(&mut self, port: u16, protocol: &str, tag: &str) {
        let node = self.root.find_or_insert(port);
        let combination = node.protocols.entry(protocol.to_owned()).or_default();

        if !combination.end_of_combination {
            self.len += 1;
        }
        if combination.tag.is_none() {
            combination.tag = Some(tag.to_owned());
            combination.tag_matches = 0;
        }
        combination.end_of_combination = true;
    }

    /// Returns the tag recorded for `(port, protocol)`, if any.
    pub fn tag_for(&self, port: u16, protocol: &str) -> Option<&str> {
        self.root
            .combination(port, protocol)
            .and_then(CombinationNode::tag)
    }

    /// Number of distinct `(port, protocol)` pairs inserted.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing has been inserted.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Freezes the tree so it can be queried.
    pub fn build(self) -> TagIndex {
        TagIndex {
            root: self.root,
            len: self.len,
            untagged: Untagged::default(),
        }
    }
}

#[derive(Debug, Default)]
struct Untagged {
    count: usize,
    combinations: IndexMap<Combination, usize>,
}

impl Untagged {
    fn record(&mut self, port: u16, protocol: &str) {
        self.count += 1;
        *self
            .combinations
            .entry(Combination::new(port, protocol))
            .or_default() += 1;
    }
}

/// A fully built index. Queries only advance counters; the tree itself no
/// longer changes.
#[derive(Debug, Default)]
pub struct TagIndex {
    root: DigitNode,
    len: usize,
    untagged: Untagged,
}

impl TagIndex {
    /// Counts one flow record for `(port, protocol)`.
    ///
    /// A pair with a combination node bumps that node's counters. Anything
    /// else goes to the untagged bucket.
    pub fn search_and_count(&mut self, port: u16, protocol: &str) {
        let combination = self
            .root
            .find_mut(port)
            .and_then(|node| node.protocols.get_mut(protocol));

        match combination {
            Some(combination) => {
                combination.matches += 1;
                if combination.end_of_combination {
                    combination.tag_matches += 1;
                } else {
                    self.untagged.record(port, protocol);
                }
            }
            None => self.untagged.record(port, protocol),
        }
    }

    /// Returns the tag recorded for `(port, protocol)`, if any.
    pub fn tag_for(&self, port: u16, protocol: &str) -> Option<&str> {
        self.root
            .combination(port, protocol)
            .and_then(CombinationNode::tag)
    }

    /// Matches per tag, ordered by tag name. Tags without matches are omitted.
    pub fn tag_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        self.root.walk(0, 1, &mut |_, _, combination| {
            if let Some(tag) = &combination.tag
                && combination.tag_matches > 0
            {
                *counts.entry(tag.clone()).or_default() += combination.tag_matches;
            }
        });
        counts
    }

    /// Matches per combination node, ordered by port and then protocol.
    /// Combinations without matches are omitted.
    pub fn combination_counts(&self) -> BTreeMap<Combination, usize> {
        let mut counts = BTreeMap::new();
        self.root.walk(0, 1, &mut |port, protocol, combination| {
            if combination.matches > 0 {
                counts.insert(Combination::new(port, protocol), combination.matches);
            }
        });
        counts
    }

    /// Misses per `(port, protocol)` pair, in the order they were first seen.
    pub fn untagged_combinations(&self) -> &IndexMap<Combination, usize> {
        &self.untagged.combinations
    }

    /// Total number of records that matched no tag.
    pub fn untagged_count(&self) -> usize {
        self.untagged.count
    }

    /// Number of distinct `(port, protocol)` pairs in the index.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the index holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
