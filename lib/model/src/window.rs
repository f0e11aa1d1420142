use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The number of triples returned per page if the caller does not ask for a different amount.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// How many hops are followed from the object of a matched triple.
///
/// A depth of 1 only returns the triples of the resource itself. Every additional level follows
/// the objects of the previous level once more.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Depth(u8);

impl Depth {
    pub const MIN: Depth = Depth(1);
    pub const MAX: Depth = Depth(5);

    pub fn new(depth: u8) -> Result<Self, ConfigError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&depth) {
            Ok(Self(depth))
        } else {
            Err(ConfigError::DepthOutOfRange(depth))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Depth {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u8> for Depth {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Depth> for u8 {
    fn from(value: Depth) -> Self {
        value.0
    }
}

impl Display for Depth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A window over the merged result: skip `offset` triples and return at most `limit` triples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PagingWindow {
    pub limit: usize,
    pub offset: usize,
}

impl PagingWindow {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// The offset one past the last triple covered by this window.
    pub fn end(self) -> usize {
        self.offset.saturating_add(self.limit)
    }
}

impl Default for PagingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, 0)
    }
}
