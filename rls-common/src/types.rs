//! Common types used throughout the toolkit
//!
//! Identifiers for IR entities and the small enums shared by the IR crate
//! and the generation engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Temporary value identifier for IR
pub type TempId = u32;

/// Basic block identifier, unique within one function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Visibility of a symbol inside a library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

/// Which symbol tables a lookup consults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    PublicOnly,
    IncludePrivate,
}

impl Lookup {
    pub fn includes(&self, visibility: Visibility) -> bool {
        match self {
            Lookup::PublicOnly => visibility == Visibility::Public,
            Lookup::IncludePrivate => true,
        }
    }
}

/// Signedness of an integer operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Signedness {
    #[default]
    Signed,
    Unsigned,
}

impl Signedness {
    pub fn is_signed(&self) -> bool {
        matches!(self, Signedness::Signed)
    }
}

/// Temporary value generator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempGenerator {
    next_id: TempId,
}

impl TempGenerator {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Start numbering after the given count (function parameters take the first ids)
    pub fn starting_at(next_id: TempId) -> Self {
        Self { next_id }
    }

    /// Generate a new temporary id
    pub fn new_temp(&mut self) -> TempId {
        let temp = self.next_id;
        self.next_id += 1;
        temp
    }

    /// Number of temporaries handed out so far
    pub fn count(&self) -> TempId {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_generator() {
        let mut gen = TempGenerator::starting_at(2);

        assert_eq!(gen.new_temp(), 2);
        assert_eq!(gen.new_temp(), 3);
        assert_eq!(gen.count(), 4);
    }

    #[test]
    fn test_lookup_visibility() {
        assert!(Lookup::PublicOnly.includes(Visibility::Public));
        assert!(!Lookup::PublicOnly.includes(Visibility::Private));
        assert!(Lookup::IncludePrivate.includes(Visibility::Private));
    }

    #[test]
    fn test_block_id_display() {
        assert_eq!(BlockId(3).to_string(), "bb3");
    }
}
