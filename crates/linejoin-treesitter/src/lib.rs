#![warn(missing_docs)]
//! `linejoin-treesitter` - Tree-sitter integration for `linejoin`.
//!
//! [`TreeSitterSyntax`] implements [`linejoin::SyntaxView`] on top of a Tree-sitter parse tree, so
//! comment lookups during a join see the real grammar instead of a lexical approximation. The tree
//! follows the buffer through its edit log and is re-parsed incrementally.

mod syntax;

pub use syntax::{TreeSitterError, TreeSitterSyntax, TreeSitterSyntaxConfig, TreeSitterUpdateMode};
