use linejoin::{CommentKind, CommentNode, EditRecord, SyntaxView, TextBuffer};
use ropey::Rope;
use streaming_iterator::StreamingIterator;
use thiserror::Error;
use tree_sitter::{InputEdit, Node, Parser, Point, Query, QueryCursor, Tree};

/// Errors produced by [`TreeSitterSyntax`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeSitterError {
    /// Setting the Tree-sitter language failed.
    #[error("tree-sitter language error: {0}")]
    Language(String),
    /// Compiling the comment query failed (usually an unknown node kind).
    #[error("tree-sitter query error: {0}")]
    Query(String),
    /// An edit from the buffer log did not match the mirrored text.
    #[error("tree-sitter edit mismatch at character {0}")]
    EditMismatch(usize),
}

/// How the view updated its parse tree on the last resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeSitterUpdateMode {
    /// First parse for this view.
    Initial,
    /// Updated by replaying the buffer's edit log and re-parsing incrementally.
    Incremental,
    /// Fell back to parsing the full text from scratch.
    FullReparse,
    /// Nothing to do: the view already matched the buffer version.
    Skipped,
}

/// Configuration for [`TreeSitterSyntax`].
#[derive(Debug, Clone)]
pub struct TreeSitterSyntaxConfig {
    /// Tree-sitter language.
    pub language: tree_sitter::Language,
    /// Node kinds reported as line comments.
    pub line_comment_kinds: Vec<String>,
    /// Node kinds reported as block comments.
    pub block_comment_kinds: Vec<String>,
    /// Child node kinds marking a line comment as documentation.
    pub doc_marker_kinds: Vec<String>,
}

impl TreeSitterSyntaxConfig {
    /// Create a config for `language`.
    ///
    /// The default node kinds follow the Rust grammar: `line_comment`, `block_comment` and the
    /// doc comment markers.
    pub fn new(language: tree_sitter::Language) -> Self {
        Self {
            language,
            line_comment_kinds: vec!["line_comment".to_string()],
            block_comment_kinds: vec!["block_comment".to_string()],
            doc_marker_kinds: vec![
                "doc_comment".to_string(),
                "outer_doc_comment_marker".to_string(),
                "inner_doc_comment_marker".to_string(),
            ],
        }
    }

    /// Set the line comment node kinds.
    pub fn with_line_comment_kinds<const N: usize>(mut self, kinds: [&str; N]) -> Self {
        self.line_comment_kinds = kinds.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Set the block comment node kinds.
    pub fn with_block_comment_kinds<const N: usize>(mut self, kinds: [&str; N]) -> Self {
        self.block_comment_kinds = kinds.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Set the documentation marker node kinds.
    pub fn with_doc_marker_kinds<const N: usize>(mut self, kinds: [&str; N]) -> Self {
        self.doc_marker_kinds = kinds.iter().map(|k| k.to_string()).collect();
        self
    }

    fn comments_query(&self) -> String {
        self.line_comment_kinds
            .iter()
            .chain(&self.block_comment_kinds)
            .map(|kind| format!("({kind}) @comment\n"))
            .collect()
    }
}

/// A [`SyntaxView`] backed by an incrementally updated Tree-sitter tree.
///
/// The view mirrors the buffer text it last parsed. On resync it replays the buffer's edit log on
/// the mirror and the old tree, then re-parses; if the log does not fit the mirror it parses the
/// full text again.
pub struct TreeSitterSyntax {
    config: TreeSitterSyntaxConfig,
    parser: Parser,
    comments_query: Query,
    tree: Option<Tree>,
    mirror: Rope,
    synced_version: Option<u64>,
    last_update_mode: TreeSitterUpdateMode,
}

impl TreeSitterSyntax {
    /// Create a view from the given config. Call [`SyntaxView::resync`] before use.
    pub fn new(config: TreeSitterSyntaxConfig) -> Result<Self, TreeSitterError> {
        let mut parser = Parser::new();
        parser
            .set_language(&config.language)
            .map_err(|e| TreeSitterError::Language(e.to_string()))?;
        let comments_query = Query::new(&config.language, &config.comments_query())
            .map_err(|e| TreeSitterError::Query(e.to_string()))?;

        Ok(Self {
            config,
            parser,
            comments_query,
            tree: None,
            mirror: Rope::new(),
            synced_version: None,
            last_update_mode: TreeSitterUpdateMode::FullReparse,
        })
    }

    /// Create a view already synchronized with `buffer`.
    pub fn for_buffer(
        config: TreeSitterSyntaxConfig,
        buffer: &TextBuffer,
    ) -> Result<Self, TreeSitterError> {
        let mut syntax = Self::new(config)?;
        syntax.resync(buffer);
        Ok(syntax)
    }

    /// Get the last update mode (useful for tests and instrumentation).
    pub fn last_update_mode(&self) -> TreeSitterUpdateMode {
        self.last_update_mode
    }

    /// Current parse tree.
    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// All comments in the tree, in buffer order.
    pub fn comments(&self, buffer: &TextBuffer) -> Vec<CommentNode> {
        let Some(tree) = self.tree.as_ref() else {
            return Vec::new();
        };
        let text = buffer.text();
        let mut cursor = QueryCursor::new();
        let mut out = Vec::new();

        let mut matches = cursor.matches(&self.comments_query, tree.root_node(), text.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if let Some(kind) = self.classify(capture.node) {
                    out.push(self.comment_node(buffer, capture.node, kind));
                }
            }
        }

        out.sort_by_key(|c| (c.range.start, c.range.end));
        out.dedup();
        out
    }

    fn classify(&self, node: Node<'_>) -> Option<CommentKind> {
        let kind = node.kind();
        if self.config.block_comment_kinds.iter().any(|k| k == kind) {
            return Some(CommentKind::Block);
        }
        if !self.config.line_comment_kinds.iter().any(|k| k == kind) {
            return None;
        }

        let mut cursor = node.walk();
        let is_doc = node
            .children(&mut cursor)
            .any(|child| self.config.doc_marker_kinds.iter().any(|k| k == child.kind()));
        Some(if is_doc {
            CommentKind::Doc
        } else {
            CommentKind::Line
        })
    }

    /// Character range of `node`, without a trailing line break.
    fn comment_node(&self, buffer: &TextBuffer, node: Node<'_>, kind: CommentKind) -> CommentNode {
        let start = buffer.byte_to_char(node.start_byte());
        let mut end = buffer.byte_to_char(node.end_byte());
        while end > start && matches!(buffer.char_at(end - 1), Some('\n' | '\r')) {
            end -= 1;
        }
        CommentNode {
            range: start..end,
            kind,
        }
    }

    fn full_sync(&mut self, buffer: &TextBuffer) {
        self.mirror = Rope::from_str(&buffer.text());
        self.tree = None;
    }

    fn apply_edits(&mut self, edits: &[EditRecord]) -> Result<(), TreeSitterError> {
        let Some(tree) = self.tree.as_mut() else {
            return Err(TreeSitterError::EditMismatch(0));
        };

        for edit in edits {
            let end = edit.end();
            let matches = self
                .mirror
                .get_slice(edit.start..end)
                .is_some_and(|old| old == edit.deleted_text.as_str());
            if !matches {
                return Err(TreeSitterError::EditMismatch(edit.start));
            }

            let start_byte = self.mirror.char_to_byte(edit.start);
            let start_position = point_at(&self.mirror, edit.start);
            tree.edit(&InputEdit {
                start_byte,
                old_end_byte: start_byte + edit.deleted_text.len(),
                new_end_byte: start_byte + edit.inserted_text.len(),
                start_position,
                old_end_position: advance_point(start_position, &edit.deleted_text),
                new_end_position: advance_point(start_position, &edit.inserted_text),
            });

            self.mirror.remove(edit.start..end);
            self.mirror.insert(edit.start, &edit.inserted_text);
        }
        Ok(())
    }
}

impl SyntaxView for TreeSitterSyntax {
    fn comment_at(&self, buffer: &TextBuffer, offset: usize) -> Option<CommentNode> {
        let tree = self.tree.as_ref()?;
        let start = buffer.char_to_byte(offset);
        let end = start + buffer.char_at(offset)?.len_utf8();

        let mut node = tree.root_node().descendant_for_byte_range(start, end)?;
        loop {
            if let Some(kind) = self.classify(node) {
                let comment = self.comment_node(buffer, node, kind);
                return comment.range.contains(&offset).then_some(comment);
            }
            node = node.parent()?;
        }
    }

    fn resync(&mut self, buffer: &TextBuffer) {
        let version = buffer.version();
        if self.synced_version == Some(version) {
            self.last_update_mode = TreeSitterUpdateMode::Skipped;
            return;
        }

        let edits = self.synced_version.and_then(|v| buffer.edits_since(v));
        let update_mode = match edits {
            _ if self.tree.is_none() => {
                self.full_sync(buffer);
                TreeSitterUpdateMode::Initial
            }
            Some(edits) => match self.apply_edits(edits) {
                Ok(()) if self.mirror.len_chars() == buffer.len_chars() => {
                    TreeSitterUpdateMode::Incremental
                }
                Ok(()) => {
                    tracing::debug!("mirrored text length diverged, reparsing");
                    self.full_sync(buffer);
                    TreeSitterUpdateMode::FullReparse
                }
                Err(err) => {
                    tracing::debug!(%err, "edit log does not apply, reparsing");
                    self.full_sync(buffer);
                    TreeSitterUpdateMode::FullReparse
                }
            },
            None => {
                self.full_sync(buffer);
                TreeSitterUpdateMode::FullReparse
            }
        };

        let text = self.mirror.to_string();
        let tree = self.parser.parse(&text, self.tree.as_ref());
        if tree.is_none() {
            tracing::warn!(version, "tree-sitter parse failed");
        }
        self.tree = tree;
        self.synced_version = Some(version);
        self.last_update_mode = update_mode;
        tracing::trace!(version, mode = ?update_mode, "tree-sitter syntax resynced");
    }
}

fn point_at(rope: &Rope, char_offset: usize) -> Point {
    let row = rope.char_to_line(char_offset);
    let column = rope.char_to_byte(char_offset) - rope.line_to_byte(row);
    Point { row, column }
}

fn advance_point(mut point: Point, text: &str) -> Point {
    let mut parts = text.split('\n');
    let Some(first) = parts.next() else {
        return point;
    };

    point.column = point.column.saturating_add(first.len());
    for part in parts {
        point.row = point.row.saturating_add(1);
        point.column = part.len();
    }

    point
}
