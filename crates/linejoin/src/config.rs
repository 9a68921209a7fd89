/// Configuration for [`JoinLines`](crate::JoinLines).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinConfig {
    /// Phases touching more than this many boundaries run inside one bulk-edit scope.
    pub bulk_threshold: usize,
    /// Spaces inserted at a boundary when the formatter has no opinion.
    pub default_spacing: usize,
    /// Whether trailing line comments are rewritten as block comments before joining.
    pub convert_end_comments: bool,
}

impl JoinConfig {
    /// Set the bulk-edit threshold.
    pub fn with_bulk_threshold(mut self, threshold: usize) -> Self {
        self.bulk_threshold = threshold;
        self
    }

    /// Set the default spacing.
    pub fn with_default_spacing(mut self, spaces: usize) -> Self {
        self.default_spacing = spaces;
        self
    }

    /// Enable or disable the end-of-line comment conversion.
    pub fn with_end_comment_conversion(mut self, enabled: bool) -> Self {
        self.convert_end_comments = enabled;
        self
    }
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            bulk_threshold: 100,
            default_spacing: 1,
            convert_end_comments: true,
        }
    }
}
