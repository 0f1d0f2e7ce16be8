use crate::models::tag::TagsDocument;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use uuid::Uuid;

/// Kind of declaration that follows a documentation comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclarationKind {
    Class,
    Interface,
    Enum,
    Record,
    Method,
    Field,
    Constructor,
    Annotation,
    /// Nothing recognizable; such blocks are never rewritten
    None,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeclarationKind::Class => "class",
            DeclarationKind::Interface => "interface",
            DeclarationKind::Enum => "enum",
            DeclarationKind::Record => "record",
            DeclarationKind::Method => "method",
            DeclarationKind::Field => "field",
            DeclarationKind::Constructor => "constructor",
            DeclarationKind::Annotation => "annotation",
            DeclarationKind::None => "none",
        };
        f.write_str(name)
    }
}

/// One declaration unit: its documentation comment, annotations and header.
///
/// Built by [`BlockParser`](crate::services::BlockParser) from a contiguous
/// slice of a source file. The replacement engine attaches the rewritten
/// comment with [`attach_javadoc`](Self::attach_javadoc); nothing else
/// mutates a block.
#[derive(Debug, Clone)]
pub struct DeclarationBlock {
    /// Traceability only; never compared
    pub id: Uuid,
    pub original_block_text: String,
    pub declaration_kind: DeclarationKind,
    pub element_name: String,
    pub annotations: Vec<String>,
    pub javadoc_model: TagsDocument,

    /// Byte range of the `/** ... */` comment inside `original_block_text`
    pub comment_span: Option<Range<usize>>,

    /// Whitespace in front of the comment opener on its line
    pub indent: String,

    /// Line terminator used by the surrounding source
    pub newline: String,

    /// The header ran past the classification window without a terminator
    pub header_truncated: bool,

    rewritten_javadoc: Option<String>,
}

/// `"\r\n"` when `text` uses CRLF line endings, `"\n"` otherwise
pub fn detect_newline(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

impl DeclarationBlock {
    pub fn new(original_block_text: String) -> Self {
        let newline = detect_newline(&original_block_text);
        Self {
            id: Uuid::new_v4(),
            original_block_text,
            declaration_kind: DeclarationKind::None,
            element_name: String::new(),
            annotations: Vec::new(),
            javadoc_model: TagsDocument::empty(),
            comment_span: None,
            indent: String::new(),
            newline: newline.to_string(),
            header_truncated: false,
            rewritten_javadoc: None,
        }
    }

    pub fn has_comment(&self) -> bool {
        self.comment_span.is_some()
    }

    /// The original comment text, empty when the block has none
    pub fn comment_text(&self) -> &str {
        self.comment_span
            .as_ref()
            .map(|span| &self.original_block_text[span.clone()])
            .unwrap_or_default()
    }

    /// Whether the engine may rewrite this block at all
    pub fn is_rewritable(&self) -> bool {
        self.declaration_kind != DeclarationKind::None && self.has_comment()
    }

    pub fn attach_javadoc(&mut self, javadoc: String) {
        self.rewritten_javadoc = Some(javadoc);
    }

    pub fn rewritten_javadoc(&self) -> Option<&str> {
        self.rewritten_javadoc.as_deref()
    }

    /// Block text with the rewritten comment spliced in place of the
    /// original one. Returns the original text when nothing was attached.
    pub fn rewritten_block_text(&self) -> String {
        match (&self.comment_span, &self.rewritten_javadoc) {
            (Some(span), Some(javadoc)) => {
                let mut text = String::with_capacity(self.original_block_text.len() + javadoc.len());
                text.push_str(&self.original_block_text[..span.start]);
                text.push_str(javadoc);
                text.push_str(&self.original_block_text[span.end..]);
                text
            }
            _ => self.original_block_text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_block_defaults() {
        let block = DeclarationBlock::new("int x;\n".to_string());
        assert_eq!(block.declaration_kind, DeclarationKind::None);
        assert!(block.annotations.is_empty());
        assert!(block.element_name.is_empty());
        assert!(!block.is_rewritable());
        assert_eq!(block.newline, "\n");
    }

    #[test]
    fn test_splice_rewritten_comment() {
        let text = "\n  /** old */\n  int x;".to_string();
        let mut block = DeclarationBlock::new(text);
        block.comment_span = Some(3..13);
        assert_eq!(block.comment_text(), "/** old */");

        block.attach_javadoc("/** new */".to_string());
        assert_eq!(block.rewritten_block_text(), "\n  /** new */\n  int x;");
    }

    #[test]
    fn test_crlf_detected() {
        let block = DeclarationBlock::new("/** a */\r\nint x;\r\n".to_string());
        assert_eq!(block.newline, "\r\n");
    }
}
