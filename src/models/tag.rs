use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// `@name value description` on a single content line.
static TAG_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@([A-Za-z][\w.\-]*)(?:[ \t]+(\S+))?(?:[ \t]+(.*))?$").expect("Invalid tag regex")
});

/// Block tag kinds understood by the engine.
///
/// Anything else found in a comment is kept as [`TagName::Custom`] so that
/// unmodified comments round-trip losslessly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TagName {
    Author,
    Deprecated,
    Exception,
    Param,
    Return,
    See,
    Serial,
    SerialData,
    SerialField,
    Since,
    Throws,
    Version,
    ApiNote,
    ImplSpec,
    ImplNote,
    Hidden,
    Custom(String),
}

impl TagName {
    /// Name without the leading `@`
    pub fn as_str(&self) -> &str {
        match self {
            TagName::Author => "author",
            TagName::Deprecated => "deprecated",
            TagName::Exception => "exception",
            TagName::Param => "param",
            TagName::Return => "return",
            TagName::See => "see",
            TagName::Serial => "serial",
            TagName::SerialData => "serialData",
            TagName::SerialField => "serialField",
            TagName::Since => "since",
            TagName::Throws => "throws",
            TagName::Version => "version",
            TagName::ApiNote => "apiNote",
            TagName::ImplSpec => "implSpec",
            TagName::ImplNote => "implNote",
            TagName::Hidden => "hidden",
            TagName::Custom(name) => name,
        }
    }

    /// Whether rules may target this tag kind
    pub fn is_known(&self) -> bool {
        !matches!(self, TagName::Custom(_))
    }
}

impl FromStr for TagName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('@');
        Ok(match name {
            "author" => TagName::Author,
            "deprecated" => TagName::Deprecated,
            "exception" => TagName::Exception,
            "param" => TagName::Param,
            "return" => TagName::Return,
            "see" => TagName::See,
            "serial" => TagName::Serial,
            "serialData" => TagName::SerialData,
            "serialField" => TagName::SerialField,
            "since" => TagName::Since,
            "throws" => TagName::Throws,
            "version" => TagName::Version,
            "apiNote" => TagName::ApiNote,
            "implSpec" => TagName::ImplSpec,
            "implNote" => TagName::ImplNote,
            "hidden" => TagName::Hidden,
            other => TagName::Custom(other.to_string()),
        })
    }
}

impl From<String> for TagName {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(name) => name,
            Err(never) => match never {},
        }
    }
}

impl From<TagName> for String {
    fn from(value: TagName) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.as_str())
    }
}

/// One block tag parsed out of a documentation comment.
///
/// `target_string` is the verbatim slice of the comment the tag was read from
/// (head line through its last continuation line). `lines` holds the same
/// content with the leading asterisk markers removed and is what gets written
/// back when the tag is carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub target_string: String,
    pub tag_name: TagName,
    pub tag_value: String,
    pub description: String,
    lines: Vec<String>,
}

impl Tag {
    /// Build a fresh single-line tag
    pub fn new(tag_name: TagName, tag_value: &str, description: &str) -> Self {
        let head = Self::head_line_for(&tag_name, tag_value, description);
        let lines = head.split('\n').map(str::to_string).collect();
        Self {
            target_string: head,
            tag_name,
            tag_value: tag_value.trim().to_string(),
            description: description.trim().to_string(),
            lines,
        }
    }

    /// Text a rule writes for this tag: `@name value description`.
    pub fn head_line_for(tag_name: &TagName, tag_value: &str, description: &str) -> String {
        let mut head = tag_name.to_string();
        let value = tag_value.trim();
        let description = description.trim();
        if !value.is_empty() {
            head.push(' ');
            head.push_str(value);
        }
        if !description.is_empty() {
            head.push(' ');
            head.push_str(description);
        }
        head
    }

    /// Copy of this tag with its head line rewritten to carry `tag_value` and
    /// `description`. Continuation lines are kept as they are.
    pub fn with_head(&self, tag_value: &str, description: &str) -> Self {
        let mut tag = Self::new(self.tag_name.clone(), tag_value, description);
        for line in self.lines.iter().skip(1) {
            tag.lines.push(line.clone());
            if !line.is_empty() {
                if !tag.description.is_empty() {
                    tag.description.push('\n');
                }
                tag.description.push_str(line.trim());
            }
        }
        tag.target_string = tag.lines.join("\n");
        tag
    }

    /// The first content line as written. It may carry leading whitespace
    /// when the comment puts extra space after the asterisk.
    pub fn head_line(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or_default()
    }

    /// Content lines (asterisk markers stripped) in comment order
    pub fn content_lines(&self) -> &[String] {
        &self.lines
    }

    /// True when the head line already reads exactly as a rule would write it.
    pub fn is_conformant(&self, tag_value: &str, description: &str) -> bool {
        self.head_line().trim_start() == Self::head_line_for(&self.tag_name, tag_value, description)
    }
}

/// One logical line of a parsed comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocEntry {
    /// Free text outside any tag (the main description)
    Text(String),
    /// An asterisk-only separator line
    Blank,
    /// Index into [`TagsDocument::tags`]
    Tag(usize),
}

/// A documentation comment split into its description lines and tags.
#[derive(Debug, Clone, Default)]
pub struct TagsDocument {
    source_text: String,
    tags: Vec<Tag>,
    entries: Vec<DocEntry>,
    well_formed: bool,
}

struct ContentLine {
    start: usize,
    end: usize,
}

impl TagsDocument {
    /// Parse a raw `/** ... */` comment.
    ///
    /// Malformed input (no opener or no terminator) yields a document with no
    /// tags and [`is_well_formed`](Self::is_well_formed) returning false.
    pub fn parse(source_text: &str) -> Self {
        let mut document = Self {
            source_text: source_text.to_string(),
            ..Self::default()
        };

        let Some(open) = source_text.find("/**") else {
            return document;
        };
        let body_start = open + 3;
        let Some(close) = source_text.rfind("*/") else {
            return document;
        };
        if close < body_start || !source_text[..open].trim().is_empty() {
            return document;
        }
        if !source_text[close + 2..].trim().is_empty() {
            return document;
        }

        document.well_formed = true;
        let lines = Self::content_lines_of(source_text, body_start, close);

        // (tag index, byte offset of its `@`) for the tag currently collecting lines
        let mut open_tag: Option<(usize, usize)> = None;
        let mut pending_blanks = 0usize;
        for line in lines {
            let content = &source_text[line.start..line.end];
            if content.is_empty() {
                if open_tag.is_some() {
                    pending_blanks += 1;
                } else {
                    document.entries.push(DocEntry::Blank);
                }
                continue;
            }

            let head = content.trim_start();
            if let Some(captures) = TAG_LINE.captures(head) {
                document.flush_blanks(&mut pending_blanks);
                let tag_name: TagName = captures[1].to_string().into();
                let tag_value = captures.get(2).map_or("", |m| m.as_str()).to_string();
                let description = captures.get(3).map_or("", |m| m.as_str()).trim().to_string();
                document.tags.push(Tag {
                    target_string: head.to_string(),
                    tag_name,
                    tag_value,
                    description,
                    lines: vec![content.to_string()],
                });
                let index = document.tags.len() - 1;
                document.entries.push(DocEntry::Tag(index));
                open_tag = Some((index, line.end - head.len()));
                continue;
            }

            match open_tag {
                Some((index, tag_start)) => {
                    let tag = &mut document.tags[index];
                    for _ in 0..pending_blanks {
                        tag.lines.push(String::new());
                    }
                    pending_blanks = 0;
                    tag.lines.push(content.to_string());
                    if !tag.description.is_empty() {
                        tag.description.push('\n');
                    }
                    tag.description.push_str(content.trim());
                    tag.target_string = source_text[tag_start..line.end].to_string();
                }
                None => document.entries.push(DocEntry::Text(content.to_string())),
            }
        }
        document.flush_blanks(&mut pending_blanks);
        document
    }

    /// Document for a block without any documentation comment
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn entries(&self) -> &[DocEntry] {
        &self.entries
    }

    pub fn is_well_formed(&self) -> bool {
        self.well_formed
    }

    /// First tag of the given kind, with its index.
    ///
    /// A comment may repeat a tag kind; only the first occurrence is returned.
    pub fn find_first(&self, tag_name: &TagName) -> Option<(usize, &Tag)> {
        self.tags
            .iter()
            .enumerate()
            .find(|(_, tag)| &tag.tag_name == tag_name)
    }

    /// Content lines in comment order, blank separators as empty strings.
    pub fn content_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in &self.entries {
            match entry {
                DocEntry::Text(text) => lines.push(text.clone()),
                DocEntry::Blank => lines.push(String::new()),
                DocEntry::Tag(index) => lines.extend(self.tags[*index].lines.iter().cloned()),
            }
        }
        lines
    }

    /// Render content lines back into comment syntax.
    ///
    /// The opener carries no indentation since the splice point is the `/**`
    /// itself; every following line is prefixed with `indent`.
    pub fn render(lines: &[String], indent: &str, newline: &str) -> String {
        let mut out = String::from("/**");
        for line in lines {
            out.push_str(newline);
            out.push_str(indent);
            if line.is_empty() {
                out.push_str(" *");
            } else {
                out.push_str(" * ");
                out.push_str(line);
            }
        }
        out.push_str(newline);
        out.push_str(indent);
        out.push_str(" */");
        out
    }

    fn flush_blanks(&mut self, pending: &mut usize) {
        for _ in 0..*pending {
            self.entries.push(DocEntry::Blank);
        }
        *pending = 0;
    }

    /// Content ranges of every physical line between `body_start` and `close`.
    ///
    /// The opener line contributes its trailing text (if any); the closer
    /// line contributes nothing when it only holds the terminator.
    fn content_lines_of(source: &str, body_start: usize, close: usize) -> Vec<ContentLine> {
        let body = &source[body_start..close];
        let mut ranges = Vec::new();
        let mut offset = body_start;
        let physical: Vec<&str> = body.split('\n').collect();
        let count = physical.len();

        for (i, raw) in physical.iter().enumerate() {
            let line_start = offset;
            offset += raw.len() + 1;

            let raw = raw.strip_suffix('\r').unwrap_or(raw);
            let mut start = line_start;
            let mut rest = raw;
            if i > 0 {
                let trimmed = rest.trim_start();
                start += rest.len() - trimmed.len();
                rest = trimmed;
                if let Some(stripped) = rest.strip_prefix('*') {
                    start += 1;
                    rest = stripped;
                    if let Some(stripped) = rest.strip_prefix(' ') {
                        start += 1;
                        rest = stripped;
                    }
                }
            } else {
                let trimmed = rest.trim_start();
                start += rest.len() - trimmed.len();
                rest = trimmed;
            }
            let content = rest.trim_end();
            let is_edge = i == 0 || (i == count - 1 && count > 1);
            if content.is_empty() && is_edge {
                continue;
            }
            ranges.push(ContentLine {
                start,
                end: start + content.len(),
            });
        }
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASS_DOC: &str = "/**\n * Holds the widgets.\n *\n * @author Jane Doe\n * @version 1.0 initial cut\n * @see Widget\n */";

    #[test]
    fn test_parse_tags_in_order() {
        let doc = TagsDocument::parse(CLASS_DOC);
        assert!(doc.is_well_formed());

        let names: Vec<&TagName> = doc.tags().iter().map(|t| &t.tag_name).collect();
        assert_eq!(names, vec![&TagName::Author, &TagName::Version, &TagName::See]);

        let version = &doc.tags()[1];
        assert_eq!(version.tag_value, "1.0");
        assert_eq!(version.description, "initial cut");
        assert_eq!(version.target_string, "@version 1.0 initial cut");
    }

    #[test]
    fn test_author_value_is_first_token() {
        let doc = TagsDocument::parse(CLASS_DOC);
        let author = &doc.tags()[0];
        assert_eq!(author.tag_value, "Jane");
        assert_eq!(author.description, "Doe");
    }

    #[test]
    fn test_blank_lines_are_not_tags() {
        let doc = TagsDocument::parse(CLASS_DOC);
        assert_eq!(
            doc.entries()[..2],
            [DocEntry::Text("Holds the widgets.".to_string()), DocEntry::Blank]
        );
    }

    #[test]
    fn test_unknown_tags_are_retained() {
        let doc = TagsDocument::parse("/**\n * @custom.marker yes please\n */");
        assert_eq!(doc.tags().len(), 1);
        assert_eq!(doc.tags()[0].tag_name, TagName::Custom("custom.marker".to_string()));
        assert!(!doc.tags()[0].tag_name.is_known());
    }

    #[test]
    fn test_continuation_lines_belong_to_tag() {
        let text = "/**\n * @param count how many\n *        widgets to build\n *\n * @return nothing\n */";
        let doc = TagsDocument::parse(text);
        let param = &doc.tags()[0];
        assert_eq!(param.description, "how many\nwidgets to build");
        assert_eq!(param.content_lines().len(), 2);
        assert_eq!(
            param.target_string,
            "@param count how many\n *        widgets to build"
        );
        // The blank between the two tags is a separator, not part of @param
        assert_eq!(doc.entries()[1], DocEntry::Blank);
    }

    #[test]
    fn test_inline_tags_are_not_block_tags() {
        let doc = TagsDocument::parse("/**\n * See {@link Foo} for details.\n */");
        assert!(doc.tags().is_empty());
        assert_eq!(doc.entries().len(), 1);
    }

    #[test]
    fn test_single_line_comment() {
        let doc = TagsDocument::parse("/** @since 1.2 */");
        assert_eq!(doc.tags().len(), 1);
        assert_eq!(doc.tags()[0].tag_value, "1.2");
        assert_eq!(doc.content_lines(), vec!["@since 1.2".to_string()]);
    }

    #[test]
    fn test_malformed_comment_yields_no_tags() {
        let doc = TagsDocument::parse("/* plain comment */");
        assert!(!doc.is_well_formed());
        assert!(doc.tags().is_empty());

        let doc = TagsDocument::parse("/**\n * @author nobody\n");
        assert!(!doc.is_well_formed());
        assert!(doc.tags().is_empty());
    }

    #[test]
    fn test_crlf_lines() {
        let doc = TagsDocument::parse("/**\r\n * Text.\r\n * @since 2.0\r\n */");
        assert_eq!(doc.tags()[0].tag_value, "2.0");
        assert_eq!(
            doc.content_lines(),
            vec!["Text.".to_string(), "@since 2.0".to_string()]
        );
    }

    #[test]
    fn test_find_first_returns_first_duplicate() {
        let doc = TagsDocument::parse("/**\n * @author A\n * @author B\n */");
        let (index, tag) = doc.find_first(&TagName::Author).unwrap();
        assert_eq!(index, 0);
        assert_eq!(tag.tag_value, "A");
    }

    #[test]
    fn test_render_round_trips_canonical_layout() {
        let doc = TagsDocument::parse(CLASS_DOC);
        let rendered = TagsDocument::render(&doc.content_lines(), "", "\n");
        assert_eq!(rendered, CLASS_DOC);
    }

    #[test]
    fn test_render_with_indent() {
        let lines = vec!["@since 1.0".to_string(), String::new(), "text".to_string()];
        let rendered = TagsDocument::render(&lines, "    ", "\n");
        assert_eq!(rendered, "/**\n     * @since 1.0\n     *\n     * text\n     */");
    }

    #[test]
    fn test_tag_name_parsing() {
        assert_eq!("@since".parse::<TagName>().unwrap(), TagName::Since);
        assert_eq!("serialField".parse::<TagName>().unwrap(), TagName::SerialField);
        assert_eq!(TagName::ImplNote.to_string(), "@implNote");
    }

    #[test]
    fn test_tag_after_extra_whitespace_is_recognized() {
        let text = "/**\n * Doc.\n *  @since 0.9\n *\t@author Jane\n */";
        let doc = TagsDocument::parse(text);
        let names: Vec<&TagName> = doc.tags().iter().map(|t| &t.tag_name).collect();
        assert_eq!(names, vec![&TagName::Since, &TagName::Author]);
        assert_eq!(doc.tags()[0].tag_value, "0.9");
        assert_eq!(doc.tags()[0].target_string, "@since 0.9");
        assert!(doc.tags()[0].is_conformant("0.9", ""));
        assert_eq!(
            doc.content_lines(),
            vec!["Doc.".to_string(), " @since 0.9".to_string(), "\t@author Jane".to_string()]
        );
    }

    #[test]
    fn test_with_head_keeps_continuation_lines() {
        let doc = TagsDocument::parse("/**\n * @since 1.0\n * Main description.\n */");
        let since = &doc.tags()[0];
        assert_eq!(since.description, "Main description.");

        let rewritten = since.with_head("2.0", "");
        assert_eq!(
            rewritten.content_lines(),
            ["@since 2.0".to_string(), "Main description.".to_string()]
        );
        assert_eq!(rewritten.tag_value, "2.0");
        assert_eq!(rewritten.description, "Main description.");
        assert!(rewritten.is_conformant("2.0", ""));
    }

    #[test]
    fn test_head_line_and_conformance() {
        let tag = Tag::new(TagName::Version, "2.0", "");
        assert_eq!(tag.head_line(), "@version 2.0");
        assert!(tag.is_conformant("2.0", ""));
        assert!(!tag.is_conformant("2.1", ""));
        assert!(!tag.is_conformant("2.0", "beta"));
    }
}
