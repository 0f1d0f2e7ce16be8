//! Declaration block parsing.
//!
//! A block is one documentation comment plus the annotations and declaration
//! header that follow it. Classification works on the token stream from
//! [`lexer`](crate::services::lexer): annotations are consumed with balanced
//! parentheses, then the header is collected up to its first top-level
//! terminator and classified from a bounded window of significant tokens.
//! The window starts after the annotations, which are never bounded.

use crate::models::{DeclarationBlock, DeclarationKind, TagsDocument, detect_newline};
use crate::services::lexer::{Token, TokenKind, is_identifier, tokenize};
use std::ops::Range;

/// Significant header tokens, after any annotations, considered when looking
/// for a declaration terminator
pub const HEADER_WINDOW: usize = 256;

const MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "sealed",
    "strictfp",
    "default",
    "synchronized",
    "native",
    "transient",
    "volatile",
];

/// What follows a documentation comment, in offsets of the scanned source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderScan {
    pub annotations: Vec<Range<usize>>,
    pub kind: DeclarationKind,
    pub name: String,
    /// End of the header's terminating token, when one was found
    pub terminator_end: Option<usize>,
    /// No terminator within [`HEADER_WINDOW`] tokens although the header went on
    pub window_exhausted: bool,
}

/// Parser for single declaration units
pub struct BlockParser;

impl BlockParser {
    /// Parse one declaration unit.
    ///
    /// `fragment` runs from the end of the previous unit through this
    /// declaration's signature line. The first documentation comment in it is
    /// the block's comment. A fragment without one, or whose header cannot be
    /// classified, yields a [`DeclarationKind::None`] block.
    pub fn parse(fragment: &str) -> DeclarationBlock {
        Self::parse_with_newline(fragment, detect_newline(fragment))
    }

    /// Parse one declaration unit cut from a file whose line terminator is
    /// `newline`. Rewritten comments use it even when the fragment itself
    /// holds no line break.
    pub fn parse_with_newline(fragment: &str, newline: &str) -> DeclarationBlock {
        let mut block = DeclarationBlock::new(fragment.to_string());
        block.newline = newline.to_string();
        let tokens = tokenize(fragment);

        let Some(comment_index) = tokens.iter().position(|t| t.kind == TokenKind::DocComment) else {
            tracing::debug!(block = %block.id, "No documentation comment in fragment");
            return block;
        };

        let comment = &tokens[comment_index];
        block.comment_span = Some(comment.span.clone());
        block.indent = line_indent(fragment, comment.span.start);
        block.javadoc_model = TagsDocument::parse(comment.text(fragment));

        let scan = Self::scan_header(fragment, &tokens, comment_index);
        block.annotations = scan
            .annotations
            .iter()
            .map(|span| fragment[span.clone()].to_string())
            .collect();
        block.declaration_kind = scan.kind;
        block.element_name = scan.name;
        block.header_truncated = scan.window_exhausted;

        tracing::debug!(
            block = %block.id,
            kind = %block.declaration_kind,
            name = %block.element_name,
            annotations = block.annotations.len(),
            tags = block.javadoc_model.tags().len(),
            "Parsed declaration block"
        );
        block
    }

    /// Scan the annotations and header after the doc comment at `comment_index`.
    ///
    /// Scanning stops at the next documentation comment; a header cut short
    /// that way is unclassifiable. So is a header with no terminator among
    /// its first [`HEADER_WINDOW`] tokens, which sets `window_exhausted`.
    pub fn scan_header(source: &str, tokens: &[Token], comment_index: usize) -> HeaderScan {
        let significant: Vec<&Token> = tokens[comment_index + 1..]
            .iter()
            .filter(|t| !t.is_trivia())
            .take_while(|t| t.kind != TokenKind::DocComment)
            .collect();

        let mut scan = HeaderScan {
            annotations: Vec::new(),
            kind: DeclarationKind::None,
            name: String::new(),
            terminator_end: None,
            window_exhausted: false,
        };

        let mut i = 0;
        while i < significant.len() && starts_annotation(source, &significant, i) {
            let start = significant[i].span.start;
            i = skip_annotation(&significant, i);
            let end = significant[i - 1].span.end;
            scan.annotations.push(start..end);
        }

        let mut words = Vec::new();
        let mut depth = 0i32;
        let mut angle = 0i32;
        let mut terminator = None;
        let window_end = significant.len().min(i + HEADER_WINDOW);
        while i < window_end {
            let token = significant[i];
            let text = token.text(source);
            match token.kind {
                TokenKind::Punct('(') | TokenKind::Punct('[') => depth += 1,
                TokenKind::Punct(')') | TokenKind::Punct(']') => depth -= 1,
                TokenKind::Punct('<') if depth == 0 => angle += 1,
                TokenKind::Punct('>') if depth == 0 && angle > 0 => angle -= 1,
                TokenKind::Punct(c @ ('{' | ';' | '=' | '}')) if depth <= 0 && angle == 0 => {
                    terminator = Some((c, token.span.end));
                    break;
                }
                TokenKind::Punct(',') if depth <= 0 && angle == 0 => {
                    terminator = Some((',', token.span.end));
                    break;
                }
                _ => {}
            }
            words.push(text);
            i += 1;
        }

        let Some((terminator, terminator_end)) = terminator else {
            scan.window_exhausted = i < significant.len();
            return scan;
        };
        scan.terminator_end = Some(terminator_end);
        let (kind, name) = classify(&words, terminator);
        scan.kind = kind;
        scan.name = name;
        scan
    }
}

/// Classify a declaration header.
///
/// `words` are the significant token texts after the leading annotations, up
/// to (not including) the top-level `terminator`.
pub fn classify(words: &[&str], terminator: char) -> (DeclarationKind, String) {
    let none = (DeclarationKind::None, String::new());
    let name_at = |index: usize| -> String {
        words
            .get(index)
            .filter(|w| is_identifier(w))
            .map(|w| w.to_string())
            .unwrap_or_default()
    };

    let mut i = 0;
    let mut has_modifiers = false;
    while i < words.len() {
        let word = words[i];
        if MODIFIERS.contains(&word) {
            has_modifiers = true;
            i += 1;
        } else if word == "non" && words.get(i + 1) == Some(&"-") && words.get(i + 2) == Some(&"sealed") {
            has_modifiers = true;
            i += 3;
        } else if word == "@" && words.get(i + 1).is_some_and(|w| *w != "interface") {
            i = skip_inline_annotation(words, i);
        } else {
            break;
        }
    }
    if i >= words.len() {
        return none;
    }

    match words[i] {
        "class" => return (DeclarationKind::Class, name_at(i + 1)),
        "interface" => return (DeclarationKind::Interface, name_at(i + 1)),
        "enum" => return (DeclarationKind::Enum, name_at(i + 1)),
        "@" if words.get(i + 1) == Some(&"interface") => {
            return (DeclarationKind::Annotation, name_at(i + 2));
        }
        "record" if is_identifier(words.get(i + 1).unwrap_or(&"")) && matches!(words.get(i + 2), Some(&"(") | Some(&"<")) => {
            return (DeclarationKind::Record, name_at(i + 1));
        }
        "package" | "import" | "module" | "open" => return none,
        _ => {}
    }

    // Generic type parameters in front of a method or constructor
    if words[i] == "<" {
        let mut angle = 0;
        while i < words.len() {
            match words[i] {
                "<" => angle += 1,
                ">" => angle -= 1,
                _ => {}
            }
            i += 1;
            if angle == 0 {
                break;
            }
        }
        if i >= words.len() {
            return none;
        }
    }

    let rest = &words[i..];
    let mut angle = 0;
    let mut paren = None;
    for (offset, word) in rest.iter().enumerate() {
        match *word {
            "<" => angle += 1,
            ">" => angle -= 1,
            "(" if angle == 0 => {
                paren = Some(offset);
                break;
            }
            _ => {}
        }
    }

    if let Some(paren) = paren {
        if paren == 0 || !is_identifier(rest[paren - 1]) {
            return none;
        }
        let name = rest[paren - 1].to_string();
        if paren > 1 {
            return (DeclarationKind::Method, name);
        }
        // Enum constant with arguments: `RED(0xff0000),` or `RED(1) {`.
        // `URL(String spec) {` declares parameters, so it is a constructor.
        if !has_modifiers
            && is_constant_name(&name)
            && (terminator != '{' || !declares_parameters(&rest[paren + 1..]))
        {
            return (DeclarationKind::Field, name);
        }
        return (DeclarationKind::Constructor, name);
    }

    let last = rest.last().copied().unwrap_or("");
    match terminator {
        ';' | '=' | ',' | '}' if is_identifier(last) => (DeclarationKind::Field, last.to_string()),
        // Enum constant with a body: `RED {`
        '{' if rest.len() == 1 && is_identifier(last) => (DeclarationKind::Field, last.to_string()),
        _ => none,
    }
}

fn starts_annotation(source: &str, tokens: &[&Token], i: usize) -> bool {
    tokens[i].is_punct('@')
        && tokens
            .get(i + 1)
            .is_some_and(|next| next.kind == TokenKind::Ident && next.text(source) != "interface")
}

/// Index just past the annotation starting at `i` (`@` `Name` [`.` `Name`]* [`(`...`)`])
fn skip_annotation(tokens: &[&Token], mut i: usize) -> usize {
    i += 2;
    while i + 1 < tokens.len() && tokens[i].is_punct('.') && tokens[i + 1].kind == TokenKind::Ident {
        i += 2;
    }
    if i < tokens.len() && tokens[i].is_punct('(') {
        let mut depth = 0;
        while i < tokens.len() {
            if tokens[i].is_punct('(') {
                depth += 1;
            } else if tokens[i].is_punct(')') {
                depth -= 1;
            }
            i += 1;
            if depth == 0 {
                break;
            }
        }
    }
    i
}

/// Same as [`skip_annotation`] over plain words, for annotations mixed into modifiers
fn skip_inline_annotation(words: &[&str], mut i: usize) -> usize {
    i += 2;
    while i + 1 < words.len() && words[i] == "." && is_identifier(words[i + 1]) {
        i += 2;
    }
    if words.get(i) == Some(&"(") {
        let mut depth = 0;
        while i < words.len() {
            match words[i] {
                "(" => depth += 1,
                ")" => depth -= 1,
                _ => {}
            }
            i += 1;
            if depth == 0 {
                break;
            }
        }
    }
    i
}

/// Whether a parenthesized list reads as `Type name` pairs rather than
/// argument expressions
fn declares_parameters(list: &[&str]) -> bool {
    list.windows(2).any(|pair| {
        is_identifier(pair[1])
            && (matches!(pair[0], ">" | "]") || (is_identifier(pair[0]) && pair[0] != "new"))
    })
}

/// `RED`, `MAX_SIZE`, `HTTP2`
fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Leading whitespace of the line containing `offset`
fn line_indent(source: &str, offset: usize) -> String {
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    source[line_start..]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> DeclarationBlock {
        BlockParser::parse(source)
    }

    #[test]
    fn test_class_with_modifiers() {
        let block = parse("/** Doc. */\npublic final class Foo extends Bar {");
        assert_eq!(block.declaration_kind, DeclarationKind::Class);
        assert_eq!(block.element_name, "Foo");
        assert!(block.annotations.is_empty());
    }

    #[test]
    fn test_interface_enum_record_annotation() {
        assert_eq!(
            parse("/** a */ interface Shape<T> {").declaration_kind,
            DeclarationKind::Interface
        );
        let block = parse("/** a */ public enum Color {");
        assert_eq!((block.declaration_kind, block.element_name.as_str()), (DeclarationKind::Enum, "Color"));
        let block = parse("/** a */ public record Point(int x, int y) {");
        assert_eq!((block.declaration_kind, block.element_name.as_str()), (DeclarationKind::Record, "Point"));
        let block = parse("/** a */ public @interface Marker {");
        assert_eq!(
            (block.declaration_kind, block.element_name.as_str()),
            (DeclarationKind::Annotation, "Marker")
        );
    }

    #[test]
    fn test_method_and_constructor() {
        let block = parse("/** a */\n    public static <T> List<T> copyOf(Collection<? extends T> items) {");
        assert_eq!((block.declaration_kind, block.element_name.as_str()), (DeclarationKind::Method, "copyOf"));

        let block = parse("/** a */\n    public Foo(int size) {");
        assert_eq!((block.declaration_kind, block.element_name.as_str()), (DeclarationKind::Constructor, "Foo"));

        let block = parse("/** a */\n    Foo() {");
        assert_eq!(block.declaration_kind, DeclarationKind::Constructor);

        let block = parse("/** a */\n    abstract int[] sizes() throws IOException;");
        assert_eq!((block.declaration_kind, block.element_name.as_str()), (DeclarationKind::Method, "sizes"));
    }

    #[test]
    fn test_fields_and_enum_constants() {
        let block = parse("/** a */\n    private final Map<String, Integer> counts = new HashMap<>();");
        assert_eq!((block.declaration_kind, block.element_name.as_str()), (DeclarationKind::Field, "counts"));

        let block = parse("/** a */\n    RED(0xff0000),");
        assert_eq!((block.declaration_kind, block.element_name.as_str()), (DeclarationKind::Field, "RED"));

        let block = parse("/** a */\n    GREEN;");
        assert_eq!((block.declaration_kind, block.element_name.as_str()), (DeclarationKind::Field, "GREEN"));
    }

    #[test]
    fn test_all_caps_constructor_is_not_an_enum_constant() {
        assert_eq!(
            classify(&["URL", "(", "String", "spec", ")"], '{'),
            (DeclarationKind::Constructor, "URL".to_string())
        );
        assert_eq!(
            classify(&["IO", "(", "List", "<", "T", ">", "items", ")"], '{'),
            (DeclarationKind::Constructor, "IO".to_string())
        );
        assert_eq!(
            classify(&["RED", "(", "new", "Color", "(", ")", ")"], '{'),
            (DeclarationKind::Field, "RED".to_string())
        );
        assert_eq!(
            classify(&["RED", "(", "0xff0000", ")"], '{'),
            (DeclarationKind::Field, "RED".to_string())
        );
    }

    #[test]
    fn test_window_starts_after_annotations() {
        let values: Vec<String> = (0..200).map(|i| format!("\"w{}\"", i)).collect();
        let source = format!("/** a */\n@SuppressWarnings({{ {} }})\npublic class A {{", values.join(", "));
        let block = parse(&source);
        assert_eq!((block.declaration_kind, block.element_name.as_str()), (DeclarationKind::Class, "A"));
        assert_eq!(block.annotations.len(), 1);
        assert!(!block.header_truncated);
    }

    #[test]
    fn test_header_past_window_is_flagged() {
        let params: Vec<String> = (0..100).map(|i| format!("int a{}", i)).collect();
        let source = format!("/** a */\nvoid run({}) {{", params.join(", "));
        let block = parse(&source);
        assert_eq!(block.declaration_kind, DeclarationKind::None);
        assert!(block.header_truncated);

        let short = parse("/** a */\nvoid run(int a) {");
        assert!(!short.header_truncated);
    }

    #[test]
    fn test_newline_can_be_supplied_by_the_file() {
        let block = BlockParser::parse_with_newline("/** a */ class A {", "\r\n");
        assert_eq!(block.newline, "\r\n");
        assert_eq!(parse("/** a */ class A {").newline, "\n");
    }

    #[test]
    fn test_multiline_annotations_are_captured_verbatim() {
        let source = "/** a */\n@SuppressWarnings({\n    \"unchecked\",\n    \"rawtypes\"\n})\n@Deprecated\npublic void run() {";
        let block = parse(source);
        assert_eq!(block.annotations.len(), 2);
        assert_eq!(block.annotations[0], "@SuppressWarnings({\n    \"unchecked\",\n    \"rawtypes\"\n})");
        assert_eq!(block.annotations[1], "@Deprecated");
        assert_eq!(block.declaration_kind, DeclarationKind::Method);
    }

    #[test]
    fn test_annotation_with_parens_inside_string() {
        let block = parse("/** a */\n@Pattern(regexp = \"(a|b))\")\nString code;");
        assert_eq!(block.annotations, vec!["@Pattern(regexp = \"(a|b))\")".to_string()]);
        assert_eq!((block.declaration_kind, block.element_name.as_str()), (DeclarationKind::Field, "code"));
    }

    #[test]
    fn test_inline_annotation_among_modifiers() {
        let block = parse("/** a */ public @Nullable String name() {");
        assert_eq!((block.declaration_kind, block.element_name.as_str()), (DeclarationKind::Method, "name"));
    }

    #[test]
    fn test_unrecognized_headers_are_none() {
        assert_eq!(parse("/** License */\npackage com.example;").declaration_kind, DeclarationKind::None);
        assert_eq!(parse("/** stray */\n}").declaration_kind, DeclarationKind::None);
        assert_eq!(parse("/** init */\nstatic {").declaration_kind, DeclarationKind::None);
        let block = parse("no comment here");
        assert!(!block.has_comment());
        assert_eq!(block.element_name, "");
    }

    #[test]
    fn test_leading_code_before_comment_is_ignored() {
        let source = "\n        run();\n    }\n\n    /** Next. */\n    void next() {";
        let block = parse(source);
        assert_eq!(block.comment_text(), "/** Next. */");
        assert_eq!(block.indent, "    ");
        assert_eq!(block.element_name, "next");
    }

    #[test]
    fn test_header_stops_at_next_doc_comment() {
        let source = "/** a */\n@Foo\n/** b */\nint x;";
        let tokens = tokenize(source);
        let scan = BlockParser::scan_header(source, &tokens, 0);
        assert_eq!(scan.kind, DeclarationKind::None);
        assert_eq!(scan.terminator_end, None);
        assert_eq!(scan.annotations.len(), 1);
    }

    #[test]
    fn test_classify_is_pure() {
        assert_eq!(
            classify(&["public", "non", "-", "sealed", "class", "Shape"], '{'),
            (DeclarationKind::Class, "Shape".to_string())
        );
        assert_eq!(classify(&[], '{'), (DeclarationKind::None, String::new()));
    }
}
