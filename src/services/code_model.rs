//! Whole-file segmentation and reassembly.
//!
//! A file is cut at its documentation-comment anchors into consecutive
//! declaration units. Each unit runs from the end of the previous one through
//! the end of its declaration's signature line; whatever follows the last
//! unit is kept as trailing text. Concatenating every unit and the trailing
//! text always reproduces the input exactly.

use crate::error::{SkipReason, SkipTarget, TaggerError};
use crate::models::{ConfigsModel, DeclarationBlock, detect_newline};
use crate::services::block_parser::{BlockParser, HEADER_WINDOW};
use crate::services::lexer::{Token, TokenKind, tokenize};
use crate::services::replacement::BlockReplacementEngine;
use camino::Utf8Path;
use std::collections::HashSet;

/// Outcome of rewriting one file's blocks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileRewrite {
    pub replace_count: usize,
    pub blocks_rewritten: usize,
    pub skipped: Vec<SkipReason>,
}

impl FileRewrite {
    /// Number of skipped blocks (rule skips excluded)
    pub fn blocks_skipped(&self) -> usize {
        self.skipped
            .iter()
            .filter(|reason| matches!(reason.target, SkipTarget::Block { .. }))
            .count()
    }
}

/// A source file split into declaration blocks, in file order
#[derive(Debug, Clone, Default)]
pub struct CodeModel {
    blocks: Vec<DeclarationBlock>,
    trailing_text: String,
}

impl CodeModel {
    /// Split `source` into declaration blocks.
    ///
    /// A file without documentation comments yields no blocks; its whole text
    /// becomes trailing text and is carried through untouched.
    pub fn parse(source: &str) -> Self {
        let tokens = tokenize(source);
        let newline = detect_newline(source);
        let anchors: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind == TokenKind::DocComment)
            .map(|(i, _)| i)
            .collect();

        let mut blocks = Vec::with_capacity(anchors.len());
        let mut unit_start = 0;
        for &anchor in &anchors {
            let (unit_end, header_truncated) = Self::unit_end(source, &tokens, anchor);
            let mut block = BlockParser::parse_with_newline(&source[unit_start..unit_end], newline);
            block.header_truncated |= header_truncated;
            blocks.push(block);
            unit_start = unit_end;
        }

        tracing::debug!(blocks = blocks.len(), "Segmented source into declaration blocks");
        Self {
            blocks,
            trailing_text: source[unit_start..].to_string(),
        }
    }

    /// End offset of the unit anchored at the doc comment `anchor`.
    ///
    /// The header terminator is extended over the rest of its line so the
    /// unit covers the whole signature line. Without a terminator the unit
    /// ends with the comment itself, and the flag tells whether the header
    /// overran the classification window.
    fn unit_end(source: &str, tokens: &[Token], anchor: usize) -> (usize, bool) {
        let scan = BlockParser::scan_header(source, tokens, anchor);
        let Some(terminator_end) = scan.terminator_end else {
            return (tokens[anchor].span.end, scan.window_exhausted);
        };

        let mut end = terminator_end;
        let rest = tokens[anchor + 1..]
            .iter()
            .skip_while(|t| t.span.end <= terminator_end);
        for token in rest {
            let text = token.text(source);
            if token.kind == TokenKind::DocComment || text.contains('\n') {
                break;
            }
            end = token.span.end;
        }
        (end, false)
    }

    pub fn blocks(&self) -> &[DeclarationBlock] {
        &self.blocks
    }

    pub fn trailing_text(&self) -> &str {
        &self.trailing_text
    }

    /// Run the replacement engine over every block in file order.
    ///
    /// A block that fails to parse is left untouched and reported; the rest
    /// of the file is still processed. A rule the engine skips is reported
    /// once per file, not once per block.
    pub fn rewrite(&mut self, configs_model: &ConfigsModel, path: &Utf8Path) -> FileRewrite {
        let engine = BlockReplacementEngine::new(configs_model);
        let mut result = FileRewrite::default();
        let mut reported_rules = HashSet::new();

        for block in &mut self.blocks {
            if block.header_truncated {
                let reason = format!("declaration header exceeds {} tokens", HEADER_WINDOW);
                tracing::warn!(path = %path, block = %block.id, "Skipping block: {}", reason);
                result.skipped.push(SkipReason::block(
                    path.to_owned(),
                    block.id,
                    &block.element_name,
                    reason,
                ));
                continue;
            }
            match engine.replace(block) {
                Ok(outcome) => {
                    if outcome.javadoc.is_some() {
                        result.blocks_rewritten += 1;
                    }
                    result.replace_count += outcome.replace_count;
                    for skip in outcome.skipped_rules {
                        if !reported_rules.insert(skip.rule_index) {
                            continue;
                        }
                        result
                            .skipped
                            .push(SkipReason::rule(path.to_owned(), &skip.tag, skip.reason));
                    }
                }
                Err(TaggerError::BlockParse {
                    block_id,
                    element,
                    reason,
                }) => {
                    tracing::warn!(
                        path = %path,
                        block = %block_id,
                        element = %element,
                        "Skipping block: {}",
                        reason
                    );
                    result
                        .skipped
                        .push(SkipReason::block(path.to_owned(), block_id, &element, reason));
                }
                Err(e) => {
                    tracing::warn!(path = %path, block = %block.id, "Skipping block: {}", e);
                    result.skipped.push(SkipReason::block(
                        path.to_owned(),
                        block.id,
                        &block.element_name,
                        e.to_string(),
                    ));
                }
            }
        }
        result
    }

    /// Reassemble the file from its (possibly rewritten) blocks
    pub fn render(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            out.push_str(&block.rewritten_block_text());
        }
        out.push_str(&self.trailing_text);
        out
    }
}
