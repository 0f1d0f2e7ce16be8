//! Block replacement engine.
//!
//! Applies the ordered tag rules of a [`ConfigsModel`] to one
//! [`DeclarationBlock`] and produces the rewritten documentation comment.
//!
//! A [`ReplacementSession`] walks the rules once. For every rule it first
//! locates the block's current tag of that kind (first match only), then
//! applies the location, insertion and overwrite policies. Tags no rule
//! touches keep their place. The final comment is only re-rendered when its
//! content actually changed, so a conformant comment comes back untouched and
//! running the engine on its own output is a no-op.

use crate::error::TaggerError;
use crate::models::config::compare_priority;
use crate::models::{
    ConfigsModel, DeclarationBlock, DocEntry, InsertPosition, OverwritePolicy, Tag, TagConfigModel,
    TagsDocument,
};
use std::cmp::Ordering;

/// Phase of a [`ReplacementSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initialized,
    /// Locating the block's current tag for the rule at `current_config_index`
    IteratingExistingTags,
    /// Applying the rule at `current_config_index`
    IteratingConfigRules,
    Finalized,
}

/// A rule that could not be applied to a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSkip {
    pub rule_index: usize,
    pub tag: String,
    pub reason: String,
}

/// Result of running the engine over one block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementOutcome {
    /// Rewritten comment, `None` when the comment is left exactly as it was
    pub javadoc: Option<String>,
    /// Number of tags inserted, removed, rewritten or moved
    pub replace_count: usize,
    pub skipped_rules: Vec<RuleSkip>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    InPlace,
    /// Head group, ordered by sequence number
    Head(usize),
    /// New tag under a preserve rule. Sits after the in-place tags and ahead
    /// of the tail group, which is where a later run finds it in place.
    Appended(usize),
    /// Tail group, ordered by sequence number
    Tail(usize),
}

#[derive(Debug, Clone)]
struct WorkingTag {
    tag: Tag,
    /// Index in the parsed comment; `None` for inserted tags
    origin: Option<usize>,
    placement: Placement,
    removed: bool,
    rewritten: bool,
}

/// Per-block engine state.
///
/// Drive it with [`advance`](Self::advance) (or [`run`](Self::run)) and
/// finish with [`build_final_javadoc`](Self::build_final_javadoc).
pub struct ReplacementSession<'a> {
    configs_model: &'a ConfigsModel,
    block: &'a DeclarationBlock,
    state: SessionState,
    current_config_index: usize,
    current_tag_index: Option<usize>,
    working: Vec<WorkingTag>,
    head_insert_offset: usize,
    tail_insert_offset: usize,
    skipped_rules: Vec<RuleSkip>,
}

impl<'a> ReplacementSession<'a> {
    /// Start a session for `block`.
    ///
    /// Fails with [`TaggerError::BlockParse`] when the block carries a
    /// documentation comment that could not be parsed.
    pub fn new(configs_model: &'a ConfigsModel, block: &'a DeclarationBlock) -> Result<Self, TaggerError> {
        if block.has_comment() && !block.javadoc_model.is_well_formed() {
            return Err(TaggerError::BlockParse {
                block_id: block.id,
                element: block.element_name.clone(),
                reason: "documentation comment is not terminated".to_string(),
            });
        }

        let working = block
            .javadoc_model
            .tags()
            .iter()
            .enumerate()
            .map(|(index, tag)| WorkingTag {
                tag: tag.clone(),
                origin: Some(index),
                placement: Placement::InPlace,
                removed: false,
                rewritten: false,
            })
            .collect();

        Ok(Self {
            configs_model,
            block,
            state: SessionState::Initialized,
            current_config_index: 0,
            current_tag_index: None,
            working,
            head_insert_offset: 0,
            tail_insert_offset: 0,
            skipped_rules: Vec::new(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_config_index(&self) -> usize {
        self.current_config_index
    }

    /// Perform one state transition and return the new state.
    pub fn advance(&mut self) -> SessionState {
        self.state = match self.state {
            SessionState::Initialized => {
                if !self.block.is_rewritable() || self.configs_model.is_empty() {
                    SessionState::Finalized
                } else {
                    SessionState::IteratingExistingTags
                }
            }
            SessionState::IteratingExistingTags => {
                let configs_model = self.configs_model;
                let rule = &configs_model.rules()[self.current_config_index];
                self.current_tag_index = self.locate(rule);
                SessionState::IteratingConfigRules
            }
            SessionState::IteratingConfigRules => {
                let configs_model = self.configs_model;
                let rule = &configs_model.rules()[self.current_config_index];
                self.apply(self.current_config_index, rule);
                self.current_config_index += 1;
                self.current_tag_index = None;
                if self.current_config_index < self.configs_model.len() {
                    SessionState::IteratingExistingTags
                } else {
                    SessionState::Finalized
                }
            }
            SessionState::Finalized => SessionState::Finalized,
        };
        self.state
    }

    /// Advance until every rule has been applied
    pub fn run(mut self) -> Self {
        while self.advance() != SessionState::Finalized {}
        self
    }

    /// First live tag of the rule's kind: parsed tags in comment order, then
    /// tags inserted by earlier rules.
    fn locate(&self, rule: &TagConfigModel) -> Option<usize> {
        self.working
            .iter()
            .position(|w| !w.removed && w.tag.tag_name == rule.tag)
    }

    fn apply(&mut self, rule_index: usize, rule: &TagConfigModel) {
        if !rule.tag.is_known() {
            tracing::warn!(
                block = %self.block.id,
                tag = %rule.tag,
                "Skipping rule with unknown tag kind"
            );
            self.skipped_rules.push(RuleSkip {
                rule_index,
                tag: rule.tag.to_string(),
                reason: "unknown tag kind".to_string(),
            });
            return;
        }

        let kind = self.block.declaration_kind;
        if !rule.location.applies_to(kind) {
            if let Some(index) = self.current_tag_index
                && rule.location.remove_if_misplaced
            {
                tracing::debug!(
                    block = %self.block.id,
                    tag = %rule.tag,
                    kind = %kind,
                    "Removing misplaced tag"
                );
                self.working[index].removed = true;
            }
            return;
        }

        let Some(index) = self.current_tag_index else {
            let tag = Tag::new(rule.tag.clone(), &rule.tag_value, &rule.tag_description);
            tracing::debug!(block = %self.block.id, tag = %tag.head_line(), "Inserting tag");
            let placement = self.next_placement(rule.insert_position);
            self.working.push(WorkingTag {
                tag,
                origin: None,
                placement,
                removed: false,
                rewritten: false,
            });
            return;
        };

        let existing = &self.working[index].tag;
        let replace = match rule.overwrite {
            OverwritePolicy::Always => !existing.is_conformant(&rule.tag_value, &rule.tag_description),
            OverwritePolicy::Never => false,
            OverwritePolicy::IfLowerPriority => {
                compare_priority(&rule.tag_value, &existing.tag_value) == Ordering::Greater
            }
            OverwritePolicy::IfSame => {
                existing.tag_value.trim() == rule.tag_value.trim()
                    && !existing.is_conformant(&rule.tag_value, &rule.tag_description)
            }
            OverwritePolicy::None => return,
        };

        if replace {
            tracing::debug!(
                block = %self.block.id,
                from = %existing.head_line(),
                to = %Tag::head_line_for(&rule.tag, &rule.tag_value, &rule.tag_description),
                "Overwriting tag"
            );
            let working = &mut self.working[index];
            working.tag = working.tag.with_head(&rule.tag_value, &rule.tag_description);
            working.rewritten = true;
        }

        if rule.insert_position != InsertPosition::Preserve {
            let placement = self.next_placement(rule.insert_position);
            self.working[index].placement = placement;
        }
    }

    /// Placement for a tag created or relocated at `position`; `Preserve`
    /// only reaches here for new tags.
    fn next_placement(&mut self, position: InsertPosition) -> Placement {
        match position {
            InsertPosition::Beginning => {
                self.head_insert_offset += 1;
                Placement::Head(self.head_insert_offset)
            }
            InsertPosition::End => {
                self.tail_insert_offset += 1;
                Placement::Tail(self.tail_insert_offset)
            }
            InsertPosition::Preserve => {
                self.tail_insert_offset += 1;
                Placement::Appended(self.tail_insert_offset)
            }
        }
    }

    /// Assemble the final comment.
    ///
    /// Runs any remaining transitions first. The comment is re-rendered only
    /// when its content lines differ from the original ones.
    pub fn build_final_javadoc(self) -> ReplacementOutcome {
        let session = if self.state == SessionState::Finalized {
            self
        } else {
            self.run()
        };

        let document = &session.block.javadoc_model;
        let original_lines = document.content_lines();

        let mut head: Vec<(usize, usize)> = Vec::new();
        let mut tail: Vec<(bool, usize, usize)> = Vec::new();
        for (index, working) in session.working.iter().enumerate() {
            if working.removed {
                continue;
            }
            match working.placement {
                Placement::Head(seq) => head.push((seq, index)),
                Placement::Appended(seq) => tail.push((false, seq, index)),
                Placement::Tail(seq) => tail.push((true, seq, index)),
                Placement::InPlace => {}
            }
        }
        head.sort_unstable();
        tail.sort_unstable();

        let mut order: Vec<usize> = head.iter().map(|(_, index)| *index).collect();
        let mut lines: Vec<String> = Vec::new();
        for &index in &order {
            lines.extend(session.working[index].tag.content_lines().iter().cloned());
        }
        for entry in document.entries() {
            match entry {
                DocEntry::Text(text) => lines.push(text.clone()),
                DocEntry::Blank => lines.push(String::new()),
                DocEntry::Tag(origin) => {
                    let working = &session.working[*origin];
                    if !working.removed && working.placement == Placement::InPlace {
                        lines.extend(working.tag.content_lines().iter().cloned());
                        order.push(*origin);
                    }
                }
            }
        }
        for &(_, _, index) in &tail {
            lines.extend(session.working[index].tag.content_lines().iter().cloned());
            order.push(index);
        }

        if lines == original_lines {
            return ReplacementOutcome {
                javadoc: None,
                replace_count: 0,
                skipped_rules: session.skipped_rules,
            };
        }

        let replace_count = session.count_changes(&order);
        let javadoc = TagsDocument::render(&lines, &session.block.indent, &session.block.newline);
        tracing::debug!(
            block = %session.block.id,
            name = %session.block.element_name,
            replace_count,
            "Rebuilt documentation comment"
        );
        ReplacementOutcome {
            javadoc: Some(javadoc),
            replace_count,
            skipped_rules: session.skipped_rules,
        }
    }

    /// Tags inserted, removed, rewritten or moved, each counted once.
    ///
    /// A surviving parsed tag counts as moved when it falls outside the
    /// longest run of parsed tags that kept their relative order.
    fn count_changes(&self, order: &[usize]) -> usize {
        let origins: Vec<usize> = order
            .iter()
            .filter_map(|&index| self.working[index].origin)
            .collect();
        let kept = longest_increasing(&origins);

        self.working
            .iter()
            .filter(|w| match w.origin {
                None => !w.removed,
                Some(origin) => w.removed || w.rewritten || !kept.contains(&origin),
            })
            .count()
    }
}

/// Elements of the longest strictly increasing subsequence of `values`
fn longest_increasing(values: &[usize]) -> Vec<usize> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut length = vec![1usize; values.len()];
    let mut previous = vec![None; values.len()];
    for i in 0..values.len() {
        for j in 0..i {
            if values[j] < values[i] && length[j] + 1 > length[i] {
                length[i] = length[j] + 1;
                previous[i] = Some(j);
            }
        }
    }
    let mut best = 0;
    for i in 1..values.len() {
        if length[i] > length[best] {
            best = i;
        }
    }
    let mut sequence = Vec::new();
    let mut cursor = Some(best);
    while let Some(i) = cursor {
        sequence.push(values[i]);
        cursor = previous[i];
    }
    sequence.reverse();
    sequence
}

/// Applies a [`ConfigsModel`] to declaration blocks
pub struct BlockReplacementEngine<'a> {
    configs_model: &'a ConfigsModel,
}

impl<'a> BlockReplacementEngine<'a> {
    pub fn new(configs_model: &'a ConfigsModel) -> Self {
        Self { configs_model }
    }

    /// Start a session for one block
    pub fn initialize<'b>(&self, block: &'b DeclarationBlock) -> Result<ReplacementSession<'b>, TaggerError>
    where
        'a: 'b,
    {
        ReplacementSession::new(self.configs_model, block)
    }

    /// Run every rule against `block` and attach the rewritten comment to it.
    pub fn replace(&self, block: &mut DeclarationBlock) -> Result<ReplacementOutcome, TaggerError> {
        let outcome = self.initialize(block)?.build_final_javadoc();
        if let Some(javadoc) = &outcome.javadoc {
            block.attach_javadoc(javadoc.clone());
        }
        Ok(outcome)
    }
}
