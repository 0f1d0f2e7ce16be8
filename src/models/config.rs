use crate::models::block::DeclarationKind;
use crate::models::tag::TagName;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Where a newly created or relocated tag is placed inside the comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsertPosition {
    /// Keep an existing tag where it is; new tags go to the end
    Preserve,
    /// Right after the comment opener
    Beginning,
    /// Right before the comment closer
    #[default]
    End,
}

/// Whether an existing tag is replaced when a rule targets its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverwritePolicy {
    Always,
    #[default]
    Never,
    /// Replace only when the rule's value outranks the existing value
    IfLowerPriority,
    /// Refresh the description only when the values already match
    IfSame,
    /// Leave an existing tag alone entirely (no overwrite, no relocation)
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocationMode {
    /// Only the declaration kinds listed in `target_kinds`
    OnlyTargeted,
    /// Every declaration kind
    #[default]
    #[serde(alias = "allPlusTargeted")]
    All,
}

/// Which declarations a rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationConfig {
    #[serde(default)]
    pub mode: LocationMode,

    #[serde(default)]
    pub target_kinds: Vec<DeclarationKind>,

    #[serde(default)]
    pub remove_if_misplaced: bool,
}

impl LocationConfig {
    /// Rule applies to every declaration kind
    pub fn all() -> Self {
        Self::default()
    }

    /// Rule applies only to `kinds`
    pub fn only(kinds: &[DeclarationKind], remove_if_misplaced: bool) -> Self {
        Self {
            mode: LocationMode::OnlyTargeted,
            target_kinds: kinds.to_vec(),
            remove_if_misplaced,
        }
    }

    /// Whether a rule with this location applies to a declaration of `kind`
    pub fn applies_to(&self, kind: DeclarationKind) -> bool {
        match self.mode {
            LocationMode::All => true,
            LocationMode::OnlyTargeted => self.target_kinds.contains(&kind),
        }
    }
}

/// One tag rule from the definition document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagConfigModel {
    pub tag: TagName,

    #[serde(default)]
    pub insert_position: InsertPosition,

    #[serde(default)]
    pub overwrite: OverwritePolicy,

    #[serde(default)]
    pub location: LocationConfig,

    #[serde(default, rename = "value")]
    pub tag_value: String,

    #[serde(default, rename = "description")]
    pub tag_description: String,
}

impl TagConfigModel {
    pub fn new(tag: TagName, tag_value: &str) -> Self {
        Self {
            tag,
            insert_position: InsertPosition::default(),
            overwrite: OverwritePolicy::default(),
            location: LocationConfig::default(),
            tag_value: tag_value.to_string(),
            tag_description: String::new(),
        }
    }

    pub fn with_position(mut self, insert_position: InsertPosition) -> Self {
        self.insert_position = insert_position;
        self
    }

    pub fn with_overwrite(mut self, overwrite: OverwritePolicy) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_location(mut self, location: LocationConfig) -> Self {
        self.location = location;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.tag_description = description.to_string();
        self
    }
}

/// Ordered rule list. Evaluation order is declaration order; nothing is
/// sorted or deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigsModel {
    #[serde(default)]
    pub tags: Vec<TagConfigModel>,
}

impl ConfigsModel {
    pub fn new(tags: Vec<TagConfigModel>) -> Self {
        Self { tags }
    }

    pub fn rules(&self) -> &[TagConfigModel] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Compare two tag values by priority.
///
/// Dotted numeric values (`1.9`, `1.10`, `2`) compare component-wise, with
/// missing components counting as zero. Anything else compares as text.
pub fn compare_priority(left: &str, right: &str) -> Ordering {
    fn numeric(value: &str) -> Option<Vec<u64>> {
        let value = value.trim().trim_start_matches(['v', 'V']);
        if value.is_empty() {
            return None;
        }
        value.split('.').map(|part| part.parse::<u64>().ok()).collect()
    }

    match (numeric(left), numeric(right)) {
        (Some(l), Some(r)) => {
            let width = l.len().max(r.len());
            for i in 0..width {
                let a = l.get(i).copied().unwrap_or(0);
                let b = r.get(i).copied().unwrap_or(0);
                match a.cmp(&b) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        }
        _ => left.trim().cmp(right.trim()),
    }
}
