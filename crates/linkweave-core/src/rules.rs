//! Per category-pair linking quotas.
//!
//! Rules are exchanged as a nested JSON document
//! (`source -> target -> {min_links, max_links}`) and validated once into an
//! immutable [`RuleTable`] before a run starts. Both keep the order the rules
//! were written in, which is the order the allocator visits target
//! categories.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::models::Category;

/// Bounds on suggested outbound links from one category to another.
///
/// `max_links` caps the suggestions. `min_links` is advisory: the allocator
/// never pads a pair up to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkingRule {
    pub min_links: usize,
    pub max_links: usize,
}

impl LinkingRule {
    pub fn new(min_links: usize, max_links: usize) -> Self {
        Self {
            min_links,
            max_links,
        }
    }

    /// Zero/zero means "no links for this pair".
    pub fn is_disabled(&self) -> bool {
        self.min_links == 0 && self.max_links == 0
    }
}

/// Wire form of the rules: `source -> target -> rule`, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulesDocument {
    sources: Vec<(String, Vec<(String, LinkingRule)>)>,
}

impl RulesDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rule for a pair. A pair already present keeps its position.
    pub fn insert(&mut self, source: &str, target: &str, rule: LinkingRule) {
        let idx = match self.sources.iter().position(|(s, _)| s == source) {
            Some(idx) => idx,
            None => {
                self.sources.push((source.to_string(), Vec::new()));
                self.sources.len() - 1
            }
        };
        let targets = &mut self.sources[idx].1;
        match targets.iter_mut().find(|(t, _)| t == target) {
            Some((_, existing)) => *existing = rule,
            None => targets.push((target.to_string(), rule)),
        }
    }

    pub fn get(&self, source: &str, target: &str) -> Option<&LinkingRule> {
        self.sources
            .iter()
            .find(|(s, _)| s == source)
            .and_then(|(_, targets)| targets.iter().find(|(t, _)| t == target))
            .map(|(_, rule)| rule)
    }

    /// Every `(source, target, rule)` entry in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &LinkingRule)> + '_ {
        self.sources.iter().flat_map(|(source, targets)| {
            targets
                .iter()
                .map(move |(target, rule)| (source.as_str(), target.as_str(), rule))
        })
    }

    /// Source category labels in document order.
    pub fn sources(&self) -> impl Iterator<Item = &str> + '_ {
        self.sources.iter().map(|(s, _)| s.as_str())
    }

    /// Number of source categories.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

struct TargetsRef<'a>(&'a [(String, LinkingRule)]);

impl Serialize for TargetsRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (target, rule) in self.0 {
            map.serialize_entry(target, rule)?;
        }
        map.end()
    }
}

impl Serialize for RulesDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sources.len()))?;
        for (source, targets) in &self.sources {
            map.serialize_entry(source, &TargetsRef(targets))?;
        }
        map.end()
    }
}

/// Target map of one source, read in document order.
struct Targets(Vec<(String, LinkingRule)>);

impl<'de> Deserialize<'de> for Targets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TargetsVisitor;

        impl<'de> Visitor<'de> for TargetsVisitor {
            type Value = Targets;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of target category to linking rule")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Targets, A::Error> {
                let mut targets: Vec<(String, LinkingRule)> = Vec::new();
                while let Some((target, rule)) = access.next_entry::<String, LinkingRule>()? {
                    match targets.iter_mut().find(|(t, _)| *t == target) {
                        Some((_, existing)) => *existing = rule,
                        None => targets.push((target, rule)),
                    }
                }
                Ok(Targets(targets))
            }
        }

        deserializer.deserialize_map(TargetsVisitor)
    }
}

impl<'de> Deserialize<'de> for RulesDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = RulesDocument;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of source category to target rules")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<RulesDocument, A::Error> {
                let mut doc = RulesDocument::new();
                while let Some((source, Targets(targets))) = access.next_entry::<String, Targets>()? {
                    for (target, rule) in targets {
                        doc.insert(&source, &target, rule);
                    }
                }
                Ok(doc)
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

/// Validated quota rules keyed by `(source_category, target_category)`, in
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTable {
    rules: Vec<(Category, Category, LinkingRule)>,
}

impl RuleTable {
    /// Empty table (every page takes the unconstrained path).
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a document into a table.
    pub fn from_document(doc: &RulesDocument) -> Result<Self> {
        let mut table = Self::new();
        for (source, target, rule) in doc.iter() {
            table.set_rule(Category::from_label(source), Category::from_label(target), *rule)?;
        }
        Ok(table)
    }

    /// Parse and validate rules JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: RulesDocument = serde_json::from_str(json)
            .map_err(|e| Error::InvalidInput(format!("Malformed linking rules: {}", e)))?;
        Self::from_document(&doc)
    }

    /// Nested document form, suitable for persisting.
    pub fn to_document(&self) -> RulesDocument {
        let mut doc = RulesDocument::new();
        for (source, target, rule) in &self.rules {
            doc.insert(source.as_str(), target.as_str(), *rule);
        }
        doc
    }

    /// Insert or replace one rule. Fails when `min_links > max_links`. A
    /// replaced pair keeps its position.
    pub fn set_rule(&mut self, source: Category, target: Category, rule: LinkingRule) -> Result<()> {
        if rule.min_links > rule.max_links {
            return Err(Error::Config(format!(
                "Rule {} -> {}: min_links ({}) exceeds max_links ({})",
                source, target, rule.min_links, rule.max_links
            )));
        }
        match self
            .rules
            .iter_mut()
            .find(|(s, t, _)| *s == source && *t == target)
        {
            Some((_, _, existing)) => *existing = rule,
            None => self.rules.push((source, target, rule)),
        }
        Ok(())
    }

    /// Rule for a pair; a missing pair reads as zero/zero.
    pub fn get_rule(&self, source: &Category, target: &Category) -> LinkingRule {
        self.rules
            .iter()
            .find(|(s, t, _)| s == source && t == target)
            .map(|(_, _, rule)| *rule)
            .unwrap_or_default()
    }

    /// Whether any rule names `source` as its source category.
    pub fn has_source(&self, source: &Category) -> bool {
        self.rules.iter().any(|(s, _, _)| s == source)
    }

    /// Target rules for one source category, in insertion order.
    pub fn targets_of<'a>(
        &'a self,
        source: &'a Category,
    ) -> impl Iterator<Item = (&'a Category, &'a LinkingRule)> + 'a {
        self.rules
            .iter()
            .filter(move |(s, _, _)| s == source)
            .map(|(_, t, rule)| (t, rule))
    }

    /// Every category named by the table, sorted.
    pub fn segments(&self) -> Vec<String> {
        let mut set = BTreeSet::new();
        for (source, target, _) in &self.rules {
            set.insert(source.to_string());
            set.insert(target.to_string());
        }
        set.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Quotas used when no rules have been stored.
    pub fn default_rules() -> Self {
        let rules = [
            (Category::Blog, Category::Blog, 3, 5),
            (Category::Blog, Category::Categorie, 2, 4),
            (Category::Blog, Category::Produit, 1, 3),
            (Category::Categorie, Category::Blog, 1, 3),
            (Category::Categorie, Category::Categorie, 1, 3),
            (Category::Categorie, Category::Produit, 1, 2),
            (Category::Produit, Category::Blog, 1, 2),
            (Category::Produit, Category::Categorie, 1, 2),
            (Category::Produit, Category::Produit, 1, 2),
        ];
        Self {
            rules: rules
                .into_iter()
                .map(|(s, t, min, max)| (s, t, LinkingRule::new(min, max)))
                .collect(),
        }
    }
}
