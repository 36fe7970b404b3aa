//! Schema descriptors
//!
//! Classes and properties as supplied by the external metadata store. The
//! record engine only reads them; building and storing schemas is the
//! provider's business.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::field_type::FieldType;

/// A declared property of a class
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    /// Property (field) name
    pub name: String,
    /// Declared field type
    pub field_type: FieldType,
    /// Element type of embedded collections
    pub linked_type: Option<FieldType>,
    /// Class of linked or embedded records
    pub linked_class: Option<String>,
    /// Field must exist on the record
    pub mandatory: bool,
    /// Field must not be null
    pub not_null: bool,
    /// Field may not change once persisted
    pub readonly: bool,
    /// Lower bound, interpreted per type
    pub min: Option<String>,
    /// Upper bound, interpreted per type
    pub max: Option<String>,
    /// Full-match pattern for string values
    pub regex: Option<String>,
    /// Default value in text form
    pub default_value: Option<String>,
    compiled: OnceCell<Option<Regex>>,
}

impl PropertyDescriptor {
    /// Create a property with no constraints
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        PropertyDescriptor {
            name: name.into(),
            field_type,
            linked_type: None,
            linked_class: None,
            mandatory: false,
            not_null: false,
            readonly: false,
            min: None,
            max: None,
            regex: None,
            default_value: None,
            compiled: OnceCell::new(),
        }
    }

    /// Set the element type of embedded collections
    pub fn linked_type(mut self, t: FieldType) -> Self {
        self.linked_type = Some(t);
        self
    }

    /// Set the class of linked or embedded records
    pub fn linked_class(mut self, class: impl Into<String>) -> Self {
        self.linked_class = Some(class.into());
        self
    }

    /// Mark the property mandatory
    pub fn mandatory(mut self, v: bool) -> Self {
        self.mandatory = v;
        self
    }

    /// Mark the property not-null
    pub fn not_null(mut self, v: bool) -> Self {
        self.not_null = v;
        self
    }

    /// Mark the property read-only
    pub fn readonly(mut self, v: bool) -> Self {
        self.readonly = v;
        self
    }

    /// Set the lower bound
    pub fn min(mut self, v: impl Into<String>) -> Self {
        self.min = Some(v.into());
        self
    }

    /// Set the upper bound
    pub fn max(mut self, v: impl Into<String>) -> Self {
        self.max = Some(v.into());
        self
    }

    /// Set the full-match pattern
    pub fn regex(mut self, pattern: impl Into<String>) -> Self {
        self.regex = Some(pattern.into());
        self.compiled = OnceCell::new();
        self
    }

    /// Set the default value
    pub fn default_value(mut self, v: impl Into<String>) -> Self {
        self.default_value = Some(v.into());
        self
    }

    /// Does `s` match the whole declared pattern
    ///
    /// Properties without a pattern match everything. The pattern is
    /// compiled on first use.
    pub fn matches_regex(&self, s: &str) -> Result<bool> {
        let Some(pattern) = &self.regex else {
            return Ok(true);
        };
        let compiled = self
            .compiled
            .get_or_try_init(|| {
                Regex::new(&format!("^(?:{})$", pattern))
                    .map(Some)
                    .map_err(|e| Error::invalid_argument(format!("bad regex '{}': {}", pattern, e)))
            })?;
        Ok(compiled.as_ref().map_or(true, |re| re.is_match(s)))
    }
}

/// A schema class
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    /// Canonical class name
    pub name: String,
    /// Direct super classes
    pub super_classes: Vec<String>,
    /// Reject fields that are not declared
    pub strict_mode: bool,
    /// Abstract classes have no records of their own
    pub is_abstract: bool,
    /// Clusters holding records of this class
    pub cluster_ids: Vec<i32>,
    /// Declared properties, own and inherited
    pub properties: Vec<PropertyDescriptor>,
}

impl ClassDescriptor {
    /// Create an empty, non-strict class
    pub fn new(name: impl Into<String>) -> Self {
        ClassDescriptor {
            name: name.into(),
            super_classes: Vec::new(),
            strict_mode: false,
            is_abstract: false,
            cluster_ids: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Add a super class
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.super_classes.push(parent.into());
        self
    }

    /// Set strict mode
    pub fn strict(mut self, v: bool) -> Self {
        self.strict_mode = v;
        self
    }

    /// Mark abstract
    pub fn abstract_class(mut self, v: bool) -> Self {
        self.is_abstract = v;
        self
    }

    /// Add a cluster
    pub fn cluster(mut self, id: i32) -> Self {
        self.cluster_ids.push(id);
        self
    }

    /// Add a property
    pub fn property(mut self, p: PropertyDescriptor) -> Self {
        self.properties.push(p);
        self
    }

    /// Look up a declared property
    pub fn get_property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Does the class declare `name`
    pub fn has_property(&self, name: &str) -> bool {
        self.get_property(name).is_some()
    }
}

/// Source of class definitions
pub trait SchemaProvider: Send + Sync {
    /// Resolve a class by name (case-insensitive)
    fn class(&self, name: &str) -> Option<Arc<ClassDescriptor>>;

    /// Monotonic schema version; cached classes are refreshed when it moves
    fn version(&self) -> u64;

    /// Class owning a cluster
    fn class_by_cluster(&self, cluster: i32) -> Option<Arc<ClassDescriptor>>;

    /// Is `class` equal to or a descendant of `parent`
    fn is_subclass_of(&self, class: &str, parent: &str) -> bool {
        let mut pending = vec![class.to_string()];
        let mut seen: Vec<String> = Vec::new();
        while let Some(current) = pending.pop() {
            if current.eq_ignore_ascii_case(parent) {
                return true;
            }
            if seen.iter().any(|s| s.eq_ignore_ascii_case(&current)) {
                continue;
            }
            if let Some(c) = self.class(&current) {
                pending.extend(c.super_classes.iter().cloned());
            }
            seen.push(current);
        }
        false
    }
}
