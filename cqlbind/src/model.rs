//! Model definitions, the process-wide model registry, and subclass enumeration.
//!
//! A model is a `static ModelDef` registered with [`register_model!`](crate::register_model).
//! Models name their parent instead of inheriting from it; a child gets its
//! ancestors' columns ahead of its own.
//!
//! ```
//! use cqlbind::columns;
//! use cqlbind::model::ModelDef;
//!
//! pub static PET: ModelDef = ModelDef::table("Pet")
//!     .abstract_model()
//!     .columns(&[columns::uuid("owner_id").partition_key(), columns::text("name")]);
//!
//! pub static CAT: ModelDef = ModelDef::table("Cat")
//!     .extends("Pet")
//!     .columns(&[columns::float("cuteness")]);
//!
//! cqlbind::register_model!(PET);
//! cqlbind::register_model!(CAT);
//! ```

use convert_case::{Case, Casing};
use lazy_static::lazy_static;
use std::collections::HashSet;
use tracing::warn;

use crate::columns::{Column, ColumnRole};
use crate::errors::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Table,
    UserType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDef {
    pub name: &'static str,
    pub kind: ModelKind,
    pub parent: Option<&'static str>,
    pub is_abstract: bool,
    pub cql_name: Option<&'static str>,
    pub columns: &'static [Column],
}

impl ModelDef {
    pub const fn table(name: &'static str) -> Self {
        Self::new(name, ModelKind::Table)
    }

    pub const fn user_type(name: &'static str) -> Self {
        Self::new(name, ModelKind::UserType)
    }

    const fn new(name: &'static str, kind: ModelKind) -> Self {
        Self {
            name,
            kind,
            parent: None,
            is_abstract: false,
            cql_name: None,
            columns: &[],
        }
    }

    pub const fn extends(mut self, parent: &'static str) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Abstract models have no table of their own; they only pass columns on.
    pub const fn abstract_model(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Explicit table (or type) name instead of the snake_case model name.
    pub const fn named(mut self, cql_name: &'static str) -> Self {
        self.cql_name = Some(cql_name);
        self
    }

    pub const fn columns(mut self, columns: &'static [Column]) -> Self {
        self.columns = columns;
        self
    }

    pub fn cql_name(&self) -> String {
        match self.cql_name {
            Some(name) => name.to_string(),
            None => self.name.to_case(Case::Snake),
        }
    }
}

/// Inventory entry produced by [`register_model!`](crate::register_model).
pub struct RegisteredModel {
    pub def: &'static ModelDef,
    pub file: &'static str,
    pub line: u32,
}

impl RegisteredModel {
    pub const fn new(def: &'static ModelDef, file: &'static str, line: u32) -> Self {
        Self { def, file, line }
    }
}

inventory::collect!(RegisteredModel);

/// Register a `static ModelDef` with the process-wide registry.
#[macro_export]
macro_rules! register_model {
    ($def:path) => {
        $crate::inventory::submit! {
            $crate::model::RegisteredModel::new(&$def, file!(), line!())
        }
    };
}

lazy_static! {
    static ref GLOBAL_REGISTRY: ModelRegistry = ModelRegistry::from_inventory();
}

/// Ordered set of model definitions.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<&'static ModelDef>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every model registered through `register_model!`, in (file, line) order.
    pub fn global() -> &'static ModelRegistry {
        &GLOBAL_REGISTRY
    }

    fn from_inventory() -> Self {
        let mut entries: Vec<&RegisteredModel> = inventory::iter::<RegisteredModel>.into_iter().collect();
        entries.sort_by(|a, b| (a.file, a.line).cmp(&(b.file, b.line)));

        let mut registry = Self::new();
        for entry in entries {
            if let Err(e) = registry.register(entry.def) {
                warn!("Skipping model registered at {}:{}: {}", entry.file, entry.line, e);
            }
        }
        registry
    }

    pub fn register(&mut self, def: &'static ModelDef) -> Result<(), SchemaError> {
        if self.get(def.name).is_some() {
            return Err(SchemaError::invalid_model(def.name, "registered more than once"));
        }
        self.models.push(def);
        Ok(())
    }

    pub fn with(mut self, def: &'static ModelDef) -> Result<Self, SchemaError> {
        self.register(def)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&'static ModelDef> {
        self.models.iter().copied().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ModelDef> + '_ {
        self.models.iter().copied()
    }

    /// Direct children of `parent` (roots when `None`), in registration order.
    pub fn subclasses(&self, parent: Option<&str>) -> Vec<&'static ModelDef> {
        self.models
            .iter()
            .copied()
            .filter(|m| m.parent == parent)
            .collect()
    }

    /// Concrete models reachable from `base`, depth-first in registration order.
    ///
    /// An abstract model contributes only its descendants. A concrete model
    /// contributes itself and then its concrete descendants, since every
    /// concrete subclass owns a table of its own.
    pub fn concrete_models(&self, base: &str) -> Result<Vec<&'static ModelDef>, SchemaError> {
        let root = self
            .get(base)
            .ok_or_else(|| SchemaError::UnknownModel(base.to_string()))?;

        let mut found = Vec::new();
        let mut visited = HashSet::new();
        self.collect_concrete(root, &mut visited, &mut found);
        Ok(found)
    }

    fn collect_concrete(
        &self,
        model: &'static ModelDef,
        visited: &mut HashSet<&'static str>,
        found: &mut Vec<&'static ModelDef>,
    ) {
        if !visited.insert(model.name) {
            return;
        }
        if !model.is_abstract {
            found.push(model);
        }
        for child in self.subclasses(Some(model.name)) {
            self.collect_concrete(child, visited, found);
        }
    }

    pub fn concrete_tables(&self) -> Vec<&'static ModelDef> {
        self.concrete_of_kind(ModelKind::Table)
    }

    pub fn concrete_types(&self) -> Vec<&'static ModelDef> {
        self.concrete_of_kind(ModelKind::UserType)
    }

    fn concrete_of_kind(&self, kind: ModelKind) -> Vec<&'static ModelDef> {
        let mut found = Vec::new();
        let mut visited = HashSet::new();
        for root in self.subclasses(None).into_iter().filter(|m| m.kind == kind) {
            self.collect_concrete(root, &mut visited, &mut found);
        }
        found
    }

    /// Ancestors first, `model` last.
    pub fn lineage(&self, model: &'static ModelDef) -> Result<Vec<&'static ModelDef>, SchemaError> {
        let mut chain = vec![model];
        let mut seen: HashSet<&str> = HashSet::from([model.name]);
        let mut current = model;

        while let Some(parent_name) = current.parent {
            let parent = self.get(parent_name).ok_or_else(|| {
                SchemaError::invalid_model(current.name, format!("unknown parent '{}'", parent_name))
            })?;
            if !seen.insert(parent.name) {
                return Err(SchemaError::invalid_model(model.name, "inheritance cycle"));
            }
            if parent.kind != current.kind {
                return Err(SchemaError::invalid_model(
                    current.name,
                    format!("parent '{}' is a different kind of model", parent.name),
                ));
            }
            chain.push(parent);
            current = parent;
        }

        chain.reverse();
        Ok(chain)
    }

    /// Columns of `model` including inherited ones; a redeclared name keeps the nearest definition.
    pub fn effective_columns(&self, model: &'static ModelDef) -> Result<Vec<Column>, SchemaError> {
        let mut columns: Vec<Column> = Vec::new();
        for ancestor in self.lineage(model)? {
            for column in ancestor.columns {
                match columns.iter_mut().find(|c| c.name == column.name) {
                    Some(existing) => *existing = *column,
                    None => columns.push(*column),
                }
            }
        }
        Ok(columns)
    }

    /// Check a concrete model's shape before any DDL is generated for it.
    pub fn validate(&self, model: &'static ModelDef) -> Result<Vec<Column>, SchemaError> {
        if model.is_abstract {
            return Err(SchemaError::invalid_model(model.name, "abstract models have no table"));
        }
        let columns = self.effective_columns(model)?;

        match model.kind {
            ModelKind::Table => {
                if !columns.iter().any(|c| c.role == ColumnRole::PartitionKey) {
                    return Err(SchemaError::invalid_model(model.name, "no partition key column"));
                }
                if let Some(column) = columns
                    .iter()
                    .find(|c| c.is_primary_key() && c.cql_type.is_collection())
                {
                    return Err(SchemaError::invalid_model(
                        model.name,
                        format!("key column '{}' cannot be a collection", column.name),
                    ));
                }
            }
            ModelKind::UserType => {
                if columns.is_empty() {
                    return Err(SchemaError::invalid_model(model.name, "user types need at least one field"));
                }
                if let Some(column) = columns.iter().find(|c| c.role != ColumnRole::Regular) {
                    return Err(SchemaError::invalid_model(
                        model.name,
                        format!("field '{}' cannot be a key or static column", column.name),
                    ));
                }
            }
        }
        Ok(columns)
    }

    /// Every model must reach a root of its own kind.
    ///
    /// `concrete_tables` and `concrete_types` walk down from the roots, so a
    /// model with an unknown parent or a parent cycle would never be visited.
    pub fn check_lineages(&self) -> Result<(), SchemaError> {
        for model in self.iter() {
            self.lineage(model)?;
        }
        Ok(())
    }

    /// Validate every concrete model in the registry.
    pub fn validate_all(&self) -> Result<(), SchemaError> {
        self.check_lineages()?;
        for model in self.iter() {
            if !model.is_abstract {
                self.validate(model)?;
            }
        }
        Ok(())
    }
}
