//! Column types for model definitions.
//!
//! Everything here is `const`, so a model's columns can live in a `static`:
//!
//! ```
//! use cqlbind::columns::{self, Column, CqlType};
//!
//! static PET_COLUMNS: &[Column] = &[
//!     columns::uuid("owner_id").partition_key(),
//!     columns::timeuuid("pet_id").clustering_key().descending(),
//!     columns::text("name"),
//!     columns::set("tags", &CqlType::Text),
//! ];
//! # assert_eq!(PET_COLUMNS.len(), 4);
//! ```

use std::fmt;

use crate::database::query_builder::quote_identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CqlType {
    Ascii,
    BigInt,
    Blob,
    Boolean,
    Counter,
    Date,
    Decimal,
    Double,
    Duration,
    Float,
    Inet,
    Int,
    SmallInt,
    Text,
    Time,
    Timestamp,
    TimeUuid,
    TinyInt,
    Uuid,
    VarInt,
    List(&'static CqlType),
    Set(&'static CqlType),
    Map(&'static CqlType, &'static CqlType),
    Tuple(&'static [CqlType]),
    Frozen(&'static CqlType),
    /// A user-defined type by its CQL name, always stored frozen.
    UserDefined(&'static str),
}

impl CqlType {
    pub fn is_collection(&self) -> bool {
        matches!(self, CqlType::List(_) | CqlType::Set(_) | CqlType::Map(_, _))
    }
}

impl fmt::Display for CqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CqlType::Ascii => f.write_str("ascii"),
            CqlType::BigInt => f.write_str("bigint"),
            CqlType::Blob => f.write_str("blob"),
            CqlType::Boolean => f.write_str("boolean"),
            CqlType::Counter => f.write_str("counter"),
            CqlType::Date => f.write_str("date"),
            CqlType::Decimal => f.write_str("decimal"),
            CqlType::Double => f.write_str("double"),
            CqlType::Duration => f.write_str("duration"),
            CqlType::Float => f.write_str("float"),
            CqlType::Inet => f.write_str("inet"),
            CqlType::Int => f.write_str("int"),
            CqlType::SmallInt => f.write_str("smallint"),
            CqlType::Text => f.write_str("text"),
            CqlType::Time => f.write_str("time"),
            CqlType::Timestamp => f.write_str("timestamp"),
            CqlType::TimeUuid => f.write_str("timeuuid"),
            CqlType::TinyInt => f.write_str("tinyint"),
            CqlType::Uuid => f.write_str("uuid"),
            CqlType::VarInt => f.write_str("varint"),
            CqlType::List(inner) => write!(f, "list<{}>", inner),
            CqlType::Set(inner) => write!(f, "set<{}>", inner),
            CqlType::Map(key, value) => write!(f, "map<{}, {}>", key, value),
            CqlType::Tuple(items) => {
                f.write_str("tuple<")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(">")
            }
            CqlType::Frozen(inner) => write!(f, "frozen<{}>", inner),
            CqlType::UserDefined(name) => write!(f, "frozen<{}>", quote_identifier(name)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    PartitionKey,
    ClusteringKey,
    Static,
    Regular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusteringOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub cql_type: CqlType,
    pub role: ColumnRole,
    pub order: ClusteringOrder,
    pub indexed: bool,
}

impl Column {
    pub const fn new(name: &'static str, cql_type: CqlType) -> Self {
        Self {
            name,
            cql_type,
            role: ColumnRole::Regular,
            order: ClusteringOrder::Ascending,
            indexed: false,
        }
    }

    pub const fn partition_key(mut self) -> Self {
        self.role = ColumnRole::PartitionKey;
        self
    }

    pub const fn clustering_key(mut self) -> Self {
        self.role = ColumnRole::ClusteringKey;
        self
    }

    pub const fn static_column(mut self) -> Self {
        self.role = ColumnRole::Static;
        self
    }

    /// Only meaningful on clustering keys.
    pub const fn descending(mut self) -> Self {
        self.order = ClusteringOrder::Descending;
        self
    }

    /// Request a secondary index on this column.
    pub const fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(self.role, ColumnRole::PartitionKey | ColumnRole::ClusteringKey)
    }
}

macro_rules! column_constructors {
    ($($fn_name:ident => $variant:ident),* $(,)?) => {
        $(
            pub const fn $fn_name(name: &'static str) -> Column {
                Column::new(name, CqlType::$variant)
            }
        )*
    };
}

column_constructors! {
    ascii => Ascii,
    bigint => BigInt,
    blob => Blob,
    boolean => Boolean,
    counter => Counter,
    date => Date,
    decimal => Decimal,
    double => Double,
    duration => Duration,
    float => Float,
    inet => Inet,
    int => Int,
    smallint => SmallInt,
    text => Text,
    time => Time,
    timestamp => Timestamp,
    timeuuid => TimeUuid,
    tinyint => TinyInt,
    uuid => Uuid,
    varint => VarInt,
}

pub const fn list(name: &'static str, item: &'static CqlType) -> Column {
    Column::new(name, CqlType::List(item))
}

pub const fn set(name: &'static str, item: &'static CqlType) -> Column {
    Column::new(name, CqlType::Set(item))
}

pub const fn map(name: &'static str, key: &'static CqlType, value: &'static CqlType) -> Column {
    Column::new(name, CqlType::Map(key, value))
}

pub const fn tuple(name: &'static str, items: &'static [CqlType]) -> Column {
    Column::new(name, CqlType::Tuple(items))
}

pub const fn user_type(name: &'static str, type_name: &'static str) -> Column {
    Column::new(name, CqlType::UserDefined(type_name))
}
