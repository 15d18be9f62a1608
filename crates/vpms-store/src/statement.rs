//! Parameterized statements over the storage tables
//!
//! The lookup engine never builds SQL strings itself. It plans a list of
//! [`Statement`] values which a [`Session`](crate::Session) executes. Each
//! statement renders to the equivalent native SQL for logging and for
//! SQL-backed sessions.

use crate::mapping::{ClassificationTable, StorageMapping};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Bound statement parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Param {
    /// String value
    Text(String),
    /// Object or lookup id
    Id(u64),
}

impl Param {
    /// Id value, if this is an id
    #[inline]
    #[must_use]
    pub fn as_id(&self) -> Option<u64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Text(_) => None,
        }
    }

    /// Text value, if this is text
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Id(_) => None,
        }
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "'{text}'"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// One result row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row(pub Vec<Param>);

impl Row {
    /// First column as an id
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.0.first().and_then(Param::as_id)
    }
}

/// Statement the lookup engine can issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    /// Objects of `archetype` whose details entry `name` equals `code`
    DetailsExists {
        /// Storage mapping of the owning archetype
        mapping: StorageMapping,
        /// Owning archetype short name
        archetype: String,
        /// Details entry name
        name: String,
        /// Lookup code
        code: String,
    },

    /// Rewrite details entry `name` from `old_code` to `new_code`
    DetailsUpdate {
        /// Storage mapping of the owning archetype
        mapping: StorageMapping,
        /// Owning archetype short name
        archetype: String,
        /// Details entry name
        name: String,
        /// Code being replaced
        old_code: String,
        /// Replacement code
        new_code: String,
    },

    /// Objects of `archetype` whose `column` equals `code`
    ColumnExists {
        /// Storage mapping of the owning archetype
        mapping: StorageMapping,
        /// Owning archetype short name
        archetype: String,
        /// Column name
        column: String,
        /// Lookup code
        code: String,
    },

    /// Rewrite `column` from `old_code` to `new_code`
    ColumnUpdate {
        /// Storage mapping of the owning archetype
        mapping: StorageMapping,
        /// Owning archetype short name
        archetype: String,
        /// Column name
        column: String,
        /// Code being replaced
        old_code: String,
        /// Replacement code
        new_code: String,
    },

    /// Classification rows referencing `lookup_id`
    ClassificationExists {
        /// Classification table
        classification: ClassificationTable,
        /// Lookup id
        lookup_id: u64,
    },

    /// Reassign classification rows from `old_id` to `new_id`, skipping
    /// owners already classified with `new_id`
    ClassificationMerge {
        /// Classification table
        classification: ClassificationTable,
        /// Id of the lookup being replaced
        old_id: u64,
        /// Id of the replacement lookup
        new_id: u64,
    },

    /// Delete every classification row referencing `lookup_id`
    ClassificationDelete {
        /// Classification table
        classification: ClassificationTable,
        /// Lookup id
        lookup_id: u64,
    },

    /// Delete an object and its details
    DeleteObject {
        /// Storage mapping of the owning archetype
        mapping: StorageMapping,
        /// Object id
        id: u64,
    },
}

impl Statement {
    /// True if the statement modifies data
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::DetailsExists { .. } | Self::ColumnExists { .. } | Self::ClassificationExists { .. }
        )
    }

    /// Table the statement targets
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::DetailsExists { mapping, .. }
            | Self::DetailsUpdate { mapping, .. }
            | Self::ColumnExists { mapping, .. }
            | Self::ColumnUpdate { mapping, .. }
            | Self::DeleteObject { mapping, .. } => &mapping.table,
            Self::ClassificationExists { classification, .. }
            | Self::ClassificationMerge { classification, .. }
            | Self::ClassificationDelete { classification, .. } => &classification.table,
        }
    }

    /// Native SQL with named parameters
    #[must_use]
    pub fn sql(&self) -> String {
        match self {
            Self::DetailsExists { mapping, .. } => format!(
                "select t.{id} from {table} t join {details} d on t.{id} = d.{id} \
                 where t.arch_short_name = :archetype and d.name = :name and d.value = :code",
                id = mapping.join_column,
                table = mapping.table,
                details = mapping.details,
            ),
            Self::DetailsUpdate { mapping, .. } => format!(
                "update {table} t join {details} d on t.{id} = d.{id} set d.value = :newCode \
                 where t.arch_short_name = :archetype and d.name = :name and d.value = :oldCode",
                id = mapping.join_column,
                table = mapping.table,
                details = mapping.details,
            ),
            Self::ColumnExists { mapping, column, .. } => format!(
                "select t.{id} from {table} t where t.arch_short_name = :archetype and t.{column} = :code",
                id = mapping.join_column,
                table = mapping.table,
            ),
            Self::ColumnUpdate { mapping, column, .. } => format!(
                "update {table} set {column} = :newCode \
                 where arch_short_name = :archetype and {column} = :oldCode",
                table = mapping.table,
            ),
            Self::ClassificationExists { classification, .. } => format!(
                "select * from {table} t where t.lookup_id = :id",
                table = classification.table,
            ),
            Self::ClassificationMerge { classification, .. } => format!(
                "update {table} c1 left join {table} c2 on c1.{owner} = c2.{owner} and c2.lookup_id = :newId \
                 set c1.lookup_id = :newId where c1.lookup_id = :oldId and c2.lookup_id is null",
                table = classification.table,
                owner = classification.owner_column,
            ),
            Self::ClassificationDelete { classification, .. } => format!(
                "delete from {table} where lookup_id = :oldId",
                table = classification.table,
            ),
            Self::DeleteObject { mapping, .. } => format!(
                "delete t, d from {table} t left join {details} d on t.{id} = d.{id} where t.{id} = :id",
                id = mapping.join_column,
                table = mapping.table,
                details = mapping.details,
            ),
        }
    }

    /// Named parameter bindings
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, Param)> {
        let text = |s: &String| Param::Text(s.clone());
        match self {
            Self::DetailsExists {
                archetype, name, code, ..
            } => vec![
                ("archetype", text(archetype)),
                ("name", text(name)),
                ("code", text(code)),
            ],
            Self::DetailsUpdate {
                archetype,
                name,
                old_code,
                new_code,
                ..
            } => vec![
                ("archetype", text(archetype)),
                ("name", text(name)),
                ("oldCode", text(old_code)),
                ("newCode", text(new_code)),
            ],
            Self::ColumnExists { archetype, code, .. } => {
                vec![("archetype", text(archetype)), ("code", text(code))]
            }
            Self::ColumnUpdate {
                archetype,
                old_code,
                new_code,
                ..
            } => vec![
                ("archetype", text(archetype)),
                ("oldCode", text(old_code)),
                ("newCode", text(new_code)),
            ],
            Self::ClassificationExists { lookup_id, .. } => vec![("id", Param::Id(*lookup_id))],
            Self::ClassificationMerge { old_id, new_id, .. } => {
                vec![("oldId", Param::Id(*old_id)), ("newId", Param::Id(*new_id))]
            }
            Self::ClassificationDelete { lookup_id, .. } => vec![("oldId", Param::Id(*lookup_id))],
            Self::DeleteObject { id, .. } => vec![("id", Param::Id(*id))],
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql())?;
        let params = self.params();
        if !params.is_empty() {
            f.write_str(" [")?;
            for (i, (name, value)) in params.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{name}={value}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn contacts() -> StorageMapping {
        StorageMapping::new("Contact", "contacts", "contact_details", "contact_id")
    }

    #[test]
    fn details_update_sql() {
        let statement = Statement::DetailsUpdate {
            mapping: contacts(),
            archetype: "contact.location".into(),
            name: "state".into(),
            old_code: "VIC".into(),
            new_code: "VICTORIA".into(),
        };
        assert_eq!(
            statement.sql(),
            "update contacts t join contact_details d on t.contact_id = d.contact_id set d.value = :newCode \
             where t.arch_short_name = :archetype and d.name = :name and d.value = :oldCode"
        );
        assert!(statement.is_mutation());
        assert_eq!(statement.table(), "contacts");
    }

    #[test]
    fn merge_sql_guards_existing_owner() {
        let statement = Statement::ClassificationMerge {
            classification: ClassificationTable::new("Entity", "entity_classifications", "entity_id"),
            old_id: 1,
            new_id: 2,
        };
        let sql = statement.sql();
        assert!(sql.contains("left join entity_classifications c2 on c1.entity_id = c2.entity_id"));
        assert!(sql.ends_with("c2.lookup_id is null"));
        assert_eq!(
            statement.params(),
            vec![("oldId", Param::Id(1)), ("newId", Param::Id(2))]
        );
    }

    #[test]
    fn probes_are_not_mutations() {
        let probe = Statement::ColumnExists {
            mapping: StorageMapping::new("Act", "acts", "act_details", "act_id"),
            archetype: "act.customerEstimation".into(),
            column: "status".into(),
            code: "IN_PROGRESS".into(),
        };
        assert!(!probe.is_mutation());
        assert_eq!(
            probe.sql(),
            "select t.act_id from acts t where t.arch_short_name = :archetype and t.status = :code"
        );
    }

    #[test]
    fn display_includes_bindings() {
        let statement = Statement::ClassificationDelete {
            classification: ClassificationTable::new("Contact", "contact_classifications", "contact_id"),
            lookup_id: 7,
        };
        assert_eq!(
            statement.to_string(),
            "delete from contact_classifications where lookup_id = :oldId [oldId=7]"
        );
    }
}
