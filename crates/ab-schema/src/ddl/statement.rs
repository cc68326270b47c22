use serde::{Deserialize, Serialize};

use super::identifier::Identifier;

/// Tipos de columna soportados por el modelo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnType {
    VarChar(u16),
    Text,
    LongText,
    Int,
    BigInt,
    Double,
    Decimal { precision: u8, scale: u8 },
    Boolean,
    Date,
    DateTime,
    Json,
}

impl ColumnType {
    /// MySQL no admite `DEFAULT` literal en columnas TEXT/BLOB/JSON.
    pub fn accepts_default(&self) -> bool {
        !matches!(self, Self::Text | Self::LongText | Self::Json)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    CurrentTimestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: Identifier,
    pub ty: ColumnType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub auto_increment: bool,
}

impl ColumnDef {
    pub fn new(name: Identifier, ty: ColumnType) -> Self {
        Self { name,
               ty,
               nullable: true,
               default: None,
               auto_increment: false }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: Option<DefaultValue>) -> Self {
        self.default = default.filter(|_| self.ty.accepts_default());
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.nullable = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEvent {
    Insert,
    Update,
}

/// Cuerpo de un trigger `BEFORE ... FOR EACH ROW`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TriggerBody {
    /// `SET NEW.target = CONCAT(NEW.s1, 'sep', NEW.s2, ...)`
    Concat {
        target: Identifier,
        sources: Vec<Identifier>,
        separator: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DdlStatement {
    CreateTable {
        table: Identifier,
        columns: Vec<ColumnDef>,
        primary_key: Option<Identifier>,
    },
    DropTable {
        table: Identifier,
    },
    AddColumn {
        table: Identifier,
        column: ColumnDef,
    },
    ModifyColumn {
        table: Identifier,
        column: ColumnDef,
    },
    DropColumn {
        table: Identifier,
        column: Identifier,
    },
    CreateIndex {
        table: Identifier,
        name: Identifier,
        columns: Vec<Identifier>,
        unique: bool,
    },
    DropIndex {
        table: Identifier,
        name: Identifier,
    },
    CreateTrigger {
        name: Identifier,
        table: Identifier,
        event: TriggerEvent,
        body: TriggerBody,
    },
    DropTrigger {
        name: Identifier,
    },
}

impl DdlStatement {
    /// Tabla afectada (los DROP TRIGGER no la conocen).
    pub fn table(&self) -> Option<&Identifier> {
        match self {
            Self::CreateTable { table, .. }
            | Self::DropTable { table }
            | Self::AddColumn { table, .. }
            | Self::ModifyColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::CreateTrigger { table, .. } => Some(table),
            Self::DropTrigger { .. } => None,
        }
    }
}
