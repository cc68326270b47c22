use crate::connection::DdlConnection;
use crate::ddl::{ColumnDef, DdlStatement, Identifier, TriggerBody, TriggerEvent};
use crate::error::DbError;

/// Unidad mínima de esquema que una definición materializa.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaArtifact {
    Table {
        table: Identifier,
        columns: Vec<ColumnDef>,
        primary_key: Option<Identifier>,
    },
    Column {
        table: Identifier,
        column: ColumnDef,
    },
    Index {
        table: Identifier,
        name: Identifier,
        columns: Vec<Identifier>,
        unique: bool,
    },
    Trigger {
        table: Identifier,
        name: Identifier,
        event: TriggerEvent,
        body: TriggerBody,
    },
}

impl SchemaArtifact {
    /// Posición en el orden de dependencias (creación ascendente).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Table { .. } => 0,
            Self::Column { .. } => 1,
            Self::Index { .. } => 2,
            Self::Trigger { .. } => 3,
        }
    }

    pub fn table(&self) -> &Identifier {
        match self {
            Self::Table { table, .. } | Self::Column { table, .. } | Self::Index { table, .. } | Self::Trigger { table, .. } => table,
        }
    }

    /// Clave de identidad (tipo + nombre) usada al comparar versiones.
    pub fn key(&self) -> (u8, String, String) {
        let name = match self {
            Self::Table { table, .. } => table.to_string(),
            Self::Column { column, .. } => column.name.to_string(),
            Self::Index { name, .. } | Self::Trigger { name, .. } => name.to_string(),
        };
        (self.rank(), self.table().to_string(), name)
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Table { table, .. } => format!("table `{table}`"),
            Self::Column { column, .. } => format!("column `{}`", column.name),
            Self::Index { name, .. } => format!("index `{name}`"),
            Self::Trigger { name, .. } => format!("trigger `{name}`"),
        }
    }

    pub async fn exists<C>(&self, conn: &mut C) -> Result<bool, DbError>
        where C: DdlConnection + ?Sized
    {
        match self {
            Self::Table { table, .. } => conn.table_exists(table).await,
            Self::Column { table, column } => conn.column_exists(table, &column.name).await,
            Self::Index { table, name, .. } => conn.index_exists(table, name).await,
            Self::Trigger { name, .. } => conn.trigger_exists(name).await,
        }
    }

    /// `true` si el catálogo ya tiene el artefacto con esta misma definición.
    pub async fn matches<C>(&self, conn: &mut C) -> Result<bool, DbError>
        where C: DdlConnection + ?Sized
    {
        match self {
            Self::Table { table, .. } => conn.table_exists(table).await,
            Self::Column { table, column } => conn.column_matches(table, column).await,
            Self::Index { table, name, columns, unique } => conn.index_matches(table, name, columns, *unique).await,
            Self::Trigger { table, name, event, body } => conn.trigger_matches(name, table, *event, body).await,
        }
    }

    pub fn create_statement(&self) -> DdlStatement {
        match self {
            Self::Table { table, columns, primary_key } => DdlStatement::CreateTable { table: table.clone(),
                                                                                     columns: columns.clone(),
                                                                                     primary_key: primary_key.clone() },
            Self::Column { table, column } => DdlStatement::AddColumn { table: table.clone(),
                                                                       column: column.clone() },
            Self::Index { table, name, columns, unique } => DdlStatement::CreateIndex { table: table.clone(),
                                                                                      name: name.clone(),
                                                                                      columns: columns.clone(),
                                                                                      unique: *unique },
            Self::Trigger { table, name, event, body } => DdlStatement::CreateTrigger { name: name.clone(),
                                                                                      table: table.clone(),
                                                                                      event: *event,
                                                                                      body: body.clone() },
        }
    }

    pub fn drop_statement(&self) -> DdlStatement {
        match self {
            Self::Table { table, .. } => DdlStatement::DropTable { table: table.clone() },
            Self::Column { table, column } => DdlStatement::DropColumn { table: table.clone(),
                                                                        column: column.name.clone() },
            Self::Index { table, name, .. } => DdlStatement::DropIndex { table: table.clone(),
                                                                         name: name.clone() },
            Self::Trigger { name, .. } => DdlStatement::DropTrigger { name: name.clone() },
        }
    }
}
