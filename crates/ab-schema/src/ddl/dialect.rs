use super::identifier::Identifier;
use super::statement::{ColumnDef, ColumnType, DdlStatement, DefaultValue, TriggerBody, TriggerEvent};

/// Estrategia de renderizado SQL inyectada en las conexiones.
///
/// Las definiciones del modelo no dependen del dialecto. `column_type` y
/// `trigger_body` también sirven para comparar con lo que el catálogo
/// devuelve.
pub trait DdlDialect: Send + Sync {
    fn name(&self) -> &'static str;

    fn quote_ident(&self, ident: &Identifier) -> String;

    fn quote_literal(&self, value: &str) -> String;

    fn column_type(&self, ty: &ColumnType) -> String;

    /// Sentencia del trigger, sin la cabecera `CREATE TRIGGER`.
    fn trigger_body(&self, body: &TriggerBody) -> String;

    fn render(&self, stmt: &DdlStatement) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    fn default_value(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Text(s) => self.quote_literal(s),
            DefaultValue::Integer(i) => i.to_string(),
            DefaultValue::Float(f) => f.to_string(),
            DefaultValue::Bool(b) => if *b { "1".into() } else { "0".into() },
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".into(),
        }
    }

    fn column_def(&self, col: &ColumnDef) -> String {
        let mut out = format!("{} {}", self.quote_ident(&col.name), self.column_type(&col.ty));
        out.push_str(if col.nullable { " NULL" } else { " NOT NULL" });
        if let Some(d) = &col.default {
            out.push_str(" DEFAULT ");
            out.push_str(&self.default_value(d));
        }
        if col.auto_increment {
            out.push_str(" AUTO_INCREMENT");
        }
        out
    }

    fn ident_list(&self, idents: &[Identifier]) -> String {
        idents.iter().map(|i| self.quote_ident(i)).collect::<Vec<_>>().join(", ")
    }

}

impl DdlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, ident: &Identifier) -> String {
        format!("`{}`", ident.as_str().replace('`', "``"))
    }

    fn quote_literal(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for c in value.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                other => out.push(other),
            }
        }
        out.push('\'');
        out
    }

    fn column_type(&self, ty: &ColumnType) -> String {
        match ty {
            ColumnType::VarChar(n) => format!("VARCHAR({n})"),
            ColumnType::Text => "TEXT".into(),
            ColumnType::LongText => "LONGTEXT".into(),
            ColumnType::Int => "INT".into(),
            ColumnType::BigInt => "BIGINT".into(),
            ColumnType::Double => "DOUBLE".into(),
            ColumnType::Decimal { precision, scale } => format!("DECIMAL({precision}, {scale})"),
            ColumnType::Boolean => "TINYINT(1)".into(),
            ColumnType::Date => "DATE".into(),
            ColumnType::DateTime => "DATETIME".into(),
            ColumnType::Json => "JSON".into(),
        }
    }

    fn trigger_body(&self, body: &TriggerBody) -> String {
        match body {
            TriggerBody::Concat { target, sources, separator } => {
                let sep = self.quote_literal(separator);
                let parts: Vec<String> = sources.iter().map(|s| format!("NEW.{}", self.quote_ident(s))).collect();
                format!("SET NEW.{} = CONCAT({})", self.quote_ident(target), parts.join(&format!(", {sep}, ")))
            }
        }
    }

    fn render(&self, stmt: &DdlStatement) -> String {
        match stmt {
            DdlStatement::CreateTable { table, columns, primary_key } => {
                let mut defs: Vec<String> = columns.iter().map(|c| self.column_def(c)).collect();
                if let Some(pk) = primary_key {
                    defs.push(format!("PRIMARY KEY ({})", self.quote_ident(pk)));
                }
                format!("CREATE TABLE {} ({}) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
                        self.quote_ident(table),
                        defs.join(", "))
            }
            DdlStatement::DropTable { table } => format!("DROP TABLE {}", self.quote_ident(table)),
            DdlStatement::AddColumn { table, column } => {
                format!("ALTER TABLE {} ADD COLUMN {}", self.quote_ident(table), self.column_def(column))
            }
            DdlStatement::ModifyColumn { table, column } => {
                format!("ALTER TABLE {} MODIFY COLUMN {}", self.quote_ident(table), self.column_def(column))
            }
            DdlStatement::DropColumn { table, column } => {
                format!("ALTER TABLE {} DROP COLUMN {}", self.quote_ident(table), self.quote_ident(column))
            }
            DdlStatement::CreateIndex { table, name, columns, unique } => {
                format!("ALTER TABLE {} ADD {}INDEX {} ({})",
                        self.quote_ident(table),
                        if *unique { "UNIQUE " } else { "" },
                        self.quote_ident(name),
                        self.ident_list(columns))
            }
            DdlStatement::DropIndex { table, name } => {
                format!("ALTER TABLE {} DROP INDEX {}", self.quote_ident(table), self.quote_ident(name))
            }
            DdlStatement::CreateTrigger { name, table, event, body } => {
                let ev = match event {
                    TriggerEvent::Insert => "INSERT",
                    TriggerEvent::Update => "UPDATE",
                };
                format!("CREATE TRIGGER {} BEFORE {} ON {} FOR EACH ROW {}",
                        self.quote_ident(name),
                        ev,
                        self.quote_ident(table),
                        self.trigger_body(body))
            }
            DdlStatement::DropTrigger { name } => format!("DROP TRIGGER {}", self.quote_ident(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    #[test]
    fn renders_unique_index() {
        let sql = MySqlDialect.render(&DdlStatement::CreateIndex { table: id("AB_Invoice"),
                                                                   name: id("UNQ_AB_Invoice_fullName"),
                                                                   columns: vec![id("fullName")],
                                                                   unique: true });
        assert_eq!(sql, "ALTER TABLE `AB_Invoice` ADD UNIQUE INDEX `UNQ_AB_Invoice_fullName` (`fullName`)");
    }

    #[test]
    fn renders_concat_trigger() {
        let sql = MySqlDialect.render(&DdlStatement::CreateTrigger { name: id("AB_Invoice_fullName_update"),
                                                                     table: id("AB_Invoice"),
                                                                     event: TriggerEvent::Update,
                                                                     body: TriggerBody::Concat { target: id("fullName"),
                                                                                                 sources: vec![id("firstName"), id("lastName")],
                                                                                                 separator: "+".into() } });
        assert_eq!(sql,
                   "CREATE TRIGGER `AB_Invoice_fullName_update` BEFORE UPDATE ON `AB_Invoice` FOR EACH ROW \
                    SET NEW.`fullName` = CONCAT(NEW.`firstName`, '+', NEW.`lastName`)");
    }

    #[test]
    fn quoting_escapes_injection_attempts() {
        let d = MySqlDialect;
        assert_eq!(d.quote_ident(&id("a`; DROP TABLE x; --")), "`a``; DROP TABLE x; --`");
        assert_eq!(d.quote_literal("it's \\ fine"), "'it''s \\\\ fine'");
    }

    #[test]
    fn text_columns_drop_defaults() {
        let col = ColumnDef::new(id("notes"), ColumnType::LongText).with_default(Some(DefaultValue::Text("x".into())));
        assert_eq!(MySqlDialect.render(&DdlStatement::AddColumn { table: id("t"), column: col }),
                   "ALTER TABLE `t` ADD COLUMN `notes` LONGTEXT NULL");
    }
}
