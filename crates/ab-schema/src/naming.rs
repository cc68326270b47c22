//! Derivación de nombres de tablas, índices y triggers.
//!
//! MySQL limita los identificadores a 64 caracteres. Los nombres compuestos
//! truncan cada componente a 15 caracteres antes de concatenar, por lo que
//! dos pares (tabla, columna) con los mismos prefijos de 15 caracteres
//! producen el mismo nombre. Es una restricción conocida del esquema de
//! nombres; `ObjectDefinition::validate` la reporta dentro de una misma
//! tabla.

/// Longitud máxima de un identificador MySQL.
pub const MAX_IDENTIFIER_LEN: usize = 64;
/// Longitud a la que se trunca cada componente de un nombre derivado.
pub const NAME_COMPONENT_LEN: usize = 15;

/// Prefijo de las tablas de objetos.
pub const OBJECT_TABLE_PREFIX: &str = "AB_";

/// Trunca por caracteres (no bytes) para no cortar un code point.
pub fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

fn cap(value: String) -> String {
    if value.chars().count() > MAX_IDENTIFIER_LEN {
        truncate(&value, MAX_IDENTIFIER_LEN)
    } else {
        value
    }
}

/// Reemplaza todo carácter fuera de `[A-Za-z0-9_]` por `_`.
pub fn sanitize(value: &str) -> String {
    value.chars()
         .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
         .collect()
}

/// Nombre de tabla de un objeto sin nombre explícito.
pub fn object_table_name(object_name: &str) -> String {
    cap(format!("{OBJECT_TABLE_PREFIX}{}", sanitize(object_name)))
}

fn trigger_name(table: &str, column: &str, event: &str) -> String {
    cap(format!("{}_{}_{}",
                truncate(table, NAME_COMPONENT_LEN),
                truncate(column, NAME_COMPONENT_LEN),
                event))
}

/// Trigger `BEFORE UPDATE` de una columna calculada.
pub fn update_trigger_name(table: &str, column: &str) -> String {
    trigger_name(table, column, "update")
}

/// Trigger `BEFORE INSERT` de una columna calculada.
pub fn insert_trigger_name(table: &str, column: &str) -> String {
    trigger_name(table, column, "insert")
}

/// Nombre de índice: `IDX_`/`UNQ_` + tabla + columnas, cada parte truncada.
pub fn index_name(table: &str, columns: &[&str], unique: bool) -> String {
    let prefix = if unique { "UNQ" } else { "IDX" };
    let mut parts = Vec::with_capacity(columns.len() + 2);
    parts.push(prefix.to_string());
    parts.push(truncate(table, NAME_COMPONENT_LEN));
    parts.extend(columns.iter().map(|c| truncate(c, NAME_COMPONENT_LEN)));
    cap(parts.join("_"))
}

/// Tabla de unión de un campo connectObject many.
pub fn join_table_name(table: &str, column: &str) -> String {
    cap(format!("AB_JOIN_{}_{}",
                truncate(table, NAME_COMPONENT_LEN),
                truncate(column, NAME_COMPONENT_LEN)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_trigger_name_truncates_each_component() {
        let name = update_trigger_name("AB_Invoice_Management_Table", "customerFullNameIndex");
        assert_eq!(name, "AB_Invoice_Mana_customerFullNam_update");
        // estable entre llamadas
        assert_eq!(name, update_trigger_name("AB_Invoice_Management_Table", "customerFullNameIndex"));
    }

    #[test]
    fn short_names_are_kept_verbatim() {
        assert_eq!(update_trigger_name("AB_Invoice", "fullName"), "AB_Invoice_fullName_update");
        assert_eq!(insert_trigger_name("AB_Invoice", "fullName"), "AB_Invoice_fullName_insert");
    }

    #[test]
    fn distinct_pairs_sharing_prefixes_collide() {
        // Restricción documentada: el truncado a 15 caracteres hace colisionar
        // columnas que sólo difieren después del carácter 15.
        let a = update_trigger_name("AB_Invoice_2023_q1", "customerFullName_a");
        let b = update_trigger_name("AB_Invoice_2023_q2", "customerFullName_b");
        assert_eq!(a, b);
    }

    #[test]
    fn index_name_is_deterministic_and_bounded() {
        let cols = ["aVeryLongColumnNameNumberOne", "aVeryLongColumnNameNumberTwo", "third", "fourth"];
        let n1 = index_name("AB_Some_Really_Long_Table", &cols, true);
        let n2 = index_name("AB_Some_Really_Long_Table", &cols, true);
        assert_eq!(n1, n2);
        assert!(n1.chars().count() <= MAX_IDENTIFIER_LEN);
        assert!(n1.starts_with("UNQ_AB_Some_Really_"));
        assert_ne!(n1, index_name("AB_Some_Really_Long_Table", &cols, false));
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        assert_eq!(truncate("ñandú_ñandú_ñandú", 15), "ñandú_ñandú_ñan");
    }

    #[test]
    fn object_table_name_sanitizes() {
        assert_eq!(object_table_name("Purchase Order"), "AB_Purchase_Order");
        assert_eq!(object_table_name("Invoice-2"), "AB_Invoice_2");
    }
}
