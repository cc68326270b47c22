//! Motor de migración: artefactos de esquema, planes ordenados y ejecución
//! idempotente.
//!
//! Orden de creación: tabla -> columnas -> índices -> triggers.
//! Orden de borrado: triggers -> índices -> columnas -> tabla.
//! Cada paso verifica existencia antes de ejecutar y acepta los errores de
//! la clase "ya existe"/"ya no existe" como éxito, de modo que un plan
//! parcialmente aplicado puede re-ejecutarse sin intervención.

mod artifact;
mod changes;
mod engine;
mod plan;

pub use artifact::SchemaArtifact;
pub use changes::ObjectChanges;
pub use engine::{MigrationEngine, MigrationReport, StepOutcome};
pub use plan::{MigrationOp, MigrationPlan, PlanStep};
