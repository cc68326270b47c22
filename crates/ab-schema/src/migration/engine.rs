use log::{debug, info, warn};
use serde::Serialize;

use super::artifact::SchemaArtifact;
use super::changes::ObjectChanges;
use super::plan::{MigrationOp, MigrationPlan, PlanStep};
use crate::connection::DdlConnection;
use crate::error::{DbError, MigrationError, SchemaError};
use crate::object::ObjectDefinition;

/// Resultado de un paso individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepOutcome {
    Applied,
    AlreadyPresent,
    AlreadyAbsent,
}

/// Resumen de una migración: pasos aplicados y pasos omitidos por ya estar
/// en el estado deseado.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

impl MigrationReport {
    /// `true` si no se ejecutó ninguna sentencia.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }

    pub fn merge(&mut self, other: MigrationReport) {
        self.applied.extend(other.applied);
        self.skipped.extend(other.skipped);
    }
}

/// Aplica planes de migración sobre una `DdlConnection`.
///
/// Un único actor de migración por tabla: el motor no toma locks; migraciones
/// concurrentes de la misma tabla deben serializarse fuera.
pub struct MigrationEngine<'c, C>
    where C: DdlConnection + ?Sized
{
    conn: &'c mut C,
}

impl<'c, C> MigrationEngine<'c, C> where C: DdlConnection + ?Sized
{
    pub fn new(conn: &'c mut C) -> Self {
        Self { conn }
    }

    /// Ejecuta el plan paso a paso. Aborta en el primer error no idempotente;
    /// lo ya aplicado queda aplicado (el DDL MySQL no es transaccional).
    pub async fn apply(&mut self, plan: &MigrationPlan) -> Result<MigrationReport, MigrationError> {
        let mut report = MigrationReport::default();
        for step in plan.steps() {
            let label = format!("{} {} on `{}`", step.op, step.artifact.describe(), step.artifact.table());
            let outcome = self.run_step(step).await?;
            match outcome {
                StepOutcome::Applied => {
                    debug!("migration step applied: {label}");
                    report.applied.push(label);
                }
                StepOutcome::AlreadyPresent | StepOutcome::AlreadyAbsent => {
                    debug!("migration step skipped ({outcome:?}): {label}");
                    report.skipped.push(label);
                }
            }
        }
        Ok(report)
    }

    async fn run_step(&mut self, step: &PlanStep) -> Result<StepOutcome, MigrationError> {
        match step.op {
            MigrationOp::Create => self.ensure(&step.artifact, step.op).await,
            MigrationOp::Drop => self.remove(&step.artifact, step.op).await,
            MigrationOp::Update => self.refresh(&step.artifact).await,
        }
    }

    fn fail(op: MigrationOp, artifact: &SchemaArtifact, source: DbError) -> MigrationError {
        MigrationError { op,
                         table: artifact.table().to_string(),
                         target: artifact.describe(),
                         source }
    }

    async fn ensure(&mut self, artifact: &SchemaArtifact, op: MigrationOp) -> Result<StepOutcome, MigrationError> {
        if artifact.exists(&mut *self.conn).await.map_err(|e| Self::fail(op, artifact, e))? {
            return Ok(StepOutcome::AlreadyPresent);
        }
        match self.conn.execute(&artifact.create_statement()).await {
            Ok(()) => Ok(StepOutcome::Applied),
            Err(e) if e.code.is_already_exists() => {
                warn!("{} on `{}` appeared after existence check: {e}", artifact.describe(), artifact.table());
                Ok(StepOutcome::AlreadyPresent)
            }
            Err(e) => Err(Self::fail(op, artifact, e)),
        }
    }

    async fn remove(&mut self, artifact: &SchemaArtifact, op: MigrationOp) -> Result<StepOutcome, MigrationError> {
        if !artifact.exists(&mut *self.conn).await.map_err(|e| Self::fail(op, artifact, e))? {
            return Ok(StepOutcome::AlreadyAbsent);
        }
        match self.conn.execute(&artifact.drop_statement()).await {
            Ok(()) => Ok(StepOutcome::Applied),
            Err(e) if e.code.is_already_absent() => {
                warn!("{} on `{}` vanished after existence check: {e}", artifact.describe(), artifact.table());
                Ok(StepOutcome::AlreadyAbsent)
            }
            Err(e) => Err(Self::fail(op, artifact, e)),
        }
    }

    /// Lo que ya coincide con el catálogo no se toca. Si difiere: columnas
    /// con MODIFY, índices y triggers se recrean. Tablas: sólo se asegura su
    /// existencia.
    async fn refresh(&mut self, artifact: &SchemaArtifact) -> Result<StepOutcome, MigrationError> {
        let op = MigrationOp::Update;
        if matches!(artifact, SchemaArtifact::Table { .. })
           || !artifact.exists(&mut *self.conn).await.map_err(|e| Self::fail(op, artifact, e))?
        {
            return self.ensure(artifact, op).await;
        }
        if artifact.matches(&mut *self.conn).await.map_err(|e| Self::fail(op, artifact, e))? {
            return Ok(StepOutcome::AlreadyPresent);
        }
        match artifact {
            SchemaArtifact::Column { table, column } => {
                let stmt = crate::ddl::DdlStatement::ModifyColumn { table: table.clone(),
                                                                    column: column.clone() };
                self.conn
                    .execute(&stmt)
                    .await
                    .map(|_| StepOutcome::Applied)
                    .map_err(|e| Self::fail(op, artifact, e))
            }
            _ => {
                self.remove(artifact, op).await?;
                self.ensure(artifact, op).await
            }
        }
    }

    /// Crea tabla, columnas, índices y triggers que falten del objeto.
    pub async fn migrate_create_object(&mut self, object: &ObjectDefinition) -> Result<MigrationReport, SchemaError> {
        object.validate()?;
        let plan = MigrationPlan::create(object.artifacts()?);
        info!("migrate_create object={} table={} steps={}", object.name, object.db_table_name(), plan.len());
        Ok(self.apply(&plan).await?)
    }

    /// Aplica un conjunto de cambios: primero los borrados (en orden inverso),
    /// después altas y modificaciones (en orden de dependencias).
    pub async fn migrate_update_object(&mut self,
                                       object: &ObjectDefinition,
                                       changes: &ObjectChanges)
                                       -> Result<MigrationReport, SchemaError> {
        object.validate()?;
        let plan = changes.plan(object)?;
        info!("migrate_update object={} table={} steps={}", object.name, object.db_table_name(), plan.len());
        Ok(self.apply(&plan).await?)
    }

    /// Elimina triggers e índices del objeto y después su tabla (y las tablas
    /// de unión de sus campos connectObject).
    pub async fn migrate_drop_object(&mut self, object: &ObjectDefinition) -> Result<MigrationReport, SchemaError> {
        let own_table = object.db_table_name();
        let mut artifacts = Vec::new();
        for field in &object.fields {
            artifacts.extend(field.drop_artifacts(object)?
                                  .into_iter()
                                  .filter(|a| !matches!(a, SchemaArtifact::Column { table, .. } if table.as_str() == own_table)));
        }
        for index in &object.indexes {
            artifacts.extend(index.artifacts(object)?);
        }
        artifacts.push(object.table_artifact()?);
        let plan = MigrationPlan::drop(artifacts);
        info!("migrate_drop object={} table={} steps={}", object.name, own_table, plan.len());
        Ok(self.apply(&plan).await?)
    }
}
