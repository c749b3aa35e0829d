//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ResourceRepository` port from the `core` crate. It reads resources and
//! their attachments from PostgreSQL using `sqlx`.

use async_trait::async_trait;
use campus_ai_core::{PortError, PortResult, ResourceAttachment, ResourceId, ResourceRepository};
use sqlx::{FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ResourceRepository` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct AttachmentRecord {
    id: i64,
    resource_id: i64,
    file_name: String,
    file_path: String,
    mime_type: String,
    size: i64,
}
impl AttachmentRecord {
    fn to_domain(self) -> ResourceAttachment {
        ResourceAttachment {
            id: self.id,
            resource_id: self.resource_id,
            file_name: self.file_name,
            file_path: self.file_path,
            mime_type: self.mime_type,
            size: self.size,
        }
    }
}

//=========================================================================================
// `ResourceRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl ResourceRepository for DbAdapter {
    async fn attachments_for_resource(
        &self,
        resource_id: ResourceId,
    ) -> PortResult<Vec<ResourceAttachment>> {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM resources WHERE id = $1")
            .bind(resource_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if exists.is_none() {
            return Err(PortError::NotFound(format!("Resource {}", resource_id)));
        }

        let records = sqlx::query_as::<_, AttachmentRecord>(
            "SELECT id, resource_id, file_name, file_path, mime_type, size \
             FROM resource_attachments WHERE resource_id = $1 ORDER BY id",
        )
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(AttachmentRecord::to_domain).collect())
    }
}
