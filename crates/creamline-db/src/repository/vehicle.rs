//! # Vehicle Repository
//!
//! Distribution vehicles. Sales and stock-ledger rows reference a vehicle
//! when distribution happens off its load rather than from main inventory.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use creamline_core::validation::validate_name;
use creamline_core::{CoreError, Vehicle};

use crate::error::DbResult;
use crate::repository::new_id;

const COLUMNS: &str = "id, vehicle_number, driver_name, notes, created_at";

/// Input for registering a vehicle.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVehicle {
    pub vehicle_number: String,
    pub driver_name: String,
    pub notes: Option<String>,
}

/// Repository for vehicle database operations.
#[derive(Debug, Clone)]
pub struct VehicleRepository {
    pool: SqlitePool,
}

impl VehicleRepository {
    /// Creates a new VehicleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VehicleRepository { pool }
    }

    /// Registers a vehicle.
    pub async fn create(&self, input: NewVehicle) -> DbResult<Vehicle> {
        validate_name("vehicleNumber", &input.vehicle_number).map_err(CoreError::from)?;
        validate_name("driverName", &input.driver_name).map_err(CoreError::from)?;

        let vehicle = Vehicle {
            id: new_id(),
            vehicle_number: input.vehicle_number.trim().to_string(),
            driver_name: input.driver_name.trim().to_string(),
            notes: input.notes,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO vehicles (id, vehicle_number, driver_name, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&vehicle.id)
        .bind(&vehicle.vehicle_number)
        .bind(&vehicle.driver_name)
        .bind(&vehicle.notes)
        .bind(vehicle.created_at)
        .execute(&self.pool)
        .await?;

        Ok(vehicle)
    }

    /// Gets a vehicle by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Vehicle>> {
        let sql = format!("SELECT {} FROM vehicles WHERE id = ?1", COLUMNS);
        let vehicle = sqlx::query_as::<_, Vehicle>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    /// Lists vehicles sorted by vehicle number.
    pub async fn list(&self) -> DbResult<Vec<Vehicle>> {
        let sql = format!("SELECT {} FROM vehicles ORDER BY vehicle_number", COLUMNS);
        let vehicles = sqlx::query_as::<_, Vehicle>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(vehicles)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_list_and_duplicate_number() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.vehicles();

        let v = repo
            .create(NewVehicle {
                vehicle_number: "CL-01".into(),
                driver_name: "Driver One".into(),
                notes: None,
            })
            .await
            .unwrap();
        assert!(repo.get_by_id(&v.id).await.unwrap().is_some());
        assert_eq!(repo.list().await.unwrap().len(), 1);

        let err = repo
            .create(NewVehicle {
                vehicle_number: "CL-01".into(),
                driver_name: "Driver Two".into(),
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
