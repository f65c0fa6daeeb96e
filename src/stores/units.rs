use parking_lot::RwLock;
use tracing::{debug, info};

use crate::calendar;
use crate::domain::{
    CreateUnitRequest, Semester, ThreadSyncResponse, Unit, UpdateUnitRequest, WeekDescriptor,
};
use crate::error::{ApiError, ApiResult};
use crate::services::ApiClient;

/// Units the user manages, with their week calendars.
pub struct UnitStore {
    client: ApiClient,
    units: RwLock<Vec<Unit>>,
}

impl UnitStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            units: RwLock::new(Vec::new()),
        }
    }

    pub fn units(&self) -> Vec<Unit> {
        self.units.read().clone()
    }

    pub fn unit(&self, unit_id: &str) -> Option<Unit> {
        self.units.read().iter().find(|u| u.id == unit_id).cloned()
    }

    pub async fn load_units(&self, user_id: &str) -> ApiResult<Vec<Unit>> {
        let units = self.client.units(user_id).await?;
        debug!(user_id, count = units.len(), "Units loaded");
        *self.units.write() = units.clone();
        Ok(units)
    }

    pub async fn load_unit(&self, unit_id: &str) -> ApiResult<Unit> {
        let unit = self.client.unit(unit_id).await?;
        self.upsert(unit.clone());
        Ok(unit)
    }

    pub async fn create(&self, request: &CreateUnitRequest) -> ApiResult<Unit> {
        if request.code.trim().is_empty() || request.name.trim().is_empty() {
            return Err(ApiError::Validation(
                "Unit code and name are required".to_string(),
            ));
        }

        let unit = self.client.create_unit(request).await?;
        info!(unit_id = %unit.id, code = %unit.code, "Unit created");
        self.upsert(unit.clone());
        Ok(unit)
    }

    pub async fn update(&self, unit_id: &str, update: &UpdateUnitRequest) -> ApiResult<Unit> {
        let unit = self.client.update_unit(unit_id, update).await?;
        self.upsert(unit.clone());
        Ok(unit)
    }

    /// Build a fresh calendar for a loaded unit. Nothing is sent until
    /// `save_weeks`.
    pub fn generate_weeks(
        &self,
        unit_id: &str,
        semester: &Semester,
        number_of_weeks: u32,
    ) -> ApiResult<Vec<WeekDescriptor>> {
        let weeks = calendar::generate_weeks_from_semester(semester, number_of_weeks)?;

        let mut units = self.units.write();
        let unit = units
            .iter_mut()
            .find(|u| u.id == unit_id)
            .ok_or_else(|| ApiError::NotFound(format!("Unit {} is not loaded", unit_id)))?;
        unit.semester_id = Some(semester.id.clone());
        unit.weeks = weeks.clone();

        Ok(weeks)
    }

    /// Set the syllabus text of one week.
    pub fn set_week_content(&self, unit_id: &str, week_id: u32, content: &str) -> ApiResult<()> {
        let mut units = self.units.write();
        let week = units
            .iter_mut()
            .find(|u| u.id == unit_id)
            .and_then(|u| u.weeks.iter_mut().find(|w| w.week_id == week_id))
            .ok_or_else(|| {
                ApiError::NotFound(format!("Week {} of unit {} not found", week_id, unit_id))
            })?;
        week.content = content.to_string();
        Ok(())
    }

    pub async fn save_weeks(&self, unit_id: &str) -> ApiResult<Unit> {
        let weeks = self
            .unit(unit_id)
            .map(|u| u.weeks)
            .ok_or_else(|| ApiError::NotFound(format!("Unit {} is not loaded", unit_id)))?;

        let unit = self.client.save_weeks(unit_id, &weeks).await?;
        info!(unit_id, weeks = weeks.len(), "Week calendar saved");
        self.upsert(unit.clone());
        Ok(unit)
    }

    /// Sync forum threads, then reload the unit for its new sync time.
    pub async fn sync_threads(&self, unit_id: &str) -> ApiResult<ThreadSyncResponse> {
        let result = self.client.sync_threads(unit_id).await?;
        info!(
            unit_id,
            synced = result.synced,
            created = result.created,
            updated = result.updated,
            "Threads synced"
        );
        self.load_unit(unit_id).await?;
        Ok(result)
    }

    fn upsert(&self, unit: Unit) {
        let mut units = self.units.write();
        match units.iter_mut().find(|u| u.id == unit.id) {
            Some(existing) => *existing = unit,
            None => units.push(unit),
        }
    }
}
