// src/services/building_service.rs

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use tracing::info;
use uuid::Uuid;

use crate::{
    common::{clock::LocalClock, error::AppError},
    db::{BrandRepository, BuildingRepository, CarRepository, SubscriptionRepository, UserRepository},
    models::{
        auth::UserRole,
        building::{
            Building, BuildingClientRow, BuildingListing, BuildingRef, BuildingSummary, BuildingTotals,
            CreateBuildingPayload, UpdateBuildingPayload,
        },
        catalog::{CarBrandView, CarModelView},
    },
    services::media::PublicUrls,
};

const DUBAI_BUILDINGS: [&str; 10] = [
    "Burj Khalifa",
    "Princess Tower",
    "23 Marina",
    "Elite Residence",
    "The Torch",
    "Ocean Heights",
    "Cayan Tower",
    "Marina Pinnacle",
    "Sulafa Tower",
    "Al Seef Tower",
];

/// Mês pedido (1..=12) no ano corrente; fora disso, o mês atual.
pub fn summary_month(raw: Option<&str>, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let month = raw
        .and_then(|m| m.trim().parse::<u32>().ok())
        .filter(|m| (1..=12).contains(m))
        .unwrap_or(today.month());

    let first = NaiveDate::from_ymd_opt(today.year(), month, 1).unwrap_or(today);
    let last = first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first);
    (first, last)
}

#[derive(Clone)]
pub struct BuildingService {
    building_repo: BuildingRepository,
    user_repo: UserRepository,
    car_repo: CarRepository,
    subscription_repo: SubscriptionRepository,
    brand_repo: BrandRepository,
    clock: LocalClock,
    urls: PublicUrls,
}

impl BuildingService {
    pub fn new(
        building_repo: BuildingRepository,
        user_repo: UserRepository,
        car_repo: CarRepository,
        subscription_repo: SubscriptionRepository,
        brand_repo: BrandRepository,
        clock: LocalClock,
        urls: PublicUrls,
    ) -> Self {
        Self { building_repo, user_repo, car_repo, subscription_repo, brand_repo, clock, urls }
    }

    pub async fn list(&self) -> Result<Vec<BuildingListing>, AppError> {
        self.building_repo.list_with_developer().await
    }

    pub async fn create(&self, payload: CreateBuildingPayload) -> Result<BuildingListing, AppError> {
        let name = payload.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Building name is required".into()));
        }
        let developer_id = payload
            .developer_id
            .ok_or_else(|| AppError::BadRequest("Developer selection is required".into()))?;

        if self.building_repo.exists_by_name(name).await? {
            return Err(AppError::BadRequest("Building already exists".into()));
        }
        let developer = self
            .user_repo
            .find_by_id(developer_id)
            .await?
            .filter(|u| u.role == UserRole::Developer)
            .ok_or_else(|| AppError::BadRequest("Invalid developer selection".into()))?;

        let building = self.building_repo.create(name, developer.id).await?;
        info!("🏢 Prédio '{}' criado para o incorporador {}", building.name, developer.id);

        Ok(BuildingListing {
            building,
            developer_name: Some(developer.name),
            developer_email: Some(developer.email),
        })
    }

    pub async fn update(&self, id: Uuid, payload: UpdateBuildingPayload) -> Result<BuildingListing, AppError> {
        if payload.developer_id.is_some() {
            return Err(AppError::BadRequest("Developer assignment cannot be changed after creation".into()));
        }
        let name = payload.name.as_deref().map(str::trim).filter(|n| !n.is_empty());

        if !self.building_repo.rename(id, name).await? {
            return Err(AppError::not_found("Building"));
        }
        self.building_repo
            .listing_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Building"))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.building_repo.delete(id).await?;
        info!("🗑️ Prédio {} removido", id);
        Ok(())
    }

    pub async fn seed(&self) -> Result<(), AppError> {
        self.building_repo.ensure_names(&DUBAI_BUILDINGS).await
    }

    pub async fn developer_buildings(&self, developer_id: Uuid) -> Result<Vec<Building>, AppError> {
        self.building_repo.list_by_developer(developer_id).await
    }

    /// Clientes, carros e receita do prédio no mês pedido.
    pub async fn developer_summary(
        &self,
        developer_id: Uuid,
        building_id: Uuid,
        month: Option<&str>,
    ) -> Result<BuildingSummary, AppError> {
        let building = self
            .building_repo
            .find_for_developer(building_id, developer_id)
            .await?
            .ok_or_else(|| AppError::not_found("Building"))?;

        let clients = self
            .user_repo
            .list_clients_in_buildings(&[building.name.clone()])
            .await?;
        let ids: Vec<Uuid> = clients.iter().map(|c| c.id).collect();
        let cars = self.car_repo.list_rows_by_clients(&ids).await?;

        let (first, last) = summary_month(month, self.clock.today());
        let window = self.clock.range_window(first, last);
        let monthly_revenue = self
            .subscription_repo
            .revenue_overlapping(&ids, window.start, window.end)
            .await?;

        let clients: Vec<BuildingClientRow> = clients
            .into_iter()
            .map(|c| BuildingClientRow {
                id: c.id,
                name: c.name,
                email: c.email,
                phone: c.phone,
                building_name: c.building_name,
            })
            .collect();

        Ok(BuildingSummary {
            building: BuildingRef { id: building.id, name: building.name },
            totals: BuildingTotals {
                clients: clients.len(),
                cars: cars.len(),
                monthly_revenue,
            },
            clients,
            cars,
            month_label: first.format("%B %Y").to_string(),
        })
    }

    /// Catálogo de marcas com os modelos na ordem de cadastro.
    pub async fn brands(&self) -> Result<Vec<CarBrandView>, AppError> {
        let brands = self.brand_repo.list_brands().await?;
        let mut models: HashMap<Uuid, Vec<CarModelView>> = HashMap::new();
        for model in self.brand_repo.list_models().await? {
            models.entry(model.brand_id).or_default().push(CarModelView {
                name: model.name,
                car_type: model.car_type,
            });
        }

        Ok(brands
            .into_iter()
            .map(|b| CarBrandView {
                logo_url: self.urls.brand_logo(b.logo_file.as_deref()),
                models: models.remove(&b.id).unwrap_or_default(),
                id: b.id,
                name: b.name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn summary_month_uses_current_year() {
        let (first, last) = summary_month(Some("2"), day(2024, 7, 15));
        assert_eq!(first, day(2024, 2, 1));
        assert_eq!(last, day(2024, 2, 29));
    }

    #[test]
    fn invalid_month_falls_back_to_current() {
        let today = day(2024, 12, 3);
        assert_eq!(summary_month(Some("13"), today), (day(2024, 12, 1), day(2024, 12, 31)));
        assert_eq!(summary_month(Some("abc"), today).0, day(2024, 12, 1));
        assert_eq!(summary_month(None, today).0, day(2024, 12, 1));
    }
}
