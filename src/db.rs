pub mod activity_repo;
pub use activity_repo::ActivityRepository;
pub mod brand_repo;
pub use brand_repo::BrandRepository;
pub mod building_repo;
pub use building_repo::BuildingRepository;
pub mod car_repo;
pub use car_repo::CarRepository;
pub mod plan_repo;
pub use plan_repo::PlanRepository;
pub mod subscription_repo;
pub use subscription_repo::SubscriptionRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
pub mod wash_repo;
pub use wash_repo::WashRepository;
