// src/services/seed.rs
//
// Dados de referência gravados na inicialização: planos padrão e catálogo de marcas.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use crate::{
    common::error::AppError,
    db::{BrandRepository, PlanRepository},
    models::car::CarType,
};

const CAR_BRANDS_JSON: &str = include_str!("../../data/car_brands.json");

pub(crate) const WASH_FREQUENCY: &str = "3 times per week";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrandSeed {
    name: String,
    logo_file: Option<String>,
    #[serde(default)]
    models: Vec<String>,
}

struct PlanSeed {
    car_type: CarType,
    plan_type: &'static str,
    price: &'static str,
}

const DEFAULT_PLANS: [PlanSeed; 8] = [
    PlanSeed { car_type: CarType::Hatchback, plan_type: "basic", price: "100" },
    PlanSeed { car_type: CarType::Hatchback, plan_type: "premium", price: "130" },
    PlanSeed { car_type: CarType::Sedan, plan_type: "basic", price: "120" },
    PlanSeed { car_type: CarType::Sedan, plan_type: "premium", price: "150" },
    PlanSeed { car_type: CarType::MidSuv, plan_type: "basic", price: "130" },
    PlanSeed { car_type: CarType::MidSuv, plan_type: "premium", price: "160" },
    PlanSeed { car_type: CarType::LargeSuv, plan_type: "basic", price: "150" },
    PlanSeed { car_type: CarType::LargeSuv, plan_type: "premium", price: "180" },
];

fn plan_features(plan_type: &str) -> Vec<String> {
    let features: &[&str] = if plan_type == "premium" {
        &[
            "Exterior Wash",
            "Interior Wash (once per month)",
            "Tyre Polishing (once per month)",
            WASH_FREQUENCY,
        ]
    } else {
        &["Exterior Wash", WASH_FREQUENCY]
    };
    features.iter().map(|f| f.to_string()).collect()
}

const HATCH_KEYWORDS: &[&str] = &[
    "hatch", "sportback", "swift", "micra", "polo", "golf", "fiesta", "i10", "i20", "picanto", "rio",
    "yaris", "aygo", "up", "spark", "fit", "mini", "cooper", "500",
];

const LARGE_SUV_KEYWORDS: &[&str] = &[
    "escalade", "tahoe", "suburban", "yukon", "expedition", "navigator", "armada", "sequoia",
    "landcruiser", "prado", "fortuner", "patrol", "rangerover", "defender", "discovery", "gclass",
    "gwagen", "gwagon", "gls", "gle", "q7", "q8", "x5", "x6", "x7", "ix", "xc90", "gx", "lx", "qx80",
    "gv80", "telluride", "palisade", "atlas", "touareg", "kodiaq", "traverse", "enclave",
    "grandcherokee", "wagoneer",
];

const SUV_KEYWORDS: &[&str] = &[
    "suv", "crossover", "xtrail", "qashqai", "rav4", "crv", "hrv", "brv", "cx3", "cx5", "cx30", "cx50",
    "cx60", "cx70", "cx90", "outback", "forester", "ascent", "rogue", "pathfinder", "murano", "juke",
    "kicks", "tucson", "santafe", "kona", "sportage", "sorento", "seltos", "soul", "tiguan", "taos",
    "troc", "karoq", "envision", "encore", "explorer", "escape", "edge", "ecosport", "bronco",
    "blazer", "trailblazer", "equinox", "evoque", "velar", "wrangler", "cherokee", "compass",
    "renegade", "g63", "x1", "x2", "x3", "x4", "q3", "q5", "ux", "nx", "rx", "qx", "xt4", "xt5", "xt6",
    "gv60", "gv70", "cayenne", "macan",
];

fn normalize_token(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

// `prefix` seguido de um caractere aceito por `next`
fn prefix_then(key: &str, prefix: &str, next: impl Fn(char) -> bool) -> bool {
    key.strip_prefix(prefix)
        .and_then(|rest| rest.chars().next())
        .is_some_and(next)
}

fn brand_rule(brand: &str, model: &str) -> Option<CarType> {
    use CarType::{LargeSuv, MidSuv};

    if brand.contains("audi") {
        if prefix_then(model, "q", |c| c == '7' || c == '8') {
            return Some(LargeSuv);
        }
        if prefix_then(model, "q", |c| c.is_ascii_digit()) {
            return Some(MidSuv);
        }
    }
    if brand.contains("bmw") {
        if prefix_then(model, "x", |c| ('5'..='7').contains(&c))
            || prefix_then(model, "ix", |c| c.is_ascii_digit())
            || model == "ix"
        {
            return Some(LargeSuv);
        }
        if prefix_then(model, "x", |c| ('1'..='4').contains(&c)) {
            return Some(MidSuv);
        }
    }
    if brand.contains("mercedes") {
        if model.starts_with("gls") || model.starts_with("gclass") || model == "g" || model == "g63" {
            return Some(LargeSuv);
        }
        if model.starts_with("gle") {
            return Some(LargeSuv);
        }
        if prefix_then(model, "gl", |c| matches!(c, 'a' | 'b' | 'c' | 'e')) {
            return Some(MidSuv);
        }
    }
    if brand.contains("lexus") {
        if model.starts_with("lx") || model.starts_with("gx") {
            return Some(LargeSuv);
        }
        if ["rx", "nx", "ux"].iter().any(|p| model.starts_with(p)) {
            return Some(MidSuv);
        }
    }
    if brand.contains("infiniti") {
        if model.starts_with("qx80") {
            return Some(LargeSuv);
        }
        if model.starts_with("qx") {
            return Some(MidSuv);
        }
    }
    if brand.contains("volvo") {
        if model.starts_with("xc90") {
            return Some(LargeSuv);
        }
        if model.starts_with("xc") {
            return Some(MidSuv);
        }
    }
    if brand.contains("acura") {
        match model {
            "mdx" => return Some(LargeSuv),
            "rdx" => return Some(MidSuv),
            _ => {}
        }
    }
    if brand.contains("porsche") {
        match model {
            "cayenne" => return Some(LargeSuv),
            "macan" => return Some(MidSuv),
            _ => {}
        }
    }
    None
}

/// Categoria sugerida para um modelo do catálogo. `Other` e nomes vazios ficam sem categoria.
pub fn infer_car_type(brand: &str, model: &str) -> Option<CarType> {
    let model = normalize_token(model.trim());
    if model.is_empty() || model == "other" {
        return None;
    }
    let brand = normalize_token(brand);

    if let Some(rule) = brand_rule(&brand, &model) {
        return Some(rule);
    }

    let has = |keywords: &[&str]| keywords.iter().any(|k| model.contains(k));
    if has(HATCH_KEYWORDS) {
        Some(CarType::Hatchback)
    } else if has(LARGE_SUV_KEYWORDS) {
        Some(CarType::LargeSuv)
    } else if has(SUV_KEYWORDS) {
        Some(CarType::MidSuv)
    } else {
        Some(CarType::Sedan)
    }
}

/// Rotina de inicialização executada antes do servidor aceitar conexões.
pub struct Startup {
    plan_repo: PlanRepository,
    brand_repo: BrandRepository,
    pool: PgPool,
}

impl Startup {
    pub fn new(plan_repo: PlanRepository, brand_repo: BrandRepository, pool: PgPool) -> Self {
        Self { plan_repo, brand_repo, pool }
    }

    pub async fn seed(&self) -> anyhow::Result<()> {
        self.seed_plans().await?;
        self.seed_brands().await?;
        Ok(())
    }

    async fn seed_plans(&self) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        if self.plan_repo.count(&mut *tx).await? > 0 {
            return Ok(());
        }

        for seed in &DEFAULT_PLANS {
            let price = Decimal::from_str(seed.price).map_err(|e| anyhow::anyhow!("Preço inválido: {}", e))?;
            self.plan_repo
                .upsert(
                    &mut *tx,
                    seed.car_type,
                    seed.plan_type,
                    price,
                    &plan_features(seed.plan_type),
                    WASH_FREQUENCY,
                )
                .await?;
        }
        tx.commit().await?;

        info!("🌱 {} planos padrão criados", DEFAULT_PLANS.len());
        Ok(())
    }

    async fn seed_brands(&self) -> Result<(), AppError> {
        let brands: Vec<BrandSeed> =
            serde_json::from_str(CAR_BRANDS_JSON).map_err(|e| anyhow::anyhow!("Catálogo de marcas inválido: {}", e))?;

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;
        for brand in &brands {
            let brand_id = self
                .brand_repo
                .upsert_brand(&mut *tx, &brand.name, brand.logo_file.as_deref())
                .await?;
            for (position, model) in brand.models.iter().enumerate() {
                self.brand_repo
                    .upsert_model(
                        &mut *tx,
                        brand_id,
                        model,
                        infer_car_type(&brand.name, model),
                        position as i32,
                    )
                    .await?;
            }
        }
        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        info!("🚘 Catálogo de marcas sincronizado ({} marcas)", brands.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_and_blank_models_have_no_type() {
        assert_eq!(infer_car_type("Audi", "Other"), None);
        assert_eq!(infer_car_type("Audi", "   "), None);
    }

    #[test]
    fn brand_rules_come_first() {
        assert_eq!(infer_car_type("Audi", "Q7"), Some(CarType::LargeSuv));
        assert_eq!(infer_car_type("Audi", "Q3"), Some(CarType::MidSuv));
        assert_eq!(infer_car_type("BMW", "iX"), Some(CarType::LargeSuv));
        assert_eq!(infer_car_type("BMW", "X3"), Some(CarType::MidSuv));
        assert_eq!(infer_car_type("Mercedes-Benz", "GLE"), Some(CarType::LargeSuv));
        assert_eq!(infer_car_type("Mercedes-Benz", "GLA"), Some(CarType::MidSuv));
        assert_eq!(infer_car_type("Mercedes-Benz", "G-Class"), Some(CarType::LargeSuv));
        assert_eq!(infer_car_type("Volvo", "XC60"), Some(CarType::MidSuv));
        assert_eq!(infer_car_type("Porsche", "Macan"), Some(CarType::MidSuv));
    }

    #[test]
    fn keywords_pick_hatch_before_suv() {
        assert_eq!(infer_car_type("Volkswagen", "Golf"), Some(CarType::Hatchback));
        assert_eq!(infer_car_type("Toyota", "Land Cruiser"), Some(CarType::LargeSuv));
        assert_eq!(infer_car_type("Toyota", "RAV4"), Some(CarType::MidSuv));
        assert_eq!(infer_car_type("Toyota", "Camry"), Some(CarType::Sedan));
    }

    #[test]
    fn bundled_catalogue_parses() {
        let brands: Vec<BrandSeed> = serde_json::from_str(CAR_BRANDS_JSON).unwrap();
        assert!(brands.len() > 50);
        assert!(brands.iter().all(|b| !b.name.is_empty()));
    }

    #[test]
    fn premium_plans_list_extra_services() {
        assert_eq!(plan_features("basic").len(), 2);
        assert_eq!(plan_features("premium").len(), 4);
        assert!(DEFAULT_PLANS.iter().all(|p| Decimal::from_str(p.price).is_ok()));
    }
}
