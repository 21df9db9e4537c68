// src/services/billing_service.rs

use std::sync::Arc;

use rust_decimal::{prelude::ToPrimitive, Decimal};
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    common::{clock::LocalClock, error::AppError},
    db::{ActivityRepository, CarRepository, PlanRepository, SubscriptionRepository, UserRepository},
    models::{
        activity::{ActivityContext, ActivityKind},
        auth::User,
        car::Car,
        catalog::SubscriptionPlan,
        subscription::{
            ConfirmSubscriptionPayload, NewSubscriptionRecord, PaymentIntentPayload, PaymentIntentResponse,
            PaymentIntentSummary, StatusAction, SubscribePayload, SubscribeResponse, SubscriptionDetail,
            SubscriptionStatus,
        },
    },
    payments::{
        Expandable, GatewayError, NewCustomer, NewPrice, NewSubscription, PaymentGateway, ProcessorInvoice,
        ProcessorPaymentIntent, ProcessorPrice, ProcessorSubscription,
    },
};

/// Valor em unidades mínimas da moeda (fils para AED).
pub fn unit_amount(price: Decimal) -> i64 {
    (price * Decimal::ONE_HUNDRED).round().to_i64().unwrap_or(0)
}

/// Um preço existente só é reaproveitado se for ativo, mensal, sem trial e
/// bater em moeda, valor e produto.
pub fn needs_new_price(existing: Option<&ProcessorPrice>, product_id: &str, currency: &str, unit_amount: i64) -> bool {
    let Some(price) = existing else {
        return true;
    };
    let monthly = price
        .recurring
        .as_ref()
        .is_some_and(|r| r.interval.as_deref() == Some("month"));
    let trial = price
        .recurring
        .as_ref()
        .is_some_and(|r| r.trial_period_days.unwrap_or(0) > 0);
    let same_currency = price
        .currency
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case(currency));
    let same_product = price.product.as_ref().is_none_or(|p| p.id() == product_id);

    !price.active || !monthly || trial || !same_currency || price.unit_amount != Some(unit_amount) || !same_product
}

fn processor_failure(context: &'static str) -> impl Fn(GatewayError) -> AppError {
    move |err| {
        error!(error = %err, "Falha no processador ({})", context);
        AppError::from(err)
    }
}

fn random_token(len: usize) -> String {
    Uuid::new_v4().simple().to_string().chars().take(len).collect()
}

#[derive(Clone)]
pub struct BillingService {
    gateway: Option<Arc<dyn PaymentGateway>>,
    user_repo: UserRepository,
    car_repo: CarRepository,
    plan_repo: PlanRepository,
    subscription_repo: SubscriptionRepository,
    activity_repo: ActivityRepository,
    currency: String,
    clock: LocalClock,
    pool: PgPool,
}

impl BillingService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Option<Arc<dyn PaymentGateway>>,
        user_repo: UserRepository,
        car_repo: CarRepository,
        plan_repo: PlanRepository,
        subscription_repo: SubscriptionRepository,
        activity_repo: ActivityRepository,
        currency: String,
        clock: LocalClock,
        pool: PgPool,
    ) -> Self {
        Self { gateway, user_repo, car_repo, plan_repo, subscription_repo, activity_repo, currency, clock, pool }
    }

    fn gateway(&self) -> Result<&Arc<dyn PaymentGateway>, AppError> {
        self.gateway.as_ref().ok_or(AppError::ProcessorNotConfigured)
    }

    async fn owned_car(&self, user: &User, car_id: Uuid) -> Result<Car, AppError> {
        let car = self
            .car_repo
            .find_by_id(car_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Car details not found".into()))?;
        if car.client_id != user.id {
            return Err(AppError::Forbidden("Unauthorized car selection".into()));
        }
        Ok(car)
    }

    async fn plan(&self, plan_id: Uuid) -> Result<SubscriptionPlan, AppError> {
        self.plan_repo
            .find_by_id(plan_id)
            .await?
            .ok_or_else(|| AppError::not_found("Subscription plan"))
    }

    /// Sincroniza produto e preço do plano no processador. Sem processador, nada muda.
    pub async fn ensure_plan_pricing(&self, plan: SubscriptionPlan) -> Result<SubscriptionPlan, AppError> {
        let Some(gateway) = self.gateway.as_ref() else {
            return Ok(plan);
        };
        let mut plan = plan;

        let desired = unit_amount(plan.price);
        if desired <= 0 {
            return Ok(plan);
        }

        let product_id = match plan.stripe_product_id.clone() {
            Some(id) => id,
            None => {
                let name = format!(
                    "{} - {}",
                    plan.plan_type.to_uppercase(),
                    plan.car_type.as_str().to_uppercase()
                );
                let id = gateway
                    .create_product(&name, plan.id)
                    .await
                    .map_err(processor_failure("criar produto"))?;
                self.plan_repo.set_product(plan.id, &id).await?;
                plan.stripe_product_id = Some(id.clone());
                id
            }
        };

        let existing = match plan.stripe_price_id.as_deref() {
            Some(price_id) => match gateway.retrieve_price(price_id).await {
                Ok(price) => Some(price),
                Err(err) => {
                    warn!("Consulta do preço {} falhou: {}", price_id, err);
                    None
                }
            },
            None => None,
        };

        if needs_new_price(existing.as_ref(), &product_id, &self.currency, desired) {
            let price = gateway
                .create_price(&NewPrice {
                    product_id,
                    unit_amount: desired,
                    currency: self.currency.clone(),
                    plan_id: plan.id,
                })
                .await
                .map_err(processor_failure("criar preço"))?;
            info!("💰 Novo preço {} para o plano {}", price.id, plan.id);
            return self.plan_repo.set_price(plan.id, &price.id, &self.currency, desired).await;
        }

        if plan.stripe_currency != self.currency || plan.stripe_unit_amount != Some(desired) {
            if let Some(price) = existing {
                return self.plan_repo.set_price(plan.id, &price.id, &self.currency, desired).await;
            }
        }
        Ok(plan)
    }

    pub async fn subscribe(&self, user: &User, payload: SubscribePayload) -> Result<SubscribeResponse, AppError> {
        let gateway = self.gateway()?;

        let plan = self.plan(payload.plan_id).await?;
        if plan.price <= Decimal::ZERO {
            return Err(AppError::BadRequest("Subscription plan has an invalid price".into()));
        }
        let car = self.owned_car(user, payload.car_id).await?;

        if self.subscription_repo.latest_for_car(user.id, car.id, true).await?.is_some() {
            return Err(AppError::Conflict(
                "This car already has an active subscription. Please cancel it before subscribing again.".into(),
            ));
        }

        let customer_id = match user.stripe_customer_id.clone() {
            Some(id) => id,
            None => {
                let id = gateway
                    .create_customer(&NewCustomer {
                        email: user.email.clone(),
                        name: user.name.clone(),
                        phone: user.phone.clone(),
                        user_id: user.id,
                    })
                    .await
                    .map_err(processor_failure("criar cliente"))?;
                self.user_repo.set_stripe_customer_id(user.id, &id).await?;
                id
            }
        };

        let plan = self.ensure_plan_pricing(plan).await?;
        let price_id = plan.stripe_price_id.clone().ok_or_else(|| {
            AppError::InternalServerError(anyhow::anyhow!("Subscription plan is not configured for Stripe billing."))
        })?;

        let ephemeral_key = gateway
            .create_ephemeral_key(&customer_id)
            .await
            .map_err(processor_failure("criar chave efêmera"))?;

        let subscription = gateway
            .create_subscription(&NewSubscription {
                customer_id: customer_id.clone(),
                price_id,
                user_id: user.id,
                car_id: car.id,
                plan_id: plan.id,
            })
            .await
            .map_err(processor_failure("criar assinatura"))?;

        let (payment_secret, invoice) = self.payment_intent_secret(gateway, &subscription).await?;
        let setup_secret = match payment_secret {
            Some(_) => None,
            None => self.setup_intent_secret(gateway, &subscription, invoice.as_ref(), &customer_id).await?,
        };

        if payment_secret.is_none() && setup_secret.is_none() {
            error!(
                status = %subscription.status,
                amount_due = ?invoice.as_ref().and_then(|i| i.amount_due),
                "Processador não devolveu payment intent para {}",
                subscription.id
            );
            return Err(AppError::Processor(
                "Stripe did not return a payment intent for the subscription.".into(),
            ));
        }

        info!("🧾 Assinatura {} criada para o usuário {}", subscription.id, user.id);
        Ok(SubscribeResponse {
            stripe_subscription_id: subscription.id,
            customer_id,
            customer_ephemeral_key_secret: ephemeral_key,
            payment_intent_client_secret: payment_secret,
            setup_intent_client_secret: setup_secret,
        })
    }

    /// Segredo do payment intent da primeira fatura, finalizando rascunhos se preciso.
    async fn payment_intent_secret(
        &self,
        gateway: &Arc<dyn PaymentGateway>,
        subscription: &ProcessorSubscription,
    ) -> Result<(Option<String>, Option<ProcessorInvoice>), AppError> {
        let mut invoice = subscription
            .latest_invoice
            .as_ref()
            .and_then(|i| i.as_object())
            .cloned();
        let mut intent = invoice.as_ref().and_then(|i| i.payment_intent.clone());

        if intent.is_none() {
            if let Some(latest) = &subscription.latest_invoice {
                let invoice_id = match latest {
                    Expandable::Id(id) => id.clone(),
                    Expandable::Object(inv) => inv.id.clone(),
                };
                let mut fetched = gateway
                    .retrieve_invoice(&invoice_id)
                    .await
                    .map_err(processor_failure("consultar fatura"))?;
                if fetched.status.as_deref() == Some("draft") {
                    fetched = gateway
                        .finalize_invoice(&invoice_id)
                        .await
                        .map_err(processor_failure("finalizar fatura"))?;
                }
                intent = fetched.payment_intent.clone();
                invoice = Some(fetched);
            }
        }

        let secret = match intent {
            Some(Expandable::Object(ProcessorPaymentIntent { client_secret, .. })) => client_secret,
            Some(Expandable::Id(id)) => {
                gateway
                    .retrieve_payment_intent(&id)
                    .await
                    .map_err(processor_failure("consultar payment intent"))?
                    .client_secret
            }
            None => None,
        };
        Ok((secret, invoice))
    }

    /// Assinaturas sem cobrança imediata (trial, ativa ou fatura zerada) usam setup intent.
    async fn setup_intent_secret(
        &self,
        gateway: &Arc<dyn PaymentGateway>,
        subscription: &ProcessorSubscription,
        invoice: Option<&ProcessorInvoice>,
        customer_id: &str,
    ) -> Result<Option<String>, AppError> {
        let status = subscription.normalized_status();
        let setup_only = status == "trialing" || status == "active" || invoice.and_then(|i| i.amount_due) == Some(0);
        if !setup_only {
            return Ok(None);
        }

        let setup = match &subscription.pending_setup_intent {
            Some(Expandable::Object(intent)) => intent.clone(),
            Some(Expandable::Id(id)) => gateway
                .retrieve_setup_intent(id)
                .await
                .map_err(processor_failure("consultar setup intent"))?,
            None => gateway
                .create_setup_intent(customer_id)
                .await
                .map_err(processor_failure("criar setup intent"))?,
        };
        Ok(setup.client_secret)
    }

    /// Devolve `(criada, assinatura)`. Confirmar de novo o mesmo id é idempotente.
    pub async fn confirm(
        &self,
        user: &User,
        payload: ConfirmSubscriptionPayload,
    ) -> Result<(bool, SubscriptionDetail), AppError> {
        let gateway = self.gateway()?;

        if let Some(existing) = self
            .subscription_repo
            .find_by_stripe_id(&payload.stripe_subscription_id)
            .await?
        {
            if existing.user_id != user.id {
                return Err(AppError::Forbidden("Stripe subscription does not belong to this customer".into()));
            }
            return Ok((false, self.subscription_repo.detail(existing).await?));
        }

        let plan = self.plan(payload.plan_id).await?;
        let car = self.owned_car(user, payload.car_id).await?;

        let customer_id = user
            .stripe_customer_id
            .as_deref()
            .ok_or_else(|| AppError::NotFound("Stripe customer not found for this user".into()))?;

        let processor = gateway
            .retrieve_subscription(&payload.stripe_subscription_id)
            .await
            .map_err(processor_failure("consultar assinatura"))?;
        if processor.customer_id() != Some(customer_id) {
            return Err(AppError::Forbidden("Stripe subscription does not belong to this customer".into()));
        }

        let expected = [
            ("userId", user.id.to_string()),
            ("carId", car.id.to_string()),
            ("planId", plan.id.to_string()),
        ];
        for (key, value) in expected {
            if processor.metadata.get(key).is_some_and(|v| *v != value) {
                return Err(AppError::Forbidden(format!(
                    "Stripe subscription metadata mismatch ({})",
                    key
                )));
            }
        }

        let status = processor.normalized_status();
        if status != "active" && status != "trialing" {
            return Err(AppError::Conflict(format!(
                "Subscription is not active yet (Stripe status: {}).",
                processor.status
            )));
        }

        let now = self.clock.now();
        let local_status = if processor.is_paused() {
            SubscriptionStatus::OnHold
        } else {
            SubscriptionStatus::Active
        };
        let record = NewSubscriptionRecord {
            user_id: user.id,
            car_id: car.id,
            plan_id: plan.id,
            status: local_status,
            start_date: processor
                .period_start()
                .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
                .unwrap_or(now),
            end_date: processor
                .period_end()
                .and_then(|s| chrono::DateTime::from_timestamp(s, 0)),
            stripe_subscription_id: processor.id.clone(),
            plan_type: plan.plan_type.clone(),
            plan_car_type: plan.car_type,
            plan_price: plan.price,
            plan_features: plan.features.clone(),
            plan_wash_frequency: plan.wash_frequency.clone(),
        };

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        let stale = self
            .subscription_repo
            .cancel_live_for_car(&mut *tx, user.id, car.id, now)
            .await?;
        for old in &stale {
            self.subscription_repo
                .append_history(&mut *tx, old.id, SubscriptionStatus::Cancelled, StatusAction::SystemCancelNewSub)
                .await?;
        }

        let created = self.subscription_repo.insert(&mut *tx, &record).await?;
        self.subscription_repo
            .append_history(&mut *tx, created.id, local_status, StatusAction::StripeConfirm)
            .await?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        if !stale.is_empty() {
            info!("🔁 {} assinatura(s) antigas canceladas para o carro {}", stale.len(), car.id);
        }

        self.activity_repo
            .log(
                ActivityKind::Subscription,
                &format!("New Subscription: {} ({})", plan.plan_type.to_uppercase(), car.license_plate),
                ActivityContext {
                    user_id: Some(user.id),
                    license_plate: Some(car.license_plate.clone()),
                    building_name: user.building_name.clone(),
                    status: Some("active".into()),
                },
            )
            .await;

        Ok((true, self.subscription_repo.detail(created).await?))
    }

    /// Sem processador configurado devolve um intent simulado para desenvolvimento.
    pub async fn create_payment_intent(&self, payload: PaymentIntentPayload) -> Result<PaymentIntentResponse, AppError> {
        let currency = payload
            .currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.currency.clone());

        let Some(gateway) = self.gateway.as_ref() else {
            warn!("Processador não configurado; usando payment intent simulado");
            let id = format!("pi_{}", random_token(15));
            let secret = format!("{}_secret_{}", id, random_token(30));
            return Ok(PaymentIntentResponse {
                payment_intent: PaymentIntentSummary {
                    id,
                    client_secret: Some(secret),
                    amount: payload.amount,
                    currency,
                },
                is_mock: true,
            });
        };

        let intent = gateway
            .create_payment_intent(payload.amount, &currency)
            .await
            .map_err(processor_failure("criar payment intent"))?;
        Ok(PaymentIntentResponse {
            payment_intent: PaymentIntentSummary {
                amount: intent.amount.unwrap_or(payload.amount),
                currency: intent.currency.unwrap_or(currency),
                id: intent.id,
                client_secret: intent.client_secret,
            },
            is_mock: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::{ObjectRef, PriceRecurring};

    fn price(active: bool, interval: &str, trial: Option<i64>, currency: &str, amount: i64, product: &str) -> ProcessorPrice {
        ProcessorPrice {
            id: "price_1".into(),
            active,
            currency: Some(currency.into()),
            unit_amount: Some(amount),
            recurring: Some(PriceRecurring {
                interval: Some(interval.into()),
                trial_period_days: trial,
            }),
            product: Some(Expandable::Object(ObjectRef { id: product.into() })),
        }
    }

    #[test]
    fn unit_amount_rounds_to_minor_units() {
        assert_eq!(unit_amount(Decimal::new(12999, 2)), 12999);
        assert_eq!(unit_amount(Decimal::new(120, 0)), 12000);
        assert_eq!(unit_amount(Decimal::new(10005, 3)), 1001);
        assert_eq!(unit_amount(Decimal::ZERO), 0);
    }

    #[test]
    fn matching_price_is_reused() {
        let existing = price(true, "month", None, "AED", 12000, "prod_1");
        assert!(!needs_new_price(Some(&existing), "prod_1", "aed", 12000));
    }

    #[test]
    fn any_mismatch_forces_a_new_price() {
        assert!(needs_new_price(None, "prod_1", "aed", 12000));
        assert!(needs_new_price(Some(&price(false, "month", None, "aed", 12000, "prod_1")), "prod_1", "aed", 12000));
        assert!(needs_new_price(Some(&price(true, "year", None, "aed", 12000, "prod_1")), "prod_1", "aed", 12000));
        assert!(needs_new_price(Some(&price(true, "month", Some(7), "aed", 12000, "prod_1")), "prod_1", "aed", 12000));
        assert!(needs_new_price(Some(&price(true, "month", None, "usd", 12000, "prod_1")), "prod_1", "aed", 12000));
        assert!(needs_new_price(Some(&price(true, "month", None, "aed", 9900, "prod_1")), "prod_1", "aed", 12000));
        assert!(needs_new_price(Some(&price(true, "month", None, "aed", 12000, "prod_2")), "prod_1", "aed", 12000));
    }

    #[test]
    fn price_without_product_reference_counts_as_same_product() {
        let mut existing = price(true, "month", None, "aed", 12000, "prod_1");
        existing.product = None;
        assert!(!needs_new_price(Some(&existing), "prod_1", "aed", 12000));
    }

    #[test]
    fn mock_tokens_have_requested_length() {
        assert_eq!(random_token(15).len(), 15);
        assert_eq!(random_token(30).len(), 30);
    }
}
