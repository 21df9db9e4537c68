// src/services/subscription_service.rs
//
// Aplica no banco as transições decididas em `subscription_state`.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    common::{clock::LocalClock, error::AppError},
    db::SubscriptionRepository,
    models::{
        auth::User,
        subscription::{
            AdminSubscriptionPayload, AdminSubscriptionResponse, LocalStatusUpdate, Subscription,
            SubscriptionActionResponse, SubscriptionDetail, SubscriptionStatus,
        },
    },
    payments::PaymentGateway,
    services::subscription_state::{self, Actor, RequestedState, SubscriptionReconciler, Transition},
};

const ALREADY_CANCELLED: &str = "Subscription already cancelled on Stripe.";
const REACTIVATE_HINT: &str = "Subscription already cancelled on Stripe. Create a new subscription to reactivate.";

/// Ordem de busca da assinatura alterada pelo admin: a do carro pedido, depois a
/// viva mais recente do cliente, depois a mais recente de qualquer status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdminLookup {
    ForCar(Uuid),
    LatestLive,
    Latest,
}

fn admin_lookups(car_id: Option<Uuid>) -> Vec<AdminLookup> {
    car_id
        .map(AdminLookup::ForCar)
        .into_iter()
        .chain([AdminLookup::LatestLive, AdminLookup::Latest])
        .collect()
}

#[derive(Clone)]
pub struct SubscriptionService {
    subscription_repo: SubscriptionRepository,
    reconciler: Option<SubscriptionReconciler>,
    clock: LocalClock,
    pool: PgPool,
}

impl SubscriptionService {
    pub fn new(
        subscription_repo: SubscriptionRepository,
        gateway: Option<Arc<dyn PaymentGateway>>,
        clock: LocalClock,
        pool: PgPool,
    ) -> Self {
        Self {
            subscription_repo,
            reconciler: gateway.map(SubscriptionReconciler::new),
            clock,
            pool,
        }
    }

    /// Grava status/período e, se o status mudou, a linha de histórico.
    async fn apply(&self, current: &Subscription, update: &LocalStatusUpdate) -> Result<Subscription, AppError> {
        let mut tx = self.pool.begin().await?;
        let updated = self
            .subscription_repo
            .apply_update(&mut *tx, current.id, update)
            .await?;
        if let Some(action) = update.history_action {
            self.subscription_repo
                .append_history(&mut *tx, current.id, update.status, action)
                .await?;
        }
        tx.commit().await?;

        if current.status != updated.status {
            info!(
                "🔄 Assinatura {}: {:?} -> {:?}",
                current.id, current.status, updated.status
            );
        }
        Ok(updated)
    }

    async fn owned(&self, user: &User, id: Uuid) -> Result<Subscription, AppError> {
        let subscription = self
            .subscription_repo
            .find_by_id(id)
            .await?
            .filter(|s| s.user_id == user.id)
            .ok_or_else(|| AppError::not_found("Subscription"))?;
        Ok(subscription)
    }

    fn processor_target<'a>(&'a self, subscription: &'a Subscription) -> Result<(&'a SubscriptionReconciler, &'a str), AppError> {
        let reconciler = self.reconciler.as_ref().ok_or(AppError::ProcessorNotConfigured)?;
        let stripe_id = subscription
            .stripe_subscription_id
            .as_deref()
            .ok_or_else(|| AppError::InternalServerError(anyhow::anyhow!("Stripe subscription not configured.")))?;
        Ok((reconciler, stripe_id))
    }

    /// Ação do cliente: `activate`/`unhold`, `hold` ou `cancel`.
    pub async fn client_action(&self, user: &User, id: Uuid, action: &str) -> Result<SubscriptionActionResponse, AppError> {
        let subscription = self.owned(user, id).await?;
        let requested = RequestedState::from_client_action(action)
            .ok_or_else(|| AppError::BadRequest("Invalid action".into()))?;
        let (reconciler, stripe_id) = self.processor_target(&subscription)?;

        let transition = reconciler.drive(stripe_id, requested).await.map_err(|err| {
            error!(error = %err, "Falha ao atualizar assinatura {} no processador", stripe_id);
            AppError::from(err)
        })?;

        let now = self.clock.now();
        match transition {
            Transition::AlreadyCancelled => {
                let updated = self
                    .apply(&subscription, &subscription_state::cancelled_sync(&subscription, now))
                    .await?;
                if requested != RequestedState::Cancelled {
                    return Err(AppError::Conflict(REACTIVATE_HINT.into()));
                }
                Ok(SubscriptionActionResponse {
                    message: ALREADY_CANCELLED.into(),
                    subscription: self.subscription_repo.detail(updated).await?,
                })
            }
            Transition::Applied(processor) => {
                let update = subscription_state::plan_update(&subscription, &processor, Actor::Client, now);
                let updated = self.apply(&subscription, &update).await?;
                Ok(SubscriptionActionResponse {
                    message: "Subscription updated".into(),
                    subscription: self.subscription_repo.detail(updated).await?,
                })
            }
        }
    }

    fn sync_update(&self, subscription: &Subscription, processor: &crate::payments::ProcessorSubscription) -> LocalStatusUpdate {
        let now = self.clock.now();
        if processor.is_cancelled() {
            subscription_state::cancelled_sync(subscription, now)
        } else {
            subscription_state::plan_update(subscription, processor, Actor::Sync, now)
        }
    }

    /// Confere o status no processador e espelha localmente.
    pub async fn status_check(&self, user: &User, id: Uuid) -> Result<SubscriptionDetail, AppError> {
        let subscription = self.owned(user, id).await?;
        let (reconciler, stripe_id) = self.processor_target(&subscription)?;

        let processor = reconciler.fetch(stripe_id).await.map_err(|err| {
            error!(error = %err, "Falha ao consultar assinatura {} no processador", stripe_id);
            AppError::from(err)
        })?;
        let update = self.sync_update(&subscription, &processor);
        let updated = self.apply(&subscription, &update).await?;
        self.subscription_repo.detail(updated).await
    }

    /// Sincronização de leitura (painel): falhas são registradas e a leitura segue.
    pub async fn sync_quietly(&self, subscription: Subscription) -> Subscription {
        let (Some(reconciler), Some(stripe_id)) =
            (self.reconciler.as_ref(), subscription.stripe_subscription_id.as_deref())
        else {
            return subscription;
        };

        let processor = match reconciler.fetch(stripe_id).await {
            Ok(p) => p,
            Err(err) => {
                warn!("Sincronização da assinatura {} falhou: {}", subscription.id, err);
                return subscription;
            }
        };

        let update = self.sync_update(&subscription, &processor);
        if update.status == subscription.status {
            return subscription;
        }
        match self.apply(&subscription, &update).await {
            Ok(updated) => updated,
            Err(err) => {
                warn!("Falha ao gravar sincronização da assinatura {}: {}", subscription.id, err);
                subscription
            }
        }
    }

    async fn admin_target(&self, user_id: Uuid, car_id: Option<Uuid>) -> Result<Option<Subscription>, AppError> {
        for lookup in admin_lookups(car_id) {
            let found = match lookup {
                AdminLookup::ForCar(car_id) => self.subscription_repo.latest_for_car(user_id, car_id, false).await?,
                AdminLookup::LatestLive => self.subscription_repo.latest_live_for_user(user_id).await?,
                AdminLookup::Latest => self.subscription_repo.latest_for_user(user_id).await?,
            };
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// Alteração feita pelo admin. Falhas de negócio voltam como `success: false`.
    pub async fn admin_update(&self, user_id: Uuid, payload: AdminSubscriptionPayload) -> Result<AdminSubscriptionResponse, AppError> {
        let failure = |message: &str| AdminSubscriptionResponse {
            success: false,
            message: message.to_string(),
            subscription: None,
        };

        let Some(subscription) = self.admin_target(user_id, payload.car_id).await? else {
            return Ok(failure("No subscription found for this user"));
        };

        let (Some(reconciler), Some(stripe_id)) =
            (self.reconciler.as_ref(), subscription.stripe_subscription_id.as_deref())
        else {
            return Ok(failure("Stripe subscription not configured. Status unchanged."));
        };

        let requested = RequestedState::from_admin_status(&payload.status);
        let now = self.clock.now();

        let processor = match reconciler.fetch(stripe_id).await {
            Ok(p) => p,
            Err(err) => {
                error!(error = %err, "Admin: falha ao consultar assinatura {}", stripe_id);
                return Ok(failure(&err.message()));
            }
        };
        if processor.is_cancelled() {
            let updated = self
                .apply(&subscription, &subscription_state::cancelled_sync(&subscription, now))
                .await?;
            if requested == Some(RequestedState::Cancelled) {
                return Ok(AdminSubscriptionResponse {
                    success: true,
                    message: ALREADY_CANCELLED.into(),
                    subscription: Some(self.subscription_repo.detail(updated).await?),
                });
            }
            return Ok(failure(REACTIVATE_HINT));
        }

        let Some(requested) = requested else {
            return Ok(failure("Invalid status"));
        };

        let transition = match reconciler.drive_from(stripe_id, processor, requested).await {
            Ok(t) => t,
            Err(err) => {
                error!(error = %err, "Admin: falha ao atualizar assinatura {}", stripe_id);
                return Ok(failure(&err.message()));
            }
        };

        let updated = match transition {
            Transition::AlreadyCancelled => {
                let updated = self
                    .apply(&subscription, &subscription_state::cancelled_sync(&subscription, now))
                    .await?;
                if requested != RequestedState::Cancelled {
                    return Ok(failure(REACTIVATE_HINT));
                }
                updated
            }
            Transition::Applied(processor) => {
                let update = subscription_state::plan_update(&subscription, &processor, Actor::Admin, now);
                self.apply(&subscription, &update).await?
            }
        };

        Ok(AdminSubscriptionResponse {
            success: true,
            message: "Subscription status updated".into(),
            subscription: Some(self.subscription_repo.detail(updated).await?),
        })
    }

    /// Só assinaturas canceladas podem ser apagadas.
    pub async fn admin_delete(&self, id: Uuid) -> Result<AdminSubscriptionResponse, AppError> {
        let failure = |message: &str| AdminSubscriptionResponse {
            success: false,
            message: message.to_string(),
            subscription: None,
        };

        let Some(subscription) = self.subscription_repo.find_by_id(id).await? else {
            return Ok(failure("Subscription not found"));
        };
        if subscription.status != SubscriptionStatus::Cancelled {
            return Ok(failure("Only cancelled subscriptions can be deleted"));
        }

        self.subscription_repo.delete(&self.pool, id).await?;
        info!("🗑️ Assinatura {} removida", id);
        Ok(AdminSubscriptionResponse {
            success: true,
            message: "Subscription deleted".into(),
            subscription: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn car_without_subscription_falls_back_to_the_client() {
        let car_id = Uuid::new_v4();
        assert_eq!(
            admin_lookups(Some(car_id)),
            vec![AdminLookup::ForCar(car_id), AdminLookup::LatestLive, AdminLookup::Latest]
        );
        assert_eq!(admin_lookups(None), vec![AdminLookup::LatestLive, AdminLookup::Latest]);
    }
}
