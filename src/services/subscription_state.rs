// src/services/subscription_state.rs
//
// Máquina de estados da assinatura. O processador de pagamentos é a fonte da
// verdade: pedimos a transição lá e espelhamos o resultado localmente.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    models::subscription::{LocalStatusUpdate, StatusAction, Subscription, SubscriptionStatus},
    payments::{GatewayError, PaymentGateway, ProcessorSubscription},
};

/// Estado desejado por quem pediu a transição.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedState {
    Active,
    OnHold,
    Cancelled,
}

impl RequestedState {
    /// Ações do app do cliente.
    pub fn from_client_action(action: &str) -> Option<Self> {
        match action.trim().to_lowercase().as_str() {
            "activate" | "unhold" | "resume" => Some(Self::Active),
            "hold" | "pause" => Some(Self::OnHold),
            "cancel" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Status enviados pelo painel do admin.
    pub fn from_admin_status(status: &str) -> Option<Self> {
        match status.trim().to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "on_hold" | "hold" => Some(Self::OnHold),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Quem originou a mudança; define a etiqueta gravada no histórico.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Client,
    Admin,
    Sync,
}

impl Actor {
    fn history_action(self, status: SubscriptionStatus) -> StatusAction {
        match (self, status) {
            (_, SubscriptionStatus::Inactive) | (Actor::Sync, _) => StatusAction::StripeSync,
            (Actor::Client, SubscriptionStatus::Active) => StatusAction::Unhold,
            (Actor::Client, SubscriptionStatus::OnHold) => StatusAction::Hold,
            (Actor::Client, SubscriptionStatus::Cancelled) => StatusAction::Cancel,
            (Actor::Admin, SubscriptionStatus::Active) => StatusAction::AdminActivate,
            (Actor::Admin, SubscriptionStatus::OnHold) => StatusAction::AdminHold,
            (Actor::Admin, SubscriptionStatus::Cancelled) => StatusAction::AdminCancel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorCommand {
    Cancel,
    Pause,
    Resume,
}

/// Comando a enviar ao processador. Pausar algo já pausado ou retomar algo que não
/// está pausado não gera chamada.
pub fn command_for(requested: RequestedState, paused: bool) -> Option<ProcessorCommand> {
    match requested {
        RequestedState::Cancelled => Some(ProcessorCommand::Cancel),
        RequestedState::OnHold => (!paused).then_some(ProcessorCommand::Pause),
        RequestedState::Active => paused.then_some(ProcessorCommand::Resume),
    }
}

/// Status local equivalente ao estado do processador.
/// A pausa só vale para assinaturas ativas ou em teste.
pub fn local_status_for(processor: &ProcessorSubscription) -> SubscriptionStatus {
    match processor.normalized_status().as_str() {
        "canceled" | "cancelled" => SubscriptionStatus::Cancelled,
        "active" | "trialing" if processor.is_paused() => SubscriptionStatus::OnHold,
        "active" | "trialing" => SubscriptionStatus::Active,
        _ => SubscriptionStatus::Inactive,
    }
}

fn timestamp(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}

/// Monta a atualização local a partir do estado do processador.
/// O histórico só cresce quando o status muda.
pub fn plan_update(
    current: &Subscription,
    processor: &ProcessorSubscription,
    actor: Actor,
    now: DateTime<Utc>,
) -> LocalStatusUpdate {
    let status = local_status_for(processor);
    let history_action = (status != current.status).then(|| actor.history_action(status));

    if status == SubscriptionStatus::Cancelled {
        return LocalStatusUpdate {
            status,
            start_date: None,
            end_date: Some(now),
            history_action,
        };
    }

    LocalStatusUpdate {
        status,
        start_date: timestamp(processor.period_start()),
        end_date: timestamp(processor.period_end()),
        history_action,
    }
}

/// Atualização para uma assinatura que o processador já deu como cancelada.
pub fn cancelled_sync(current: &Subscription, now: DateTime<Utc>) -> LocalStatusUpdate {
    LocalStatusUpdate {
        status: SubscriptionStatus::Cancelled,
        start_date: None,
        end_date: if current.status == SubscriptionStatus::Cancelled {
            current.end_date.or(Some(now))
        } else {
            Some(now)
        },
        history_action: (current.status != SubscriptionStatus::Cancelled)
            .then_some(StatusAction::StripeCancelledSync),
    }
}

/// Resultado de conduzir a transição no processador.
#[derive(Debug, Clone)]
pub enum Transition {
    /// Estado do processador depois do comando (ou sem comando, se nada foi preciso).
    Applied(ProcessorSubscription),
    /// O processador já tinha cancelado a assinatura; nenhum comando foi aceito.
    AlreadyCancelled,
}

/// Conversa com o processador para levar uma assinatura ao estado pedido.
#[derive(Clone)]
pub struct SubscriptionReconciler {
    gateway: Arc<dyn PaymentGateway>,
}

impl SubscriptionReconciler {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    pub async fn drive(
        &self,
        stripe_subscription_id: &str,
        requested: RequestedState,
    ) -> Result<Transition, GatewayError> {
        let current = self.gateway.retrieve_subscription(stripe_subscription_id).await?;
        self.drive_from(stripe_subscription_id, current, requested).await
    }

    /// Igual a `drive`, partindo de um estado do processador já consultado.
    pub async fn drive_from(
        &self,
        stripe_subscription_id: &str,
        current: ProcessorSubscription,
        requested: RequestedState,
    ) -> Result<Transition, GatewayError> {
        if current.is_cancelled() {
            return Ok(Transition::AlreadyCancelled);
        }

        let Some(command) = command_for(requested, current.is_paused()) else {
            return Ok(Transition::Applied(current));
        };

        info!(
            "Enviando {:?} para a assinatura {} no processador",
            command, stripe_subscription_id
        );
        let result = match command {
            ProcessorCommand::Cancel => self.gateway.cancel_subscription(stripe_subscription_id).await,
            ProcessorCommand::Pause => self.gateway.pause_subscription(stripe_subscription_id).await,
            ProcessorCommand::Resume => self.gateway.resume_subscription(stripe_subscription_id).await,
        };

        match result {
            Ok(updated) => Ok(Transition::Applied(updated)),
            Err(err) if err.is_cancelled_subscription() => Ok(Transition::AlreadyCancelled),
            Err(err) => Err(err),
        }
    }

    /// Leitura simples do estado atual, usada para sincronizar no painel.
    pub async fn fetch(&self, stripe_subscription_id: &str) -> Result<ProcessorSubscription, GatewayError> {
        self.gateway.retrieve_subscription(stripe_subscription_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::car::CarType, payments::MockPaymentGateway};
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn processor(status: &str, paused: bool) -> ProcessorSubscription {
        let pause = if paused { r#"{"behavior":"void"}"# } else { "null" };
        let json = format!(
            r#"{{"id":"sub_1","status":"{status}","pause_collection":{pause},
                "current_period_start":1709251200,"current_period_end":1711929600}}"#
        );
        serde_json::from_str(&json).unwrap()
    }

    fn local(status: SubscriptionStatus) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            car_id: Some(Uuid::new_v4()),
            plan_id: Uuid::new_v4(),
            status,
            start_date: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            end_date: None,
            stripe_subscription_id: Some("sub_1".into()),
            plan_type: "basic".into(),
            plan_car_type: CarType::Sedan,
            plan_price: Decimal::new(120, 0),
            plan_features: vec!["Exterior Wash".into()],
            plan_wash_frequency: "3 times per week".into(),
            created_at: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn actions_map_to_requested_states() {
        assert_eq!(RequestedState::from_client_action("unhold"), Some(RequestedState::Active));
        assert_eq!(RequestedState::from_client_action("HOLD"), Some(RequestedState::OnHold));
        assert_eq!(RequestedState::from_client_action("delete"), None);
        assert_eq!(RequestedState::from_admin_status("canceled"), Some(RequestedState::Cancelled));
        assert_eq!(RequestedState::from_admin_status("paused"), None);
    }

    #[test]
    fn commands_skip_no_op_transitions() {
        assert_eq!(command_for(RequestedState::OnHold, true), None);
        assert_eq!(command_for(RequestedState::OnHold, false), Some(ProcessorCommand::Pause));
        assert_eq!(command_for(RequestedState::Active, false), None);
        assert_eq!(command_for(RequestedState::Active, true), Some(ProcessorCommand::Resume));
        assert_eq!(command_for(RequestedState::Cancelled, true), Some(ProcessorCommand::Cancel));
    }

    #[test]
    fn processor_state_maps_to_local_status() {
        assert_eq!(local_status_for(&processor("active", false)), SubscriptionStatus::Active);
        assert_eq!(local_status_for(&processor("trialing", false)), SubscriptionStatus::Active);
        assert_eq!(local_status_for(&processor("active", true)), SubscriptionStatus::OnHold);
        assert_eq!(local_status_for(&processor("canceled", false)), SubscriptionStatus::Cancelled);
        assert_eq!(local_status_for(&processor("past_due", false)), SubscriptionStatus::Inactive);
        assert_eq!(local_status_for(&processor("trialing", true)), SubscriptionStatus::OnHold);
    }

    #[test]
    fn pause_marker_only_holds_live_subscriptions() {
        assert_eq!(local_status_for(&processor("past_due", true)), SubscriptionStatus::Inactive);
        assert_eq!(local_status_for(&processor("incomplete", true)), SubscriptionStatus::Inactive);
        assert_eq!(local_status_for(&processor("unpaid", true)), SubscriptionStatus::Inactive);
        assert_eq!(local_status_for(&processor("canceled", true)), SubscriptionStatus::Cancelled);

        let held = local(SubscriptionStatus::OnHold);
        let update = plan_update(&held, &processor("past_due", true), Actor::Admin, Utc::now());
        assert_eq!(update.status, SubscriptionStatus::Inactive);
        assert_eq!(update.history_action, Some(StatusAction::StripeSync));
    }

    #[test]
    fn history_grows_only_when_status_changes() {
        let now = Utc::now();
        let held = local(SubscriptionStatus::OnHold);

        let unchanged = plan_update(&held, &processor("active", true), Actor::Client, now);
        assert_eq!(unchanged.status, SubscriptionStatus::OnHold);
        assert_eq!(unchanged.history_action, None);

        let resumed = plan_update(&held, &processor("active", false), Actor::Client, now);
        assert_eq!(resumed.history_action, Some(StatusAction::Unhold));
        assert_eq!(resumed.start_date, DateTime::from_timestamp(1709251200, 0));
        assert_eq!(resumed.end_date, DateTime::from_timestamp(1711929600, 0));

        let by_admin = plan_update(&held, &processor("canceled", false), Actor::Admin, now);
        assert_eq!(by_admin.history_action, Some(StatusAction::AdminCancel));
        assert_eq!(by_admin.end_date, Some(now));
    }

    #[test]
    fn cancelled_sync_is_idempotent() {
        let now = Utc::now();
        let first = cancelled_sync(&local(SubscriptionStatus::Active), now);
        assert_eq!(first.history_action, Some(StatusAction::StripeCancelledSync));

        let mut already = local(SubscriptionStatus::Cancelled);
        let ended = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        already.end_date = Some(ended);
        let again = cancelled_sync(&already, now);
        assert_eq!(again.history_action, None);
        assert_eq!(again.end_date, Some(ended));
    }

    #[tokio::test]
    async fn holding_a_paused_subscription_sends_no_command() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_retrieve_subscription()
            .returning(|_| Ok(processor("active", true)));
        gateway.expect_pause_subscription().never();

        let reconciler = SubscriptionReconciler::new(Arc::new(gateway));
        let transition = reconciler.drive("sub_1", RequestedState::OnHold).await.unwrap();
        match transition {
            Transition::Applied(sub) => assert!(sub.is_paused()),
            Transition::AlreadyCancelled => panic!("expected applied transition"),
        }
    }

    #[tokio::test]
    async fn cancelling_a_cancelled_subscription_skips_the_processor() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_retrieve_subscription()
            .returning(|_| Ok(processor("canceled", false)));
        gateway.expect_cancel_subscription().never();

        let reconciler = SubscriptionReconciler::new(Arc::new(gateway));
        let transition = reconciler.drive("sub_1", RequestedState::Cancelled).await.unwrap();
        assert!(matches!(transition, Transition::AlreadyCancelled));
    }

    #[tokio::test]
    async fn cancelled_refusal_from_processor_is_treated_as_cancelled() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_retrieve_subscription()
            .returning(|_| Ok(processor("active", true)));
        gateway.expect_resume_subscription().times(1).returning(|_| {
            Err(GatewayError::Api {
                status: 400,
                code: None,
                message: "A canceled subscription can only update its cancellation_details and metadata."
                    .into(),
            })
        });

        let reconciler = SubscriptionReconciler::new(Arc::new(gateway));
        let transition = reconciler.drive("sub_1", RequestedState::Active).await.unwrap();
        assert!(matches!(transition, Transition::AlreadyCancelled));
    }

    #[tokio::test]
    async fn driving_from_a_fetched_state_does_not_retrieve_again() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_retrieve_subscription().never();
        gateway
            .expect_pause_subscription()
            .times(1)
            .returning(|_| Ok(processor("active", true)));

        let reconciler = SubscriptionReconciler::new(Arc::new(gateway));
        let transition = reconciler
            .drive_from("sub_1", processor("active", false), RequestedState::OnHold)
            .await
            .unwrap();
        match transition {
            Transition::Applied(sub) => assert_eq!(local_status_for(&sub), SubscriptionStatus::OnHold),
            Transition::AlreadyCancelled => panic!("expected applied transition"),
        }
    }

    #[tokio::test]
    async fn other_processor_errors_propagate() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_retrieve_subscription()
            .returning(|_| Ok(processor("active", false)));
        gateway.expect_cancel_subscription().returning(|_| {
            Err(GatewayError::Api {
                status: 404,
                code: Some("resource_missing".into()),
                message: "No such subscription: 'sub_1'".into(),
            })
        });

        let reconciler = SubscriptionReconciler::new(Arc::new(gateway));
        let err = reconciler.drive("sub_1", RequestedState::Cancelled).await.unwrap_err();
        assert_eq!(err.message(), "No such subscription: 'sub_1'");
    }
}
