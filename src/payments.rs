// src/payments.rs

pub mod stripe_client;
pub use stripe_client::StripeClient;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

// Trecho da mensagem que o processador devolve ao tentar alterar uma assinatura já cancelada
const CANCELLED_UPDATE_MARKER: &str = "canceled subscription can only update";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected processor response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Mensagem do processador, repassada ao cliente sem alteração.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_cancelled_subscription(&self) -> bool {
        self.message().to_lowercase().contains(CANCELLED_UPDATE_MARKER)
    }
}

/// Campos "expansíveis": o processador devolve só o id ou o objeto inteiro.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(T),
}

impl<T> Expandable<T> {
    pub fn as_object(&self) -> Option<&T> {
        match self {
            Expandable::Object(inner) => Some(inner),
            Expandable::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectRef {
    pub id: String,
}

impl Expandable<ObjectRef> {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object(obj) => &obj.id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PauseCollection {
    pub behavior: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorSubscription {
    pub id: String,
    #[serde(default)]
    pub status: String,
    pub customer: Option<Expandable<ObjectRef>>,
    pub pause_collection: Option<PauseCollection>,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub billing_cycle_anchor: Option<i64>,
    #[serde(default)]
    pub items: SubscriptionItems,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub latest_invoice: Option<Expandable<ProcessorInvoice>>,
    pub pending_setup_intent: Option<Expandable<ProcessorSetupIntent>>,
}

impl ProcessorSubscription {
    pub fn normalized_status(&self) -> String {
        self.status.to_lowercase()
    }

    pub fn is_paused(&self) -> bool {
        self.pause_collection.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.normalized_status().as_str(), "canceled" | "cancelled")
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer.as_ref().map(|c| c.id())
    }

    /// Início do período atual; cai para o primeiro item ou para a âncora de cobrança.
    pub fn period_start(&self) -> Option<i64> {
        self.current_period_start
            .or_else(|| self.items.data.first().and_then(|item| item.current_period_start))
            .or(self.billing_cycle_anchor)
    }

    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.items.data.first().and_then(|item| item.current_period_end))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorInvoice {
    pub id: String,
    pub status: Option<String>,
    pub amount_due: Option<i64>,
    pub payment_intent: Option<Expandable<ProcessorPaymentIntent>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorPaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorSetupIntent {
    pub id: String,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceRecurring {
    pub interval: Option<String>,
    pub trial_period_days: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorPrice {
    pub id: String,
    #[serde(default = "default_true")]
    pub active: bool,
    pub currency: Option<String>,
    pub unit_amount: Option<i64>,
    pub recurring: Option<PriceRecurring>,
    pub product: Option<Expandable<ObjectRef>>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub email: String,
    pub name: String,
    pub phone: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewPrice {
    pub product_id: String,
    pub unit_amount: i64,
    pub currency: String,
    pub plan_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub customer_id: String,
    pub price_id: String,
    pub user_id: Uuid,
    pub car_id: Uuid,
    pub plan_id: Uuid,
}

/// Fronteira com o processador de pagamentos.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn retrieve_subscription(&self, id: &str) -> Result<ProcessorSubscription, GatewayError>;
    async fn cancel_subscription(&self, id: &str) -> Result<ProcessorSubscription, GatewayError>;
    async fn pause_subscription(&self, id: &str) -> Result<ProcessorSubscription, GatewayError>;
    async fn resume_subscription(&self, id: &str) -> Result<ProcessorSubscription, GatewayError>;
    async fn create_subscription(&self, new: &NewSubscription) -> Result<ProcessorSubscription, GatewayError>;

    async fn create_customer(&self, new: &NewCustomer) -> Result<String, GatewayError>;
    async fn create_ephemeral_key(&self, customer_id: &str) -> Result<String, GatewayError>;

    async fn create_product(&self, name: &str, plan_id: Uuid) -> Result<String, GatewayError>;
    async fn retrieve_price(&self, id: &str) -> Result<ProcessorPrice, GatewayError>;
    async fn create_price(&self, new: &NewPrice) -> Result<ProcessorPrice, GatewayError>;

    async fn retrieve_invoice(&self, id: &str) -> Result<ProcessorInvoice, GatewayError>;
    async fn finalize_invoice(&self, id: &str) -> Result<ProcessorInvoice, GatewayError>;

    async fn retrieve_payment_intent(&self, id: &str) -> Result<ProcessorPaymentIntent, GatewayError>;
    async fn create_payment_intent(&self, amount: i64, currency: &str) -> Result<ProcessorPaymentIntent, GatewayError>;

    async fn retrieve_setup_intent(&self, id: &str) -> Result<ProcessorSetupIntent, GatewayError>;
    async fn create_setup_intent(&self, customer_id: &str) -> Result<ProcessorSetupIntent, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_json_with_expanded_invoice_parses() {
        let raw = serde_json::json!({
            "id": "sub_1",
            "status": "incomplete",
            "customer": "cus_9",
            "pause_collection": null,
            "items": { "data": [{ "current_period_start": 100, "current_period_end": 200 }] },
            "metadata": { "userId": "u" },
            "latest_invoice": {
                "id": "in_1",
                "status": "open",
                "amount_due": 10000,
                "payment_intent": { "id": "pi_1", "client_secret": "pi_1_secret_x" }
            }
        });
        let sub: ProcessorSubscription = serde_json::from_value(raw).unwrap();

        assert!(!sub.is_paused());
        assert_eq!(sub.customer_id(), Some("cus_9"));
        assert_eq!(sub.period_start(), Some(100));
        assert_eq!(sub.period_end(), Some(200));
        let invoice = sub.latest_invoice.as_ref().and_then(|i| i.as_object()).unwrap();
        let intent = invoice.payment_intent.as_ref().and_then(|p| p.as_object()).unwrap();
        assert_eq!(intent.client_secret.as_deref(), Some("pi_1_secret_x"));
    }

    #[test]
    fn cancelled_update_refusal_is_recognised() {
        let err = GatewayError::Api {
            status: 400,
            code: None,
            message: "A canceled subscription can only update its cancellation_details.".into(),
        };
        assert!(err.is_cancelled_subscription());
        assert_eq!(
            err.message(),
            "A canceled subscription can only update its cancellation_details."
        );
    }
}
