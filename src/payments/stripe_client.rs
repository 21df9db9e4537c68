// src/payments/stripe_client.rs

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::error;
use uuid::Uuid;

use super::{
    GatewayError, NewCustomer, NewPrice, NewSubscription, PaymentGateway, ProcessorInvoice,
    ProcessorPaymentIntent, ProcessorPrice, ProcessorSetupIntent, ProcessorSubscription,
};

const API_BASE: &str = "https://api.stripe.com/v1";
const API_VERSION: &str = "2023-10-16";

/// Cliente mínimo da API do Stripe sobre reqwest (form-encoded + bearer).
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

type Form = Vec<(&'static str, String)>;

impl StripeClient {
    /// Só aceita chaves secretas reais (`sk_...`); caso contrário o billing fica desligado.
    pub fn from_secret_key(secret_key: &str) -> Option<Self> {
        if !secret_key.starts_with("sk_") || secret_key.contains("...") {
            return None;
        }
        Some(Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.to_string(),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{API_BASE}{path}"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header("Stripe-Version", API_VERSION)
    }

    fn post(&self, path: &str, form: &Form) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{API_BASE}{path}"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header("Stripe-Version", API_VERSION)
            .form(form)
    }

    fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .delete(format!("{API_BASE}{path}"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header("Stripe-Version", API_VERSION)
    }

    async fn send<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T, GatewayError> {
        let resp = request.send().await?;
        let status = resp.status();

        if status.is_success() {
            return resp
                .json::<T>()
                .await
                .map_err(|e| GatewayError::Decode(format!("{context}: {e}")));
        }

        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?details.as_ref().and_then(|d| d.type_.clone()),
            stripe_error_param = ?details.as_ref().and_then(|d| d.param.clone()),
            context = %context,
            "stripe api request failed"
        );

        let (code, message) = match details {
            Some(d) => (
                d.code,
                d.message
                    .unwrap_or_else(|| format!("Stripe request failed: {context}")),
            ),
            None => (None, format!("Stripe request failed: {context} (status {status})")),
        };

        Err(GatewayError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn retrieve_subscription(&self, id: &str) -> Result<ProcessorSubscription, GatewayError> {
        Self::send(self.get(&format!("/subscriptions/{id}")), "retrieve subscription").await
    }

    async fn cancel_subscription(&self, id: &str) -> Result<ProcessorSubscription, GatewayError> {
        Self::send(self.delete(&format!("/subscriptions/{id}")), "cancel subscription").await
    }

    async fn pause_subscription(&self, id: &str) -> Result<ProcessorSubscription, GatewayError> {
        let form: Form = vec![("pause_collection[behavior]", "void".to_string())];
        Self::send(self.post(&format!("/subscriptions/{id}"), &form), "pause subscription").await
    }

    async fn resume_subscription(&self, id: &str) -> Result<ProcessorSubscription, GatewayError> {
        // Valor vazio remove o pause_collection
        let form: Form = vec![("pause_collection", String::new())];
        Self::send(self.post(&format!("/subscriptions/{id}"), &form), "resume subscription").await
    }

    async fn create_subscription(&self, new: &NewSubscription) -> Result<ProcessorSubscription, GatewayError> {
        let form: Form = vec![
            ("customer", new.customer_id.clone()),
            ("items[0][price]", new.price_id.clone()),
            ("collection_method", "charge_automatically".to_string()),
            ("payment_behavior", "default_incomplete".to_string()),
            ("payment_settings[payment_method_types][0]", "card".to_string()),
            ("payment_settings[save_default_payment_method]", "on_subscription".to_string()),
            ("metadata[userId]", new.user_id.to_string()),
            ("metadata[carId]", new.car_id.to_string()),
            ("metadata[planId]", new.plan_id.to_string()),
            ("expand[0]", "latest_invoice.payment_intent".to_string()),
        ];
        Self::send(self.post("/subscriptions", &form), "create subscription").await
    }

    async fn create_customer(&self, new: &NewCustomer) -> Result<String, GatewayError> {
        #[derive(Deserialize)]
        struct CustomerResp {
            id: String,
        }

        let form: Form = vec![
            ("email", new.email.clone()),
            ("name", new.name.clone()),
            ("phone", new.phone.clone()),
            ("metadata[userId]", new.user_id.to_string()),
        ];
        let parsed: CustomerResp = Self::send(self.post("/customers", &form), "create customer").await?;
        Ok(parsed.id)
    }

    async fn create_ephemeral_key(&self, customer_id: &str) -> Result<String, GatewayError> {
        #[derive(Deserialize)]
        struct EphemeralKeyResp {
            secret: String,
        }

        let form: Form = vec![("customer", customer_id.to_string())];
        let parsed: EphemeralKeyResp =
            Self::send(self.post("/ephemeral_keys", &form), "create ephemeral key").await?;
        Ok(parsed.secret)
    }

    async fn create_product(&self, name: &str, plan_id: Uuid) -> Result<String, GatewayError> {
        #[derive(Deserialize)]
        struct ProductResp {
            id: String,
        }

        let form: Form = vec![
            ("name", name.to_string()),
            ("metadata[planId]", plan_id.to_string()),
        ];
        let parsed: ProductResp = Self::send(self.post("/products", &form), "create product").await?;
        Ok(parsed.id)
    }

    async fn retrieve_price(&self, id: &str) -> Result<ProcessorPrice, GatewayError> {
        Self::send(self.get(&format!("/prices/{id}")), "retrieve price").await
    }

    async fn create_price(&self, new: &NewPrice) -> Result<ProcessorPrice, GatewayError> {
        let form: Form = vec![
            ("unit_amount", new.unit_amount.to_string()),
            ("currency", new.currency.clone()),
            ("recurring[interval]", "month".to_string()),
            ("product", new.product_id.clone()),
            ("metadata[planId]", new.plan_id.to_string()),
        ];
        Self::send(self.post("/prices", &form), "create price").await
    }

    async fn retrieve_invoice(&self, id: &str) -> Result<ProcessorInvoice, GatewayError> {
        let request = self
            .get(&format!("/invoices/{id}"))
            .query(&[("expand[]", "payment_intent")]);
        Self::send(request, "retrieve invoice").await
    }

    async fn finalize_invoice(&self, id: &str) -> Result<ProcessorInvoice, GatewayError> {
        let form: Form = vec![("expand[0]", "payment_intent".to_string())];
        Self::send(self.post(&format!("/invoices/{id}/finalize"), &form), "finalize invoice").await
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<ProcessorPaymentIntent, GatewayError> {
        Self::send(self.get(&format!("/payment_intents/{id}")), "retrieve payment intent").await
    }

    async fn create_payment_intent(&self, amount: i64, currency: &str) -> Result<ProcessorPaymentIntent, GatewayError> {
        let form: Form = vec![
            ("amount", amount.to_string()),
            ("currency", currency.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];
        Self::send(self.post("/payment_intents", &form), "create payment intent").await
    }

    async fn retrieve_setup_intent(&self, id: &str) -> Result<ProcessorSetupIntent, GatewayError> {
        Self::send(self.get(&format!("/setup_intents/{id}")), "retrieve setup intent").await
    }

    async fn create_setup_intent(&self, customer_id: &str) -> Result<ProcessorSetupIntent, GatewayError> {
        let form: Form = vec![
            ("customer", customer_id.to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("usage", "off_session".to_string()),
        ];
        Self::send(self.post("/setup_intents", &form), "create setup intent").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_and_publishable_keys_disable_billing() {
        assert!(StripeClient::from_secret_key("").is_none());
        assert!(StripeClient::from_secret_key("pk_test_123").is_none());
        assert!(StripeClient::from_secret_key("sk_test_...").is_none());
        assert!(StripeClient::from_secret_key("sk_test_abc").is_some());
    }

    #[test]
    fn error_envelope_extracts_processor_message() {
        let body = r#"{"error":{"type":"invalid_request_error","code":"resource_missing","message":"No such subscription: 'sub_x'","param":"id"}}"#;
        let envelope: StripeErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.error.code.as_deref(), Some("resource_missing"));
        assert_eq!(envelope.error.message.as_deref(), Some("No such subscription: 'sub_x'"));
    }
}
