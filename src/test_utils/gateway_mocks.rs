use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{
        CreatePaymentRequest, GatewayPayment, PaymentGatewayPort, PaymentResult,
    },
};

/// Payment gateway double. Created payments are remembered for assertions;
/// lookups are served from whatever was `insert`ed.
#[derive(Default)]
pub struct StubPaymentGateway {
    payments: Mutex<HashMap<String, GatewayPayment>>,
    created: Mutex<Vec<CreatePaymentRequest>>,
    fail: AtomicBool,
}

impl StubPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, payment: GatewayPayment) {
        self.payments
            .lock()
            .unwrap()
            .insert(payment.id.clone(), payment);
    }

    /// Make every call fail as if the gateway were down.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn created_requests(&self) -> Vec<CreatePaymentRequest> {
        self.created.lock().unwrap().clone()
    }

    fn check_up(&self) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::PaymentGateway("simulated gateway outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGatewayPort for StubPaymentGateway {
    async fn create_payment(&self, request: CreatePaymentRequest) -> AppResult<PaymentResult> {
        self.check_up()?;
        let payment_id = format!("pay-{}", Uuid::new_v4());
        let result = PaymentResult {
            confirmation_url: format!("https://gateway.test/checkout/{payment_id}"),
            payment_id,
            amount: request.amount.clone(),
            description: request.description.clone(),
        };
        self.created.lock().unwrap().push(request);
        Ok(result)
    }

    async fn get_payment(&self, payment_id: &str) -> AppResult<Option<GatewayPayment>> {
        self.check_up()?;
        Ok(self.payments.lock().unwrap().get(payment_id).cloned())
    }
}
