//! In-process fakes for the transport and directory seams.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use pondwatch::directory::{DirectoryError, RecipientDirectory};
use pondwatch::transport::{PushTransport, SendReport, TransportError};
use pondwatch::{AlertPayload, RecipientAddress, SensorReading};

/// What the fake transport does on one call.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Succeed,
    /// Call goes through but this many addresses are rejected.
    PartialFailure(usize),
    Fail,
    Hang,
}

type Plan = Box<dyn Fn(usize, &[RecipientAddress]) -> Behavior + Send + Sync>;

/// Transport whose behaviour is decided per call by a plan closure.
///
/// The plan receives the attempt number for the batch (1-based, keyed by the
/// batch's first address) and the batch itself.
pub struct FakeTransport {
    plan: Plan,
    calls: AtomicUsize,
    attempts: Mutex<HashMap<String, usize>>,
    batches: Mutex<Vec<Vec<String>>>,
    delivered: Option<mpsc::UnboundedSender<AlertPayload>>,
}

impl FakeTransport {
    pub fn new(plan: impl Fn(usize, &[RecipientAddress]) -> Behavior + Send + Sync + 'static) -> Self {
        Self {
            plan: Box::new(plan),
            calls: AtomicUsize::new(0),
            attempts: Mutex::new(HashMap::new()),
            batches: Mutex::new(Vec::new()),
            delivered: None,
        }
    }

    pub fn always(behavior: Behavior) -> Self {
        Self::new(move |_, _| behavior)
    }

    /// Forward every successfully delivered payload to a channel.
    pub fn with_delivery_channel(mut self) -> (Self, mpsc::UnboundedReceiver<AlertPayload>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.delivered = Some(tx);
        (self, rx)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Batches in call order, one entry per call including retries.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for FakeTransport {
    async fn send(
        &self,
        addresses: &[RecipientAddress],
        payload: &AlertPayload,
    ) -> Result<SendReport, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches
            .lock()
            .unwrap()
            .push(addresses.iter().map(|a| a.to_string()).collect());

        let attempt = {
            let key = addresses.first().map(|a| a.to_string()).unwrap_or_default();
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(key).or_insert(0);
            *n += 1;
            *n
        };

        let report = match (self.plan)(attempt, addresses) {
            Behavior::Succeed => SendReport {
                success_count: addresses.len(),
                failure_count: 0,
            },
            Behavior::PartialFailure(rejected) => SendReport {
                success_count: addresses.len().saturating_sub(rejected),
                failure_count: rejected.min(addresses.len()),
            },
            Behavior::Fail => {
                return Err(TransportError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE))
            }
            Behavior::Hang => std::future::pending().await,
        };

        if let Some(tx) = &self.delivered {
            let _ = tx.send(payload.clone());
        }
        Ok(report)
    }
}

/// Directory returning a fixed list and counting lookups.
pub struct FakeDirectory {
    tokens: Vec<RecipientAddress>,
    fail: bool,
    lookups: AtomicUsize,
}

impl FakeDirectory {
    pub fn with_tokens(count: usize) -> Self {
        Self {
            tokens: addresses(count),
            fail: false,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            tokens: Vec::new(),
            fail: true,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipientDirectory for FakeDirectory {
    async fn recipients(&self) -> Result<Vec<RecipientAddress>, DirectoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DirectoryError::Status(reqwest::StatusCode::BAD_GATEWAY));
        }
        Ok(self.tokens.clone())
    }
}

pub fn addresses(count: usize) -> Vec<RecipientAddress> {
    (0..count)
        .filter_map(|i| RecipientAddress::parse(&format!("token-{i:02}")))
        .collect()
}

pub fn payload() -> AlertPayload {
    AlertPayload {
        title: "⚠️ Alert at pond-1".to_string(),
        body: "Oxygen out of range: 3 mg/L".to_string(),
        data: Default::default(),
    }
}

pub fn safe_reading() -> SensorReading {
    SensorReading {
        site_id: "pond-1".to_string(),
        ph: 7.0,
        temperature: 22.0,
        dissolved_oxygen: 6.5,
        dissolved_solids: 200.0,
        turbidity: 5.0,
        observed_at: None,
    }
}

pub fn low_oxygen_reading() -> SensorReading {
    SensorReading {
        dissolved_oxygen: 3.0,
        ..safe_reading()
    }
}
