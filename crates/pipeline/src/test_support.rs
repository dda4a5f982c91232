//! In-process directory fake shared by the pipeline unit tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hospital_core::directory::{CreateHospital, CreatedHospital, DirectoryClient, DirectoryError};
use hospital_core::ingest::HospitalRow;
use hospital_core::types::BatchId;
use tokio::sync::Semaphore;

pub fn rows(names: &[&str]) -> Vec<HospitalRow> {
    names
        .iter()
        .map(|name| HospitalRow::new(*name, format!("{name} Street"), None))
        .collect()
}

#[derive(Default)]
struct FakeState {
    failing: HashSet<String>,
    unreachable: bool,
    activation_fails: bool,
    requests: Vec<CreateHospital>,
    activations: Vec<BatchId>,
}

/// Directory that creates every hospital unless told otherwise.
#[derive(Default)]
pub struct FakeDirectory {
    state: Mutex<FakeState>,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject creation of hospitals with these names.
    pub fn failing<const N: usize>(self, names: [&str; N]) -> Self {
        self.set_failing(names);
        self
    }

    pub fn failing_activation(self) -> Self {
        self.state.lock().unwrap().activation_fails = true;
        self
    }

    /// Fail every call as if the host were down.
    pub fn unreachable(self) -> Self {
        self.state.lock().unwrap().unreachable = true;
        self
    }

    /// Sleep this long inside every create call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every create call takes one permit from `gate` before answering.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_failing<const N: usize>(&self, names: [&str; N]) {
        self.state.lock().unwrap().failing = names.iter().map(|n| n.to_string()).collect();
    }

    /// Stop failing anything.
    pub fn heal(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing.clear();
        state.unreachable = false;
        state.activation_fails = false;
    }

    /// Every create request received, in order.
    pub fn requests(&self) -> Vec<CreateHospital> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn activations(&self) -> Vec<BatchId> {
        self.state.lock().unwrap().activations.clone()
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn create_hospital(
        &self,
        request: &CreateHospital,
    ) -> Result<CreatedHospital, DirectoryError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        if state.unreachable {
            return Err(DirectoryError::Transport("connection refused".into()));
        }
        if state.failing.contains(&request.name) {
            return Err(DirectoryError::Rejected {
                status: 422,
                body: format!("{} rejected", request.name),
            });
        }
        Ok(CreatedHospital {
            id: state.requests.len() as i64,
            name: request.name.clone(),
        })
    }

    async fn activate_batch(&self, batch_id: BatchId) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().unwrap();
        state.activations.push(batch_id);
        if state.unreachable || state.activation_fails {
            return Err(DirectoryError::Transport("activation unavailable".into()));
        }
        Ok(())
    }
}
