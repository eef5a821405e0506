use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::clock::{Clock, Sleeper},
        use_cases::{reconciliation::PlanStateSource, subscription_ledger::PlanState},
    },
};

/// Clock frozen at the wrapped instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Returns immediately and records every requested delay.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Never wakes up; only cancellation gets a poller past it.
pub struct PendingSleeper;

#[async_trait]
impl Sleeper for PendingSleeper {
    async fn sleep(&self, _duration: Duration) {
        std::future::pending::<()>().await
    }
}

/// Plan source that replays a fixed script of reads. The last entry repeats
/// once the script runs out.
pub struct ScriptedPlanSource {
    script: Mutex<VecDeque<AppResult<PlanState>>>,
    calls: AtomicU32,
}

impl ScriptedPlanSource {
    pub fn new(script: Vec<AppResult<PlanState>>) -> Self {
        assert!(!script.is_empty(), "script needs at least one read");
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn always(read: AppResult<PlanState>) -> Self {
        Self::new(vec![read])
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlanStateSource for ScriptedPlanSource {
    async fn read_plan(&self, _user_id: Uuid) -> AppResult<PlanState> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            return script.pop_front().unwrap();
        }
        // AppError is not Clone; replay the last error as an internal one.
        match script.front().unwrap() {
            Ok(state) => Ok(state.clone()),
            Err(e) => Err(AppError::Internal(e.to_string())),
        }
    }
}
