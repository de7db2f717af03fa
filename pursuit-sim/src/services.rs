use crate::config::{BackoffPolicy, FaultPlan};
use fastrand::Rng;
use pursuit_core::{ServiceError, ServiceKind, ServiceRequest};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub request: ServiceRequest,
    pub outcome: Result<(), ServiceError>,
}

#[derive(Debug, Clone)]
pub struct ServiceBoundary {
    faults: FaultPlan,
    backoff: BackoffPolicy,
    seed: u64,
    tx: mpsc::Sender<Completion>,
}

impl ServiceBoundary {
    pub fn new(
        faults: FaultPlan,
        backoff: BackoffPolicy,
        seed: u64,
        tx: mpsc::Sender<Completion>,
    ) -> Self {
        Self {
            faults,
            backoff,
            seed,
            tx,
        }
    }

    pub fn dispatch(&self, request: ServiceRequest) {
        let faults = self.faults.clone();
        let backoff = self.backoff.clone();
        let tx = self.tx.clone();
        let mut rng = Rng::with_seed(request_seed(self.seed, request.id.0));

        tokio::spawn(async move {
            let outcome = call(&request, &faults, &backoff, &mut rng).await;
            if tx.send(Completion { request, outcome }).await.is_err() {
                debug!("event loop closed, dropping service completion");
            }
        });
    }
}

async fn call(
    request: &ServiceRequest,
    faults: &FaultPlan,
    backoff: &BackoffPolicy,
    rng: &mut Rng,
) -> Result<(), ServiceError> {
    let service = request.kind.service();

    let pause = backoff.retry_delay(request.attempt);
    if !pause.is_zero() {
        debug!(request = %request.id, attempt = request.attempt, ?pause, "backing off before retry");
        sleep(pause).await;
    }

    wait_for_service(service, faults, backoff, rng).await?;
    sleep(Duration::from_millis(faults.call_latency_ms)).await;

    if rng.f64() < faults.failure_rate {
        return Err(ServiceError::failed(service, "injected service failure"));
    }
    Ok(())
}

async fn wait_for_service(
    service: ServiceKind,
    faults: &FaultPlan,
    backoff: &BackoffPolicy,
    rng: &mut Rng,
) -> Result<(), ServiceError> {
    let started = Instant::now();
    let mut polls = 0u32;

    while rng.f64() < faults.unavailable_rate {
        let waited = started.elapsed();
        if waited >= backoff.availability_timeout() {
            return Err(ServiceError::Unavailable {
                service,
                waited_ms: waited.as_millis() as u64,
            });
        }
        warn!("waiting for {service} service...");
        sleep(backoff.delay(polls)).await;
        polls += 1;
    }
    Ok(())
}

fn request_seed(seed: u64, request: u64) -> u64 {
    seed ^ request.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pursuit_core::{Pose, RequestId, RequestKind};

    fn request(id: u64, attempt: u32) -> ServiceRequest {
        ServiceRequest {
            id: RequestId(id),
            attempt,
            kind: RequestKind::Create {
                agent: "turtle2".into(),
                pose: Pose::new(1.0, 2.0, 0.0),
            },
        }
    }

    fn boundary(faults: FaultPlan) -> (ServiceBoundary, mpsc::Receiver<Completion>) {
        let (tx, rx) = mpsc::channel(8);
        (
            ServiceBoundary::new(faults, BackoffPolicy::default(), 5, tx),
            rx,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_service_succeeds() {
        let (boundary, mut rx) = boundary(FaultPlan::default());
        boundary.dispatch(request(1, 1));

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.request.id, RequestId(1));
        assert_eq!(completion.outcome, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_service_reports_failure() {
        let (boundary, mut rx) = boundary(FaultPlan {
            failure_rate: 1.0,
            ..FaultPlan::default()
        });
        boundary.dispatch(request(2, 1));

        let completion = rx.recv().await.unwrap();
        assert!(matches!(
            completion.outcome,
            Err(ServiceError::Failed {
                service: ServiceKind::Create,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_service_gives_up_after_timeout() {
        let (boundary, mut rx) = boundary(FaultPlan {
            unavailable_rate: 1.0,
            ..FaultPlan::default()
        });
        let started = Instant::now();
        boundary.dispatch(request(3, 1));

        let completion = rx.recv().await.unwrap();
        match completion.outcome {
            Err(ServiceError::Unavailable { service, waited_ms }) => {
                assert_eq!(service, ServiceKind::Create);
                assert!(waited_ms >= 2_000);
            }
            other => panic!("expected unavailable, got {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_wait_out_the_backoff() {
        let (boundary, mut rx) = boundary(FaultPlan {
            call_latency_ms: 0,
            ..FaultPlan::default()
        });
        let started = Instant::now();
        boundary.dispatch(request(4, 3));

        rx.recv().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
