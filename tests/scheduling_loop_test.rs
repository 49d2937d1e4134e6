//! Scheduling loop behavior against a scripted allocator: abort-forward
//! truncation on denial and correlation integrity on the shared channel.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use extraction_scheduler::core::{Batch, Job, OpKind, SchedulingLoop};
use extraction_scheduler::infra::{
    receive, reply_envelope, CapacityClient, DispatcherClient, Envelope, ReservationRequest,
    ReservationResponse, SharedChannel, RESERVATION_DESCRIPTION,
};
use extraction_scheduler::util::now_ms;

use common::{spawn_allocator, AllocatorScript};

const TIMEOUT: Duration = Duration::from_millis(500);

fn two_job_batch(target: &str, offset: u128) -> Batch {
    Batch::from_jobs(vec![
        Job::new(
            OpKind::Deplete,
            "D",
            target,
            4,
            1.7,
            10_000 + offset,
            20_000 + offset,
        ),
        Job::new(
            OpKind::Suppress,
            "S",
            target,
            2,
            1.75,
            11_000 + offset,
            21_000 + offset,
        ),
    ])
}

fn scheduling_loop(
    allocator: &SharedChannel,
    dispatcher: &SharedChannel,
    source: &str,
) -> SchedulingLoop {
    SchedulingLoop::new(
        CapacityClient::new(allocator.clone(), source, TIMEOUT),
        DispatcherClient::new(dispatcher.clone(), source, TIMEOUT),
        500,
    )
}

#[tokio::test]
async fn denial_abandons_current_and_all_later_batches() {
    let allocator = SharedChannel::new(16);
    let dispatcher = SharedChannel::new(16);
    let served = spawn_allocator(
        allocator.clone(),
        AllocatorScript {
            grants: vec![true, true, true, false],
            max_grant_units: 100.0,
        },
    );
    let pipeline = vec![
        two_job_batch("t", 0),
        two_job_batch("t", 1_000),
        two_job_batch("t", 2_000),
    ];

    let outcome = scheduling_loop(&allocator, &dispatcher, "sched-a")
        .schedule(&pipeline)
        .await
        .unwrap();

    // First batch landed fully; the denial in batch 2 killed it and batch 3
    // without further negotiation.
    assert_eq!(outcome.batches.len(), 1);
    assert_eq!(outcome.batches[0].jobs.len(), 2);
    assert_eq!(outcome.aborted_from, Some(1));
    assert_eq!(served.load(Ordering::SeqCst), 4);
    assert_eq!(dispatcher.len(), 2);
    assert_eq!(outcome.next_wake_ms, pipeline[0].batch_end_ms + 500);
}

#[tokio::test]
async fn denial_mid_batch_dispatches_nothing() {
    let allocator = SharedChannel::new(16);
    let dispatcher = SharedChannel::new(16);
    let served = spawn_allocator(
        allocator.clone(),
        AllocatorScript {
            grants: vec![true, false],
            max_grant_units: 100.0,
        },
    );
    let batch = Batch::from_jobs(vec![
        Job::new(OpKind::Replenish, "R", "t", 8, 1.75, 5_000, 12_750),
        Job::new(OpKind::Deplete, "D", "t", 10, 1.7, 10_000, 12_250),
        Job::new(OpKind::Suppress, "S1", "t", 2, 1.75, 2_500, 12_500),
        Job::new(OpKind::Suppress, "S2", "t", 3, 1.75, 3_000, 13_000),
    ]);

    let before = now_ms();
    let outcome = scheduling_loop(&allocator, &dispatcher, "sched-b")
        .schedule(std::slice::from_ref(&batch))
        .await
        .unwrap();
    let after = now_ms();

    assert!(outcome.batches.is_empty());
    assert_eq!(outcome.aborted_from, Some(0));
    // Only the first two jobs were ever negotiated.
    assert_eq!(served.load(Ordering::SeqCst), 2);
    assert!(dispatcher.is_empty());
    // With nothing scheduled the caller wakes one buffer from now.
    assert!(outcome.next_wake_ms >= before + 500);
    assert!(outcome.next_wake_ms <= after + 500);
}

#[tokio::test]
async fn concurrent_receivers_only_consume_their_own_replies() {
    let channel = SharedChannel::new(16);
    let request_a = Envelope::new(
        "src-a",
        RESERVATION_DESCRIPTION,
        ReservationRequest {
            ram_cost: 17.0,
            start_time_ms: 1_000,
            end_time_ms: 2_000,
        },
    )
    .unwrap();
    let request_b = Envelope::new(
        "src-b",
        RESERVATION_DESCRIPTION,
        ReservationRequest {
            ram_cost: 35.0,
            start_time_ms: 3_000,
            end_time_ms: 4_000,
        },
    )
    .unwrap();
    let cid_a = request_a.correlation_id;
    let cid_b = request_b.correlation_id;
    assert_ne!(cid_a, cid_b);

    // B's reply sits at the head; A must leave it untouched.
    let reply_b = reply_envelope(
        "allocator",
        "reservation response",
        request_b,
        ReservationResponse {
            success: true,
            host: Some("host-b".into()),
            start_time_ms: 3_000,
            end_time_ms: 4_000,
        },
    )
    .unwrap();
    let reply_a = reply_envelope(
        "allocator",
        "reservation response",
        request_a,
        ReservationResponse {
            success: true,
            host: Some("host-a".into()),
            start_time_ms: 1_000,
            end_time_ms: 2_000,
        },
    )
    .unwrap();
    assert!(channel.try_write(reply_b.to_json().unwrap()));
    assert!(channel.try_write(reply_a.to_json().unwrap()));

    let (got_a, got_b) = tokio::join!(
        receive::<ReservationRequest, ReservationResponse>(&channel, cid_a, "src-a", TIMEOUT),
        receive::<ReservationRequest, ReservationResponse>(&channel, cid_b, "src-b", TIMEOUT),
    );
    let got_a = got_a.unwrap().unwrap();
    let got_b = got_b.unwrap().unwrap();

    assert_eq!(got_a.data.host.as_deref(), Some("host-a"));
    assert_eq!(got_b.data.host.as_deref(), Some("host-b"));
    assert!(channel.is_empty());
}

#[tokio::test]
async fn two_clients_negotiate_concurrently_without_crosstalk() {
    let allocator = SharedChannel::new(16);
    spawn_allocator(
        allocator.clone(),
        AllocatorScript {
            grants: vec![true, true],
            max_grant_units: 100.0,
        },
    );
    let client_a = CapacityClient::new(allocator.clone(), "sched-a", TIMEOUT);
    let client_b = CapacityClient::new(allocator.clone(), "sched-b", TIMEOUT);

    let (res_a, res_b) = tokio::join!(
        client_a.request_capacity(17.0, 1_000, 2_000),
        client_b.request_capacity(35.0, 3_000, 4_000),
    );
    let res_a = res_a.unwrap();
    let res_b = res_b.unwrap();

    assert!(res_a.success && res_b.success);
    // Window echoes prove each client got the reply to its own request.
    assert_eq!(res_a.start_time_ms, 1_000);
    assert_eq!(res_b.start_time_ms, 3_000);
    assert_ne!(res_a.host, res_b.host);
}
