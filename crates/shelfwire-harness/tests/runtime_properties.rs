//! Property-based tests for the runtime under arbitrary network behavior.
//!
//! Random sequences of broker frames, drops, clock jumps and UI commands are
//! applied to a [`SimWorld`]. The world checks the standard invariants after
//! every step; the properties here add the cross-step guarantees.

use std::time::Duration;

use proptest::prelude::*;
use shelfwire_app::{AppEvent, DriverEvent};
use shelfwire_core::ConnectionState;
use shelfwire_harness::SimWorld;
use shelfwire_proto::NotificationEvent;

#[derive(Debug, Clone)]
enum NetOp {
    Open,
    Handshake,
    Notify(u8),
    Malformed(Vec<u8>),
    Drop,
    Advance(u64),
    MarkAllAsRead,
    Clear,
}

fn op_strategy() -> impl Strategy<Value = NetOp> {
    prop_oneof![
        2 => Just(NetOp::Open),
        2 => Just(NetOp::Handshake),
        3 => (0u8..5).prop_map(NetOp::Notify),
        2 => prop::collection::vec(any::<u8>(), 0..64).prop_map(NetOp::Malformed),
        2 => Just(NetOp::Drop),
        2 => (0u64..120).prop_map(NetOp::Advance),
        1 => Just(NetOp::MarkAllAsRead),
        1 => Just(NetOp::Clear),
    ]
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(future)
}

const STATUSES: [&str; 5] = ["BORROWED", "RETURNED", "APPROVED", "REJECTED", "OVERDUE"];

async fn apply(world: &mut SimWorld, op: &NetOp) {
    match op {
        NetOp::Open => {
            world.handle().transport_opened();
            world.settle().await.unwrap();
        },
        NetOp::Handshake => {
            let connected = world.server().connected();
            world.deliver(&connected).await.unwrap();
        },
        NetOp::Notify(status) => {
            let event = NotificationEvent::new(STATUSES[*status as usize], "m");
            world.notify(&event).await.unwrap();
        },
        NetOp::Malformed(body) => {
            if let Some(subscription) = world.subscription() {
                let frame = world.server().message(&subscription, "application/json", body.clone());
                world.deliver(&frame).await.unwrap();
            }
        },
        NetOp::Drop => world.drop_transport("dropped").await.unwrap(),
        NetOp::Advance(secs) => world.advance(Duration::from_secs(*secs)).await.unwrap(),
        NetOp::MarkAllAsRead => {
            world.handle().inject(DriverEvent::App(AppEvent::MarkAllAsRead));
            world.settle().await.unwrap();
        },
        NetOp::Clear => {
            world.handle().inject(DriverEvent::App(AppEvent::ClearNotifications));
            world.settle().await.unwrap();
        },
    }
}

proptest! {
    /// Invariants hold and only well-formed payloads reach the store.
    #[test]
    fn prop_only_valid_payloads_are_stored(ops in prop::collection::vec(op_strategy(), 1..60)) {
        block_on(async {
            let mut world = SimWorld::new(Some("42"));
            world.start().await.unwrap();

            for op in &ops {
                let before = world.runtime().app().notifications().len();
                let connected = world.state() == ConnectionState::Connected;
                apply(&mut world, op).await;
                let after = world.runtime().app().notifications().len();

                match op {
                    NetOp::Notify(_) if connected => assert_eq!(after, before + 1),
                    NetOp::Clear => assert_eq!(after, 0),
                    _ => assert!(after <= before),
                }
            }
        });
    }

    /// After `disconnect`, no transport is ever opened again.
    #[test]
    fn prop_disconnect_is_final(
        before in prop::collection::vec(op_strategy(), 0..30),
        after in prop::collection::vec(op_strategy(), 0..30),
    ) {
        block_on(async {
            let mut world = SimWorld::new(Some("42"));
            world.start().await.unwrap();
            for op in &before {
                apply(&mut world, op).await;
            }

            world.runtime_mut().disconnect().await.unwrap();
            let opens = world.handle().opens().len();

            for op in &after {
                apply(&mut world, op).await;
            }

            assert_eq!(world.handle().opens().len(), opens);
            assert_eq!(world.state(), ConnectionState::Disconnected);
            assert!(world.runtime().retry_deadline().is_none());
        });
    }
}
