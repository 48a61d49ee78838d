use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::{Arc, LazyLock};

/// The application metrics registry.
pub static REGISTRY: LazyLock<Arc<Registry>> = LazyLock::new(build_registry);

pub(crate) static SESSIONS_BY_STATE: LazyLock<Family<SessionStateLabels, Gauge>> =
    LazyLock::new(Family::<SessionStateLabels, Gauge>::default);

pub(crate) static ACCEPTED_SESSIONS: LazyLock<Family<AcceptedSessionsLabels, Counter>> =
    LazyLock::new(Family::<AcceptedSessionsLabels, Counter>::default);

pub(crate) static REJECTED_SESSIONS: LazyLock<Family<RejectedSessionsLabels, Counter>> =
    LazyLock::new(Family::<RejectedSessionsLabels, Counter>::default);

pub(crate) static CLOSED_SESSIONS: LazyLock<Family<ClosedSessionsLabels, Counter>> =
    LazyLock::new(Family::<ClosedSessionsLabels, Counter>::default);

pub(crate) static PACKETS: LazyLock<Family<PacketLabels, Counter>> =
    LazyLock::new(Family::<PacketLabels, Counter>::default);

pub(crate) static DROPPED_FRAMES: LazyLock<Family<DroppedFramesLabels, Counter>> =
    LazyLock::new(Family::<DroppedFramesLabels, Counter>::default);

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SessionStateLabels {
    pub state: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct AcceptedSessionsLabels {}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RejectedSessionsLabels {
    pub cause: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ClosedSessionsLabels {
    pub reason: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PacketLabels {
    pub direction: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DroppedFramesLabels {}

fn build_registry() -> Arc<Registry> {
    let mut registry = Registry::with_prefix("hearth");

    registry.register(
        "sessions",
        "The number of live sessions per protocol state",
        SESSIONS_BY_STATE.clone(),
    );
    registry.register(
        "accepted_sessions",
        "Number of admitted sessions",
        ACCEPTED_SESSIONS.clone(),
    );
    registry.register(
        "rejected_sessions",
        "Number of sessions rejected at admission",
        REJECTED_SESSIONS.clone(),
    );
    registry.register(
        "closed_sessions",
        "Number of sessions closed, by disconnect reason",
        CLOSED_SESSIONS.clone(),
    );
    registry.register(
        "packets",
        "Number of packets exchanged, by direction",
        PACKETS.clone(),
    );
    registry.register(
        "dropped_frames",
        "Number of outbound frames dropped on full queues",
        DROPPED_FRAMES.clone(),
    );

    Arc::new(registry)
}
