//! Wire protocol: the `{type, timestamp, data}` envelope (§6), decoded into
//! typed ingress messages and constructed as typed egress messages.

pub mod messages;
pub mod types;

pub use messages::{
    ClientEnvelope, ClientMessage, CrateWire, EnvelopeDecodeError, PlayerStateWire,
    ProjectileWire, ServerMessage,
};
pub use types::{
    CrateId, MatchEndReason, PlayerId, PlayerInput, ProjectileId, RoomId, ShootFailureReason,
    Vec2, WeaponType,
};
