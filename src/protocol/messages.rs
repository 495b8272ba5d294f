use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{
    CrateId, MatchEndReason, PlayerId, PlayerInput, ProjectileId, RoomId, ShootFailureReason,
    Vec2, WeaponType,
};

/// The wire envelope every frame is wrapped in (§6):
/// `{ "type": string, "timestamp": int64-ms, "data": object? }`.
///
/// Decoded once at the transport boundary; `data` stays a raw [`Value`]
/// until [`ClientMessage::from_envelope`] dispatches on `message_type` and
/// parses it into a typed payload, per the "decode into typed structures
/// once" design note (§9).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientEnvelope {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub data: Value,
}

/// Typed ingress messages, one variant per known `type` (§6), plus
/// `Unknown` for the legacy room-wide pass-through path (§4.5).
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    InputState(PlayerInput),
    PlayerShoot { aim_angle: f64 },
    PlayerReload,
    PlayerMeleeAttack { aim_angle: f64 },
    PlayerDodgeRoll { aim_angle: f64 },
    WeaponPickupAttempt { crate_id: CrateId },
    Unknown { message_type: String, data: Value },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeDecodeError {
    #[error("envelope data did not match the shape expected for type {message_type}")]
    ShapeMismatch { message_type: String },
}

impl ClientMessage {
    /// Dispatches on `envelope.message_type` and parses `data` into the
    /// matching typed payload. A shape mismatch (missing/extra/mistyped
    /// field) is reported as [`EnvelopeDecodeError::ShapeMismatch`] rather
    /// than panicking; the caller treats it identically to a schema
    /// validation failure (log with player id, drop, no state change).
    pub fn from_envelope(envelope: &ClientEnvelope) -> Result<Self, EnvelopeDecodeError> {
        let shape_error = || EnvelopeDecodeError::ShapeMismatch {
            message_type: envelope.message_type.clone(),
        };

        match envelope.message_type.as_str() {
            "input:state" => {
                let input: PlayerInput =
                    serde_json::from_value(envelope.data.clone()).map_err(|_| shape_error())?;
                Ok(ClientMessage::InputState(input))
            }
            "player:shoot" => {
                #[derive(Deserialize)]
                struct Payload {
                    #[serde(rename = "aimAngle")]
                    aim_angle: f64,
                }
                let payload: Payload =
                    serde_json::from_value(envelope.data.clone()).map_err(|_| shape_error())?;
                Ok(ClientMessage::PlayerShoot {
                    aim_angle: payload.aim_angle,
                })
            }
            "player:reload" => Ok(ClientMessage::PlayerReload),
            "player:melee_attack" => {
                #[derive(Deserialize)]
                struct Payload {
                    #[serde(rename = "aimAngle")]
                    aim_angle: f64,
                }
                let payload: Payload =
                    serde_json::from_value(envelope.data.clone()).map_err(|_| shape_error())?;
                Ok(ClientMessage::PlayerMeleeAttack {
                    aim_angle: payload.aim_angle,
                })
            }
            "player:dodge_roll" => {
                #[derive(Deserialize)]
                struct Payload {
                    #[serde(rename = "aimAngle")]
                    aim_angle: f64,
                }
                let payload: Payload =
                    serde_json::from_value(envelope.data.clone()).map_err(|_| shape_error())?;
                Ok(ClientMessage::PlayerDodgeRoll {
                    aim_angle: payload.aim_angle,
                })
            }
            "weapon:pickup_attempt" => {
                #[derive(Deserialize)]
                struct Payload {
                    #[serde(rename = "crateId")]
                    crate_id: CrateId,
                }
                let payload: Payload =
                    serde_json::from_value(envelope.data.clone()).map_err(|_| shape_error())?;
                Ok(ClientMessage::WeaponPickupAttempt {
                    crate_id: payload.crate_id,
                })
            }
            other => Ok(ClientMessage::Unknown {
                message_type: other.to_string(),
                data: envelope.data.clone(),
            }),
        }
    }

    /// The schema name to validate `data` against (§6): the message type
    /// with colons and underscores both replaced by hyphens, suffixed
    /// `-data`, e.g. `player:melee_attack` → `player-melee-attack-data`.
    pub fn schema_name(message_type: &str) -> String {
        format!("{}-data", message_type.replace([':', '_'], "-"))
    }
}

/// Partial/optional player-state payload used by `player:move`: a full
/// snapshot has every field `Some`; a delta has only the fields that
/// crossed a threshold (§4.6), plus `id` which is always present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStateWire {
    pub id: PlayerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aim_angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_alive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_invulnerable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolling: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_regenerating_health: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kills: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deaths: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileWire {
    pub id: ProjectileId,
    pub owner_id: PlayerId,
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrateWire {
    pub id: CrateId,
    pub weapon_type: WeaponType,
    pub position: Vec2,
    pub is_available: bool,
}

/// Typed egress messages, one variant per `type` in §6's canonical list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "room:joined")]
    RoomJoined {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        #[serde(rename = "roomId")]
        room_id: RoomId,
        #[serde(rename = "peerIds")]
        peer_ids: Vec<PlayerId>,
        #[serde(rename = "killTarget")]
        kill_target: u32,
        #[serde(rename = "timeLimitSeconds")]
        time_limit_seconds: u64,
    },

    #[serde(rename = "player:move")]
    PlayerMove {
        players: Vec<PlayerStateWire>,
        #[serde(rename = "isSnapshot")]
        is_snapshot: bool,
    },

    #[serde(rename = "projectile:spawn")]
    ProjectileSpawn { projectiles: Vec<ProjectileWire> },

    #[serde(rename = "projectile:despawn")]
    ProjectileDespawn { ids: Vec<ProjectileId> },

    #[serde(rename = "weapon:state")]
    WeaponState {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        #[serde(rename = "weaponType")]
        weapon_type: WeaponType,
        #[serde(rename = "ammoInMagazine")]
        ammo_in_magazine: u32,
        #[serde(rename = "magazineSize")]
        magazine_size: u32,
        reloading: bool,
    },

    #[serde(rename = "shoot:failed")]
    ShootFailed { reason: ShootFailureReason },

    #[serde(rename = "player:damaged")]
    PlayerDamaged {
        #[serde(rename = "victimId")]
        victim_id: PlayerId,
        #[serde(rename = "attackerId")]
        attacker_id: PlayerId,
        damage: f64,
        #[serde(rename = "newHealth")]
        new_health: f64,
        #[serde(rename = "projectileId")]
        projectile_id: ProjectileId,
    },

    #[serde(rename = "hit:confirmed")]
    HitConfirmed {
        #[serde(rename = "victimId")]
        victim_id: PlayerId,
        damage: f64,
        #[serde(rename = "projectileId")]
        projectile_id: ProjectileId,
    },

    #[serde(rename = "player:death")]
    PlayerDeath {
        #[serde(rename = "victimId")]
        victim_id: PlayerId,
        #[serde(rename = "attackerId")]
        attacker_id: PlayerId,
    },

    #[serde(rename = "player:kill_credit")]
    PlayerKillCredit {
        #[serde(rename = "killerId")]
        killer_id: PlayerId,
        #[serde(rename = "victimId")]
        victim_id: PlayerId,
        #[serde(rename = "killerKills")]
        killer_kills: u32,
        #[serde(rename = "killerXP")]
        killer_xp: u32,
    },

    #[serde(rename = "player:respawn")]
    PlayerRespawn {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        position: Vec2,
        health: f64,
    },

    #[serde(rename = "weapon:spawned")]
    WeaponSpawned { crates: Vec<CrateWire> },

    #[serde(rename = "weapon:respawned")]
    WeaponRespawned {
        #[serde(rename = "crateId")]
        crate_id: CrateId,
        #[serde(rename = "weaponType")]
        weapon_type: WeaponType,
        position: Vec2,
    },

    #[serde(rename = "weapon:pickup_confirmed")]
    WeaponPickupConfirmed {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        #[serde(rename = "crateId")]
        crate_id: CrateId,
        #[serde(rename = "weaponType")]
        weapon_type: WeaponType,
        #[serde(rename = "nextRespawnTime")]
        next_respawn_time: i64,
    },

    #[serde(rename = "melee:hit")]
    MeleeHit {
        #[serde(rename = "attackerId")]
        attacker_id: PlayerId,
        #[serde(rename = "victimIds")]
        victim_ids: Vec<PlayerId>,
        killed: Vec<PlayerId>,
    },

    #[serde(rename = "roll:start")]
    RollStart {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },

    #[serde(rename = "roll:end")]
    RollEnd {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },

    #[serde(rename = "match:timer")]
    MatchTimer {
        #[serde(rename = "remainingSeconds")]
        remaining_seconds: u64,
        scores: HashMap<PlayerId, u32>,
    },

    #[serde(rename = "match:ended")]
    MatchEnded {
        winners: Vec<PlayerId>,
        #[serde(rename = "finalScores")]
        final_scores: HashMap<PlayerId, u32>,
        reason: MatchEndReason,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_state_missing_field_is_shape_mismatch() {
        let envelope = ClientEnvelope {
            message_type: "input:state".to_string(),
            timestamp: 0,
            data: serde_json::json!({"up": true, "down": false, "left": true, "aimAngle": 1.5}),
        };
        let result = ClientMessage::from_envelope(&envelope);
        assert!(matches!(
            result,
            Err(EnvelopeDecodeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn input_state_complete_payload_parses() {
        let envelope = ClientEnvelope {
            message_type: "input:state".to_string(),
            timestamp: 0,
            data: serde_json::json!({
                "up": true, "down": false, "left": true, "right": false,
                "aimAngle": 1.5, "isSprinting": false
            }),
        };
        let result = ClientMessage::from_envelope(&envelope).unwrap();
        assert!(matches!(result, ClientMessage::InputState(_)));
    }

    #[test]
    fn unknown_type_passes_through_raw_data() {
        let envelope = ClientEnvelope {
            message_type: "legacy:custom".to_string(),
            timestamp: 0,
            data: serde_json::json!({"foo": "bar"}),
        };
        let result = ClientMessage::from_envelope(&envelope).unwrap();
        match result {
            ClientMessage::Unknown { message_type, data } => {
                assert_eq!(message_type, "legacy:custom");
                assert_eq!(data["foo"], "bar");
            }
            _ => panic!("expected Unknown variant"),
        }
    }

    #[test]
    fn schema_name_replaces_colons_and_underscores() {
        assert_eq!(
            ClientMessage::schema_name("player:melee_attack"),
            "player-melee-attack-data"
        );
        assert_eq!(
            ClientMessage::schema_name("input:state"),
            "input-state-data"
        );
    }

    #[test]
    fn server_message_serializes_with_tagged_envelope_shape() {
        let msg = ServerMessage::RollStart {
            player_id: PlayerId::nil(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "roll:start");
        assert_eq!(value["data"]["playerId"], PlayerId::nil().to_string());
    }
}
