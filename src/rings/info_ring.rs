use std::collections::{HashMap, VecDeque};

use crate::commit::Commit;
use crate::config::{InfoGateConfig, SanityGateConfig};
use crate::error::InfoError;
use crate::info::Info;
use crate::payload::{Payload, TransformPayload};
use crate::rings::container::ContainerRing;
use crate::types::{AuthoritySource, NetId, SchemaId, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Accept,
    Reject,
    Verify,
}

struct PendingVerification {
    info: Info,
    expires_tick: Tick,
}

/// Fact intake and arbitration. See spec.md 4.3.
pub struct InfoRing {
    config: InfoGateConfig,
    intake: VecDeque<Info>,
    intake_capacity: usize,
    pending_verification: HashMap<(NetId, SchemaId), PendingVerification>,
    pub queue_overflow_count: u64,
    pub stale_tick_count: u64,
    pub frame_mismatch_count: u64,
    pub unknown_entity_count: u64,
    pub rejected_count: u64,
    pub verification_timeout_count: u64,
}

impl InfoRing {
    pub fn new(config: InfoGateConfig) -> Self {
        Self {
            intake_capacity: config.max_lag_ticks.max(1) as usize * 256,
            config,
            intake: VecDeque::new(),
            pending_verification: HashMap::new(),
            queue_overflow_count: 0,
            stale_tick_count: 0,
            frame_mismatch_count: 0,
            unknown_entity_count: 0,
            rejected_count: 0,
            verification_timeout_count: 0,
        }
    }

    /// Enqueues into a bounded queue; overflow drops the oldest low-priority entry
    /// (lowest `AuthoritySource` rank) and increments a counter. See spec.md 4.3
    /// "Intake".
    pub fn submit(&mut self, info: Info) {
        if self.intake.len() >= self.intake_capacity {
            if let Some((idx, _)) = self
                .intake
                .iter()
                .enumerate()
                .min_by_key(|(_, candidate)| candidate.authority)
            {
                self.intake.remove(idx);
                self.queue_overflow_count += 1;
                log::warn!("InfoRing intake queue overflowed, dropped oldest low-priority entry");
            }
        }
        self.intake.push_back(info);
    }

    pub fn pending_len(&self) -> usize {
        self.intake.len()
    }

    /// Accept/verify/reject each queued Info up to `maxInfosPerCycle`, then arbitrate
    /// winners per `(subject, schema)`. See spec.md 4.1 step 3 and 4.3.
    pub fn process_tick(
        &mut self,
        current_tick: Tick,
        container: &mut ContainerRing,
        last_commits: &HashMap<(NetId, SchemaId), Commit>,
        sanity: &SanityGateConfig,
    ) -> Vec<Info> {
        let budget = self.config.max_infos_per_cycle;
        let mut accepted: Vec<Info> = Vec::new();

        for _ in 0..budget {
            let Some(mut candidate) = self.intake.pop_front() else {
                break;
            };
            if let Some(verdict) =
                self.validate_and_score(&mut candidate, current_tick, container, last_commits, sanity)
            {
                accepted.push(verdict);
            }
        }

        // resolve any verification windows whose deadline has passed this tick
        let mut expired_keys = Vec::new();
        for (key, pending) in self.pending_verification.iter() {
            if current_tick >= pending.expires_tick {
                expired_keys.push(*key);
            }
        }
        for key in expired_keys {
            self.pending_verification.remove(&key);
            self.verification_timeout_count += 1;
            log::debug!("InfoRing verification window timed out for {:?}", key);
        }

        self.arbitrate(accepted)
    }

    fn validate_and_score(
        &mut self,
        info: &mut Info,
        current_tick: Tick,
        container: &mut ContainerRing,
        last_commits: &HashMap<(NetId, SchemaId), Commit>,
        sanity: &SanityGateConfig,
    ) -> Option<Info> {
        let Some(record) = container.lookup(info.subject) else {
            self.unknown_entity_count += 1;
            log::debug!("{}", InfoError::UnknownEntity(info.subject));
            return None;
        };
        let record_frame = record.frame;

        if !info.frame.is_convertible_to(&record_frame) {
            self.frame_mismatch_count += 1;
            log::debug!("{}", InfoError::FrameMismatch);
            return None;
        }

        // bring the candidate into the subject's registered frame before it is scored
        // or committed, so a Zone-local report lands on the same coordinates a
        // World-frame report of the same fact would (spec.md 4.3 "frame conversion").
        if let Payload::Transform(t) = &info.payload {
            if let Some(converted) = info.frame.convert(&record_frame, t.position) {
                info.payload = Payload::Transform(TransformPayload {
                    position: converted,
                    rotation: t.rotation,
                });
            }
        }
        info.frame = record_frame;

        let lower_bound = current_tick.saturating_sub(self.config.max_lag_ticks);
        if info.tick < lower_bound || info.tick > current_tick + 1 {
            self.stale_tick_count += 1;
            log::debug!("{}", InfoError::StaleTick);
            return None;
        }

        if !info.payload.validate() {
            log::debug!(
                "Info payload failed schema validation for {:?}",
                info.schema()
            );
            return None;
        }

        self.apply_confidence_modifiers(info, current_tick, last_commits, sanity);

        match self.band_of(info.confidence) {
            Band::Accept => {
                self.pending_verification.remove(&(info.subject, info.schema()));
                Some(*info)
            }
            Band::Reject => {
                self.rejected_count += 1;
                None
            }
            Band::Verify => {
                let key = (info.subject, info.schema());
                if let Some(pending) = self.pending_verification.remove(&key) {
                    // corroborated: a second sighting alone only advances the candidate
                    // out of the verify queue; it still has to clear
                    // verificationThreshold on the averaged confidence to actually win
                    // arbitration, otherwise two weak sightings shouldn't outvote a
                    // single confident one. See spec.md 6 "verificationThreshold".
                    let averaged = (info.confidence + pending.info.confidence) / 2.0;
                    if averaged < self.config.verification_threshold {
                        self.rejected_count += 1;
                        return None;
                    }
                    let mut winner = *info;
                    winner.confidence = averaged;
                    Some(winner)
                } else {
                    self.pending_verification.insert(
                        key,
                        PendingVerification {
                            info: *info,
                            expires_tick: current_tick + 1,
                        },
                    );
                    None
                }
            }
        }
    }

    fn band_of(&self, confidence: f32) -> Band {
        if confidence >= self.config.accept_threshold {
            Band::Accept
        } else if confidence < self.config.reject_threshold {
            Band::Reject
        } else {
            Band::Verify
        }
    }

    /// Deterministic confidence modifiers: authority bonus, staleness penalty,
    /// consistency bonus against the last commit's sanity envelope. See spec.md 4.3
    /// "Confidence".
    fn apply_confidence_modifiers(
        &self,
        info: &mut Info,
        current_tick: Tick,
        last_commits: &HashMap<(NetId, SchemaId), Commit>,
        sanity: &SanityGateConfig,
    ) {
        info.confidence += info.authority.confidence_bonus();

        if info.tick < current_tick {
            let staleness = (current_tick - info.tick) as f32;
            info.confidence -= 0.02 * staleness;
        }
        info.confidence = info.confidence.max(0.0);

        if let Some(prev) = last_commits.get(&(info.subject, info.schema())) {
            if crate::rings::authority_ring::passes_sanity_gate(
                &prev.payload,
                &info.payload,
                info.authority,
                sanity,
            ) {
                info.confidence += 0.1;
            }
        }

        info.clamp_confidence();
    }

    /// Keep the single best candidate per `(subject, schema)`, tiebreaking by (a)
    /// higher authority rank, (b) newer `observedAtTick`, (c) smaller `sourceId`. See
    /// spec.md 4.3 "Arbitration".
    fn arbitrate(&self, candidates: Vec<Info>) -> Vec<Info> {
        let mut winners: HashMap<(NetId, SchemaId), Info> = HashMap::new();
        for candidate in candidates {
            let key = (candidate.subject, candidate.schema());
            match winners.get(&key) {
                None => {
                    winners.insert(key, candidate);
                }
                Some(current) => {
                    if Self::beats(&candidate, current) {
                        winners.insert(key, candidate);
                    }
                }
            }
        }
        let mut out: Vec<Info> = winners.into_values().collect();
        out.sort_by_key(|info| (info.subject.packed(), info.schema().to_wire()));
        out
    }

    fn beats(a: &Info, b: &Info) -> bool {
        if a.authority != b.authority {
            return a.authority > b.authority;
        }
        if a.observed_at_tick != b.observed_at_tick {
            return a.observed_at_tick > b.observed_at_tick;
        }
        a.source.packed() < b.source.packed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{Payload, TransformPayload, Vec3};
    use crate::types::{EntityKind, FrameType};

    fn subject() -> NetId {
        NetId::new(EntityKind::Player, 1)
    }

    fn make_info(authority: AuthoritySource, confidence: f32, observed: Tick) -> Info {
        Info {
            tick: 0,
            subject: subject(),
            authority,
            source: NetId::new(EntityKind::Player, 7),
            frame: FrameType::World,
            payload: Payload::Transform(TransformPayload {
                position: Vec3::new(1.0, 0.0, 0.0),
                rotation: crate::payload::Quat::IDENTITY,
            }),
            confidence,
            observed_at_tick: observed,
        }
    }

    fn ring_with_registered_subject() -> (InfoRing, ContainerRing) {
        let mut container = ContainerRing::new();
        container
            .register(subject(), EntityKind::Player, FrameType::World, None, 0)
            .unwrap();
        (InfoRing::new(InfoGateConfig::default()), container)
    }

    #[test]
    fn empty_intake_produces_zero_winners() {
        let (mut ring, mut container) = ring_with_registered_subject();
        let winners = ring.process_tick(0, &mut container, &HashMap::new(), &SanityGateConfig::default());
        assert!(winners.is_empty());
    }

    #[test]
    fn authority_precedence_breaks_ties_by_authority_rank() {
        // S3: PeerReport(0.9) at one position, ServerCommit(0.6) at another — ServerCommit
        // wins because of its authority bonus even with a lower starting confidence.
        let (mut ring, mut container) = ring_with_registered_subject();
        let mut peer = make_info(AuthoritySource::PeerReport, 0.9, 0);
        peer.payload = Payload::Transform(TransformPayload {
            position: Vec3::new(5.0, 0.0, 0.0),
            rotation: crate::payload::Quat::IDENTITY,
        });
        let mut server = make_info(AuthoritySource::ServerCommit, 0.6, 0);
        server.payload = Payload::Transform(TransformPayload {
            position: Vec3::new(3.0, 0.0, 0.0),
            rotation: crate::payload::Quat::IDENTITY,
        });

        ring.submit(peer);
        ring.submit(server);

        let winners = ring.process_tick(0, &mut container, &HashMap::new(), &SanityGateConfig::default());
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].authority, AuthoritySource::ServerCommit);
        assert_eq!(
            winners[0].payload.as_transform().unwrap().position,
            Vec3::new(3.0, 0.0, 0.0)
        );
    }

    #[test]
    fn rejects_info_for_unknown_entity() {
        let mut ring = InfoRing::new(InfoGateConfig::default());
        let mut container = ContainerRing::new();
        ring.submit(make_info(AuthoritySource::LocalOwned, 0.9, 0));
        let winners = ring.process_tick(0, &mut container, &HashMap::new(), &SanityGateConfig::default());
        assert!(winners.is_empty());
        assert_eq!(ring.unknown_entity_count, 1);
    }

    #[test]
    fn verification_band_requires_corroboration() {
        let (mut ring, mut container) = ring_with_registered_subject();
        // confidence lands in the verify band once PeerReport bonus (0.0) is applied
        let info = make_info(AuthoritySource::PeerReport, 0.5, 0);
        ring.submit(info);
        let winners = ring.process_tick(0, &mut container, &HashMap::new(), &SanityGateConfig::default());
        assert!(winners.is_empty());

        // corroborating info arrives next tick
        let mut corroboration = make_info(AuthoritySource::PeerReport, 0.5, 1);
        corroboration.tick = 1;
        ring.submit(corroboration);
        let winners = ring.process_tick(1, &mut container, &HashMap::new(), &SanityGateConfig::default());
        assert_eq!(winners.len(), 1);
    }

    #[test]
    fn corroboration_below_verification_threshold_is_still_rejected() {
        let (mut ring, mut container) = ring_with_registered_subject();
        ring.config.verification_threshold = 0.6;

        let info = make_info(AuthoritySource::PeerReport, 0.3, 0);
        ring.submit(info);
        let winners = ring.process_tick(0, &mut container, &HashMap::new(), &SanityGateConfig::default());
        assert!(winners.is_empty());

        let mut corroboration = make_info(AuthoritySource::PeerReport, 0.3, 1);
        corroboration.tick = 1;
        ring.submit(corroboration);
        let winners = ring.process_tick(1, &mut container, &HashMap::new(), &SanityGateConfig::default());
        assert!(winners.is_empty());
        assert_eq!(ring.rejected_count, 1);
    }
}
