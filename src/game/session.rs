//! Session Engine
//!
//! Per-player round lifecycle: `Idle -> Arming -> Armed -> Live -> Cooldown`.
//! Single-threaded cooperative state, advanced by discrete operator events
//! (arm, focus, select) plus a `poll(now_ms)` the hosting driver calls for
//! time-driven transitions. Pending work is plain state, so withdrawing arm
//! intent cancels the launch with no observable side effect.
//!
//! The reaction timer is anchored to the instant the target item spawns,
//! never to round launch; candidates ahead of the target in spawn order do
//! not count against the player.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::game::round::{Item, Round, RoundGenerator};

/// Arm ramp duration.
pub const ARM_DURATION_MS: u64 = 800;

/// Fixed delay between the ramp completing and the round launching.
pub const ARMED_DELAY_MS: u64 = 200;

/// Cooldown after a hit.
pub const HIT_COOLDOWN_MS: u64 = 1000;

/// Cooldown after a miss; longer so the correct answer can be shown.
pub const MISS_COOLDOWN_MS: u64 = 2000;

/// Solo multiplier ceiling (x3), in hundredths.
pub const SOLO_MULTIPLIER_CAP: u32 = 300;

/// Duel multiplier ceiling (x2), in hundredths.
pub const DUEL_MULTIPLIER_CAP: u32 = 200;

/// Most noise items one Live round will spawn; bounds the per-round id set
/// when a round sits unresolved with no time limit.
pub const MAX_NOISE_PER_ROUND: usize = 32;

/// Score multiplier as a step function of streak, in hundredths.
///
/// Informational only; the rating engine works from raw counters.
pub fn multiplier_hundredths(streak: u32) -> u32 {
    match streak {
        s if s >= 13 => 300,
        s if s >= 8 => 200,
        s if s >= 4 => 150,
        _ => 100,
    }
}

// =============================================================================
// STATE TYPES
// =============================================================================

/// Session phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for arm intent.
    Idle,
    /// Arm ramp in progress.
    Arming,
    /// Ramp complete; launch pending.
    Armed,
    /// Round in progress.
    Live,
    /// Between rounds.
    Cooldown,
}

/// How a round resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    /// Correct selection.
    Hit,
    /// Wrong selection (including any selection before the target spawned).
    Miss,
    /// Round time limit elapsed with no selection.
    Timeout,
}

/// Cumulative per-session counters.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionStats {
    /// Running score: +1 per hit, -1 per miss, floor 0.
    pub score: u32,
    /// Consecutive hits.
    pub streak: u32,
    /// Best streak this session.
    pub best_streak: u32,
    /// Correct selections.
    pub hits: u32,
    /// Wrong selections and timeouts.
    pub misses: u32,
    /// Penalties. Reserved: the steady design has no early-fire penalty
    /// (a selection before the target is visible is simply a miss), but the
    /// counter stays in the summary shape the rating engine consumes.
    pub penalties: u32,
    /// Reaction time of every hit, in order.
    pub reaction_times_ms: Vec<u64>,
    /// Fastest hit.
    pub best_time_ms: Option<u64>,
    /// Most recent resolution's reaction time (None after a timeout).
    pub last_time_ms: Option<u64>,
}

impl SessionStats {
    /// Mean reaction time over recorded hits.
    pub fn avg_reaction_ms(&self) -> Option<u64> {
        if self.reaction_times_ms.is_empty() {
            None
        } else {
            Some(self.reaction_times_ms.iter().sum::<u64>() / self.reaction_times_ms.len() as u64)
        }
    }

    /// Accuracy percentage over resolved rounds.
    pub fn accuracy_pct(&self) -> u32 {
        let total = self.hits + self.misses + self.penalties;
        if total == 0 {
            0
        } else {
            self.hits * 100 / total
        }
    }
}

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Shared seed for duel sessions; None for free practice.
    pub seed: Option<u64>,
    /// Starting difficulty (shifts the generation index).
    pub start_difficulty: u32,
    /// Difficulty cap, 1..=10.
    pub max_difficulty_cap: u32,
    /// Multiplier ceiling in hundredths.
    pub multiplier_cap_hundredths: u32,
    /// Optional limit from target visibility to forced timeout.
    pub round_time_limit_ms: Option<u64>,
    /// Sudden-death: the run ends on the first miss or timeout.
    pub end_on_first_failure: bool,
    /// Arm ramp duration.
    pub arm_duration_ms: u64,
    /// Armed-to-launch delay.
    pub armed_delay_ms: u64,
    /// Cooldown after a hit.
    pub hit_cooldown_ms: u64,
    /// Cooldown after a miss.
    pub miss_cooldown_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            start_difficulty: 1,
            max_difficulty_cap: 10,
            multiplier_cap_hundredths: SOLO_MULTIPLIER_CAP,
            round_time_limit_ms: None,
            end_on_first_failure: false,
            arm_duration_ms: ARM_DURATION_MS,
            armed_delay_ms: ARMED_DELAY_MS,
            hit_cooldown_ms: HIT_COOLDOWN_MS,
            miss_cooldown_ms: MISS_COOLDOWN_MS,
        }
    }
}

impl EngineConfig {
    /// Configuration for one side of a duel: shared seed, capped multiplier.
    pub fn duel(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            multiplier_cap_hundredths: DUEL_MULTIPLIER_CAP,
            ..Self::default()
        }
    }
}

/// Events emitted by state transitions, in the order they occurred.
///
/// The network layer forwards these to the client (redacting the parts the
/// operator must not see before the reveal).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Arm ramp completed.
    Armed,
    /// A round launched and entered Live.
    RoundLaunched {
        /// The generated round.
        round: Round,
        /// Launch timestamp.
        at_ms: u64,
    },
    /// A candidate became visible.
    CandidateSpawned {
        /// The spawned item.
        item: Item,
        /// Spawn-order position.
        position: usize,
        /// Spawn timestamp.
        at_ms: u64,
    },
    /// The target became visible; the reaction timer starts here.
    TargetVisible {
        /// Timestamp the timer is anchored to.
        at_ms: u64,
    },
    /// A decorative noise item entered the feed.
    NoiseSpawned {
        /// The noise item.
        item: Item,
        /// Spawn timestamp.
        at_ms: u64,
    },
    /// The round resolved.
    RoundResolved {
        /// Hit, miss, or timeout.
        outcome: RoundOutcome,
        /// Reaction time (hits only).
        reaction_ms: Option<u64>,
        /// Id of the selected item (None on timeout).
        selected_id: Option<String>,
        /// The correct answer, for the reveal.
        target: Item,
        /// Updated counters.
        stats: SessionStats,
        /// Current multiplier, in hundredths, post-resolution.
        multiplier_hundredths: u32,
    },
    /// Sudden-death run ended.
    RunEnded {
        /// The failing outcome.
        reason: RoundOutcome,
    },
    /// Cooldown expired; ready to arm the next round.
    CooldownEnded {
        /// Index of the upcoming round.
        next_round_index: u32,
    },
}

/// A round in flight.
#[derive(Clone, Debug)]
struct LiveRound {
    round: Round,
    /// Deadline for the next candidate spawn, while any remain.
    next_spawn_at_ms: Option<u64>,
    spawned: usize,
    /// Deadline for the next noise item, once all candidates are out.
    next_noise_at_ms: Option<u64>,
    target_visible_at_ms: Option<u64>,
    /// Forced-timeout deadline (target visibility + configured limit).
    timeout_at_ms: Option<u64>,
    /// Ids of spawned noise items, for selection lookup.
    noise_ids: Vec<String>,
    /// Set while focus is lost; spawn deadlines freeze at this instant.
    paused_at_ms: Option<u64>,
}

// =============================================================================
// ENGINE
// =============================================================================

/// The per-player session state machine.
pub struct SessionEngine {
    generator: Arc<RoundGenerator>,
    config: EngineConfig,
    phase: Phase,
    round_index: u32,
    peak_round: u32,
    stats: SessionStats,
    arm_started_at_ms: Option<u64>,
    armed_at_ms: Option<u64>,
    live: Option<LiveRound>,
    cooldown_until_ms: Option<u64>,
    run_ended: bool,
}

impl SessionEngine {
    /// Create an engine in Idle.
    pub fn new(generator: Arc<RoundGenerator>, config: EngineConfig) -> Self {
        Self {
            generator,
            config,
            phase: Phase::Idle,
            round_index: 0,
            peak_round: 0,
            stats: SessionStats::default(),
            arm_started_at_ms: None,
            armed_at_ms: None,
            live: None,
            cooldown_until_ms: None,
            run_ended: false,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Zero-based index of the current (or next) round.
    pub fn round_index(&self) -> u32 {
        self.round_index
    }

    /// Highest round reached.
    pub fn peak_round(&self) -> u32 {
        self.peak_round
    }

    /// Cumulative counters.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Has a sudden-death run ended?
    pub fn run_ended(&self) -> bool {
        self.run_ended
    }

    /// Current multiplier in hundredths, capped per mode.
    pub fn multiplier(&self) -> u32 {
        multiplier_hundredths(self.stats.streak).min(self.config.multiplier_cap_hundredths)
    }

    /// Arm ramp progress in percent.
    pub fn arm_progress_pct(&self, now_ms: u64) -> u32 {
        match (self.phase, self.arm_started_at_ms) {
            (Phase::Arming, Some(start)) => {
                let elapsed = now_ms.saturating_sub(start);
                (elapsed * 100 / self.config.arm_duration_ms.max(1)).min(100) as u32
            }
            _ => 0,
        }
    }

    /// Operator expressed arm intent. Only meaningful in Idle; anything else
    /// is silently ignored.
    pub fn arm_enter(&mut self, now_ms: u64) {
        if self.phase != Phase::Idle || self.run_ended {
            return;
        }
        self.phase = Phase::Arming;
        self.arm_started_at_ms = Some(now_ms);
    }

    /// Operator withdrew arm intent. Cancels a pending launch with no
    /// side effect; ignored outside Arming.
    pub fn arm_leave(&mut self, _now_ms: u64) {
        if self.phase != Phase::Arming {
            return;
        }
        self.phase = Phase::Idle;
        self.arm_started_at_ms = None;
    }

    /// Operator lost focus. During Live this pauses the spawn schedule;
    /// the reaction timer, once started, keeps running.
    pub fn focus_lost(&mut self, now_ms: u64) {
        if self.phase != Phase::Live {
            return;
        }
        if let Some(live) = self.live.as_mut() {
            if live.paused_at_ms.is_none() {
                live.paused_at_ms = Some(now_ms);
            }
        }
    }

    /// Operator regained focus. Pending spawn deadlines shift forward by
    /// exactly the pause duration, so no item is skipped or duplicated.
    pub fn focus_gained(&mut self, now_ms: u64) {
        if let Some(live) = self.live.as_mut() {
            if let Some(paused_at) = live.paused_at_ms.take() {
                let pause_ms = now_ms.saturating_sub(paused_at);
                if let Some(at) = live.next_spawn_at_ms.as_mut() {
                    *at += pause_ms;
                }
                if let Some(at) = live.next_noise_at_ms.as_mut() {
                    *at += pause_ms;
                }
            }
        }
    }

    /// Operator selected an item. Resolves the round in Live; silently
    /// ignored in any other phase, and for ids not yet visible.
    pub fn select(&mut self, item_id: &str, now_ms: u64) -> Vec<SessionEvent> {
        if self.phase != Phase::Live {
            return Vec::new();
        }
        let Some(live) = self.live.as_ref() else {
            return Vec::new();
        };

        let candidate = live.round.candidates[..live.spawned]
            .iter()
            .find(|c| c.id == item_id);
        let is_noise = live.noise_ids.iter().any(|id| id == item_id);
        if candidate.is_none() && !is_noise {
            // Not a visible item; the UI cannot legitimately offer it.
            return Vec::new();
        }

        let hit = candidate.map(|c| c.is_target()).unwrap_or(false);
        // A reaction time only exists once the target is visible; misses
        // fired before that resolve with no time recorded.
        let reaction_ms = live
            .target_visible_at_ms
            .map(|anchor| now_ms.saturating_sub(anchor));

        let outcome = if hit { RoundOutcome::Hit } else { RoundOutcome::Miss };
        self.resolve(outcome, reaction_ms, Some(item_id.to_string()), now_ms)
    }

    /// Advance time-driven transitions up to `now_ms`.
    pub fn poll(&mut self, now_ms: u64) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        match self.phase {
            Phase::Arming => {
                if let Some(start) = self.arm_started_at_ms {
                    if now_ms.saturating_sub(start) >= self.config.arm_duration_ms {
                        self.phase = Phase::Armed;
                        // Anchor to the exact ramp completion, not poll time.
                        self.armed_at_ms = Some(start + self.config.arm_duration_ms);
                        self.arm_started_at_ms = None;
                        events.push(SessionEvent::Armed);
                    }
                }
            }
            Phase::Armed => {
                if let Some(armed_at) = self.armed_at_ms {
                    let launch_at = armed_at + self.config.armed_delay_ms;
                    if now_ms >= launch_at {
                        events.extend(self.launch_round(launch_at));
                        // Fall through to spawn anything already due.
                        events.extend(self.advance_live(now_ms));
                    }
                }
            }
            Phase::Live => {
                events.extend(self.advance_live(now_ms));
            }
            Phase::Cooldown => {
                if let Some(until) = self.cooldown_until_ms {
                    if now_ms >= until && !self.run_ended {
                        self.phase = Phase::Idle;
                        self.cooldown_until_ms = None;
                        events.push(SessionEvent::CooldownEnded {
                            next_round_index: self.round_index,
                        });
                    }
                }
            }
            Phase::Idle => {}
        }

        events
    }

    /// Generate and launch the round for the current index.
    fn launch_round(&mut self, launch_at_ms: u64) -> Vec<SessionEvent> {
        // Higher starting difficulty shifts the generation index so the
        // curve begins further along.
        let gen_index =
            self.round_index + self.config.start_difficulty.saturating_sub(1) * 2;
        let round = self.generator.generate(
            gen_index,
            self.config.seed,
            self.config.max_difficulty_cap,
        );

        self.phase = Phase::Live;
        self.armed_at_ms = None;
        self.live = Some(LiveRound {
            next_spawn_at_ms: Some(launch_at_ms),
            spawned: 0,
            next_noise_at_ms: None,
            target_visible_at_ms: None,
            timeout_at_ms: None,
            noise_ids: Vec::new(),
            paused_at_ms: None,
            round: round.clone(),
        });

        vec![SessionEvent::RoundLaunched {
            round,
            at_ms: launch_at_ms,
        }]
    }

    /// Process due spawn/noise/timeout work in chronological order.
    fn advance_live(&mut self, now_ms: u64) -> Vec<SessionEvent> {
        #[derive(Clone, Copy)]
        enum Due {
            Spawn(u64),
            Noise(u64),
            Timeout(u64),
        }

        let mut events = Vec::new();

        loop {
            // Decide first; mutate under a fresh borrow.
            let due = {
                let Some(live) = self.live.as_ref() else {
                    break;
                };
                if live.paused_at_ms.is_some() {
                    // Spawn schedule frozen; only the timeout deadline stays
                    // armed, because the reaction timer keeps running.
                    match live.timeout_at_ms.filter(|at| *at <= now_ms) {
                        Some(at) => Due::Timeout(at),
                        None => break,
                    }
                } else {
                    // Earliest due deadline wins.
                    let next = [
                        live.next_spawn_at_ms.filter(|at| *at <= now_ms).map(|at| (at, 0u8)),
                        live.next_noise_at_ms.filter(|at| *at <= now_ms).map(|at| (at, 1u8)),
                        live.timeout_at_ms.filter(|at| *at <= now_ms).map(|at| (at, 2u8)),
                    ]
                    .into_iter()
                    .flatten()
                    .min();
                    match next {
                        Some((at, 0)) => Due::Spawn(at),
                        Some((at, 1)) => Due::Noise(at),
                        Some((at, _)) => Due::Timeout(at),
                        None => break,
                    }
                }
            };

            match due {
                Due::Spawn(at) => {
                    let limit = self.config.round_time_limit_ms;
                    let Some(live) = self.live.as_mut() else {
                        break;
                    };
                    let item = live.round.candidates[live.spawned].clone();
                    let position = live.spawned;
                    live.spawned += 1;
                    if live.spawned < live.round.candidates.len() {
                        live.next_spawn_at_ms = Some(at + live.round.spawn_delay_ms);
                    } else {
                        live.next_spawn_at_ms = None;
                        live.next_noise_at_ms = Some(at + live.round.noise_interval_ms);
                    }
                    let is_target = item.is_target();
                    events.push(SessionEvent::CandidateSpawned {
                        item,
                        position,
                        at_ms: at,
                    });
                    if is_target {
                        live.target_visible_at_ms = Some(at);
                        if let Some(limit) = limit {
                            live.timeout_at_ms = Some(at + limit);
                        }
                        events.push(SessionEvent::TargetVisible { at_ms: at });
                    }
                }
                Due::Noise(at) => {
                    let item = self.generator.noise_item();
                    let Some(live) = self.live.as_mut() else {
                        break;
                    };
                    live.noise_ids.push(item.id.clone());
                    live.next_noise_at_ms = if live.noise_ids.len() < MAX_NOISE_PER_ROUND {
                        Some(at + live.round.noise_interval_ms)
                    } else {
                        None
                    };
                    events.push(SessionEvent::NoiseSpawned { item, at_ms: at });
                }
                Due::Timeout(at) => {
                    events.extend(self.resolve(RoundOutcome::Timeout, None, None, at));
                    break;
                }
            }
        }

        events
    }

    /// Resolve the live round and enter Cooldown.
    fn resolve(
        &mut self,
        outcome: RoundOutcome,
        reaction_ms: Option<u64>,
        selected_id: Option<String>,
        now_ms: u64,
    ) -> Vec<SessionEvent> {
        let Some(live) = self.live.take() else {
            return Vec::new();
        };
        let target = live.round.target().clone();

        let hit = outcome == RoundOutcome::Hit;
        match outcome {
            RoundOutcome::Hit => {
                let rt = reaction_ms.unwrap_or(0);
                self.stats.hits += 1;
                self.stats.score += 1;
                self.stats.streak += 1;
                self.stats.best_streak = self.stats.best_streak.max(self.stats.streak);
                self.stats.reaction_times_ms.push(rt);
                self.stats.best_time_ms = Some(match self.stats.best_time_ms {
                    Some(best) => best.min(rt),
                    None => rt,
                });
                self.stats.last_time_ms = Some(rt);
            }
            RoundOutcome::Miss => {
                self.stats.misses += 1;
                self.stats.score = self.stats.score.saturating_sub(1);
                self.stats.streak = 0;
                self.stats.last_time_ms = reaction_ms;
            }
            RoundOutcome::Timeout => {
                self.stats.misses += 1;
                self.stats.score = self.stats.score.saturating_sub(1);
                self.stats.streak = 0;
                self.stats.last_time_ms = None;
            }
        }

        self.peak_round = self
            .peak_round
            .max(self.round_index + if hit { 1 } else { 0 });

        self.phase = Phase::Cooldown;
        self.round_index += 1;
        self.cooldown_until_ms = Some(
            now_ms
                + if hit {
                    self.config.hit_cooldown_ms
                } else {
                    self.config.miss_cooldown_ms
                },
        );

        let mut events = vec![SessionEvent::RoundResolved {
            outcome,
            reaction_ms: if hit { reaction_ms } else { None },
            selected_id,
            target,
            stats: self.stats.clone(),
            multiplier_hundredths: self.multiplier(),
        }];

        if !hit && self.config.end_on_first_failure {
            self.run_ended = true;
            events.push(SessionEvent::RunEnded { reason: outcome });
        }

        events
    }
}

// =============================================================================
// TESTS
// =============================================================================
