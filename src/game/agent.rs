//! Per-Agent Tick Pipeline
//!
//! One agent, one tick, in this order:
//!
//! 1. Fixed input: shift edges (or block while dead, then only integrate)
//! 2. Movement input: steering, aim lock, recoil, jump
//! 3. Movement integration
//! 4. Weapons: commit a due switch, apply the slot request, process the
//!    equipped weapon's input unless switching, then tick every weapon
//!
//! Committing the switch before input processing means the tick that reaches
//! the swap point already fires with the new weapon.

use tracing::warn;

use crate::config::AgentConfig;
use crate::core::fixed::{fixed_mul, FIXED_ONE};
use crate::core::time::{Tick, TickRate};
use crate::game::edge::EdgeState;
use crate::game::events::{SimEvent, SimEventData};
use crate::game::input::{Button, InputSample};
use crate::game::movement::{CharacterCollider, MovementIntegrator};
use crate::game::state::AgentState;
use crate::game::weapon::{AbilityContext, SwitchOutcome, WeaponDesires};
use crate::MAX_WEAPON_SLOTS;

/// Shared, read-only inputs of one tick.
pub struct TickContext<'a, C: ?Sized> {
    /// Tick being simulated
    pub tick: Tick,
    /// Simulation rate
    pub rate: TickRate,
    /// Agent tuning
    pub agent: &'a AgentConfig,
    /// Movement integrator
    pub integrator: &'a MovementIntegrator,
    /// Level collider
    pub collider: &'a C,
}

/// Run one tick for `agent`.
pub fn tick_agent<C: CharacterCollider + ?Sized>(
    agent: &mut AgentState,
    sample: Option<InputSample>,
    ctx: &TickContext<'_, C>,
    events: &mut Vec<SimEvent>,
) {
    // Dead agents take no input but keep falling and shedding forced velocity.
    if !agent.alive {
        agent.input.block();
        agent.movement.set_desired_velocity_x(0);
        ctx.integrator.step(&mut agent.movement, ctx.collider);
        return;
    }

    agent.input.before_tick(sample);
    let edges = *agent.input.edges();

    apply_movement_input(agent, &edges, ctx, events);
    ctx.integrator.step(&mut agent.movement, ctx.collider);
    apply_weapons(agent, &edges, ctx, events);
}

/// Steering, aim lock and release, jump.
fn apply_movement_input<C: ?Sized>(
    agent: &mut AgentState,
    edges: &EdgeState,
    ctx: &TickContext<'_, C>,
    events: &mut Vec<SimEvent>,
) {
    let cfg = ctx.agent;
    let direction = edges.direction();

    if !agent.aim.locked {
        if agent.movement.grounded || cfg.air_control {
            agent
                .movement
                .set_desired_velocity_x(fixed_mul(direction.x, cfg.move_speed));
        }

        let ability_ctx = AbilityContext {
            tick: ctx.tick,
            rate: ctx.rate,
            input: edges,
        };
        let weapon_ready = agent
            .loadout
            .current()
            .is_some_and(|weapon| !weapon.is_busy(&ability_ctx));

        if edges.is_set(Button::Shoot1) && weapon_ready {
            agent.aim.locked = true;
            agent.movement.set_time_scale(cfg.slow_time_scale);
        }

        if edges.was_pressed(Button::Jump) {
            ctx.integrator.jump_directional(&mut agent.movement, direction);
            events.push(SimEvent::new(ctx.tick, agent.id, SimEventData::Jumped { direction }));
        }
    } else if edges.was_released(Button::Shoot1) {
        agent.aim.locked = false;
        agent.movement.set_time_scale(FIXED_ONE);

        // Push back along the aim, plus a sideways kick tilted upward.
        let aim = agent.aim.last_pointed;
        let side = if aim.x >= 0 { FIXED_ONE } else { -FIXED_ONE };
        let upward = aim.perpendicular().scale(side);
        let impulse = aim.scale(cfg.max_weapon_impulse) + upward.scale(cfg.additional_up_impulse);

        agent.movement.add_forced_velocity(impulse);
        events.push(SimEvent::new(ctx.tick, agent.id, SimEventData::RecoilLaunched { impulse }));
    }

    if !direction.is_zero() {
        agent.aim.last_pointed = direction;
    }
}

/// Switch handling and weapon ticks.
fn apply_weapons<C: ?Sized>(
    agent: &mut AgentState,
    edges: &EdgeState,
    ctx: &TickContext<'_, C>,
    events: &mut Vec<SimEvent>,
) {
    let tick = ctx.tick;
    let loadout = &mut agent.loadout;

    if let Some(slot) = loadout.update_switch(tick) {
        events.push(SimEvent::new(tick, agent.id, SimEventData::WeaponSwitched { slot }));
    }

    if let Some(slot) = edges.current().weapon_slot_request() {
        if (slot as usize) < MAX_WEAPON_SLOTS {
            let from = loadout.switch_state().current_slot();
            match loadout.request_switch(tick, slot, false) {
                SwitchOutcome::Started | SwitchOutcome::Redirected => {
                    events.push(SimEvent::new(tick, agent.id, SimEventData::SwitchStarted { from, to: slot }));
                }
                SwitchOutcome::Committed => {
                    events.push(SimEvent::new(tick, agent.id, SimEventData::WeaponSwitched { slot }));
                }
                SwitchOutcome::Ignored => {}
            }
        } else if edges.base().weapon_slot != edges.current().weapon_slot {
            warn!(entity = %agent.id.short(), slot, "ignoring out-of-range weapon slot request");
        }
    }

    let ability_ctx = AbilityContext {
        tick,
        rate: ctx.rate,
        input: edges,
    };

    let equipped = loadout.switch_state().current_slot();
    let desires = if loadout.is_switching(tick) {
        WeaponDesires::default()
    } else {
        loadout
            .current_mut()
            .map(|weapon| weapon.process_input(&ability_ctx))
            .unwrap_or_default()
    };

    for weapon in loadout.weapons_mut() {
        let slot = weapon.slot();
        let weapon_desires = if slot == equipped {
            desires
        } else {
            WeaponDesires::default()
        };

        let ammo_before = weapon.ammo();
        weapon.apply_tick(&ability_ctx, &weapon_desires);

        if slot == equipped && weapon_desires.has_fired() {
            events.push(SimEvent::weapon_fired(tick, agent.id, slot, weapon_desires.charge_value));
        }
        if let Some(ammo) = weapon.ammo().filter(|&ammo| Some(ammo) != ammo_before) {
            events.push(SimEvent::ammo_changed(tick, agent.id, slot, ammo));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::core::fixed::to_fixed;
    use crate::core::vec2::FixedVec2;
    use crate::game::movement::FlatGround;
    use crate::game::state::EntityId;

    struct Harness {
        config: SimulationConfig,
        integrator: MovementIntegrator,
        ground: FlatGround,
        agent: AgentState,
        tick: Tick,
    }

    impl Harness {
        fn new() -> Self {
            let config = SimulationConfig::default();
            let integrator = MovementIntegrator::new(config.movement, config.rate());
            let agent = AgentState::spawn(EntityId::new([1; 16]), FixedVec2::ZERO, 0, &config);
            Self {
                ground: config.arena,
                config,
                integrator,
                agent,
                tick: 0,
            }
        }

        fn step(&mut self, sample: InputSample) -> Vec<SimEvent> {
            self.tick += 1;
            let ctx = TickContext {
                tick: self.tick,
                rate: self.config.rate(),
                agent: &self.config.agent,
                integrator: &self.integrator,
                collider: &self.ground,
            };
            let mut events = Vec::new();
            tick_agent(&mut self.agent, Some(sample), &ctx, &mut events);
            events
        }

        fn settle(&mut self) {
            for _ in 0..30 {
                self.step(InputSample::IDLE);
            }
        }
    }

    fn fired(events: &[SimEvent]) -> bool {
        events
            .iter()
            .any(|e| matches!(e.data, SimEventData::WeaponFired { .. }))
    }

    #[test]
    fn test_steering() {
        let mut h = Harness::new();
        h.settle();
        h.step(InputSample::with_movement(127, 0));
        // Steered to 5, then decayed by one grounded step.
        let desired = h.agent.movement.desired_velocity_x;
        assert!(desired > to_fixed(4.0) && desired < to_fixed(5.0));
        assert!(h.agent.movement.position.x > 0);
        assert_eq!(h.agent.aim.last_pointed, FixedVec2::RIGHT);
    }

    #[test]
    fn test_hold_locks_and_slows() {
        let mut h = Harness::new();
        h.settle();
        let aim = InputSample::with_movement(127, 0).with_button(Button::Shoot1);
        h.step(aim);
        assert!(h.agent.aim.locked);
        assert_eq!(h.agent.movement.time_scale, h.config.agent.slow_time_scale);

        // Steering is ignored while locked.
        h.step(InputSample::with_movement(-127, 0).with_button(Button::Shoot1));
        assert!(h.agent.aim.locked);
    }

    #[test]
    fn test_release_fires_and_recoils() {
        let mut h = Harness::new();
        h.settle();
        let aim = InputSample::with_movement(127, 0).with_button(Button::Shoot1);
        for _ in 0..20 {
            h.step(aim);
        }

        let events = h.step(InputSample::with_movement(127, 0));
        assert!(!h.agent.aim.locked);
        assert_eq!(h.agent.movement.time_scale, FIXED_ONE);
        assert!(fired(&events), "charge weapon fires on release");

        let impulse = events
            .iter()
            .find_map(|e| match e.data {
                SimEventData::RecoilLaunched { impulse } => Some(impulse),
                _ => None,
            })
            .expect("recoil");
        // Aim right: 30 along +x, plus the perpendicular (0, 1) kick.
        assert_eq!(impulse, FixedVec2::new(to_fixed(30.0), to_fixed(1.0)));
        assert!(h.agent.movement.forced_velocity.x > 0);
    }

    #[test]
    fn test_recoil_kick_points_up_for_left_aim() {
        let mut h = Harness::new();
        h.settle();
        let aim = InputSample::with_movement(-127, 0).with_button(Button::Shoot1);
        h.step(aim);
        let events = h.step(InputSample::IDLE);
        let impulse = events
            .iter()
            .find_map(|e| match e.data {
                SimEventData::RecoilLaunched { impulse } => Some(impulse),
                _ => None,
            })
            .expect("recoil");
        assert_eq!(impulse, FixedVec2::new(to_fixed(-30.0), to_fixed(1.0)));
    }

    #[test]
    fn test_jump_event() {
        let mut h = Harness::new();
        h.settle();
        let events = h.step(InputSample::IDLE.with_button(Button::Jump));
        assert!(events.iter().any(|e| matches!(e.data, SimEventData::Jumped { .. })));
        assert!(h.agent.movement.vertical_velocity > 0 || h.agent.movement.position.y > 0);

        // Holding does not jump again.
        let events = h.step(InputSample::IDLE.with_button(Button::Jump));
        assert!(!events.iter().any(|e| matches!(e.data, SimEventData::Jumped { .. })));
    }

    #[test]
    fn test_switch_blocks_fire_until_recovered() {
        let mut h = Harness::new();
        h.settle();

        let events = h.step(InputSample::IDLE.with_weapon_slot(1));
        assert!(events
            .iter()
            .any(|e| e.data == SimEventData::SwitchStarted { from: 0, to: 1 }));
        let started = h.tick;

        let mut switched_at = None;
        let mut first_shot = None;
        for i in 0..90 {
            // Alternate to create press edges for the sidearm on Shoot1.
            let sample = if i % 2 == 0 {
                InputSample::IDLE.with_button(Button::Shoot1)
            } else {
                InputSample::IDLE
            };
            let events = h.step(sample);
            if events.iter().any(|e| e.data == SimEventData::WeaponSwitched { slot: 1 }) {
                switched_at = Some(h.tick);
            }
            if first_shot.is_none() && fired(&events) {
                first_shot = Some(h.tick);
            }
        }

        assert_eq!(switched_at, Some(started + 30));
        let first_shot = first_shot.expect("sidearm fires after the switch");
        assert!(first_shot >= started + 60, "no input while switching");
    }

    #[test]
    fn test_holstered_weapon_reloads() {
        let mut h = Harness::new();
        h.settle();

        // Empty the charge launcher with three quick charge-release cycles.
        for _ in 0..3 {
            h.step(InputSample::IDLE.with_button(Button::Shoot1));
            h.step(InputSample::IDLE);
            for _ in 0..10 {
                h.step(InputSample::IDLE);
            }
        }
        assert_eq!(h.agent.loadout.weapon(0).and_then(|w| w.ammo()), Some(0));

        // Switch away and wait; the holstered launcher still reloads.
        h.step(InputSample::IDLE.with_weapon_slot(1));
        for _ in 0..400 {
            h.step(InputSample::IDLE);
        }
        assert_eq!(h.agent.loadout.weapon(0).and_then(|w| w.ammo()), Some(3));
        assert_eq!(h.agent.loadout.switch_state().current_slot(), 1);
    }

    #[test]
    fn test_out_of_range_slot_warns_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tracing::{Event, Level, Subscriber};
        use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

        struct WarnCounter(Arc<AtomicUsize>);

        impl<S: Subscriber> Layer<S> for WarnCounter {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                if *event.metadata().level() == Level::WARN {
                    self.0.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));

        let mut h = Harness::new();
        let mut bad = InputSample::IDLE;
        bad.weapon_slot = MAX_WEAPON_SLOTS as u8 + 1;

        let events = tracing::subscriber::with_default(subscriber, || {
            let mut events = Vec::new();
            for _ in 0..10 {
                events.extend(h.step(bad));
            }
            h.step(InputSample::IDLE);
            events.extend(h.step(bad));
            events
        });

        assert_eq!(warnings.load(Ordering::SeqCst), 2);
        assert!(events.is_empty());
        assert_eq!(h.agent.loadout.switch_state().current_slot(), 0);
        assert!(!h.agent.loadout.is_switching(h.tick));
    }

    #[test]
    fn test_dead_agent_falls_without_acting() {
        let mut h = Harness::new();
        h.settle();
        h.step(InputSample::IDLE.with_button(Button::Jump));
        for _ in 0..5 {
            h.step(InputSample::IDLE);
        }
        assert!(!h.agent.movement.grounded);
        let airborne_y = h.agent.movement.position.y;
        assert!(airborne_y > h.ground.floor);

        h.agent.alive = false;
        let mut events = Vec::new();
        for _ in 0..60 {
            events.extend(h.step(InputSample::with_movement(127, 0).with_button(Button::Jump)));
        }
        assert!(events.is_empty());
        assert!(h.agent.movement.grounded);
        assert_eq!(h.agent.movement.position.y, h.ground.floor);
        assert_eq!(h.agent.movement.desired_velocity_x, 0);
        assert_eq!(h.agent.input, Default::default());
    }
}
