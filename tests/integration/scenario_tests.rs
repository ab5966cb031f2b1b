//! End-to-end engine scenarios: rule image → tracker → aggregator.
//!
//! These drive [`Engine`] directly, with no service or ports in between,
//! and check the aggregated table or the active-rule list afterwards.

use mastercell::adapters::memory_store::MemoryRuleStore;
use mastercell::config::EngineConfig;
use mastercell::engine::Engine;
use mastercell::engine::one_button::OneButtonAction;
use mastercell::rules::{ConditionMask, Destination, Direction, RuleConfig, RuleRecord};

use crate::mock_hw::{ImageBuilder, input, payload};

const LIGHTS: Destination = Destination::new(0xFF01, 0x1E);
const POWER: Destination = Destination::new(0xFF02, 0x1E);
const AUX: Destination = Destination::new(0xFF03, 0x1F);

fn engine(image: ImageBuilder) -> Engine<MemoryRuleStore> {
    Engine::new(image.build(), &EngineConfig::default())
}

fn byte0_of_manual_rule(e: &Engine<MemoryRuleStore>, n: u8) -> Vec<u8> {
    e.rules().for_input(input(n)).map(|r| r.record.payload[0]).collect()
}

// ── Scenario A: two rules OR into one destination ────────────

#[test]
fn two_rules_on_one_destination_merge() {
    let mut e = engine(
        ImageBuilder::new()
            .on(2, 0, RuleRecord::new(6, LIGHTS, payload(0x80)))
            .on(2, 1, RuleRecord::new(6, LIGHTS, payload(0x40))),
    );
    e.on_input_transition(input(2), true);

    let table = e.aggregate(&[]);
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(LIGHTS).map(|m| m.payload), Some(payload(0xC0)));
}

// ── Scenario B: ignition condition excludes a rule ────────────

#[test]
fn rule_requiring_ignition_is_excluded_without_it() {
    let needs_ignition = RuleRecord::new(6, POWER, payload(0x01))
        .with_conditions(ConditionMask::NONE.with_ignition(), ConditionMask::NONE);
    let mut e = engine(ImageBuilder::new().on(3, 0, needs_ignition));
    e.on_input_transition(input(3), true);

    assert!(e.aggregate(&[]).get(POWER).is_none());

    assert_eq!(e.refresh_ignition(true), Some(true));
    assert_eq!(e.aggregate(&[]).get(POWER).map(|m| m.payload), Some(payload(0x01)));
}

#[test]
fn ignition_input_drives_the_combined_flag() {
    let ignition_switch = RuleRecord::new(6, LIGHTS, payload(0x01)).with_config(RuleConfig {
        sets_ignition: true,
        ..RuleConfig::default()
    });
    let tracked = RuleRecord::new(6, POWER, payload(0x08)).with_config(RuleConfig {
        track_ignition: true,
        ..RuleConfig::default()
    });
    let mut e = engine(ImageBuilder::new().on(1, 0, ignition_switch).on(20, 0, tracked));

    e.on_input_transition(input(1), true);
    assert_eq!(e.refresh_ignition(false), Some(true));
    assert_eq!(e.aggregate(&[]).get(POWER).map(|m| m.payload), Some(payload(0x08)));

    // the external flag alone keeps it on
    e.on_input_transition(input(1), false);
    assert_eq!(e.refresh_ignition(true), None);
    assert_eq!(e.refresh_ignition(false), Some(false));
}

// ── Scenario C: quick press from ignition-off ────────────────

#[test]
fn quick_press_leaves_ignition_only_manual_rule() {
    let mut e = engine(ImageBuilder::new().one_button(6, POWER, 0x02));
    assert!(e.is_one_button_input(input(6)));

    e.on_input_transition(input(6), true);
    let (action, result) = e.poll_one_button(input(6), 0, false).unwrap();
    assert_eq!(action, OneButtonAction::SetManual { ignition: true, starter: false });
    assert_eq!(result, Ok(()));

    e.on_input_transition(input(6), false);
    let (action, _) = e.poll_one_button(input(6), 300, false).unwrap();
    assert_eq!(action, OneButtonAction::SetManual { ignition: true, starter: false });

    assert_eq!(byte0_of_manual_rule(&e, 6), [0x02]);
    assert!(e.rules().iter().all(|r| !r.one_shot));
    assert_eq!(e.refresh_ignition(false), Some(true));
}

// ── Scenario D: long press with neutral engages the starter ───

#[test]
fn long_press_engages_starter_after_delay() {
    let mut e = engine(ImageBuilder::new().one_button(6, POWER, 0x02));
    e.on_input_transition(input(6), true);

    e.poll_one_button(input(6), 0, true);
    assert_eq!(byte0_of_manual_rule(&e, 6), [0x02]);

    for now in (10..1000).step_by(10) {
        assert!(e.poll_one_button(input(6), now, true).is_none(), "no change at {now} ms");
    }
    assert_eq!(byte0_of_manual_rule(&e, 6), [0x02]);

    e.poll_one_button(input(6), 1000, true);
    assert_eq!(byte0_of_manual_rule(&e, 6), [0x03]);

    e.poll_one_button(input(6), 1200, true);
    assert_eq!(byte0_of_manual_rule(&e, 6), [0x03]);
}

#[test]
fn starter_bit_wraps_from_bit_zero() {
    let mut e = engine(ImageBuilder::new().one_button(6, POWER, 0x01));
    e.on_input_transition(input(6), true);
    e.poll_one_button(input(6), 0, true);
    e.poll_one_button(input(6), 1000, true);
    assert_eq!(byte0_of_manual_rule(&e, 6), [0x81]);
}

#[test]
fn second_press_clears_manual_rule() {
    let mut e = engine(ImageBuilder::new().one_button(6, POWER, 0x02));
    e.on_input_transition(input(6), true);
    e.poll_one_button(input(6), 0, false);
    e.on_input_transition(input(6), false);
    e.poll_one_button(input(6), 200, false);

    e.on_input_transition(input(6), true);
    assert!(e.poll_one_button(input(6), 5000, false).is_none());
    e.on_input_transition(input(6), false);
    let (action, _) = e.poll_one_button(input(6), 5100, false).unwrap();
    assert_eq!(action, OneButtonAction::ClearManual);

    let rules: Vec<_> = e.rules().for_input(input(6)).collect();
    assert_eq!(rules.len(), 1);
    assert!(rules[0].one_shot);
    assert_eq!(rules[0].record.payload, [0; 8]);
    assert_eq!(e.refresh_ignition(false), None);
    assert!(!e.one_button().any_ignition());
}

#[test]
fn inconsistent_one_button_rule_is_counted() {
    let mut e = engine(ImageBuilder::new().one_button(6, POWER, 0x06));
    e.on_input_transition(input(6), true);
    let (_, result) = e.poll_one_button(input(6), 0, false).unwrap();
    assert!(result.is_err());
    assert_eq!(e.rules().len(), 0);
    assert_eq!(e.diagnostics().manual_rule_failures, 1);
}

// ── Scenario E: track-ignition clearing per destination ──────

#[test]
fn ignition_off_clears_each_tracked_destination_once() {
    let tracked = RuleConfig {
        track_ignition: true,
        ..RuleConfig::default()
    };
    let mut e = engine(
        ImageBuilder::new()
            .on(10, 0, RuleRecord::new(6, POWER, payload(0x01)).with_config(tracked))
            .on(11, 0, RuleRecord::new(6, POWER, payload(0x02)).with_config(tracked))
            .on(12, 0, RuleRecord::new(6, AUX, payload(0x04)).with_config(tracked)),
    );

    assert_eq!(e.refresh_ignition(true), Some(true));
    assert_eq!(e.rules().len(), 3);
    assert_eq!(e.aggregate(&[]).get(POWER).map(|m| m.payload), Some(payload(0x03)));

    assert_eq!(e.refresh_ignition(false), Some(false));
    let clearing: Vec<_> = e.rules().iter().collect();
    assert_eq!(clearing.len(), 2);
    assert!(clearing.iter().all(|r| r.one_shot && r.record.payload == [0; 8]));
    assert!(clearing.iter().any(|r| r.record.destination == POWER));
    assert!(clearing.iter().any(|r| r.record.destination == AUX));
}

// ── Transitions and OFF rules ─────────────────────────────────

#[test]
fn off_rules_fire_once_then_purge() {
    let mut e = engine(
        ImageBuilder::new()
            .on(0, 0, RuleRecord::new(6, LIGHTS, payload(0x01)))
            .off(0, 0, RuleRecord::new(6, AUX, payload(0x10))),
    );
    e.on_input_transition(input(0), true);
    e.on_input_transition(input(0), false);

    assert!(e.rules().iter().all(|r| r.direction == Direction::Off && r.one_shot));
    let table = e.aggregate(&[]);
    assert_eq!(table.get(LIGHTS).map(|m| m.payload), Some([0; 8]));
    assert_eq!(table.get(AUX).map(|m| m.payload), Some(payload(0x10)));

    let sent: Vec<_> = table.iter().copied().collect();
    e.complete_broadcast(&sent).unwrap();
    assert!(e.rules().is_empty());
}

#[test]
fn flashing_turn_signal_overrides_shared_brake_bit() {
    let brake = RuleRecord::new(6, LIGHTS, payload(0x03)).with_config(RuleConfig {
        overridable: true,
        ..RuleConfig::default()
    });
    let turn = RuleRecord::new(6, LIGHTS, payload(0x01)).with_pattern(1, 1);
    let mut e = engine(ImageBuilder::new().on(4, 0, brake).on(5, 0, turn));
    e.on_input_transition(input(4), true);
    e.on_input_transition(input(5), true);

    // turn signal owns bit 0 in both phases
    assert_eq!(e.aggregate(&[]).get(LIGHTS).map(|m| m.payload[0]), Some(0x03));
    e.pattern_tick();
    e.pattern_tick();
    assert!(!e.patterns().is_on_phase(input(5)));
    assert_eq!(e.aggregate(&[]).get(LIGHTS).map(|m| m.payload[0]), Some(0x02));
}
