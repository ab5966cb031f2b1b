//! Fuzz target: engine over an arbitrary rule image
//!
//! The first 4096 bytes become the rule store; every following byte is an
//! input toggle (low 6 bits: input, bit 6: level, bit 7: pattern tick).
//! The engine must never panic and never exceed its table capacities.
//!
//! cargo fuzz run fuzz_rule_image

#![no_main]

use libfuzzer_sys::fuzz_target;
use mastercell::adapters::memory_store::MemoryRuleStore;
use mastercell::config::EngineConfig;
use mastercell::engine::Engine;
use mastercell::engine::aggregator::MAX_DESTINATIONS;
use mastercell::engine::gate::BroadcastReason;
use mastercell::engine::tracker::MAX_ACTIVE_RULES;
use mastercell::rules::InputId;

const IMAGE_LEN: usize = 4096;

fuzz_target!(|data: &[u8]| {
    if data.len() < IMAGE_LEN {
        return;
    }
    let (image, script) = data.split_at(IMAGE_LEN);
    let Ok(store) = MemoryRuleStore::from_bytes(image) else {
        return;
    };
    let mut engine = Engine::new(store, &EngineConfig::default());

    for (step, &op) in script.iter().enumerate() {
        if op & 0x80 != 0 {
            engine.pattern_tick();
        }
        if let Some(input) = InputId::new(op & 0x3F) {
            let on = op & 0x40 != 0;
            if engine.is_one_button_input(input) {
                engine.on_input_transition(input, on);
                let _ = engine.poll_one_button(input, step as u32 * 10, true);
            } else if engine.inputs().contains(input) != on {
                engine.on_input_transition(input, on);
            }
        }
        let _ = engine.refresh_ignition(step % 7 == 0);

        let reason = if op & 0x80 != 0 {
            BroadcastReason::PatternTick
        } else {
            BroadcastReason::StateChange
        };
        let due = engine.prepare_broadcast(reason, &[]);
        assert!(due.len() <= MAX_DESTINATIONS);
        // snapshot refusals are counted, not fatal
        let _ = engine.complete_broadcast(&due);
        assert!(engine.rules().len() <= MAX_ACTIVE_RULES);
    }
});
