//! Replay a trace through the real decoding pipeline on the host.

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use anyhow::{bail, Result};
use embedded_hal::digital::{ErrorType, InputPin};
use footswitch_core::{
    Clock, CommandIndex, ConsumerKey, Gesture, InputHandler, ManualClock, Millis, TimingConfig,
};
use tracing::debug;

use crate::trace::{self, Step};

/// Active-low contact driven by the replay loop. `true` = pressed.
#[derive(Clone, Default)]
struct ScriptedPin(Rc<Cell<bool>>);

impl ErrorType for ScriptedPin {
    type Error = Infallible;
}

impl InputPin for ScriptedPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.get())
    }
}

/// Pipeline state after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub t: Millis,
    pub raw: bool,
    pub debounced: bool,
}

/// A tick on which the command index was non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub t: Millis,
    pub index: u8,
    pub gesture: Gesture,
    pub command: Option<ConsumerKey>,
}

#[derive(Debug, Default)]
pub struct Simulation {
    pub samples: Vec<Sample>,
    pub pulses: Vec<Pulse>,
    pub duration: Millis,
}

/// Run `steps` through one footswitch pipeline, polling every `tick_ms`.
///
/// `commands[i]` is the media key pressed for index `i + 1`.
pub fn run(
    steps: &[Step],
    config: &TimingConfig,
    tick_ms: Millis,
    commands: &[ConsumerKey],
) -> Result<Simulation> {
    if tick_ms == 0 {
        bail!("tick must be at least 1 ms");
    }

    let levels = trace::expand(steps);
    let Ok(duration) = Millis::try_from(levels.len()) else {
        bail!("trace of {} ms does not fit the clock", levels.len());
    };
    let contact = ScriptedPin::default();
    let mut input = InputHandler::new(contact.clone(), true, config.debounce_ms);
    let mut index = CommandIndex::from_config(config);
    let clock = ManualClock::new(0);

    let mut sim = Simulation {
        duration,
        ..Default::default()
    };

    while let Some(&pressed) = levels.get(clock.now_ms() as usize) {
        let now = clock.now_ms();
        contact.0.set(pressed);
        input.update(now);
        index.update(&input);

        let current = index.index();
        sim.samples.push(Sample {
            t: now,
            raw: pressed,
            debounced: input.state(),
        });
        if current > 0 {
            let command = commands.get(usize::from(current) - 1).copied();
            debug!(t = now, index = current, ?command, "pulse");
            sim.pulses.push(Pulse {
                t: now,
                index: current,
                gesture: index.gesture(),
                command,
            });
        }

        clock.advance(tick_ms);
    }

    Ok(sim)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEDIA: [ConsumerKey; 3] = [
        ConsumerKey::PlayPause,
        ConsumerKey::ScanNext,
        ConsumerKey::ScanPrevious,
    ];

    fn indices(sim: &Simulation) -> Vec<(Millis, u8)> {
        sim.pulses.iter().map(|p| (p.t, p.index)).collect()
    }

    #[test]
    fn test_single_tap() {
        let steps = [Step::Down(60), Step::Up(500)];
        let sim = run(&steps, &TimingConfig::DEFAULT, 1, &MEDIA).unwrap();
        // Last held tick is 59, the burst closes once more than 300ms have passed
        assert_eq!(indices(&sim), vec![(360, 1)]);
        assert_eq!(sim.pulses[0].command, Some(ConsumerKey::PlayPause));
        assert_eq!(sim.pulses[0].gesture, Gesture::Burst(1));
    }

    #[test]
    fn test_double_tap_with_chatter() {
        let steps = [
            Step::Down(60),
            Step::Up(80),
            Step::Chatter(3),
            Step::Down(60),
            Step::Up(500),
        ];
        let sim = run(&steps, &TimingConfig::DEFAULT, 1, &MEDIA).unwrap();
        assert_eq!(sim.pulses.len(), 1);
        assert_eq!(sim.pulses[0].index, 2);
        assert_eq!(sim.pulses[0].command, Some(ConsumerKey::ScanNext));
    }

    #[test]
    fn test_hold_reports_max_index() {
        let steps = [Step::Down(1500), Step::Up(500)];
        let sim = run(&steps, &TimingConfig::DEFAULT, 1, &MEDIA).unwrap();
        assert_eq!(indices(&sim), vec![(1000, 3)]);
        assert_eq!(sim.pulses[0].gesture, Gesture::Hold);
    }

    #[test]
    fn test_coarse_tick() {
        let steps = [Step::Down(60), Step::Up(500)];
        let sim = run(&steps, &TimingConfig::DEFAULT, 10, &MEDIA).unwrap();
        assert_eq!(sim.samples.len(), 56);
        assert_eq!(sim.pulses.len(), 1);
        assert_eq!(sim.pulses[0].index, 1);
        assert_eq!(sim.pulses[0].t % 10, 0);
    }

    #[test]
    fn test_index_without_command() {
        let steps = [Step::Down(1200), Step::Up(10)];
        let sim = run(&steps, &TimingConfig::DEFAULT, 1, &MEDIA[..1]).unwrap();
        assert_eq!(sim.pulses[0].index, 3);
        assert_eq!(sim.pulses[0].command, None);
    }

    #[test]
    fn test_sample_trace_decodes_each_gesture() {
        let steps = trace::parse_trace(include_str!("../../traces/gestures.trace")).unwrap();
        let sim = run(&steps, &TimingConfig::DEFAULT, 1, &MEDIA).unwrap();
        let found: Vec<u8> = sim.pulses.iter().map(|p| p.index).collect();
        assert_eq!(found, vec![1, 2, 3]);
        assert_eq!(sim.pulses[2].gesture, Gesture::Hold);
    }

    #[test]
    fn test_zero_tick_rejected() {
        assert!(run(&[Step::Down(1)], &TimingConfig::DEFAULT, 0, &MEDIA).is_err());
    }
}
