//! Footswitch trace scripts.
//!
//! One step per line, `#` starts a comment:
//!
//! ```text
//! # double tap, then hold
//! down 60
//! up 80
//! chatter 4   # contact bounce
//! down 60
//! up 400
//! down 1200
//! ```
//!
//! `chatter` flips the contact every millisecond, starting from the opposite
//! of the current level, and leaves it where it was afterwards.

use anyhow::{bail, Context, Result};
use footswitch_core::Millis;

/// Longest trace accepted, one hour. Expansion holds one level per ms.
pub const MAX_TRACE_MS: Millis = 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Down(Millis),
    Up(Millis),
    Chatter(Millis),
}

impl Step {
    pub fn duration(self) -> Millis {
        match self {
            Step::Down(ms) | Step::Up(ms) | Step::Chatter(ms) => ms,
        }
    }
}

pub fn parse_trace(input: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    let mut total: Millis = 0;

    for (idx, line) in input.lines().enumerate() {
        let line_num = idx + 1;
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let mut words = line.split_whitespace();
        let (Some(verb), Some(ms), None) = (words.next(), words.next(), words.next()) else {
            bail!("line {line_num}: expected `<down|up|chatter> <ms>`");
        };
        let ms: Millis = ms
            .parse()
            .with_context(|| format!("line {line_num}: invalid duration {ms:?}"))?;

        steps.push(match verb.to_ascii_lowercase().as_str() {
            "down" => Step::Down(ms),
            "up" => Step::Up(ms),
            "chatter" => Step::Chatter(ms),
            other => bail!("line {line_num}: unknown step {other:?}"),
        });

        total = match total.checked_add(ms) {
            Some(t) if t <= MAX_TRACE_MS => t,
            _ => bail!("line {line_num}: trace longer than {MAX_TRACE_MS} ms"),
        };
    }

    if steps.is_empty() {
        bail!("trace contains no steps");
    }
    Ok(steps)
}

/// Expand steps into one contact level (true = pressed) per millisecond.
/// The switch starts released.
pub fn expand(steps: &[Step]) -> Vec<bool> {
    let total: usize = steps.iter().map(|s| s.duration() as usize).sum();
    let mut levels = Vec::with_capacity(total);
    let mut level = false;

    for &step in steps {
        match step {
            Step::Down(ms) => {
                level = true;
                levels.extend(std::iter::repeat(level).take(ms as usize));
            }
            Step::Up(ms) => {
                level = false;
                levels.extend(std::iter::repeat(level).take(ms as usize));
            }
            Step::Chatter(ms) => {
                levels.extend((0..ms).map(|i| if i % 2 == 0 { !level } else { level }));
            }
        }
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps_and_comments() {
        let trace = "# header\n\
                     down 60\n\
                     \n\
                     UP 80   # trailing\n\
                     chatter 4\n";
        assert_eq!(
            parse_trace(trace).unwrap(),
            vec![Step::Down(60), Step::Up(80), Step::Chatter(4)]
        );
    }

    #[test]
    fn test_parse_rejects_unknown_step() {
        let err = parse_trace("down 10\nhold 5\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_rejects_bad_duration() {
        assert!(parse_trace("down -5\n").is_err());
        assert!(parse_trace("down\n").is_err());
        assert!(parse_trace("down 5 6\n").is_err());
    }

    #[test]
    fn test_parse_empty_trace() {
        assert!(parse_trace("# nothing\n\n").is_err());
    }

    #[test]
    fn test_parse_rejects_overlong_step() {
        let err = parse_trace("down 4000000000\n").unwrap_err();
        assert!(err.to_string().contains("line 1: trace longer than"));
    }

    #[test]
    fn test_parse_limit_is_cumulative() {
        let half = MAX_TRACE_MS / 2;
        assert!(parse_trace(&format!("down {half}\nup {half}\n")).is_ok());
        let err = parse_trace(&format!("down {half}\nup {half}\nchatter 1\n")).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_expand_levels() {
        let levels = expand(&[Step::Down(2), Step::Chatter(3), Step::Up(1)]);
        assert_eq!(levels, vec![true, true, false, true, false, false]);
    }

    #[test]
    fn test_chatter_from_released() {
        let levels = expand(&[Step::Chatter(4), Step::Down(1)]);
        assert_eq!(levels, vec![true, false, true, false, true]);
    }
}
