//! Word-by-word reveal of an already complete response.
//!
//! The scheduler owns no timer. The caller drives it with [`RevealScheduler::tick`]
//! from whatever loop it already runs; a tick only produces a token once
//! `min_delay` has passed since the previous one. Every reveal is stamped
//! with a generation id, and a tick whose reveal no longer matches the
//! current generation yields nothing.

use std::time::{Duration, Instant};

pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(50);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevealStep {
    pub generation: u64,
    /// The token followed by one space.
    pub chunk: String,
    pub finished: bool,
}

#[derive(Debug)]
struct Reveal {
    generation: u64,
    tokens: Vec<String>,
    index: usize,
    last_tick: Option<Instant>,
}

#[derive(Debug)]
pub struct RevealScheduler {
    generation: u64,
    min_delay: Duration,
    active: Option<Reveal>,
}

impl Default for RevealScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REVEAL_DELAY)
    }
}

impl RevealScheduler {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            generation: 0,
            min_delay,
            active: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Begin a fresh reveal of `formatted`, abandoning any reveal in flight.
    pub fn start(&mut self, formatted: &str) -> u64 {
        self.generation += 1;
        let tokens: Vec<String> = formatted.split_whitespace().map(str::to_owned).collect();
        self.active = if tokens.is_empty() {
            None
        } else {
            Some(Reveal {
                generation: self.generation,
                tokens,
                index: 0,
                last_tick: None,
            })
        };
        self.generation
    }

    /// Stop whatever is running. Later ticks of that reveal produce nothing.
    pub fn cancel(&mut self) -> u64 {
        self.generation += 1;
        self.active = None;
        self.generation
    }

    /// Advance by at most one token.
    pub fn tick(&mut self, now: Instant) -> Option<RevealStep> {
        let current = self.generation;
        let reveal = self.active.as_mut()?;
        if reveal.generation != current {
            self.active = None;
            return None;
        }
        if let Some(last) = reveal.last_tick {
            if now.saturating_duration_since(last) < self.min_delay {
                return None;
            }
        }
        let token = reveal.tokens.get(reveal.index)?;
        let chunk = format!("{} ", token);
        reveal.index += 1;
        reveal.last_tick = Some(now);
        let finished = reveal.index >= reveal.tokens.len();
        let generation = reveal.generation;
        if finished {
            self.active = None;
        }
        Some(RevealStep {
            generation,
            chunk,
            finished,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(s: &mut RevealScheduler, start: Instant, ticks: u32, step_ms: u64) -> String {
        let mut out = String::new();
        for i in 0..ticks {
            if let Some(step) = s.tick(start + Duration::from_millis(step_ms * i as u64)) {
                out.push_str(&step.chunk);
            }
        }
        out
    }

    #[test]
    fn one_token_per_tick_with_trailing_space() {
        let mut s = RevealScheduler::default();
        s.start("<b>hi</b> there<br/>friend");
        let t0 = Instant::now();
        let a = s.tick(t0).unwrap();
        assert_eq!(a.chunk, "<b>hi</b> ");
        assert!(!a.finished);
        let b = s.tick(t0 + Duration::from_millis(50)).unwrap();
        assert_eq!(b.chunk, "there<br/>friend ");
        assert!(b.finished);
        assert!(!s.is_active());
        assert!(s.tick(t0 + Duration::from_millis(100)).is_none());
    }

    #[test]
    fn ticks_inside_min_delay_are_skipped() {
        let mut s = RevealScheduler::default();
        s.start("a b c");
        let t0 = Instant::now();
        assert!(s.tick(t0).is_some());
        assert!(s.tick(t0 + Duration::from_millis(10)).is_none());
        assert!(s.tick(t0 + Duration::from_millis(49)).is_none());
        assert_eq!(s.tick(t0 + Duration::from_millis(50)).unwrap().chunk, "b ");
    }

    #[test]
    fn whitespace_runs_collapse_to_single_tokens() {
        let mut s = RevealScheduler::new(Duration::ZERO);
        s.start("  one \t two\n\nthree ");
        assert_eq!(drain(&mut s, Instant::now(), 10, 0), "one two three ");
    }

    #[test]
    fn cancel_stops_old_reveal() {
        let mut s = RevealScheduler::new(Duration::ZERO);
        s.start("a b c d");
        let t0 = Instant::now();
        assert!(s.tick(t0).is_some());
        s.cancel();
        assert!(s.tick(t0).is_none());
    }

    #[test]
    fn restart_replaces_sequence_and_bumps_generation() {
        let mut s = RevealScheduler::new(Duration::ZERO);
        let g1 = s.start("old words here");
        let t0 = Instant::now();
        s.tick(t0);
        let g2 = s.start("new");
        assert!(g2 > g1);
        let step = s.tick(t0).unwrap();
        assert_eq!(step.generation, g2);
        assert_eq!(step.chunk, "new ");
        assert!(step.finished);
    }

    #[test]
    fn empty_text_reveals_nothing() {
        let mut s = RevealScheduler::default();
        s.start("   ");
        assert!(!s.is_active());
        assert!(s.tick(Instant::now()).is_none());
    }
}
