//! Signal State Machine
//!
//! Turns a standardized spread into long and short position tallies.
//!
//! Each leg is an independent two-state machine:
//!
//! ```text
//!           entry condition
//!   FLAT  ------------------>  IN_POSITION
//!         <------------------
//!           exit condition
//! ```
//!
//! Long leg: enter when `z < long_entry`, exit when `z >= long_exit`.
//! Short leg: enter when `z > short_entry`, exit when `z <= short_exit`.
//!
//! Only the transition leaving the current state is checked, so an open leg
//! never re-enters and a flat leg ignores exit conditions. Entries add one open
//! unit and exits remove one. The two legs are netted without any mutual
//! exclusion.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::error::AnalysisError;
use crate::domain::series::{PositionSeries, TimeSeries};
use crate::strategy::params::SignalThresholds;

/// State of one leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LegState {
    Flat,
    InPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LegSide {
    Long,
    Short,
}

/// A fired transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LegEvent {
    Entry,
    Exit,
}

/// One leg of the signal generator with its open-unit counter
#[derive(Debug, Clone)]
pub struct LegMachine {
    side: LegSide,
    entry: f64,
    exit: f64,
    state: LegState,
    open_units: u32,
}

impl LegMachine {
    pub fn long(entry: f64, exit: f64) -> Self {
        Self::new(LegSide::Long, entry, exit)
    }

    pub fn short(entry: f64, exit: f64) -> Self {
        Self::new(LegSide::Short, entry, exit)
    }

    fn new(side: LegSide, entry: f64, exit: f64) -> Self {
        Self {
            side,
            entry,
            exit,
            state: LegState::Flat,
            open_units: 0,
        }
    }

    pub fn side(&self) -> LegSide {
        self.side
    }

    pub fn state(&self) -> LegState {
        self.state
    }

    pub fn open_units(&self) -> u32 {
        self.open_units
    }

    /// Feed one z-score, returning the transition it fired, if any
    pub fn step(&mut self, z: f64) -> Option<LegEvent> {
        match self.state {
            LegState::Flat if self.entry_condition(z) => {
                self.state = LegState::InPosition;
                self.open_units = self.open_units.saturating_add(1);
                Some(LegEvent::Entry)
            }
            LegState::InPosition if self.exit_condition(z) => {
                debug_assert!(self.open_units > 0, "exit with no open units");
                self.state = LegState::Flat;
                self.open_units = self.open_units.saturating_sub(1);
                Some(LegEvent::Exit)
            }
            _ => None,
        }
    }

    fn entry_condition(&self, z: f64) -> bool {
        match self.side {
            LegSide::Long => z < self.entry,
            LegSide::Short => z > self.entry,
        }
    }

    fn exit_condition(&self, z: f64) -> bool {
        match self.side {
            LegSide::Long => z >= self.exit,
            LegSide::Short => z <= self.exit,
        }
    }
}

/// A transition together with where it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignalEvent {
    pub timestamp: NaiveDate,
    pub side: LegSide,
    pub event: LegEvent,
}

/// Positions and the transitions that produced them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRun {
    pub positions: PositionSeries,
    pub events: Vec<SignalEvent>,
}

impl SignalRun {
    pub fn count(&self, side: LegSide, event: LegEvent) -> usize {
        self.events
            .iter()
            .filter(|e| e.side == side && e.event == event)
            .count()
    }
}

/// Long and short leg machines run side by side over a z-score series
#[derive(Debug, Clone)]
pub struct SignalStateMachine {
    thresholds: SignalThresholds,
}

impl SignalStateMachine {
    pub fn new(thresholds: SignalThresholds) -> Result<Self, AnalysisError> {
        thresholds
            .validate()
            .map_err(|e| AnalysisError::InvalidInput(e.to_string()))?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &SignalThresholds {
        &self.thresholds
    }

    /// Run both legs from flat over the whole series
    ///
    /// Every call starts from fresh machines; nothing carries over between runs.
    pub fn run(&self, z: &TimeSeries) -> SignalRun {
        let mut long = LegMachine::long(self.thresholds.long_entry, self.thresholds.long_exit);
        let mut short = LegMachine::short(self.thresholds.short_entry, self.thresholds.short_exit);

        let mut long_units = Vec::with_capacity(z.len());
        let mut short_units = Vec::with_capacity(z.len());
        let mut events = Vec::new();

        for (timestamp, value) in z.iter() {
            for leg in [&mut long, &mut short] {
                if let Some(event) = leg.step(value) {
                    events.push(SignalEvent {
                        timestamp,
                        side: leg.side(),
                        event,
                    });
                }
            }
            long_units.push(long.open_units());
            short_units.push(short.open_units());
        }

        tracing::debug!(
            "Signal run: {} points, {} transitions, final long={}, short={}",
            z.len(),
            events.len(),
            long.open_units(),
            short.open_units()
        );

        SignalRun {
            positions: PositionSeries::new(z.timestamps().to_vec(), long_units, short_units),
            events,
        }
    }
}

/// Linear sizing: hold `-z` units at every point
pub fn linear_units(z: &TimeSeries) -> TimeSeries {
    z.map_values(|v| -v)
}
