//! Progression placement and the final filler bijection.
use rand::Rng;

use super::session::GenerationSession;
use super::trace::Trace;
use crate::error::FailureReason;

impl GenerationSession {
    /// Place progression items one at a time, each into a location that is
    /// already in logic, until every region is discovered.
    pub(crate) fn place_progression<R: Rng + ?Sized>(
        &mut self,
        other_chance: f64,
        rng: &mut R,
        trace: &mut Trace,
    ) -> Result<(), FailureReason> {
        loop {
            let gates = self.placeable_gates();
            let other = self.placeable_other();
            if gates.is_empty() && other.is_empty() {
                return if self.state.is_fully_discovered() {
                    Ok(())
                } else if self.state.available().is_empty() {
                    Err(FailureReason::NoAvailableLocations {
                        undiscovered: self.state.undiscovered_count(),
                    })
                } else {
                    Err(FailureReason::NoPlaceableProgression {
                        undiscovered: self.state.undiscovered_count(),
                    })
                };
            }

            let available = self.state.available().len();
            if available == 0 {
                return Err(FailureReason::NoAvailableLocations {
                    undiscovered: self.state.undiscovered_count(),
                });
            }

            let bucket = if gates.is_empty() {
                &other
            } else if other.is_empty() || !rng.gen_bool(other_chance) {
                &gates
            } else {
                &other
            };
            let pick = bucket[rng.gen_range(0..bucket.len())];
            let Some(location) = self.nth_available(rng.gen_range(0..available)) else {
                return Err(FailureReason::NoAvailableLocations {
                    undiscovered: self.state.undiscovered_count(),
                });
            };

            let item = self.pool.swap_remove(pick);
            let newly = self.fold(&item);
            trace.record(format!(
                "{item} -> {} (+{newly} available)",
                self.state.location(location).id
            ));
            self.assign(location, item);
        }
    }

    /// Place progression gates that never reached the frontier. Afterwards
    /// every location must be in logic.
    pub(crate) fn place_filler_gates<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        trace: &mut Trace,
    ) -> Result<(), FailureReason> {
        loop {
            let gates = self.progression_gates();
            if gates.is_empty() {
                break;
            }
            let available = self.state.available().len();
            if available == 0 {
                return Err(FailureReason::NoAvailableLocations {
                    undiscovered: self.state.undiscovered_count(),
                });
            }
            let pick = gates[rng.gen_range(0..gates.len())];
            let Some(location) = self.nth_available(rng.gen_range(0..available)) else {
                return Err(FailureReason::NoAvailableLocations {
                    undiscovered: self.state.undiscovered_count(),
                });
            };
            let item = self.pool.swap_remove(pick);
            self.fold(&item);
            trace.record(format!("{item} -> {}", self.state.location(location).id));
            self.assign(location, item);
        }

        match self.state.unreached().len() {
            0 => Ok(()),
            count => Err(FailureReason::UnreachableLocations { count }),
        }
    }

    /// Random bijection between the remaining pool and the remaining locations.
    pub(crate) fn place_filler<R: Rng + ?Sized>(&mut self, rng: &mut R, trace: &mut Trace) {
        let locations: Vec<usize> = self.state.available().iter().copied().collect();
        for location in locations {
            if self.pool.is_empty() {
                break;
            }
            let item = self.pool.swap_remove(rng.gen_range(0..self.pool.len()));
            trace.record(format!("{item} -> {}", self.state.location(location).id));
            self.assign(location, item);
        }
    }
}
