//! Match the item pool size to the location count.
use rand::Rng;

use super::session::GenerationSession;
use super::trace::Trace;
use crate::config::GeneratorConfig;
use crate::error::FailureReason;
use crate::item::Item;
use crate::profile::ProfileId;

impl GenerationSession {
    /// Trim or pad the pool until it holds exactly one item per location.
    pub(crate) fn balance<R: Rng + ?Sized>(
        &mut self,
        config: &GeneratorConfig,
        profile: &ProfileId,
        filler_names: &[String],
        rng: &mut R,
        trace: &mut Trace,
    ) -> Result<(), FailureReason> {
        let locations = self.state.locations().len();
        trace.record(format!("{} items for {locations} locations", self.pool.len()));
        if self.pool.len() > locations {
            self.trim_excess(locations, config.min_passage_tokens, rng, trace)
        } else {
            self.pad_deficit(locations, config, profile, filler_names, rng, trace)
        }
    }

    fn trim_excess<R: Rng + ?Sized>(
        &mut self,
        locations: usize,
        min_passage_tokens: usize,
        rng: &mut R,
        trace: &mut Trace,
    ) -> Result<(), FailureReason> {
        while self.pool.len() > locations {
            let tokens: Vec<usize> = self
                .pool
                .iter()
                .enumerate()
                .filter(|(_, item)| item.is_passage_token())
                .map(|(idx, _)| idx)
                .collect();
            if tokens.len() > min_passage_tokens {
                let removed = self.pool.swap_remove(tokens[rng.gen_range(0..tokens.len())]);
                trace.record(format!("removed {removed}"));
                continue;
            }

            let gates = self.progression_gates();
            if gates.is_empty() {
                return Err(FailureReason::BalanceExhausted {
                    items: self.pool.len(),
                    locations,
                });
            }
            let removed = self.pool.swap_remove(gates[rng.gen_range(0..gates.len())]);
            if let Some(gate) = removed.progression_gate() {
                self.state.add_gate(gate);
                trace.record(format!("pre-opened {gate}"));
                self.pre_opened.push(gate.clone());
            }
        }
        Ok(())
    }

    fn pad_deficit<R: Rng + ?Sized>(
        &mut self,
        locations: usize,
        config: &GeneratorConfig,
        profile: &ProfileId,
        filler_names: &[String],
        rng: &mut R,
        trace: &mut Trace,
    ) -> Result<(), FailureReason> {
        if config.cycle_filler.profiles.contains(profile) {
            let cap = config.cycle_filler.cap(locations);
            let mut added = 0;
            while added < cap && self.pool.len() < locations {
                self.pool.push(Item::cycle_bonus());
                added += 1;
            }
            if added > 0 {
                trace.record(format!("added {added} cycle filler"));
            }
        }

        if config.filler_enabled {
            let mut added = 0;
            while !filler_names.is_empty() && self.pool.len() < locations {
                let name = &filler_names[rng.gen_range(0..filler_names.len())];
                self.pool.push(Item::filler(name));
                added += 1;
            }
            if added > 0 {
                trace.record(format!("added {added} generic filler"));
            }
        } else {
            let gates: Vec<_> = self
                .progression_gates()
                .into_iter()
                .filter_map(|idx| self.pool[idx].progression_gate().cloned())
                .collect();
            let mut added = 0;
            while !gates.is_empty() && self.pool.len() < locations {
                let copy = Item::gate_copy(&gates[added % gates.len()]);
                self.pool.push(copy);
                added += 1;
            }
            if added > 0 {
                trace.record(format!("added {added} duplicate gates"));
            }
        }

        if self.pool.len() == locations {
            Ok(())
        } else {
            Err(FailureReason::BalanceExhausted {
                items: self.pool.len(),
                locations,
            })
        }
    }
}
