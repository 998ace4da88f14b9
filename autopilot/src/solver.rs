use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use helicarrier_core::{Avenger, FireResponse};

use crate::belief::BeliefMap;
use crate::bias::BiasTables;
use crate::deduce::propagate;
use crate::enumerate::{refresh_heat, EnumerationOptions};
use crate::policy::{plan_shot, ShotPlan};

#[derive(Clone, Debug)]
pub struct SolverOptions {
    pub center_bias: bool,
    pub enumeration: EnumerationOptions,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            center_bias: false,
            enumeration: EnumerationOptions::default(),
        }
    }
}

/// One board's worth of inference: consumes fire responses, keeps the
/// belief and heat map current, and proposes the next shot.
pub struct Solver {
    belief: BeliefMap,
    bias: Arc<BiasTables>,
    options: SolverOptions,
    rng: StdRng,
    avenger_available: bool,
    pending_hint: Option<Avenger>,
}

impl Solver {
    pub fn new(seed: u64, bias: Arc<BiasTables>, options: SolverOptions) -> Self {
        Solver {
            belief: BeliefMap::new(),
            bias,
            options,
            rng: StdRng::seed_from_u64(seed),
            avenger_available: false,
            pending_hint: None,
        }
    }

    pub fn belief(&self) -> &BeliefMap {
        &self.belief
    }

    /// Fold a response in, then re-run deduction and heat synthesis.
    pub fn observe(&mut self, response: &FireResponse) -> anyhow::Result<()> {
        self.belief.update_from_response(response)?;

        // Thor and Hulk discoveries arrive through the grid itself; only
        // IronMan's hint lives solely in the avenger results.
        if let Some(Avenger::IronMan) = self.pending_hint.take() {
            if let Some(results) = &response.avenger_result {
                for result in results {
                    if result.hit {
                        let (x, y) = result.engine_xy();
                        self.belief.iron_man_hint(x, y)?;
                    }
                }
            }
        }
        self.avenger_available = response.avenger_available;

        propagate(&mut self.belief)?;
        refresh_heat(
            &mut self.belief,
            &self.bias,
            &self.options.enumeration,
            &mut self.rng,
        )
    }

    /// Next shot to submit; None when no unknown cell is left worth firing.
    pub fn next_plan(&mut self) -> Option<ShotPlan> {
        let plan = plan_shot(
            &self.belief,
            self.avenger_available,
            self.options.center_bias,
            &mut self.rng,
        );
        if let Some(plan) = &plan {
            self.pending_hint = plan.avenger;
        }
        plan
    }
}
