use tracing::debug;
use crate::models::{Candidate, Pair, ShortfallPolicy, ShortfallReason};

/// Assembled pairs plus why the count came up short, if it did
#[derive(Debug, Clone)]
pub struct Assembly {
    pub pairs: Vec<Pair>,
    pub shortfall_reason: Option<ShortfallReason>,
}

/// Zip ranked pickups and deliveries positionally into at most `required` pairs
///
/// Under `NeverPad` a pair whose two ends are the same city is dropped and
/// the following candidates move up. Pairs are never padded with repeats.
pub fn assemble_pairs(
    pickups: Vec<Candidate>,
    deliveries: Vec<Candidate>,
    required: usize,
    policy: ShortfallPolicy,
    relaxation_used: bool,
) -> Assembly {
    let pairs: Vec<Pair> = pickups
        .into_iter()
        .zip(deliveries)
        .filter(|(pickup, delivery)| {
            let degenerate = policy == ShortfallPolicy::NeverPad && pickup.key() == delivery.key();
            if degenerate {
                debug!("Dropping same-city pair {}", pickup.key());
            }
            !degenerate
        })
        .take(required)
        .map(|(pickup, delivery)| Pair::new(pickup, delivery))
        .collect();

    let shortfall_reason = if pairs.len() < required {
        Some(if relaxation_used {
            ShortfallReason::InsufficientUniqueMarketsAfterRelaxation
        } else {
            ShortfallReason::InsufficientUniqueMarkets
        })
    } else {
        None
    };

    Assembly {
        pairs,
        shortfall_reason,
    }
}
