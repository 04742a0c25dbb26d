use std::collections::HashSet;
use tracing::debug;
use crate::core::candidates::CandidateSource;
use crate::core::scoring::calculate_freight_score;
use crate::core::tables::ScoringTables;
use crate::models::{
    Band, Candidate, City, CityKey, EquipmentClass, MarketUsageSet, ShortfallPolicy, Side, SideDiagnostics, Tier,
};
use crate::services::catalog::CatalogError;

/// Default distance bands in miles
pub const DEFAULT_BANDS: [Band; 5] = [
    Band::new(0.0, 25.0),
    Band::new(25.0, 35.0),
    Band::new(35.0, 50.0),
    Band::new(50.0, 75.0),
    Band::new(75.0, 100.0),
];

/// Default radius ceilings in miles: primary, maximum, emergency
pub const DEFAULT_CEILINGS: [f64; 3] = [50.0, 75.0, 100.0];

/// Flatten bands nested in ceilings into an ordered search plan
///
/// `max_radius` drops larger ceilings and is appended as the last ceiling
/// when missing. Each tier only covers distance not already covered by an
/// earlier tier, so a city is discoverable in exactly one tier.
pub fn build_tier_plan(bands: &[Band], ceilings: &[f64], max_radius: Option<f64>) -> Vec<Tier> {
    let mut ceilings: Vec<f64> = ceilings
        .iter()
        .copied()
        .filter(|c| c.is_finite() && *c > 0.0)
        .collect();
    ceilings.sort_by(f64::total_cmp);
    ceilings.dedup();

    if let Some(limit) = max_radius.filter(|r| r.is_finite() && *r > 0.0) {
        ceilings.retain(|c| *c <= limit);
        if ceilings.last().map_or(true, |last| *last < limit) {
            ceilings.push(limit);
        }
    }

    let mut bands: Vec<Band> = bands
        .iter()
        .copied()
        .filter(|b| b.max_miles > b.min_miles)
        .collect();
    bands.sort_by(|a, b| a.min_miles.total_cmp(&b.min_miles));

    let mut plan: Vec<Tier> = Vec::new();
    let mut covered = 0.0_f64;

    for ceiling in ceilings {
        for band in &bands {
            if band.min_miles >= ceiling {
                continue;
            }
            let max = band.max_miles.min(ceiling);
            if max <= covered {
                continue;
            }
            push_tier(&mut plan, ceiling, band.min_miles.max(covered), max);
            covered = max;
        }

        // Ceilings beyond the configured bands get one catch-all tier
        if covered < ceiling {
            push_tier(&mut plan, ceiling, covered, ceiling);
            covered = ceiling;
        }
    }

    plan
}

fn push_tier(plan: &mut Vec<Tier>, ceiling: f64, min: f64, max: f64) {
    plan.push(Tier {
        index: plan.len(),
        ceiling_miles: ceiling,
        min_miles: min,
        max_miles: max,
        relaxed: false,
    });
}

/// One side's ranked, market-diverse candidates
#[derive(Debug, Clone)]
pub struct SideSelection {
    pub side: Side,
    pub candidates: Vec<Candidate>,
    pub diagnostics: SideDiagnostics,
}

/// Band-tiered, market-capped selection for one side
///
/// # Pipeline Stages
/// 1. Strict pass: walk the tier plan, admit the best candidate per unused market
/// 2. Relaxation pass (policy permitting): reuse a market only from a different tier
pub struct DiversitySelector<'a> {
    tables: &'a ScoringTables,
    plan: &'a [Tier],
    equipment: EquipmentClass,
    required: usize,
    policy: ShortfallPolicy,
}

impl<'a> DiversitySelector<'a> {
    pub fn new(
        tables: &'a ScoringTables,
        plan: &'a [Tier],
        equipment: EquipmentClass,
        required: usize,
        policy: ShortfallPolicy,
    ) -> Self {
        Self {
            tables,
            plan,
            equipment,
            required,
            policy,
        }
    }

    pub async fn select(
        &self,
        source: &mut CandidateSource<'_>,
        base: &City,
        side: Side,
    ) -> Result<SideSelection, CatalogError> {
        let mut usage = MarketUsageSet::new();
        let mut admitted: Vec<Candidate> = Vec::new();
        let mut admitted_keys: HashSet<CityKey> = HashSet::new();
        let mut diagnostics = SideDiagnostics::default();

        for tier in self.plan {
            if admitted.len() >= self.required {
                break;
            }
            diagnostics.tiers_searched += 1;

            let excluded = usage.codes();
            let ranked = self.rank(source.fetch_candidates(base, *tier, &excluded, true).await?, base);

            for candidate in ranked {
                if admitted.len() >= self.required {
                    break;
                }
                if admitted_keys.contains(&candidate.key()) || usage.contains(&candidate.market_code) {
                    continue;
                }
                usage.insert(&candidate.market_code, tier.index);
                admitted_keys.insert(candidate.key());
                admitted.push(candidate);
            }

            debug!(
                "{} tier {} ({:.0}-{:.0}mi, ceiling {:.0}): {}/{} admitted",
                side, tier.index, tier.min_miles, tier.max_miles, tier.ceiling_miles,
                admitted.len(), self.required
            );
        }

        if admitted.len() < self.required && self.policy.allows_relaxation() {
            diagnostics.relaxation_used = true;
            debug!("{} short by {}, relaxing market uniqueness", side, self.required - admitted.len());

            let no_exclusions = HashSet::new();
            for tier in self.plan {
                if admitted.len() >= self.required {
                    break;
                }

                let ranked = self.rank(source.fetch_candidates(base, *tier, &no_exclusions, false).await?, base);

                for candidate in ranked {
                    if admitted.len() >= self.required {
                        break;
                    }
                    if admitted_keys.contains(&candidate.key())
                        || usage.used_in_tier(&candidate.market_code, tier.index)
                    {
                        continue;
                    }
                    usage.insert(&candidate.market_code, tier.index);
                    admitted_keys.insert(candidate.key());
                    admitted.push(Candidate {
                        tier: candidate.tier.relaxed(),
                        ..candidate
                    });
                }
            }
        }

        diagnostics.admitted = admitted.len();
        diagnostics.fallback_candidates = admitted.iter().filter(|c| c.from_fallback).count();
        diagnostics.synthesized_markets = admitted.iter().filter(|c| c.market_synthesized()).count();

        Ok(SideSelection {
            side,
            candidates: admitted,
            diagnostics,
        })
    }

    /// Score and sort: score descending, then distance ascending, then city key
    fn rank(&self, candidates: Vec<Candidate>, base: &City) -> Vec<Candidate> {
        let mut scored: Vec<Candidate> = candidates
            .into_iter()
            .map(|mut c| {
                c.score = calculate_freight_score(&c, base, self.equipment, self.tables);
                c
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.distance_miles.total_cmp(&b.distance_miles))
                .then_with(|| a.key().cmp(&b.key()))
        });

        scored
    }
}
