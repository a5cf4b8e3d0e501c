use core_types::{stats::median, ExtremaPoint, LevelType, PriceLevel};

/// 1-D density-based clustering of extrema prices into candidate levels (§4.9).
/// Hand-rolled rather than pulled from a clustering crate — this is a small,
/// single-dimension variant of DBSCAN and the rest of the workspace never reaches
/// for a general-purpose ML library for this kind of thing.
pub struct DbscanClusterer {
    eps_fraction: f64,
    min_samples: usize,
}

impl DbscanClusterer {
    pub fn new(eps_fraction: f64, min_samples: usize) -> Self {
        Self { eps_fraction, min_samples }
    }
}

impl Default for DbscanClusterer {
    fn default() -> Self {
        Self::new(0.02, 2)
    }
}

impl DbscanClusterer {
    /// Runs 1-D DBSCAN on extrema prices and emits one `PriceLevel` per
    /// non-noise cluster. Input need not be pre-sorted.
    pub fn cluster_levels(&self, extrema: &[ExtremaPoint]) -> Vec<PriceLevel> {
        if extrema.is_empty() {
            return Vec::new();
        }

        let prices: Vec<f64> = extrema.iter().map(|e| e.price).collect();
        let eps = median(&prices) * self.eps_fraction;

        let mut order: Vec<usize> = (0..extrema.len()).collect();
        order.sort_by(|&a, &b| extrema[a].price.partial_cmp(&extrema[b].price).unwrap());

        let mut labels = vec![None; extrema.len()]; // None = unvisited, Some(None) = noise, Some(Some(cluster_id))
        let mut cluster_id = 0usize;

        for &idx in &order {
            if labels[idx].is_some() {
                continue;
            }
            let neighbors = self.region_query(&extrema, idx, eps);
            if neighbors.len() + 1 < self.min_samples {
                labels[idx] = Some(None);
                continue;
            }
            labels[idx] = Some(Some(cluster_id));
            let mut seeds = neighbors;
            let mut i = 0;
            while i < seeds.len() {
                let seed = seeds[i];
                if labels[seed].is_none() {
                    labels[seed] = Some(Some(cluster_id));
                    let seed_neighbors = self.region_query(&extrema, seed, eps);
                    if seed_neighbors.len() + 1 >= self.min_samples {
                        for n in seed_neighbors {
                            if !seeds.contains(&n) {
                                seeds.push(n);
                            }
                        }
                    }
                } else if labels[seed] == Some(None) {
                    labels[seed] = Some(Some(cluster_id));
                }
                i += 1;
            }
            cluster_id += 1;
        }

        let mut clusters: Vec<Vec<usize>> = vec![Vec::new(); cluster_id];
        for (idx, label) in labels.iter().enumerate() {
            if let Some(Some(id)) = label {
                clusters[*id].push(idx);
            }
        }

        clusters
            .into_iter()
            .filter(|members| !members.is_empty())
            .map(|members| Self::build_level(&extrema, &members))
            .collect()
    }

    fn region_query(&self, extrema: &[ExtremaPoint], idx: usize, eps: f64) -> Vec<usize> {
        let price = extrema[idx].price;
        (0..extrema.len())
            .filter(|&j| j != idx && (extrema[j].price - price).abs() <= eps)
            .collect()
    }

    fn build_level(extrema: &[ExtremaPoint], members: &[usize]) -> PriceLevel {
        let prices: Vec<f64> = members.iter().map(|&i| extrema[i].price).collect();
        let mean_price = prices.iter().sum::<f64>() / prices.len() as f64;

        let first_touch = members.iter().map(|&i| extrema[i].timestamp).min().unwrap();
        let last_touch = members.iter().map(|&i| extrema[i].timestamp).max().unwrap();

        // Type from the closest actual extremum to the cluster mean.
        let closest = members
            .iter()
            .min_by(|&&a, &&b| {
                (extrema[a].price - mean_price)
                    .abs()
                    .partial_cmp(&(extrema[b].price - mean_price).abs())
                    .unwrap()
            })
            .unwrap();
        let level_type = extrema[*closest].level_type;

        PriceLevel {
            price: mean_price,
            level_type,
            touches: members.len(),
            first_touch,
            last_touch,
            validation_rate: 0.0,
            validated: false,
            strength: 0,
            breakout_probability: 0.0,
            volume: None,
            volume_percentile: None,
            has_volume_confirmation: false,
            projected_valid_until: None,
            projected_validity_probability: None,
            projected_strength: None,
        }
    }

    pub fn filter_clusters(levels: Vec<PriceLevel>, min_touches: usize) -> Vec<PriceLevel> {
        levels.into_iter().filter(|l| l.touches >= min_touches).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn point(price: f64, level_type: LevelType) -> ExtremaPoint {
        ExtremaPoint { index: 0, timestamp: Utc::now(), price, level_type }
    }

    #[test]
    fn clusters_nearby_prices_together() {
        let clusterer = DbscanClusterer::new(0.02, 2);
        let extrema = vec![
            point(100.0, LevelType::Resistance),
            point(100.5, LevelType::Resistance),
            point(101.0, LevelType::Resistance),
            point(150.0, LevelType::Resistance),
        ];
        let levels = clusterer.cluster_levels(&extrema);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].touches, 3);
    }

    #[test]
    fn isolated_point_is_noise_and_dropped() {
        let clusterer = DbscanClusterer::new(0.01, 2);
        let extrema = vec![point(100.0, LevelType::Support), point(200.0, LevelType::Support)];
        let levels = clusterer.cluster_levels(&extrema);
        assert!(levels.is_empty());
    }
}
