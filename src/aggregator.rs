use crate::models::StatsSnapshot;
use serde::Serialize;

/// Répartition du trafic par statut, en pourcentage du total
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Distribution {
    pub normal_pct: f64,
    pub suspicious_pct: f64,
    pub attack_pct: f64,
}

/// Calcule la répartition à partir des compteurs.
///
/// Avec un total nul, tous les pourcentages valent 0. La somme n'est pas forcément
/// exactement 100 : l'arrondi est laissé à l'affichage.
pub fn distribution(stats: &StatsSnapshot) -> Distribution {
    Distribution {
        normal_pct: percent(stats.normal, stats.total),
        suspicious_pct: percent(stats.suspicious, stats.total),
        attack_pct: percent(stats.attacks, stats.total),
    }
}

fn percent(count: u64, total: u64) -> f64 {
    100.0 * count as f64 / total.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_total_yields_zero_percentages() {
        let d = distribution(&StatsSnapshot::default());
        assert_eq!(d, Distribution::default());
        assert!(!d.attack_pct.is_nan());
    }

    #[test]
    fn test_percentages_follow_counts() {
        let d = distribution(&StatsSnapshot::new(102, 2, 0, 100));
        assert!((d.attack_pct - 1.9607).abs() < 1e-3);
        assert!((d.normal_pct - 98.0392).abs() < 1e-3);
        assert_eq!(d.suspicious_pct, 0.0);
    }

    #[test]
    fn test_unclassified_events_leave_sum_below_hundred() {
        let d = distribution(&StatsSnapshot::new(10, 1, 1, 1));
        let sum = d.normal_pct + d.suspicious_pct + d.attack_pct;
        assert!((sum - 30.0).abs() < 1e-9);
    }
}
