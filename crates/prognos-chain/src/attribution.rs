use crate::estimator::Attribution;

/// Names of the `k` features with the largest absolute attribution.
///
/// Ordering is by descending magnitude; ties keep input order. Returns fewer
/// than `k` names when fewer attributions are given.
#[must_use]
pub fn top_k_factors(attributions: &[Attribution], k: usize) -> Vec<String> {
    let mut ranked: Vec<&Attribution> = attributions.iter().collect();
    ranked.sort_by(|a, b| b.score.abs().total_cmp(&a.score.abs()));
    ranked
        .into_iter()
        .take(k)
        .map(|a| a.feature.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(feature: &str, score: f64) -> Attribution {
        Attribution {
            feature: feature.to_string(),
            score,
        }
    }

    #[test]
    fn ranks_by_magnitude() {
        let attrs = [attr("a", 0.1), attr("b", -0.9), attr("c", 0.5), attr("d", 0.0)];
        assert_eq!(top_k_factors(&attrs, 3), vec!["b", "c", "a"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let attrs = [attr("x", 0.3), attr("y", -0.3), attr("z", 0.3)];
        assert_eq!(top_k_factors(&attrs, 2), vec!["x", "y"]);
    }

    #[test]
    fn fewer_features_than_k() {
        let attrs = [attr("only", 1.0)];
        assert_eq!(top_k_factors(&attrs, 3), vec!["only"]);
        assert!(top_k_factors(&[], 3).is_empty());
    }
}
