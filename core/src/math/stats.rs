pub struct StatsHelper;

impl StatsHelper {
    pub fn sum_squares(samples: &[f64]) -> f64 {
        samples.iter().map(|&v| v * v).sum()
    }

    /// Largest absolute value; NaN if any sample is NaN, 0 for an empty slice.
    pub fn max_abs<I>(samples: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        samples.into_iter().fold(0.0_f64, |acc, v| {
            if acc.is_nan() || v.is_nan() {
                f64::NAN
            } else {
                acc.max(v.abs())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_squares_of_empty_slice_is_zero() {
        assert_eq!(StatsHelper::sum_squares(&[]), 0.0);
        assert_eq!(StatsHelper::sum_squares(&[3.0, -4.0]), 25.0);
    }

    #[test]
    fn max_abs_picks_largest_magnitude() {
        assert_eq!(StatsHelper::max_abs([1.0, -7.5, 3.0]), 7.5);
        assert_eq!(StatsHelper::max_abs(Vec::<f64>::new()), 0.0);
    }

    #[test]
    fn max_abs_propagates_nan() {
        assert!(StatsHelper::max_abs([1.0, f64::NAN, 3.0]).is_nan());
    }
}
