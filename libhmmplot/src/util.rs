#[cfg(test)]
#[ctor::ctor]
fn init_backtrace() {
    color_backtrace::install();
}

/// Shannon entropy in bits of a distribution given as negative natural log
/// probabilities, the on-disk unit of the HMMER3 format.
///
/// A zero probability term contributes nothing to the sum, consistent with
/// the limit of p * log2(p) as p approaches zero.
pub fn entropy_bits(neg_ln_probs: &[f32]) -> f32 {
    -neg_ln_probs
        .iter()
        .map(|&val| (-val).exp())
        .filter(|&p| p > 0.0)
        .map(|p| p * p.log2())
        .sum::<f32>()
}

/// Min-max rescales one attribute across a collection of items into [0, 1].
///
/// Items for which the accessor yields `None` pass through as `None` and do
/// not participate in the min/max. When every participating value is equal
/// the range is taken to be 1, which maps all of them to exactly 0.
pub fn min_max_rescale<T, F>(items: &[T], value_fn: F) -> Vec<Option<f32>>
where
    F: Fn(&T) -> Option<f32>,
{
    let values: Vec<Option<f32>> = items.iter().map(value_fn).collect();

    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    values.iter().flatten().for_each(|&val| {
        min = min.min(val);
        max = max.max(val);
    });

    let range = if max != min { max - min } else { 1.0 };

    values
        .iter()
        .map(|opt| opt.map(|val| (val - min) / range))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LN_4: f32 = 1.3862944;

    #[test]
    fn test_entropy_uniform() {
        // a uniform 4-symbol distribution carries exactly 2 bits
        let entropy = entropy_bits(&[LN_4, LN_4, LN_4, LN_4]);
        assert!((entropy - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_entropy_bounds() {
        let rows = [
            vec![0.01005, 4.60517, 6.90776, 6.90776],
            vec![0.69315, 0.69315, f32::INFINITY, f32::INFINITY],
            vec![LN_4; 4],
        ];

        for row in rows {
            let entropy = entropy_bits(&row);
            assert!(entropy >= 0.0);
            assert!(entropy <= 2.0 + 1e-5);
        }
    }

    #[test]
    fn test_entropy_certain_outcome_is_zero() {
        // one probability of 1 and the rest 0 must give exactly 0 bits
        let entropy = entropy_bits(&[0.0, f32::INFINITY, f32::INFINITY, f32::INFINITY]);
        assert_eq!(entropy, 0.0);
    }

    #[test]
    fn test_entropy_zero_probability_is_not_nan() {
        let entropy = entropy_bits(&[0.69315, 0.69315, f32::INFINITY]);
        assert!(!entropy.is_nan());
        assert!((entropy - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_rescale() {
        let values = [Some(1.0f32), Some(3.0), Some(2.0)];
        let rescaled = min_max_rescale(&values, |v| *v);
        assert_eq!(rescaled, vec![Some(0.0), Some(1.0), Some(0.5)]);
    }

    #[test]
    fn test_rescale_shift_invariance() {
        let values = [Some(1.25f32), Some(3.75), Some(2.5), None];
        let shifted: Vec<Option<f32>> = values.iter().map(|v| v.map(|x| x + 10.5)).collect();

        let a = min_max_rescale(&values, |v| *v);
        let b = min_max_rescale(&shifted, |v| *v);

        a.iter().zip(&b).for_each(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => assert!((x - y).abs() < 1e-5),
            (None, None) => {}
            _ => panic!("shift changed the missing-value pattern"),
        });
    }

    #[test]
    fn test_rescale_degenerate_range() {
        // all-equal inputs map to exactly 0, not 0.5
        let values = [Some(2.0f32), Some(2.0), Some(2.0)];
        let rescaled = min_max_rescale(&values, |v| *v);
        assert_eq!(rescaled, vec![Some(0.0); 3]);

        let single = [Some(7.0f32)];
        assert_eq!(min_max_rescale(&single, |v| *v), vec![Some(0.0)]);
    }

    #[test]
    fn test_rescale_missing_values_pass_through() {
        let values = [None, Some(0.0f32), Some(10.0)];
        let rescaled = min_max_rescale(&values, |v| *v);
        assert_eq!(rescaled, vec![None, Some(0.0), Some(1.0)]);
    }

    #[test]
    fn test_rescale_all_missing() {
        let values: [Option<f32>; 2] = [None, None];
        let rescaled = min_max_rescale(&values, |v| *v);
        assert_eq!(rescaled, vec![None, None]);
    }
}
