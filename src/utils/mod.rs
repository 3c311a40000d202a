/// Closed enumerations for truth origins and histogram channels.
pub mod enums;
/// The pure kinematic/angular transform shared by the reco and gen paths.
pub mod variables;
/// Three- and four-vector helpers built on [`nalgebra`].
pub mod vectors;

/// A helper method to get histogram edges from evenly-spaced `bins` over a
/// given `range`.
///
/// # See Also
/// [`bin_index`]
pub fn bin_edges(bins: usize, range: (f64, f64)) -> Vec<f64> {
    let bin_width = (range.1 - range.0) / (bins as f64);
    (0..=bins)
        .map(|i| range.0 + (i as f64 * bin_width))
        .collect()
}

/// A helper method to obtain the index of a bin where a value should go in a
/// histogram with evenly spaced `bins` over a given `range`. Returns [`None`]
/// if the value lies outside the range.
///
/// # See Also
/// [`bin_edges`]
pub fn bin_index(value: f64, bins: usize, limits: (f64, f64)) -> Option<usize> {
    if value >= limits.0 && value < limits.1 {
        let bin_width = (limits.1 - limits.0) / bins as f64;
        let index = ((value - limits.0) / bin_width).floor() as usize;
        Some(index.min(bins - 1))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binning() {
        assert_eq!(bin_index(0.0, 3, (0.0, 1.0)), Some(0));
        assert_eq!(bin_index(0.1, 3, (0.0, 1.0)), Some(0));
        assert_eq!(bin_index(0.5, 3, (0.0, 1.0)), Some(1));
        assert_eq!(bin_index(0.9, 3, (0.0, 1.0)), Some(2));
        assert_eq!(bin_index(1.0, 3, (0.0, 1.0)), None);
        assert_eq!(bin_index(2.0, 3, (0.0, 1.0)), None);
        assert_eq!(bin_index(-0.1, 3, (0.0, 1.0)), None);
        assert_eq!(bin_edges(4, (0.0, 2.0)), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }
}
