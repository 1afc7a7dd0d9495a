// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Gaussian smoothing along the time axis.

use ndarray::prelude::*;

/// A discrete Gaussian kernel with the given standard deviation \[samples\],
/// truncated at 4 sigma (radius `floor(4 sigma + 0.5)`) and normalised to
/// unit sum.
pub(crate) fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma + 0.5) as isize;
    let two_sigma2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|i| (-((i * i) as f64) / two_sigma2).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// Map an out-of-bounds index back into `0..n` by reflecting about the array
/// edges, i.e. (d c b a | a b c d | d c b a).
fn reflect(mut i: isize, n: isize) -> usize {
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - 1 - i;
        } else {
            return i as usize;
        }
    }
}

/// Convolve every column of `input` with `kernel` along the first (time)
/// axis, reflecting the signal at both ends. Accumulation is in f64.
pub(crate) fn filter_time(input: ArrayView2<f32>, kernel: &[f64]) -> Array2<f32> {
    let num_times = input.len_of(Axis(0)) as isize;
    let radius = (kernel.len() / 2) as isize;
    let mut out = Array2::zeros(input.raw_dim());
    for ((t, p), out_elem) in out.indexed_iter_mut() {
        let mut acc = 0.0;
        for (j, &k) in kernel.iter().enumerate() {
            let src = reflect(t as isize + j as isize - radius, num_times);
            acc += k * f64::from(input[(src, p)]);
        }
        *out_elem = acc as f32;
    }
    out
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn kernel_is_normalised_and_symmetric() {
        for sigma in [0.5, 1.0, 3.7, 31.6] {
            let kernel = gaussian_kernel(sigma);
            let radius = (4.0 * sigma + 0.5) as usize;
            assert_eq!(kernel.len(), 2 * radius + 1);
            assert_abs_diff_eq!(kernel.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            for i in 0..radius {
                assert_abs_diff_eq!(kernel[i], kernel[kernel.len() - 1 - i], epsilon = 1e-15);
            }
            // The peak is in the middle.
            assert!(kernel[radius] >= kernel[0]);
        }
    }

    #[test]
    fn tiny_sigma_is_the_identity() {
        // Radius floor(4*0.1 + 0.5) = 0; a single-tap kernel.
        let kernel = gaussian_kernel(0.1);
        assert_eq!(kernel.len(), 1);
        let input = array![[1.0_f32, -2.0], [3.0, 4.0], [0.5, 0.0]];
        let out = filter_time(input.view(), &kernel);
        assert_abs_diff_eq!(out, input, epsilon = 0.0);
    }

    #[test]
    fn constant_signal_is_preserved() {
        let kernel = gaussian_kernel(2.0);
        let input = Array2::from_elem((16, 3), 5.0_f32);
        let out = filter_time(input.view(), &kernel);
        for &v in &out {
            assert_abs_diff_eq!(v, 5.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn interior_impulse_keeps_its_mass() {
        // The kernel support lies entirely within the array, so no tap is
        // lost and none is double-counted.
        let mut input = Array2::zeros((20, 1));
        input[(10, 0)] = 1.0_f32;
        let out = filter_time(input.view(), &gaussian_kernel(1.5));
        assert_abs_diff_eq!(out.sum(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn short_signal_with_wide_kernel_stays_bounded() {
        // The kernel radius exceeds the signal length; reflection must keep
        // indexing valid and the output within the input's range.
        let input = array![[0.0_f32], [1.0], [0.0], [0.0]];
        let out = filter_time(input.view(), &gaussian_kernel(3.0));
        for &v in &out {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn smoothing_reduces_variance() {
        let input = Array2::from_shape_fn((64, 1), |(t, _)| if t % 2 == 0 { 1.0 } else { -1.0 });
        let out = filter_time(input.view(), &gaussian_kernel(2.0));
        let var = |a: &Array2<f32>| {
            let mean = a.mean().unwrap();
            a.mapv(|v| (v - mean).powi(2)).mean().unwrap()
        };
        assert!(var(&out) < var(&input) / 10.0);
    }
}
