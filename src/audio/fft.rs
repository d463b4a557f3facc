//! Hanning window and in-place radix-2 FFT.
//!
//! The transform is the iterative Cooley-Tukey form: a bit-reversal
//! permutation followed by butterfly stages whose span doubles each pass.
//! Twiddle factors and the window are computed once per plan.

use std::f64::consts::PI;

/// Symmetric Hanning window of length `n`.
pub fn hanning_window(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| (0.5 - 0.5 * (2.0 * PI * i as f64 / denom).cos()) as f32)
        .collect()
}

/// Precomputed tables for transforms of one size.
#[derive(Debug, Clone)]
pub struct FftPlan {
    size: usize,
    cos: Vec<f32>,
    sin: Vec<f32>,
    window: Vec<f32>,
}

impl FftPlan {
    /// Plan for `size`-point transforms. `size` must be a power of two.
    pub fn new(size: usize) -> Option<Self> {
        if size < 2 || !size.is_power_of_two() {
            return None;
        }
        let half = size / 2;
        let (cos, sin) = (0..half)
            .map(|k| {
                let angle = -2.0 * PI * k as f64 / size as f64;
                (angle.cos() as f32, angle.sin() as f32)
            })
            .unzip();
        Some(Self {
            size,
            cos,
            sin,
            window: hanning_window(size),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn window(&self) -> &[f32] {
        &self.window
    }

    /// Forward transform of `(re, im)` in place.
    ///
    /// Both slices must be exactly `size` long; other lengths are left
    /// untouched.
    pub fn process(&self, re: &mut [f32], im: &mut [f32]) {
        let n = self.size;
        if re.len() != n || im.len() != n {
            return;
        }

        let mut j = 0usize;
        for i in 1..n {
            let mut bit = n >> 1;
            while j & bit != 0 {
                j ^= bit;
                bit >>= 1;
            }
            j |= bit;
            if i < j {
                re.swap(i, j);
                im.swap(i, j);
            }
        }

        let mut span = 2;
        while span <= n {
            let half = span / 2;
            let stride = n / span;
            for start in (0..n).step_by(span) {
                for k in 0..half {
                    let (wr, wi) = (self.cos[k * stride], self.sin[k * stride]);
                    let a = start + k;
                    let b = a + half;
                    let tr = re[b] * wr - im[b] * wi;
                    let ti = re[b] * wi + im[b] * wr;
                    re[b] = re[a] - tr;
                    im[b] = im[a] - ti;
                    re[a] += tr;
                    im[a] += ti;
                }
            }
            span <<= 1;
        }
    }

    /// Window `frame`, transform it, and write the magnitudes of the first
    /// `size / 2` bins into `out`.
    ///
    /// `re` and `im` are scratch buffers of length `size`.
    pub fn magnitudes(&self, frame: &[f32], re: &mut [f32], im: &mut [f32], out: &mut [f32]) {
        for (i, (r, w)) in re.iter_mut().zip(&self.window).enumerate() {
            *r = frame.get(i).copied().unwrap_or(0.0) * w;
        }
        im.iter_mut().for_each(|v| *v = 0.0);
        self.process(re, im);
        for (bin, m) in out.iter_mut().enumerate().take(self.size / 2) {
            *m = (re[bin] * re[bin] + im[bin] * im[bin]).sqrt();
        }
    }
}
