use crate::models::observation::MatchResult;
use image::{DynamicImage, RgbImage};
use parking_lot::Mutex;
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Find the best position of `template` inside `frame`.
///
/// Zero-mean normalized cross-correlation summed over the three channels
/// (TM_CCOEFF_NORMED). Every position is scored; flat windows or a flat
/// template score 0. Returns None when the template does not fit.
///
/// The correlation numerator for all positions comes from one frequency
/// domain product, so the cost depends on the frame size only. Window
/// energies come from integral images.
pub fn match_template(frame: &RgbImage, template: &RgbImage) -> Option<MatchResult> {
    let (fw, fh) = frame.dimensions();
    let (tw, th) = template.dimensions();

    if tw == 0 || th == 0 || tw > fw || th > fh {
        return None;
    }

    let n = (tw * th) as f64;

    // Zero-mean template, one plane per channel
    let mut planes = [
        Vec::with_capacity((tw * th) as usize),
        Vec::with_capacity((tw * th) as usize),
        Vec::with_capacity((tw * th) as usize),
    ];
    for pixel in template.pixels() {
        for c in 0..3 {
            planes[c].push(pixel[c] as f64);
        }
    }
    let mut template_norm = 0.0;
    for plane in planes.iter_mut() {
        let mean = plane.iter().sum::<f64>() / n;
        for v in plane.iter_mut() {
            *v -= mean;
            template_norm += *v * *v;
        }
    }

    let integrals = Integrals::new(frame);
    let numerators = correlate(frame, &planes, tw);
    let stride = fw as usize;

    // Best (score, x) for each row, rows in parallel
    let rows: Vec<(f32, u32)> = (0..=fh - th)
        .into_par_iter()
        .map(|y| {
            let mut best = (f32::MIN, 0u32);
            for x in 0..=fw - tw {
                let numerator = numerators[y as usize * stride + x as usize];
                let window_var = integrals.window_variance(x, y, tw, th, n);
                let denominator = (template_norm * window_var).sqrt();
                let score = if denominator > f64::EPSILON {
                    (numerator / denominator).clamp(-1.0, 1.0) as f32
                } else {
                    0.0
                };

                if score > best.0 {
                    best = (score, x);
                }
            }
            best
        })
        .collect();

    // First maximum in row-major order
    let mut best: Option<MatchResult> = None;
    for (y, (score, x)) in rows.into_iter().enumerate() {
        if best.map_or(true, |b| score > b.score) {
            best = Some(MatchResult {
                score,
                x,
                y: y as u32,
                width: tw,
                height: th,
            });
        }
    }

    best
}

/// `out[y * width + x]` is the sum over the template of
/// `template(tx, ty) * frame(x + tx, y + ty)`, summed over channels.
///
/// Circular correlation at the frame size; entries where the template fits
/// never wrap, the rest are ignored by the caller.
fn correlate(frame: &RgbImage, planes: &[Vec<f64>; 3], tw: u32) -> Vec<f64> {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let tw = tw as usize;

    let mut planner = FftPlanner::<f64>::new();
    let forward = Passes {
        rows: planner.plan_fft_forward(w),
        cols: planner.plan_fft_forward(h),
    };
    let inverse = Passes {
        rows: planner.plan_fft_inverse(w),
        cols: planner.plan_fft_inverse(h),
    };

    let raw = frame.as_raw();
    let mut spectrum = vec![Complex::new(0.0, 0.0); w * h];

    for (c, plane) in planes.iter().enumerate() {
        let channel: Vec<Complex<f64>> = raw
            .iter()
            .skip(c)
            .step_by(3)
            .map(|&v| Complex::new(v as f64, 0.0))
            .collect();

        let mut padded = vec![Complex::new(0.0, 0.0); w * h];
        for (i, &v) in plane.iter().enumerate() {
            padded[(i / tw) * w + i % tw] = Complex::new(v, 0.0);
        }

        let channel = forward.transform(channel, w, h);
        let padded = forward.transform(padded, w, h);

        spectrum
            .par_iter_mut()
            .zip(channel.par_iter())
            .zip(padded.par_iter())
            .for_each(|((s, f), t)| *s += t.conj() * *f);
    }

    let spatial = inverse.untransform(spectrum, w, h);
    let scale = 1.0 / (w * h) as f64;
    spatial.into_iter().map(|v| v.re * scale).collect()
}

/// Row and column plans for one direction of a 2-D FFT
struct Passes {
    rows: Arc<dyn Fft<f64>>,
    cols: Arc<dyn Fft<f64>>,
}

impl Passes {
    /// Row-major `h x w` in, transposed (`w x h`) spectrum out
    fn transform(&self, mut data: Vec<Complex<f64>>, w: usize, h: usize) -> Vec<Complex<f64>> {
        data.par_chunks_mut(w).for_each(|row| self.rows.process(row));
        let mut transposed = transpose(&data, w, h);
        transposed.par_chunks_mut(h).for_each(|col| self.cols.process(col));
        transposed
    }

    /// Transposed spectrum in, row-major `h x w` out (unnormalized)
    fn untransform(&self, mut data: Vec<Complex<f64>>, w: usize, h: usize) -> Vec<Complex<f64>> {
        data.par_chunks_mut(h).for_each(|col| self.cols.process(col));
        let mut restored = transpose(&data, h, w);
        restored.par_chunks_mut(w).for_each(|row| self.rows.process(row));
        restored
    }
}

/// Row-major `rows x cols` to row-major `cols x rows`
fn transpose(data: &[Complex<f64>], cols: usize, rows: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::new(0.0, 0.0); data.len()];
    out.par_chunks_mut(rows).enumerate().for_each(|(x, column)| {
        for (y, slot) in column.iter_mut().enumerate() {
            *slot = data[y * cols + x];
        }
    });
    out
}

/// Per-channel summed-area tables of values and squared values
struct Integrals {
    width: usize,
    sum: [Vec<f64>; 3],
    sq_sum: [Vec<f64>; 3],
}

impl Integrals {
    fn new(frame: &RgbImage) -> Self {
        let (w, h) = (frame.width() as usize, frame.height() as usize);
        let size = (w + 1) * (h + 1);
        let mut sum = [vec![0.0; size], vec![0.0; size], vec![0.0; size]];
        let mut sq_sum = [vec![0.0; size], vec![0.0; size], vec![0.0; size]];

        for y in 0..h {
            for x in 0..w {
                let pixel = frame.get_pixel(x as u32, y as u32);
                let at = (y + 1) * (w + 1) + (x + 1);
                let up = y * (w + 1) + (x + 1);
                let left = (y + 1) * (w + 1) + x;
                let diag = y * (w + 1) + x;
                for c in 0..3 {
                    let v = pixel[c] as f64;
                    sum[c][at] = v + sum[c][up] + sum[c][left] - sum[c][diag];
                    sq_sum[c][at] = v * v + sq_sum[c][up] + sq_sum[c][left] - sq_sum[c][diag];
                }
            }
        }

        Self { width: w, sum, sq_sum }
    }

    fn rect(&self, table: &[f64], x: u32, y: u32, w: u32, h: u32) -> f64 {
        let stride = self.width + 1;
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        table[y1 * stride + x1] - table[y0 * stride + x1] - table[y1 * stride + x0]
            + table[y0 * stride + x0]
    }

    /// Sum over channels of (sum of squares - squared sum / n) for the window
    fn window_variance(&self, x: u32, y: u32, w: u32, h: u32, n: f64) -> f64 {
        let mut total = 0.0;
        for c in 0..3 {
            let s = self.rect(&self.sum[c], x, y, w, h);
            let sq = self.rect(&self.sq_sum[c], x, y, w, h);
            total += sq - s * s / n;
        }
        total.max(0.0)
    }
}

/// Reference images keyed by path, loaded on first use.
///
/// A failed load is remembered as missing and reported once; lookups then
/// behave as "not found" for the rest of the process.
pub struct TemplateLibrary {
    cache: Mutex<HashMap<PathBuf, Option<Arc<RgbImage>>>>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Get a template, loading it on first use (alpha channel dropped)
    pub fn get(&self, path: &Path) -> Option<Arc<RgbImage>> {
        let mut cache = self.cache.lock();
        if let Some(entry) = cache.get(path) {
            return entry.clone();
        }

        let loaded = match image::open(path) {
            Ok(img) => Some(Arc::new(img.to_rgb8())),
            Err(e) => {
                tracing::warn!("Reference image not found at {}: {}", path.display(), e);
                None
            }
        };
        cache.insert(path.to_path_buf(), loaded.clone());
        loaded
    }

    /// Make `image` the cached template for `path`, then persist it.
    ///
    /// The cache is updated even when the write fails, so the running
    /// process keeps using the new reference.
    pub fn store(&self, path: &Path, image: &DynamicImage) -> Result<(), String> {
        self.cache
            .lock()
            .insert(path.to_path_buf(), Some(Arc::new(image.to_rgb8())));

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create template directory: {}", e))?;
        }

        image
            .save(path)
            .map_err(|e| format!("Failed to save template {}: {}", path.display(), e))
    }
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        Self::new()
    }
}
