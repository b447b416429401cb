//! Prototype lowpass windows and the per-phase weight table.
//!
//! A quality preset names an embedded sinc-windowed prototype lowpass,
//! sampled offline at `density` points per unit tap spacing. At query time
//! the weight for a phase offset and tap index is linearly interpolated
//! between stored window samples; with memoization enabled the weights for
//! every phase that can occur under the running rate pair are precomputed
//! once and the hot path becomes a table lookup.

use crate::error::{Error, Result};
use crate::gcd;
use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

/// Built-in filter quality presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    /// Two-tap triangle window. Preview/test quality only.
    Linear,
    /// Shortest windowed sinc; fastest, lowest stopband rejection.
    KaiserFastest,
    /// Mid-length windowed sinc; the default speed/quality tradeoff.
    #[default]
    KaiserFast,
    /// Longest windowed sinc; best stopband rejection.
    KaiserBest,
}

impl Quality {
    /// Get all presets.
    pub fn all() -> &'static [Quality] {
        &[
            Quality::Linear,
            Quality::KaiserFastest,
            Quality::KaiserFast,
            Quality::KaiserBest,
        ]
    }

    /// Preset name as accepted by [`Quality::from_str`].
    pub const fn name(&self) -> &'static str {
        match self {
            Quality::Linear => "linear",
            Quality::KaiserFastest => "kaiser_fastest",
            Quality::KaiserFast => "kaiser_fast",
            Quality::KaiserBest => "kaiser_best",
        }
    }

    /// Parse a preset name such as `"kaiser_fast"`.
    pub fn from_str(s: &str) -> Option<Quality> {
        match s.to_lowercase().as_str() {
            "linear" => Some(Quality::Linear),
            "kaiser_fastest" => Some(Quality::KaiserFastest),
            "kaiser_fast" => Some(Quality::KaiserFast),
            "kaiser_best" => Some(Quality::KaiserBest),
            _ => None,
        }
    }

    const fn profile(&self) -> &'static FilterProfile {
        match self {
            Quality::Linear => &LINEAR,
            Quality::KaiserFastest => &KAISER_FASTEST,
            Quality::KaiserFast => &KAISER_FAST,
            Quality::KaiserBest => &KAISER_BEST,
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Immutable descriptor of one embedded prototype window.
#[derive(Debug, Clone, Copy)]
struct FilterProfile {
    /// Resource path of the little-endian f64 blob.
    path: &'static str,
    /// Expected number of window samples in the blob.
    length: usize,
    /// Window samples per unit tap spacing.
    density: usize,
    /// Whether the window amplitude participates in anti-alias scaling.
    is_scaled: bool,
}

const LINEAR: FilterProfile = FilterProfile {
    path: "filters/linear_f64",
    length: 2,
    density: 1,
    is_scaled: false,
};

const KAISER_FASTEST: FilterProfile = FilterProfile {
    path: "filters/kaiser_fastest_f64",
    length: 385,
    density: 32,
    is_scaled: true,
};

const KAISER_FAST: FilterProfile = FilterProfile {
    path: "filters/kaiser_fast_f64",
    length: 12289,
    density: 512,
    is_scaled: true,
};

const KAISER_BEST: FilterProfile = FilterProfile {
    path: "filters/kaiser_best_f64",
    length: 409601,
    density: 8192,
    is_scaled: true,
};

/// Look up an embedded filter resource by path.
fn resource(path: &str) -> Option<&'static [u8]> {
    match path {
        "filters/linear_f64" => Some(include_bytes!("../filters/linear_f64")),
        "filters/kaiser_fastest_f64" => Some(include_bytes!("../filters/kaiser_fastest_f64")),
        "filters/kaiser_fast_f64" => Some(include_bytes!("../filters/kaiser_fast_f64")),
        "filters/kaiser_best_f64" => Some(include_bytes!("../filters/kaiser_best_f64")),
        _ => None,
    }
}

/// The prototype window with its rate-adjusted scale, plus the optional
/// per-phase weight cache for the running rate pair.
///
/// `interp_win` and `interp_delta` are read-only after construction and
/// remain available even when the cache is materialized, so arbitrary
/// offset queries keep working.
#[derive(Debug)]
pub(crate) struct FilterTable {
    interp_win: Vec<f64>,
    interp_delta: Vec<f64>,
    density: usize,
    /// Unit taps one wing covers at scale 1.
    crossings: usize,
    /// Anti-aliasing narrowing factor: `min(1, out_rate/in_rate)` for
    /// scaled profiles, 1.0 otherwise.
    scale: f64,
    /// One weight row per phase in `[0, out_rate/gcd)`; empty when
    /// memoization is disabled.
    offset_wins: Vec<Vec<f64>>,
}

impl FilterTable {
    /// Load the preset's window, apply the anti-alias scale and, when
    /// `memoize` is set, materialize the per-phase cache for the rate pair.
    pub fn new(quality: Quality, in_rate: u32, out_rate: u32, memoize: bool) -> Result<Self> {
        let profile = quality.profile();
        let raw = resource(profile.path).ok_or(Error::FilterResource {
            path: profile.path,
            expected: profile.length,
            actual: 0,
        })?;
        let actual = raw.len() / 8;
        if actual != profile.length {
            return Err(Error::FilterResource {
                path: profile.path,
                expected: profile.length,
                actual,
            });
        }

        let scale = if profile.is_scaled {
            (out_rate as f64 / in_rate as f64).min(1.0)
        } else {
            1.0
        };

        let mut interp_win = vec![0.0; profile.length];
        LittleEndian::read_f64_into(raw, &mut interp_win);
        for w in &mut interp_win {
            *w *= scale;
        }

        let mut interp_delta = vec![0.0; profile.length];
        for i in 0..profile.length - 1 {
            interp_delta[i] = interp_win[i + 1] - interp_win[i];
        }

        let mut table = Self {
            interp_win,
            interp_delta,
            density: profile.density,
            crossings: profile.length / profile.density,
            scale,
            offset_wins: Vec::new(),
        };
        if memoize {
            table.precompute(in_rate, out_rate);
        }
        Ok(table)
    }

    /// Number of input frames one wing covers from phase offset `offset`.
    pub fn wing_length(&self, offset: f64) -> usize {
        (self.crossings as f64 / self.scale - offset) as usize
    }

    /// Interpolated window weight at phase offset `offset`, tap `index`.
    ///
    /// Callers keep `index < wing_length(offset)`, which bounds the window
    /// position below the stored length.
    pub fn value(&self, offset: f64, index: usize) -> f64 {
        let position = (offset + index as f64) * self.scale * self.density as f64;
        let sample = position as usize;
        let frac = position - sample as f64;
        self.interp_win[sample] + frac * self.interp_delta[sample]
    }

    /// Number of distinct phases in the cache; 0 when memoization is off.
    pub fn phases(&self) -> usize {
        self.offset_wins.len()
    }

    /// The cached weight row for phase index `phase`.
    pub fn phase_row(&self, phase: usize) -> &[f64] {
        &self.offset_wins[phase]
    }

    /// Whether the per-phase cache is populated.
    pub fn is_memoized(&self) -> bool {
        !self.offset_wins.is_empty()
    }

    /// Materialize one weight row per phase that can occur under the rate
    /// pair: `offset_wins[p][i] = value(frac(p * in/out), i)`.
    fn precompute(&mut self, in_rate: u32, out_rate: u32) {
        let phases = (out_rate / gcd(in_rate, out_rate)) as usize;
        let mut rows = Vec::with_capacity(phases);
        for p in 0..phases {
            // Exact rational remainder; frac(p * in/out) in f64 would
            // drift for large products.
            let offset =
                ((p as u64 * in_rate as u64) % out_rate as u64) as f64 / out_rate as f64;
            let wing = self.wing_length(offset);
            rows.push((0..wing).map(|i| self.value(offset, i)).collect::<Vec<f64>>());
        }

        let bytes: usize = rows.iter().map(|r| r.len() * 8).sum();
        debug!(phases, bytes, "materialized polyphase weight cache");
        self.offset_wins = rows;
    }
}
