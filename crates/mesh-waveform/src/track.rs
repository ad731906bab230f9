//! Analyzed waveform data of a loaded track
//!
//! The analyzer reduces a track to a summary of "visual samples": one
//! column per fixed block of audio, holding the peak amplitude of the full
//! signal and of three frequency bands, per channel. Stem tracks carry an
//! extra per-stem amplitude per column.
//!
//! Loaded data is published to the view through [`TrackSlot`]. The loader
//! swaps a new `Shared<_>` in, the render thread takes a cheap clone per
//! frame, and the old data is freed on the GC thread.

use std::ops::Range;
use std::sync::Arc;

use basedrop::{Shared, SharedCell};

use crate::gc::gc_handle;

/// Number of stems in a stem track (Vocals, Drums, Bass, Other)
pub const NUM_STEMS: usize = 4;

/// Peak amplitudes of one column and channel, 0-255
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaveformSample {
    pub all: u8,
    pub low: u8,
    pub mid: u8,
    pub high: u8,
}

impl WaveformSample {
    pub const fn new(all: u8, low: u8, mid: u8, high: u8) -> Self {
        Self { all, low, mid, high }
    }

    /// Per-band maximum of two samples
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self {
            all: self.all.max(other.all),
            low: self.low.max(other.low),
            mid: self.mid.max(other.mid),
            high: self.high.max(other.high),
        }
    }
}

/// Waveform summary of a track
#[derive(Debug, Clone, Default)]
pub struct TrackWaveform {
    /// Audio sample rate of the source
    pub sample_rate: u32,
    /// Length of the track in audio frames
    pub total_samples: u64,
    /// Visual samples as `[left, right]`
    pub visual: Vec<[WaveformSample; 2]>,
    /// Beat grid in audio frames
    pub beats: Vec<u64>,
    /// Per-stem amplitude per visual sample, for stem tracks
    pub stems: Option<Vec<[u8; NUM_STEMS]>>,
}

impl TrackWaveform {
    /// Number of visual samples
    pub fn visual_len(&self) -> usize {
        self.visual.len()
    }

    /// True when there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.visual.is_empty() || self.total_samples == 0
    }

    pub fn has_stems(&self) -> bool {
        self.stems.as_ref().is_some_and(|stems| !stems.is_empty())
    }

    /// Track length in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.total_samples as f64 / self.sample_rate as f64
    }

    /// Visual samples per second of audio
    pub fn visual_rate(&self) -> f64 {
        let duration = self.duration_seconds();
        if duration <= 0.0 {
            return 0.0;
        }
        self.visual.len() as f64 / duration
    }

    /// Position of an audio frame as a fraction of the track
    pub fn sample_to_fraction(&self, sample: u64) -> f64 {
        if self.total_samples == 0 {
            return 0.0;
        }
        sample as f64 / self.total_samples as f64
    }

    /// Visual sample index (fractional) of a track fraction
    pub fn fraction_to_visual(&self, fraction: f64) -> f64 {
        fraction * self.visual.len() as f64
    }

    /// Per-band peak over a range of visual samples, clipped to the data
    ///
    /// Returns `None` when the range holds no data (before the start or
    /// past the end of the track).
    pub fn peak(&self, range: Range<isize>) -> Option<[WaveformSample; 2]> {
        let range = self.clip(range)?;
        self.visual[range]
            .iter()
            .copied()
            .reduce(|a, b| [a[0].max(b[0]), a[1].max(b[1])])
    }

    /// Per-stem peak over a range of visual samples
    pub fn stem_peak(&self, range: Range<isize>) -> Option<[u8; NUM_STEMS]> {
        let stems = self.stems.as_ref()?;
        let range = self.clip(range)?;
        let end = range.end.min(stems.len());
        if range.start >= end {
            return None;
        }
        stems[range.start..end].iter().copied().reduce(|mut acc, stem| {
            for (a, s) in acc.iter_mut().zip(stem) {
                *a = (*a).max(s);
            }
            acc
        })
    }

    fn clip(&self, range: Range<isize>) -> Option<Range<usize>> {
        let len = self.visual.len() as isize;
        let start = range.start.max(0);
        // Every column covers at least one visual sample
        let end = range.end.max(range.start + 1).min(len);
        (start < end).then(|| start as usize..end as usize)
    }
}

/// Published waveform of the track on one deck
///
/// Cloning shares the same slot.
#[derive(Clone)]
pub struct TrackSlot {
    cell: Arc<SharedCell<Option<TrackWaveform>>>,
}

impl Default for TrackSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackSlot {
    /// Empty slot (no track loaded)
    pub fn new() -> Self {
        Self {
            cell: Arc::new(SharedCell::new(Shared::new(&gc_handle(), None))),
        }
    }

    /// Publish a newly analyzed track
    pub fn load(&self, waveform: TrackWaveform) {
        log::debug!(
            "TrackSlot: loaded waveform ({} visual samples, {} beats, stems: {})",
            waveform.visual_len(),
            waveform.beats.len(),
            waveform.has_stems()
        );
        self.cell.set(Shared::new(&gc_handle(), Some(waveform)));
    }

    /// Remove the current track
    pub fn unload(&self) {
        self.cell.set(Shared::new(&gc_handle(), None));
    }

    /// Current track data, kept alive for as long as the returned pointer
    pub fn current(&self) -> Shared<Option<TrackWaveform>> {
        self.cell.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Synthetic track: a ramp over `columns` visual samples, one beat
    /// every `beat_every` columns
    pub(crate) fn ramp_track(columns: usize, beat_every: usize) -> TrackWaveform {
        let sample_rate = 44_100;
        let frames_per_column = 441;
        let visual = (0..columns)
            .map(|i| {
                let v = (i % 256) as u8;
                [
                    WaveformSample::new(v, v / 2, v / 3, v / 4),
                    WaveformSample::new(v / 2, v / 4, v / 6, v / 8),
                ]
            })
            .collect();
        let beats = (0..columns)
            .step_by(beat_every.max(1))
            .map(|i| (i * frames_per_column) as u64)
            .collect();
        TrackWaveform {
            sample_rate,
            total_samples: (columns * frames_per_column) as u64,
            visual,
            beats,
            stems: None,
        }
    }

    #[test]
    fn test_peak_takes_band_maximum() {
        let track = ramp_track(10, 4);
        let peak = track.peak(2..5).expect("in range");
        assert_eq!(peak[0].all, 4);
        assert_eq!(peak[1].all, 2);
    }

    #[test]
    fn test_peak_outside_track_is_none() {
        let track = ramp_track(10, 4);
        assert!(track.peak(-5..0).is_none());
        assert!(track.peak(10..12).is_none());
        // Partially overlapping ranges are clipped
        assert_eq!(track.peak(-3..1).map(|p| p[0].all), Some(0));
    }

    #[test]
    fn test_empty_range_still_covers_one_sample() {
        let track = ramp_track(10, 4);
        assert_eq!(track.peak(3..3).map(|p| p[0].all), Some(3));
    }

    #[test]
    fn test_timing() {
        let track = ramp_track(100, 4);
        assert!((track.duration_seconds() - 1.0).abs() < 1e-9);
        assert!((track.visual_rate() - 100.0).abs() < 1e-9);
        assert!((track.sample_to_fraction(22_050) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_stem_peak() {
        let mut track = ramp_track(4, 4);
        track.stems = Some(vec![[1, 2, 3, 4], [4, 3, 2, 1], [0, 0, 0, 0], [9, 9, 9, 9]]);
        assert!(track.has_stems());
        assert_eq!(track.stem_peak(0..2), Some([4, 3, 3, 4]));
        assert_eq!(track.stem_peak(5..6), None);
    }

    #[test]
    fn test_slot_load_and_unload() {
        let slot = TrackSlot::new();
        assert!(!slot.is_loaded());

        slot.load(ramp_track(8, 4));
        let view_side = slot.clone();
        assert!(view_side.is_loaded());
        let held = view_side.current();

        slot.unload();
        assert!(!slot.is_loaded());
        // A reader keeps its snapshot alive
        assert_eq!((*held).as_ref().map(|t| t.visual_len()), Some(8));
    }
}
