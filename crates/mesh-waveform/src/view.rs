//! Shared viewport and playback state
//!
//! [`WaveformView`] owns everything every renderer of one deck needs to
//! agree on: the deck's position controls, the published track, the zoom
//! and the view geometry. Once per frame it is read into an immutable
//! [`WaveformFrame`] which the engine hands to every renderer by reference.
//!
//! Coordinates: renderers work along two axes. *Length* is the time axis,
//! *breadth* the amplitude axis. [`WaveformFrame::point`] maps them to
//! surface pixels for the configured orientation.

use std::time::{Duration, Instant};

use basedrop::Shared;

use crate::controls::{items, ConfigKey, ControlProxy, ControlRegistry};
use crate::settings::{VisualGain, WaveformSettings};
use crate::track::{TrackSlot, TrackWaveform};
use crate::types::{Orientation, PositionSource};

/// Viewport and playback provider for one deck
pub struct WaveformView {
    group: String,
    play_position: ControlProxy,
    slip_position: ControlProxy,
    slip_enabled: ControlProxy,
    track: TrackSlot,
    zoom: f64,
    play_marker_position: f64,
    length: f32,
    breadth: f32,
    device_pixel_ratio: f32,
    orientation: Orientation,
    gain: VisualGain,
    started: Instant,
}

impl WaveformView {
    pub fn new(
        group: &str,
        registry: &ControlRegistry,
        track: TrackSlot,
        settings: &WaveformSettings,
    ) -> Self {
        let control = |item: &str| registry.proxy_or_create(&ConfigKey::new(group, item), 0.0);
        Self {
            group: group.to_string(),
            play_position: control(items::PLAY_POSITION),
            slip_position: control(items::SLIP_POSITION),
            slip_enabled: control(items::SLIP_ENABLED),
            track,
            zoom: settings.display.default_zoom,
            play_marker_position: settings.display.play_marker_position.clamp(0.0, 1.0),
            length: 0.0,
            breadth: 0.0,
            device_pixel_ratio: 1.0,
            orientation: settings.display.orientation,
            gain: settings.gain,
            started: Instant::now(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn track(&self) -> &TrackSlot {
        &self.track
    }

    /// Update the geometry from a surface size in device-independent pixels
    pub fn resize(&mut self, width: f32, height: f32, device_pixel_ratio: f32) {
        let (length, breadth) = match self.orientation {
            Orientation::Horizontal => (width, height),
            Orientation::Vertical => (height, width),
        };
        self.length = length.max(0.0);
        self.breadth = breadth.max(0.0);
        if device_pixel_ratio > 0.0 && device_pixel_ratio.is_finite() {
            self.device_pixel_ratio = device_pixel_ratio;
        }
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn breadth(&self) -> f32 {
        self.breadth
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Visual samples per device-independent pixel
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    pub fn set_play_marker_position(&mut self, position: f64) {
        self.play_marker_position = position.clamp(0.0, 1.0);
    }

    /// Read all cross-thread state for one frame
    pub fn snapshot(&self) -> WaveformFrame {
        let play = self.play_position.get();
        let slip = self.slip_position.get();
        let slip_enabled = self.slip_enabled.to_bool();
        WaveformFrame {
            track: self.track.current(),
            positions: [play, slip],
            slip_enabled,
            slip_active: slip_enabled && slip != play,
            zoom: self.zoom,
            play_marker_position: self.play_marker_position,
            length: self.length,
            breadth: self.breadth,
            device_pixel_ratio: self.device_pixel_ratio,
            orientation: self.orientation,
            gain: self.gain,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Immutable per-frame view state
#[derive(Clone)]
pub struct WaveformFrame {
    pub track: Shared<Option<TrackWaveform>>,
    /// Play and slip positions as track fractions, indexed by [`PositionSource::index`]
    pub positions: [f64; 2],
    pub slip_enabled: bool,
    /// Slip is enabled and the slip position has diverged from the play position
    pub slip_active: bool,
    pub zoom: f64,
    pub play_marker_position: f64,
    pub length: f32,
    pub breadth: f32,
    pub device_pixel_ratio: f32,
    pub orientation: Orientation,
    pub gain: VisualGain,
    /// Time since the view was created, for animations
    pub elapsed: Duration,
}

impl WaveformFrame {
    /// Loaded track, if any
    pub fn track(&self) -> Option<&TrackWaveform> {
        (*self.track).as_ref()
    }

    /// Whether nothing but the background can be drawn this frame
    pub fn should_only_draw_background(&self) -> bool {
        let has_data = self.track().is_some_and(|track| !track.is_empty());
        !has_data || self.length <= 0.0 || self.breadth <= 0.0 || self.zoom <= 0.0
    }

    pub fn position(&self, source: PositionSource) -> f64 {
        self.positions[source.index()]
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }

    /// Visual sample index at the start of the view (may be negative)
    pub fn first_visual_index(&self, source: PositionSource) -> f64 {
        let Some(track) = self.track() else {
            return 0.0;
        };
        let marker = self.play_marker_position * self.length as f64 * self.zoom;
        track.fraction_to_visual(self.position(source)) - marker
    }

    /// Visual samples covered by the whole view length
    pub fn visible_visual_samples(&self) -> f64 {
        self.length as f64 * self.zoom
    }

    /// Length coordinate of a visual sample index
    pub fn visual_index_to_x(&self, index: f64, source: PositionSource) -> f32 {
        if self.zoom <= 0.0 {
            return 0.0;
        }
        ((index - self.first_visual_index(source)) / self.zoom) as f32
    }

    /// Length coordinate of a track fraction
    pub fn fraction_to_x(&self, fraction: f64, source: PositionSource) -> f32 {
        let Some(track) = self.track() else {
            return 0.0;
        };
        self.visual_index_to_x(track.fraction_to_visual(fraction), source)
    }

    /// Length coordinate of an audio frame
    pub fn sample_to_x(&self, sample: u64, source: PositionSource) -> f32 {
        let Some(track) = self.track() else {
            return 0.0;
        };
        self.fraction_to_x(track.sample_to_fraction(sample), source)
    }

    /// Track fractions at the start and end of the view
    pub fn visible_fraction_range(&self, source: PositionSource) -> (f64, f64) {
        let Some(track) = self.track().filter(|track| track.visual_len() > 0) else {
            return (0.0, 0.0);
        };
        let first = self.first_visual_index(source);
        let len = track.visual_len() as f64;
        (first / len, (first + self.visible_visual_samples()) / len)
    }

    /// Length coordinate of the play marker
    pub fn play_marker_x(&self) -> f32 {
        (self.play_marker_position * self.length as f64) as f32
    }

    /// Breadth band `(start, end)` a position source draws into
    ///
    /// With slip active the play waveform takes the first half and the slip
    /// waveform the second. Without it the slip source draws nothing.
    pub fn lane(&self, source: PositionSource) -> Option<(f32, f32)> {
        let half = self.breadth / 2.0;
        match (source, self.slip_active) {
            (PositionSource::Play, false) => Some((0.0, self.breadth)),
            (PositionSource::Play, true) => Some((0.0, half)),
            (PositionSource::Slip, true) => Some((half, self.breadth)),
            (PositionSource::Slip, false) => None,
        }
    }

    /// Map (length, breadth) to surface pixels
    #[inline]
    pub fn point(&self, along: f32, across: f32) -> (f32, f32) {
        match self.orientation {
            Orientation::Horizontal => (along, across),
            Orientation::Vertical => (across, along),
        }
    }
}
