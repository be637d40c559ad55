#![allow(missing_docs)]

//! Camera panel state.
//!
//! Only the control state lives here: the stream URL, whether playback is
//! running, live or paused, and the record/maximize toggles. Decoding the
//! stream is up to the frontend.

use std::time::Duration;

use tracing::{debug, warn};

use crate::signal::{Observer, Signal};

/// How long a freshly set stream stays in `Loading` before the panel
/// assumes it is playing.
pub const CAMERA_LOADING_GRACE: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraState {
    Idle,
    Loading,
    Playing,
    Paused,
    Error(String),
}

impl CameraState {
    pub fn label(&self) -> &str {
        match self {
            CameraState::Idle => "idle",
            CameraState::Loading => "loading",
            CameraState::Playing => "playing",
            CameraState::Paused => "paused",
            CameraState::Error(message) => message,
        }
    }
}

#[derive(Debug)]
pub struct CameraPanel {
    url: Signal<String>,
    state: Signal<CameraState>,
    live: Signal<bool>,
    recording: Signal<bool>,
    maximized: Signal<bool>,
}

impl CameraPanel {
    pub fn new() -> Self {
        Self {
            url: Signal::new(String::new()),
            state: Signal::new(CameraState::Idle),
            live: Signal::new(true),
            recording: Signal::new(false),
            maximized: Signal::new(false),
        }
    }

    /// Point the panel at a stream. Returns `true` when loading started and
    /// the owner should call [`CameraPanel::finish_loading`] after
    /// [`CAMERA_LOADING_GRACE`].
    pub fn set_url(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        let loading = !url.trim().is_empty();
        if loading {
            debug!(%url, "camera stream loading");
            self.state.set(CameraState::Loading);
        } else {
            warn!("camera URL is empty");
            self.state.set(CameraState::Idle);
        }
        self.url.set(url);
        loading
    }

    pub fn finish_loading(&mut self) -> bool {
        if self.state() != CameraState::Loading {
            return false;
        }
        self.play();
        true
    }

    pub fn play(&mut self) {
        self.state.set(CameraState::Playing);
        self.live.set(true);
    }

    pub fn pause(&mut self) {
        self.state.set(CameraState::Paused);
        self.live.set(false);
    }

    pub fn toggle_play_pause(&mut self) {
        match self.state() {
            CameraState::Playing => self.pause(),
            CameraState::Paused | CameraState::Idle => self.play(),
            CameraState::Loading | CameraState::Error(_) => {}
        }
    }

    pub fn toggle_recording(&mut self) {
        self.recording.update(|recording| {
            *recording = !*recording;
            true
        });
    }

    pub fn rewind(&mut self) {
        self.live.set(false);
    }

    pub fn go_to_live(&mut self) {
        self.live.set(true);
    }

    pub fn on_error(&mut self, message: impl Into<String>) {
        self.state.set(CameraState::Error(message.into()));
    }

    pub fn on_ready(&mut self) {
        self.state.set(CameraState::Playing);
    }

    pub fn toggle_maximize(&mut self) {
        self.maximized.update(|maximized| {
            *maximized = !*maximized;
            true
        });
    }

    pub fn url(&self) -> String {
        self.url.get()
    }

    pub fn state(&self) -> CameraState {
        self.state.get()
    }

    pub fn is_live(&self) -> bool {
        self.live.get()
    }

    pub fn is_recording(&self) -> bool {
        self.recording.get()
    }

    pub fn is_maximized(&self) -> bool {
        self.maximized.get()
    }

    pub fn observe_state(&self) -> Observer<CameraState> {
        self.state.observe()
    }
}

impl Default for CameraPanel {
    fn default() -> Self {
        Self::new()
    }
}
