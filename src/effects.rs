//! Side-effect ports used by the donation flow: visitor notices, sound effects
//! and the payment widget, with their browser implementations.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlAudioElement, HtmlElement};

use crate::error::DonationError;

// --- Notices -----------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

pub trait Notifier {
    fn notify(&mut self, kind: NoticeKind, text: &str);
}

const TOAST_ID: &str = "cw-toast";
const TOAST_VISIBLE_MS: f64 = 3200.0;

/// Fixed-position toast line at the bottom of the page. One notice at a time;
/// `expire` is driven by the animation loop.
pub struct DomToast {
    el: HtmlElement,
    shown_at: Option<f64>,
}

impl DomToast {
    pub fn mount(doc: &Document) -> Result<Self, JsValue> {
        let el: HtmlElement = match doc.get_element_by_id(TOAST_ID) {
            Some(el) => el.dyn_into()?,
            None => {
                let el: HtmlElement = doc.create_element("div")?.dyn_into()?;
                el.set_id(TOAST_ID);
                let body = doc.body().ok_or_else(|| JsValue::from_str("no body"))?;
                body.append_child(&el)?;
                el
            }
        };
        let toast = Self { el, shown_at: None };
        toast.apply_style("#222", false);
        Ok(toast)
    }

    pub fn expire(&mut self, now: f64) {
        if let Some(at) = self.shown_at {
            if now - at >= TOAST_VISIBLE_MS {
                self.shown_at = None;
                self.apply_style("#222", false);
            }
        }
    }

    fn apply_style(&self, accent: &str, visible: bool) {
        let style = format!(
            "position:fixed; left:50%; bottom:24px; transform:translateX(-50%); max-width:90vw; padding:10px 18px; border-radius:10px; background:rgba(16,16,20,0.94); color:#fff; border:2px solid {accent}; font:15px system-ui, sans-serif; z-index:80; transition:opacity 0.25s ease; pointer-events:none; opacity:{};",
            if visible { 1 } else { 0 }
        );
        self.el.set_attribute("style", &style).ok();
    }
}

impl Notifier for DomToast {
    fn notify(&mut self, kind: NoticeKind, text: &str) {
        let accent = match kind {
            NoticeKind::Success => "hsl(140, 60%, 45%)",
            NoticeKind::Error => "hsl(0, 80%, 55%)",
            NoticeKind::Info => "hsl(330, 70%, 63%)",
        };
        self.el.set_text_content(Some(text));
        self.apply_style(accent, true);
        self.shown_at = Some(crate::web::performance_now());
    }
}

// --- Sound -------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sound {
    PaymentSuccess,
    Grab,
}

pub trait SoundPlayer {
    /// Fire and forget. Playback failures must never reach the caller.
    fn play(&mut self, sound: Sound);
}

pub struct HtmlSoundPlayer {
    enabled: bool,
    grab_url: String,
    success_url: String,
}

impl HtmlSoundPlayer {
    pub fn new(enabled: bool, grab_url: String, success_url: String) -> Self {
        Self { enabled, grab_url, success_url }
    }
}

impl SoundPlayer for HtmlSoundPlayer {
    fn play(&mut self, sound: Sound) {
        if !self.enabled {
            return;
        }
        let url = match sound {
            Sound::PaymentSuccess => &self.success_url,
            Sound::Grab => &self.grab_url,
        };
        let Ok(audio) = HtmlAudioElement::new_with_src(url) else {
            crate::log::warn(&format!("audio element unavailable for {url}"));
            return;
        };
        match audio.play() {
            Ok(promise) => {
                // Autoplay policies reject the promise; swallow it.
                let ignore = Closure::<dyn FnMut(JsValue)>::new(|_err: JsValue| {});
                let _ = promise.catch(&ignore);
                ignore.forget();
            }
            Err(_) => crate::log::warn(&format!("could not play {url}")),
        }
    }
}

// --- Payment -----------------------------------------------------------------

pub trait PaymentWidget {
    /// Charge `amount`; on success returns the confirmed amount.
    fn charge(&mut self, amount: u32) -> Result<u32, DonationError>;
}

/// Stand-in for the real payment provider: every validated charge succeeds.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimulatedPayment;

impl PaymentWidget for SimulatedPayment {
    fn charge(&mut self, amount: u32) -> Result<u32, DonationError> {
        Ok(amount)
    }
}
