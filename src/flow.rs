//! Donation / prediction flow.
//!
//! Donate button -> modal -> validated amount -> payment -> claw cycle ->
//! prediction overlay. The flow does not keep its own countdown for the reveal:
//! it is told when the claw has finished (`complete_cycle`) by whoever routes
//! the sequencer's `CycleComplete` event.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::PREDICTIONS;
use crate::effects::{NoticeKind, Notifier, PaymentWidget};
use crate::error::DonationError;
use crate::host::HostNotifier;
use crate::tier::{DonationTier, resolve_tier};

pub const PAYMENT_SUCCESS_NOTICE: &str = "Платёж успешен! Автомат заработал...";
pub const SAVED_NOTICE: &str = "Предсказание сохранено!";
pub const SAVE_FAILED_NOTICE: &str = "Не удалось сохранить изображение";
pub const EMAIL_SENT_NOTICE: &str = "Отправлено!";
pub const EMAIL_INVALID_NOTICE: &str = "Неверный формат email";
pub const SHARE_UNSUPPORTED_NOTICE: &str = "Поделиться через браузер не поддерживается";
/// Title handed to the platform share sheet.
pub const SHARE_TITLE: &str = "Моё новогоднее предсказание";

/// `local@domain.tld`: one `@`, no whitespace, and a dot inside the domain with
/// text on both sides of it.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.char_indices().any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    pub text: String,
    pub tier: DonationTier,
}

pub struct DonationFlow<H, N> {
    host: H,
    notices: N,
    minimum: u32,
    modal_open: bool,
    donation_amount: u32,
    animating: bool,
    /// Tier captured when the running cycle started.
    cycle_tier: Option<DonationTier>,
    prediction: Option<Prediction>,
}

impl<H: HostNotifier, N: Notifier> DonationFlow<H, N> {
    pub fn new(host: H, notices: N, minimum: u32) -> Self {
        Self {
            host,
            notices,
            minimum,
            modal_open: false,
            donation_amount: 0,
            animating: false,
            cycle_tier: None,
            prediction: None,
        }
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal_open
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn donation_amount(&self) -> u32 {
        self.donation_amount
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        self.prediction.as_ref()
    }

    pub fn minimum(&self) -> u32 {
        self.minimum
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn notices(&self) -> &N {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut N {
        &mut self.notices
    }

    /// Open the donation modal. Ignored while the claw is running.
    pub fn open_modal(&mut self) -> bool {
        if self.animating {
            return false;
        }
        self.modal_open = true;
        true
    }

    pub fn close_modal(&mut self) {
        self.modal_open = false;
    }

    /// Read the leading integer of `raw` the way a number field reports it:
    /// `"250.5"` is 250 and `"300 ₽"` is 300, but text without leading digits
    /// is invalid.
    pub fn parse_amount(&self, raw: &str) -> Result<u32, DonationError> {
        let trimmed = raw.trim();
        let invalid = || DonationError::InvalidAmount { raw: trimmed.to_string(), minimum: self.minimum };
        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(invalid());
        }
        let magnitude = unsigned[..digits]
            .bytes()
            .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add((d - b'0') as i64));
        let value = if negative { -magnitude } else { magnitude };
        if value < self.minimum as i64 {
            return Err(DonationError::BelowMinimum {
                amount: value.clamp(0, u32::MAX as i64) as u32,
                minimum: self.minimum,
            });
        }
        Ok(value.min(u32::MAX as i64) as u32)
    }

    /// Validate `raw` and charge it. On success the flow is animating and the
    /// confirmed amount is returned; on any error a notice is shown and nothing
    /// else changes.
    pub fn submit<P: PaymentWidget + ?Sized>(&mut self, raw: &str, payment: &mut P) -> Result<u32, DonationError> {
        if self.animating {
            return Err(DonationError::PaymentFailed { reason: "a cycle is already running".into() });
        }
        let amount = match self.parse_amount(raw) {
            Ok(amount) => amount,
            Err(err) => {
                self.reject(&err);
                return Err(err);
            }
        };
        match payment.charge(amount) {
            Ok(confirmed) => {
                self.payment_succeeded(confirmed);
                Ok(confirmed)
            }
            Err(err) => {
                self.payment_failed(&err);
                Err(err)
            }
        }
    }

    /// Success callback of the payment widget.
    pub fn payment_succeeded(&mut self, amount: u32) -> DonationTier {
        let tier = resolve_tier(amount);
        crate::log::info(&format!("payment confirmed: {amount} ({tier})"));
        self.modal_open = false;
        self.donation_amount = amount;
        self.animating = true;
        self.cycle_tier = Some(tier);
        self.prediction = None;
        self.notices.notify(NoticeKind::Success, PAYMENT_SUCCESS_NOTICE);
        self.host.request_scroll_to_machine();
        tier
    }

    /// Failure callback of the payment widget. The cycle never starts.
    pub fn payment_failed(&mut self, err: &DonationError) {
        self.reject(err);
    }

    fn reject(&mut self, err: &DonationError) {
        crate::log::warn(&format!("donation rejected: {err}"));
        if let Some(text) = err.notice() {
            self.notices.notify(NoticeKind::Error, &text);
        }
    }

    /// The claw finished its cycle: draw a prediction and reveal it.
    /// Stray completions (no cycle running) are ignored.
    pub fn complete_cycle<R: Rng + ?Sized>(&mut self, tier: DonationTier, rng: &mut R) -> Option<&Prediction> {
        if !self.animating {
            return None;
        }
        let tier = self.cycle_tier.take().unwrap_or(tier);
        let text = PREDICTIONS.choose(rng).copied().unwrap_or_default();
        crate::log::info(&format!("prediction revealed for tier {tier}"));
        self.animating = false;
        self.prediction = Some(Prediction { text: text.to_string(), tier });
        self.host.notify_overlay_open();
        self.prediction.as_ref()
    }

    /// External cancellation of a running cycle.
    pub fn abort(&mut self) {
        self.animating = false;
        self.cycle_tier = None;
    }

    pub fn dismiss_prediction(&mut self) -> bool {
        if self.prediction.take().is_some() {
            self.host.notify_overlay_close();
            true
        } else {
            false
        }
    }

    /// Email entered for the shown prediction. `None` or an empty string means
    /// the visitor cancelled the prompt and nothing is reported.
    pub fn send_prediction_email(&mut self, email: Option<&str>) -> bool {
        let Some(email) = email.filter(|e| !e.is_empty()) else {
            return false;
        };
        if self.prediction.is_none() {
            return false;
        }
        if is_valid_email(email) {
            crate::log::info("prediction sent by email");
            self.notices.notify(NoticeKind::Success, EMAIL_SENT_NOTICE);
            true
        } else {
            self.notices.notify(NoticeKind::Error, EMAIL_INVALID_NOTICE);
            false
        }
    }

    /// Outcome of exporting the prediction card as an image.
    pub fn prediction_saved(&mut self, saved: bool) {
        if saved {
            self.notices.notify(NoticeKind::Success, SAVED_NOTICE);
        } else {
            crate::log::warn("prediction card export failed");
            self.notices.notify(NoticeKind::Error, SAVE_FAILED_NOTICE);
        }
    }

    /// The browser has no share sheet.
    pub fn share_unsupported(&mut self) {
        self.notices.notify(NoticeKind::Info, SHARE_UNSUPPORTED_NOTICE);
    }

    /// Forward a wheel / touch scroll delta to the host while something covers the page.
    pub fn forward_scroll(&mut self, delta_y: f64) {
        if self.prediction.is_some() || self.modal_open {
            self.host.notify_scroll_delta(delta_y);
        }
    }

    pub fn report_height(&mut self, height: u32) {
        self.host.notify_height_changed(height);
    }
}
