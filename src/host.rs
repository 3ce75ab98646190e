//! Host page port.
//!
//! The microsite runs inside an iframe of a page builder. It tells the parent
//! page about overlays, content height and scroll intent through `postMessage`.
//! Nothing ever comes back, so the port is fire-and-forget.

use serde::Serialize;
use wasm_bindgen::JsValue;
use web_sys::Window;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum HostMessage {
    #[serde(rename = "APP_OVERLAY_OPEN")]
    OverlayOpen,
    #[serde(rename = "APP_OVERLAY_CLOSE")]
    OverlayClose,
    #[serde(rename = "APP_SCROLL_TO_MACHINE")]
    ScrollToMachine,
    #[serde(rename = "APP_IFRAME_HEIGHT")]
    HeightChanged { height: u32 },
    #[serde(rename = "APP_SCROLL_DELTA")]
    ScrollDelta {
        #[serde(rename = "deltaY")]
        delta_y: f64,
    },
}

impl HostMessage {
    pub fn to_json(&self) -> String {
        // Plain enums of numbers and strings always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Structured-clone friendly JS object for `postMessage`.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        js_sys::JSON::parse(&self.to_json())
    }
}

pub trait HostNotifier {
    fn post(&mut self, message: HostMessage);

    fn notify_overlay_open(&mut self) {
        self.post(HostMessage::OverlayOpen);
    }

    fn notify_overlay_close(&mut self) {
        self.post(HostMessage::OverlayClose);
    }

    fn request_scroll_to_machine(&mut self) {
        self.post(HostMessage::ScrollToMachine);
    }

    fn notify_height_changed(&mut self, height: u32) {
        self.post(HostMessage::HeightChanged { height });
    }

    fn notify_scroll_delta(&mut self, delta_y: f64) {
        self.post(HostMessage::ScrollDelta { delta_y });
    }
}

/// Posts to `window.parent` when the page is framed; silent otherwise.
pub struct ParentFrameNotifier {
    parent: Option<Window>,
    last_height: Option<u32>,
}

impl ParentFrameNotifier {
    pub fn new(win: &Window) -> Self {
        let parent = win
            .parent()
            .ok()
            .flatten()
            .filter(|p| !js_sys::Object::is(p.as_ref(), win.as_ref()));
        Self { parent, last_height: None }
    }

    pub fn is_embedded(&self) -> bool {
        self.parent.is_some()
    }
}

impl HostNotifier for ParentFrameNotifier {
    fn post(&mut self, message: HostMessage) {
        let Some(parent) = &self.parent else {
            return;
        };
        if let HostMessage::HeightChanged { height } = message {
            if self.last_height == Some(height) {
                return;
            }
            self.last_height = Some(height);
        }
        match message.to_js() {
            Ok(value) => {
                if parent.post_message(&value, "*").is_err() {
                    crate::log::warn("host postMessage rejected");
                }
            }
            Err(_) => crate::log::warn("could not encode host message"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        assert_eq!(HostMessage::OverlayOpen.to_json(), r#"{"type":"APP_OVERLAY_OPEN"}"#);
        assert_eq!(HostMessage::OverlayClose.to_json(), r#"{"type":"APP_OVERLAY_CLOSE"}"#);
        assert_eq!(HostMessage::ScrollToMachine.to_json(), r#"{"type":"APP_SCROLL_TO_MACHINE"}"#);
        assert_eq!(
            HostMessage::HeightChanged { height: 1840 }.to_json(),
            r#"{"type":"APP_IFRAME_HEIGHT","height":1840}"#
        );
        assert_eq!(
            HostMessage::ScrollDelta { delta_y: -12.5 }.to_json(),
            r#"{"type":"APP_SCROLL_DELTA","deltaY":-12.5}"#
        );
    }

    struct Recorder(Vec<HostMessage>);

    impl HostNotifier for Recorder {
        fn post(&mut self, message: HostMessage) {
            self.0.push(message);
        }
    }

    #[test]
    fn test_default_helpers_route_through_post() {
        let mut r = Recorder(Vec::new());
        r.notify_overlay_open();
        r.notify_scroll_delta(3.0);
        r.notify_height_changed(900);
        r.request_scroll_to_machine();
        r.notify_overlay_close();
        assert_eq!(
            r.0,
            vec![
                HostMessage::OverlayOpen,
                HostMessage::ScrollDelta { delta_y: 3.0 },
                HostMessage::HeightChanged { height: 900 },
                HostMessage::ScrollToMachine,
                HostMessage::OverlayClose,
            ]
        );
    }
}
