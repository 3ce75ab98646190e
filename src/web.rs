//! Browser runtime.
//!
//! Builds the DOM (canvas, donation modal, prediction overlay), installs the
//! event listeners and drives everything from one `requestAnimationFrame`
//! loop. All state lives in a thread-local `Runtime`; listeners and the frame
//! callback borrow it for the duration of one call.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Function, Object, Promise, Reflect};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, HtmlAnchorElement, HtmlCanvasElement, HtmlElement, HtmlInputElement, ScrollBehavior,
    ScrollIntoViewOptions, ScrollLogicalPosition, Window, window,
};

use crate::config::SiteConfig;
use crate::effects::{DomToast, HtmlSoundPlayer, SimulatedPayment};
use crate::host::ParentFrameNotifier;
use crate::flow::{Prediction, SHARE_TITLE};
use crate::machine::paint::{
    CANVAS_HEIGHT, CANVAS_WIDTH, CARD_HEIGHT, CARD_WIDTH, Painter, paint_prediction_card, renderer_for,
};
use crate::site::Microsite;
use crate::tier::DonationTier;

pub type BrowserSite = Microsite<ParentFrameNotifier, DomToast, HtmlSoundPlayer, SimulatedPayment, SmallRng>;

const CANVAS_ID: &str = "cw-canvas";
const DONATE_ID: &str = "cw-donate";
const MODAL_ID: &str = "cw-modal";
const OVERLAY_ID: &str = "cw-prediction";
const TRIPLE_NOTE: &str = "У вас 3 предсказания! (демо: показано 1)";
const SAVE_ID: &str = "cw-save";
const EMAIL_ID: &str = "cw-email";
const SHARE_ID: &str = "cw-share";
const OVERLAY_ACTIONS: [(&str, &str); 3] =
    [(SAVE_ID, "Сохранить"), (EMAIL_ID, "Отправить на почту"), (SHARE_ID, "Поделиться")];
const EMAIL_PROMPT: &str = "Введите ваш email:";
const CARD_FILE_NAME: &str = "prediction.png";

pub fn performance_now() -> f64 {
    window().and_then(|w| w.performance()).map(|p| p.now()).unwrap_or(0.0)
}

struct Dom {
    canvas: HtmlCanvasElement,
    donate: HtmlElement,
    modal: HtmlElement,
    amount: HtmlInputElement,
    pay: HtmlElement,
    overlay: HtmlElement,
    prediction_text: HtmlElement,
    triple_note: HtmlElement,
}

/// What the DOM last showed, so frames only touch elements on change.
#[derive(Default, PartialEq)]
struct Shown {
    modal_open: bool,
    prediction: Option<(String, DonationTier)>,
    animating: bool,
}

struct Runtime {
    site: BrowserSite,
    painter: Painter,
    dom: Dom,
    shown: Shown,
}

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = RefCell::new(None);
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// Run `f` against the live site. Returns `None` before `start` has run.
pub fn with_site<T>(f: impl FnOnce(&mut BrowserSite) -> T) -> Option<T> {
    RUNTIME.with(|cell| cell.borrow_mut().as_mut().map(|rt| f(&mut rt.site)))
}

fn seed_rng(config: &SiteConfig) -> SmallRng {
    if let Some(seed) = config.seed {
        return SmallRng::seed_from_u64(seed);
    }
    let mut buf = [0u8; 8];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => SmallRng::seed_from_u64(u64::from_le_bytes(buf)),
        Err(err) => {
            crate::log::warn(&format!("getrandom failed ({err}); seeding from the clock"));
            SmallRng::seed_from_u64(performance_now().to_bits())
        }
    }
}

pub fn start(config_json: Option<String>) -> Result<(), JsValue> {
    if RUNTIME.with(|cell| cell.borrow().is_some()) {
        crate::log::warn("microsite already started");
        return Ok(());
    }
    let config = SiteConfig::from_json_or_default(config_json.as_deref());
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win.document().ok_or_else(|| JsValue::from_str("no document"))?;

    let canvas = mount_canvas(&doc, &config.mount_id)?;
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into()?;
    let donate = donate_button(&doc, &canvas)?;
    let (modal, amount, pay) = build_modal(&doc, config.default_amount)?;
    let (overlay, prediction_text, triple_note) = build_overlay(&doc)?;

    let host = ParentFrameNotifier::new(&win);
    let embedded = host.is_embedded();
    let site = Microsite::new(
        &config,
        host,
        DomToast::mount(&doc)?,
        HtmlSoundPlayer::new(config.sound_enabled, config.grab_sound_url.clone(), config.success_sound_url.clone()),
        SimulatedPayment,
        seed_rng(&config),
    );
    let painter = Painter::new(ctx, renderer_for(config.render_strategy, &config.asset_base));
    let dom = Dom { canvas, donate, modal, amount, pay, overlay, prediction_text, triple_note };

    install_listeners(&win, &doc, &dom)?;
    RUNTIME.with(|cell| {
        *cell.borrow_mut() = Some(Runtime { site, painter, dom, shown: Shown::default() });
    });
    report_height();
    crate::log::info(&format!(
        "microsite started ({:?} balls, embedded: {embedded})",
        config.render_strategy
    ));
    start_loop();
    Ok(())
}

fn mount_canvas(doc: &Document, mount_id: &str) -> Result<HtmlCanvasElement, JsValue> {
    if let Some(el) = doc.get_element_by_id(CANVAS_ID) {
        return el.dyn_into().map_err(JsValue::from);
    }
    let c: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into()?;
    c.set_id(CANVAS_ID);
    c.set_width(CANVAS_WIDTH);
    c.set_height(CANVAS_HEIGHT);
    c.set_attribute(
        "style",
        "display:block; width:100%; max-width:800px; height:auto; margin:0 auto; border-radius:32px; filter:drop-shadow(0 20px 40px rgba(0,0,0,0.45));",
    )
    .ok();
    match doc.get_element_by_id(mount_id) {
        Some(mount) => mount.append_child(&c)?,
        None => {
            crate::log::warn(&format!("#{mount_id} not found; mounting into <body>"));
            body(doc)?.append_child(&c)?
        }
    };
    Ok(c)
}

fn body(doc: &Document) -> Result<HtmlElement, JsValue> {
    doc.body().ok_or_else(|| JsValue::from_str("no body"))
}

fn element(doc: &Document, tag: &str, style: &str) -> Result<HtmlElement, JsValue> {
    let el: HtmlElement = doc.create_element(tag)?.dyn_into()?;
    el.set_attribute("style", style).ok();
    Ok(el)
}

/// The page may provide its own `#cw-donate`; otherwise one is placed under the canvas.
fn donate_button(doc: &Document, canvas: &HtmlCanvasElement) -> Result<HtmlElement, JsValue> {
    if let Some(el) = doc.get_element_by_id(DONATE_ID) {
        return el.dyn_into().map_err(JsValue::from);
    }
    let btn = element(
        doc,
        "button",
        "display:block; margin:18px auto; padding:14px 40px; border:none; border-radius:999px; background:hsl(330, 70%, 63%); color:#fff; font:bold 20px system-ui, sans-serif; cursor:pointer;",
    )?;
    btn.set_id(DONATE_ID);
    btn.set_text_content(Some("не ждать"));
    match canvas.parent_node() {
        Some(parent) => parent.append_child(&btn)?,
        None => body(doc)?.append_child(&btn)?,
    };
    Ok(btn)
}

fn build_modal(doc: &Document, default_amount: u32) -> Result<(HtmlElement, HtmlInputElement, HtmlElement), JsValue> {
    let modal = element(doc, "div", &backdrop_style(false, 60))?;
    modal.set_id(MODAL_ID);
    let card = element(
        doc,
        "div",
        "width:min(92vw, 420px); padding:24px; border-radius:18px; background:#15151b; color:#f3f3f3; border:2px solid hsl(330, 70%, 63%); font:15px system-ui, sans-serif; position:relative;",
    )?;

    let title = element(doc, "h2", "margin:0 0 6px; font-size:22px;")?;
    title.set_text_content(Some("Сделать донат"));
    let subtitle = element(doc, "p", "margin:0 0 16px; opacity:0.7;")?;
    subtitle.set_text_content(Some("Опустите монетку, чтобы автомат заработал"));
    let label = element(doc, "label", "display:block; margin-bottom:6px;")?;
    label.set_text_content(Some("Сумма доната (₽)"));

    let amount: HtmlInputElement = doc.create_element("input")?.dyn_into()?;
    amount.set_type("number");
    amount.set_id("cw-amount");
    amount.set_value(&default_amount.to_string());
    amount
        .set_attribute(
            "style",
            "width:100%; box-sizing:border-box; padding:10px 12px; font-size:18px; border-radius:10px; border:1px solid #444; background:#0d0d12; color:#fff;",
        )
        .ok();

    let tiers = element(doc, "div", "margin:16px 0; padding:12px; border-radius:10px; background:rgba(255,255,255,0.05); font-size:13px;")?;
    let heading = element(doc, "p", "margin:0 0 6px; font-weight:600;")?;
    heading.set_text_content(Some("Уровни доната:"));
    tiers.append_child(&heading)?;
    for tier in DonationTier::ALL {
        let line = element(doc, "div", "margin:2px 0; opacity:0.8;")?;
        line.set_text_content(Some(&format!("• {}", tier.label())));
        tiers.append_child(&line)?;
    }

    let pay = element(
        doc,
        "button",
        "width:100%; padding:14px; border:none; border-radius:10px; background:hsl(330, 70%, 63%); color:#fff; font:bold 18px system-ui, sans-serif; cursor:pointer;",
    )?;
    pay.set_id("cw-pay");
    pay.set_text_content(Some(&pay_label(&amount.value())));

    let close = close_button(doc)?;
    close.set_id("cw-modal-close");

    for child in [&close, &title, &subtitle, &label] {
        card.append_child(child)?;
    }
    card.append_child(&amount)?;
    card.append_child(&tiers)?;
    card.append_child(&pay)?;
    modal.append_child(&card)?;
    body(doc)?.append_child(&modal)?;
    Ok((modal, amount, pay))
}

fn build_overlay(doc: &Document) -> Result<(HtmlElement, HtmlElement, HtmlElement), JsValue> {
    let overlay = element(doc, "div", &backdrop_style(false, 70))?;
    overlay.set_id(OVERLAY_ID);
    let card = element(
        doc,
        "div",
        "width:min(92vw, 460px); padding:32px 24px; border-radius:24px; text-align:center; background:linear-gradient(160deg, hsl(219, 77%, 18%), #0d0d12); color:#fff; border:2px solid hsl(64, 73%, 48%); font:16px system-ui, sans-serif; position:relative;",
    )?;
    let title = element(doc, "h2", "margin:0 0 18px; font-size:24px; color:hsl(64, 73%, 60%);")?;
    title.set_text_content(Some("Твоё новогоднее предсказание"));
    let text = element(doc, "p", "margin:0 0 22px; font-size:22px; line-height:1.35;")?;
    text.set_id("cw-prediction-text");
    let footer = element(doc, "p", "margin:0; font-size:13px; opacity:0.6;")?;
    footer.set_text_content(Some("Фонд «Игра» • Детство не ждёт"));
    let note = element(doc, "p", "margin:14px 0 0; font-size:13px; color:hsl(12, 100%, 65%); display:none;")?;
    note.set_text_content(Some(TRIPLE_NOTE));
    let close = close_button(doc)?;
    close.set_id("cw-prediction-close");
    let actions = element(doc, "div", "display:flex; flex-wrap:wrap; gap:8px; justify-content:center; margin:0 0 18px;")?;
    for (id, label) in OVERLAY_ACTIONS {
        let btn = element(
            doc,
            "button",
            "padding:8px 14px; border:1px solid hsla(330, 70%, 63%, 0.6); border-radius:999px; background:rgba(255,255,255,0.06); color:#fff; font:14px system-ui, sans-serif; cursor:pointer;",
        )?;
        btn.set_id(id);
        btn.set_text_content(Some(label));
        actions.append_child(&btn)?;
    }

    for child in [&close, &title, &text, &actions, &footer, &note] {
        card.append_child(child)?;
    }
    overlay.append_child(&card)?;
    body(doc)?.append_child(&overlay)?;
    Ok((overlay, text, note))
}

fn close_button(doc: &Document) -> Result<HtmlElement, JsValue> {
    let close = element(
        doc,
        "button",
        "position:absolute; top:10px; right:12px; border:none; background:none; color:#aaa; font-size:22px; cursor:pointer;",
    )?;
    close.set_text_content(Some("✕"));
    Ok(close)
}

fn backdrop_style(visible: bool, z: u32) -> String {
    format!(
        "position:fixed; inset:0; display:{}; align-items:center; justify-content:center; background:rgba(0,0,0,0.72); z-index:{z}; overscroll-behavior:contain;",
        if visible { "flex" } else { "none" }
    )
}

fn pay_label(raw: &str) -> String {
    format!("Оплатить {} ₽", raw.trim())
}

fn on_click(target: &HtmlElement, mut f: impl FnMut() + 'static) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(move |_evt: web_sys::MouseEvent| f()) as Box<dyn FnMut(_)>);
    target.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn install_listeners(win: &Window, doc: &Document, dom: &Dom) -> Result<(), JsValue> {
    on_click(&dom.donate, || {
        with_site(|site| site.open_donation());
    })?;

    for id in ["cw-modal-close", "cw-prediction-close"] {
        let btn: Option<HtmlElement> = doc.get_element_by_id(id).and_then(|el| el.dyn_into().ok());
        if let Some(btn) = btn {
            on_click(&btn, || {
                with_site(|site| {
                    if !site.dismiss_prediction() {
                        site.close_donation();
                    }
                });
            })?;
        }
    }

    {
        let input = dom.amount.clone();
        on_click(&dom.pay, move || {
            let raw = input.value();
            let started = with_site(|site| site.submit_donation(&raw, performance_now()).is_ok()).unwrap_or(false);
            if started {
                scroll_machine_into_view();
            }
        })?;
    }

    {
        let input = dom.amount.clone();
        let pay = dom.pay.clone();
        let closure = Closure::wrap(Box::new(move |_evt: web_sys::Event| {
            pay.set_text_content(Some(&pay_label(&input.value())));
        }) as Box<dyn FnMut(_)>);
        dom.amount.add_event_listener_with_callback("input", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Scroll intent is forwarded to the host while the modal or overlay covers the page.
    for target in [&dom.modal, &dom.overlay] {
        let closure = Closure::wrap(Box::new(move |evt: web_sys::WheelEvent| {
            with_site(|site| site.forward_scroll(evt.delta_y()));
        }) as Box<dyn FnMut(_)>);
        target.add_event_listener_with_callback("wheel", closure.as_ref().unchecked_ref())?;
        closure.forget();

        let last_y: Rc<Cell<Option<f64>>> = Rc::new(Cell::new(None));
        let moved = last_y.clone();
        let closure = Closure::wrap(Box::new(move |evt: web_sys::TouchEvent| {
            let Some(touch) = evt.touches().get(0) else {
                return;
            };
            let y = touch.client_y() as f64;
            if let Some(prev) = moved.replace(Some(y)) {
                with_site(|site| site.forward_scroll(prev - y));
            }
        }) as Box<dyn FnMut(_)>);
        target.add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref())?;
        closure.forget();

        let closure = Closure::wrap(Box::new(move |_evt: web_sys::TouchEvent| last_y.set(None)) as Box<dyn FnMut(_)>);
        target.add_event_listener_with_callback("touchend", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    install_overlay_actions(doc)?;

    let closure = Closure::wrap(Box::new(move |_evt: web_sys::Event| report_height()) as Box<dyn FnMut(_)>);
    win.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn install_overlay_actions(doc: &Document) -> Result<(), JsValue> {
    let button = |id: &str| -> Result<HtmlElement, JsValue> {
        doc.get_element_by_id(id)
            .ok_or_else(|| JsValue::from_str(&format!("missing #{id}")))?
            .dyn_into()
            .map_err(JsValue::from)
    };

    on_click(&button(SAVE_ID)?, || {
        let Some(prediction) = with_site(|site| site.prediction().cloned()).flatten() else {
            return;
        };
        let saved = match save_prediction_card(&prediction) {
            Ok(()) => true,
            Err(err) => {
                crate::log::warn(&format!("saving prediction card failed: {err:?}"));
                false
            }
        };
        with_site(|site| site.prediction_saved(saved));
    })?;

    on_click(&button(EMAIL_ID)?, || {
        // The prompt blocks, so it runs outside the runtime borrow.
        let email = window().and_then(|w| w.prompt_with_message(EMAIL_PROMPT).ok().flatten());
        with_site(|site| site.send_prediction_email(email.as_deref()));
    })?;

    on_click(&button(SHARE_ID)?, || {
        let Some(prediction) = with_site(|site| site.prediction().cloned()).flatten() else {
            return;
        };
        match share_prediction(&prediction) {
            Ok(true) => {}
            Ok(false) => {
                with_site(|site| site.share_unsupported());
            }
            Err(err) => crate::log::warn(&format!("share failed: {err:?}")),
        }
    })?;
    Ok(())
}

/// Render the card offscreen and hand it to the browser as a download.
fn save_prediction_card(prediction: &Prediction) -> Result<(), JsValue> {
    let doc = window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into()?;
    canvas.set_width(CARD_WIDTH);
    canvas.set_height(CARD_HEIGHT);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;
    paint_prediction_card(&ctx, prediction)?;

    let link: HtmlAnchorElement = doc.create_element("a")?.dyn_into()?;
    link.set_download(CARD_FILE_NAME);
    link.set_href(&canvas.to_data_url()?);
    link.click();
    Ok(())
}

/// Hand the prediction to the Web Share API. `Ok(false)` when the browser has none.
fn share_prediction(prediction: &Prediction) -> Result<bool, JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let navigator = win.navigator();
    let share = Reflect::get(&navigator, &JsValue::from_str("share"))?;
    let Some(share) = share.dyn_ref::<Function>() else {
        return Ok(false);
    };

    let data = Object::new();
    Reflect::set(&data, &JsValue::from_str("title"), &JsValue::from_str(SHARE_TITLE))?;
    Reflect::set(&data, &JsValue::from_str("text"), &JsValue::from_str(&prediction.text))?;
    Reflect::set(&data, &JsValue::from_str("url"), &JsValue::from_str(&win.location().href()?))?;

    let promise: Promise = share.call1(&navigator, &data)?.dyn_into()?;
    let cancelled = Closure::wrap(Box::new(move |err: JsValue| {
        crate::log::info(&format!("share cancelled: {err:?}"));
    }) as Box<dyn FnMut(_)>);
    let _ = promise.catch(&cancelled);
    cancelled.forget();
    Ok(true)
}

fn content_height() -> Option<u32> {
    let doc = window()?.document()?;
    let root = doc.document_element()?;
    let body_height = doc.body().map(|b| b.scroll_height()).unwrap_or(0);
    Some(root.scroll_height().max(body_height).max(0) as u32)
}

pub fn report_height() {
    if let Some(height) = content_height() {
        with_site(|site| site.report_height(height));
    }
}

pub fn scroll_machine_into_view() {
    let canvas = window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(CANVAS_ID));
    if let Some(canvas) = canvas {
        let opts = ScrollIntoViewOptions::new();
        opts.set_behavior(ScrollBehavior::Smooth);
        opts.set_block(ScrollLogicalPosition::Center);
        canvas.scroll_into_view_with_scroll_into_view_options(&opts);
    }
}

fn start_loop() {
    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        let layout_changed = RUNTIME.with(|cell| match cell.borrow_mut().as_mut() {
            Some(rt) => frame(rt, ts),
            None => false,
        });
        if layout_changed {
            report_height();
        }
        request_frame(&f);
    }) as Box<dyn FnMut(f64)>));
    request_frame(&g);
}

fn request_frame(f: &FrameCallback) {
    if let (Some(w), Some(cb)) = (window(), f.borrow().as_ref()) {
        let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
    }
}

/// One animation frame. Returns true when an overlay was shown or hidden.
fn frame(rt: &mut Runtime, now: f64) -> bool {
    rt.site.tick(now);
    rt.site.flow_mut().notices_mut().expire(now);
    let scene = rt.site.scene();
    if let Err(err) = rt.painter.paint(&scene, now) {
        crate::log::warn(&format!("paint failed: {err:?}"));
    }
    sync_dom(rt)
}

fn sync_dom(rt: &mut Runtime) -> bool {
    let flow = rt.site.flow();
    let next = Shown {
        modal_open: flow.is_modal_open(),
        prediction: flow.prediction().map(|p| (p.text.clone(), p.tier)),
        animating: flow.is_animating(),
    };
    if next == rt.shown {
        return false;
    }
    let dom = &rt.dom;
    let layout_changed = next.modal_open != rt.shown.modal_open || next.prediction != rt.shown.prediction;
    dom.modal.set_attribute("style", &backdrop_style(next.modal_open, 60)).ok();
    dom.overlay.set_attribute("style", &backdrop_style(next.prediction.is_some(), 70)).ok();
    if let Some((text, tier)) = &next.prediction {
        dom.prediction_text.set_text_content(Some(text));
        let display = if *tier == DonationTier::GiantTriple { "block" } else { "none" };
        dom.triple_note.style().set_property("display", display).ok();
    }
    dom.donate.style().set_property("opacity", if next.animating { "0.5" } else { "1" }).ok();
    dom.donate
        .style()
        .set_property("pointer-events", if next.animating { "none" } else { "auto" })
        .ok();
    dom.canvas.set_title(if next.animating { "Автомат работает..." } else { "" });
    rt.shown = next;
    layout_changed
}
