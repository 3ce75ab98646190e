//! Canvas painter for a claw machine `Scene`.
//!
//! The canvas is a fixed 800x600 logical surface (CSS scales it). The display
//! case sits at (70, 90)-(730, 470); scene coordinates are percentages of it.
//! Claw sprites are drawn in a 0..100 box, the same as the SVG claw artwork,
//! scaled to the tier's claw size.

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};

use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use crate::config::join_asset_url;
use crate::flow::Prediction;
use crate::machine::scene::{ClawSprite, Scene, Sway};
use crate::machine::sequencer::ClawPosition;
use crate::population::{BallStyle, RenderStrategy};
use crate::tier::DonationTier;

pub const CANVAS_WIDTH: u32 = 800;
pub const CANVAS_HEIGHT: u32 = 600;

const CASE_X: f64 = 70.0;
const CASE_Y: f64 = 90.0;
const CASE_W: f64 = 660.0;
const CASE_H: f64 = 380.0;

const ACCENT: &str = "hsl(330, 70%, 63%)";
const ORANGE: &str = "hsl(12, 100%, 50%)";
/// Exponential time constant of the claw easing. Four of them, about 1s,
/// bring a move to within 2% of its target.
const EASE_TIME_CONSTANT_MS: f64 = 250.0;
/// A claw move counts as settled once this much time has passed.
pub const EASE_SETTLE_MS: f64 = 4.0 * EASE_TIME_CONSTANT_MS;
const WARNING_SIGN: &str = "НЕ ТРОГАТЬ! ЭТО НА НОВЫЙ ГОД";

/// Case percentage -> canvas pixels.
pub fn case_point(x_pct: f64, y_pct: f64) -> (f64, f64) {
    (CASE_X + CASE_W * x_pct / 100.0, CASE_Y + CASE_H * y_pct / 100.0)
}

// --- Ball renderers ----------------------------------------------------------

/// Draws one ball centred on the current origin. Callers translate/rotate first.
pub trait BallRenderer {
    fn draw(&mut self, ctx: &CanvasRenderingContext2d, style: &BallStyle, radius: f64) -> Result<(), JsValue>;
}

pub fn renderer_for(strategy: RenderStrategy, asset_base: &str) -> Box<dyn BallRenderer> {
    match strategy {
        RenderStrategy::Vector => Box::new(VectorBallRenderer),
        RenderStrategy::Image => Box::new(ImageBallRenderer::new(asset_base)),
    }
}

/// Gradient sphere with a specular highlight and two faint texture bands.
pub struct VectorBallRenderer;

impl VectorBallRenderer {
    const FALLBACK_COLOR: &'static str = "hsl(330, 70%, 63%)";
}

impl BallRenderer for VectorBallRenderer {
    fn draw(&mut self, ctx: &CanvasRenderingContext2d, style: &BallStyle, radius: f64) -> Result<(), JsValue> {
        let color = match style {
            BallStyle::Color(c) => *c,
            BallStyle::Image(_) => Self::FALLBACK_COLOR,
        };
        ctx.set_shadow_color("rgba(0,0,0,0.3)");
        ctx.set_shadow_blur(8.0);
        ctx.set_shadow_offset_y(4.0);
        ctx.begin_path();
        ctx.arc(0.0, 0.0, radius, 0.0, TAU)?;
        ctx.set_fill_style_str(color);
        ctx.fill();
        ctx.set_shadow_blur(0.0);
        ctx.set_shadow_offset_y(0.0);
        ctx.set_line_width(1.5);
        ctx.set_stroke_style_str(color);
        ctx.stroke();

        let hx = -0.3 * radius;
        let highlight = ctx.create_radial_gradient(hx, hx, 0.0, hx, hx, radius * 0.4)?;
        highlight.add_color_stop(0.0, "rgba(255,255,255,0.6)")?;
        highlight.add_color_stop(0.3, "rgba(255,255,255,0.3)")?;
        highlight.add_color_stop(1.0, "rgba(255,255,255,0)")?;
        ctx.begin_path();
        ctx.arc(hx, hx, radius * 0.4, 0.0, TAU)?;
        ctx.set_fill_style_canvas_gradient(&highlight);
        ctx.fill();

        ctx.set_global_alpha(0.3);
        ctx.set_line_width(0.5);
        for band in [-0.4, 0.4] {
            ctx.begin_path();
            ctx.ellipse(0.0, band * radius, radius * 0.8, radius * 0.2, 0.0, 0.0, TAU)?;
            ctx.stroke();
        }
        ctx.set_global_alpha(1.0);
        Ok(())
    }
}

/// Bitmap balls. Images load lazily; until one is ready the ball is drawn as a
/// neutral vector sphere so nothing pops out of existence.
pub struct ImageBallRenderer {
    asset_base: String,
    images: HashMap<&'static str, HtmlImageElement>,
    fallback: VectorBallRenderer,
}

impl ImageBallRenderer {
    pub fn new(asset_base: &str) -> Self {
        Self { asset_base: asset_base.to_string(), images: HashMap::new(), fallback: VectorBallRenderer }
    }

    fn image(&mut self, path: &'static str) -> Option<&HtmlImageElement> {
        if !self.images.contains_key(path) {
            match HtmlImageElement::new() {
                Ok(img) => {
                    img.set_src(&join_asset_url(&self.asset_base, path));
                    self.images.insert(path, img);
                }
                Err(_) => {
                    crate::log::warn(&format!("could not create image for {path}"));
                    return None;
                }
            }
        }
        self.images.get(path)
    }
}

impl BallRenderer for ImageBallRenderer {
    fn draw(&mut self, ctx: &CanvasRenderingContext2d, style: &BallStyle, radius: f64) -> Result<(), JsValue> {
        if let BallStyle::Image(path) = style {
            if let Some(img) = self.image(*path) {
                if img.complete() && img.natural_width() > 0 {
                    let d = radius * 2.0;
                    return ctx.draw_image_with_html_image_element_and_dw_and_dh(img, -radius, -radius, d, d);
                }
            }
        }
        self.fallback.draw(ctx, style, radius)
    }
}

// --- Painter -----------------------------------------------------------------

pub struct Painter {
    ctx: CanvasRenderingContext2d,
    balls: Box<dyn BallRenderer>,
    /// Eased on-screen claw positions (case percent), one per claw sprite.
    shown: Vec<ClawPosition>,
    last_frame_ms: Option<f64>,
}

impl Painter {
    pub fn new(ctx: CanvasRenderingContext2d, balls: Box<dyn BallRenderer>) -> Self {
        Self { ctx, balls, shown: Vec::new(), last_frame_ms: None }
    }

    pub fn paint(&mut self, scene: &Scene, now: f64) -> Result<(), JsValue> {
        self.ease_claws(scene, now);
        let ctx = &self.ctx;
        ctx.clear_rect(0.0, 0.0, CANVAS_WIDTH as f64, CANVAS_HEIGHT as f64);
        draw_frame(ctx)?;
        draw_lights(ctx, scene.active, now)?;

        ctx.save();
        rounded_rect(ctx, CASE_X, CASE_Y, CASE_W, CASE_H, 28.0);
        ctx.clip();
        draw_case_background(ctx);
        for ball in &scene.balls {
            let (bx, by) = case_point(ball.x, ball.y);
            ctx.save();
            ctx.translate(bx, by)?;
            ctx.rotate(ball.rotation.to_radians())?;
            self.balls.draw(ctx, &ball.style, ball.diameter_px / 2.0)?;
            ctx.restore();
        }
        draw_glass(ctx)?;
        draw_chute(ctx);
        for (claw, pos) in scene.claws.iter().zip(self.shown.iter()) {
            draw_claw(ctx, self.balls.as_mut(), claw, *pos, now)?;
        }
        ctx.restore();

        draw_warning_sign(ctx, scene.active, now)?;
        Ok(())
    }

    fn ease_claws(&mut self, scene: &Scene, now: f64) {
        let dt = self.last_frame_ms.map(|t| (now - t).clamp(0.0, 100.0)).unwrap_or(0.0);
        self.last_frame_ms = Some(now);
        if self.shown.len() != scene.claws.len() {
            self.shown = scene.claws.iter().map(|c| ClawPosition { x: c.x, y: c.y }).collect();
            return;
        }
        let k = ease_factor(dt);
        for (shown, claw) in self.shown.iter_mut().zip(scene.claws.iter()) {
            shown.x += (claw.x - shown.x) * k;
            shown.y += (claw.y - shown.y) * k;
        }
    }
}

/// Share of the remaining distance covered in a frame of `dt_ms`.
pub fn ease_factor(dt_ms: f64) -> f64 {
    1.0 - (-dt_ms.max(0.0) / EASE_TIME_CONSTANT_MS).exp()
}

fn rounded_rect(ctx: &CanvasRenderingContext2d, x: f64, y: f64, w: f64, h: f64, r: f64) {
    ctx.begin_path();
    ctx.move_to(x + r, y);
    ctx.line_to(x + w - r, y);
    ctx.quadratic_curve_to(x + w, y, x + w, y + r);
    ctx.line_to(x + w, y + h - r);
    ctx.quadratic_curve_to(x + w, y + h, x + w - r, y + h);
    ctx.line_to(x + r, y + h);
    ctx.quadratic_curve_to(x, y + h, x, y + h - r);
    ctx.line_to(x, y + r);
    ctx.quadratic_curve_to(x, y, x + r, y);
    ctx.close_path();
}

fn polygon(ctx: &CanvasRenderingContext2d, points: &[(f64, f64)]) {
    ctx.begin_path();
    for (i, &(x, y)) in points.iter().enumerate() {
        if i == 0 {
            ctx.move_to(x, y);
        } else {
            ctx.line_to(x, y);
        }
    }
    ctx.close_path();
}

fn draw_frame(ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
    let body = ctx.create_linear_gradient(0.0, 20.0, 0.0, 580.0);
    body.add_color_stop(0.0, "hsl(0, 0%, 12%)")?;
    body.add_color_stop(0.5, "hsl(0, 0%, 8%)")?;
    body.add_color_stop(1.0, "hsl(0, 0%, 5%)")?;
    rounded_rect(ctx, 20.0, 20.0, 760.0, 560.0, 48.0);
    ctx.set_fill_style_canvas_gradient(&body);
    ctx.fill();
    ctx.set_line_width(8.0);
    ctx.set_stroke_style_str("hsla(330, 70%, 63%, 0.45)");
    ctx.stroke();

    rounded_rect(ctx, 60.0, 80.0, 680.0, 400.0, 32.0);
    ctx.set_line_width(4.0);
    ctx.set_stroke_style_str("hsla(330, 70%, 63%, 0.4)");
    ctx.stroke();

    ctx.set_fill_style_str("hsla(330, 70%, 63%, 0.6)");
    for (x, y) in [(80.0, 100.0), (720.0, 100.0), (80.0, 460.0), (720.0, 460.0)] {
        ctx.begin_path();
        ctx.arc(x, y, 8.0, 0.0, TAU)?;
        ctx.fill();
    }

    // Prize receiver under the case.
    rounded_rect(ctx, 340.0, 480.0, 120.0, 60.0, 8.0);
    ctx.set_fill_style_str("hsl(0, 0%, 8%)");
    ctx.fill();
    ctx.set_line_width(2.0);
    ctx.set_stroke_style_str("hsla(330, 70%, 63%, 0.3)");
    ctx.stroke();
    Ok(())
}

fn draw_lights(ctx: &CanvasRenderingContext2d, active: bool, now: f64) -> Result<(), JsValue> {
    for i in 0..8 {
        let color = if i % 2 == 0 { ORANGE } else { ACCENT };
        let (radius, alpha) = if active {
            let t = (now / 1000.0 - i as f64 * 0.1) * TAU;
            (4.0, 0.8 + 0.2 * t.sin())
        } else {
            (3.0, 0.6)
        };
        ctx.set_global_alpha(alpha);
        ctx.set_fill_style_str(color);
        ctx.begin_path();
        ctx.arc(100.0 + i as f64 * 100.0, 50.0, radius, 0.0, TAU)?;
        ctx.fill();
    }
    ctx.set_global_alpha(1.0);
    Ok(())
}

fn draw_case_background(ctx: &CanvasRenderingContext2d) {
    let bg = ctx.create_linear_gradient(0.0, CASE_Y, 0.0, CASE_Y + CASE_H);
    bg.add_color_stop(0.0, "hsl(219, 77%, 15%)").ok();
    bg.add_color_stop(1.0, "hsl(0, 0%, 5%)").ok();
    ctx.set_fill_style_canvas_gradient(&bg);
    ctx.fill_rect(CASE_X, CASE_Y, CASE_W, CASE_H);
}

fn draw_glass(ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
    let (cx, cy) = case_point(50.0, 35.0);
    ctx.set_fill_style_str("rgba(255,255,255,0.06)");
    ctx.begin_path();
    ctx.ellipse(cx, cy, CASE_W * 0.4, CASE_H * 0.25, 0.0, 0.0, TAU)?;
    ctx.fill();

    let (hx, hy) = case_point(10.0, 5.0);
    rounded_rect(ctx, hx, hy, CASE_W * 0.8, CASE_H * 0.08, 4.0);
    ctx.set_fill_style_str("rgba(255,255,255,0.075)");
    ctx.fill();

    // Floor line the balls rest on.
    let (_, floor) = case_point(0.0, crate::machine::sequencer::FLOOR_LINE);
    ctx.set_stroke_style_str("hsla(330, 70%, 63%, 0.2)");
    ctx.set_line_width(2.0);
    ctx.begin_path();
    ctx.move_to(CASE_X, floor);
    ctx.line_to(CASE_X + CASE_W, floor);
    ctx.stroke();
    Ok(())
}

fn draw_chute(ctx: &CanvasRenderingContext2d) {
    rounded_rect(ctx, 400.0 - 64.0, CASE_Y + CASE_H - 48.0, 128.0, 60.0, 12.0);
    ctx.set_fill_style_str("rgba(10,10,14,0.6)");
    ctx.fill();
    ctx.set_line_width(2.0);
    ctx.set_stroke_style_str("hsla(330, 70%, 63%, 0.3)");
    ctx.stroke();
}

fn sway_degrees(sway: Sway, now: f64) -> f64 {
    match sway {
        Sway::None => 0.0,
        Sway::Slow => 3.0 * (now / 4000.0 * TAU).sin(),
        Sway::Fast => 6.0 * (now / 1200.0 * TAU).sin(),
    }
}

fn draw_claw(
    ctx: &CanvasRenderingContext2d,
    balls: &mut dyn BallRenderer,
    claw: &ClawSprite,
    pos: ClawPosition,
    now: f64,
) -> Result<(), JsValue> {
    let (cx, cy) = case_point(pos.x, pos.y);
    let scale = claw.size_px / 100.0;
    let top = cy - 8.0;

    // Cable from the gantry down to the housing.
    ctx.set_stroke_style_str("rgba(170,170,180,0.5)");
    ctx.set_line_width(2.0);
    ctx.begin_path();
    ctx.move_to(cx, CASE_Y);
    ctx.line_to(cx, top + 12.0 * scale);
    ctx.stroke();

    ctx.save();
    ctx.translate(cx, top)?;
    ctx.scale(scale, scale)?;
    ctx.translate(-50.0, 0.0)?;
    // Sway pivots around the housing.
    ctx.translate(50.0, 20.0)?;
    ctx.rotate(sway_degrees(claw.sway, now).to_radians())?;
    ctx.translate(-50.0, -20.0)?;

    ctx.set_shadow_color(claw.glow.0);
    ctx.set_shadow_blur(claw.glow.1);
    ctx.set_fill_style_str(claw.color);
    ctx.set_stroke_style_str("#ffffff");
    ctx.set_line_width(1.5);
    ctx.begin_path();
    ctx.arc(50.0, 20.0, 8.0, 0.0, TAU)?;
    ctx.fill();
    ctx.stroke();

    ctx.translate(50.0, 20.0)?;
    let angle = claw.blade_angle;

    // Back blade, behind the held ball.
    draw_blade(ctx, claw.color, angle * 0.5, &[(-3.0, 12.0), (0.0, 48.0), (3.0, 52.0), (3.0, 15.0), (-3.0, 15.0)])?;

    if let Some(held) = &claw.payload {
        ctx.save();
        ctx.set_shadow_blur(0.0);
        ctx.translate(-15.0 + held.radius, 35.0 + held.radius)?;
        balls.draw(ctx, &held.style, held.radius)?;
        ctx.restore();
    }

    draw_blade(ctx, claw.color, -30.0 - angle, &[(-5.0, 10.0), (-15.0, 45.0), (-5.0, 50.0), (-2.0, 45.0), (-2.0, 15.0)])?;
    draw_blade(ctx, claw.color, 30.0 + angle, &[(5.0, 10.0), (15.0, 45.0), (5.0, 50.0), (2.0, 45.0), (2.0, 15.0)])?;
    ctx.translate(-50.0, -20.0)?;

    if claw.tip_glow {
        ctx.set_shadow_blur(0.0);
        ctx.set_fill_style_str("#ffffff");
        for (i, (x, y)) in [(35.0, 65.0), (50.0, 68.0), (65.0, 65.0)].into_iter().enumerate() {
            let t = (now - i as f64 * 100.0) / 400.0 * TAU;
            ctx.set_global_alpha(0.55 + 0.25 * t.cos());
            ctx.begin_path();
            ctx.arc(x, y, 3.0, 0.0, TAU)?;
            ctx.fill();
        }
        ctx.set_global_alpha(1.0);
    }
    ctx.restore();
    Ok(())
}

fn draw_blade(ctx: &CanvasRenderingContext2d, color: &str, degrees: f64, points: &[(f64, f64)]) -> Result<(), JsValue> {
    ctx.save();
    ctx.rotate(degrees * PI / 180.0)?;
    polygon(ctx, points);
    ctx.set_fill_style_str(color);
    ctx.fill();
    ctx.set_stroke_style_str("#ffffff");
    ctx.set_line_width(1.5);
    ctx.stroke();
    ctx.restore();
    Ok(())
}

fn draw_warning_sign(ctx: &CanvasRenderingContext2d, active: bool, now: f64) -> Result<(), JsValue> {
    let shake = if active { (now / 45.0).sin() * 2.0 } else { 0.0 };
    ctx.save();
    ctx.translate(400.0 + shake, 24.0)?;
    ctx.rotate((-2.0f64).to_radians())?;
    ctx.set_shadow_color("rgba(0,0,0,0.45)");
    ctx.set_shadow_blur(10.0);
    rounded_rect(ctx, -190.0, -16.0, 380.0, 32.0, 8.0);
    ctx.set_fill_style_str("hsl(0, 84%, 55%)");
    ctx.fill();
    ctx.set_shadow_blur(0.0);
    ctx.set_fill_style_str("#ffffff");
    ctx.set_font("bold 15px system-ui, sans-serif");
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.fill_text(WARNING_SIGN, 0.0, 1.0)?;
    ctx.restore();
    Ok(())
}

// --- Prediction card export ---------------------------------------------------

pub const CARD_WIDTH: u32 = 1000;
pub const CARD_HEIGHT: u32 = 640;
const CARD_LINE_CHARS: usize = 28;
const CARD_TITLE: &str = "Твоё новогоднее предсказание";
const CARD_FOOTER: &str = "Фонд «Игра» • Детство не ждёт";
const SNOWFLAKES: [(f64, f64); 6] = [(0.08, 0.14), (0.9, 0.1), (0.16, 0.82), (0.84, 0.78), (0.5, 0.06), (0.04, 0.5)];

/// Greedy word wrap by character count. A word longer than `max_chars` gets a line of its own.
pub fn wrap_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if !current.is_empty() && needed > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Paint the shareable prediction card onto a `CARD_WIDTH` x `CARD_HEIGHT` canvas.
pub fn paint_prediction_card(ctx: &CanvasRenderingContext2d, prediction: &Prediction) -> Result<(), JsValue> {
    let (w, h) = (CARD_WIDTH as f64, CARD_HEIGHT as f64);
    let bg = ctx.create_linear_gradient(0.0, 0.0, w, h);
    bg.add_color_stop(0.0, "hsl(219, 77%, 18%)")?;
    bg.add_color_stop(1.0, "#0d0d12")?;
    rounded_rect(ctx, 0.0, 0.0, w, h, 48.0);
    ctx.set_fill_style_canvas_gradient(&bg);
    ctx.fill();
    ctx.set_line_width(6.0);
    ctx.set_stroke_style_str("hsla(330, 70%, 63%, 0.4)");
    ctx.stroke();

    let accent = ctx.create_linear_gradient(0.0, 0.0, w, 0.0);
    accent.add_color_stop(0.0, "rgba(0,0,0,0)")?;
    accent.add_color_stop(0.5, ACCENT)?;
    accent.add_color_stop(1.0, "rgba(0,0,0,0)")?;
    ctx.set_fill_style_canvas_gradient(&accent);
    ctx.fill_rect(48.0, 0.0, w - 96.0, 4.0);

    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.set_fill_style_str("rgba(255,255,255,0.6)");
    ctx.set_font("bold 36px system-ui, sans-serif");
    ctx.fill_text(CARD_TITLE, w / 2.0, 110.0)?;

    let lines = wrap_words(&prediction.text, CARD_LINE_CHARS);
    let line_height = 72.0;
    let top = h / 2.0 - (lines.len() as f64 - 1.0) * line_height / 2.0;
    ctx.set_fill_style_str("#ffffff");
    ctx.set_font("bold 56px system-ui, sans-serif");
    for (i, line) in lines.iter().enumerate() {
        ctx.fill_text(line, w / 2.0, top + i as f64 * line_height)?;
    }

    ctx.set_fill_style_str("rgba(255,255,255,0.5)");
    ctx.set_font("26px system-ui, sans-serif");
    ctx.fill_text(CARD_FOOTER, w / 2.0, h - 80.0)?;
    if prediction.tier == DonationTier::GiantTriple {
        ctx.set_fill_style_str(ORANGE);
        ctx.fill_text(DonationTier::GiantTriple.label(), w / 2.0, h - 40.0)?;
    }

    ctx.set_fill_style_str("hsla(330, 70%, 63%, 0.2)");
    ctx.set_font("40px system-ui, sans-serif");
    for (x, y) in SNOWFLAKES {
        ctx.fill_text("❄", x * w, y * h)?;
    }
    Ok(())
}
