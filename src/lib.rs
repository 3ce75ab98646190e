//! Claw Wish core crate.
//!
//! A New Year donation microsite rendered from WASM: a claw machine on a
//! canvas, a donation modal and a prediction reveal. Pure logic (tiers, prize
//! population, claw sequencing, the donation flow) is platform independent and
//! tested natively; `web` binds it to the browser and is what `start_microsite()`
//! launches.

use wasm_bindgen::prelude::*;

pub mod config;
pub mod effects;
pub mod error;
pub mod flow;
pub mod host;
pub mod log;
pub mod machine;
pub mod population;
pub mod site;
pub mod tier;
pub mod web;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

// -----------------------------------------------------------------------------
// Prediction catalog. One line is drawn uniformly per finished cycle.
// -----------------------------------------------------------------------------

pub const PREDICTIONS: &[&str] = &[
    "Ты найдёшь то, что давно ищешь",
    "Год принесёт тёплые перемены",
    "Смелый шаг откроет важную дверь",
    "Твоя мечта уже близко",
    "Ты обнимешь того, кто нужен сердцу",
    "Маленькое чудо придёт внезапно",
    "Новая дружба согреет зиму",
    "Там, где сложно, ты справишься",
    "Время заметит твои старания",
    "Добрая весть придёт до снега",
    "Случайная встреча всё изменит к лучшему",
    "Тепло дома умножится",
    "Ты услышишь ответ, который ждал(а)",
    "Появится занятие, что радует каждый день",
    "Верь в себя — и получится",
    "Ты окажешься в нужном месте вовремя",
    "Старый план наконец сработает",
    "Будут силы начать сначала",
    "Кто-то скажет тебе важные слова",
    "Улыбка вернёт лёгкость",
];

// -----------------------------------------------------------------------------
// JS entry points
// -----------------------------------------------------------------------------

fn not_started() -> JsValue {
    JsValue::from_str("microsite not started")
}

/// Mount the microsite. `config_json` is an optional `SiteConfig` object as JSON.
#[wasm_bindgen]
pub fn start_microsite(config_json: Option<String>) -> Result<(), JsValue> {
    web::start(config_json)
}

#[wasm_bindgen]
pub fn open_donation() -> bool {
    web::with_site(|site| site.open_donation()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn close_donation() {
    web::with_site(|site| site.close_donation());
}

/// Validate and pay `raw`; resolves to the tier name of the started cycle.
#[wasm_bindgen]
pub fn submit_donation(raw: &str) -> Result<String, JsValue> {
    let tier = web::with_site(|site| site.submit_donation(raw, web::performance_now())).ok_or_else(not_started)??;
    web::scroll_machine_into_view();
    Ok(tier.as_str().to_string())
}

/// Success callback for an external payment widget; `amount` is the confirmed
/// sum. Resolves to the tier name, or `undefined` when a cycle is already running.
#[wasm_bindgen]
pub fn report_payment_success(amount: u32) -> Option<String> {
    let tier = web::with_site(|site| site.report_payment_success(amount, web::performance_now())).flatten()?;
    web::scroll_machine_into_view();
    Some(tier.as_str().to_string())
}

/// Failure callback for an external payment widget.
#[wasm_bindgen]
pub fn report_payment_failure(reason: &str) {
    web::with_site(|site| site.report_payment_failure(reason));
}

#[wasm_bindgen]
pub fn dismiss_prediction() -> bool {
    web::with_site(|site| site.dismiss_prediction()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn abort_cycle() -> bool {
    web::with_site(|site| site.abort(web::performance_now())).unwrap_or(false)
}

#[wasm_bindgen]
pub fn current_tier(amount: u32) -> String {
    tier::resolve_tier(amount).as_str().to_string()
}
