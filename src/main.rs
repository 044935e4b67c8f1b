//! Halloween Run entry point
//!
//! The web build hosts the playable game; the native binary has no window and
//! runs headless agent episodes.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::HtmlCanvasElement;

    use halloween_run::Settings;
    use halloween_run::agent::{DodgePolicy, Policy};
    use halloween_run::audio::{AudioManager, SoundEffect};
    use halloween_run::consts::*;
    use halloween_run::highscores::LocalStorageStore;
    use halloween_run::input::{GamepadSnapshot, KeyState, resolve_action};
    use halloween_run::renderer::{Backdrop, Canvas, Hud, PixelRenderState, draw_scene};
    use halloween_run::session::{Session, SessionEvent};
    use halloween_run::sim::Simulation;

    /// Game instance holding all state
    struct Game {
        session: Session<LocalStorageStore>,
        settings: Settings,
        keys: KeyState,
        /// Demo mode: the built-in agent plays instead of the keyboard
        demo: Option<DodgePolicy>,
        backdrop: Backdrop,
        canvas: Canvas,
        render_state: Option<PixelRenderState>,
        audio: AudioManager,
        last_time: f64,
        new_record: bool,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
    }

    impl Game {
        fn new(seed: u64, settings: Settings) -> Self {
            let session = Session::new(Simulation::new(seed), LocalStorageStore);
            Self {
                session,
                audio: AudioManager::new(&settings),
                settings,
                keys: KeyState::default(),
                demo: None,
                // Decorative stream, decoupled from the spawner's
                backdrop: Backdrop::new(seed.rotate_left(17) ^ 0x5eed),
                canvas: Canvas::new(INTERNAL_W, INTERNAL_H),
                render_state: None,
                last_time: 0.0,
                new_record: false,
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
            }
        }

        fn toggle_demo(&mut self) {
            self.demo = match self.demo {
                Some(_) => None,
                None => Some(DodgePolicy::default()),
            };
            log::info!("Demo mode: {}", self.demo.is_some());
        }

        /// Run simulation steps for this frame
        fn update(&mut self, dt: f32, time: f64) {
            let pad = GamepadSnapshot::poll();
            let restart = self.keys.take_restart();

            let report = match self.demo.as_mut() {
                Some(policy) => {
                    // The agent restarts on its own after a crash
                    let restart = restart || self.session.is_game_over();
                    self.session
                        .update_with(dt, restart, |obs| policy.act(obs))
                }
                None => {
                    let action = resolve_action(&self.keys, pad.as_ref());
                    self.session.update(dt, action, restart)
                }
            };

            let speed = self.session.sim().episode().speed;
            let speed_fraction = self.session.sim().tuning().speed_fraction(speed);
            for _ in 0..report.advanced {
                self.backdrop.advance(speed_fraction, speed);
            }

            for event in report.events {
                match event {
                    SessionEvent::EpisodeEnded { new_record, .. } => {
                        self.audio.stop_music();
                        self.audio.play(SoundEffect::Crash);
                        if new_record {
                            self.audio.play(SoundEffect::NewHighScore);
                        }
                        self.new_record = new_record;
                    }
                    SessionEvent::Restarted { episode } => {
                        self.backdrop.reset();
                        self.new_record = false;
                        self.audio.play(SoundEffect::Restart);
                        self.audio.start_music();
                        log::info!("Episode {} started", episode);
                    }
                }
            }

            self.audio.update_music();

            // Track frame times for FPS
            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;
            let oldest_time = self.frame_times[self.frame_index];
            if oldest_time > 0.0 {
                let elapsed = time - oldest_time;
                if elapsed > 0.0 {
                    self.fps = (60000.0 / elapsed).round() as u32;
                }
            }
        }

        fn hud(&self) -> Hud {
            Hud {
                score: self.session.sim().episode().score,
                high_score: self.session.live_high_score(),
                game_over: self.session.is_game_over(),
                new_record: self.new_record,
                demo: self.demo.is_some(),
                fps: self.settings.show_fps.then_some(self.fps),
            }
        }

        /// Draw the frame and present it
        fn render(&mut self) {
            if self.render_state.is_none() {
                return;
            }
            let hud = self.hud();
            draw_scene(
                &mut self.canvas,
                &self.backdrop,
                self.session.sim().episode(),
                &hud,
            );

            let Some(render_state) = self.render_state.as_mut() else {
                return;
            };
            match render_state.render(&self.canvas) {
                Ok(_) => {}
                Err(wgpu::SurfaceError::Lost) => {
                    render_state.resize(render_state.size.0, render_state.size.1);
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("Out of memory!");
                }
                Err(e) => log::warn!("Render error: {:?}", e),
            }
        }

        /// Mirror the scores into DOM elements when the page has them
        fn update_dom_hud(&self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            let hud = self.hud();
            if let Some(el) = document.query_selector("#hud-score .hud-value").ok().flatten() {
                el.set_text_content(Some(&format!("{:.1}", hud.score)));
            }
            if let Some(el) = document.query_selector("#hud-high .hud-value").ok().flatten() {
                el.set_text_content(Some(&format!("{:.1}", hud.high_score)));
            }
            if let Some(el) = document.get_element_by_id("game-over") {
                let class = if hud.game_over { "" } else { "hidden" };
                let _ = el.set_attribute("class", class);
            }
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }

        log::info!("Halloween Run starting...");

        let settings = Settings::load();
        let seed = settings.seed.unwrap_or_else(|| js_sys::Date::now() as u64);
        let headless = settings.headless;
        let game = Rc::new(RefCell::new(Game::new(seed, settings)));
        log::info!("Game initialized with seed: {}", seed);

        let Some(window) = web_sys::window() else {
            log::error!("No window");
            return;
        };
        let Some(document) = window.document() else {
            log::error!("No document");
            return;
        };

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        if headless {
            log::info!("Headless mode: skipping WebGPU setup");
        } else {
            match init_renderer(&window, &document).await {
                Ok(render_state) => game.borrow_mut().render_state = Some(render_state),
                Err(e) => log::error!("Rendering disabled: {}", e),
            }
        }

        setup_input_handlers(game.clone());
        setup_focus_handlers(game.clone());

        request_animation_frame(game);

        log::info!("Halloween Run running!");
    }

    async fn init_renderer(
        window: &web_sys::Window,
        document: &web_sys::Document,
    ) -> Result<PixelRenderState, String> {
        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas element")?
            .dyn_into()
            .map_err(|_| "#canvas is not a canvas")?;

        let dpr = window.device_pixel_ratio();
        let width = (canvas.client_width() as f64 * dpr) as u32;
        let height = (canvas.client_height() as f64 * dpr) as u32;
        canvas.set_width(width);
        canvas.set_height(height);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas))
            .map_err(|e| format!("failed to create surface: {}", e))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| format!("failed to get adapter: {}", e))?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        PixelRenderState::new(surface, &adapter, width, height, INTERNAL_W, INTERNAL_H)
            .await
            .map_err(|e| e.to_string())
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };

        // Key down
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                let mut g = game.borrow_mut();
                g.audio.resume();
                // Browsers only allow audio after a gesture, so the tune starts here
                if !g.session.is_game_over() {
                    g.audio.start_music();
                }
                let key = event.key();
                match key.as_str() {
                    "i" | "I" => g.toggle_demo(),
                    "m" | "M" => {
                        let muted = !g.audio.is_muted();
                        g.audio.set_muted(muted);
                        g.settings.muted = muted;
                        g.settings.save();
                    }
                    _ => {
                        if g.keys.set_key(&key, true) {
                            event.prevent_default();
                        }
                    }
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Key up
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                game.borrow_mut().keys.set_key(&event.key(), false);
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Release held keys when the page loses focus so the cat does not drift
    fn setup_focus_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let Some(document) = window.document() else { return };

        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut g = game.borrow_mut();
                    g.keys.clear();
                    g.last_time = 0.0;
                    log::info!("Tab hidden, input released");
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                game.borrow_mut().keys.clear();
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt, time);
            g.render();
            g.update_dom_hud();
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Halloween Run (native) starting...");

    if let Err(e) = native::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use halloween_run::agent::{make_policy, run_episodes};
    use halloween_run::highscores::FileStore;
    use halloween_run::session::Session;
    use halloween_run::{Settings, SimError, Simulation};

    pub fn run() -> Result<(), SimError> {
        let settings = Settings::from_env();
        if !settings.headless {
            log::info!(
                "Native mode has no window - running headless agent episodes (play in the browser with `trunk serve`)"
            );
        }

        let tuning = settings.load_tuning()?;
        let sim = match settings.seed {
            Some(seed) => Simulation::with_tuning(seed, tuning)?,
            None => Simulation::from_entropy(tuning)?,
        };
        let seed = sim.seed();

        let store = FileStore::new(&settings.high_score_path);
        let mut session = Session::new(sim, store);
        let mut policy = make_policy(settings.policy, seed);

        let summary = run_episodes(
            &mut session,
            policy.as_mut(),
            settings.episodes,
            settings.max_steps,
        );

        println!(
            "{} episode(s), seed {}: best {:.1}, mean {:.1}, {} frames, high score {:.1}",
            summary.episodes.len(),
            seed,
            summary.best(),
            summary.mean(),
            summary.total_frames(),
            summary.high_score
        );
        Ok(())
    }
}
