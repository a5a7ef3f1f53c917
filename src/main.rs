/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use config::GameConfig;
use sim::event::GameEvent;
use sim::save::{self, FileScoreStore, ScoreStore};
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_FILE: &str = "nemery.log";

fn main() {
    init_logging();

    let config = match GameConfig::load() {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    let mut store = FileScoreStore::open();
    let mut world = WorldState::new(&config, store.best_score());
    if let Some(on) = store.sound_enabled() {
        world.sound_enabled = on;
    }
    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    // Opened even when muted so the title-screen toggle can turn it on.
    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &mut store, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        log::error!("game error: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Nemery!");
    println!("Best Score: {}", world.best_score);
}

/// Log to a file next to the scores; the terminal is in raw mode.
/// `RUST_LOG` overrides the default `info` filter.
fn init_logging() {
    let path = save::save_dir().join(LOG_FILE);
    let file = match std::fs::File::create(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Logging disabled ({}: {e})", path.display());
            return;
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

fn game_loop(
    world: &mut WorldState,
    store: &mut dyn ScoreStore,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);
    let mut events: Vec<GameEvent> = Vec::new();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            let events = world.return_to_title();
            world.apply_events(&events, store);
            break;
        }
        if kb.resized {
            renderer.invalidate();
        }

        events.clear();
        let quit = handle_meta(world, store, renderer, &kb, &gp, &mut events);
        process_sound_events(sound, world.sound_enabled, &events);
        world.apply_events(&events, store);
        if quit {
            break;
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_rate {
            last_tick = Instant::now();
            let dt_ms = u32::try_from(elapsed.as_millis()).unwrap_or(u32::MAX);
            let events = world.tick(dt_ms);
            process_sound_events(sound, world.sound_enabled, &events);
            world.apply_events(&events, store);
        }

        renderer.render(world, store.scoreboard())?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, enabled: bool, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) if enabled => s,
        _ => return,
    };
    for event in events {
        if let GameEvent::Cue(cue) = event {
            sfx.play(*cue);
        }
    }
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_CYCLE: &[KeyCode] = &[KeyCode::Tab, KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_SCORES: &[KeyCode] = &[KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_HELP: &[KeyCode] = &[KeyCode::Char('h'), KeyCode::Char('H'), KeyCode::Char('?')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_SOUND: &[KeyCode] = &[KeyCode::Char('m'), KeyCode::Char('M')];

fn detect_movement(kb: &InputState, gp: &GamepadState) -> Option<(i32, i32)> {
    if kb.any_pressed(KEYS_UP) {
        Some((0, -1))
    } else if kb.any_pressed(KEYS_DOWN) {
        Some((0, 1))
    } else if kb.any_pressed(KEYS_LEFT) {
        Some((-1, 0))
    } else if kb.any_pressed(KEYS_RIGHT) {
        Some((1, 0))
    } else {
        gp.nav()
    }
}

/// Screen navigation and play input. Returns true to exit the program.
fn handle_meta(
    world: &mut WorldState,
    store: &mut dyn ScoreStore,
    renderer: &Renderer,
    kb: &InputState,
    gp: &GamepadState,
    events: &mut Vec<GameEvent>,
) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed();
    let esc = kb.any_pressed(&[KeyCode::Esc]) || gp.cancel_pressed();

    match world.phase {
        // ── Title Screen ──
        Phase::Title => {
            if confirm {
                events.extend(world.start_game());
            } else if kb.any_pressed(KEYS_CYCLE) || gp.cycle_pressed() {
                events.extend(world.cycle_difficulty());
            } else if kb.any_pressed(KEYS_SOUND) || gp.sound_toggle_pressed() {
                events.extend(world.toggle_sound(store));
            } else if kb.any_pressed(KEYS_SCORES) {
                world.open(Phase::Scoreboard);
            } else if kb.any_pressed(KEYS_HELP) {
                world.open(Phase::Help);
            } else if kb.any_pressed(KEYS_QUIT) || esc {
                return true;
            }
        }

        // ── Info screens ──
        Phase::Help | Phase::Scoreboard => {
            if confirm || esc {
                world.open(Phase::Title);
            }
        }

        // ── In a round ──
        Phase::Playing => {
            if esc {
                events.extend(world.return_to_title());
                return false;
            }
            if let Some((dx, dy)) = detect_movement(kb, gp) {
                world.move_cursor(dx, dy);
            }
            if confirm {
                events.extend(world.tap_cursor());
            }
            for &(x, y) in kb.clicks() {
                if let Some(cell) = renderer.tile_at(x, y) {
                    events.extend(world.tap_cell(cell));
                }
            }
        }

        // ── Game Over ──
        Phase::GameOver => {
            if confirm {
                events.extend(world.start_game());
            } else if kb.any_pressed(KEYS_SCORES) {
                world.open(Phase::Scoreboard);
            } else if esc {
                world.open(Phase::Title);
            }
        }
    }

    false
}
