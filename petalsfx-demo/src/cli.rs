use anyhow::{Context, Result, bail};
use petalsfx::{
    PetalSfxDesc, PetalSfxEngine, PetalSfxEvent, PlayOutcome, SoundConfig, SoundId, SoundState,
};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Default)]
pub struct DemoOptions {
    pub sfx: Vec<PathBuf>,
    pub music: Option<PathBuf>,
    pub plays: usize,
}

impl DemoOptions {
    pub fn parse(args: &[String]) -> Option<Self> {
        let mut options = Self {
            plays: 24,
            ..Default::default()
        };

        let mut args = args.iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--music" => options.music = Some(args.next()?.into()),
                "--plays" => options.plays = args.next()?.parse().ok()?,
                flag if flag.starts_with("--") => return None,
                path => options.sfx.push(path.into()),
            }
        }

        (!options.sfx.is_empty()).then_some(options)
    }
}

pub fn run(options: DemoOptions) -> Result<()> {
    let desc = PetalSfxDesc::new().voice_count(8);
    let mut engine =
        PetalSfxEngine::with_default_output(desc).context("Failed to create engine")?;
    engine.start().context("Failed to start audio output")?;

    let config = SoundConfig::new()
        .base_volume(0.8)
        .volume_vary_db(3.0)
        .pitch_vary_cents(100.0);
    let sounds = options
        .sfx
        .iter()
        .map(|path| engine.load_sound(path, config))
        .collect::<petalsfx::Result<Vec<SoundId>>>()?;
    let group = engine.create_group(sounds.clone())?;

    wait_for_loads(&mut engine, &sounds)?;

    if let Some(track) = &options.music {
        log::info!("Starting music {}", track.display());
        engine.play_music(track.clone(), true);
    }

    log::info!("Triggering {} random variant plays", options.plays);
    let mut exhausted = 0;
    for i in 0..options.plays {
        match engine.play_group(group) {
            PlayOutcome::Started(grant) => log::info!("Play {} on {}", i, grant),
            PlayOutcome::Exhausted => exhausted += 1,
            other => log::warn!("Play {} did not start: {:?}", i, other),
        }
        run_for(&mut engine, Duration::from_millis(120));
    }
    log::info!("{} plays dropped because every voice was busy", exhausted);

    if options.music.is_some() {
        log::info!("Fading music out");
        engine.stop_music(true);
        let fade = engine.desc().fade_duration;
        run_for(&mut engine, fade + Duration::from_millis(200));
    }

    run_for(&mut engine, Duration::from_secs(1));
    engine.stop()?;
    Ok(())
}

fn wait_for_loads(engine: &mut PetalSfxEngine, sounds: &[SoundId]) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(30);
    while sounds
        .iter()
        .any(|id| engine.sound_state(*id) == Some(SoundState::Loading))
    {
        if Instant::now() > deadline {
            bail!("Timed out decoding sound effects");
        }
        run_for(engine, FRAME);
    }

    let ready = sounds
        .iter()
        .filter(|id| engine.sound_state(**id) == Some(SoundState::Ready))
        .count();
    if ready == 0 {
        bail!("None of the sound effects could be loaded");
    }
    log::info!("{}/{} sound effects ready", ready, sounds.len());
    Ok(())
}

/// Ticks the engine at roughly 60 Hz for `duration`, logging its events.
fn run_for(engine: &mut PetalSfxEngine, duration: Duration) {
    let end = Instant::now() + duration;
    while Instant::now() < end {
        engine.update();
        for event in engine.poll_events() {
            match event {
                PetalSfxEvent::SoundLoadFailed { sound_id, error } => {
                    log::error!("{} failed to load: {}", sound_id, error)
                }
                event if event.is_error() => log::error!("{:?}", event),
                event => log::debug!("{:?}", event),
            }
        }
        thread::sleep(FRAME);
    }
}
