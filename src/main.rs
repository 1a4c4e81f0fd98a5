use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use waysight::analyze::AnalysisClient;
use waysight::camera::{Frame, FrameSource, HttpFrameSource};
use waysight::playback::{AudioPlayer, PlaybackState, format_timestamp};
use waysight::voice::{MicCapture, SAMPLE_RATE, samples_to_wav};
use waysight::{AnalysisResult, Config, Session, SessionEvent};

/// Waysight - assistive scene narration: camera in, spoken answer out
#[derive(Parser)]
#[command(name = "waysight", version, about)]
struct Cli {
    /// Base URL of the analysis service
    #[arg(long, env = "WAYSIGHT_API_URL")]
    api_url: Option<String>,

    /// Output language code (en|hi|fr|es|de|zh)
    #[arg(short, long, env = "WAYSIGHT_LANGUAGE")]
    language: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run an interactive session with live scene narration
    Run {
        /// Don't start live sampling automatically
        #[arg(long)]
        no_live: bool,
    },
    /// Analyze a single image file and speak the answer
    Analyze {
        /// Path to a JPEG/PNG/WebP image
        image: PathBuf,
        /// Question about the scene
        #[arg(short, long, default_value = "")]
        query: String,
        /// Skip speaking the answer aloud
        #[arg(long)]
        no_speak: bool,
    },
    /// Record a spoken question and print its transcript
    Listen {
        /// Recording duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Check the analysis service health
    Status,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test the camera snapshot endpoint
    TestCamera,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,waysight=info",
        1 => "info,waysight=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Resolve config with CLI overrides layered on top
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load()?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(lang) = &cli.language {
        config.set_language(lang)?;
    }
    Ok(config)
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        None | Some(Command::Run { no_live: false }) => run_session(config, true).await,
        Some(Command::Run { no_live: true }) => run_session(config, false).await,
        Some(Command::Analyze {
            image,
            query,
            no_speak,
        }) => analyze_file(config, &image, &query, no_speak).await,
        Some(Command::Listen { duration }) => listen(config, duration).await,
        Some(Command::Status) => status(&config).await,
        Some(Command::TestMic { duration }) => test_mic(duration).await,
        Some(Command::TestSpeaker) => test_speaker().await,
        Some(Command::TestCamera) => test_camera(&config).await,
    }
}

/// Interactive session: live narration plus stdin commands
#[allow(clippy::future_not_send)]
async fn run_session(config: Config, live: bool) -> anyhow::Result<()> {
    tracing::info!(
        api_url = %config.api_url,
        camera = %config.camera.snapshot_url,
        language = %config.language,
        "starting session"
    );

    // Best-effort readiness probe; the service loads models for a while
    // after boot
    match AnalysisClient::new(&config.api_url).health().await {
        Ok(report) if !report.models_loaded => {
            tracing::warn!("service reachable but models still loading, expect 503s");
        }
        Ok(_) => tracing::debug!("service healthy"),
        Err(e) => tracing::warn!(error = %e, "service health probe failed"),
    }

    let mut session = Session::new(config);
    session.open_camera().await?;
    if live {
        session.start_live().await?;
    }

    println!("waysight ready. Type a question, or a command:");
    println!("  :photo       capture one frame and analyze it");
    println!("  :analyze     re-analyze the current frame");
    println!("  :live on|off toggle live narration");
    println!("  :camera      reopen the camera after a photo");
    println!("  :rec / :stop record a spoken question");
    println!("  :lang <code> switch output language");
    println!("  :play        pause/resume the answer audio");
    println!("  :quit        exit");

    let mut events = session
        .take_events()
        .ok_or_else(|| anyhow::anyhow!("event receiver already taken"))?;

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(200));

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!("shutdown requested");
                break;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if handle_line(&mut session, line.trim()).await {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                report_event(&event);
                session.apply(&event);
            }
            _ = ticker.tick() => {
                if session.player().poll_finished() {
                    tracing::debug!("answer finished");
                }
            }
        }
    }

    session.close_camera().await;
    session.player().stop();
    tracing::info!("session ended");
    Ok(())
}

/// Apply one stdin line; returns true to quit
#[allow(clippy::future_not_send)]
async fn handle_line(session: &mut Session, line: &str) -> bool {
    let outcome = match line {
        "" => Ok(()),
        ":quit" | ":q" => return true,
        ":photo" => match session.take_photograph().await {
            Ok(()) => match session.analyze() {
                Ok(true) => Ok(()),
                Ok(false) => {
                    println!("analysis already running, try again in a moment");
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        },
        ":analyze" => match session.analyze() {
            Ok(true) => Ok(()),
            Ok(false) => {
                println!("analysis already running, try again in a moment");
                Ok(())
            }
            Err(e) => Err(e),
        },
        ":live on" => session.start_live().await,
        ":live off" => {
            session.stop_live().await;
            Ok(())
        }
        ":camera" => session.open_camera().await,
        ":rec" => session.start_recording(),
        ":stop" => {
            session.stop_recording();
            Ok(())
        }
        ":play" => {
            session.player().toggle();
            let player = session.player();
            println!(
                "[{:?} {} / {}]",
                player.state(),
                format_timestamp(player.position_secs()),
                format_timestamp(player.duration_secs()),
            );
            Ok(())
        }
        lang if lang.starts_with(":lang ") => {
            session.set_language(lang.trim_start_matches(":lang ").trim())
        }
        unknown if unknown.starts_with(':') => {
            println!("unknown command: {unknown}");
            Ok(())
        }
        question => {
            session.set_query(question);
            println!("question set: \"{question}\"");
            Ok(())
        }
    };

    if let Err(e) = outcome {
        println!("error: {e}");
    }
    false
}

/// Print one event for the user
fn report_event(event: &SessionEvent) {
    match event {
        SessionEvent::AnalysisReady { result, .. } => print_result(result),
        SessionEvent::AnalysisFailed { message, .. } => println!("analysis failed: {message}"),
        SessionEvent::TranscriptReady(text) => {
            if text.is_empty() {
                println!("heard nothing");
            } else {
                println!("question set: \"{text}\"");
            }
        }
        SessionEvent::TranscriptionFailed(message) => {
            println!("transcription failed: {message}");
        }
        SessionEvent::CaptureFailed(message) => println!("capture failed: {message}"),
    }
}

/// Render an analysis result as text
fn print_result(result: &AnalysisResult) {
    println!("---");
    println!("{}", result.description);
    if result.language != "en" && !result.translated_text.is_empty() {
        println!("[{}] {}", result.language, result.translated_text);
    }

    if !result.objects.is_empty() {
        let labels: Vec<String> = result
            .objects
            .iter()
            .map(|o| format!("{} ({:.0}%)", o.label, o.confidence * 100.0))
            .collect();
        println!("objects: {}", labels.join(", "));
    }
    if !result.hazards.is_empty() {
        println!("hazards: {}", result.hazards.join(", "));
    }

    let zones = &result.depth.zones;
    println!(
        "depth: left {} ({:.0}%) | center {} ({:.0}%) | right {} ({:.0}%)",
        zones.left.label,
        zones.left.percent,
        zones.center.label,
        zones.center.percent,
        zones.right.label,
        zones.right.percent,
    );
    println!(
        "{}",
        if result.safe_to_walk {
            "safe to walk forward"
        } else {
            "do not walk forward - obstacle detected"
        }
    );
    println!("---");
}

/// One-shot analysis of an image file
#[allow(clippy::future_not_send)]
async fn analyze_file(
    mut config: Config,
    image: &std::path::Path,
    query: &str,
    no_speak: bool,
) -> anyhow::Result<()> {
    if no_speak {
        config.playback.autoplay = false;
    }

    let mut session = Session::new(config);
    session.set_frame(Frame::from_path(image)?);
    session.set_query(query);

    if !session.analyze()? {
        anyhow::bail!("analysis slot unexpectedly busy");
    }

    loop {
        let Some(event) = session.next_event().await else {
            anyhow::bail!("session ended without a result");
        };
        match &event {
            SessionEvent::AnalysisReady { .. } => {
                report_event(&event);
                session.apply(&event);
                break;
            }
            SessionEvent::AnalysisFailed { message, .. } => {
                anyhow::bail!("analysis failed: {message}");
            }
            _ => session.apply(&event),
        }
    }

    // Let the spoken answer finish before exiting
    while session.player().state() == PlaybackState::Playing {
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.player().poll_finished();
    }

    Ok(())
}

/// Record a question and print its transcript
#[allow(clippy::future_not_send)]
async fn listen(config: Config, duration: u64) -> anyhow::Result<()> {
    let mut session = Session::new(config);

    println!("Recording for {duration} seconds, speak now...");
    session.start_recording()?;
    tokio::time::sleep(Duration::from_secs(duration)).await;
    session.stop_recording();
    println!("Transcribing...");

    loop {
        let Some(event) = session.next_event().await else {
            anyhow::bail!("session ended without a transcript");
        };
        match &event {
            SessionEvent::TranscriptReady(text) => {
                session.apply(&event);
                println!("transcript: \"{text}\"");
                return Ok(());
            }
            SessionEvent::TranscriptionFailed(message) => {
                anyhow::bail!("transcription failed: {message}");
            }
            _ => session.apply(&event),
        }
    }
}

/// Check the analysis service health
async fn status(config: &Config) -> anyhow::Result<()> {
    let report = AnalysisClient::new(&config.api_url).health().await?;
    println!("service:       {}", config.api_url);
    println!("status:        {}", report.status);
    println!("models loaded: {}", report.models_loaded);
    if !report.version.is_empty() {
        println!("version:       {}", report.version);
    }
    Ok(())
}

/// Test microphone input with a level meter
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let capture = MicCapture::acquire()?;
    println!("Sample rate: {SAMPLE_RATE} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let level = capture.level();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (level * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {level:.4} | [{meter}]", i + 1);
    }

    let samples = capture.finish();
    println!("---");
    println!("Captured {} samples.", samples.len());
    println!("If you saw movement in the meter, your mic is working.");
    Ok(())
}

/// Test speaker output with a sine tone
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let frequency = 440.0_f32;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..SAMPLE_RATE * 2)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();
    let wav = samples_to_wav(&samples, SAMPLE_RATE)?;

    let mut player = AudioPlayer::new();
    player.load(&wav, true)?;
    while player.state() == PlaybackState::Playing {
        tokio::time::sleep(Duration::from_millis(100)).await;
        player.poll_finished();
    }

    println!("If you heard the tone, your speakers are working.");
    Ok(())
}

/// Test the camera snapshot endpoint
async fn test_camera(config: &Config) -> anyhow::Result<()> {
    println!("Testing camera at {} ...", config.camera.snapshot_url);

    let mut source = HttpFrameSource::new(&config.camera.snapshot_url);
    source.open().await?;
    let frame = source.grab().await?;
    source.close();

    println!("Got a {} byte frame.", frame.len());
    println!("If that looks like a JPEG-sized number, your camera is working.");
    Ok(())
}
