mod config;
mod logging;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::Result;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use config::CliConfig;
use logging::{LogEvent, StructuredLogger, SummaryEvent, TransitionEvent};
use vbmodem_core::channel::apply_pcm_channel;
use vbmodem_core::config::{LinModemConfig, SystemConfig};
use vbmodem_core::line_interface::{LineInterface, LoopbackLine};
use vbmodem_core::session::{CallState, ModemSession, SessionState};
use vbmodem_core::v21_v23::{V21Modem, V23Modem};
use vbmodem_core::v22::{V22Mode, V22Modulator};
use vbmodem_core::v34::trellis::TrellisRate;
use vbmodem_core::v34::V34Modem;
use vbmodem_core::v90::{V90Modem, V90Params};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Modulation {
    V21,
    V22,
    V23,
    V34,
    V90,
}

/// Command-line test harness for the voiceband modem core.
#[derive(Parser, Debug)]
#[command(author, version, about = "Voiceband modem test harness", long_about = None)]
struct Cli {
    /// Enable verbose diagnostic output.
    #[arg(short, long)]
    verbose: bool,

    /// Run the in-process line-simulator test: a calling and an
    /// answering session connected through an AWGN channel.
    #[arg(short = 's', long)]
    line_simulator: bool,

    /// Drive a real sound-card line. Not available in this build; the
    /// line-interface hook exists but no OSS backend is wired in.
    #[arg(short = 't', long)]
    sound_card: bool,

    /// Exercise one modulation directly, without the session state
    /// machine: generate a short burst and demodulate it in loopback.
    #[arg(short = 'm', long, value_enum)]
    modulation_test: Option<Modulation>,

    /// Answer an incoming call instead of dialing out.
    #[arg(short = 'a', long)]
    answer: bool,

    /// Pass a driver command through to the line interface. No real
    /// driver layer exists in this build; the command is logged only.
    #[arg(short = 'c', long)]
    driver_cmd: Option<String>,

    /// Dial this number.
    #[arg(short = 'd', long)]
    dial: Option<String>,
}

fn logger_for(verbose: bool) -> Result<StructuredLogger> {
    let mut config = CliConfig::default();
    if verbose {
        config.logging.level = config::LogLevel::Debug;
    }
    StructuredLogger::new(config.logging)
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    let mut logger = logger_for(args.verbose)?;

    if let Some(cmd) = &args.driver_cmd {
        logger.log(LogEvent::Info {
            message: format!("driver command \"{cmd}\" logged (no driver backend in this build)"),
        })?;
    }

    if let Some(modulation) = args.modulation_test {
        return run_modulation_test(&mut logger, modulation);
    }

    if args.sound_card {
        return run_sound_card(&mut logger);
    }

    if args.line_simulator {
        return run_line_simulator(&mut logger, &CliConfig::default());
    }

    if args.answer || args.dial.is_some() {
        return run_session(&mut logger, args.answer, args.dial.as_deref());
    }

    logger.log(LogEvent::Warn {
        message: "nothing to do: pass -s, -t, -m, -a or -d".to_string(),
    })?;
    Ok(())
}

/// `-t`: attempt to reserve a sound-card line. The OSS backend is an
/// external collaborator this crate only exposes a hook point for, so
/// opening one always fails here.
fn run_sound_card(logger: &mut StructuredLogger) -> Result<()> {
    struct SoundCardLine;
    impl LineInterface for SoundCardLine {
        fn open(&mut self) -> vbmodem_core::errors::Result<()> {
            Err(vbmodem_core::errors::IoError::OpenFailed.into())
        }
        fn close(&mut self) -> vbmodem_core::errors::Result<()> {
            Ok(())
        }
        fn set_offhook(&mut self, _offhook: bool) -> vbmodem_core::errors::Result<()> {
            Ok(())
        }
        fn set_ring(&mut self, _ring: bool) -> vbmodem_core::errors::Result<()> {
            Ok(())
        }
        fn ringing(&self) -> bool {
            false
        }
    }

    match ModemSession::init(SoundCardLine, LinModemConfig::default()) {
        Ok(_) => {
            logger.log(LogEvent::Info {
                message: "sound-card line opened".to_string(),
            })?;
            Ok(())
        }
        Err(e) => {
            logger.log(LogEvent::Error {
                message: "failed to open sound-card line".to_string(),
                details: Some(e.to_string()),
            })?;
            std::process::exit(1);
        }
    }
}

/// `-a`/`-d`: drive a single session on a loopback line, feeding it
/// silence (no real audio source in this harness) and logging state
/// transitions until the call either connects or hangs up.
fn run_session(logger: &mut StructuredLogger, answer: bool, dial: Option<&str>) -> Result<()> {
    let mut session = ModemSession::init(LoopbackLine::new(), LinModemConfig::default())?;

    if answer {
        session.start_receive()?;
    } else if let Some(number) = dial {
        session.start_dial(false, number)?;
    }

    let block = SystemConfig::DEFAULT_BLOCK_SAMPLES;
    let mut out = vec![0i16; block];
    let input = vec![0i16; block];
    let mut last_state = session.state();
    let mut blocks = 0usize;

    for _ in 0..20_000 {
        session.process(&mut out, &input);
        blocks += 1;
        let state = session.state();
        if state != last_state {
            logger.log(LogEvent::Transition(TransitionEvent {
                timestamp: chrono::Utc::now(),
                clock_samples: session.clock_samples(),
                from: format!("{last_state:?}"),
                to: format!("{state:?}"),
            }))?;
            last_state = state;
        }
        if matches!(session.get_state(), CallState::Connected) || state == SessionState::Idle {
            break;
        }
    }

    logger.log(LogEvent::Summary(SummaryEvent {
        timestamp: chrono::Utc::now(),
        duration_secs: logger.elapsed(),
        blocks_processed: blocks,
        final_state: format!("{:?}", session.state()),
        final_call_state: format!("{:?}", session.get_state()),
        bytes_exchanged: 0,
    }))?;

    session.close()?;
    Ok(())
}

/// `-s`: two sessions, one dialing and one answering, patched together
/// through an AWGN channel instead of real line hardware.
fn run_line_simulator(logger: &mut StructuredLogger, config: &CliConfig) -> Result<()> {
    let mut caller = ModemSession::init(LoopbackLine::new(), LinModemConfig::default())?;
    let mut answerer = ModemSession::init(LoopbackLine::new(), LinModemConfig::default())?;

    caller.start_dial(false, &config.simulator.dial_number)?;
    answerer.start_receive()?;

    let block = SystemConfig::DEFAULT_BLOCK_SAMPLES;
    let mut caller_out = vec![0i16; block];
    let mut answerer_out = vec![0i16; block];
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let mut blocks = 0usize;
    let mut both_connected = false;

    for _ in 0..config.simulator.max_blocks {
        let caller_in = answerer_out.clone();
        let answerer_in = caller_out.clone();

        caller.process(&mut caller_out, &caller_in);
        answerer.process(&mut answerer_out, &answerer_in);

        apply_pcm_channel(
            &mut caller_out,
            config.simulator.attenuation,
            config.simulator.noise_std,
            &mut rng,
        );
        apply_pcm_channel(
            &mut answerer_out,
            config.simulator.attenuation,
            config.simulator.noise_std,
            &mut rng,
        );

        blocks += 1;

        if matches!(caller.get_state(), CallState::Connected)
            && matches!(answerer.get_state(), CallState::Connected)
        {
            both_connected = true;
            break;
        }
    }

    logger.log(LogEvent::Summary(SummaryEvent {
        timestamp: chrono::Utc::now(),
        duration_secs: logger.elapsed(),
        blocks_processed: blocks,
        final_state: format!("caller={:?} answerer={:?}", caller.state(), answerer.state()),
        final_call_state: format!("connected={both_connected}"),
        bytes_exchanged: 0,
    }))?;

    caller.close()?;
    answerer.close()?;

    if !both_connected {
        logger.log(LogEvent::Warn {
            message: "line simulator did not reach CONNECTED within the block budget".to_string(),
        })?;
    }

    Ok(())
}

/// `-m`: exercise one modulation's modulate/demodulate pair directly,
/// bypassing the session state machine entirely.
fn run_modulation_test(logger: &mut StructuredLogger, modulation: Modulation) -> Result<()> {
    match modulation {
        Modulation::V21 => {
            let mut tx = V21Modem::new(true);
            let mut rx = V21Modem::new(false);
            let bits: Vec<u8> = (0..200).map(|i| (i % 2) as u8).collect();
            let mut idx = 0usize;
            let mut samples = vec![0i16; bits.len() * (8000 / 300) + 64];
            tx.modulate(&mut samples, || {
                let b = bits.get(idx).copied().unwrap_or(0);
                idx += 1;
                b
            });
            let mut recovered = Vec::new();
            rx.demodulate(&samples, |b| recovered.push(b));
            logger.log(LogEvent::Info {
                message: format!("V.21: sent {} bits, recovered {}", bits.len(), recovered.len()),
            })?;
        }
        Modulation::V22 => {
            let mut tx = V22Modulator::new(true, V22Mode::Mode2400);
            let bits: Vec<u8> = (0..64).map(|i| (i % 2) as u8).collect();
            let mut idx = 0usize;
            let mut samples = vec![0i16; 800];
            tx.generate(&mut samples, || {
                let b = bits.get(idx).copied().unwrap_or(0);
                idx += 1;
                b
            });
            logger.log(LogEvent::Info {
                message: format!(
                    "V.22: generated {} samples (demodulator is an unimplemented hook, per source)",
                    samples.len()
                ),
            })?;
        }
        Modulation::V23 => {
            let mut tx = V23Modem::new(true);
            let mut rx = V23Modem::new(false);
            let bits: Vec<u8> = (0..200).map(|i| (i % 2) as u8).collect();
            let mut idx = 0usize;
            let mut samples = vec![0i16; bits.len() * (8000 / 75) + 64];
            tx.modulate(&mut samples, || {
                let b = bits.get(idx).copied().unwrap_or(0);
                idx += 1;
                b
            });
            let mut recovered = Vec::new();
            rx.demodulate(&samples, |b| recovered.push(b));
            logger.log(LogEvent::Info {
                message: format!(
                    "V.23: sent {} bits on the calling station's back channel, recovered {}",
                    bits.len(),
                    recovered.len()
                ),
            })?;
        }
        Modulation::V34 => {
            let mut modem = V34Modem::new(true, 2400, TrellisRate::States16);
            let mut samples = vec![0i16; 400];
            let mut bits = (0..).map(|i: u32| (i % 2) as u8);
            modem.generate(&mut samples, || bits.next().unwrap());
            logger.log(LogEvent::Info {
                message: format!(
                    "V.34: generated {} samples, phase={:?}",
                    samples.len(),
                    modem.phase()
                ),
            })?;
        }
        Modulation::V90 => {
            let params = V90Params::default();
            let mut modem = V90Modem::new(params, false);
            let frame = modem.encoder.encode_frame(0, 0);
            let cp = modem.capability_packet(&params, false);
            logger.log(LogEvent::Info {
                message: format!(
                    "V.90: encoded one mapping frame ({} codes), capability packet is {} bits",
                    frame.len(),
                    cp.to_bits().len()
                ),
            })?;
        }
    }

    Ok(())
}
