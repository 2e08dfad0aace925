use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    resolve_identity, ControlAttributes, ControlEvent, ControlFactory, ControlFailure,
    FailureReporter, InitialIndexPolicy, LifecycleState, TracingReporter, ValueChannel,
};
use futures::future::join_all;
use tokio::{sync::broadcast, task::JoinHandle};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser, Debug)]
#[command(name = "ccctl", about = "Drive CC controls against a device server")]
struct Cli {
    /// Device origin, e.g. http://127.0.0.1:8080.
    #[arg(long)]
    origin: Option<String>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints the device value.
    Get {
        #[arg(long)]
        channel: String,
        #[arg(long)]
        cc: String,
    },
    /// Sends a raw value.
    Set {
        #[arg(long)]
        channel: String,
        #[arg(long)]
        cc: String,
        #[arg(long, allow_negative_numbers = true)]
        value: f64,
    },
    /// Drags a slider through the given track positions (0.0 to 1.0).
    Slide {
        #[arg(long)]
        channel: String,
        #[arg(long)]
        cc: String,
        #[arg(long)]
        step: Option<String>,
        #[arg(long)]
        vertical: bool,
        #[arg(required = true, allow_negative_numbers = true)]
        ratios: Vec<f64>,
    },
    /// Presses a step button.
    Step {
        #[arg(long)]
        channel: String,
        #[arg(long)]
        cc: String,
        #[arg(long)]
        step: String,
        #[arg(long, default_value_t = 1)]
        presses: usize,
        #[arg(long)]
        policy: Option<InitialIndexPolicy>,
    },
}

/// Logs like [`TracingReporter`] and remembers how many failures there were.
#[derive(Default)]
struct CountingReporter {
    failures: AtomicUsize,
}

impl CountingReporter {
    fn ensure_none(&self) -> Result<()> {
        match self.failures.load(Ordering::SeqCst) {
            0 => Ok(()),
            count => bail!("{count} control operation(s) failed"),
        }
    }
}

impl FailureReporter for CountingReporter {
    fn report(&self, failure: &ControlFailure<'_>) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        TracingReporter.report(failure);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = config::load_settings();
    if let Some(origin) = cli.origin {
        settings.device_origin = origin;
    }
    if let Some(ms) = cli.timeout_ms {
        settings.request_timeout = Duration::from_millis(ms);
    }

    let reporter = Arc::new(CountingReporter::default());
    let factory = ControlFactory::from_settings(&settings)?.with_reporter(reporter.clone());

    match cli.command {
        Command::Get { channel, cc } => {
            let display = factory.display(ControlAttributes::new(channel, cc)).await;
            let printer = spawn_printer(display.subscribe_events());
            if let Some(fetch) = display.attach().await {
                fetch.await?;
            }
            drop(display);
            printer.await?;
        }
        Command::Set { channel, cc, value } => {
            let identity = resolve_identity(Some(channel.as_str()), Some(cc.as_str()))?;
            factory.channel().push_value(Some(identity), value).await?;
            info!(%identity, value, "value sent");
        }
        Command::Slide {
            channel,
            cc,
            step,
            vertical,
            ratios,
        } => {
            let mut attributes = ControlAttributes::new(channel, cc);
            attributes.step = step;
            let slider = if vertical {
                factory.vslider(attributes).await
            } else {
                factory.hslider(attributes).await
            };
            let printer = spawn_printer(slider.subscribe_events());
            if let Some(fetch) = slider.attach().await {
                fetch.await?;
            }
            if slider.state().await != LifecycleState::Ready {
                reporter.ensure_none()?;
                bail!("slider did not receive its initial value");
            }

            let (first, rest) = ratios.split_first().context("no positions given")?;
            let mut pushes = Vec::new();
            pushes.extend(slider.pointer_down(*first).await);
            for ratio in rest {
                pushes.extend(slider.pointer_move(*ratio).await);
            }
            slider.pointer_up().await;
            for push in join_all(pushes).await {
                push?;
            }
            drop(slider);
            printer.await?;
        }
        Command::Step {
            channel,
            cc,
            step,
            presses,
            policy,
        } => {
            let factory = match policy {
                Some(policy) => factory.with_initial_index_policy(policy),
                None => factory,
            };
            let button = factory
                .step_button(ControlAttributes::new(channel, cc).with_step(step))
                .await;
            let printer = spawn_printer(button.subscribe_events());
            if let Some(fetch) = button.attach().await {
                fetch.await?;
            }

            let mut pushes = Vec::with_capacity(presses);
            for _ in 0..presses {
                pushes.extend(button.activate().await);
            }
            for push in join_all(pushes).await {
                push?;
            }
            drop(button);
            printer.await?;
        }
    }

    reporter.ensure_none()
}

/// Prints every control event as one JSON line until the control is dropped.
fn spawn_printer(events: broadcast::Receiver<ControlEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = BroadcastStream::new(events);
        while let Some(event) = events.next().await {
            match event.map_err(anyhow::Error::from).and_then(|event| {
                serde_json::to_string(&event).map_err(anyhow::Error::from)
            }) {
                Ok(line) => println!("{line}"),
                Err(error) => warn!(%error, "event not printed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use client_core::{ControlError, Operation};
    use shared::domain::ControlKind;

    use super::*;

    #[test]
    fn parses_a_slide_with_stops() {
        let cli = Cli::try_parse_from([
            "ccctl", "--origin", "http://synth:8080", "slide", "--channel", "1", "--cc", "7",
            "--step", "lo,mid,hi", "0.1", "0.4", "0.9",
        ])
        .expect("valid command line");
        assert_eq!(cli.origin.as_deref(), Some("http://synth:8080"));
        match cli.command {
            Command::Slide { step, ratios, vertical, .. } => {
                assert_eq!(step.as_deref(), Some("lo,mid,hi"));
                assert_eq!(ratios, vec![0.1, 0.4, 0.9]);
                assert!(!vertical);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_step_policy() {
        let cli = Cli::try_parse_from([
            "ccctl", "step", "--channel", "1", "--cc", "20", "--step", "off,on", "--presses",
            "3", "--policy", "nearest",
        ])
        .expect("valid command line");
        match cli.command {
            Command::Step { presses, policy, .. } => {
                assert_eq!(presses, 3);
                assert_eq!(policy, Some(InitialIndexPolicy::NearestStop));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn slide_needs_at_least_one_position() {
        assert!(Cli::try_parse_from(["ccctl", "slide", "--channel", "1", "--cc", "7"]).is_err());
    }

    #[test]
    fn counting_reporter_turns_failures_into_an_error() {
        let reporter = CountingReporter::default();
        assert!(reporter.ensure_none().is_ok());
        let error = ControlError::MissingIdentity;
        reporter.report(&ControlFailure {
            kind: ControlKind::StepButton,
            operation: Operation::Push,
            identity: None,
            error: &error,
        });
        assert!(reporter.ensure_none().is_err());
    }
}
