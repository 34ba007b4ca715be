//! The `omnichat` terminal client.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::{IsTerminal as _, Write as _};
use std::pin::pin;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use omnichat::core::{ChatEvent, SessionConfig};
use omnichat::render::{self, Renderer};
use omnichat::{GREETING, Settings};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const PREVIEW_CHARS: usize = 60;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env();
    debug!("{settings:?}");
    let model = settings
        .gemini_config()
        .ok()
        .map(|config| config.model().to_owned());
    let renderer = Renderer::new(colors_enabled());

    let (preview_tx, mut preview_rx) = mpsc::unbounded_channel();
    let mut chat = settings
        .into_chat_builder(SessionConfig::default())
        .with_greeting(GREETING)
        .on_event(move |event, transcript| {
            let ChatEvent::EntryUpdated(id) = event else {
                return;
            };
            if let Some(entry) = transcript.get(*id) {
                preview_tx
                    .send(render::preview(entry.text(), PREVIEW_CHARS))
                    .ok();
            }
        })
        .build();

    println!("{}", renderer.header(model.as_deref()));
    for entry in chat.transcript().entries() {
        println!("{}", renderer.entry(entry));
    }
    if let Some(err) = chat.error() {
        println!("{}\n", renderer.banner(err));
    }

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let mut stdin = io::BufReader::new(io::stdin()).lines();

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let line = select! {
            line = stdin.next_line() => match line {
                Ok(line) => line,
                Err(err) => {
                    error!("error reading input: {err}");
                    None
                }
            },
            _ = signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        if !chat.can_submit(&line) {
            continue;
        }

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🤔 Thinking...");

        let outcome = {
            let mut submit = pin!(chat.submit(&line));
            loop {
                progress_bar.inc(1);
                select! {
                    result = &mut submit => break Some(result),
                    Some(preview) = preview_rx.recv() => {
                        progress_bar.set_message(preview);
                    }
                    _ = signal::ctrl_c() => break None,
                    _ = sleep(Duration::from_millis(100)) => {}
                }
            }
        };

        // Finish the progress bar before printing anything else.
        progress_bar.finish_and_clear();
        while preview_rx.try_recv().is_ok() {}

        match outcome {
            Some(Ok(id)) => {
                if let Some(entry) = chat.transcript().get(id) {
                    println!("{}", renderer.entry(entry));
                }
            }
            Some(Err(err)) => println!("{}\n", renderer.banner(&err)),
            None => {
                chat.discard_interrupted();
                println!("{}\n", renderer.note("Response cancelled."));
            }
        }
    }
}

#[inline]
fn colors_enabled() -> bool {
    std::io::stdout().is_terminal() && env::var_os("NO_COLOR").is_none()
}
