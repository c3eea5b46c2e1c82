mod config;
mod dashboard;
mod db;
mod export;
mod import;
mod ipc;
mod logging;
mod model;
mod portal;
mod session;
mod store;

use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;

enum Event {
    Line(String),
    Tick,
    Eof,
}

fn main() {
    let config = config::Config::from_env();
    logging::init(&config.log_filter);

    let mut state = ipc::AppState::new(config.clone());
    if let Some(ws) = config.workspace.as_ref() {
        if let Err(e) = ipc::select_workspace(&mut state, ws) {
            tracing::error!(error = %e, "failed to open configured workspace");
        }
    }

    let (tx, rx) = mpsc::channel::<Event>();

    let line_tx = tx.clone();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line_tx.send(Event::Line(line)).is_err() {
                return;
            }
        }
        let _ = line_tx.send(Event::Eof);
    });

    let tick_every = config.tick_interval;
    thread::spawn(move || loop {
        thread::sleep(tick_every);
        if tx.send(Event::Tick).is_err() {
            return;
        }
    });

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "examd ready");
    let mut stdout = io::stdout();

    for event in rx {
        let line = match event {
            Event::Tick => {
                ipc::handle_tick(&mut state);
                continue;
            }
            Event::Eof => break,
            Event::Line(line) => line,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request line");
                let _ = writeln!(stdout, "{}", ipc::bad_json(e.to_string()));
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    tracing::info!("stdin closed, shutting down");
}
