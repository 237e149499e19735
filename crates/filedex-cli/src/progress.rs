use std::sync::mpsc::Receiver;

use indicatif::{ProgressBar, ProgressStyle};

use filedex_core::jobs::{DupMessage, IndexMessage};

/// Consume an index job's progress stream until the worker exits.
/// Receiver disconnection is the reliable terminal signal; Done/Error
/// events can be dropped by the bounded queue under load.
pub fn watch_index(rx: Receiver<IndexMessage>) {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message("Indexing...");
    pb.enable_steady_tick(std::time::Duration::from_millis(80));

    for message in rx {
        match message {
            IndexMessage::Progress(msg) => {
                pb.set_message(format!(
                    "Indexed {} entries ({})",
                    msg.indexed, msg.current_path
                ));
            }
            IndexMessage::Done(msg) => {
                pb.finish_and_clear();
                eprintln!("  \x1b[32m✓\x1b[0m Index complete: {} entries", msg.total);
            }
            IndexMessage::Error(msg) => {
                pb.finish_and_clear();
                eprintln!("  \x1b[31m✗\x1b[0m Index failed: {}", msg.message);
            }
        }
    }
    pb.finish_and_clear();
}

/// Consume a duplicate scan's progress stream until the worker exits.
pub fn watch_dup(rx: Receiver<DupMessage>) {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "  {spinner:.cyan} Hashing [{bar:30.cyan/dim}] {pos}/{len} candidates ({eta} remaining)",
        )
        .unwrap()
        .progress_chars("━╸─")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(80));

    for message in rx {
        match message {
            DupMessage::Progress(msg) => {
                if pb.length() != Some(msg.total as u64) {
                    pb.set_length(msg.total as u64);
                }
                pb.set_position(msg.done as u64);
            }
            DupMessage::Done(msg) => {
                pb.finish_and_clear();
                eprintln!(
                    "  \x1b[32m✓\x1b[0m Scan complete: {} candidates hashed",
                    msg.candidates
                );
            }
            DupMessage::Error(msg) => {
                pb.finish_and_clear();
                eprintln!("  \x1b[31m✗\x1b[0m Scan failed: {}", msg.message);
            }
        }
    }
    pb.finish_and_clear();
}
