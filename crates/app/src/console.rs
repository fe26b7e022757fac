//! Line-oriented front end.
//!
//! Reads commands from stdin and renders module lists, download progress,
//! toasts and chat replies to stdout. Background events (poll ticks, fetch
//! completions, toasts, finished downloads) are multiplexed with input in a
//! single `select!` loop, so every state change happens on this task.

use async_trait::async_trait;
use chrono::Utc;
use services::chat::ChatController;
use services::downloads::{
    ActionOutcome, ConfirmGate, DownloadEvent, DownloadOrchestrator, Rejection,
};
use services::toast::{Severity, Toast, ToastEvent, ToastId};
use shared::chat::AttachedFile;
use shared::format::{format_bytes, format_eta, format_speed};
use shared::modules::{ModuleDescriptor, ModuleState};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};

const HELP: &str = "\
Commands:
  models [category] [search]   list models
  download <id>                start a download
  cancel <id>                  cancel a running download
  delete <id>                  delete a downloaded model
  use <id>                     chat with a downloaded model
  new                          start a new chat
  history                      list saved chats
  open <id>                    reopen a saved chat
  forget <id>                  delete a saved chat
  attach <path>                attach a file to the next message
  say <text>                   send a message (plain text works too)
  toasts                       show live notifications
  dismiss <toast id>           dismiss a notification
  help                         show this help
  quit                         exit";

type StdinLines = Lines<BufReader<Stdin>>;

/// Asks yes/no on stdin.
struct StdinConfirm<'a> {
    lines: &'a mut StdinLines,
}

#[async_trait]
impl ConfirmGate for StdinConfirm<'_> {
    async fn confirm(&mut self, prompt: &str) -> bool {
        println!("{} [y/N]", prompt);
        match self.lines.next_line().await {
            Ok(Some(answer)) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}

enum Input {
    Line(Option<String>),
    Download(DownloadEvent),
    Toast(ToastEvent),
    Ready(ModuleDescriptor),
    Idle,
}

pub struct Console {
    downloads: DownloadOrchestrator,
    chat: ChatController,
    toast_rx: broadcast::Receiver<ToastEvent>,
    ready_rx: mpsc::UnboundedReceiver<ModuleDescriptor>,
    lines: StdinLines,
    /// Attachments sent with the next message
    pending_files: Vec<AttachedFile>,
}

impl Console {
    pub fn new(
        downloads: DownloadOrchestrator,
        chat: ChatController,
        ready_rx: mpsc::UnboundedReceiver<ModuleDescriptor>,
    ) -> Self {
        let toast_rx = downloads.toasts().subscribe();
        Self {
            downloads,
            chat,
            toast_rx,
            ready_rx,
            lines: BufReader::new(tokio::io::stdin()).lines(),
            pending_files: Vec::new(),
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.chat.load_history();
        self.downloads.load_modules().await;
        self.chat.sync_modules(&self.downloads.snapshot());
        self.render_models("all", "");
        println!("Type `help` for commands.");

        loop {
            let input = tokio::select! {
                line = self.lines.next_line() => Input::Line(line?),
                Some(event) = self.downloads.next_event() => Input::Download(event),
                toast = self.toast_rx.recv() => match toast {
                    Ok(event) => Input::Toast(event),
                    Err(RecvError::Lagged(n)) => {
                        tracing::debug!(skipped = n, "toast view lagged");
                        Input::Idle
                    }
                    Err(RecvError::Closed) => Input::Idle,
                },
                Some(module) = self.ready_rx.recv() => Input::Ready(module),
            };

            match input {
                Input::Line(None) => break,
                Input::Line(Some(line)) => {
                    if !self.handle_line(line.trim()).await {
                        break;
                    }
                }
                Input::Download(event) => {
                    let fetched = matches!(event, DownloadEvent::SnapshotFetched { .. });
                    self.downloads.handle_event(event);
                    if fetched {
                        self.chat.sync_modules(&self.downloads.snapshot());
                        self.render_progress();
                    }
                }
                Input::Toast(ToastEvent::Shown(toast)) => render_toast(&toast),
                Input::Toast(ToastEvent::Removed { .. }) | Input::Idle => {}
                Input::Ready(module) => self.chat.on_module_ready(&module),
            }
        }

        self.downloads.dispose();
        Ok(())
    }

    /// Returns false when the user asked to quit.
    async fn handle_line(&mut self, line: &str) -> bool {
        if line.is_empty() {
            return true;
        }
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };

        match command.to_lowercase().as_str() {
            "quit" | "exit" => return false,
            "help" => println!("{}", HELP),
            "models" => {
                let mut args = rest.splitn(2, char::is_whitespace);
                let category = args.next().filter(|c| !c.is_empty()).unwrap_or("all");
                let query = args.next().unwrap_or("").trim();
                self.downloads.refresh().await;
                self.render_models(category, query);
            }
            "download" => {
                let outcome = self.downloads.request_download(rest).await;
                report(&outcome);
            }
            "cancel" => {
                let mut gate = StdinConfirm {
                    lines: &mut self.lines,
                };
                let outcome = self.downloads.cancel_download(rest, &mut gate).await;
                report(&outcome);
            }
            "delete" => {
                let mut gate = StdinConfirm {
                    lines: &mut self.lines,
                };
                let outcome = self.downloads.delete_module(rest, &mut gate).await;
                report(&outcome);
            }
            "use" => match self.downloads.snapshot().get(rest) {
                Some(module) => {
                    self.chat.select_module(module);
                }
                None => println!("Unknown model: {}", rest),
            },
            "new" => {
                self.chat.new_chat();
                println!("Started a new chat.");
            }
            "history" => self.render_history(),
            "open" => {
                if self.chat.open_chat(rest) {
                    self.render_transcript();
                } else {
                    println!("No saved chat with id {}", rest);
                }
            }
            "forget" => {
                if self.chat.forget_chat(rest) {
                    println!("Deleted chat {}", rest);
                } else {
                    println!("No saved chat with id {}", rest);
                }
            }
            "attach" => {
                let path = Path::new(rest);
                match attachment_from_path(path) {
                    Some(file) if path.is_file() => {
                        println!("Attached {} ({})", file.name, file.mime_type);
                        self.pending_files.push(file);
                    }
                    _ => println!("No such file: {}", rest),
                }
            }
            "toasts" => {
                for toast in self.downloads.toasts().list() {
                    render_toast(&toast);
                }
            }
            "dismiss" => match rest.parse::<ToastId>() {
                Ok(id) => {
                    if !self.downloads.toasts().dismiss(id) {
                        println!("No notification #{}", id);
                    }
                }
                Err(_) => println!("Usage: dismiss <toast id>"),
            },
            "say" => self.send(rest).await,
            _ => self.send(line).await,
        }

        self.chat.sync_modules(&self.downloads.snapshot());
        true
    }

    async fn send(&mut self, text: &str) {
        if let Some(module) = self.chat.selected() {
            println!("... asking {}", module.display_name);
        }
        let files = std::mem::take(&mut self.pending_files);
        match self.chat.send_message(text, files).await {
            Ok(reply) => println!("{}\n", reply.content),
            Err(e) => println!("! {}", e),
        }
    }

    fn render_models(&self, category: &str, query: &str) {
        let snapshot = self.downloads.snapshot();
        let categories = snapshot.categories();
        if !categories.is_empty() {
            println!("Categories: all, {}", categories.join(", "));
        }

        let selected = self.chat.selected().map(|m| m.id.as_str());
        for module in snapshot.filter(category, query) {
            let marker = if Some(module.id.as_str()) == selected { "*" } else { " " };
            let badge = if module.recommended { " (recommended)" } else { "" };
            println!(
                "{} {:<28} {:<32} {:>9}  {}{}",
                marker,
                module.id,
                module.display_name,
                module.size_label(),
                state_label(module),
                badge
            );
        }

        println!(
            "{} models, {} downloaded, {} downloading",
            snapshot.len(),
            snapshot.downloaded_count(),
            snapshot.downloading_count()
        );
        if let Some(space) = self.downloads.disk_space() {
            println!(
                "Disk: {} free of {}",
                format_bytes(space.available),
                format_bytes(space.total)
            );
        }
    }

    fn render_progress(&self) {
        let snapshot = self.downloads.snapshot();
        for module in snapshot.modules().iter().filter(|m| m.is_downloading) {
            println!("  {} {}", module.display_name, state_label(module));
        }
    }

    fn render_history(&self) {
        let chats = self.chat.history().list();
        if chats.is_empty() {
            println!("No saved chats yet.");
            return;
        }
        let now = Utc::now();
        let mut group = String::new();
        for chat in chats {
            let label = chat.age_label(now);
            if label != group {
                println!("{}", label);
                group = label;
            }
            println!("  {}  {}", chat.id, chat.title);
        }
    }

    fn render_transcript(&self) {
        for message in self.chat.messages() {
            println!("{:?}: {}", message.role, message.content);
            for file in &message.files {
                println!("    [file] {}", file.name);
            }
        }
    }
}

fn state_label(module: &ModuleDescriptor) -> String {
    match module.state() {
        ModuleState::Downloaded => "downloaded".to_string(),
        ModuleState::NotDownloaded => "not downloaded".to_string(),
        ModuleState::Failed => format!("failed: {}", module.failure().unwrap_or_default()),
        ModuleState::Downloading => {
            let progress = module.progress().unwrap_or(0);
            let filled = (progress / 10) as usize;
            let mut label = format!(
                "[{}{}] {}%",
                "#".repeat(filled),
                ".".repeat(10 - filled),
                progress
            );
            if let Some(status) = &module.download_status {
                if let Some(speed) = status.speed {
                    label.push_str(&format!("  {}", format_speed(speed)));
                }
                if let Some(eta) = status.eta {
                    label.push_str(&format!("  ETA {}", format_eta(eta)));
                }
            }
            label
        }
    }
}

fn render_toast(toast: &Toast) {
    let tag = match toast.severity {
        Severity::Success => "ok",
        Severity::Error => "error",
        Severity::Info => "info",
        Severity::Warning => "warn",
    };
    println!("[{}] {} (#{})", tag, toast.text, toast.id);
}

fn report(outcome: &ActionOutcome) {
    tracing::debug!(?outcome, "action finished");
    if let Some(line) = outcome_line(outcome) {
        println!("{}", line);
    }
}

/// Console-only feedback; everything else already produced a toast.
fn outcome_line(outcome: &ActionOutcome) -> Option<&'static str> {
    match outcome {
        ActionOutcome::Rejected(Rejection::Declined) => Some("Cancelled."),
        ActionOutcome::Rejected(Rejection::UnknownModule) => {
            Some("Use `models` to list the available ids.")
        }
        _ => None,
    }
}

fn attachment_from_path(path: &Path) -> Option<AttachedFile> {
    let name = path.file_name()?.to_string_lossy().to_string();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let mime = match extension.as_str() {
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    };
    Some(AttachedFile {
        name,
        mime_type: mime.to_string(),
        preview: None,
    })
}
