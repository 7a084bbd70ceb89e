// mcpsh-client/src/repl.rs
//
// The host loop: a raw-mode line editor on one task, served by a single
// select! together with the server-notification channel. Print blocks
// never cross a suspension point, so a notification, a response and the
// prompt redraw can interleave as whole blocks but never corrupt each
// other.
use crossterm::cursor::MoveToColumn;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::queue;
use futures::StreamExt;
use mcpsh_common::{MCPNotification, ServerCapabilities};
use std::io::{Stdout, Write};
use tokio::sync::mpsc;
use tracing::warn;

use crate::client::McpClient;
use crate::complete::{complete, CompletionSchema};
use crate::dispatch;
use crate::io;
use crate::query::parse_query;

const PROMPT_LABEL: &str = "> ";

#[derive(Debug, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

// --- Prompt editor ---

// Owns the visible prompt line. Everything that touches the display goes
// through `clear_line`/`redraw`, which is what lets the notification path
// suspend and restore the operator's in-progress input.
struct PromptEditor {
    buffer: String,
    cursor: usize, // in chars
    history: Vec<String>,
    history_index: Option<usize>,
    draft: String,
}

impl PromptEditor {
    fn new() -> Self {
        PromptEditor {
            buffer: String::new(),
            cursor: 0,
            history: Vec::new(),
            history_index: None,
            draft: String::new(),
        }
    }

    fn byte_index(&self) -> usize {
        self.buffer
            .char_indices()
            .nth(self.cursor)
            .map(|(index, _)| index)
            .unwrap_or(self.buffer.len())
    }

    fn insert(&mut self, c: char) {
        let index = self.byte_index();
        self.buffer.insert(index, c);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let index = self.byte_index();
            self.buffer.remove(index);
        }
    }

    fn set_line(&mut self, line: &str) {
        self.buffer = line.to_string();
        self.cursor = self.buffer.chars().count();
    }

    fn take_line(&mut self) -> String {
        self.cursor = 0;
        self.history_index = None;
        std::mem::take(&mut self.buffer)
    }

    fn push_history(&mut self, line: String) {
        if !line.trim().is_empty() {
            self.history.push(line);
        }
    }

    fn history_previous(&mut self) {
        let next = match self.history_index {
            None if self.history.is_empty() => return,
            None => {
                self.draft = self.buffer.clone();
                self.history.len() - 1
            }
            Some(0) => 0,
            Some(index) => index - 1,
        };
        self.history_index = Some(next);
        let line = self.history[next].clone();
        self.set_line(&line);
    }

    fn history_next(&mut self) {
        match self.history_index {
            None => {}
            Some(index) if index + 1 < self.history.len() => {
                self.history_index = Some(index + 1);
                let line = self.history[index + 1].clone();
                self.set_line(&line);
            }
            Some(_) => {
                self.history_index = None;
                let draft = std::mem::take(&mut self.draft);
                self.set_line(&draft);
            }
        }
    }

    fn clear_line(&self, out: &mut Stdout) -> std::io::Result<()> {
        queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        out.flush()
    }

    fn redraw(&self, out: &mut Stdout) -> std::io::Result<()> {
        let column = (PROMPT_LABEL.chars().count() + self.cursor) as u16;
        queue!(
            out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(PROMPT_LABEL),
            Print(&self.buffer),
            MoveToColumn(column)
        )?;
        out.flush()
    }
}

// --- Session ---

// Owns everything the read loop touches: the protocol client, the
// capability set captured at connect time, the completion schema and the
// prompt. Notifications reach the display only through `show_notification`.
struct Session {
    client: McpClient,
    capabilities: ServerCapabilities,
    schema: CompletionSchema,
    editor: PromptEditor,
}

/// Run the interactive loop until the operator quits, then tear the
/// client down. The terminal is restored before returning on every path.
pub async fn run(
    client: McpClient,
    notifications: mpsc::UnboundedReceiver<MCPNotification>,
) -> std::io::Result<()> {
    let capabilities = client.capabilities().clone();
    let mut session = Session {
        client,
        capabilities,
        schema: CompletionSchema::default(),
        editor: PromptEditor::new(),
    };
    let mut notifications = notifications;
    let mut out = std::io::stdout();

    if let Err(e) = terminal::enable_raw_mode() {
        session.client.shutdown().await;
        return Err(e);
    }
    let result = session.read_loop(&mut notifications, &mut out).await;
    let restore = terminal::disable_raw_mode();
    session.client.shutdown().await;
    result.and(restore)
}

impl Session {
    async fn read_loop(
        &mut self,
        notifications: &mut mpsc::UnboundedReceiver<MCPNotification>,
        out: &mut Stdout,
    ) -> std::io::Result<()> {
        let mut events = EventStream::new();
        self.editor.redraw(out)?;

        loop {
            tokio::select! {
                maybe_event = events.next() => {
                    let key = match maybe_event {
                        None => break, // input stream closed
                        Some(Err(e)) => {
                            warn!("terminal event error: {}", e);
                            break;
                        }
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => key,
                        Some(Ok(_)) => continue, // resize etc.
                    };
                    if self.handle_key(key, notifications, &mut events, out).await? == Flow::Quit {
                        break;
                    }
                }
                Some(notification) = notifications.recv() => {
                    self.show_notification(&notification, out)?;
                }
            }
        }
        Ok(())
    }

    async fn handle_key(
        &mut self,
        key: KeyEvent,
        notifications: &mut mpsc::UnboundedReceiver<MCPNotification>,
        events: &mut EventStream,
        out: &mut Stdout,
    ) -> std::io::Result<Flow> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => {
                return Ok(Flow::Quit)
            }
            (KeyCode::Char('d'), m) if m.contains(KeyModifiers::CONTROL) => {
                if self.editor.buffer.is_empty() {
                    return Ok(Flow::Quit);
                }
            }
            (KeyCode::Char(c), modifiers)
                if modifiers.is_empty() || modifiers == KeyModifiers::SHIFT =>
            {
                self.editor.insert(c);
                self.editor.redraw(out)?;
            }
            (KeyCode::Backspace, _) => {
                self.editor.backspace();
                self.editor.redraw(out)?;
            }
            (KeyCode::Left, _) => {
                if self.editor.cursor > 0 {
                    self.editor.cursor -= 1;
                    self.editor.redraw(out)?;
                }
            }
            (KeyCode::Right, _) => {
                if self.editor.cursor < self.editor.buffer.chars().count() {
                    self.editor.cursor += 1;
                    self.editor.redraw(out)?;
                }
            }
            (KeyCode::Home, _) => {
                self.editor.cursor = 0;
                self.editor.redraw(out)?;
            }
            (KeyCode::End, _) => {
                self.editor.cursor = self.editor.buffer.chars().count();
                self.editor.redraw(out)?;
            }
            (KeyCode::Up, _) => {
                self.editor.history_previous();
                self.editor.redraw(out)?;
            }
            (KeyCode::Down, _) => {
                self.editor.history_next();
                self.editor.redraw(out)?;
            }
            (KeyCode::Tab, _) => self.handle_tab(out)?,
            (KeyCode::Enter, _) => return self.submit(notifications, events, out).await,
            _ => {}
        }
        Ok(Flow::Continue)
    }

    async fn submit(
        &mut self,
        notifications: &mut mpsc::UnboundedReceiver<MCPNotification>,
        events: &mut EventStream,
        out: &mut Stdout,
    ) -> std::io::Result<Flow> {
        queue!(out, Print("\r\n"))?;
        out.flush()?;

        let line = self.editor.take_line();
        let trimmed = line.trim();
        if trimmed.is_empty() {
            self.editor.redraw(out)?;
            return Ok(Flow::Continue);
        }
        if trimmed == "quit" || trimmed == "q" {
            return Ok(Flow::Quit);
        }
        self.editor.push_history(line.clone());

        let flow = self.process_query(&line, notifications, events).await?;
        if flow == Flow::Quit {
            return Ok(Flow::Quit);
        }
        self.editor.redraw(out)?;
        Ok(Flow::Continue)
    }

    // Dispatch one query. The select! keeps the notification channel live
    // while the request is in flight, so pushes display immediately; they
    // are never queued behind the response. Ctrl+C abandons the in-flight
    // request (the future is dropped; the late response is discarded by
    // the reader) and ends the session.
    async fn process_query(
        &mut self,
        line: &str,
        notifications: &mut mpsc::UnboundedReceiver<MCPNotification>,
        events: &mut EventStream,
    ) -> std::io::Result<Flow> {
        let query = match parse_query(line) {
            Ok(query) => query,
            Err(e) => {
                io::print_error(&e);
                return Ok(Flow::Continue);
            }
        };

        let request = dispatch::dispatch(query, &self.capabilities, &self.client);
        tokio::pin!(request);

        loop {
            tokio::select! {
                result = &mut request => {
                    if let Err(e) = result {
                        io::print_error(&e);
                    }
                    return Ok(Flow::Continue);
                }
                Some(notification) = notifications.recv() => {
                    io::print_blank();
                    io::print_notification(&notification);
                }
                maybe_event = events.next() => {
                    match maybe_event {
                        None => return Ok(Flow::Quit),
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            match (key.code, key.modifiers) {
                                (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => {
                                    io::print_error(&"interrupted, abandoning in-flight request");
                                    return Ok(Flow::Quit);
                                }
                                // Type-ahead: collect input for the next
                                // prompt without drawing it yet.
                                (KeyCode::Char(c), modifiers)
                                    if modifiers.is_empty()
                                        || modifiers == KeyModifiers::SHIFT =>
                                {
                                    self.editor.insert(c);
                                }
                                (KeyCode::Backspace, _) => self.editor.backspace(),
                                _ => {}
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn handle_tab(&mut self, out: &mut Stdout) -> std::io::Result<()> {
        let result = complete(&self.editor.buffer, &self.capabilities, &self.schema);
        match result.candidates.as_slice() {
            [] => {
                queue!(out, Print("\x07"))?; // bell
                out.flush()
            }
            [only] => {
                self.editor.set_line(*only);
                self.editor.redraw(out)
            }
            candidates => {
                let prefix = longest_common_prefix(candidates);
                if prefix.chars().count() > self.editor.buffer.trim_start().chars().count() {
                    self.editor.set_line(prefix);
                    self.editor.redraw(out)
                } else {
                    self.editor.clear_line(out)?;
                    io::print_candidates(candidates);
                    self.editor.redraw(out)
                }
            }
        }
    }

    // The interleaving sequence: capture (the editor already holds the
    // in-progress line), suspend, separator, block, restore. No await in
    // here, so the block is atomic.
    fn show_notification(
        &self,
        notification: &MCPNotification,
        out: &mut Stdout,
    ) -> std::io::Result<()> {
        self.editor.clear_line(out)?;
        io::print_blank();
        io::print_notification(notification);
        self.editor.redraw(out)
    }
}

fn longest_common_prefix<'a>(candidates: &[&'a str]) -> &'a str {
    let first = match candidates.first() {
        Some(first) => *first,
        None => return "",
    };
    let mut end = first.len();
    for candidate in &candidates[1..] {
        end = first
            .bytes()
            .take(end)
            .zip(candidate.bytes())
            .take_while(|(a, b)| a == b)
            .count();
    }
    &first[..end]
}
