// mcpsh-client/src/io.rs
//
// Presenter for the four interactive output events: request, response,
// notification and error blocks. Output always uses CRLF line endings so
// blocks render correctly while the repl holds the terminal in raw mode.
// Write failures are ignored; there is nowhere left to report them.
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::queue;
use mcpsh_common::MCPNotification;
use serde_json::Value;
use std::fmt;
use std::io::Write;

pub fn print_request(request: &Value) {
    block(Color::Green, &format!("Request: {}", pretty(request)));
}

pub fn print_response(response: &Value) {
    block(Color::Blue, &format!("Response: {}", pretty(response)));
}

pub fn print_notification(notification: &MCPNotification) {
    let rendered = serde_json::to_value(notification)
        .map(|value| pretty(&value))
        .unwrap_or_else(|_| notification.method.clone());
    block(Color::Yellow, &format!("Notification: {}", rendered));
}

pub fn print_error(error: &dyn fmt::Display) {
    let mut stderr = std::io::stderr();
    write_block(&mut stderr, Color::Red, &format!("Error: {}", error));
}

pub fn print_blank() {
    let mut stdout = std::io::stdout();
    let _ = queue!(stdout, Print("\r\n"));
    let _ = stdout.flush();
}

// Candidate listing for ambiguous Tab completion.
pub fn print_candidates(candidates: &[&str]) {
    let mut stdout = std::io::stdout();
    let _ = queue!(stdout, Print(candidates.join("    ")), Print("\r\n"));
    let _ = stdout.flush();
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn block(color: Color, text: &str) {
    let mut stdout = std::io::stdout();
    write_block(&mut stdout, color, text);
}

fn write_block(out: &mut impl Write, color: Color, text: &str) {
    let _ = queue!(out, SetForegroundColor(color));
    for line in text.split('\n') {
        let _ = queue!(out, Print(line), Print("\r\n"));
    }
    let _ = queue!(out, ResetColor);
    let _ = out.flush();
}
