use crate::core::message::{Message, Role};
use colored::*;
use std::io::Write;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    print!("{}", text.yellow().bold());
    let _ = std::io::stdout().flush();
}

/// Write a streamed fragment without waiting for a newline
pub fn print_fragment(text: &str) {
    print!("{}", text);
    let _ = std::io::stdout().flush();
}

pub fn print_message(message: &Message) {
    let label = match message.role {
        Role::User => "You: ".yellow().bold(),
        Role::Assistant => "Assistant: ".blue().bold(),
    };
    println!("{}{}", label, message.content);
}
