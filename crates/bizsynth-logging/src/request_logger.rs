use colored::Colorize;

use crate::safe_truncate;

const MAX_BODY_CHARS: usize = 5000;

/// Log a gateway request for debugging (console output)
pub fn log_request(backend: &str, url: &str, body: &serde_json::Value, verbose: bool) {
    if !verbose {
        return;
    }

    println!("\n{}", "═".repeat(80).bright_cyan());
    println!("{}", format!("🔍 GATEWAY REQUEST [{}]", backend).bright_cyan().bold());
    println!("{}", "═".repeat(80).bright_cyan());
    println!("{}: {}", "URL".bright_yellow(), url);

    println!("\n{}", "Request Body:".bright_yellow());
    match serde_json::to_string_pretty(body) {
        Ok(json) => print_truncated(&json),
        Err(e) => println!("{}", format!("Error serializing request: {}", e).red()),
    }

    println!("{}", "═".repeat(80).bright_cyan());
    println!();
}

/// Log a gateway response for debugging (console output)
pub fn log_response(backend: &str, status: u16, body: &str, latency_ms: u64, verbose: bool) {
    if !verbose {
        return;
    }

    println!("\n{}", "═".repeat(80).bright_green());
    println!("{}", format!("📥 GATEWAY RESPONSE [{}]", backend).bright_green().bold());
    println!("{}", "═".repeat(80).bright_green());
    println!("{}: {}", "Status".bright_yellow(), status);
    println!("{}: {} ms", "Latency".bright_yellow(), latency_ms);

    println!("\n{}", "Response Body:".bright_yellow());
    // Try to pretty-print JSON, fall back to raw text
    match serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
    {
        Some(pretty) => print_truncated(&pretty),
        None => print_truncated(body),
    }

    println!("{}", "═".repeat(80).bright_green());
    println!();
}

fn print_truncated(text: &str) {
    if text.chars().count() > MAX_BODY_CHARS {
        println!("{}", safe_truncate(text, MAX_BODY_CHARS));
        println!("\n{}", format!("... (truncated, total {} bytes)", text.len()).bright_black());
    } else {
        println!("{}", text);
    }
}
