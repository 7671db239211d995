use anyhow::Result;
use clap::Parser;
use colored::*;
use std::io::Write;
use tokio::time::Duration;

use ftpaudit::cli::Cli;
use ftpaudit::report;
use ftpaudit::{ScanOptions, ScanTarget, Scanner};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Cli::parse();

    if !args.json {
        display_banner();
    }

    let target = match args.host {
        Some(host) => {
            let mut target = ScanTarget::new(host, args.port);
            target.username = args.user;
            target.password = args.password;
            target
        }
        None => prompt_target(args.port)?,
    };

    let opts = ScanOptions {
        timeout: Duration::from_secs(args.timeout),
        security: args.security,
        verify_tls: args.verify_tls,
        max_depth: args.max_depth,
        max_entries: args.max_entries,
    };

    if !args.json {
        println!("{}", format!("[*] Auditing {}", target.addr()).cyan());
    }

    let result = Scanner::new(opts).scan(&target).await;

    if args.json {
        report::print_json(&result)?;
    } else {
        report::print_report(&target, &result);
    }

    if let Some(path) = &args.output {
        report::write_json(path, &result)?;
        if !args.json {
            println!("{}", format!("[+] Results saved to '{}'", path.display()).green());
        }
    }

    Ok(())
}

fn display_banner() {
    println!("{}", "╔═══════════════════════════════════════════════════════════╗".cyan());
    println!("{}", "║   ftpaudit - FTP/FTPS misconfiguration audit              ║".cyan());
    println!("{}", "║   Anonymous access, modes and write checks over one host  ║".cyan());
    println!("{}", "╚═══════════════════════════════════════════════════════════╝".cyan());
    println!();
}

fn prompt_target(default_port: u16) -> Result<ScanTarget> {
    let host = prompt_required("Target host")?;
    let port: u16 = loop {
        let input = prompt_default("FTP port", &default_port.to_string())?;
        if let Ok(p) = input.parse() {
            break p;
        }
        println!("{}", "Invalid port. Try again.".yellow());
    };
    let user = prompt("Username (empty for anonymous)")?;

    let mut target = ScanTarget::new(host, port);
    if !user.is_empty() {
        let password = prompt("Password")?;
        target.username = Some(user);
        target.password = Some(password);
    }
    Ok(target)
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", format!("{}: ", msg).cyan().bold());
    std::io::stdout().flush()?;
    let mut s = String::new();
    std::io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

fn prompt_required(msg: &str) -> Result<String> {
    loop {
        let value = prompt(msg)?;
        if !value.is_empty() {
            return Ok(value);
        }
        println!("{}", "This field is required.".yellow());
    }
}

fn prompt_default(msg: &str, default: &str) -> Result<String> {
    print!("{}", format!("{} [{}]: ", msg, default).cyan().bold());
    std::io::stdout().flush()?;
    let mut s = String::new();
    std::io::stdin().read_line(&mut s)?;
    let trimmed = s.trim();
    Ok(if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    })
}
