use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

use crate::types::{DirectoryEntry, ScanResult, ScanTarget, TlsStatus};

/// Human-readable report on stdout.
pub fn print_report(target: &ScanTarget, result: &ScanResult) {
    println!();
    println!("{}", format!("=== FTP audit: {} ===", target.addr()).bold());

    if !result.port_open {
        println!("{}", format!("[-] Port {} is closed or filtered", target.port).red());
        print_errors(result);
        print_elapsed(result);
        return;
    }
    println!("{}", format!("[+] Port {} is open", target.port).green());

    match &result.tls {
        TlsStatus::Established => println!("{}", "[+] TLS established".green()),
        TlsStatus::Failed(reason) => {
            println!("{}", format!("[!] TLS negotiation failed: {reason}").yellow())
        }
        TlsStatus::NotAttempted => {}
    }

    if let Some(banner) = &result.banner {
        println!("{}", format!("[<] {}", banner.trim()).cyan());
    }

    if result.login_succeeded {
        println!(
            "{}",
            format!("[+] Login succeeded ({})", describe_credentials(target)).green()
        );
    } else {
        println!(
            "{}",
            format!("[-] Login failed ({})", describe_credentials(target)).red()
        );
    }

    if result.login_succeeded {
        print_entries(&result.entries);
        print_max_rights(result);
        print_write_access(result);
    }

    print_errors(result);
    print_elapsed(result);
}

fn print_entries(entries: &[DirectoryEntry]) {
    if entries.is_empty() {
        println!("{}", "[*] No entries in the login directory".cyan());
        return;
    }

    println!();
    println!("{}", "=== Directory listing ===".bold());
    let path_width = entries.iter().map(|e| e.path.len()).max().unwrap_or(4);
    println!(
        "{}",
        format!("  {:<4} {:>4} {:<4} {:<5} {:<path_width$}", "type", "mode", "read", "write", "path")
            .dimmed()
    );
    for entry in entries {
        // pad plain cells first so the colour codes cannot skew the columns
        let kind = format!("{:<4}", if entry.is_directory { "dir" } else { "file" });
        let mode = format!("{:>4}", mode_label(entry.unix_mode));
        let read = format!("{:<4}", if entry.readable { "yes" } else { "no" });
        let write = format!("{:<5}", if entry.writable { "yes" } else { "no" });
        let path = format!("{:<path_width$}", entry.path);
        println!(
            "  {} {} {} {} {}",
            kind,
            mode,
            if entry.readable { read.green() } else { read.dimmed() },
            if entry.writable { write.red().bold() } else { write.dimmed() },
            if entry.is_directory { path.cyan() } else { path.normal() },
        );
    }
}

fn print_max_rights(result: &ScanResult) {
    let mut parts = Vec::new();
    if let Some(mode) = result.max_rights.directories {
        parts.push(format!("directories {mode:03}"));
    }
    if let Some(mode) = result.max_rights.files {
        parts.push(format!("files {mode:03}"));
    }
    if !parts.is_empty() {
        println!(
            "{}",
            format!("[*] Broadest top-level modes: {}", parts.join(", ")).cyan()
        );
    }
}

fn print_write_access(result: &ScanResult) {
    let Some(access) = &result.write_access else {
        return;
    };
    println!();
    println!("{}", "=== Write access (login directory) ===".bold());
    print_access_line("create directory", access.create_dir);
    print_access_line("delete directory", access.delete_dir);
    print_access_line("upload file", access.upload_file);
    print_access_line("delete file", access.delete_file);
}

fn print_access_line(what: &str, allowed: bool) {
    if allowed {
        println!("{}", format!("[!] {what}: allowed").red().bold());
    } else {
        println!("{}", format!("[-] {what}: denied").dimmed());
    }
}

fn print_errors(result: &ScanResult) {
    for error in &result.errors {
        println!("{}", format!("[!] {error}").yellow());
    }
}

fn print_elapsed(result: &ScanResult) {
    println!("{}", format!("[*] Scan finished in {} ms", result.elapsed_ms).cyan());
}

fn describe_credentials(target: &ScanTarget) -> String {
    match &target.username {
        Some(user) if !user.is_empty() => format!("user '{user}'"),
        _ => "anonymous".to_string(),
    }
}

fn mode_label(mode: Option<u16>) -> String {
    match mode {
        Some(mode) => format!("{mode:03}"),
        None => "-".to_string(),
    }
}

/// Machine-readable variant for `--json`.
pub fn print_json(result: &ScanResult) -> Result<()> {
    let rendered = serde_json::to_string_pretty(result).context("failed to serialize results")?;
    println!("{rendered}");
    Ok(())
}

pub fn write_json(path: &Path, result: &ScanResult) -> Result<()> {
    let rendered = serde_json::to_string_pretty(result).context("failed to serialize results")?;
    fs::write(path, rendered)
        .with_context(|| format!("failed to write results to '{}'", path.display()))?;
    Ok(())
}
