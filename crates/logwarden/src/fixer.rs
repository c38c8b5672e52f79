//! Suggested-fix execution.
//!
//! Interactive runs may offer to execute the shell command a finding's
//! suggested fix carries. The command is shown verbatim, confirmed, run
//! through the shell, and its real exit code and output are reported
//! without reinterpretation.

use crate::output;
use console::style;
use logwarden_common::SuggestedFix;
use std::process::Command;

/// Offer a fix to the user and run it if confirmed.
///
/// Returns `true` iff the command was executed and exited zero.
pub fn apply_fix(fix: &SuggestedFix) -> bool {
    let Some(command) = fix.command.as_deref().filter(|c| !c.is_empty()) else {
        return false;
    };

    println!("\n{} {}", style("Suggested fix:").yellow().bold(), fix.description);
    println!("{} {}", style("Command:").cyan().bold(), command);
    if fix.requires_sudo {
        println!("{}", style("Note: this command requires elevated privileges.").red());
    }

    if !output::confirm("Execute this command?", false) {
        println!("{}", style("Skipped.").dim());
        return false;
    }

    println!("{}", style("Executing...").dim());
    match Command::new("sh").arg("-c").arg(command).output() {
        Ok(result) if result.status.success() => {
            println!("{}", style("Success.").green().bold());
            let stdout = String::from_utf8_lossy(&result.stdout);
            if !stdout.trim().is_empty() {
                println!("{stdout}");
            }
            true
        }
        Ok(result) => {
            println!(
                "{} (exit code {})",
                style("Command failed").red().bold(),
                result.status.code().unwrap_or(-1)
            );
            let stderr = String::from_utf8_lossy(&result.stderr);
            if !stderr.trim().is_empty() {
                println!("{stderr}");
            }
            false
        }
        Err(e) => {
            println!("{} {e}", style("Execution error:").red().bold());
            false
        }
    }
}
