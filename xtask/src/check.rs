use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

const DEVICE_TARGET: &str = "thumbv7em-none-eabihf";

/// Run one `cargo` invocation; `fatal` decides whether a failure stops the run.
fn step(label: &str, args: &[&str], fatal: bool) -> Result<bool> {
    println!("{}", format!("  Checking {label}...").cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run cargo for {label}"))?;

    if !output.status.success() {
        if fatal {
            eprintln!("{}", format!("  ✗ {label} failed").red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{label} failed");
        }
        eprintln!("{}", format!("  ⚠ {label} reported problems").yellow().bold());
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        println!();
        return Ok(false);
    }

    println!(
        "{}",
        format!("  ✓ {label} passed in {:.2}s", start.elapsed().as_secs_f64()).green()
    );
    println!();
    Ok(true)
}

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking playback builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    step("host workspace", &["check", "--workspace", "--all-targets"], true)?;

    // The device crates must stay no_std, with and without defmt logging.
    step(
        "platform (no_std)",
        &["check", "-p", "platform", "--target", DEVICE_TARGET, "--no-default-features"],
        true,
    )?;
    step(
        "playback (no_std)",
        &["check", "-p", "playback", "--target", DEVICE_TARGET, "--no-default-features"],
        true,
    )?;
    step(
        "playback (no_std + defmt)",
        &["check", "-p", "playback", "--target", DEVICE_TARGET, "--features", "defmt"],
        true,
    )?;

    step("clippy", &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"], false)?;
    if !step("formatting", &["fmt", "--all", "--check"], false)? {
        eprintln!("     Run 'cargo fmt --all' to fix");
        println!();
    }

    println!(
        "{}",
        format!("✓ All checks completed in {:.2}s", total_start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    println!();

    Ok(())
}
