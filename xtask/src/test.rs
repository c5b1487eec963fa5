use anyhow::{Context, Result};
use colored::Colorize;
use std::process::{Command, Output};
use std::time::Instant;

pub fn run(unit_only: bool, integration_only: bool, trace: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running tests...".cyan().bold());
    println!();

    let total_start = Instant::now();

    let run_unit = !integration_only;
    let run_integration = !unit_only;

    if run_unit {
        run_suite("Unit tests", &["test", "--lib", "--workspace"], trace)?;
    }

    if run_integration {
        // Integration tests live per crate under crates/*/tests.
        run_suite(
            "Integration tests",
            &["test", "-p", "platform", "-p", "slimport", "--tests"],
            trace,
        )?;
    }

    println!("{}", "  Running doc tests...".cyan());
    let doc_start = Instant::now();

    let doc_output = Command::new("cargo")
        .args(["test", "--doc", "--workspace"])
        .output()
        .context("Failed to run doc tests")?;

    if doc_output.status.success() {
        let summary = extract_test_summary(&String::from_utf8_lossy(&doc_output.stdout));
        println!(
            "{}",
            format!(
                "  ✓ Doc tests passed {} in {:.2}s",
                summary,
                doc_start.elapsed().as_secs_f64()
            )
            .green()
        );
    } else {
        eprintln!("{}", "  ⚠ Doc tests failed".yellow().bold());
    }
    println!();

    println!(
        "{}",
        format!(
            "✓ All tests completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

fn run_suite(label: &str, args: &[&str], trace: bool) -> Result<()> {
    println!("{}", format!("  Running {}...", label.to_lowercase()).cyan());
    let start = Instant::now();

    let output = cargo_test(args, trace).with_context(|| format!("Failed to run {label}"))?;

    if !output.status.success() {
        eprintln!("{}", format!("  ✗ {label} failed").red().bold());
        eprintln!();
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            eprintln!("  {}", line);
        }
        anyhow::bail!("{label} failed");
    }

    let summary = extract_test_summary(&String::from_utf8_lossy(&output.stdout));
    println!(
        "{}",
        format!(
            "  ✓ {label} passed {} in {:.2}s",
            summary,
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();
    Ok(())
}

fn cargo_test(args: &[&str], trace: bool) -> std::io::Result<Output> {
    let mut cmd = Command::new("cargo");
    cmd.args(args);
    if trace {
        cmd.args(["--features", "slimport/tracing"])
            .env("RUST_LOG", "debug");
    }
    cmd.output()
}

fn extract_test_summary(output: &str) -> String {
    // Look for lines like "test result: ok. 5 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out"
    for line in output.lines() {
        if line.contains("test result:") {
            if let Some(summary) = line.split("test result:").nth(1) {
                return summary.trim().to_string();
            }
        }
    }
    "(summary not available)".to_string()
}
