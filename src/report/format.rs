//! Reporting utilities: formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (snapshot tests live here)

use crate::domain::{CohortFit, FitOutcome};

/// Detailed report for a single cohort fit.
pub fn format_fit_report(fit: &CohortFit) -> String {
    let mut out = String::new();

    out.push_str("=== Φ stochastic resonance fit ===\n");
    out.push_str(&format!(
        "System: {} (n={}) | observations={}\n",
        fit.size,
        fit.effective_neurons,
        fit.observations.len()
    ));
    out.push_str("Model: Φ(ε) = a·ε·exp(−b·ε²) + c\n\n");

    let p = fit.outcome.params();
    match &fit.outcome {
        FitOutcome::Converged(c) => {
            out.push_str(&format!(
                "Status: converged ({} iterations, {} evaluations)\n",
                c.iterations, c.evaluations
            ));
            match c.std_errors() {
                Some([sa, sb, sc]) => {
                    out.push_str(&format!("- a = {:.6} ± {sa:.6}\n", p.a));
                    out.push_str(&format!("- b = {:.6} ± {sb:.6}\n", p.b));
                    out.push_str(&format!("- c = {:.6} ± {sc:.6}\n", p.c));
                }
                None => out.push_str(&format!("- a = {:.6}\n- b = {:.6}\n- c = {:.6}\n", p.a, p.b, p.c)),
            }
            out.push_str(&format!("- SSE = {:.3e}\n", c.sse));
        }
        FitOutcome::Fallback(fb) => {
            out.push_str(&format!("Status: fallback ({})\n", fb.reason));
            out.push_str(&format!(
                "- initial guess: a = {:.6}, b = {:.6}, c = {:.6}\n",
                p.a, p.b, p.c
            ));
        }
    }

    let opt = fit.outcome.optimum();
    out.push_str(&format!("- R² = {:.4}\n", fit.outcome.r_squared()));
    out.push_str(&format!("- optimum: ε = {:.3}, Φ = {:.6}\n", opt.location, opt.value));
    out
}

/// One line per cohort, aligned for the terminal.
pub fn format_cohort_table(fits: &[CohortFit]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<8} {:>3} {:>5} {:<10} {:>10} {:>10} {:>10} {:>8} {:>8} {:>10}\n",
            "size", "n", "obs", "status", "a", "b", "c", "R²", "ε_opt", "Φ_opt"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<8} {:-<3} {:-<5} {:-<10} {:-<10} {:-<10} {:-<10} {:-<8} {:-<8} {:-<10}\n",
            "", "", "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for fit in fits {
        let p = fit.outcome.params();
        let opt = fit.outcome.optimum();
        out.push_str(
            format!(
                "{:<8} {:>3} {:>5} {:<10} {:>10.6} {:>10.6} {:>10.6} {:>8.4} {:>8.3} {:>10.6}\n",
                fit.size.label(),
                fit.effective_neurons,
                fit.observations.len(),
                fit.outcome.status().to_string(),
                p.a,
                p.b,
                p.c,
                fit.outcome.r_squared(),
                opt.location,
                opt.value,
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}
