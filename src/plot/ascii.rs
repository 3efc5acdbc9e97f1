//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of a fit in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observations: `o`
//! - fitted curve: `-` line
//! - optimum: `*`

use crate::domain::{FitFile, FitOutcome, Observation, Optimum};
use crate::models::sample_curve;

/// Render a plot for an in-memory fit.
pub fn render_ascii_plot(
    observations: &[Observation],
    outcome: &FitOutcome,
    width: usize,
    height: usize,
) -> String {
    let (x_min, x_max) = x_range(observations.iter().map(|o| o.x)).unwrap_or((0.0, 20.0));
    let curve = sample_curve(&outcome.params(), x_min, x_max, width.max(2));
    render_plot(observations, &curve, Some(outcome.optimum()), x_min, x_max, width, height)
}

/// Render a plot from a saved fit JSON file.
pub fn render_ascii_plot_from_fit_file(fit: &FitFile, width: usize, height: usize) -> String {
    let (x_min, x_max) = x_range(fit.grid.x.iter().copied()).unwrap_or((0.0, 20.0));
    let curve: Vec<(f64, f64)> = fit
        .grid
        .x
        .iter()
        .zip(fit.grid.y.iter())
        .map(|(&x, &y)| (x, y))
        .collect();

    render_plot(&fit.observations, &curve, Some(fit.optimum), x_min, x_max, width, height)
}

fn render_plot(
    observations: &[Observation],
    curve: &[(f64, f64)],
    optimum: Option<Optimum>,
    x_min: f64,
    x_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(observations, curve, optimum).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points can overlay.
    draw_curve(&mut grid, curve, x_min, x_max, y_min, y_max);

    for o in observations {
        let x = map_x(o.x, x_min, x_max, width);
        let y = map_y(o.y, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    if let Some(opt) = optimum {
        if opt.location >= x_min && opt.location <= x_max {
            let x = map_x(opt.location, x_min, x_max, width);
            let y = map_y(opt.value, y_min, y_max, height);
            grid[y][x] = '*';
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: x=[{x_min:.3}, {x_max:.3}] | y=[{y_min:.4}, {y_max:.4}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn x_range(xs: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
    (lo.is_finite() && hi.is_finite() && hi > lo).then_some((lo, hi))
}

fn y_range(observations: &[Observation], curve: &[(f64, f64)], optimum: Option<Optimum>) -> Option<(f64, f64)> {
    let ys = observations
        .iter()
        .map(|o| o.y)
        .chain(curve.iter().map(|&(_, y)| y))
        .chain(optimum.map(|o| o.value))
        .filter(|y| y.is_finite());
    let (lo, hi) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
    (lo.is_finite() && hi.is_finite() && hi > lo).then_some((lo, hi))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    // NaN clamps to NaN; treat it as the bottom row.
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    let u = if u.is_nan() { 0.0 } else { u };
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let cx = map_x(x, x_min, x_max, width);
        let cy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, cx, cy, '-'),
            None => grid[cy][cx] = '-',
        }
        prev = Some((cx, cy));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        let (ux, uy) = (x0 as usize, y0 as usize);
        if uy < grid.len() && ux < grid[0].len() && grid[uy][ux] == ' ' {
            grid[uy][ux] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
